use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU8, Ordering},
    },
};

use bytes::BytesMut;
use pooling_core::BufferPool;
use spin::RwLock;

use crate::{charset::TextEncoding, error::ContentError};

/// 租约的生命周期状态，只允许 `Active → Released` 一次跃迁。
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LeaseState {
    Active = 0,
    Released = 1,
}

impl LeaseState {
    fn from_raw(raw: u8) -> Self {
        if raw == LeaseState::Active as u8 {
            LeaseState::Active
        } else {
            LeaseState::Released
        }
    }
}

/// 一次释放调用的结果。
///
/// 释放路径永不向调用方返回错误；归还失败只能通过 `ReturnFailed` 与 `warn` 级日志观察到。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Release {
    /// 本次调用赢得状态跃迁，缓冲已交还池。
    Returned,
    /// 之前已有调用完成释放，本次为空操作。
    AlreadyReleased,
    /// 本次调用赢得状态跃迁，但池拒绝接收缓冲；租约仍进入 `Released`。
    ReturnFailed,
}

/// `BufferLease` 持有一次池化租借：存储、精确长度与所有权状态。
///
/// # 设计初衷（Why）
/// - 缓冲归还后可能被并发租借者立即复用，持有方必须保证“恰好归还一次、归还后不再访问”；
/// - 池化容量通常大于请求量，逻辑长度必须单独记录，绝不能从容量推断。
///
/// # 结构设计（How）
/// - `state`：原子状态位，`compare_exchange(Active, Released)` 选出唯一的归还者；
/// - `storage`：`spin::RwLock<Option<BytesMut>>`，读者持读锁借用 `[0, length)`，
///   归还者持写锁取走缓冲，保证正在进行的读取先于归还完成；
/// - `length`：构造时固定的写入字节数。
///
/// # 契约说明（What）
/// - 构造成功即处于 `Active`；`release` 或 `Drop` 触发唯一一次归还；
/// - `Released` 之后任何读取都返回 [`ContentError::UsedAfterRelease`]；
/// - [`with_bytes`](Self::with_bytes) 的闭包内不得释放同一租约，否则写锁会等待自身持有的读锁。
pub struct BufferLease {
    storage: RwLock<Option<BytesMut>>,
    length: usize,
    state: AtomicU8,
    pool: Arc<dyn BufferPool>,
}

impl BufferLease {
    /// 计算字节数 → 租借 → 从偏移 0 编码 → 校验写入长度。
    ///
    /// 租借之后的任何失败都会先把缓冲归还池再返回错误；清理路径上的归还失败只记录日志，
    /// 不会覆盖原始错误。
    pub fn acquire(
        pool: Arc<dyn BufferPool>,
        text: &str,
        encoding: &dyn TextEncoding,
    ) -> Result<Self, ContentError> {
        let expected = encoding.byte_count(text);
        let mut storage = pool.rent(expected).map_err(ContentError::Pool)?;
        storage.clear();

        let written = match encoding.encode_into(text, &mut storage) {
            Ok(written) => written,
            Err(err) => {
                tracing::debug!(
                    charset = encoding.web_name(),
                    error = %err,
                    "encoding into pooled buffer failed, returning buffer"
                );
                return_on_failure(pool.as_ref(), storage);
                return Err(ContentError::Encoding(err));
            }
        };

        if written != expected || storage.len() != expected {
            tracing::warn!(
                charset = encoding.web_name(),
                expected,
                written,
                buffered = storage.len(),
                "encoder broke its byte count contract"
            );
            return_on_failure(pool.as_ref(), storage);
            return Err(ContentError::LengthMismatch { expected, written });
        }

        Ok(Self {
            storage: RwLock::new(Some(storage)),
            length: written,
            state: AtomicU8::new(LeaseState::Active as u8),
            pool,
        })
    }

    /// 逻辑负载长度。
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn state(&self) -> LeaseState {
        LeaseState::from_raw(self.state.load(Ordering::Acquire))
    }

    pub fn is_active(&self) -> bool {
        self.state() == LeaseState::Active
    }

    /// 在读锁保护下借用 `[0, length)` 视图。
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R, ContentError> {
        let guard = self.storage.read();
        match &*guard {
            Some(storage) if self.is_active() => Ok(f(&storage[..self.length])),
            _ => Err(ContentError::UsedAfterRelease),
        }
    }

    /// 租借到的物理容量，始终不小于 [`len`](Self::len)。
    pub fn capacity(&self) -> Result<usize, ContentError> {
        let guard = self.storage.read();
        match &*guard {
            Some(storage) if self.is_active() => Ok(storage.capacity()),
            _ => Err(ContentError::UsedAfterRelease),
        }
    }

    /// 释放租约，把缓冲交还池。幂等且线程安全，只有一个调用方会真正执行归还。
    pub fn release(&self) -> Release {
        let won = self
            .state
            .compare_exchange(
                LeaseState::Active as u8,
                LeaseState::Released as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if !won {
            return Release::AlreadyReleased;
        }

        let Some(storage) = self.storage.write().take() else {
            return Release::AlreadyReleased;
        };
        let capacity = storage.capacity();
        match self.pool.return_buffer(storage) {
            Ok(()) => {
                tracing::debug!(length = self.length, capacity, "pooled buffer released");
                Release::Returned
            }
            Err(err) => {
                tracing::warn!(
                    length = self.length,
                    capacity,
                    error = %err,
                    "buffer pool rejected returned buffer, continuing teardown"
                );
                Release::ReturnFailed
            }
        }
    }
}

impl Drop for BufferLease {
    fn drop(&mut self) {
        if self.release() == Release::Returned {
            tracing::trace!(length = self.length, "pooled buffer released on drop");
        }
    }
}

impl fmt::Debug for BufferLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferLease")
            .field("length", &self.length)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn return_on_failure(pool: &dyn BufferPool, storage: BytesMut) {
    if let Err(err) = pool.return_buffer(storage) {
        tracing::warn!(error = %err, "failed to return buffer on construction failure path");
    }
}

#[cfg(test)]
mod tests {
    use pooling_buffer::SlabBufferPool;
    use pooling_core::{CoreError, PoolStats, codes};
    use tracing_test::traced_test;

    use super::*;
    use crate::charset::{Charset, EncodingError};

    /// 接受租借、拒绝全部归还的池。
    struct RejectingPool;

    impl BufferPool for RejectingPool {
        fn rent(&self, min_capacity: usize) -> Result<BytesMut, CoreError> {
            Ok(BytesMut::with_capacity(min_capacity))
        }

        fn return_buffer(&self, _buffer: BytesMut) -> Result<(), CoreError> {
            Err(CoreError::new(codes::POOL_RETURN_REJECTED, "归还被拒绝"))
        }

        fn shrink_to_fit(&self) -> Result<usize, CoreError> {
            Ok(0)
        }

        fn statistics(&self) -> Result<PoolStats, CoreError> {
            Ok(PoolStats::default())
        }
    }

    /// 永远写不进去的编码器，用于触发构造失败路径。
    struct NoRoomEncoding;

    impl TextEncoding for NoRoomEncoding {
        fn web_name(&self) -> &str {
            "x-no-room"
        }

        fn byte_count(&self, text: &str) -> usize {
            text.len()
        }

        fn encode_into(&self, text: &str, _dst: &mut BytesMut) -> Result<usize, EncodingError> {
            Err(EncodingError::InsufficientCapacity {
                charset: "x-no-room",
                needed: text.len(),
                available: 0,
            })
        }

        fn decode(&self, bytes: &[u8]) -> Result<String, EncodingError> {
            Ok(String::from_utf8_lossy(bytes).into_owned())
        }
    }

    #[test]
    #[traced_test]
    fn rejected_return_is_logged_not_raised() {
        let lease = BufferLease::acquire(Arc::new(RejectingPool), "abc", &Charset::Utf8)
            .expect("构造租约失败");
        assert_eq!(lease.release(), Release::ReturnFailed);
        assert_eq!(lease.state(), LeaseState::Released);
        assert!(logs_contain("buffer pool rejected returned buffer"));
        assert!(logs_contain(codes::POOL_RETURN_REJECTED));
    }

    #[test]
    #[traced_test]
    fn cleanup_return_failure_keeps_original_error() {
        let err = BufferLease::acquire(Arc::new(RejectingPool), "abc", &NoRoomEncoding)
            .expect_err("编码失败应向上传播");
        assert!(matches!(
            err,
            ContentError::Encoding(EncodingError::InsufficientCapacity { needed: 3, .. })
        ));
        assert!(logs_contain("failed to return buffer on construction failure path"));
    }

    #[test]
    fn release_is_single_shot() {
        let pool = Arc::new(SlabBufferPool::new());
        let lease =
            BufferLease::acquire(pool.clone(), "abc", &Charset::Utf8).expect("构造租约失败");
        assert_eq!(lease.len(), 3);
        assert_eq!(lease.release(), Release::Returned);
        assert_eq!(lease.release(), Release::AlreadyReleased);
        assert_eq!(lease.state(), LeaseState::Released);
        assert!(matches!(
            lease.with_bytes(|bytes| bytes.len()),
            Err(ContentError::UsedAfterRelease)
        ));
        drop(lease);
        let stats = pool.statistics().expect("读取统计失败");
        assert_eq!(stats.dimension("total_returned"), Some(1), "Drop 不应重复归还");
    }

    #[test]
    fn drop_returns_unreleased_buffer() {
        let pool = Arc::new(SlabBufferPool::new());
        {
            let _lease =
                BufferLease::acquire(pool.clone(), "", &Charset::Utf16Be).expect("构造租约失败");
            assert_eq!(pool.statistics().expect("读取统计失败").active_leases, 1);
        }
        assert_eq!(pool.statistics().expect("读取统计失败").active_leases, 0);
    }
}
