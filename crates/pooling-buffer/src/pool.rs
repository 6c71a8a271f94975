use std::{
    borrow::Cow,
    sync::{
        Arc, OnceLock,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
};

use bytes::BytesMut;
use pooling_core::{BufferPool, CoreError, PoolStatDimension, PoolStats};
use spin::Mutex;

/// 进程级共享池，首次调用 [`shared_pool`] 时惰性创建。
static SHARED_POOL: OnceLock<Arc<SlabBufferPool>> = OnceLock::new();

/// 返回进程级共享的 [`SlabBufferPool`]。
///
/// 所有未显式注入池的调用方都落在同一实例上，因此短生命周期的出站负载
/// 可以跨请求复用容量。
pub fn shared_pool() -> Arc<SlabBufferPool> {
    Arc::clone(SHARED_POOL.get_or_init(|| Arc::new(SlabBufferPool::new())))
}

/// `SlabBufferPool` 基于自由链表复用 `BytesMut`，减少短生命周期负载的堆分配次数。
///
/// # 核心机制（How）
/// - `spin::Mutex<Vec<BytesMut>>` 作为自由链表；租借时取第一个容量足够的块，未命中才新分配；
/// - `PoolMetrics` 通过原子计数跟踪 `allocated_bytes`、`available_bytes`、`active_leases`，
///   支撑 [`BufferPool::statistics`] 快照。
///
/// # 契约说明（What）
/// - **后置条件**：`rent` 返回的缓冲 `len() == 0` 且 `capacity() >= min_capacity`；
///   复用块只做 `clear()`，不清零字节，旧数据可能残留在可写区域。
/// - **线程安全**：共享状态均受 `spin::Mutex` 与原子计数保护。
///
/// # 设计取舍（Trade-offs）
/// - 自由链表不设上限也不分级，容量策略交给 `shrink_to_fit` 的调用方；
/// - 持锁区间只覆盖一次线性查找与 `swap_remove`，链表较短时自旋锁足够。
#[derive(Default)]
pub struct SlabBufferPool {
    free_list: Mutex<Vec<BytesMut>>,
    metrics: PoolMetrics,
}

impl SlabBufferPool {
    /// 创建空池实例，供运行时注入或测试场景直接使用。
    pub fn new() -> Self {
        Self::default()
    }

    /// 从自由链表或堆上获取一个满足容量的 `BytesMut`。
    fn acquire_buffer(&self, min_capacity: usize) -> BytesMut {
        let reused = {
            let mut list = self.free_list.lock();
            let index = list.iter().position(|buf| buf.capacity() >= min_capacity);
            index.map(|index| list.swap_remove(index))
        };

        let mut buffer = match reused {
            Some(buf) => {
                self.metrics.decrease_available(buf.capacity());
                tracing::trace!(
                    min_capacity,
                    capacity = buf.capacity(),
                    "slab pool hit"
                );
                buf
            }
            None => {
                let buf = BytesMut::with_capacity(min_capacity);
                self.metrics.increase_on_new_allocation(buf.capacity());
                tracing::trace!(
                    min_capacity,
                    capacity = buf.capacity(),
                    "slab pool miss, allocated new buffer"
                );
                buf
            }
        };
        buffer.clear();
        self.metrics.increase_active_leases();
        buffer
    }

    fn shrink_free_list(&self) -> usize {
        let mut list = self.free_list.lock();
        let reclaimed: usize = list.iter().map(BytesMut::capacity).sum();
        list.clear();
        self.metrics.decrease_on_shrink(reclaimed);
        reclaimed
    }

    fn snapshot(&self) -> PoolStats {
        let free_slots = self.free_list.lock().len();
        let metrics = &self.metrics;
        PoolStats {
            allocated_bytes: metrics.allocated_bytes.load(Ordering::Relaxed),
            active_leases: metrics.active_leases.load(Ordering::Relaxed),
            available_bytes: metrics.available_bytes.load(Ordering::Relaxed),
            failed_acquisitions: metrics.failed_acquisitions.load(Ordering::Relaxed),
            custom_dimensions: vec![
                dimension("slab_free_slots", free_slots),
                dimension("total_rented", metrics.total_rented.load(Ordering::Relaxed)),
                dimension(
                    "total_returned",
                    metrics.total_returned.load(Ordering::Relaxed),
                ),
                dimension("pool_misses", metrics.pool_misses.load(Ordering::Relaxed)),
            ],
        }
    }
}

impl BufferPool for SlabBufferPool {
    fn rent(&self, min_capacity: usize) -> Result<BytesMut, CoreError> {
        Ok(self.acquire_buffer(min_capacity))
    }

    fn return_buffer(&self, mut buffer: BytesMut) -> Result<(), CoreError> {
        buffer.clear();
        let capacity = buffer.capacity();
        self.metrics.decrease_active_leases();
        self.metrics.increase_available(capacity);
        self.free_list.lock().push(buffer);
        tracing::trace!(capacity, "slab pool reclaimed buffer");
        Ok(())
    }

    fn shrink_to_fit(&self) -> Result<usize, CoreError> {
        Ok(self.shrink_free_list())
    }

    fn statistics(&self) -> Result<PoolStats, CoreError> {
        Ok(self.snapshot())
    }
}

fn dimension(key: &'static str, value: usize) -> PoolStatDimension {
    PoolStatDimension {
        key: Cow::Borrowed(key),
        value,
    }
}

#[derive(Default)]
struct PoolMetrics {
    allocated_bytes: AtomicUsize,
    available_bytes: AtomicUsize,
    active_leases: AtomicUsize,
    total_rented: AtomicUsize,
    total_returned: AtomicUsize,
    pool_misses: AtomicUsize,
    failed_acquisitions: AtomicU64,
}

impl PoolMetrics {
    fn increase_on_new_allocation(&self, capacity: usize) {
        self.allocated_bytes.fetch_add(capacity, Ordering::Relaxed);
        self.pool_misses.fetch_add(1, Ordering::Relaxed);
    }

    fn increase_available(&self, capacity: usize) {
        self.available_bytes.fetch_add(capacity, Ordering::Relaxed);
    }

    fn decrease_available(&self, capacity: usize) {
        saturating_sub(&self.available_bytes, capacity);
    }

    fn decrease_on_shrink(&self, capacity: usize) {
        self.decrease_available(capacity);
        saturating_sub(&self.allocated_bytes, capacity);
    }

    fn increase_active_leases(&self) {
        self.active_leases.fetch_add(1, Ordering::Relaxed);
        self.total_rented.fetch_add(1, Ordering::Relaxed);
    }

    fn decrease_active_leases(&self) {
        saturating_sub(&self.active_leases, 1);
        self.total_returned.fetch_add(1, Ordering::Relaxed);
    }
}

fn saturating_sub(target: &AtomicUsize, value: usize) {
    let _ = target.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
        Some(current.saturating_sub(value))
    });
}
