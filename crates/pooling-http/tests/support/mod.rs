//! 集成测试共用的池与编码器替身。
//!
//! - `CountingPool`：记录租借/归还次数，并断言同一缓冲不会被重复归还；
//!   可配置超额容量（交付前以 `0xEE` 填满可写区域模拟残留数据）、拒绝租借、拒绝归还；
//! - `FailingEncoding`：写入一半字节后失败；
//! - `MiscountingEncoding`：报告的字节数比实际写入多一。

#![allow(dead_code)]

use std::{
    collections::HashSet,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use bytes::{BufMut, BytesMut};
use pooling_core::{BufferPool, CoreError, PoolStats, codes};
use pooling_http::{EncodingError, TextEncoding};

pub const STALE_BYTE: u8 = 0xEE;

#[derive(Default)]
pub struct CountingPool {
    extra_capacity: usize,
    refuse_rent: bool,
    reject_return: bool,
    rents: AtomicUsize,
    returns: AtomicUsize,
    last_capacity: AtomicUsize,
    outstanding: Mutex<HashSet<usize>>,
}

impl CountingPool {
    /// 每次租借多给 16 字节，保证缓冲指针非悬垂、可用于身份追踪。
    pub fn new() -> Arc<Self> {
        Self::over_provisioned(16)
    }

    pub fn over_provisioned(extra_capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            extra_capacity: extra_capacity.max(1),
            ..Self::default()
        })
    }

    pub fn refusing_rents() -> Arc<Self> {
        Arc::new(Self {
            extra_capacity: 16,
            refuse_rent: true,
            ..Self::default()
        })
    }

    pub fn rejecting_returns() -> Arc<Self> {
        Arc::new(Self {
            extra_capacity: 16,
            reject_return: true,
            ..Self::default()
        })
    }

    pub fn rents(&self) -> usize {
        self.rents.load(Ordering::SeqCst)
    }

    pub fn returns(&self) -> usize {
        self.returns.load(Ordering::SeqCst)
    }

    pub fn last_capacity(&self) -> usize {
        self.last_capacity.load(Ordering::SeqCst)
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.lock().expect("mutex poisoned").len()
    }
}

impl BufferPool for CountingPool {
    fn rent(&self, min_capacity: usize) -> Result<BytesMut, CoreError> {
        if self.refuse_rent {
            return Err(CoreError::new(codes::POOL_EXHAUSTED, "测试池拒绝租借"));
        }
        let capacity = min_capacity + self.extra_capacity;
        let mut buffer = BytesMut::with_capacity(capacity);
        buffer.resize(buffer.capacity(), STALE_BYTE);
        buffer.clear();

        let fresh = self
            .outstanding
            .lock()
            .expect("mutex poisoned")
            .insert(buffer.as_ptr() as usize);
        assert!(fresh, "同一缓冲不应同时被借出两次");
        self.rents.fetch_add(1, Ordering::SeqCst);
        self.last_capacity.store(buffer.capacity(), Ordering::SeqCst);
        Ok(buffer)
    }

    fn return_buffer(&self, buffer: BytesMut) -> Result<(), CoreError> {
        let known = self
            .outstanding
            .lock()
            .expect("mutex poisoned")
            .remove(&(buffer.as_ptr() as usize));
        assert!(known, "缓冲被重复归还或并非本池借出");
        self.returns.fetch_add(1, Ordering::SeqCst);
        if self.reject_return {
            return Err(CoreError::new(codes::POOL_RETURN_REJECTED, "测试池拒绝归还"));
        }
        Ok(())
    }

    fn shrink_to_fit(&self) -> Result<usize, CoreError> {
        Ok(0)
    }

    fn statistics(&self) -> Result<PoolStats, CoreError> {
        Ok(PoolStats {
            active_leases: self.outstanding(),
            ..PoolStats::default()
        })
    }
}

/// 写入一半字节后失败的编码器。
pub struct FailingEncoding;

impl FailingEncoding {
    pub fn error() -> EncodingError {
        EncodingError::Encoder {
            charset: "x-failing".to_owned(),
            reason: "injected failure".to_owned(),
        }
    }
}

impl TextEncoding for FailingEncoding {
    fn web_name(&self) -> &str {
        "x-failing"
    }

    fn byte_count(&self, text: &str) -> usize {
        text.len()
    }

    fn encode_into(&self, text: &str, dst: &mut BytesMut) -> Result<usize, EncodingError> {
        let half = text.len() / 2;
        dst.put_slice(&text.as_bytes()[..half]);
        Err(Self::error())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, EncodingError> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}

/// 报告的字节数比实际写入多一的编码器。
pub struct MiscountingEncoding;

impl TextEncoding for MiscountingEncoding {
    fn web_name(&self) -> &str {
        "x-miscounting"
    }

    fn byte_count(&self, text: &str) -> usize {
        text.len() + 1
    }

    fn encode_into(&self, text: &str, dst: &mut BytesMut) -> Result<usize, EncodingError> {
        dst.put_slice(text.as_bytes());
        Ok(text.len())
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, EncodingError> {
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }
}
