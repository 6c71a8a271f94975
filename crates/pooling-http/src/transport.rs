//! 外层传输实体的接入点。
//!
//! 传输栈本身（连接、帧、头部序列化）不在本 crate 范围内；这里只定义传输层消费内容所需的最小能力
//! [`HttpContent`]，以及一个按“先释放内容、再清理自身”顺序拆除的承载实体 [`OutboundMessage`]。

use std::fmt;

use bytes::BytesMut;
use spin::Mutex;

use crate::{
    content::PooledStringContent, error::ContentError, headers::ContentHeaders, lease::Release,
};

/// 传输层消费的内容能力。
///
/// # 契约说明（What）
/// - `headers`：内容元数据；
/// - `copy_to`：把负载追加到 `dst`，返回追加的字节数；
/// - `close`：释放钩子。外层实体的拆除流程必须调用它，重复调用是安全的空操作。
pub trait HttpContent: Send + Sync {
    fn headers(&self) -> Result<&ContentHeaders, ContentError>;

    fn copy_to(&self, dst: &mut BytesMut) -> Result<usize, ContentError>;

    fn close(&self) -> Release;
}

impl HttpContent for PooledStringContent {
    fn headers(&self) -> Result<&ContentHeaders, ContentError> {
        PooledStringContent::headers(self)
    }

    fn copy_to(&self, dst: &mut BytesMut) -> Result<usize, ContentError> {
        PooledStringContent::copy_to(self, dst)
    }

    fn close(&self) -> Release {
        PooledStringContent::close(self)
    }
}

/// 承载一份出站内容的外层实体。
///
/// # 两阶段拆除（How）
/// 1. 调用内容的释放钩子 [`HttpContent::close`]，缓冲先回到池；
/// 2. 丢弃内容对象并把自身标记为已关闭。
///
/// 显式 [`close`](Self::close) 与 `Drop` 走同一条路径，任一先到者完成拆除，后到者为空操作。
pub struct OutboundMessage {
    content: Mutex<Option<Box<dyn HttpContent>>>,
}

impl OutboundMessage {
    pub fn new(content: Box<dyn HttpContent>) -> Self {
        Self {
            content: Mutex::new(Some(content)),
        }
    }

    /// 便捷构造：直接承载一份 [`PooledStringContent`]。
    pub fn with_text(content: PooledStringContent) -> Self {
        Self::new(Box::new(content))
    }

    /// 当前内容头的副本；拆除后返回 [`ContentError::UsedAfterRelease`]。
    pub fn content_headers(&self) -> Result<ContentHeaders, ContentError> {
        let guard = self.content.lock();
        let Some(content) = &*guard else {
            return Err(ContentError::UsedAfterRelease);
        };
        content.headers().cloned()
    }

    /// 把请求体写入 `dst`，返回写入的字节数。
    pub fn write_body(&self, dst: &mut BytesMut) -> Result<usize, ContentError> {
        let guard = self.content.lock();
        let Some(content) = &*guard else {
            return Err(ContentError::UsedAfterRelease);
        };
        content.copy_to(dst)
    }

    pub fn is_closed(&self) -> bool {
        self.content.lock().is_none()
    }

    /// 拆除实体：先释放内容，再丢弃内容对象。返回内容释放钩子的结果。
    pub fn close(&self) -> Release {
        let Some(content) = self.content.lock().take() else {
            return Release::AlreadyReleased;
        };
        let outcome = content.close();
        drop(content);
        tracing::debug!(?outcome, "outbound message torn down");
        outcome
    }
}

impl Drop for OutboundMessage {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundMessage")
            .field("closed", &self.is_closed())
            .finish()
    }
}
