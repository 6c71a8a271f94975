use std::{borrow::Cow, fmt, sync::Arc};

use bytes::BytesMut;
use pooling_buffer::shared_pool;
use pooling_core::BufferPool;

use crate::{
    charset::{Charset, TextEncoding},
    config::ContentDefaults,
    error::ContentError,
    headers::{ContentHeaders, MediaTypeHeader},
    lease::{BufferLease, LeaseState, Release},
};

/// `PooledStringContent` 是以池化缓冲承载编码结果的出站文本内容。
///
/// # 设计动机（Why）
/// - 常规字符串内容会为编码结果分配一个恰好大小的新数组；这里改为从共享池租借，
///   请求结束后归还，热路径上的分配次数降到池未命中的次数；
/// - 传输层只需要一个长度确定的只读视图与 `Content-Type` 元数据，
///   租借容量大于负载长度这一事实不应被任何读取方观察到。
///
/// # 架构关系（How）
/// - 构造：校验参数 → [`BufferLease::acquire`]（计数、租借、编码、校验）→ 生成 [`ContentHeaders`]；
/// - 读取：[`with_bytes`](Self::with_bytes) / [`read_as_bytes`](Self::read_as_bytes) /
///   [`copy_to`](Self::copy_to) 都只暴露 `[0, length)`；
/// - 拆除：[`close`](Self::close) 显式释放；未调用时由租约的 `Drop` 兜底。
///
/// # 契约说明（What）
/// - 内容缺失返回 [`ContentError::InvalidArgument`]，此时池未被触碰；
/// - 编码缺省为 UTF-8，媒体类型缺省为 `text/plain`，`charset` 参数取编码能力的规范名称；
/// - 释放后读取负载或元数据均返回 [`ContentError::UsedAfterRelease`]；
/// - `close` 可重复、可并发调用，恰好一次归还缓冲。
pub struct PooledStringContent {
    lease: BufferLease,
    headers: ContentHeaders,
}

impl PooledStringContent {
    /// 未指定媒体类型时使用的默认值。
    pub const DEFAULT_MEDIA_TYPE: &'static str = "text/plain";

    /// 使用共享池、UTF-8 与 `text/plain` 构造内容。
    pub fn from_text(content: &str) -> Result<Self, ContentError> {
        Self::builder().build(Some(content))
    }

    /// 按可选的字符集与媒体类型构造内容，`None` 表示使用默认值。
    ///
    /// `content` 为 `None` 时无论其余参数如何都返回 [`ContentError::InvalidArgument`]。
    pub fn try_new(
        content: Option<&str>,
        charset: Option<Charset>,
        media_type: Option<&str>,
    ) -> Result<Self, ContentError> {
        let charset = charset.unwrap_or_default();
        let mut builder = Self::builder().encoding(&charset);
        if let Some(media_type) = media_type {
            builder = builder.media_type(media_type);
        }
        builder.build(content)
    }

    /// 创建构造器，可注入自定义编码能力或缓冲池。
    pub fn builder<'a>() -> PooledStringContentBuilder<'a> {
        PooledStringContentBuilder::default()
    }

    /// 内容头；释放后返回 [`ContentError::UsedAfterRelease`]。
    pub fn headers(&self) -> Result<&ContentHeaders, ContentError> {
        self.ensure_active()?;
        Ok(&self.headers)
    }

    pub fn content_type(&self) -> Result<&MediaTypeHeader, ContentError> {
        self.headers().map(ContentHeaders::content_type)
    }

    pub fn content_length(&self) -> Result<usize, ContentError> {
        self.headers().map(ContentHeaders::content_length)
    }

    /// 在读锁下借用负载视图，闭包内不得调用 [`close`](Self::close)。
    pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> Result<R, ContentError> {
        self.lease.with_bytes(f)
    }

    /// 复制负载为独立的 `Vec<u8>`。
    pub fn read_as_bytes(&self) -> Result<Vec<u8>, ContentError> {
        self.with_bytes(<[u8]>::to_vec)
    }

    /// 把负载追加到 `dst` 末尾，返回追加的字节数。
    pub fn copy_to(&self, dst: &mut BytesMut) -> Result<usize, ContentError> {
        self.with_bytes(|bytes| {
            dst.extend_from_slice(bytes);
            bytes.len()
        })
    }

    /// 释放池化缓冲，幂等且线程安全。
    pub fn close(&self) -> Release {
        self.lease.release()
    }

    pub fn is_released(&self) -> bool {
        self.lease.state() == LeaseState::Released
    }

    fn ensure_active(&self) -> Result<(), ContentError> {
        if self.lease.is_active() {
            Ok(())
        } else {
            Err(ContentError::UsedAfterRelease)
        }
    }
}

impl fmt::Debug for PooledStringContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledStringContent")
            .field("content_type", &self.headers.content_type().to_string())
            .field("lease", &self.lease)
            .finish()
    }
}

/// [`PooledStringContent`] 的构造器。
///
/// ```rust
/// use std::sync::Arc;
///
/// use pooling_buffer::SlabBufferPool;
/// use pooling_http::{Charset, PooledStringContent};
///
/// let pool = Arc::new(SlabBufferPool::new());
/// let content = PooledStringContent::builder()
///     .pool(pool)
///     .encoding(&Charset::Utf16Be)
///     .media_type("application/json")
///     .build(Some("{}"))?;
/// assert_eq!(content.content_length()?, 4);
/// # Ok::<(), pooling_http::ContentError>(())
/// ```
#[derive(Default)]
pub struct PooledStringContentBuilder<'a> {
    encoding: Option<&'a dyn TextEncoding>,
    media_type: Option<Cow<'a, str>>,
    pool: Option<Arc<dyn BufferPool>>,
}

impl<'a> PooledStringContentBuilder<'a> {
    pub fn encoding(mut self, encoding: &'a dyn TextEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn media_type(mut self, media_type: impl Into<Cow<'a, str>>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// 注入缓冲池；未注入时使用进程级共享池。
    pub fn pool(mut self, pool: Arc<dyn BufferPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// 应用配置中的默认媒体类型与字符集。
    pub fn defaults(self, defaults: &'a ContentDefaults) -> Self {
        self.encoding(&defaults.charset)
            .media_type(defaults.media_type.as_str())
    }

    /// 构造内容。`content` 缺失时在任何池交互之前失败。
    pub fn build(self, content: Option<&str>) -> Result<PooledStringContent, ContentError> {
        let Some(text) = content else {
            return Err(ContentError::InvalidArgument {
                argument: "content",
            });
        };

        let encoding: &dyn TextEncoding = self.encoding.unwrap_or(&Charset::Utf8);
        let pool: Arc<dyn BufferPool> = match self.pool {
            Some(pool) => pool,
            None => shared_pool(),
        };

        let lease = BufferLease::acquire(pool, text, encoding)?;
        let media_type = self
            .media_type
            .unwrap_or(Cow::Borrowed(PooledStringContent::DEFAULT_MEDIA_TYPE));
        let content_type =
            MediaTypeHeader::new(media_type.into_owned()).with_charset(encoding.web_name());
        tracing::trace!(
            length = lease.len(),
            content_type = %content_type,
            "pooled string content ready"
        );

        Ok(PooledStringContent {
            headers: ContentHeaders::new(content_type, lease.len()),
            lease,
        })
    }
}
