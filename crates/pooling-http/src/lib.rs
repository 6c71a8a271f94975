#![deny(unsafe_code)]

//! `pooling-http` 提供借用共享缓冲池承载编码结果的出站文本内容。
//!
//! # 模块定位（Why）
//! - 出站请求体常由字符串编码而来；常规做法是每次按字节数分配新数组，
//!   本 crate 改为从 [`BufferPool`](pooling_core::BufferPool) 租借缓冲，写入编码结果后以只读视图暴露；
//! - 池化缓冲归还后可能立即被其它线程复用，因此持有方必须保证“恰好归还一次、归还后不再触碰”。
//!
//! # 设计概要（How）
//! - [`charset`]：文本编码能力 [`TextEncoding`] 及内置 [`Charset`]；
//! - [`lease`]：[`BufferLease`] 持有一次租借，原子状态位选出唯一的归还者；
//! - [`content`]：[`PooledStringContent`] 组合租约与 `Content-Type` 元数据；
//! - [`transport`]：外层传输实体接入点 [`HttpContent`] 与两阶段拆除的 [`OutboundMessage`]；
//! - [`config`]：可从 TOML 加载的默认媒体类型与字符集。
//!
//! # 使用示例
//! ```rust
//! use pooling_http::{Charset, PooledStringContent};
//!
//! let content = PooledStringContent::try_new(Some("hello"), Some(Charset::Utf16Le), None)?;
//! assert_eq!(content.content_type()?.to_string(), "text/plain; charset=utf-16le");
//! assert_eq!(content.read_as_bytes()?.len(), 10);
//! content.close();
//! assert!(content.read_as_bytes().is_err());
//! # Ok::<(), pooling_http::ContentError>(())
//! ```

pub mod charset;
pub mod config;
pub mod content;
pub mod error;
pub mod headers;
pub mod lease;
pub mod transport;

pub use charset::{Charset, EncodingError, TextEncoding};
pub use config::{ConfigError, ContentDefaults};
pub use content::{PooledStringContent, PooledStringContentBuilder};
pub use error::ContentError;
pub use headers::{ContentHeaders, MediaTypeHeader};
pub use lease::{BufferLease, LeaseState, Release};
pub use transport::{HttpContent, OutboundMessage};
