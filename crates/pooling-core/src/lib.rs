#![deny(unsafe_code)]
#![doc = "pooling-core: 池化缓冲租借/归还契约与稳定错误域。"]
#![doc = ""]
#![doc = "本 crate 只定义契约，不落地实体：缓冲池实现位于 `pooling-buffer`，"]
#![doc = "基于池化缓冲的出站文本内容位于 `pooling-http`。"]

pub mod buffer;
pub mod error;

pub use buffer::{BufferPool, PoolStatDimension, PoolStats};
pub use error::{CoreError, ErrorCategory, ErrorCause, Result, codes};
