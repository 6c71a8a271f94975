//! # error 模块说明
//!
//! - 构造期错误（缺失参数、编码失败、长度不一致、池拒绝租借）对该次构造是致命的，
//!   不会有半初始化的内容逃逸给调用方；
//! - 读取期错误只有 [`ContentError::UsedAfterRelease`]，调用方可捕获，实例保持 `Released`；
//! - 归还失败不属于本枚举：释放路径永不向调用方抛错，只记录日志并以
//!   [`Release::ReturnFailed`](crate::Release::ReturnFailed) 报告。

use pooling_core::{CoreError, codes};
use thiserror::Error;

use crate::charset::EncodingError;

/// 出站文本内容的错误域。
#[derive(Debug, Error)]
pub enum ContentError {
    /// 必填参数缺失。在任何池交互之前抛出，无需清理。
    #[error("argument `{argument}` must not be absent")]
    InvalidArgument { argument: &'static str },

    /// 编码能力写入失败；缓冲已在返回此错误前归还池。
    ///
    /// 原始 [`EncodingError`] 原样透传，`Display` 与 `source` 均不额外包装。
    #[error(transparent)]
    Encoding(EncodingError),

    /// 编码器实际写入的字节数与其预先报告的字节数不一致。
    #[error("encoder reported {expected} bytes but wrote {written}")]
    LengthMismatch { expected: usize, written: usize },

    /// 缓冲池拒绝了租借请求。
    #[error("buffer pool refused to rent: {0}")]
    Pool(#[source] CoreError),

    /// 内容已释放，缓冲可能已被其他租借者复用。
    #[error("content was read after its pooled buffer had been released")]
    UsedAfterRelease,
}

impl From<ContentError> for CoreError {
    /// 将内容错误转换为契约层的稳定错误码，便于上层统一以 `?` 传播。
    fn from(value: ContentError) -> Self {
        match value {
            ContentError::InvalidArgument { argument } => CoreError::new(
                codes::APP_INVALID_ARGUMENT,
                format!("argument `{argument}` must not be absent"),
            ),
            ContentError::Encoding(err) => {
                CoreError::new(codes::CONTENT_ENCODING, err.to_string()).with_cause(err)
            }
            ContentError::LengthMismatch { expected, written } => CoreError::new(
                codes::CONTENT_LENGTH_MISMATCH,
                format!("encoder reported {expected} bytes but wrote {written}"),
            ),
            ContentError::Pool(core) => core,
            ContentError::UsedAfterRelease => CoreError::new(
                codes::CONTENT_RELEASED,
                "content was read after its pooled buffer had been released",
            ),
        }
    }
}
