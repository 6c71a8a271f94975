use std::{borrow::Cow, error::Error, fmt};

/// `CoreError` 是池化契约层共享的稳定错误域，承载错误码、消息与可选根因。
///
/// # 设计背景（Why）
/// - 缓冲池、内容封装与上层传输在不同层次产生的故障需要合流为统一错误码，
///   便于日志检索与告警聚合；
/// - 域层（如 `pooling-http::ContentError`）通过 `From` 转换为 `CoreError`，
///   保证 `?` 运算符在跨层调用时直接生效。
///
/// # 契约说明（What）
/// - `code`：遵循 `<领域>.<语义>` 约定的稳定字符串，参见 [`codes`]；
/// - `message`：面向排障人员的描述，不得包含负载内容；
/// - `cause`：可选底层原因，通过 [`Error::source`] 暴露；
/// - 实例满足 `Send + Sync + 'static`，可跨线程移动。
#[derive(Debug)]
pub struct CoreError {
    code: &'static str,
    message: Cow<'static, str>,
    cause: Option<ErrorCause>,
    category: Option<ErrorCategory>,
}

/// `ErrorCause` 封装底层原因，保持 `Send + Sync` 以方便跨线程传递。
pub type ErrorCause = Box<dyn Error + Send + Sync + 'static>;

/// 契约层统一的返回值别名，默认错误类型为 [`CoreError`]。
pub type Result<T, E = CoreError> = core::result::Result<T, E>;

impl CoreError {
    /// 构造核心错误。
    ///
    /// # 示例
    /// ```rust
    /// use pooling_core::{CoreError, codes};
    ///
    /// let err = CoreError::new(codes::POOL_EXHAUSTED, "slab 已耗尽");
    /// assert_eq!(err.code(), codes::POOL_EXHAUSTED);
    /// assert_eq!(err.message(), "slab 已耗尽");
    /// assert!(err.cause().is_none());
    /// ```
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
            category: None,
        }
    }

    /// 附带底层原因并返回新的核心错误。
    pub fn with_cause(mut self, cause: impl Error + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 显式标记错误分类，覆盖按错误码查表得到的默认值。
    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// 获取结构化错误分类。
    ///
    /// 显式标记优先；否则按错误码查默认表，未登记的码值回退为 [`ErrorCategory::NonRetryable`]。
    pub fn category(&self) -> ErrorCategory {
        self.category
            .or_else(|| codes::default_category(self.code))
            .unwrap_or(ErrorCategory::NonRetryable)
    }

    /// 获取稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 获取描述。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 获取底层原因。
    pub fn cause(&self) -> Option<&ErrorCause> {
        self.cause.as_ref()
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for CoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.cause
            .as_ref()
            .map(|boxed| boxed.as_ref() as &(dyn Error + 'static))
    }
}

/// 错误分类枚举，驱动调用方的处置策略。
///
/// - `NonRetryable`：调用方输入或实现缺陷，重试无意义；
/// - `ResourceExhausted`：池或内存暂时不可用，可降级为堆分配或稍后重试；
/// - `InvalidState`：对象已处于终止态（例如已释放），调用方需重新构造；
/// - `ProtocolViolation`：编码能力违反自身契约，应视为缺陷上报。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum ErrorCategory {
    NonRetryable,
    ResourceExhausted,
    InvalidState,
    ProtocolViolation,
}

/// 稳定错误码集合，遵循 `<领域>.<语义>` 命名约定。
pub mod codes {
    use super::ErrorCategory;

    /// 调用方传入了不满足前置条件的参数（例如缺失的文本内容）。
    pub const APP_INVALID_ARGUMENT: &str = "app.invalid_argument";
    /// 缓冲池无法满足租借请求。
    pub const POOL_EXHAUSTED: &str = "pool.exhausted";
    /// 缓冲池拒绝接收归还的缓冲。
    pub const POOL_RETURN_REJECTED: &str = "pool.return_rejected";
    /// 文本编码能力在写入过程中失败。
    pub const CONTENT_ENCODING: &str = "pooling.content.encoding";
    /// 编码写入字节数与预先计算的字节数不一致。
    pub const CONTENT_LENGTH_MISMATCH: &str = "pooling.content.length_mismatch";
    /// 内容已释放后仍被读取。
    pub const CONTENT_RELEASED: &str = "pooling.content.released";

    /// 错误码到默认分类的映射表。
    pub(crate) fn default_category(code: &str) -> Option<ErrorCategory> {
        let category = match code {
            APP_INVALID_ARGUMENT | CONTENT_ENCODING => ErrorCategory::NonRetryable,
            POOL_EXHAUSTED | POOL_RETURN_REJECTED => ErrorCategory::ResourceExhausted,
            CONTENT_LENGTH_MISMATCH => ErrorCategory::ProtocolViolation,
            CONTENT_RELEASED => ErrorCategory::InvalidState,
            _ => return None,
        };
        Some(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Root;

    impl fmt::Display for Root {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("root")
        }
    }

    impl Error for Root {}

    #[test]
    fn category_falls_back_to_code_table() {
        let err = CoreError::new(codes::CONTENT_RELEASED, "已释放");
        assert_eq!(err.category(), ErrorCategory::InvalidState);

        let unknown = CoreError::new("custom.code", "未登记");
        assert_eq!(unknown.category(), ErrorCategory::NonRetryable);

        let overridden = CoreError::new(codes::POOL_EXHAUSTED, "耗尽")
            .with_category(ErrorCategory::NonRetryable);
        assert_eq!(overridden.category(), ErrorCategory::NonRetryable);
    }

    #[test]
    fn source_exposes_cause() {
        let err = CoreError::new(codes::CONTENT_ENCODING, "编码失败").with_cause(Root);
        assert_eq!(err.to_string(), "[pooling.content.encoding] 编码失败");
        let source = err.source().expect("应暴露底层原因");
        assert_eq!(source.to_string(), "root");
    }
}
