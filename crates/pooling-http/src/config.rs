use serde::Deserialize;
use thiserror::Error;

use crate::charset::Charset;

/// 内容构造的默认值，可从配置文件加载并交给
/// [`PooledStringContentBuilder::defaults`](crate::PooledStringContentBuilder::defaults)。
///
/// ```toml
/// media_type = "application/json"
/// charset = "utf-16le"
/// ```
///
/// 缺省字段回退为 `text/plain` 与 `utf-8`。
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentDefaults {
    pub media_type: String,
    pub charset: Charset,
}

impl Default for ContentDefaults {
    fn default() -> Self {
        Self {
            media_type: crate::PooledStringContent::DEFAULT_MEDIA_TYPE.to_owned(),
            charset: Charset::Utf8,
        }
    }
}

/// 加载配置失败。
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid content defaults: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ContentDefaults {
    /// 从 TOML 文本解析默认值。
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }
}
