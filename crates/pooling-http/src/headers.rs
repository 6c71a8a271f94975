use std::fmt;

/// `Content-Type` 头的结构化形式：媒体类型加可选的 `charset` 参数。
///
/// 媒体类型字符串按调用方提供的原样保存，不做 MIME 语法校验。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MediaTypeHeader {
    media_type: String,
    charset: Option<String>,
}

impl MediaTypeHeader {
    pub fn new(media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            charset: None,
        }
    }

    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = Some(charset.into());
        self
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }
}

impl fmt::Display for MediaTypeHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.media_type)?;
        if let Some(charset) = &self.charset {
            write!(f, "; charset={charset}")?;
        }
        Ok(())
    }
}

/// 内容实体对外声明的元数据。
///
/// - `content_type`：见 [`MediaTypeHeader`]；
/// - `content_length`：逻辑负载长度，等于编码写入的字节数，与租借缓冲的容量无关。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContentHeaders {
    content_type: MediaTypeHeader,
    content_length: usize,
}

impl ContentHeaders {
    pub fn new(content_type: MediaTypeHeader, content_length: usize) -> Self {
        Self {
            content_type,
            content_length,
        }
    }

    pub fn content_type(&self) -> &MediaTypeHeader {
        &self.content_type
    }

    pub fn content_length(&self) -> usize {
        self.content_length
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_charset_parameter_only_when_present() {
        let bare = MediaTypeHeader::new("application/octet-stream");
        assert_eq!(bare.to_string(), "application/octet-stream");

        let text = MediaTypeHeader::new("text/plain").with_charset("utf-8");
        assert_eq!(text.to_string(), "text/plain; charset=utf-8");
        assert_eq!(text.charset(), Some("utf-8"));
    }
}
