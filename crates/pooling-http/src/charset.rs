//! 文本编码能力。
//!
//! 内容封装只依赖三个问题的答案：编码后有多少字节、把字节写进给定缓冲、实际写了多少。
//! [`TextEncoding`] 正是这三个问题的抽象；[`Charset`] 覆盖常用的 Web 字符集。

use std::{fmt, str::FromStr};

use bytes::{BufMut, BytesMut};
use serde::Deserialize;
use thiserror::Error;

/// 编码能力在写入或解码时的失败。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    /// 目标缓冲的剩余容量放不下编码结果。编码器不得自行扩容，
    /// 否则池化缓冲会被悄悄替换为新分配的内存。
    #[error("{charset} output needs {needed} bytes but the buffer only has {available} spare")]
    InsufficientCapacity {
        charset: &'static str,
        needed: usize,
        available: usize,
    },
    /// 字节序列不是合法的 `charset` 编码。
    #[error("malformed {charset} sequence at byte offset {offset}")]
    Malformed { charset: &'static str, offset: usize },
    /// 自定义编码器的失败。
    #[error("{charset} encoder failed: {reason}")]
    Encoder { charset: String, reason: String },
}

/// 字符集名称无法识别。
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unknown charset `{0}`")]
pub struct UnknownCharset(pub String);

/// `TextEncoding` 描述“字符串 → 字节”的编码能力。
///
/// # 契约说明（What）
/// - `web_name`：规范名称，直接写入 `Content-Type` 的 `charset` 参数；
/// - `byte_count`：`text` 编码后的精确字节数；
/// - `encode_into`：从 `dst.len()` 处开始追加编码结果，返回写入的字节数；
///   **不得**让 `dst` 扩容，剩余容量不足时返回 [`EncodingError::InsufficientCapacity`]；
///   失败时 `dst` 可能已被部分写入；
/// - `decode`：`encode_into` 的逆操作，供读取方还原文本。
/// - 对同一输入，`encode_into` 的返回值必须等于 `byte_count`；不一致视为实现缺陷。
pub trait TextEncoding: Send + Sync {
    fn web_name(&self) -> &str;

    fn byte_count(&self, text: &str) -> usize;

    fn encode_into(&self, text: &str, dst: &mut BytesMut) -> Result<usize, EncodingError>;

    fn decode(&self, bytes: &[u8]) -> Result<String, EncodingError>;
}

/// 内置字符集。
///
/// `UsAscii` 与 `Iso8859_1` 无法表示的字符以 `?` 替换，字节数按字符数计算。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Charset {
    #[default]
    Utf8,
    Utf16Be,
    Utf16Le,
    UsAscii,
    Iso8859_1,
}

const REPLACEMENT: u8 = b'?';

impl Charset {
    /// 全部内置字符集。
    pub const ALL: [Charset; 5] = [
        Charset::Utf8,
        Charset::Utf16Be,
        Charset::Utf16Le,
        Charset::UsAscii,
        Charset::Iso8859_1,
    ];

    /// 规范名称（小写）。
    pub const fn web_name(self) -> &'static str {
        match self {
            Charset::Utf8 => "utf-8",
            Charset::Utf16Be => "utf-16be",
            Charset::Utf16Le => "utf-16le",
            Charset::UsAscii => "us-ascii",
            Charset::Iso8859_1 => "iso-8859-1",
        }
    }

    /// 按名称解析字符集，忽略大小写并接受常见别名。
    pub fn from_web_name(name: &str) -> Option<Self> {
        let charset = match name.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Charset::Utf8,
            "utf-16be" | "utf16be" => Charset::Utf16Be,
            "utf-16le" | "utf16le" => Charset::Utf16Le,
            "us-ascii" | "ascii" => Charset::UsAscii,
            "iso-8859-1" | "latin1" | "latin-1" => Charset::Iso8859_1,
            _ => return None,
        };
        Some(charset)
    }

    fn single_byte_limit(self) -> Option<u32> {
        match self {
            Charset::UsAscii => Some(0x7F),
            Charset::Iso8859_1 => Some(0xFF),
            _ => None,
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.web_name())
    }
}

impl FromStr for Charset {
    type Err = UnknownCharset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Charset::from_web_name(s).ok_or_else(|| UnknownCharset(s.to_owned()))
    }
}

impl TryFrom<String> for Charset {
    type Error = UnknownCharset;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl TextEncoding for Charset {
    fn web_name(&self) -> &str {
        Charset::web_name(*self)
    }

    fn byte_count(&self, text: &str) -> usize {
        match self {
            Charset::Utf8 => text.len(),
            Charset::Utf16Be | Charset::Utf16Le => text.encode_utf16().count() * 2,
            Charset::UsAscii | Charset::Iso8859_1 => text.chars().count(),
        }
    }

    fn encode_into(&self, text: &str, dst: &mut BytesMut) -> Result<usize, EncodingError> {
        let needed = TextEncoding::byte_count(self, text);
        let available = dst.capacity() - dst.len();
        if needed > available {
            return Err(EncodingError::InsufficientCapacity {
                charset: Charset::web_name(*self),
                needed,
                available,
            });
        }

        let start = dst.len();
        match self {
            Charset::Utf8 => dst.put_slice(text.as_bytes()),
            Charset::Utf16Be => text.encode_utf16().for_each(|unit| dst.put_u16(unit)),
            Charset::Utf16Le => text.encode_utf16().for_each(|unit| dst.put_u16_le(unit)),
            Charset::UsAscii | Charset::Iso8859_1 => {
                let limit = self.single_byte_limit().unwrap_or(0x7F);
                for ch in text.chars() {
                    let code = u32::from(ch);
                    dst.put_u8(if code <= limit { code as u8 } else { REPLACEMENT });
                }
            }
        }
        Ok(dst.len() - start)
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, EncodingError> {
        match self {
            Charset::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|err| EncodingError::Malformed {
                    charset: Charset::web_name(*self),
                    offset: err.valid_up_to(),
                }),
            Charset::Utf16Be => decode_utf16(*self, bytes, u16::from_be_bytes),
            Charset::Utf16Le => decode_utf16(*self, bytes, u16::from_le_bytes),
            Charset::UsAscii => Ok(bytes
                .iter()
                .map(|&b| if b.is_ascii() { b as char } else { REPLACEMENT as char })
                .collect()),
            Charset::Iso8859_1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
        }
    }
}

fn decode_utf16(
    charset: Charset,
    bytes: &[u8],
    unit: fn([u8; 2]) -> u16,
) -> Result<String, EncodingError> {
    let malformed = |offset| EncodingError::Malformed {
        charset: charset.web_name(),
        offset,
    };
    if bytes.len() % 2 != 0 {
        return Err(malformed(bytes.len() - 1));
    }
    let units = bytes.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));

    let mut out = String::with_capacity(bytes.len() / 2);
    let mut consumed_units = 0usize;
    for decoded in char::decode_utf16(units) {
        match decoded {
            Ok(ch) => {
                consumed_units += ch.len_utf16();
                out.push(ch);
            }
            Err(_) => return Err(malformed(consumed_units * 2)),
        }
    }
    Ok(out)
}
