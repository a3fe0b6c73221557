//! RESP2 protocol parser and encoder.
//!
//! RESP2 supports:
//! - Simple Strings (+)
//! - Errors (-)
//! - Integers (:)
//! - Bulk Strings ($)
//! - Arrays (*)
//! - Null (represented as $-1 or *-1)
//!
//! Lines that do not start with a type byte are parsed as inline commands.

use super::{RedisError, RedisValue};
use bytes::Bytes;

/// Maximum nesting depth for arrays.
pub const MAX_NESTING_DEPTH: usize = 32;

/// Maximum bulk string size (512MB).
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array elements.
pub const MAX_ELEMENTS: usize = 1_000_000;

/// Parse result.
#[derive(Debug, PartialEq)]
pub enum ParseResult {
    /// A complete value and the number of bytes it occupied.
    Ok(RedisValue, usize),
    /// Need more data.
    Incomplete,
    /// Parse error.
    Error(String),
}

/// RESP2 parser.
#[derive(Debug, Default)]
pub struct RespParser {
    /// Current nesting depth.
    depth: usize,
}

impl RespParser {
    /// Create a new parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one value from the front of the buffer.
    pub fn parse(&mut self, data: &[u8]) -> ParseResult {
        self.depth = 0;
        self.parse_value(data)
    }

    fn parse_value(&mut self, data: &[u8]) -> ParseResult {
        let Some(&type_byte) = data.first() else {
            return ParseResult::Incomplete;
        };

        if self.depth > MAX_NESTING_DEPTH {
            return ParseResult::Error("maximum nesting depth exceeded".to_string());
        }

        match type_byte {
            b'+' => line(data, |s| Ok(RedisValue::SimpleString(s.to_string()))),
            b'-' => line(data, |s| {
                let (kind, message) = s.split_once(' ').unwrap_or((s, ""));
                Ok(RedisValue::Error(RedisError::new(kind, message)))
            }),
            b':' => line(data, |s| {
                s.parse::<i64>()
                    .map(RedisValue::Integer)
                    .map_err(|_| "invalid integer".to_string())
            }),
            b'$' => parse_bulk_string(data),
            b'*' => self.parse_array(data),
            _ => parse_inline(data),
        }
    }

    /// Parse an array (*2\r\n...).
    fn parse_array(&mut self, data: &[u8]) -> ParseResult {
        let Some(len_end) = find_crlf(&data[1..]).map(|p| p + 1) else {
            return ParseResult::Incomplete;
        };
        let len = match parse_length(&data[1..len_end]) {
            Some(-1) => return ParseResult::Ok(RedisValue::Null, len_end + 2),
            Some(len) if len >= 0 => len as usize,
            _ => return ParseResult::Error("invalid array length".to_string()),
        };
        if len > MAX_ELEMENTS {
            return ParseResult::Error(format!("array too large: {} > {}", len, MAX_ELEMENTS));
        }

        self.depth += 1;
        let mut elements = Vec::with_capacity(len.min(1024));
        let mut offset = len_end + 2;

        for _ in 0..len {
            match self.parse_value(&data[offset..]) {
                ParseResult::Ok(value, consumed) => {
                    elements.push(value);
                    offset += consumed;
                }
                other => {
                    self.depth -= 1;
                    return other;
                }
            }
        }

        self.depth -= 1;
        ParseResult::Ok(RedisValue::Array(elements), offset)
    }
}

/// Parse a single-line value; `build` receives the text after the type byte.
fn line(data: &[u8], build: impl FnOnce(&str) -> Result<RedisValue, String>) -> ParseResult {
    match find_crlf(data) {
        Some(pos) => {
            let text = String::from_utf8_lossy(&data[1..pos]);
            match build(&text) {
                Ok(value) => ParseResult::Ok(value, pos + 2),
                Err(e) => ParseResult::Error(e),
            }
        }
        None => ParseResult::Incomplete,
    }
}

/// Parse a bulk string ($6\r\nfoobar\r\n).
fn parse_bulk_string(data: &[u8]) -> ParseResult {
    let Some(len_end) = find_crlf(data) else {
        return ParseResult::Incomplete;
    };
    let len = match parse_length(&data[1..len_end]) {
        Some(-1) => return ParseResult::Ok(RedisValue::Null, len_end + 2),
        Some(len) if len >= 0 => len as usize,
        _ => return ParseResult::Error("invalid bulk string length".to_string()),
    };
    if len > MAX_BULK_SIZE {
        return ParseResult::Error(format!(
            "bulk string too large: {} > {}",
            len, MAX_BULK_SIZE
        ));
    }

    let start = len_end + 2;
    let end = start + len;
    if data.len() < end + 2 {
        return ParseResult::Incomplete;
    }
    if &data[end..end + 2] != b"\r\n" {
        return ParseResult::Error("missing CRLF after bulk string".to_string());
    }

    ParseResult::Ok(
        RedisValue::BulkString(Bytes::copy_from_slice(&data[start..end])),
        end + 2,
    )
}

/// Parse an inline command (PING\r\n or SET key value\r\n).
///
/// Blank lines before the command are skipped and counted as consumed.
fn parse_inline(data: &[u8]) -> ParseResult {
    let mut start = 0;
    loop {
        let Some(pos) = find_crlf(&data[start..]) else {
            return ParseResult::Incomplete;
        };

        let elements: Vec<RedisValue> = data[start..start + pos]
            .split(|&b| b == b' ')
            .filter(|p| !p.is_empty())
            .map(|p| RedisValue::BulkString(Bytes::copy_from_slice(p)))
            .collect();

        start += pos + 2;
        if !elements.is_empty() {
            return ParseResult::Ok(RedisValue::Array(elements), start);
        }
    }
}

fn parse_length(data: &[u8]) -> Option<i64> {
    std::str::from_utf8(data).ok()?.parse().ok()
}

/// Find CRLF in data, returning position of first \r.
fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(2).position(|w| w == b"\r\n")
}

/// RESP2 encoder.
#[derive(Debug, Default)]
pub struct RespEncoder;

impl RespEncoder {
    /// Encode a value to bytes.
    pub fn encode(value: &RedisValue) -> Vec<u8> {
        let mut buf = Vec::with_capacity(64);
        Self::encode_into(value, &mut buf);
        buf
    }

    /// Encode a value into a buffer.
    pub fn encode_into(value: &RedisValue, buf: &mut Vec<u8>) {
        match value {
            RedisValue::SimpleString(s) => {
                buf.push(b'+');
                buf.extend_from_slice(s.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RedisValue::Error(e) => {
                buf.push(b'-');
                buf.extend_from_slice(e.kind.as_bytes());
                buf.push(b' ');
                buf.extend_from_slice(e.message.as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RedisValue::Integer(n) => {
                buf.push(b':');
                buf.extend_from_slice(n.to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
            }
            RedisValue::BulkString(data) => {
                buf.push(b'$');
                buf.extend_from_slice(data.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                buf.extend_from_slice(data);
                buf.extend_from_slice(b"\r\n");
            }
            RedisValue::Array(elements) => {
                buf.push(b'*');
                buf.extend_from_slice(elements.len().to_string().as_bytes());
                buf.extend_from_slice(b"\r\n");
                for elem in elements {
                    Self::encode_into(elem, buf);
                }
            }
            RedisValue::Null => {
                buf.extend_from_slice(b"$-1\r\n");
            }
        }
    }
}
