//! Redis RESP2 protocol adapter.
//!
//! Exposes one region of the store to Redis clients. Keys are stored as raw
//! byte values, so structured documents written through REST are visible but
//! cannot be appended to.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                Redis Adapter                │
//! ├─────────────────────────────────────────────┤
//! │  TCP Listener                               │
//! │    ↓                                        │
//! │  RESP2 Parser (arrays and inline commands)  │
//! │    ↓                                        │
//! │  Command Router                             │
//! │    ├── String Commands (GET, SET, APPEND)   │
//! │    ├── Key Commands (DEL, EXISTS)           │
//! │    └── Server Commands (PING, INFO, ...)    │
//! │    ↓                                        │
//! │  CAS Coordinator / Region                   │
//! └─────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod protocol;
pub mod service;

use crate::core::error::{RedisErrorMapping, TesseraError};
use bytes::Bytes;

pub use commands::{CommandRouter, CommandState, ServerInfo};
pub use service::{RedisConfig, RedisService};

/// RESP2 value.
#[derive(Debug, Clone, PartialEq)]
pub enum RedisValue {
    /// Simple string (+OK\r\n)
    SimpleString(String),

    /// Error (-ERR message\r\n)
    Error(RedisError),

    /// Integer (:1000\r\n)
    Integer(i64),

    /// Bulk string ($6\r\nfoobar\r\n)
    BulkString(Bytes),

    /// Array (*2\r\n...)
    Array(Vec<RedisValue>),

    /// Null bulk string ($-1\r\n)
    Null,
}

impl RedisValue {
    /// Create a simple string.
    pub fn simple_string(s: impl Into<String>) -> Self {
        Self::SimpleString(s.into())
    }

    /// Create an OK response.
    pub fn ok() -> Self {
        Self::SimpleString("OK".to_string())
    }

    /// Create a PONG response.
    pub fn pong() -> Self {
        Self::SimpleString("PONG".to_string())
    }

    /// Create a generic error.
    pub fn err(message: impl Into<String>) -> Self {
        Self::Error(RedisError::generic(message))
    }

    /// Create an integer.
    pub fn integer(n: i64) -> Self {
        Self::Integer(n)
    }

    /// Create a bulk string.
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Self::BulkString(data.into())
    }

    /// Create a bulk string from a string.
    pub fn bulk_string(s: impl AsRef<str>) -> Self {
        Self::BulkString(Bytes::from(s.as_ref().to_string()))
    }

    /// Create an array.
    pub fn array(items: Vec<RedisValue>) -> Self {
        Self::Array(items)
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if this value is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Try to get as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::SimpleString(s) => Some(s),
            Self::BulkString(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Try to get as integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            Self::SimpleString(s) => s.parse().ok(),
            Self::BulkString(b) => std::str::from_utf8(b).ok().and_then(|s| s.parse().ok()),
            _ => None,
        }
    }
}

/// Redis error reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisError {
    /// Error kind (ERR, WRONGTYPE, BUSY, ...)
    pub kind: String,
    /// Error message.
    pub message: String,
}

impl RedisError {
    /// Create a new error.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Create a generic error.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::new("ERR", message)
    }

    /// Create a syntax error.
    pub fn syntax() -> Self {
        Self::new("ERR", "syntax error")
    }

    /// Create a wrong number of arguments error.
    pub fn wrong_arity(command: &str) -> Self {
        Self::new(
            "ERR",
            format!(
                "wrong number of arguments for '{}' command",
                command.to_lowercase()
            ),
        )
    }
}

impl From<TesseraError> for RedisError {
    fn from(error: TesseraError) -> Self {
        Self::new(
            RedisErrorMapping::to_error_prefix(&error),
            RedisErrorMapping::to_error_message(&error),
        )
    }
}

impl std::fmt::Display for RedisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.message)
    }
}

impl std::error::Error for RedisError {}

/// Redis command.
#[derive(Debug, Clone)]
pub struct RedisCommand {
    /// Command name (uppercase).
    pub name: String,

    /// Command arguments.
    pub args: Vec<Bytes>,
}

impl RedisCommand {
    /// Create a new command.
    pub fn new(name: impl Into<String>, args: Vec<Bytes>) -> Self {
        Self {
            name: name.into().to_uppercase(),
            args,
        }
    }

    /// Parse from a RESP array.
    pub fn from_array(values: Vec<RedisValue>) -> Result<Self, RedisError> {
        let mut values = values.into_iter();
        let name = match values.next() {
            Some(RedisValue::BulkString(b)) => {
                String::from_utf8(b.to_vec()).map_err(|_| RedisError::syntax())?
            }
            Some(RedisValue::SimpleString(s)) => s,
            _ => return Err(RedisError::syntax()),
        };

        let args = values
            .map(|v| match v {
                RedisValue::BulkString(b) => Ok(b),
                RedisValue::SimpleString(s) => Ok(Bytes::from(s)),
                RedisValue::Integer(n) => Ok(Bytes::from(n.to_string())),
                _ => Err(RedisError::syntax()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(name, args))
    }

    /// Get argument as string.
    pub fn arg_str(&self, index: usize) -> Option<&str> {
        self.args
            .get(index)
            .and_then(|b| std::str::from_utf8(b).ok())
    }

    /// Get argument as bytes.
    pub fn arg(&self, index: usize) -> Option<&Bytes> {
        self.args.get(index)
    }

    /// Get number of arguments.
    pub fn argc(&self) -> usize {
        self.args.len()
    }

    /// Key argument as a string; keys must be valid UTF-8.
    pub fn key(&self, index: usize) -> Result<&str, RedisError> {
        match self.args.get(index) {
            Some(bytes) => std::str::from_utf8(bytes)
                .map_err(|_| RedisError::generic("keys must be valid UTF-8")),
            None => Err(RedisError::wrong_arity(&self.name)),
        }
    }
}
