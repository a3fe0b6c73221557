//! Error types and adapter-specific mapping.
//!
//! Tessera defines one error taxonomy for the store core. Protocol adapters
//! translate it into their own status representation through the mapping
//! structs at the bottom of this module.

use crate::store::entry::Value;
use thiserror::Error;

/// Common Tessera error conditions.
#[derive(Debug, Error)]
pub enum TesseraError {
    /// The named region does not exist.
    #[error("region {region} not found")]
    RegionNotFound { region: String },

    /// The key is not present in the region.
    #[error("key {key} not found")]
    KeyNotFound { key: String },

    /// A create-if-absent write found the key already present.
    ///
    /// Carries the value currently stored so the caller can inspect it.
    #[error("key {key} already exists")]
    AlreadyExists { key: String, current: Value },

    /// Compare-and-set found a value different from the expected one.
    #[error("compare-and-set conflict on key {key}")]
    CasConflict { key: String, current: Value },

    /// Payload failed structural validation before any store access.
    #[error("malformed request: {message}")]
    MalformedRequest { message: String },

    /// Raw byte operation against a structured document value.
    #[error("WRONGTYPE operation against key {key} holding a structured document")]
    WrongType { key: String },

    /// Query text could not be parsed.
    #[error("query syntax error at offset {offset}: {message}")]
    QuerySyntax { offset: usize, message: String },

    /// No prepared query is registered under this id.
    #[error("query {id} is not defined")]
    UnknownQuery { id: String },

    /// A prepared query with this id already exists.
    #[error("query {id} already exists")]
    QueryAlreadyExists { id: String },

    /// Bound parameters do not satisfy the query placeholders.
    #[error("parameter mismatch: {message}")]
    ParameterMismatch { message: String },

    /// Per-key lock or execution deadline exceeded.
    #[error("timed out after {waited_ms}ms waiting for key {key}")]
    Timeout { key: String, waited_ms: u64 },

    /// Region already registered in the catalog.
    #[error("region {region} already exists")]
    RegionExists { region: String },

    /// Internal error.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl TesseraError {
    /// Create a KeyNotFound error.
    pub fn key_not_found(key: impl Into<String>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Create a RegionNotFound error.
    pub fn region_not_found(region: impl Into<String>) -> Self {
        Self::RegionNotFound {
            region: region.into(),
        }
    }

    /// Create a MalformedRequest error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedRequest {
            message: message.into(),
        }
    }

    /// Create a ParameterMismatch error.
    pub fn parameter_mismatch(message: impl Into<String>) -> Self {
        Self::ParameterMismatch {
            message: message.into(),
        }
    }

    /// Create an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// The value stored at the key when a conditional write was rejected.
    pub fn current_value(&self) -> Option<&Value> {
        match self {
            Self::AlreadyExists { current, .. } | Self::CasConflict { current, .. } => {
                Some(current)
            }
            _ => None,
        }
    }

    /// Whether the request was rejected before touching the store.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedRequest { .. } | Self::QuerySyntax { .. } | Self::ParameterMismatch { .. }
        )
    }
}

/// Result type using TesseraError.
pub type TesseraResult<T> = Result<T, TesseraError>;

// ============================================================================
// Adapter-specific error mapping
// ============================================================================

/// Response status kinds accepted by an adapter's response sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Ok,
    Created,
    NotFound,
    Conflict,
    MalformedRequest,
    InternalError,
}

impl StatusKind {
    /// HTTP status code for the REST front-end.
    pub fn http_code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::Created => 201,
            Self::NotFound => 404,
            Self::Conflict => 409,
            Self::MalformedRequest => 400,
            Self::InternalError => 500,
        }
    }

    /// Whether this kind reports success.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Ok | Self::Created)
    }
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ok => write!(f, "Ok"),
            Self::Created => write!(f, "Created"),
            Self::NotFound => write!(f, "NotFound"),
            Self::Conflict => write!(f, "Conflict"),
            Self::MalformedRequest => write!(f, "MalformedRequest"),
            Self::InternalError => write!(f, "InternalError"),
        }
    }
}

/// REST error mapping.
pub struct RestErrorMapping;

impl RestErrorMapping {
    /// Map a TesseraError to the response status kind.
    pub fn to_status(error: &TesseraError) -> StatusKind {
        match error {
            TesseraError::RegionNotFound { .. } => StatusKind::NotFound,
            TesseraError::KeyNotFound { .. } => StatusKind::NotFound,
            TesseraError::UnknownQuery { .. } => StatusKind::NotFound,
            TesseraError::AlreadyExists { .. } => StatusKind::Conflict,
            TesseraError::CasConflict { .. } => StatusKind::Conflict,
            TesseraError::QueryAlreadyExists { .. } => StatusKind::Conflict,
            TesseraError::RegionExists { .. } => StatusKind::Conflict,
            TesseraError::MalformedRequest { .. } => StatusKind::MalformedRequest,
            TesseraError::WrongType { .. } => StatusKind::MalformedRequest,
            TesseraError::QuerySyntax { .. } => StatusKind::MalformedRequest,
            TesseraError::ParameterMismatch { .. } => StatusKind::MalformedRequest,
            TesseraError::Timeout { .. } => StatusKind::InternalError,
            TesseraError::Internal { .. } => StatusKind::InternalError,
        }
    }
}

/// Redis RESP error mapping.
pub struct RedisErrorMapping;

impl RedisErrorMapping {
    /// Map a TesseraError to a Redis error prefix.
    pub fn to_error_prefix(error: &TesseraError) -> &'static str {
        match error {
            TesseraError::WrongType { .. } => "WRONGTYPE",
            TesseraError::Timeout { .. } => "BUSY",
            _ => "ERR",
        }
    }

    /// Message body following the prefix.
    pub fn to_error_message(error: &TesseraError) -> String {
        match error {
            TesseraError::WrongType { .. } => {
                "Operation against a key holding the wrong kind of value".to_string()
            }
            _ => error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rest_mapping_covers_taxonomy() {
        let cases = [
            (TesseraError::key_not_found("k"), 404),
            (TesseraError::malformed("bad"), 400),
            (
                TesseraError::CasConflict {
                    key: "k".into(),
                    current: Value::raw("v"),
                },
                409,
            ),
            (
                TesseraError::Timeout {
                    key: "k".into(),
                    waited_ms: 10,
                },
                500,
            ),
            (TesseraError::UnknownQuery { id: "q".into() }, 404),
        ];

        for (error, code) in cases {
            assert_eq!(RestErrorMapping::to_status(&error).http_code(), code, "{error}");
        }
    }

    #[test]
    fn test_conflict_carries_current_value() {
        let error = TesseraError::AlreadyExists {
            key: "k".into(),
            current: Value::raw("existing"),
        };
        assert_eq!(error.current_value(), Some(&Value::raw("existing")));
        assert!(TesseraError::key_not_found("k").current_value().is_none());
    }

    #[test]
    fn test_validation_errors() {
        assert!(TesseraError::malformed("bad body").is_validation_error());
        assert!(TesseraError::parameter_mismatch("type").is_validation_error());
        assert!(!TesseraError::key_not_found("k").is_validation_error());
        assert!(!TesseraError::Timeout {
            key: "k".into(),
            waited_ms: 1,
        }
        .is_validation_error());
    }

    #[test]
    fn test_redis_prefix() {
        let error = TesseraError::WrongType { key: "k".into() };
        assert_eq!(RedisErrorMapping::to_error_prefix(&error), "WRONGTYPE");
        assert_eq!(
            RedisErrorMapping::to_error_prefix(&TesseraError::internal("x")),
            "ERR"
        );
    }
}
