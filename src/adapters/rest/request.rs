//! Decoded REST requests and responses.
//!
//! The HTTP front-end is responsible for routing bytes off the wire; it hands
//! the adapter a method, a percent-decoded path, decoded query parameters and
//! the raw body.

use crate::core::error::{RestErrorMapping, StatusKind, TesseraError};
use bytes::Bytes;
use serde::Serialize;

/// HTTP method subset served by the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Put => "PUT",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded request.
#[derive(Debug, Clone)]
pub struct RestRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Bytes,
}

impl RestRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Bytes::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn put(path: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new(Method::Put, path).with_body(body)
    }

    pub fn post(path: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    /// Add a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of a query parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Non-empty path segments.
    pub fn segments(&self) -> Vec<&str> {
        self.path.split('/').filter(|s| !s.is_empty()).collect()
    }
}

/// Status kind plus optional JSON body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestResponse {
    pub status: StatusKind,
    pub body: Option<String>,
}

impl RestResponse {
    pub fn new(status: StatusKind, body: Option<String>) -> Self {
        Self { status, body }
    }

    pub fn ok() -> Self {
        Self::new(StatusKind::Ok, None)
    }

    pub fn created() -> Self {
        Self::new(StatusKind::Created, None)
    }

    /// A response carrying a serialized body.
    pub fn json<T: Serialize + ?Sized>(status: StatusKind, body: &T) -> Self {
        match serde_json::to_string(body) {
            Ok(body) => Self::new(status, Some(body)),
            Err(e) => Self::error(&TesseraError::internal(format!("serialize response: {}", e))),
        }
    }

    /// Error response; conditional-write rejections carry the current value.
    pub fn error(error: &TesseraError) -> Self {
        let status = RestErrorMapping::to_status(error);
        match error.current_value() {
            Some(current) => Self::new(status, Some(current.to_document().to_json())),
            None => Self::json(status, &ErrorBody {
                cause: error.to_string(),
            }),
        }
    }

    pub fn http_code(&self) -> u16 {
        self.status.http_code()
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Body parsed as JSON, for callers that inspect results.
    pub fn body_json(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
    }
}

#[derive(Serialize)]
struct ErrorBody {
    cause: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::entry::Value;

    #[test]
    fn test_segments_and_params() {
        let req = RestRequest::get("/regionA/1,2/").with_query("op", "CAS");
        assert_eq!(req.segments(), vec!["regionA", "1,2"]);
        assert_eq!(req.param("op"), Some("CAS"));
        assert_eq!(req.param("key"), None);
        assert!(RestRequest::get("").segments().is_empty());
    }

    #[test]
    fn test_error_bodies() {
        let resp = RestResponse::error(&TesseraError::key_not_found("k"));
        assert_eq!(resp.http_code(), 404);
        assert!(resp.body_json().unwrap()["cause"].is_string());

        let resp = RestResponse::error(&TesseraError::CasConflict {
            key: "k".into(),
            current: Value::from_json(br#"{"a":1}"#).unwrap(),
        });
        assert_eq!(resp.http_code(), 409);
        assert_eq!(resp.body.as_deref(), Some(r#"{"a":1}"#));
    }
}
