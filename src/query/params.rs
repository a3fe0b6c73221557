//! Positional parameter decoding.
//!
//! Parameters arrive as a JSON array. An element shaped as
//! `{"@type": "double", "@value": 8.99}` is converted to the declared type;
//! any other element is used as-is.

use crate::core::error::{TesseraError, TesseraResult};
use crate::store::document::Document;

const TYPE_FIELD: &str = "@type";
const VALUE_FIELD: &str = "@value";

/// Decode a request body into bound parameters.
///
/// An empty body means no parameters. A body that is not an array is taken as
/// a single parameter.
pub fn parse_params(body: &[u8]) -> TesseraResult<Vec<Document>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let doc = Document::from_json(body)
        .map_err(|e| TesseraError::malformed(format!("invalid parameter body: {e}")))?;

    match doc {
        Document::Array(items) => items.into_iter().map(typed_param).collect(),
        single => Ok(vec![typed_param(single)?]),
    }
}

/// Convert one parameter, honouring a `@type`/`@value` envelope.
pub fn typed_param(doc: Document) -> TesseraResult<Document> {
    let is_envelope = matches!(&doc, Document::Object(members) if members.len() == 2)
        && doc.field(TYPE_FIELD).is_some()
        && doc.field(VALUE_FIELD).is_some();
    if !is_envelope {
        return Ok(doc);
    }

    let Some(type_name) = doc.field(TYPE_FIELD).and_then(Document::as_str) else {
        return Err(TesseraError::parameter_mismatch("@type must be a string"));
    };
    let value = doc.field(VALUE_FIELD).cloned().unwrap_or(Document::Null);
    coerce(type_name, value)
}

fn coerce(type_name: &str, value: Document) -> TesseraResult<Document> {
    let mismatch = |value: &Document| {
        TesseraError::parameter_mismatch(format!(
            "{} value does not match declared type {type_name}",
            value.type_name()
        ))
    };

    match type_name.to_ascii_lowercase().as_str() {
        "double" | "float" | "java.lang.double" | "java.lang.float" => match &value {
            Document::Int(n) => Ok(Document::Float(*n as f64)),
            Document::Float(f) => Ok(Document::Float(*f)),
            Document::String(s) => s
                .trim()
                .parse::<f64>()
                .map(Document::Float)
                .map_err(|_| mismatch(&value)),
            _ => Err(mismatch(&value)),
        },
        "int" | "integer" | "long" | "short" | "byte" | "java.lang.integer" | "java.lang.long" => {
            let n = match &value {
                Document::Int(n) => *n,
                Document::Float(f) if f.fract() == 0.0 && f.is_finite() => *f as i64,
                Document::String(s) => s.trim().parse::<i64>().map_err(|_| mismatch(&value))?,
                _ => return Err(mismatch(&value)),
            };
            let (min, max) = integer_range(type_name);
            if n < min || n > max {
                return Err(TesseraError::parameter_mismatch(format!(
                    "{n} is out of range for {type_name}"
                )));
            }
            Ok(Document::Int(n))
        }
        "string" | "java.lang.string" => match value {
            Document::String(_) => Ok(value),
            other => Err(mismatch(&other)),
        },
        "boolean" | "java.lang.boolean" => match &value {
            Document::Bool(b) => Ok(Document::Bool(*b)),
            Document::String(s) if s.eq_ignore_ascii_case("true") => Ok(Document::Bool(true)),
            Document::String(s) if s.eq_ignore_ascii_case("false") => Ok(Document::Bool(false)),
            _ => Err(mismatch(&value)),
        },
        "null" => Ok(Document::Null),
        other => Err(TesseraError::parameter_mismatch(format!(
            "unsupported parameter type {other}"
        ))),
    }
}

fn integer_range(type_name: &str) -> (i64, i64) {
    match type_name.to_ascii_lowercase().as_str() {
        "int" | "integer" | "java.lang.integer" => (i32::MIN.into(), i32::MAX.into()),
        "short" => (i16::MIN.into(), i16::MAX.into()),
        "byte" => (i8::MIN.into(), i8::MAX.into()),
        _ => (i64::MIN, i64::MAX),
    }
}
