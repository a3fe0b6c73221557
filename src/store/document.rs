//! Structured document model.
//!
//! Values stored as JSON are held as a [`Document`] tree. Object members keep
//! their insertion order so a stored document serializes back the way it was
//! written, while equality ignores member order.

use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Per-node overhead used when measuring a document's footprint.
const NODE_OVERHEAD: u64 = 16;

/// A structured value: maps, sequences and scalars.
#[derive(Debug, Clone)]
pub enum Document {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Array(Vec<Document>),
    Object(Vec<(String, Document)>),
}

impl Document {
    /// Parse a document from JSON bytes.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Serialize this document as compact JSON.
    pub fn to_json(&self) -> String {
        // Document serialization cannot fail: every variant maps onto JSON.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Build an object from member pairs.
    pub fn object<K: Into<String>>(members: impl IntoIterator<Item = (K, Document)>) -> Self {
        Self::Object(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Look up a member of an object.
    pub fn field(&self, name: &str) -> Option<&Document> {
        match self {
            Self::Object(members) => members.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Follow a member path from this document.
    pub fn path<'a, S: AsRef<str>>(&'a self, segments: &[S]) -> Option<&'a Document> {
        segments
            .iter()
            .try_fold(self, |doc, segment| doc.field(segment.as_ref()))
    }

    /// Numeric view, widening integers to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// String view.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "double",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Measured footprint in bytes.
    ///
    /// Deterministic for a given tree so that repeated measurements of the same
    /// value always agree.
    pub fn size_bytes(&self) -> u64 {
        match self {
            Self::Null | Self::Bool(_) => NODE_OVERHEAD,
            Self::Int(_) | Self::Float(_) => NODE_OVERHEAD + 8,
            Self::String(s) => NODE_OVERHEAD + s.len() as u64,
            Self::Array(items) => {
                NODE_OVERHEAD + items.iter().map(Document::size_bytes).sum::<u64>()
            }
            Self::Object(members) => {
                NODE_OVERHEAD
                    + members
                        .iter()
                        .map(|(k, v)| k.len() as u64 + v.size_bytes())
                        .sum::<u64>()
            }
        }
    }

    /// Partial ordering used by query comparisons.
    ///
    /// Numbers compare as IEEE doubles, strings and booleans compare within
    /// their own type. Anything else is unordered.
    pub fn compare(&self, other: &Document) -> Option<Ordering> {
        match (self, other) {
            (Self::String(a), Self::String(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }
}

impl PartialEq for Document {
    /// Deep structural equality.
    ///
    /// Integers and doubles with the same numeric value are equal; object
    /// member order is ignored.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(key, value)| {
                        b.iter()
                            .find(|(other_key, _)| other_key == key)
                            .is_some_and(|(_, other_value)| value == other_value)
                    })
            }
            (Self::Int(_) | Self::Float(_), Self::Int(_) | Self::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            _ => false,
        }
    }
}

impl From<&str> for Document {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Document {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for Document {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<i64> for Document {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<bool> for Document {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(n) => serializer.serialize_i64(*n),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(members) => {
                let mut map = serializer.serialize_map(Some(members.len()))?;
                for (key, value) in members {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = Document;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON value")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Document, E> {
        Ok(Document::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Document, E> {
        Ok(Document::Null)
    }

    fn visit_some<D: Deserializer<'de>>(self, deserializer: D) -> Result<Document, D::Error> {
        Document::deserialize(deserializer)
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> Result<Document, E> {
        Ok(Document::Bool(b))
    }

    fn visit_i64<E: de::Error>(self, n: i64) -> Result<Document, E> {
        Ok(Document::Int(n))
    }

    fn visit_u64<E: de::Error>(self, n: u64) -> Result<Document, E> {
        Ok(i64::try_from(n).map_or(Document::Float(n as f64), Document::Int))
    }

    fn visit_f64<E: de::Error>(self, f: f64) -> Result<Document, E> {
        Ok(Document::Float(f))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> Result<Document, E> {
        Ok(Document::String(s.to_string()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> Result<Document, E> {
        Ok(Document::String(s))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Document, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Document::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Document, A::Error> {
        let mut members: Vec<(String, Document)> =
            Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, Document>()? {
            // Later duplicates win, as with serde_json::Value.
            match members.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => members.push((key, value)),
            }
        }
        Ok(Document::Object(members))
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(DocumentVisitor)
    }
}
