//! Entries held by a region.

use super::document::Document;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Fixed bookkeeping charged to every entry on top of key and value bytes.
pub const ENTRY_OVERHEAD: u64 = 64;

/// A stored value: a structured document or an opaque byte string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Document(Document),
    Raw(Vec<u8>),
}

impl Value {
    /// Create a raw value.
    pub fn raw(bytes: impl AsRef<[u8]>) -> Self {
        Self::Raw(bytes.as_ref().to_vec())
    }

    /// Parse a JSON body into a document value.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        Document::from_json(bytes).map(Self::Document)
    }

    /// Measured footprint of the value alone.
    pub fn size_bytes(&self) -> u64 {
        match self {
            Self::Document(doc) => doc.size_bytes(),
            Self::Raw(bytes) => bytes.len() as u64,
        }
    }

    /// Length reported to byte-oriented clients.
    pub fn len(&self) -> usize {
        match self {
            Self::Document(doc) => doc.to_json().len(),
            Self::Raw(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_document(&self) -> Option<&Document> {
        match self {
            Self::Document(doc) => Some(doc),
            Self::Raw(_) => None,
        }
    }

    pub fn as_raw(&self) -> Option<&[u8]> {
        match self {
            Self::Raw(bytes) => Some(bytes),
            Self::Document(_) => None,
        }
    }

    /// Document view of the value for queries and JSON responses.
    ///
    /// Raw bytes are exposed as a string when they are valid UTF-8 and as an
    /// array of byte values otherwise.
    pub fn to_document(&self) -> Document {
        match self {
            Self::Document(doc) => doc.clone(),
            Self::Raw(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => Document::String(s.to_string()),
                Err(_) => {
                    Document::Array(bytes.iter().map(|b| Document::Int(i64::from(*b))).collect())
                }
            },
        }
    }

    /// Wire bytes: raw values verbatim, documents as compact JSON.
    pub fn to_bytes(&self) -> Bytes {
        match self {
            Self::Raw(bytes) => Bytes::copy_from_slice(bytes),
            Self::Document(doc) => Bytes::from(doc.to_json()),
        }
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Self::Document(doc)
    }
}

/// A key with its value and version metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// The key.
    pub key: String,

    /// The value.
    pub value: Value,

    /// Region revision at which the key was created.
    pub create_revision: u64,

    /// Region revision of the last mutation.
    pub mod_revision: u64,

    /// Per-key mutation counter, starting at 1.
    pub version: u64,

    /// Measured footprint, as recorded with the memory accountant.
    pub size_bytes: u64,
}

impl Entry {
    /// Create a freshly inserted entry.
    pub fn new(key: String, value: Value, revision: u64) -> Self {
        let size_bytes = measure(&key, &value);
        Self {
            key,
            value,
            create_revision: revision,
            mod_revision: revision,
            version: 1,
            size_bytes,
        }
    }

    /// Replace the value, bumping version metadata and re-measuring.
    pub(crate) fn update(&mut self, value: Value, revision: u64) {
        self.value = value;
        self.touch(revision);
    }

    /// Record an in-place mutation of the value.
    pub(crate) fn touch(&mut self, revision: u64) {
        self.mod_revision = revision;
        self.version += 1;
        self.size_bytes = measure(&self.key, &self.value);
    }
}

/// Footprint of a key/value pair including entry overhead.
pub fn measure(key: &str, value: &Value) -> u64 {
    ENTRY_OVERHEAD + key.len() as u64 + value.size_bytes()
}
