//! Conditional writes serialized per key.
//!
//! Every mutation goes through the region's key lock table first, then
//! inspects and rewrites the entry in one step under the shard lock. Reads do
//! not take key locks.

use super::document::Document;
use super::entry::{Entry, Value};
use super::locks::KeyGuard;
use super::region::{Mutation, Region};
use crate::core::error::{TesseraError, TesseraResult};
use std::sync::Arc;
use std::time::Duration;

/// Member carrying the expected value in a compare-and-set payload.
pub const CAS_OLD_FIELD: &str = "@old";

/// Member carrying the replacement value in a compare-and-set payload.
pub const CAS_NEW_FIELD: &str = "@new";

/// Default wait for a key lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Write policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create or overwrite.
    Put,
    /// Overwrite only if present.
    Replace,
    /// Overwrite only if the current value equals the expected one.
    CompareAndSet,
    /// Create only if absent.
    Create,
}

impl WriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::Replace => "replace",
            Self::CompareAndSet => "cas",
            Self::Create => "create",
        }
    }
}

/// A single-key write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub key: String,
    pub mode: WriteMode,
    /// Expected current value; only used by compare-and-set.
    pub expected: Option<Value>,
    pub value: Value,
}

impl WriteRequest {
    pub fn put(key: impl Into<String>, value: Value) -> Self {
        Self::with_mode(key, WriteMode::Put, value)
    }

    pub fn replace(key: impl Into<String>, value: Value) -> Self {
        Self::with_mode(key, WriteMode::Replace, value)
    }

    pub fn create(key: impl Into<String>, value: Value) -> Self {
        Self::with_mode(key, WriteMode::Create, value)
    }

    pub fn compare_and_set(key: impl Into<String>, expected: Value, value: Value) -> Self {
        Self {
            key: key.into(),
            mode: WriteMode::CompareAndSet,
            expected: Some(expected),
            value,
        }
    }

    fn with_mode(key: impl Into<String>, mode: WriteMode, value: Value) -> Self {
        Self {
            key: key.into(),
            mode,
            expected: None,
            value,
        }
    }

    /// Build a compare-and-set request from an `{"@old": .., "@new": ..}` body.
    ///
    /// The body must be an object holding exactly those two members.
    pub fn from_cas_payload(key: impl Into<String>, payload: Document) -> TesseraResult<Self> {
        let Document::Object(members) = payload else {
            return Err(TesseraError::malformed(format!(
                "compare-and-set payload must be an object, got {}",
                payload.type_name()
            )));
        };

        let mut old = None;
        let mut new = None;
        for (name, value) in members {
            match name.as_str() {
                CAS_OLD_FIELD => old = Some(value),
                CAS_NEW_FIELD => new = Some(value),
                other => {
                    return Err(TesseraError::malformed(format!(
                        "unexpected member {other} in compare-and-set payload"
                    )))
                }
            }
        }

        match (old, new) {
            (Some(old), Some(new)) => Ok(Self::compare_and_set(
                key,
                Value::Document(old),
                Value::Document(new),
            )),
            _ => Err(TesseraError::malformed(format!(
                "compare-and-set payload requires both {CAS_OLD_FIELD} and {CAS_NEW_FIELD}"
            ))),
        }
    }

    fn validate(&self) -> TesseraResult<()> {
        if self.mode == WriteMode::CompareAndSet && self.expected.is_none() {
            return Err(TesseraError::malformed(
                "compare-and-set requires an expected value",
            ));
        }
        Ok(())
    }
}

/// Why a write was not applied.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// Replace against an absent key.
    NotFound,
    /// Create against an existing key.
    Exists { current: Value },
    /// Compare-and-set found a different value.
    Conflict { current: Value },
}

/// Result of a write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// The write was accepted.
    ///
    /// `entry` is `None` for a compare-and-set against an absent key, which
    /// succeeds without creating anything.
    Applied {
        previous: Option<Entry>,
        entry: Option<Entry>,
    },
    Rejected(Rejection),
}

impl WriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// Whether the write created a new key.
    pub fn created(&self) -> bool {
        matches!(
            self,
            Self::Applied {
                previous: None,
                entry: Some(_)
            }
        )
    }

    /// Convert rejections into errors, returning the written entry.
    pub fn into_result(self, key: &str) -> TesseraResult<Option<Entry>> {
        match self {
            Self::Applied { entry, .. } => Ok(entry),
            Self::Rejected(Rejection::NotFound) => Err(TesseraError::key_not_found(key)),
            Self::Rejected(Rejection::Exists { current }) => Err(TesseraError::AlreadyExists {
                key: key.to_string(),
                current,
            }),
            Self::Rejected(Rejection::Conflict { current }) => Err(TesseraError::CasConflict {
                key: key.to_string(),
                current,
            }),
        }
    }
}

/// Serializes mutations per key for one region.
#[derive(Debug, Clone)]
pub struct CasCoordinator {
    region: Arc<Region>,
    timeout: Duration,
}

impl CasCoordinator {
    pub fn new(region: Arc<Region>) -> Self {
        Self {
            region,
            timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Same coordinator with a different lock deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn region(&self) -> &Arc<Region> {
        &self.region
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn lock(&self, key: &str) -> TesseraResult<KeyGuard> {
        self.region.locks().acquire(key, self.timeout).await
    }

    /// Apply a write under the key's lock.
    pub async fn write(&self, request: WriteRequest) -> TesseraResult<WriteOutcome> {
        request.validate()?;

        let WriteRequest {
            key,
            mode,
            expected,
            value,
        } = request;
        let _guard = self.lock(&key).await?;

        let mut rejection = None;
        let result = self.region.update(&key, |current| match (mode, current) {
            (WriteMode::Put, _) => Mutation::Write(value),
            (WriteMode::Replace, Some(_)) => Mutation::Write(value),
            (WriteMode::Replace, None) => {
                rejection = Some(Rejection::NotFound);
                Mutation::Keep
            }
            (WriteMode::Create, None) => Mutation::Write(value),
            (WriteMode::Create, Some(entry)) => {
                rejection = Some(Rejection::Exists {
                    current: entry.value.clone(),
                });
                Mutation::Keep
            }
            // Absent key: succeed without creating.
            (WriteMode::CompareAndSet, None) => Mutation::Keep,
            (WriteMode::CompareAndSet, Some(entry)) => {
                if matches_expected(&entry.value, expected.as_ref()) {
                    Mutation::Write(value)
                } else {
                    rejection = Some(Rejection::Conflict {
                        current: entry.value.clone(),
                    });
                    Mutation::Keep
                }
            }
        });

        let outcome = match rejection {
            Some(rejection) => WriteOutcome::Rejected(rejection),
            None => WriteOutcome::Applied {
                previous: result.previous,
                entry: result.current,
            },
        };

        tracing::debug!(
            region = %self.region.name(),
            key = %key,
            mode = mode.as_str(),
            applied = outcome.is_applied(),
            "write"
        );
        Ok(outcome)
    }

    /// Remove a key under its lock.
    pub async fn remove(&self, key: &str) -> TesseraResult<Entry> {
        let _guard = self.lock(key).await?;
        let removed = self.region.remove(key);
        tracing::debug!(region = %self.region.name(), key = %key, removed = removed.is_ok(), "remove");
        removed
    }

    /// Remove each listed key in turn.
    ///
    /// Absent keys are skipped. Keys removed before a lock timeout stay
    /// removed.
    pub async fn remove_all<S: AsRef<str>>(&self, keys: &[S]) -> TesseraResult<usize> {
        let mut removed = 0;
        for key in keys {
            match self.remove(key.as_ref()).await {
                Ok(_) => removed += 1,
                Err(TesseraError::KeyNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(removed)
    }

    /// Append bytes under the key's lock. Returns the new length.
    pub async fn append(&self, key: &str, suffix: &[u8]) -> TesseraResult<usize> {
        let _guard = self.lock(key).await?;
        self.region.append(key, suffix)
    }
}

fn matches_expected(current: &Value, expected: Option<&Value>) -> bool {
    match expected {
        Some(Value::Document(doc)) => current.to_document() == *doc,
        Some(raw) => current == raw,
        None => false,
    }
}
