//! Region entry store.
//!
//! A region is a named, concurrent map from key to [`Entry`]. Keys are spread
//! over a fixed set of shards by xxHash64 so that writers to different keys
//! rarely contend; each shard is guarded by a short-lived `RwLock`. Every
//! mutation reports its footprint change to the shared [`MemoryAccountant`]
//! while the shard lock is still held, which keeps the accountant's per-entry
//! table in mutation order.
//!
//! Revisions are region-wide and strictly increasing, so an entry's
//! `mod_revision` grows on every successful mutation, including across a
//! delete and re-create of the same key.

use super::entry::{Entry, Value};
use super::locks::KeyLockTable;
use super::memory::MemoryAccountant;
use crate::core::error::{TesseraError, TesseraResult};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::Hasher;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use twox_hash::XxHash64;

/// Number of shards per region.
const SHARD_COUNT: usize = 16;

/// Seed for shard selection.
const SHARD_SEED: u64 = 0x7e55_e7a0;

/// Static description of a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionSpec {
    /// Region name.
    pub name: String,

    /// Region type label reported to clients.
    #[serde(rename = "type", default = "default_region_type")]
    pub region_type: String,

    /// Declared key type constraint (informational).
    #[serde(rename = "key-constraint", default)]
    pub key_constraint: Option<String>,

    /// Declared value type constraint (informational).
    #[serde(rename = "value-constraint", default)]
    pub value_constraint: Option<String>,
}

fn default_region_type() -> String {
    "REPLICATE".to_string()
}

impl RegionSpec {
    /// Create a spec with default type and no constraints.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region_type: default_region_type(),
            key_constraint: None,
            value_constraint: None,
        }
    }
}

type Shard = RwLock<BTreeMap<String, Entry>>;

/// Concurrent entry store for one region.
pub struct Region {
    spec: RegionSpec,

    shards: Vec<Shard>,

    /// Last assigned revision.
    revision: AtomicU64,

    accountant: Arc<MemoryAccountant>,

    /// Per-key mutation locks, used by the CAS coordinator.
    locks: KeyLockTable,
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("name", &self.spec.name)
            .field("len", &self.len())
            .field("revision", &self.current_revision())
            .finish()
    }
}

impl Region {
    /// Create an empty region.
    pub fn new(spec: RegionSpec, accountant: Arc<MemoryAccountant>) -> Self {
        Self::with_lock_table(spec, accountant, KeyLockTable::default())
    }

    /// Create an empty region with a configured lock table.
    pub fn with_lock_table(
        spec: RegionSpec,
        accountant: Arc<MemoryAccountant>,
        locks: KeyLockTable,
    ) -> Self {
        Self {
            spec,
            shards: (0..SHARD_COUNT).map(|_| RwLock::new(BTreeMap::new())).collect(),
            revision: AtomicU64::new(0),
            accountant,
            locks,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn spec(&self) -> &RegionSpec {
        &self.spec
    }

    pub(crate) fn locks(&self) -> &KeyLockTable {
        &self.locks
    }

    /// Shared accountant this region reports to.
    pub fn accountant(&self) -> &Arc<MemoryAccountant> {
        &self.accountant
    }

    /// Last assigned revision.
    pub fn current_revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    fn next_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn shard(&self, key: &str) -> &Shard {
        let mut hasher = XxHash64::with_seed(SHARD_SEED);
        hasher.write(key.as_bytes());
        &self.shards[(hasher.finish() % SHARD_COUNT as u64) as usize]
    }

    /// Get a key's current entry.
    pub fn get(&self, key: &str) -> TesseraResult<Entry> {
        self.shard(key)
            .read()
            .get(key)
            .cloned()
            .ok_or_else(|| TesseraError::key_not_found(key))
    }

    /// Check if a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.shard(key).read().contains_key(key)
    }

    /// Unconditional upsert.
    ///
    /// Returns the previous entry if the key existed.
    pub fn put(&self, key: &str, value: Value) -> Option<Entry> {
        self.update(key, |_| Mutation::Write(value))
            .previous
    }

    /// Remove a key.
    pub fn remove(&self, key: &str) -> TesseraResult<Entry> {
        let mut shard = self.shard(key).write();
        let removed = shard
            .remove(key)
            .ok_or_else(|| TesseraError::key_not_found(key))?;
        self.next_revision();
        self.accountant.forget(&self.spec.name, key);
        Ok(removed)
    }

    /// Remove every listed key that is present.
    ///
    /// Absent keys are skipped. Returns the number of keys removed.
    pub fn remove_all<S: AsRef<str>>(&self, keys: &[S]) -> usize {
        keys.iter()
            .filter(|key| self.remove(key.as_ref()).is_ok())
            .count()
    }

    /// Append bytes to a raw value, creating the key when absent.
    ///
    /// Returns the new value length. Appending to a structured document is a
    /// `WrongType` error and leaves the entry untouched.
    pub fn append(&self, key: &str, suffix: &[u8]) -> TesseraResult<usize> {
        let mut shard = self.shard(key).write();

        match shard.get_mut(key) {
            Some(entry) => {
                let Value::Raw(bytes) = &mut entry.value else {
                    return Err(TesseraError::WrongType {
                        key: key.to_string(),
                    });
                };
                bytes.extend_from_slice(suffix);
                let len = bytes.len();
                let old = entry.size_bytes;
                entry.touch(self.next_revision());
                self.accountant
                    .record_delta(&self.spec.name, key, old, entry.size_bytes);
                Ok(len)
            }
            None => {
                let entry = Entry::new(key.to_string(), Value::raw(suffix), self.next_revision());
                self.accountant
                    .record_delta(&self.spec.name, key, 0, entry.size_bytes);
                shard.insert(key.to_string(), entry);
                Ok(suffix.len())
            }
        }
    }

    /// Atomically inspect and possibly rewrite one key.
    ///
    /// `decide` sees the current entry (if any) under the shard write lock and
    /// returns the mutation to apply. The accountant is updated before the
    /// lock is released.
    pub(crate) fn update<F>(&self, key: &str, decide: F) -> UpdateResult
    where
        F: FnOnce(Option<&Entry>) -> Mutation,
    {
        let mut shard = self.shard(key).write();
        let previous = shard.get(key).cloned();

        match decide(previous.as_ref()) {
            Mutation::Keep => UpdateResult {
                previous,
                current: None,
            },
            Mutation::Write(value) => {
                let revision = self.next_revision();
                let (old_size, entry) = match shard.get_mut(key) {
                    Some(entry) => {
                        let old = entry.size_bytes;
                        entry.update(value, revision);
                        (old, entry.clone())
                    }
                    None => {
                        let entry = Entry::new(key.to_string(), value, revision);
                        shard.insert(key.to_string(), entry.clone());
                        (0, entry)
                    }
                };
                self.accountant
                    .record_delta(&self.spec.name, key, old_size, entry.size_bytes);
                UpdateResult {
                    previous,
                    current: Some(entry),
                }
            }
        }
    }

    /// Keys in ascending order.
    ///
    /// The returned vector is a snapshot; later mutations do not affect it.
    pub fn list_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .shards
            .iter()
            .flat_map(|shard| shard.read().keys().cloned().collect::<Vec<_>>())
            .collect();
        keys.sort();
        keys
    }

    /// Snapshot of all entries ordered by key.
    ///
    /// Each entry is read consistently; the set as a whole is not a
    /// region-wide snapshot.
    pub fn entries(&self) -> Vec<Entry> {
        let mut entries: Vec<Entry> = self
            .shards
            .iter()
            .flat_map(|shard| shard.read().values().cloned().collect::<Vec<_>>())
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        entries
    }

    /// Values of all entries ordered by key.
    pub fn values(&self) -> Vec<Value> {
        self.entries().into_iter().map(|e| e.value).collect()
    }

    /// Entries for the listed keys that are present, in request order.
    pub fn get_all<S: AsRef<str>>(&self, keys: &[S]) -> Vec<Entry> {
        keys.iter()
            .filter_map(|key| self.get(key.as_ref()).ok())
            .collect()
    }

    /// Remove every entry. Returns the number removed.
    pub fn clear(&self) -> usize {
        let mut removed = 0;
        for shard in &self.shards {
            let mut shard = shard.write();
            for key in shard.keys() {
                self.accountant.forget(&self.spec.name, key);
            }
            removed += shard.len();
            shard.clear();
        }
        if removed > 0 {
            self.next_revision();
        }
        removed
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of recorded entry sizes in this region.
    pub fn size_bytes(&self) -> u64 {
        self.shards
            .iter()
            .map(|shard| shard.read().values().map(|e| e.size_bytes).sum::<u64>())
            .sum()
    }
}

/// Decision returned by an [`Region::update`] callback.
#[derive(Debug)]
pub(crate) enum Mutation {
    /// Leave the key as it is.
    Keep,
    /// Store the value, creating the key when absent.
    Write(Value),
}

/// Outcome of [`Region::update`].
#[derive(Debug)]
pub(crate) struct UpdateResult {
    /// Entry before the update.
    pub previous: Option<Entry>,
    /// Entry after the update, when a write happened.
    pub current: Option<Entry>,
}
