//! Per-key mutation locks.
//!
//! Slots are created on first use and held weakly by the table, so a key's
//! mutex lives only while some operation holds or waits on it. Dead slots are
//! swept once the table grows past its threshold.

use crate::core::error::{TesseraError, TesseraResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Default number of slots before an automatic sweep.
pub const DEFAULT_SWEEP_THRESHOLD: usize = 1024;

/// Exclusive ownership of one key, released on drop.
#[derive(Debug)]
pub struct KeyGuard {
    _guard: OwnedMutexGuard<()>,
}

/// Lazily populated map from key to mutex.
#[derive(Debug)]
pub struct KeyLockTable {
    slots: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
    sweep_threshold: usize,
}

impl Default for KeyLockTable {
    fn default() -> Self {
        Self::new(DEFAULT_SWEEP_THRESHOLD)
    }
}

impl KeyLockTable {
    /// Create a table that sweeps once it holds more than `sweep_threshold` slots.
    pub fn new(sweep_threshold: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            sweep_threshold: sweep_threshold.max(1),
        }
    }

    fn slot(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut slots = self.slots.lock();
        if let Some(existing) = slots.get(key).and_then(Weak::upgrade) {
            return existing;
        }

        if slots.len() >= self.sweep_threshold {
            slots.retain(|_, slot| slot.strong_count() > 0);
        }

        let slot = Arc::new(AsyncMutex::new(()));
        slots.insert(key.to_string(), Arc::downgrade(&slot));
        slot
    }

    /// Acquire exclusive ownership of `key`, waiting at most `timeout`.
    pub async fn acquire(&self, key: &str, timeout: Duration) -> TesseraResult<KeyGuard> {
        let slot = self.slot(key);
        match tokio::time::timeout(timeout, slot.lock_owned()).await {
            Ok(guard) => Ok(KeyGuard { _guard: guard }),
            Err(_) => {
                tracing::warn!(key = %key, timeout_ms = timeout.as_millis() as u64, "key lock timed out");
                Err(TesseraError::Timeout {
                    key: key.to_string(),
                    waited_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Drop slots no operation references. Returns the number removed.
    pub fn sweep(&self) -> usize {
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|_, slot| slot.strong_count() > 0);
        before - slots.len()
    }

    /// Number of slots currently in the table, live or dead.
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
