//! Incremental memory accounting.
//!
//! Every mutation reports the entry's previous and new footprint before the
//! mutation returns to its caller, so `used_memory` reflects a completed write
//! immediately. Nothing here ever scans the stored values.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Tracks per-entry footprints and their aggregate.
#[derive(Debug, Default)]
pub struct MemoryAccountant {
    /// Aggregate of all recorded entry sizes.
    used: AtomicU64,

    /// Highest aggregate observed.
    peak: AtomicU64,

    /// region -> key -> last recorded size.
    entries: Mutex<HashMap<String, HashMap<String, u64>>>,
}

impl MemoryAccountant {
    /// Create an empty accountant.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a size change for one entry.
    ///
    /// `old` must be the size previously recorded for the entry (0 when it is
    /// new). The aggregate moves by `new - old`.
    pub fn record_delta(&self, region: &str, key: &str, old: u64, new: u64) {
        {
            let mut entries = self.entries.lock();
            let table = match entries.get_mut(region) {
                Some(table) => table,
                None => entries.entry(region.to_string()).or_default(),
            };
            match table.get_mut(key) {
                Some(size) => *size = new,
                None => {
                    table.insert(key.to_string(), new);
                }
            }
        }

        if new >= old {
            let used = self.used.fetch_add(new - old, Ordering::AcqRel) + (new - old);
            self.peak.fetch_max(used, Ordering::AcqRel);
        } else {
            self.saturating_sub(old - new);
        }
    }

    /// Zero an entry's contribution.
    ///
    /// Returns the size that was last recorded for it.
    pub fn forget(&self, region: &str, key: &str) -> u64 {
        let removed = {
            let mut entries = self.entries.lock();
            entries
                .get_mut(region)
                .and_then(|table| table.remove(key))
                .unwrap_or(0)
        };
        self.saturating_sub(removed);
        removed
    }

    /// Zero every entry recorded for a region.
    ///
    /// Returns the total size released.
    pub fn forget_region(&self, region: &str) -> u64 {
        let released = {
            let mut entries = self.entries.lock();
            entries
                .remove(region)
                .map(|table| table.values().sum::<u64>())
                .unwrap_or(0)
        };
        self.saturating_sub(released);
        released
    }

    /// Current aggregate used memory in bytes.
    pub fn used_memory(&self) -> u64 {
        self.used.load(Ordering::Acquire)
    }

    /// Highest aggregate observed since creation.
    pub fn peak_memory(&self) -> u64 {
        self.peak.load(Ordering::Acquire)
    }

    /// Last recorded size for one entry.
    pub fn entry_size(&self, region: &str, key: &str) -> Option<u64> {
        self.entries
            .lock()
            .get(region)
            .and_then(|table| table.get(key).copied())
    }

    /// Number of entries with a recorded size.
    pub fn entry_count(&self) -> usize {
        self.entries.lock().values().map(HashMap::len).sum()
    }

    fn saturating_sub(&self, amount: u64) {
        if amount == 0 {
            return;
        }
        let _ = self
            .used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                Some(used.saturating_sub(amount))
            });
    }
}

/// Render a byte count the way Redis `INFO` does (`1.50K`, `12.00M`).
pub fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["K", "M", "G", "T", "P"];
    if bytes < 1024 {
        return format!("{}B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = "B";
    for next in UNITS {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = next;
    }
    format!("{:.2}{}", value, unit)
}
