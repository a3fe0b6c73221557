//! Region catalog.

use super::cas::{CasCoordinator, DEFAULT_LOCK_TIMEOUT};
use super::locks::{KeyLockTable, DEFAULT_SWEEP_THRESHOLD};
use super::memory::MemoryAccountant;
use super::region::{Region, RegionSpec};
use crate::core::error::{TesseraError, TesseraResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Named regions sharing one memory accountant.
#[derive(Debug)]
pub struct Catalog {
    regions: RwLock<BTreeMap<String, Arc<Region>>>,
    accountant: Arc<MemoryAccountant>,
    lock_timeout: Duration,
    sweep_threshold: usize,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT, DEFAULT_SWEEP_THRESHOLD)
    }
}

impl Catalog {
    pub fn new(lock_timeout: Duration, sweep_threshold: usize) -> Self {
        Self {
            regions: RwLock::new(BTreeMap::new()),
            accountant: Arc::new(MemoryAccountant::new()),
            lock_timeout,
            sweep_threshold,
        }
    }

    /// Register a new region.
    pub fn create_region(&self, spec: RegionSpec) -> TesseraResult<Arc<Region>> {
        let mut regions = self.regions.write();
        if regions.contains_key(&spec.name) {
            return Err(TesseraError::RegionExists { region: spec.name });
        }

        let name = spec.name.clone();
        let region = Arc::new(Region::with_lock_table(
            spec,
            Arc::clone(&self.accountant),
            KeyLockTable::new(self.sweep_threshold),
        ));
        regions.insert(name.clone(), Arc::clone(&region));
        tracing::info!(region = %name, "region created");
        Ok(region)
    }

    /// Look up a region by name.
    pub fn region(&self, name: &str) -> TesseraResult<Arc<Region>> {
        self.regions
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| TesseraError::region_not_found(name))
    }

    /// All regions ordered by name.
    pub fn regions(&self) -> Vec<Arc<Region>> {
        self.regions.read().values().cloned().collect()
    }

    /// Mutation coordinator for a region, using the configured lock timeout.
    pub fn coordinator(&self, name: &str) -> TesseraResult<CasCoordinator> {
        Ok(CasCoordinator::new(self.region(name)?).with_timeout(self.lock_timeout))
    }

    /// Clear every region. Returns the number of entries removed.
    pub fn flush_all(&self) -> usize {
        self.regions().iter().map(|region| region.clear()).sum()
    }

    pub fn accountant(&self) -> &Arc<MemoryAccountant> {
        &self.accountant
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::entry::Value;

    #[test]
    fn test_duplicate_region_rejected() {
        let catalog = Catalog::default();
        catalog.create_region(RegionSpec::new("a")).unwrap();
        assert!(matches!(
            catalog.create_region(RegionSpec::new("a")),
            Err(TesseraError::RegionExists { .. })
        ));
        assert!(matches!(
            catalog.region("missing"),
            Err(TesseraError::RegionNotFound { .. })
        ));
    }

    #[test]
    fn test_regions_share_accountant() {
        let catalog = Catalog::default();
        let a = catalog.create_region(RegionSpec::new("a")).unwrap();
        let b = catalog.create_region(RegionSpec::new("b")).unwrap();
        a.put("k", Value::raw("1"));
        b.put("k", Value::raw("22"));
        assert_eq!(
            catalog.accountant().used_memory(),
            a.size_bytes() + b.size_bytes()
        );

        assert_eq!(catalog.flush_all(), 2);
        assert_eq!(catalog.accountant().used_memory(), 0);
    }
}
