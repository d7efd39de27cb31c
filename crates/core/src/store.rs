//! Durable staging store contract
//!
//! A staging store keeps the measurements captured while offline until they
//! are merged back into the ledger. Each operation is atomic with respect to
//! the others, which is what lets a record be staged while a reconciliation
//! pass is running without being dropped.

use crate::error::StoreResult;
use crate::measurement::{MeasurementId, MeasurementRecord};
use parking_lot::Mutex;
use std::sync::Arc;

/// Well-known key the staged list is persisted under
pub const OFFLINE_MEASUREMENTS_KEY: &str = "offlineMeasurements";

/// Persistence for staged measurements
pub trait StagingStore: Send + Sync {
    /// Add a record to the end of the stage
    fn append(&self, record: &MeasurementRecord) -> StoreResult<()>;

    /// Read every staged record, oldest first
    fn load(&self) -> StoreResult<Vec<MeasurementRecord>>;

    /// Remove the records with the given ids, leaving everything else staged
    fn remove(&self, ids: &[MeasurementId]) -> StoreResult<()>;
}

impl<S: StagingStore + ?Sized> StagingStore for Arc<S> {
    fn append(&self, record: &MeasurementRecord) -> StoreResult<()> {
        (**self).append(record)
    }

    fn load(&self) -> StoreResult<Vec<MeasurementRecord>> {
        (**self).load()
    }

    fn remove(&self, ids: &[MeasurementId]) -> StoreResult<()> {
        (**self).remove(ids)
    }
}

/// In-process staging store. Does not survive a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<MeasurementRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl StagingStore for MemoryStore {
    fn append(&self, record: &MeasurementRecord) -> StoreResult<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }

    fn load(&self) -> StoreResult<Vec<MeasurementRecord>> {
        Ok(self.records.lock().clone())
    }

    fn remove(&self, ids: &[MeasurementId]) -> StoreResult<()> {
        self.records.lock().retain(|record| !ids.contains(&record.id()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::sample_record;
    use crate::units::Unit;

    #[test]
    fn test_memory_store_remove_selected() {
        let store = MemoryStore::new();
        let a = sample_record(1.0, Unit::Centimeter);
        let b = sample_record(2.0, Unit::Centimeter);
        store.append(&a).unwrap();
        store.append(&b).unwrap();

        store.remove(&[a.id()]).unwrap();
        let remaining = store.load().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id(), b.id());
    }

    #[test]
    fn test_shared_store() {
        let store = Arc::new(MemoryStore::new());
        let shared: Arc<MemoryStore> = Arc::clone(&store);
        shared.append(&sample_record(1.0, Unit::Inch)).unwrap();
        assert_eq!(store.len(), 1);
    }
}
