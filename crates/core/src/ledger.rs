//! Ordered history of completed measurements

use crate::error::{MeasureError, MeasureResult};
use crate::measurement::{MeasurementId, MeasurementRecord};
use crate::units::Unit;
use std::collections::HashSet;

/// Completed measurements in insertion order, unique by id
#[derive(Debug, Clone, Default)]
pub struct MeasurementLedger {
    records: Vec<MeasurementRecord>,
    ids: HashSet<MeasurementId>,
}

impl MeasurementLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Fails if a record with the same id is already present.
    pub fn append(&mut self, record: MeasurementRecord) -> MeasureResult<()> {
        if !self.ids.insert(record.id()) {
            return Err(MeasureError::DuplicateRecord(record.id()));
        }
        self.records.push(record);
        Ok(())
    }

    /// Remove every record
    pub fn clear(&mut self) {
        log::debug!("clearing {} measurements", self.records.len());
        self.records.clear();
        self.ids.clear();
    }

    /// Re-express every record's display length in `unit`
    pub fn recompute_display(&mut self, unit: Unit) {
        for record in &mut self.records {
            record.redisplay(unit);
        }
    }

    /// All records, oldest first
    pub fn all(&self) -> &[MeasurementRecord] {
        &self.records
    }

    pub fn contains(&self, id: MeasurementId) -> bool {
        self.ids.contains(&id)
    }

    pub fn get(&self, id: MeasurementId) -> Option<&MeasurementRecord> {
        if !self.contains(id) {
            return None;
        }
        self.records.iter().find(|record| record.id() == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
