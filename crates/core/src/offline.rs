//! Offline staging and reconciliation
//!
//! Measurements completed while offline are mirrored into a durable
//! [`StagingStore`]. When connectivity returns, [`OfflineReconciler::reconcile`]
//! merges them into the ledger by id and then removes exactly the records it
//! read. Anything staged after the read stays in the store for the next pass,
//! and anything already in the ledger is skipped, so passes can be repeated
//! freely.

use crate::error::{StoreError, StoreResult};
use std::collections::HashSet;
use crate::ledger::MeasurementLedger;
use crate::measurement::{MeasurementRecord, Origin};
use crate::store::StagingStore;

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    /// Records appended to the ledger
    pub merged: usize,
    /// Staged records whose id the ledger already held
    pub already_present: usize,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.merged == 0 && self.already_present == 0
    }
}

/// Stages offline measurements and merges them back into the ledger
#[derive(Debug)]
pub struct OfflineReconciler<S> {
    store: S,
}

impl<S: StagingStore> OfflineReconciler<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist a copy of `record` tagged as recovered-offline.
    ///
    /// Records with a non-finite distance are refused; JSON cannot hold them
    /// and one would make the whole stage unreadable.
    pub fn stage(&self, record: &MeasurementRecord) -> StoreResult<()> {
        let distances = [
            record.pixel_distance(),
            record.physical_distance(),
            record.display_distance(),
        ];
        if !distances.iter().all(|d| d.is_finite()) {
            return Err(StoreError::InvalidRecord(record.id()));
        }
        let staged = record.clone().with_origin(Origin::RecoveredOffline);
        self.store.append(&staged)?;
        log::debug!("staged measurement {} offline", staged.id());
        Ok(())
    }

    /// Records currently waiting to be merged
    pub fn pending(&self) -> StoreResult<Vec<MeasurementRecord>> {
        self.store.load()
    }

    /// Merge every staged record into `ledger` and unstage what was read.
    ///
    /// The ledger is only touched once the store has confirmed the removal,
    /// so a failed pass leaves both sides as they were.
    pub fn reconcile(&self, ledger: &mut MeasurementLedger) -> StoreResult<ReconcileReport> {
        let staged = self.store.load()?;
        if staged.is_empty() {
            return Ok(ReconcileReport::default());
        }

        let mut report = ReconcileReport::default();
        let mut read_ids = Vec::with_capacity(staged.len());
        let mut seen = HashSet::with_capacity(staged.len());
        let mut fresh = Vec::new();

        for record in staged {
            read_ids.push(record.id());
            if ledger.contains(record.id()) || !seen.insert(record.id()) {
                report.already_present += 1;
            } else {
                fresh.push(record);
            }
        }

        self.store.remove(&read_ids)?;

        for record in fresh {
            if ledger.append(record).is_ok() {
                report.merged += 1;
            }
        }

        log::info!(
            "reconciled offline measurements: {} merged, {} already present",
            report.merged,
            report.already_present
        );
        Ok(report)
    }
}
