//! JSON file backing for the offline stage
//!
//! The whole stage is one JSON array of measurement records. Every mutation
//! rewrites the file through a temp file and rename; removing the last record
//! deletes the file.
//!
//! The lock only covers one instance. Share a single store per path, as
//! [`Storage::offline_store`](crate::Storage::offline_store) does, rather than
//! opening the same file twice in one process.

use crate::write_atomic;
use cammeasure_core::{MeasurementId, MeasurementRecord, StagingStore, StoreResult};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> StoreResult<Vec<MeasurementRecord>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, records: &[MeasurementRecord]) -> StoreResult<()> {
        if records.is_empty() {
            return match fs::remove_file(&self.path) {
                Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
                _ => Ok(()),
            };
        }
        let bytes = serde_json::to_vec_pretty(records)?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }
}

impl StagingStore for JsonFileStore {
    fn append(&self, record: &MeasurementRecord) -> StoreResult<()> {
        let _guard = self.lock.lock();
        let mut records = self.read()?;
        records.push(record.clone());
        self.write(&records)
    }

    fn load(&self) -> StoreResult<Vec<MeasurementRecord>> {
        let _guard = self.lock.lock();
        self.read()
    }

    fn remove(&self, ids: &[MeasurementId]) -> StoreResult<()> {
        let _guard = self.lock.lock();
        let doomed: HashSet<_> = ids.iter().copied().collect();
        let mut records = self.read()?;
        let before = records.len();
        records.retain(|record| !doomed.contains(&record.id()));
        if records.len() == before {
            return Ok(());
        }
        log::debug!("unstaged {} measurement(s)", before - records.len());
        self.write(&records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cammeasure_core::{
        CalibrationSession, MeasureError, MeasurementLedger, MeasurementSession,
        OfflineReconciler, Origin, Point, ReferenceCatalog, Unit,
    };

    fn calibrated() -> CalibrationSession {
        let mut calibration = CalibrationSession::new();
        calibration.begin(ReferenceCatalog::new().lookup("credit-card").expect("built-in"));
        calibration.submit_point(Point::new(0.0, 0.0)).expect("first point");
        calibration.submit_point(Point::new(100.0, 0.0)).expect("second point");
        calibration
    }

    fn record(length_px: f64) -> MeasurementRecord {
        let calibration = calibrated();
        let mut session = MeasurementSession::new();
        session.start(&calibration).expect("calibrated");
        session
            .submit_point(Point::new(0.0, 0.0), &calibration, Unit::Centimeter)
            .expect("first tap");
        match session
            .submit_point(Point::new(length_px, 0.0), &calibration, Unit::Centimeter)
            .expect("second tap")
        {
            cammeasure_core::MeasurementStep::Completed(record) => record,
            step => panic!("unexpected step {step:?}"),
        }
    }

    #[test]
    fn missing_file_reads_empty() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = JsonFileStore::new(temp.path().join("offlineMeasurements.json"));
        assert!(store.load().expect("load should succeed").is_empty());
        store.remove(&[]).expect("remove should succeed");
    }

    #[test]
    fn records_survive_reopen() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("offlineMeasurements.json");
        let first = record(10.0);
        let second = record(20.0);
        {
            let store = JsonFileStore::new(&path);
            store.append(&first).expect("append should succeed");
            store.append(&second).expect("append should succeed");
        }

        let store = JsonFileStore::new(&path);
        let loaded = store.load().expect("load should succeed");
        let ids: Vec<_> = loaded.iter().map(MeasurementRecord::id).collect();
        assert_eq!(ids, vec![first.id(), second.id()]);
        assert_eq!(loaded[1].display_unit(), Unit::Centimeter);
    }

    #[test]
    fn remove_keeps_unlisted_records() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let store = JsonFileStore::new(temp.path().join("offlineMeasurements.json"));
        let keep = record(10.0);
        let drop = record(20.0);
        store.append(&keep).expect("append should succeed");
        store.append(&drop).expect("append should succeed");

        store.remove(&[drop.id()]).expect("remove should succeed");
        let remaining = store.load().expect("load should succeed");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id(), keep.id());

        store.remove(&[keep.id()]).expect("remove should succeed");
        assert!(!store.path().exists());
    }

    #[test]
    fn reconcile_from_disk() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("offlineMeasurements.json");
        let measured = record(50.0);
        OfflineReconciler::new(JsonFileStore::new(&path))
            .stage(&measured)
            .expect("stage should succeed");

        let reconciler = OfflineReconciler::new(JsonFileStore::new(&path));
        let mut ledger = MeasurementLedger::new();
        let report = reconciler.reconcile(&mut ledger).expect("reconcile should succeed");

        assert_eq!(report.merged, 1);
        let merged = ledger.get(measured.id()).expect("merged record");
        assert_eq!(merged.origin(), Origin::RecoveredOffline);
        assert!((merged.physical_distance() - 4.25).abs() < 1e-12);
        assert!(!path.exists());
    }

    #[test]
    fn non_finite_tap_keeps_stage_readable() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let reconciler =
            OfflineReconciler::new(JsonFileStore::new(temp.path().join("offlineMeasurements.json")));
        let good = record(10.0);
        reconciler.stage(&good).expect("stage should succeed");

        let calibration = calibrated();
        let mut session = MeasurementSession::new();
        session.start(&calibration).expect("calibrated");
        session
            .submit_point(Point::new(0.0, 0.0), &calibration, Unit::Centimeter)
            .expect("first tap");
        assert!(matches!(
            session.submit_point(Point::new(f64::NAN, 0.0), &calibration, Unit::Centimeter),
            Err(MeasureError::InvalidPoint { .. })
        ));

        let mut ledger = MeasurementLedger::new();
        let report = reconciler.reconcile(&mut ledger).expect("stage should stay readable");
        assert_eq!(report.merged, 1);
        assert!(ledger.contains(good.id()));
    }

    #[test]
    fn concurrent_appends_through_shared_store() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let storage = crate::Storage::with_root(temp.path());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let storage = storage.clone();
                std::thread::spawn(move || {
                    let store = storage.offline_store();
                    for i in 0..10 {
                        store.append(&record(10.0 + i as f64)).expect("append should succeed");
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("stager thread should finish");
        }

        let staged = storage.offline_store().load().expect("load should succeed");
        assert_eq!(staged.len(), 40);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("offlineMeasurements.json");
        fs::write(&path, "not json").expect("write should succeed");

        let store = JsonFileStore::new(&path);
        assert!(store.load().is_err());
        assert!(path.exists());
    }
}
