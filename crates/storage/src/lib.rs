use cammeasure_core::{ConfigError, Preferences, OFFLINE_MEASUREMENTS_KEY};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod json_store;

pub use json_store::JsonFileStore;

const PREFS_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("unable to resolve local data directory")]
    NoDataDirectory,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("unsupported preferences version {0}")]
    UnsupportedVersion(u32),
    #[error("invalid preferences: {0}")]
    Invalid(#[from] ConfigError),
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    offline: Arc<JsonFileStore>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PreferencesEnvelope {
    version: u32,
    preferences: Preferences,
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        let dirs = ProjectDirs::from("dev", "CamMeasure", "CamMeasure")
            .ok_or(StorageError::NoDataDirectory)?;

        Ok(Self::with_root(dirs.data_local_dir()))
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let offline =
            Arc::new(JsonFileStore::new(root.join(format!("{OFFLINE_MEASUREMENTS_KEY}.json"))));
        Self { root, offline }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn load_preferences(&self) -> Result<Preferences, StorageError> {
        let path = self.preferences_path();
        if !path.exists() {
            return Ok(Preferences::default());
        }

        let bytes = fs::read(path)?;
        let envelope: PreferencesEnvelope = serde_json::from_slice(&bytes)?;
        if envelope.version > PREFS_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedVersion(envelope.version));
        }
        envelope.preferences.validate()?;

        Ok(envelope.preferences)
    }

    pub fn save_preferences(&self, preferences: &Preferences) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;

        let envelope =
            PreferencesEnvelope { version: PREFS_SCHEMA_VERSION, preferences: preferences.clone() };

        let bytes = serde_json::to_vec_pretty(&envelope)?;
        write_atomic(&self.preferences_path(), &bytes)?;
        log::debug!("saved preferences to {}", self.preferences_path().display());
        Ok(())
    }

    /// Durable stage for measurements taken offline.
    ///
    /// Every call (and every clone of this `Storage`) hands out the same store,
    /// so writers in one process share its lock.
    pub fn offline_store(&self) -> Arc<JsonFileStore> {
        Arc::clone(&self.offline)
    }

    fn preferences_path(&self) -> PathBuf {
        self.root.join("preferences.json")
    }
}

/// Write through a sibling temp file so readers never see a partial file
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, bytes)?;
    fs::rename(&temp_path, path)
}
