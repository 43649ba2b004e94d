//! File-backed best-time record.
//!
//! The record lives in a single JSON file:
//! ```text
//! {
//!   "schema_version": 1,
//!   "key": "record",
//!   "best_time_secs": 83.25,
//!   "sha256": "<hex digest of key, schema and time>"
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const RECORD_SCHEMA_VERSION: u32 = 1;

/// Identifier the best time is stored under.
pub const RECORD_KEY: &str = "record";

/// Errors from record persistence.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("integrity check failed: expected {expected}, got {actual}")]
    IntegrityMismatch { expected: String, actual: String },
    #[error("schema version mismatch: file has v{file_version}, expected v{expected_version}")]
    SchemaMismatch {
        file_version: u32,
        expected_version: u32,
    },
    #[error("record key mismatch: file has {0:?}")]
    KeyMismatch(String),
    #[error("invalid record time: {0}")]
    InvalidTime(f64),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RecordFile {
    schema_version: u32,
    key: String,
    best_time_secs: f64,
    sha256: String,
}

/// Best completion time, persisted between runs.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored best time. A missing file is `Ok(None)`; a file that
    /// fails any check is an error.
    pub fn load(&self) -> Result<Option<f64>, RecordError> {
        let file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let record: RecordFile = serde_json::from_reader(file)?;
        if record.schema_version != RECORD_SCHEMA_VERSION {
            return Err(RecordError::SchemaMismatch {
                file_version: record.schema_version,
                expected_version: RECORD_SCHEMA_VERSION,
            });
        }
        if record.key != RECORD_KEY {
            return Err(RecordError::KeyMismatch(record.key));
        }
        let expected = digest(record.schema_version, &record.key, record.best_time_secs);
        if record.sha256 != expected {
            return Err(RecordError::IntegrityMismatch {
                expected,
                actual: record.sha256,
            });
        }
        validate(record.best_time_secs)?;
        Ok(Some(record.best_time_secs))
    }

    /// Like [`load`](Self::load), but a damaged record is logged and ignored.
    pub fn load_or_ignore(&self) -> Option<f64> {
        match self.load() {
            Ok(best) => best,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring best-time record");
                None
            }
        }
    }

    /// Overwrite the stored best time.
    pub fn save(&self, best_time_secs: f64) -> Result<(), RecordError> {
        validate(best_time_secs)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let record = RecordFile {
            schema_version: RECORD_SCHEMA_VERSION,
            key: RECORD_KEY.to_string(),
            best_time_secs,
            sha256: digest(RECORD_SCHEMA_VERSION, RECORD_KEY, best_time_secs),
        };
        let tmp = self.path.with_extension("json.tmp");
        serde_json::to_writer_pretty(std::fs::File::create(&tmp)?, &record)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), best_time_secs, "record saved");
        Ok(())
    }

    /// Store `time_secs` if it beats the current record (or there is none,
    /// or the stored one is unreadable). Returns whether it was stored.
    pub fn offer(&self, time_secs: f64) -> Result<bool, RecordError> {
        validate(time_secs)?;
        match self.load_or_ignore() {
            Some(best) if best <= time_secs => Ok(false),
            _ => {
                self.save(time_secs)?;
                Ok(true)
            }
        }
    }

    /// Delete the record. Clearing an absent record is not an error.
    pub fn clear(&self) -> Result<(), RecordError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn validate(time_secs: f64) -> Result<(), RecordError> {
    if time_secs.is_finite() && time_secs >= 0.0 {
        Ok(())
    } else {
        Err(RecordError::InvalidTime(time_secs))
    }
}

fn digest(schema_version: u32, key: &str, best_time_secs: f64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(schema_version.to_le_bytes());
    hasher.update(key.as_bytes());
    hasher.update(best_time_secs.to_le_bytes());
    let result = hasher.finalize();
    result.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, RecordStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::new(dir.path().join("record.json"));
        (dir, store)
    }

    #[test]
    fn missing_record_is_none() {
        let (_dir, store) = store();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn save_then_load() {
        let (_dir, store) = store();
        store.save(83.25).unwrap();
        assert_eq!(store.load().unwrap(), Some(83.25));
    }

    #[test]
    fn offer_keeps_the_best() {
        let (_dir, store) = store();
        assert!(store.offer(90.0).unwrap());
        assert!(!store.offer(95.0).unwrap());
        assert!(!store.offer(90.0).unwrap());
        assert!(store.offer(60.5).unwrap());
        assert_eq!(store.load().unwrap(), Some(60.5));
    }

    #[test]
    fn tampered_time_fails_closed() {
        let (_dir, store) = store();
        store.save(120.0).unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        std::fs::write(store.path(), text.replace("120.0", "1.0")).unwrap();
        assert!(matches!(
            store.load(),
            Err(RecordError::IntegrityMismatch { .. })
        ));
        assert_eq!(store.load_or_ignore(), None);
        // A damaged record is replaced by the next offer.
        assert!(store.offer(130.0).unwrap());
        assert_eq!(store.load().unwrap(), Some(130.0));
    }

    #[test]
    fn schema_mismatch_detected() {
        let (_dir, store) = store();
        store.save(10.0).unwrap();
        let text = std::fs::read_to_string(store.path()).unwrap();
        std::fs::write(
            store.path(),
            text.replace("\"schema_version\": 1", "\"schema_version\": 99"),
        )
        .unwrap();
        assert!(matches!(
            store.load(),
            Err(RecordError::SchemaMismatch {
                file_version: 99,
                expected_version: 1
            })
        ));
    }

    #[test]
    fn garbage_is_an_error() {
        let (_dir, store) = store();
        std::fs::write(store.path(), "not json").unwrap();
        assert!(matches!(store.load(), Err(RecordError::Json(_))));
    }

    #[test]
    fn invalid_times_rejected() {
        let (_dir, store) = store();
        assert!(matches!(store.save(-1.0), Err(RecordError::InvalidTime(_))));
        assert!(store.offer(f64::NAN).is_err());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn clear_removes_record() {
        let (_dir, store) = store();
        store.clear().unwrap();
        store.save(5.0).unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
    }
}
