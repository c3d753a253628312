use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::workflows::applicants::ApplicantId;

/// Local "already attempted" marker. Its presence alone blocks a new attempt from this client.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionMarker {
    pub score: Option<f64>,
    pub passed: Option<bool>,
    /// Whether the server is known to hold a score for the applicant.
    pub confirmed: bool,
    pub recorded_at: DateTime<Utc>,
}

impl CompletionMarker {
    /// Written before the score reaches the server.
    pub fn pending(score: f64, passed: bool, recorded_at: DateTime<Utc>) -> Self {
        Self {
            score: Some(score),
            passed: Some(passed),
            confirmed: false,
            recorded_at,
        }
    }

    pub fn confirmed(score: Option<f64>, passed: Option<bool>, recorded_at: DateTime<Utc>) -> Self {
        Self {
            score,
            passed,
            confirmed: true,
            recorded_at,
        }
    }

    pub fn confirm(self) -> Self {
        Self {
            confirmed: true,
            ..self
        }
    }
}

/// Client-side store of completion markers keyed by applicant.
pub trait CompletionCache: Send + Sync {
    fn get(&self, applicant_id: ApplicantId) -> Result<Option<CompletionMarker>, CacheError>;
    fn put(&self, applicant_id: ApplicantId, marker: CompletionMarker) -> Result<(), CacheError>;
    fn remove(&self, applicant_id: ApplicantId) -> Result<(), CacheError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("completion cache io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("completion cache is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("completion cache lock poisoned")]
    Poisoned,
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryCompletionCache {
    markers: Arc<Mutex<BTreeMap<ApplicantId, CompletionMarker>>>,
}

impl InMemoryCompletionCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CompletionCache for InMemoryCompletionCache {
    fn get(&self, applicant_id: ApplicantId) -> Result<Option<CompletionMarker>, CacheError> {
        let markers = self.markers.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(markers.get(&applicant_id).copied())
    }

    fn put(&self, applicant_id: ApplicantId, marker: CompletionMarker) -> Result<(), CacheError> {
        let mut markers = self.markers.lock().map_err(|_| CacheError::Poisoned)?;
        markers.insert(applicant_id, marker);
        Ok(())
    }

    fn remove(&self, applicant_id: ApplicantId) -> Result<(), CacheError> {
        let mut markers = self.markers.lock().map_err(|_| CacheError::Poisoned)?;
        markers.remove(&applicant_id);
        Ok(())
    }
}

/// Markers persisted as one JSON document, so a later run on the same machine still sees them.
#[derive(Debug)]
pub struct FileCompletionCache {
    dir: PathBuf,
    path: PathBuf,
    lock: Mutex<()>,
}

const CACHE_FILE_NAME: &str = "assessment-markers.json";

impl FileCompletionCache {
    /// Use `dir/assessment-markers.json`, creating the directory if needed.
    pub fn in_dir(dir: impl AsRef<Path>) -> Result<Self, CacheError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            path: dir.join(CACHE_FILE_NAME),
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<ApplicantId, CompletionMarker>, CacheError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_all(&self, markers: &BTreeMap<ApplicantId, CompletionMarker>) -> Result<(), CacheError> {
        let mut staging = NamedTempFile::new_in(&self.dir)?;
        staging.write_all(&serde_json::to_vec_pretty(markers)?)?;
        staging.as_file().sync_all()?;
        staging.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }

    fn modify(
        &self,
        apply: impl FnOnce(&mut BTreeMap<ApplicantId, CompletionMarker>),
    ) -> Result<(), CacheError> {
        let _guard = self.lock.lock().map_err(|_| CacheError::Poisoned)?;
        // A corrupt document is replaced; the marker being written must land.
        let mut markers = match self.read_all() {
            Err(CacheError::Corrupt(err)) => {
                warn!(path = %self.path.display(), %err, "discarding corrupt completion cache");
                BTreeMap::new()
            }
            other => other?,
        };
        apply(&mut markers);
        self.write_all(&markers)
    }
}

impl CompletionCache for FileCompletionCache {
    fn get(&self, applicant_id: ApplicantId) -> Result<Option<CompletionMarker>, CacheError> {
        let _guard = self.lock.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(self.read_all()?.get(&applicant_id).copied())
    }

    fn put(&self, applicant_id: ApplicantId, marker: CompletionMarker) -> Result<(), CacheError> {
        self.modify(|markers| {
            markers.insert(applicant_id, marker);
        })
    }

    fn remove(&self, applicant_id: ApplicantId) -> Result<(), CacheError> {
        self.modify(|markers| {
            markers.remove(&applicant_id);
        })
    }
}
