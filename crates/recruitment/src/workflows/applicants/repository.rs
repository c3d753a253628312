use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use super::domain::{
    AlreadyScored, Applicant, ApplicantId, ApplicantRegistration, ScoreRecord, StageUpdate,
};

/// Storage abstraction for applicant records. Constructed once at startup and shared by
/// handlers, so every implementation must be safe to call from concurrent requests.
pub trait ApplicantRepository: Send + Sync {
    fn insert(&self, registration: ApplicantRegistration) -> Result<Applicant, RepositoryError>;
    fn fetch(&self, id: ApplicantId) -> Result<Option<Applicant>, RepositoryError>;
    fn update_stage(&self, id: ApplicantId, update: StageUpdate)
        -> Result<Applicant, RepositoryError>;
    /// Persist a score only if the applicant has none at write time. The check and the write
    /// must be a single atomic step.
    fn record_score(&self, id: ApplicantId, record: ScoreRecord)
        -> Result<Applicant, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error(transparent)]
    AlreadyScored(#[from] AlreadyScored),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Default)]
struct Store {
    next_id: u64,
    records: BTreeMap<ApplicantId, Applicant>,
}

/// Mutex-guarded store used by the service binary and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryApplicantRepository {
    store: Arc<Mutex<Store>>,
}

impl InMemoryApplicantRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Store>, RepositoryError> {
        self.store
            .lock()
            .map_err(|_| RepositoryError::Unavailable("applicant store poisoned".to_string()))
    }
}

impl ApplicantRepository for InMemoryApplicantRepository {
    fn insert(&self, registration: ApplicantRegistration) -> Result<Applicant, RepositoryError> {
        let mut store = self.lock()?;
        let email = registration.email.trim();
        if store
            .records
            .values()
            .any(|existing| existing.email.eq_ignore_ascii_case(email))
        {
            return Err(RepositoryError::Conflict);
        }

        store.next_id += 1;
        let id = ApplicantId(store.next_id);
        let applicant = Applicant::from_registration(id, registration, Utc::now());
        store.records.insert(id, applicant.clone());
        Ok(applicant)
    }

    fn fetch(&self, id: ApplicantId) -> Result<Option<Applicant>, RepositoryError> {
        Ok(self.lock()?.records.get(&id).cloned())
    }

    fn update_stage(
        &self,
        id: ApplicantId,
        update: StageUpdate,
    ) -> Result<Applicant, RepositoryError> {
        let mut store = self.lock()?;
        let applicant = store
            .records
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        applicant.apply_stage(update);
        Ok(applicant.clone())
    }

    fn record_score(
        &self,
        id: ApplicantId,
        record: ScoreRecord,
    ) -> Result<Applicant, RepositoryError> {
        let mut store = self.lock()?;
        let applicant = store
            .records
            .get_mut(&id)
            .ok_or(RepositoryError::NotFound)?;
        applicant.apply_score(record)?;
        Ok(applicant.clone())
    }
}
