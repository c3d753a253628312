use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::workflows::applicants::{ApplicantId, ApplicantRepository, RepositoryError, ScoreRecord};

/// Score as reported by the authoritative store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RemoteScore {
    pub score: f64,
    pub passed: Option<bool>,
}

/// Authoritative answer to "has this applicant been scored", plus the conditional write.
#[async_trait]
pub trait ScoreAuthority: Send + Sync {
    async fn fetch_score(&self, applicant_id: ApplicantId)
        -> Result<Option<RemoteScore>, AuthorityError>;

    /// Must fail with [`AuthorityError::Conflict`] when a score is already stored.
    async fn record_score(
        &self,
        applicant_id: ApplicantId,
        score: f64,
        passed: bool,
    ) -> Result<(), AuthorityError>;
}

#[derive(Debug, thiserror::Error)]
pub enum AuthorityError {
    #[error("applicant has already taken the assessment")]
    Conflict,
    #[error("applicant {0} is not registered")]
    UnknownApplicant(ApplicantId),
    #[error("score service unreachable: {0}")]
    Transport(String),
    #[error("score service returned a malformed response: {0}")]
    Malformed(String),
    #[error("score service responded with status {status}: {body}")]
    Unexpected { status: u16, body: String },
}

/// In-process authority backed directly by the applicant repository.
pub struct RepositoryScoreAuthority<R> {
    repository: Arc<R>,
}

impl<R> RepositoryScoreAuthority<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl<R> ScoreAuthority for RepositoryScoreAuthority<R>
where
    R: ApplicantRepository + 'static,
{
    async fn fetch_score(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<Option<RemoteScore>, AuthorityError> {
        let applicant = self
            .repository
            .fetch(applicant_id)
            .map_err(|err| AuthorityError::Transport(err.to_string()))?
            .ok_or(AuthorityError::UnknownApplicant(applicant_id))?;

        Ok(applicant.assessment.map(|record| RemoteScore {
            score: record.score,
            passed: Some(record.passed),
        }))
    }

    async fn record_score(
        &self,
        applicant_id: ApplicantId,
        score: f64,
        passed: bool,
    ) -> Result<(), AuthorityError> {
        let record = ScoreRecord {
            score,
            passed,
            submitted_at: Utc::now(),
        };
        match self.repository.record_score(applicant_id, record) {
            Ok(_) => Ok(()),
            Err(RepositoryError::AlreadyScored(_)) => Err(AuthorityError::Conflict),
            Err(RepositoryError::NotFound) => Err(AuthorityError::UnknownApplicant(applicant_id)),
            Err(other) => Err(AuthorityError::Transport(other.to_string())),
        }
    }
}
