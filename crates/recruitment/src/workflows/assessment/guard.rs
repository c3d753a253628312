use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::authority::{AuthorityError, ScoreAuthority};
use super::cache::{CompletionCache, CompletionMarker};
use crate::workflows::applicants::ApplicantId;

/// Whether an applicant may start the assessment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Eligibility {
    Eligible,
    AlreadyCompleted { prior_score: Option<f64> },
}

/// What happened to the score after a submission was accepted locally.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
    /// The server holds the score.
    Recorded,
    /// The server could not be reached; the local marker holds the score until the next
    /// eligibility check replays it.
    PendingSync { reason: String },
}

#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("could not confirm assessment eligibility: {0}")]
    EligibilityUnavailable(AuthorityError),
    #[error("applicant has already taken the assessment")]
    AlreadyScored { prior_score: Option<f64> },
    #[error("applicant {0} is not registered")]
    UnknownApplicant(ApplicantId),
}

/// Reconciles the local completion cache with the authoritative score store.
///
/// The server decides; the cache only short-circuits a client that already finished, including
/// one whose score never reached the server.
pub struct AttemptGuard<C, A> {
    cache: Arc<C>,
    authority: Arc<A>,
}

impl<C, A> AttemptGuard<C, A>
where
    C: CompletionCache,
    A: ScoreAuthority,
{
    pub fn new(cache: Arc<C>, authority: Arc<A>) -> Self {
        Self { cache, authority }
    }

    pub async fn check_eligibility(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<Eligibility, GuardError> {
        let local = self.read_marker(applicant_id);

        match self.authority.fetch_score(applicant_id).await {
            Ok(Some(remote)) => {
                let already_synced = local.is_some_and(|marker| {
                    marker.confirmed && marker.score == Some(remote.score)
                });
                if !already_synced {
                    if local.is_none() {
                        info!(%applicant_id, "server reports a prior score; correcting local cache");
                    }
                    self.write_marker(
                        applicant_id,
                        CompletionMarker::confirmed(Some(remote.score), remote.passed, Utc::now()),
                    );
                }
                debug!(%applicant_id, score = remote.score, "applicant already scored");
                Ok(Eligibility::AlreadyCompleted {
                    prior_score: Some(remote.score),
                })
            }
            Ok(None) => match local {
                None => {
                    debug!(%applicant_id, "applicant eligible");
                    Ok(Eligibility::Eligible)
                }
                Some(marker) => {
                    if !marker.confirmed {
                        self.replay_pending(applicant_id, marker).await;
                    }
                    Ok(Eligibility::AlreadyCompleted {
                        prior_score: marker.score,
                    })
                }
            },
            Err(AuthorityError::UnknownApplicant(id)) => Err(GuardError::UnknownApplicant(id)),
            Err(err) => match local {
                Some(marker) => {
                    warn!(%applicant_id, %err, "score lookup failed; blocking on local marker");
                    Ok(Eligibility::AlreadyCompleted {
                        prior_score: marker.score,
                    })
                }
                None => {
                    warn!(%applicant_id, %err, "score lookup failed; eligibility unknown");
                    Err(GuardError::EligibilityUnavailable(err))
                }
            },
        }
    }

    /// Mark the attempt completed locally, then perform the conditional server write.
    pub async fn record_attempt(
        &self,
        applicant_id: ApplicantId,
        score: f64,
        passed: bool,
    ) -> Result<RecordOutcome, GuardError> {
        let pending = CompletionMarker::pending(score, passed, Utc::now());
        self.write_marker(applicant_id, pending);

        match self.authority.record_score(applicant_id, score, passed).await {
            Ok(()) => {
                self.write_marker(applicant_id, pending.confirm());
                info!(%applicant_id, score, passed, "assessment score recorded");
                Ok(RecordOutcome::Recorded)
            }
            Err(AuthorityError::Conflict) => {
                let prior = match self.authority.fetch_score(applicant_id).await {
                    Ok(remote) => remote,
                    Err(err) => {
                        warn!(%applicant_id, %err, "could not read the competing score");
                        None
                    }
                };
                self.write_marker(
                    applicant_id,
                    CompletionMarker::confirmed(
                        prior.map(|remote| remote.score),
                        prior.and_then(|remote| remote.passed),
                        Utc::now(),
                    ),
                );
                info!(%applicant_id, "score write rejected; applicant already scored");
                Err(GuardError::AlreadyScored {
                    prior_score: prior.map(|remote| remote.score),
                })
            }
            Err(AuthorityError::UnknownApplicant(id)) => Err(GuardError::UnknownApplicant(id)),
            Err(err) => {
                warn!(%applicant_id, %err, "score not persisted; kept as pending local marker");
                Ok(RecordOutcome::PendingSync {
                    reason: err.to_string(),
                })
            }
        }
    }

    /// One conditional write of a score the server never acknowledged.
    async fn replay_pending(&self, applicant_id: ApplicantId, marker: CompletionMarker) {
        let (Some(score), Some(passed)) = (marker.score, marker.passed) else {
            return;
        };

        match self.authority.record_score(applicant_id, score, passed).await {
            Ok(()) | Err(AuthorityError::Conflict) => {
                info!(%applicant_id, "pending score synchronised with server");
                self.write_marker(applicant_id, marker.confirm());
            }
            Err(err) => {
                warn!(%applicant_id, %err, "pending score still not persisted");
            }
        }
    }

    fn read_marker(&self, applicant_id: ApplicantId) -> Option<CompletionMarker> {
        match self.cache.get(applicant_id) {
            Ok(marker) => marker,
            Err(err) => {
                warn!(%applicant_id, %err, "completion cache unreadable; treating as empty");
                None
            }
        }
    }

    fn write_marker(&self, applicant_id: ApplicantId, marker: CompletionMarker) {
        if let Err(err) = self.cache.put(applicant_id, marker) {
            warn!(%applicant_id, %err, "failed to write completion marker");
        }
    }
}
