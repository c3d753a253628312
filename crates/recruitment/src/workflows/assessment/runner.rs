use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{watch, Mutex};
use tracing::{info, warn};

use super::authority::ScoreAuthority;
use super::bank::{QuestionBank, QuestionId};
use super::cache::CompletionCache;
use super::guard::{AttemptGuard, Eligibility, GuardError, RecordOutcome};
use super::scoring::{AttemptScore, ScoringPolicy};
use super::session::{
    AssessmentSession, AttemptState, NavigationDecision, NavigationEvent, PageView, SessionError,
    SubmitTrigger,
};
use super::timer::SessionTimer;
use crate::config::AssessmentConfig;
use crate::workflows::applicants::ApplicantId;

/// Attempt parameters shared by every session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssessmentSettings {
    pub policy: ScoringPolicy,
    pub duration: Duration,
    pub questions_per_page: usize,
}

impl Default for AssessmentSettings {
    fn default() -> Self {
        Self::from(&AssessmentConfig::default())
    }
}

impl From<&AssessmentConfig> for AssessmentSettings {
    fn from(config: &AssessmentConfig) -> Self {
        Self {
            policy: ScoringPolicy::new(config.pass_threshold),
            duration: config.duration,
            questions_per_page: config.questions_per_page,
        }
    }
}

/// Final state of an attempt as shown to the applicant.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Recorded {
        result: AttemptScore,
        trigger: SubmitTrigger,
    },
    /// Graded and shown locally, but the server has not stored the score yet.
    PendingSync {
        result: AttemptScore,
        trigger: SubmitTrigger,
        reason: String,
    },
    Blocked {
        prior_score: Option<f64>,
    },
}

/// Opens attempts for applicants.
pub struct AssessmentRunner<C, A> {
    guard: Arc<AttemptGuard<C, A>>,
    bank: Arc<QuestionBank>,
    settings: AssessmentSettings,
}

impl<C, A> AssessmentRunner<C, A>
where
    C: CompletionCache + 'static,
    A: ScoreAuthority + 'static,
{
    pub fn new(
        guard: Arc<AttemptGuard<C, A>>,
        bank: Arc<QuestionBank>,
        settings: AssessmentSettings,
    ) -> Self {
        Self {
            guard,
            bank,
            settings,
        }
    }

    /// Check eligibility and either block the attempt or start it with a running timer.
    pub async fn open(&self, applicant_id: ApplicantId) -> Result<Attempt<C, A>, GuardError> {
        let mut session = AssessmentSession::new(
            applicant_id,
            self.bank.clone(),
            self.settings.policy,
            self.settings.questions_per_page,
        );

        let eligibility = self.guard.check_eligibility(applicant_id).await?;
        session.resolve(eligibility, Utc::now());

        let (finished, _) = watch::channel(None);
        let timer = match eligibility {
            Eligibility::Eligible => Some(SessionTimer::new(self.settings.duration)),
            Eligibility::AlreadyCompleted { prior_score } => {
                finished.send_replace(Some(SubmissionOutcome::Blocked { prior_score }));
                None
            }
        };

        let shared = Arc::new(AttemptShared {
            session: Mutex::new(session),
            guard: self.guard.clone(),
            timer,
            finished,
        });

        if let Some(timer) = &shared.timer {
            let weak: Weak<AttemptShared<C, A>> = Arc::downgrade(&shared);
            timer.start(move || async move {
                if let Some(shared) = weak.upgrade() {
                    if let Err(err) = shared.submit(SubmitTrigger::Timeout).await {
                        info!(%applicant_id, %err, "timer expired after the attempt closed");
                    }
                }
            });
            info!(%applicant_id, secs = self.settings.duration.as_secs(), "assessment started");
        }

        Ok(Attempt {
            applicant_id,
            shared,
        })
    }
}

struct AttemptShared<C, A> {
    session: Mutex<AssessmentSession>,
    guard: Arc<AttemptGuard<C, A>>,
    timer: Option<SessionTimer>,
    finished: watch::Sender<Option<SubmissionOutcome>>,
}

impl<C, A> AttemptShared<C, A>
where
    C: CompletionCache,
    A: ScoreAuthority,
{
    /// The only submission path; both the submit action and timer expiry land here.
    async fn submit(&self, trigger: SubmitTrigger) -> Result<SubmissionOutcome, SessionError> {
        let (applicant_id, result) = {
            let mut session = self.session.lock().await;
            let result = session.begin_submission(trigger, Utc::now())?;
            (session.applicant_id(), result)
        };

        if let Some(timer) = &self.timer {
            timer.cancel();
        }

        let outcome = match self
            .guard
            .record_attempt(applicant_id, result.score, result.passed)
            .await
        {
            Ok(RecordOutcome::Recorded) => {
                self.session.lock().await.complete_submission();
                SubmissionOutcome::Recorded { result, trigger }
            }
            Ok(RecordOutcome::PendingSync { reason }) => {
                self.session.lock().await.complete_submission();
                SubmissionOutcome::PendingSync {
                    result,
                    trigger,
                    reason,
                }
            }
            Err(GuardError::AlreadyScored { prior_score }) => {
                self.session.lock().await.reject_submission(prior_score);
                SubmissionOutcome::Blocked { prior_score }
            }
            Err(err) => {
                warn!(%applicant_id, %err, "score could not be recorded");
                self.session.lock().await.complete_submission();
                SubmissionOutcome::PendingSync {
                    result,
                    trigger,
                    reason: err.to_string(),
                }
            }
        };

        self.finished.send_replace(Some(outcome.clone()));
        Ok(outcome)
    }
}

/// Handle to one open attempt.
pub struct Attempt<C, A> {
    applicant_id: ApplicantId,
    shared: Arc<AttemptShared<C, A>>,
}

impl<C, A> Attempt<C, A>
where
    C: CompletionCache,
    A: ScoreAuthority,
{
    pub fn applicant_id(&self) -> ApplicantId {
        self.applicant_id
    }

    pub async fn state(&self) -> AttemptState {
        self.shared.session.lock().await.state()
    }

    pub async fn answer(&self, question: QuestionId, option: &str) -> Result<(), SessionError> {
        self.shared.session.lock().await.select(question, option)
    }

    pub async fn next_page(&self) -> Result<PageView, SessionError> {
        let mut session = self.shared.session.lock().await;
        session.next_page()?;
        Ok(session.page_view())
    }

    pub async fn previous_page(&self) -> Result<PageView, SessionError> {
        let mut session = self.shared.session.lock().await;
        session.previous_page()?;
        Ok(session.page_view())
    }

    pub async fn page_view(&self) -> PageView {
        self.shared.session.lock().await.page_view()
    }

    pub async fn is_final_page(&self) -> bool {
        self.shared.session.lock().await.is_final_page()
    }

    pub async fn navigate(&self, event: NavigationEvent) -> NavigationDecision {
        self.shared.session.lock().await.navigate(event)
    }

    /// Submit from the final page.
    pub async fn submit(&self) -> Result<SubmissionOutcome, SessionError> {
        self.shared.submit(SubmitTrigger::Manual).await
    }

    /// Time left on the countdown; `None` for attempts that never started.
    pub fn remaining(&self) -> Option<Duration> {
        self.shared.timer.as_ref().map(SessionTimer::remaining)
    }

    pub fn outcome(&self) -> Option<SubmissionOutcome> {
        self.shared.finished.borrow().clone()
    }

    /// Resolve once the attempt is blocked or submitted, by either trigger.
    pub async fn wait_for_completion(&self) -> SubmissionOutcome {
        let mut finished = self.shared.finished.subscribe();
        loop {
            let current = finished.borrow_and_update().clone();
            if let Some(outcome) = current {
                return outcome;
            }
            // The sender lives in `shared`, which `self` keeps alive.
            if finished.changed().await.is_err() {
                return SubmissionOutcome::Blocked { prior_score: None };
            }
        }
    }
}

impl<C, A> Drop for Attempt<C, A> {
    fn drop(&mut self) {
        if let Some(timer) = &self.shared.timer {
            timer.cancel();
        }
    }
}
