use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::workflows::applicants::{
    ApplicantId, ApplicantRegistration, ApplicantRepository, InMemoryApplicantRepository,
    ScoreRecord,
};
use crate::workflows::assessment::authority::{
    AuthorityError, RemoteScore, RepositoryScoreAuthority, ScoreAuthority,
};
use crate::workflows::assessment::bank::QuestionBank;
use crate::workflows::assessment::cache::{CacheError, CompletionCache, CompletionMarker};
use crate::workflows::assessment::runner::AssessmentSettings;
use crate::workflows::assessment::scoring::{Answers, ScoringPolicy};

pub(super) fn bank() -> Arc<QuestionBank> {
    Arc::new(QuestionBank::builtin().expect("builtin bank is valid"))
}

pub(super) fn settings(duration_secs: u64) -> AssessmentSettings {
    AssessmentSettings {
        policy: ScoringPolicy::default(),
        duration: Duration::from_secs(duration_secs),
        questions_per_page: 2,
    }
}

pub(super) fn register(repository: &InMemoryApplicantRepository, email: &str) -> ApplicantId {
    repository
        .insert(ApplicantRegistration {
            first_name: "Tunde".to_string(),
            last_name: "Bello".to_string(),
            email: email.to_string(),
            phone: None,
            job_id: Some(2),
        })
        .expect("applicant registered")
        .id
}

pub(super) fn persist_score(repository: &InMemoryApplicantRepository, id: ApplicantId, score: f64) {
    repository
        .record_score(
            id,
            ScoreRecord {
                score,
                passed: score >= 70.0,
                submitted_at: Utc::now(),
            },
        )
        .expect("score persisted");
}

/// Correct answers for the first `count` questions of the bank.
pub(super) fn correct_answers(bank: &QuestionBank, count: usize) -> Answers {
    bank.questions()
        .iter()
        .take(count)
        .map(|question| (question.id, question.correct_option.clone()))
        .collect()
}

/// Repository-backed authority that counts calls and can be switched offline.
pub(super) struct FlakyAuthority {
    inner: RepositoryScoreAuthority<InMemoryApplicantRepository>,
    pub(super) fetch_down: AtomicBool,
    pub(super) record_down: AtomicBool,
    pub(super) fetches: AtomicUsize,
    pub(super) writes: AtomicUsize,
}

impl FlakyAuthority {
    pub(super) fn new(repository: Arc<InMemoryApplicantRepository>) -> Self {
        Self {
            inner: RepositoryScoreAuthority::new(repository),
            fetch_down: AtomicBool::new(false),
            record_down: AtomicBool::new(false),
            fetches: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub(super) fn set_offline(&self, offline: bool) {
        self.fetch_down.store(offline, Ordering::SeqCst);
        self.record_down.store(offline, Ordering::SeqCst);
    }

    pub(super) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScoreAuthority for FlakyAuthority {
    async fn fetch_score(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<Option<RemoteScore>, AuthorityError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.fetch_down.load(Ordering::SeqCst) {
            return Err(AuthorityError::Transport("connection refused".to_string()));
        }
        self.inner.fetch_score(applicant_id).await
    }

    async fn record_score(
        &self,
        applicant_id: ApplicantId,
        score: f64,
        passed: bool,
    ) -> Result<(), AuthorityError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.record_down.load(Ordering::SeqCst) {
            return Err(AuthorityError::Transport("connection reset".to_string()));
        }
        self.inner.record_score(applicant_id, score, passed).await
    }
}

/// Cache whose storage is gone, like a browser with storage disabled.
pub(super) struct BrokenCache;

impl CompletionCache for BrokenCache {
    fn get(&self, _applicant_id: ApplicantId) -> Result<Option<CompletionMarker>, CacheError> {
        Err(CacheError::Poisoned)
    }

    fn put(&self, _applicant_id: ApplicantId, _marker: CompletionMarker) -> Result<(), CacheError> {
        Err(CacheError::Poisoned)
    }

    fn remove(&self, _applicant_id: ApplicantId) -> Result<(), CacheError> {
        Err(CacheError::Poisoned)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
