use std::sync::Arc;

use axum::response::Response;
use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::workflows::applicants::domain::{
    Applicant, ApplicantId, ApplicantRegistration, ScoreRecord, StageUpdate,
};
use crate::workflows::applicants::repository::{
    ApplicantRepository, InMemoryApplicantRepository, RepositoryError,
};
use crate::workflows::applicants::{applicant_router, ApplicantService};

pub(super) fn registration() -> ApplicantRegistration {
    registration_for("ada.obi@example.com")
}

pub(super) fn registration_for(email: &str) -> ApplicantRegistration {
    ApplicantRegistration {
        first_name: "Ada".to_string(),
        last_name: "Obi".to_string(),
        email: email.to_string(),
        phone: Some("+234 800 000 0000".to_string()),
        job_id: Some(4),
    }
}

pub(super) fn submitted_at() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2025-09-24T10:00:00Z")
        .expect("valid timestamp")
        .with_timezone(&Utc)
}

pub(super) fn score(score: f64, passed: bool) -> ScoreRecord {
    ScoreRecord {
        score,
        passed,
        submitted_at: submitted_at(),
    }
}

pub(super) fn build_service() -> (
    ApplicantService<InMemoryApplicantRepository>,
    Arc<InMemoryApplicantRepository>,
) {
    let repository = Arc::new(InMemoryApplicantRepository::new());
    (ApplicantService::new(repository.clone()), repository)
}

pub(super) fn router_with_service(
    service: ApplicantService<InMemoryApplicantRepository>,
) -> axum::Router {
    applicant_router(Arc::new(service))
}

pub(super) struct UnavailableRepository;

impl ApplicantRepository for UnavailableRepository {
    fn insert(&self, _registration: ApplicantRegistration) -> Result<Applicant, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: ApplicantId) -> Result<Option<Applicant>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_stage(
        &self,
        _id: ApplicantId,
        _update: StageUpdate,
    ) -> Result<Applicant, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn record_score(
        &self,
        _id: ApplicantId,
        _record: ScoreRecord,
    ) -> Result<Applicant, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
