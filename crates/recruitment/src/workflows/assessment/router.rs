use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde_json::json;
use tracing::error;

use super::service::{AnswerSheet, AssessmentService, AssessmentServiceError, ScoreSubmission};
use crate::workflows::applicants::{ApplicantId, ApplicantRepository, RepositoryError};

/// Router builder exposing the question sheet and the score endpoints.
pub fn assessment_router<R>(service: Arc<AssessmentService<R>>) -> Router
where
    R: ApplicantRepository + 'static,
{
    Router::new()
        .route("/api/v1/assessment/questions", get(questions_handler::<R>))
        .route(
            "/api/v1/applicants/:applicant_id/score",
            get(score_handler::<R>).put(record_handler::<R>),
        )
        .route(
            "/api/v1/applicants/:applicant_id/check-test",
            get(check_test_handler::<R>),
        )
        .route(
            "/api/v1/applicants/:applicant_id/assessment/submit",
            post(submit_answers_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn questions_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
) -> Response
where
    R: ApplicantRepository + 'static,
{
    (StatusCode::OK, axum::Json(service.question_sheet())).into_response()
}

pub(crate) async fn score_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    Path(applicant_id): Path<u64>,
) -> Response
where
    R: ApplicantRepository + 'static,
{
    match service.score_of(ApplicantId(applicant_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn record_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    Path(applicant_id): Path<u64>,
    axum::Json(submission): axum::Json<ScoreSubmission>,
) -> Response
where
    R: ApplicantRepository + 'static,
{
    match service.record(ApplicantId(applicant_id), submission) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn check_test_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    Path(applicant_id): Path<u64>,
) -> Response
where
    R: ApplicantRepository + 'static,
{
    match service.has_taken(ApplicantId(applicant_id)) {
        Ok(taken) => (StatusCode::OK, axum::Json(json!({ "taken": taken }))).into_response(),
        Err(AssessmentServiceError::Repository(RepositoryError::NotFound)) => {
            let payload = json!({ "taken": false, "error": "applicant not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        Err(other) => {
            error!(applicant_id, %other, "check-test lookup failed");
            let payload = json!({ "taken": false, "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn submit_answers_handler<R>(
    State(service): State<Arc<AssessmentService<R>>>,
    Path(applicant_id): Path<u64>,
    axum::Json(sheet): axum::Json<AnswerSheet>,
) -> Response
where
    R: ApplicantRepository + 'static,
{
    match service.grade_and_record(ApplicantId(applicant_id), sheet) {
        Ok(graded) => (StatusCode::OK, axum::Json(graded)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: AssessmentServiceError) -> Response {
    let status = match &error {
        AssessmentServiceError::InvalidScore(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AssessmentServiceError::Repository(RepositoryError::AlreadyScored(_)) => {
            StatusCode::CONFLICT
        }
        AssessmentServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        AssessmentServiceError::Repository(_) => {
            error!(%error, "assessment repository failure");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
