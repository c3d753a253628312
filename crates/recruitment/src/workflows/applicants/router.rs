use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde_json::json;

use super::domain::{ApplicantId, ApplicantRegistration, StageUpdate};
use super::repository::{ApplicantRepository, RepositoryError};
use super::service::{ApplicantService, ApplicantServiceError};

/// Router builder exposing applicant intake, lookup, and stage updates.
pub fn applicant_router<R>(service: Arc<ApplicantService<R>>) -> Router
where
    R: ApplicantRepository + 'static,
{
    Router::new()
        .route("/api/v1/applicants", post(register_handler::<R>))
        .route("/api/v1/applicants/:applicant_id", get(fetch_handler::<R>))
        .route(
            "/api/v1/applicants/:applicant_id/stage",
            put(stage_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn register_handler<R>(
    State(service): State<Arc<ApplicantService<R>>>,
    axum::Json(registration): axum::Json<ApplicantRegistration>,
) -> Response
where
    R: ApplicantRepository + 'static,
{
    match service.register(registration) {
        Ok(applicant) => (StatusCode::CREATED, axum::Json(applicant.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn fetch_handler<R>(
    State(service): State<Arc<ApplicantService<R>>>,
    Path(applicant_id): Path<u64>,
) -> Response
where
    R: ApplicantRepository + 'static,
{
    match service.get(ApplicantId(applicant_id)) {
        Ok(applicant) => (StatusCode::OK, axum::Json(applicant.view())).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn stage_handler<R>(
    State(service): State<Arc<ApplicantService<R>>>,
    Path(applicant_id): Path<u64>,
    axum::Json(update): axum::Json<StageUpdate>,
) -> Response
where
    R: ApplicantRepository + 'static,
{
    match service.update_stage(ApplicantId(applicant_id), update) {
        Ok(applicant) => (StatusCode::OK, axum::Json(applicant.view())).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: ApplicantServiceError) -> Response {
    let status = match &error {
        ApplicantServiceError::Registration(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ApplicantServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        ApplicantServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ApplicantServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
