use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::applicants::{ApplicantServiceError, RepositoryError};
use crate::workflows::assessment::{AuthorityError, CacheError, GuardError, QuestionBankError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    QuestionBank(QuestionBankError),
    Cache(CacheError),
    Authority(AuthorityError),
    Guard(GuardError),
    Applicant(ApplicantServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::QuestionBank(err) => write!(f, "question bank error: {}", err),
            AppError::Cache(err) => write!(f, "completion cache error: {}", err),
            AppError::Authority(err) => write!(f, "score service error: {}", err),
            AppError::Guard(err) => write!(f, "assessment error: {}", err),
            AppError::Applicant(err) => write!(f, "applicant error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::QuestionBank(err) => Some(err),
            AppError::Cache(err) => Some(err),
            AppError::Authority(err) => Some(err),
            AppError::Guard(err) => Some(err),
            AppError::Applicant(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Guard(GuardError::AlreadyScored { .. }) => StatusCode::CONFLICT,
            AppError::Guard(GuardError::UnknownApplicant(_))
            | AppError::Applicant(ApplicantServiceError::Repository(RepositoryError::NotFound)) => {
                StatusCode::NOT_FOUND
            }
            AppError::Applicant(ApplicantServiceError::Registration(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Applicant(ApplicantServiceError::Repository(
                RepositoryError::Conflict | RepositoryError::AlreadyScored(_),
            )) => StatusCode::CONFLICT,
            AppError::Guard(GuardError::EligibilityUnavailable(_)) | AppError::Authority(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::QuestionBank(_)
            | AppError::Cache(_)
            | AppError::Applicant(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<QuestionBankError> for AppError {
    fn from(value: QuestionBankError) -> Self {
        Self::QuestionBank(value)
    }
}

impl From<CacheError> for AppError {
    fn from(value: CacheError) -> Self {
        Self::Cache(value)
    }
}

impl From<AuthorityError> for AppError {
    fn from(value: AuthorityError) -> Self {
        Self::Authority(value)
    }
}

impl From<GuardError> for AppError {
    fn from(value: GuardError) -> Self {
        Self::Guard(value)
    }
}

impl From<ApplicantServiceError> for AppError {
    fn from(value: ApplicantServiceError) -> Self {
        Self::Applicant(value)
    }
}
