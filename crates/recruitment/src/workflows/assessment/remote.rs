//! HTTP client for the score endpoints exposed by [`super::router::assessment_router`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{error, instrument};

use super::authority::{AuthorityError, RemoteScore, ScoreAuthority};
use crate::workflows::applicants::ApplicantId;

const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub struct HttpScoreAuthority {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct ScoreResponse {
    score: Option<f64>,
    #[serde(default)]
    passed: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ScorePayload {
    score: f64,
    passed: bool,
}

impl HttpScoreAuthority {
    pub fn new(base_url: &str) -> Result<Self, AuthorityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|err| AuthorityError::Transport(err.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn score_url(&self, applicant_id: ApplicantId) -> String {
        format!("{}/api/v1/applicants/{}/score", self.base_url, applicant_id)
    }
}

#[async_trait]
impl ScoreAuthority for HttpScoreAuthority {
    #[instrument(skip_all, fields(applicant_id = %applicant_id))]
    async fn fetch_score(
        &self,
        applicant_id: ApplicantId,
    ) -> Result<Option<RemoteScore>, AuthorityError> {
        let response = self
            .client
            .get(self.score_url(applicant_id))
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => {
                let body = response.text().await.map_err(transport_error)?;
                let payload: ScoreResponse = serde_json::from_str(&body).map_err(|err| {
                    error!(%err, "score lookup returned an undecodable body");
                    AuthorityError::Malformed(err.to_string())
                })?;
                Ok(payload.score.map(|score| RemoteScore {
                    score,
                    passed: payload.passed,
                }))
            }
            StatusCode::NOT_FOUND => Err(AuthorityError::UnknownApplicant(applicant_id)),
            status => Err(unexpected(status, response).await),
        }
    }

    #[instrument(skip_all, fields(applicant_id = %applicant_id))]
    async fn record_score(
        &self,
        applicant_id: ApplicantId,
        score: f64,
        passed: bool,
    ) -> Result<(), AuthorityError> {
        let response = self
            .client
            .put(self.score_url(applicant_id))
            .json(&ScorePayload { score, passed })
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::CONFLICT => Err(AuthorityError::Conflict),
            StatusCode::NOT_FOUND => Err(AuthorityError::UnknownApplicant(applicant_id)),
            status => Err(unexpected(status, response).await),
        }
    }
}

fn transport_error(err: reqwest::Error) -> AuthorityError {
    AuthorityError::Transport(err.to_string())
}

async fn unexpected(status: StatusCode, response: reqwest::Response) -> AuthorityError {
    let body = response.text().await.unwrap_or_default();
    AuthorityError::Unexpected {
        status: status.as_u16(),
        body,
    }
}
