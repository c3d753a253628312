use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use recruitment::workflows::applicants::{applicant_router, ApplicantRepository, ApplicantService};
use recruitment::workflows::assessment::{assessment_router, AssessmentService};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_platform_routes<R>(
    applicants: Arc<ApplicantService<R>>,
    assessment: Arc<AssessmentService<R>>,
) -> axum::Router
where
    R: ApplicantRepository + 'static,
{
    applicant_router(applicants)
        .merge(assessment_router(assessment))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use recruitment::workflows::applicants::InMemoryApplicantRepository;
    use recruitment::workflows::assessment::{AssessmentSettings, QuestionBank};
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app_state(ready: bool) -> AppState {
        let recorder = PrometheusBuilder::new().build_recorder();
        AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(recorder.handle()),
        }
    }

    fn platform() -> axum::Router {
        let repository = Arc::new(InMemoryApplicantRepository::new());
        let bank = Arc::new(QuestionBank::builtin().expect("builtin bank"));
        let applicants = Arc::new(ApplicantService::new(repository.clone()));
        let assessment = Arc::new(AssessmentService::new(
            repository,
            bank,
            AssessmentSettings::default(),
        ));
        with_platform_routes(applicants, assessment).layer(Extension(app_state(true)))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 16 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json payload")
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn readiness_reports_initializing_until_bound() {
        let response = readiness_endpoint(Extension(app_state(false)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = readiness_endpoint(Extension(app_state(true)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_route_is_mounted() {
        let response = platform()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn registered_applicant_can_be_scored_once() {
        let app = platform();

        let created = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/v1/applicants",
                json!({
                    "first_name": "Ngozi",
                    "last_name": "Eze",
                    "email": "ngozi@example.com",
                    "phone": null,
                    "job_id": 3
                }),
            ))
            .await
            .expect("route executes");
        assert_eq!(created.status(), StatusCode::CREATED);
        let id = json_body(created).await["id"].as_u64().expect("numeric id");

        let first = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/applicants/{id}/score"),
                json!({ "score": 85.0, "passed": true }),
            ))
            .await
            .expect("route executes");
        assert_eq!(first.status(), StatusCode::OK);

        let second = app
            .clone()
            .oneshot(json_request(
                "PUT",
                &format!("/api/v1/applicants/{id}/score"),
                json!({ "score": 15.0, "passed": false }),
            ))
            .await
            .expect("route executes");
        assert_eq!(second.status(), StatusCode::CONFLICT);

        let applicant = app
            .oneshot(
                Request::get(format!("/api/v1/applicants/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("route executes");
        let payload = json_body(applicant).await;
        assert_eq!(payload["score"], json!(85.0));
        assert_eq!(payload["stage"], json!("assessment"));
    }
}
