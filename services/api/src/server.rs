use crate::cli::ServeArgs;
use crate::infra::{load_bank, AppState};
use crate::routes::with_platform_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use recruitment::config::AppConfig;
use recruitment::error::AppError;
use recruitment::telemetry;
use recruitment::workflows::applicants::{ApplicantService, InMemoryApplicantRepository};
use recruitment::workflows::assessment::{AssessmentService, AssessmentSettings};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let bank = load_bank(&config.assessment)?;
    let settings = AssessmentSettings::from(&config.assessment);
    let repository = Arc::new(InMemoryApplicantRepository::new());
    let applicant_service = Arc::new(ApplicantService::new(repository.clone()));
    let assessment_service = Arc::new(AssessmentService::new(repository, bank.clone(), settings));

    let app = with_platform_routes(applicant_service, assessment_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        questions = bank.len(),
        bank_version = bank.version(),
        "recruitment assessment service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
