use crate::cli::ServeArgs;
use crate::infra::{
    sample_catalog, sample_directory, AppState, InMemoryApplicationStore,
    InMemoryNotificationSink,
};
use crate::routes::portal_routes;
use admitflow::admissions::AdmissionsService;
use admitflow::config::AppConfig;
use admitflow::directory::DirectoryService;
use admitflow::error::AppError;
use admitflow::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
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

    // Demo-grade backends: a seeded catalog and directory, empty applications.
    let applications = Arc::new(InMemoryApplicationStore::default());
    let catalog = Arc::new(sample_catalog());
    let directory = Arc::new(sample_directory());
    let notifications = Arc::new(InMemoryNotificationSink::default());

    let admissions_service = Arc::new(AdmissionsService::new(
        applications,
        catalog,
        notifications.clone(),
        config.policy.clone(),
    ));
    let directory_service = Arc::new(DirectoryService::new(
        directory,
        notifications,
        config.policy.clone(),
    ));

    let app = portal_routes(admissions_service, directory_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "admissions portal ready");

    axum::serve(listener, app).await?;
    Ok(())
}
