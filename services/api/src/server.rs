use crate::cli::ServeArgs;
use crate::infra::{build_infra, AppState};
use crate::routes::with_autopilot_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use jobpilot::config::AppConfig;
use jobpilot::error::AppError;
use jobpilot::scheduler::Scheduler;
use jobpilot::telemetry;
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

    let infra = build_infra(&config.automation);
    let scheduler = Arc::new(Scheduler::new(infra.service.clone()));
    scheduler.spawn_all();

    let app = with_autopilot_routes(infra.service, scheduler)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "job application autopilot ready");

    axum::serve(listener, app).await?;
    Ok(())
}
