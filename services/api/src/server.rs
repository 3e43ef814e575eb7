use crate::cli::ServeArgs;
use crate::infra::{in_memory_api, AppState};
use crate::routes::{api_routes, with_operational_routes};
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use clarify::config::AppConfig;
use clarify::decisions::ScoringConfig;
use clarify::error::AppError;
use clarify::telemetry;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

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
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let app = with_operational_routes(api_routes(in_memory_api(config.scoring)))
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        missing_evaluations = config.scoring.missing_evaluations.label(),
        "decision service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// API-only server on an ephemeral local port, used by the demo when no
/// remote base URL is given. Returns the bound address and the serving task.
pub(crate) async fn spawn_local(
    scoring: ScoringConfig,
) -> Result<(SocketAddr, JoinHandle<()>), AppError> {
    let app: Router = api_routes(in_memory_api(scoring));
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!(%err, "local decision service stopped");
        }
    });

    info!(%addr, "local decision service started");
    Ok((addr, handle))
}
