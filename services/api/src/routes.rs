use crate::infra::{AppState, ServiceApi};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use clarify::auth::auth_router;
use clarify::decisions::decision_router;
use serde_json::json;
use std::sync::Arc;

/// Auth and decision routes nested under `/api`.
pub(crate) fn api_routes(api: ServiceApi) -> Router {
    let auth = auth_router(Arc::clone(&api.auth));
    Router::new().nest("/api", auth.merge(decision_router(api)))
}

/// Adds liveness, readiness, and Prometheus scrape endpoints. Handlers read
/// [`AppState`] from an `Extension` layered on by the caller.
pub(crate) fn with_operational_routes(router: Router) -> Router {
    router
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
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
