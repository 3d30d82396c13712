//! Router and shared state for the authorizer's HTTP surface.

use crate::auth::jwks::KeyStore;
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::AuthorizerService;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Decision pipeline.
    pub authorizer: Arc<AuthorizerService>,

    /// Signing keys, shared with the authorizer; read by the health check.
    pub key_store: Arc<KeyStore>,

    /// Prometheus handle; `None` when no recorder is installed.
    pub metrics_handle: Option<PrometheusHandle>,
}

/// `POST /v1/authorize`, `GET /v1/health` and `GET /metrics`.
///
/// Requests are cut off after [`REQUEST_TIMEOUT`]. HTTP metrics wrap the
/// whole stack, so timeouts and unmatched routes are counted too.
pub fn build_routes(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route("/v1/authorize", post(handlers::authorize))
        .route("/v1/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(state);

    // Last layer added runs first
    routes
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}
