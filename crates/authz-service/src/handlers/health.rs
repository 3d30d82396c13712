//! Health check handler.

use crate::models::HealthResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::Json;
use std::sync::Arc;
use tracing::instrument;

/// Health check handler.
///
/// Always "healthy" while the process serves requests; `keys_loaded` tells
/// whether a trust-source refresh has succeeded yet.
///
/// ## Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "keys_loaded": true,
///   "key_count": 2
/// }
/// ```
#[instrument(skip_all, name = "authz.health.check")]
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        keys_loaded: state.key_store.is_loaded().await,
        key_count: state.key_store.key_count().await,
    })
}
