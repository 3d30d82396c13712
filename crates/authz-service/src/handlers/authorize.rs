//! Connection authorization handler.

use crate::decision::Decision;
use crate::models::{AuthorizerRequest, AuthorizerResponse};
use crate::observability::metrics::record_decision;
use crate::routes::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Header carrying the ARN of the invoked authorizer function.
pub const INVOKED_FUNCTION_ARN_HEADER: &str = "Lambda-Runtime-Invoked-Function-Arn";

/// Handler for POST /v1/authorize
///
/// The body is the broker's authorizer event. The response is always
/// 200 OK with a policy decision; an unreadable event is a deny.
///
/// ## Example Response (deny)
///
/// ```json
/// {
///   "isAuthenticated": false,
///   "principalId": "",
///   "policyDocuments": [],
///   "refreshAfterInSeconds": 300,
///   "disconnectAfterInSeconds": 300
/// }
/// ```
#[instrument(skip_all, name = "authz.http.authorize")]
pub async fn authorize(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<AuthorizerResponse> {
    let request: AuthorizerRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(target: "authz.http", error = %e, "Unreadable authorizer event");
            record_decision("deny", "malformed_event", Duration::ZERO);
            return Json(Decision::Deny.into());
        }
    };

    let invoked_function_arn = headers
        .get(INVOKED_FUNCTION_ARN_HEADER)
        .and_then(|value| value.to_str().ok());

    Json(
        state
            .authorizer
            .respond(&request, invoked_function_arn)
            .await,
    )
}
