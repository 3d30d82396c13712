//! HTTP metrics middleware.
//!
//! Records every response, including framework rejections that never reach
//! a handler (404, 405, timeouts).

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Records method, normalized path, status code and duration for each
/// request. Applied as the outermost layer.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::post,
        Router,
    };
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use tower::ServiceExt;

    async fn handler_200() -> &'static str {
        "OK"
    }

    fn test_app() -> Router {
        Router::new()
            .route("/v1/authorize", post(handler_200))
            .layer(middleware::from_fn(http_metrics_middleware))
    }

    async fn send(method: &str, uri: &str) -> StatusCode {
        let request = HttpRequest::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .expect("request builder should succeed");

        test_app()
            .oneshot(request)
            .await
            .expect("request should succeed")
            .status()
    }

    #[tokio::test]
    async fn test_middleware_records_success_and_rejections() {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        let statuses = {
            let _guard = metrics::set_default_local_recorder(&recorder);
            (
                send("POST", "/v1/authorize").await,
                send("GET", "/v1/authorize").await,
                send("GET", "/nonexistent").await,
            )
        };
        assert_eq!(
            statuses,
            (
                StatusCode::OK,
                StatusCode::METHOD_NOT_ALLOWED,
                StatusCode::NOT_FOUND
            )
        );

        let counted: u64 = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(key, _, _, _)| key.key().name() == "authz_http_requests_total")
            .map(|(_, _, _, value)| match value {
                DebugValue::Counter(count) => count,
                _ => 0,
            })
            .sum();
        assert_eq!(counted, 3);
    }
}
