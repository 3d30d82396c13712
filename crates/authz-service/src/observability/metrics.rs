//! Authorizer metrics.
//!
//! Names carry the `authz_` prefix; counters end in `_total` and latency
//! histograms in `_seconds`. Every label takes a small fixed set of values:
//!
//! | label | values |
//! |-------|--------|
//! | `outcome` | allow, deny |
//! | `reason` | `AuthzError::reason()`, or "none" on allow |
//! | `status` | success, error (timeout for HTTP) |
//! | `result` | hit, refreshed, miss |
//! | `endpoint` | the three routes, anything else is "/other" |

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Install the global Prometheus recorder.
///
/// Metrics recorded before this call are lost. The returned handle renders
/// the exposition text for `/metrics`.
///
/// # Errors
///
/// A bucket matcher is rejected, or a global recorder already exists.
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Decisions are CPU-bound unless a key refresh is on the path
        .set_buckets_for_metric(
            Matcher::Full("authz_decision_duration_seconds".to_string()),
            &[
                0.0005, 0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100, 0.500, 1.000, 3.000,
            ],
        )
        .map_err(|e| format!("decision histogram buckets rejected: {e}"))?
        // Trust-source fetches are bounded by the fetch timeout
        .set_buckets_for_metric(
            Matcher::Prefix("authz_jwks_refresh".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.000, 3.000, 5.000],
        )
        .map_err(|e| format!("key refresh histogram buckets rejected: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("authz_http_request".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 3.000,
            ],
        )
        .map_err(|e| format!("HTTP histogram buckets rejected: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Prometheus recorder not installed: {e}"))
}

/// Record a completed authorization decision.
///
/// Metric: `authz_decisions_total`, `authz_decision_duration_seconds`
/// Labels: `outcome`, `reason`
pub fn record_decision(outcome: &'static str, reason: &'static str, duration: Duration) {
    histogram!("authz_decision_duration_seconds", "outcome" => outcome)
        .record(duration.as_secs_f64());

    counter!("authz_decisions_total", "outcome" => outcome, "reason" => reason).increment(1);
}

/// Record a trust-source refresh.
///
/// Metric: `authz_jwks_refresh_total`, `authz_jwks_refresh_duration_seconds`
/// Labels: `status`
pub fn record_jwks_refresh(status: &'static str, duration: Duration) {
    histogram!("authz_jwks_refresh_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());

    counter!("authz_jwks_refresh_total", "status" => status).increment(1);
}

/// Record the number of keys currently held by the key store.
///
/// Metric: `authz_jwks_keys`
pub fn set_jwks_keys(count: usize) {
    gauge!("authz_jwks_keys").set(count as f64);
}

/// Record a key lookup.
///
/// Metric: `authz_key_lookups_total`
/// Labels: `result` ("hit", "refreshed", "miss")
pub fn record_key_lookup(result: &'static str) {
    counter!("authz_key_lookups_total", "result" => result).increment(1);
}

/// One HTTP exchange: `authz_http_request_duration_seconds` by status class,
/// `authz_http_requests_total` by exact status code.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let endpoint = normalize_endpoint(endpoint);
    let class = status_class(status_code);

    histogram!("authz_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => endpoint,
        "status" => class
    )
    .record(duration.as_secs_f64());

    counter!("authz_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn status_class(status_code: u16) -> &'static str {
    match status_code {
        408 | 504 => "timeout",
        code if (200..300).contains(&code) => "success",
        _ => "error",
    }
}

/// Unknown paths collapse to "/other" to bound cardinality.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/v1/authorize" => "/v1/authorize",
        "/v1/health" => "/v1/health",
        "/metrics" => "/metrics",
        _ => "/other",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use metrics_util::MetricKind;

    fn counter_value(
        snapshot: &[(metrics_util::CompositeKey, DebugValue)],
        name: &str,
        labels: &[(&str, &str)],
    ) -> Option<u64> {
        snapshot.iter().find_map(|(key, value)| {
            if key.kind() != MetricKind::Counter || key.key().name() != name {
                return None;
            }
            let matches = labels.iter().all(|(k, v)| {
                key.key()
                    .labels()
                    .any(|label| label.key() == *k && label.value() == *v)
            });
            match (matches, value) {
                (true, DebugValue::Counter(count)) => Some(*count),
                _ => None,
            }
        })
    }

    fn snapshot_of(f: impl FnOnce()) -> Vec<(metrics_util::CompositeKey, DebugValue)> {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        metrics::with_local_recorder(&recorder, f);
        snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(key, _unit, _description, value)| (key, value))
            .collect()
    }

    #[test]
    fn test_record_decision_labels() {
        let snapshot = snapshot_of(|| {
            record_decision("allow", "none", Duration::from_millis(2));
            record_decision("deny", "invalid_issuer", Duration::from_millis(1));
            record_decision("deny", "invalid_issuer", Duration::from_millis(1));
        });

        assert_eq!(
            counter_value(
                &snapshot,
                "authz_decisions_total",
                &[("outcome", "allow"), ("reason", "none")]
            ),
            Some(1)
        );
        assert_eq!(
            counter_value(
                &snapshot,
                "authz_decisions_total",
                &[("outcome", "deny"), ("reason", "invalid_issuer")]
            ),
            Some(2)
        );
    }

    #[test]
    fn test_record_jwks_refresh_and_lookups() {
        let snapshot = snapshot_of(|| {
            record_jwks_refresh("success", Duration::from_millis(40));
            record_jwks_refresh("error", Duration::from_secs(3));
            record_key_lookup("hit");
            record_key_lookup("miss");
            set_jwks_keys(2);
        });

        assert_eq!(
            counter_value(&snapshot, "authz_jwks_refresh_total", &[("status", "error")]),
            Some(1)
        );
        assert_eq!(
            counter_value(&snapshot, "authz_key_lookups_total", &[("result", "hit")]),
            Some(1)
        );
    }

    #[test]
    fn test_http_requests_by_route_and_code() {
        let snapshot = snapshot_of(|| {
            record_http_request("POST", "/v1/authorize", 200, Duration::from_millis(5));
            record_http_request("POST", "/v1/authorize", 408, Duration::from_secs(30));
            record_http_request("GET", "/admin", 404, Duration::from_millis(1));
            record_http_request("GET", "/admin/users", 404, Duration::from_millis(1));
        });

        assert_eq!(
            counter_value(
                &snapshot,
                "authz_http_requests_total",
                &[("endpoint", "/v1/authorize"), ("status_code", "408")]
            ),
            Some(1)
        );
        assert_eq!(
            counter_value(
                &snapshot,
                "authz_http_requests_total",
                &[("method", "GET"), ("endpoint", "/other")]
            ),
            Some(2)
        );
    }

    #[test]
    fn test_status_class() {
        for (code, class) in [
            (200, "success"),
            (204, "success"),
            (408, "timeout"),
            (504, "timeout"),
            (302, "error"),
            (405, "error"),
            (500, "error"),
        ] {
            assert_eq!(status_class(code), class, "status {code}");
        }
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("/v1/authorize"), "/v1/authorize");
        assert_eq!(normalize_endpoint("/v1/health"), "/v1/health");
        assert_eq!(normalize_endpoint("/metrics"), "/metrics");
        assert_eq!(normalize_endpoint("/v1/authorize/extra"), "/other");
        assert_eq!(normalize_endpoint("/"), "/other");
    }
}
