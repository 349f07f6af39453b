//! Metrics definitions for Meeting Broker.
//!
//! All metrics follow Prometheus naming conventions:
//! - `mb_` prefix for Meeting Broker
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: 6 values (fixed routes plus "/other")
//! - `status`: 3 values (success, error, timeout)
//! - `operation`: 3 values (create_meeting, get_token, join_meeting)
//! - `call`: 2 values (provision_identity, issue_token)
//! - `error_type`: bounded by `BrokerError` variants
//!
//! No identity IDs, meeting IDs, user names or tokens are ever used as labels.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded. Flow and provider
/// buckets extend to the ACS request timeout range.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("mb_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Two sequential provider calls per flow
        .set_buckets_for_metric(
            Matcher::Prefix("mb_operation".to_string()),
            &[
                0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000, 10.000, 20.000,
            ],
        )
        .map_err(|e| format!("Failed to set operation buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("mb_provider_call".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set provider call buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `mb_http_requests_total`, `mb_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// This captures ALL HTTP responses including framework-level errors like
/// 404 Not Found, 405 Method Not Allowed and CORS preflights.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("mb_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("mb_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion.
///
/// Every route is static; anything else collapses to "/other".
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/metrics" => "/metrics",
        "/api/CreateMeeting" => "/api/CreateMeeting",
        "/api/GetToken" => "/api/GetToken",
        "/api/JoinMeeting" => "/api/JoinMeeting",
        _ => "/other",
    }
}

// ============================================================================
// Flow Metrics
// ============================================================================

/// Record completion of one broker flow.
///
/// Metric: `mb_operations_total`, `mb_operation_duration_seconds`
/// Labels: `operation`, `status`, `error_type`
///
/// `error_type` is "none" on success.
pub fn record_operation(operation: &str, error_type: Option<&str>, duration: Duration) {
    let status = if error_type.is_some() {
        "error"
    } else {
        "success"
    };

    histogram!("mb_operation_duration_seconds",
        "operation" => operation.to_string(),
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("mb_operations_total",
        "operation" => operation.to_string(),
        "status" => status,
        "error_type" => error_type.unwrap_or("none").to_string()
    )
    .increment(1);
}

// ============================================================================
// Identity Provider Metrics
// ============================================================================

/// Record one identity provider call.
///
/// Metric: `mb_provider_calls_total`, `mb_provider_call_duration_seconds`
/// Labels: `call`, `status`
///
/// Calls: "provision_identity", "issue_token"
/// Status: "success", "error"
pub fn record_provider_call(call: &str, status: &str, duration: Duration) {
    histogram!("mb_provider_call_duration_seconds",
        "call" => call.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("mb_provider_calls_total",
        "call" => call.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
