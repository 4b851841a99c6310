//! Metrics definitions for the Whombat API.
//!
//! All metrics follow Prometheus naming conventions:
//! - `whombat_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP methods
//! - `endpoint`: known paths, everything else is `/other`
//! - `status`: success, error, timeout
//! - `outcome`: bounded by code (authentication failure kinds, provisioning results)

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used by `/metrics`.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("whombat_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("whombat_jwks_fetch".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `whombat_http_requests_total`, `whombat_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("whombat_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("whombat_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Known routes keep their path; anything else is `/other`.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/api/v1/auth/me" => "/api/v1/auth/me",
        "/api/v1/config/frontend" => "/api/v1/config/frontend",
        _ => "/other",
    }
}

// ============================================================================
// Authentication Metrics
// ============================================================================

/// Record a JWKS fetch from the identity provider.
///
/// Metric: `whombat_jwks_fetch_total`, `whombat_jwks_fetch_duration_seconds`
/// Labels: `status` (success, error)
pub fn record_jwks_fetch(status: &str, duration: Duration) {
    histogram!("whombat_jwks_fetch_duration_seconds").record(duration.as_secs_f64());

    counter!("whombat_jwks_fetch_total",
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record an authentication attempt.
///
/// Metric: `whombat_authentications_total`
/// Labels: `outcome` (success, or an `AuthError::kind` label)
pub fn record_authentication(outcome: &str) {
    counter!("whombat_authentications_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Record a first-sign-in provisioning result.
///
/// Metric: `whombat_users_provisioned_total`
/// Labels: `outcome` (created, conflict_recovered, error)
pub fn record_user_provisioned(outcome: &str) {
    counter!("whombat_users_provisioned_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
}
