//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - checks the database and the identity
//!   provider configuration

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Does NOT check any dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Returns 200 if ready, 503 if not ready.
///
/// ## Checks
///
/// 1. Database connectivity - can execute simple query
/// 2. JWKS URL is configured; keys themselves are fetched on first use
///
/// Error messages are generic; the actual cause is logged.
#[tracing::instrument(skip_all, name = "api.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if let Err(e) = sqlx::query("SELECT 1").fetch_one(&state.pool).await {
        tracing::warn!(target: "api.health", error = %e, "Readiness check failed: database error");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(not_ready(Some("unhealthy"), None)),
        );
    }

    if state.config.jwks_url.is_empty() {
        tracing::warn!(target: "api.health", "Readiness check failed: JWKS URL not configured");
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(not_ready(Some("healthy"), Some("unconfigured"))),
        );
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready".to_string(),
            database: Some("healthy".to_string()),
            identity_provider: Some("configured".to_string()),
            error: None,
        }),
    )
}

fn not_ready(database: Option<&str>, identity_provider: Option<&str>) -> ReadinessResponse {
    ReadinessResponse {
        status: "not_ready".to_string(),
        database: database.map(ToString::to_string),
        identity_provider: identity_provider.map(ToString::to_string),
        error: Some("Service dependencies unavailable".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check_returns_ok() {
        assert_eq!(health_check().await, "OK");
    }

    #[test]
    fn test_not_ready_has_generic_error() {
        let response = not_ready(Some("unhealthy"), None);
        assert_eq!(response.status, "not_ready");
        assert_eq!(response.error.as_deref(), Some("Service dependencies unavailable"));
        assert!(response.identity_provider.is_none());
    }
}
