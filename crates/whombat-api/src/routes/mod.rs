//! HTTP routes for the Whombat API.
//!
//! Defines the Axum router and application state.

use crate::auth::{BearerAuthenticator, JwksClient, RefreshPolicy, TokenVerifier};
use crate::config::Config;
use crate::handlers;
use crate::middleware::{http_metrics_middleware, require_auth, AuthState};
use crate::services::UserStore;
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: PgPool,

    /// Service configuration.
    pub config: Arc<Config>,

    /// Bearer Authenticator for protected routes.
    pub authenticator: Arc<BearerAuthenticator>,
}

impl AppState {
    /// Wire the auth core from configuration.
    ///
    /// The JWKS client starts empty; keys are fetched on the first
    /// authenticated request.
    pub fn new(pool: PgPool, config: Config, user_store: Arc<dyn UserStore>) -> Self {
        let policy = config
            .jwks_cache_ttl
            .map_or(RefreshPolicy::Never, RefreshPolicy::Ttl);
        let jwks_client = Arc::new(JwksClient::with_policy(config.jwks_url.clone(), policy));
        let verifier = TokenVerifier::new(
            jwks_client,
            config.token_issuer.clone(),
            config.client_id.clone(),
        );

        Self {
            pool,
            config: Arc::new(config),
            authenticator: Arc::new(BearerAuthenticator::new(verifier, user_store)),
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe (simple "OK") - public
/// - `/ready` - Readiness probe (checks DB + JWKS configuration) - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/api/v1/config/frontend` - Frontend URL - public
/// - `/api/v1/auth/me` - Current user - requires authentication
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let auth_state = AuthState {
        authenticator: Arc::clone(&state.authenticator),
    };

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/api/v1/config/frontend", get(handlers::get_frontend_config))
        .with_state(Arc::clone(&state));

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let protected_routes = Router::new()
        .route("/api/v1/auth/me", get(handlers::get_me))
        .route_layer(middleware::from_fn_with_state(auth_state, require_auth))
        .with_state(state);

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer (innermost)
    // 2. TraceLayer
    // 3. http_metrics_middleware (outermost, sees every response)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
