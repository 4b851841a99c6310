//! Middleware for the Whombat API.
//!
//! # Components
//!
//! - `auth` - Authentication middleware and the `CurrentUser` extractor
//! - `http_metrics` - HTTP request metrics for every response

pub mod auth;
pub mod http_metrics;

pub use auth::{require_auth, AuthState, CurrentUser};
pub use http_metrics::http_metrics_middleware;
