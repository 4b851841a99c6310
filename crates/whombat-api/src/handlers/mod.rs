//! HTTP handlers for the Whombat API.

pub mod config;
pub mod health;
pub mod me;
pub mod metrics;

pub use config::get_frontend_config;
pub use health::{health_check, readiness_check};
pub use me::get_me;
pub use metrics::metrics_handler;
