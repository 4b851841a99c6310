//! Observability for the Whombat API.
//!
//! Prometheus metrics; logging is configured in `main`.

pub mod metrics;
