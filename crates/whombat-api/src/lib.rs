//! Whombat API Service Library
//!
//! HTTP backend for the Whombat audio annotation tool. This crate holds the
//! authentication core that turns identity provider bearer tokens into
//! local users:
//!
//! - Key Material Cache for the provider's JWKS
//! - Token verification (RS256, issuer, audience, expiry)
//! - Bearer Authenticator with idempotent get-or-create provisioning
//! - Middleware exposing the resolved user to handlers
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> auth/*.rs -> services/*.rs -> repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - Token verification and user resolution
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication and HTTP metrics middleware
//! - `models` - Data models
//! - `observability` - Prometheus metrics
//! - `repositories` - Database queries
//! - `routes` - Axum router setup
//! - `services` - User Store collaborator

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
