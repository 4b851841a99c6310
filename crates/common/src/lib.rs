//! Utilities shared across the Whombat backend crates.

#![warn(clippy::pedantic)]

/// Secret types that keep credentials out of logs
pub mod secret;

/// JWT header utilities (size limits, `alg`/`kid` extraction)
pub mod jwt;
