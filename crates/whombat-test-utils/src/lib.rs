//! # Whombat Test Utilities
//!
//! Shared test utilities for the Whombat API.
//!
//! This crate provides:
//! - Fixed RSA keypairs that sign RS256 tokens and describe themselves as JWKs
//! - `TestTokenBuilder` for provider-shaped access token claims
//! - `MockIdentityProvider`, a wiremock JWKS endpoint
//! - Server test harness (`TestApiServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use whombat_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let keypair = TestKeypair::primary("key-1");
//!     let idp = MockIdentityProvider::start(&[keypair.clone()]).await;
//!     let server = TestApiServer::spawn(&idp).await?;
//!     let token = TestTokenBuilder::new()
//!         .for_user("abc123", "jane@example.org")
//!         .sign(&keypair)?;
//!     // ...
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod idp_mock;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use idp_mock::*;
pub use server_harness::*;
pub use token_builders::*;
