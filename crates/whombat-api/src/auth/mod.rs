//! Authentication for the Whombat API.
//!
//! Bearer tokens issued by the identity provider are verified against the
//! provider's published signing keys and resolved to local users.
//!
//! # Components
//!
//! - `jwks` - Key Material Cache for the provider's JWKS
//! - `jwt` - Token verification (algorithm, key, signature, issuer, audience, expiry)
//! - `claims` - Verified token claims and the provider identity
//! - `authenticator` - Bearer Authenticator with get-or-create provisioning
//! - `error` - Authentication failure kinds

pub mod authenticator;
pub mod claims;
pub mod error;
pub mod jwks;
pub mod jwt;

pub use authenticator::{extract_bearer_token, BearerAuthenticator};
pub use claims::{ProviderIdentity, TokenClaims};
pub use error::AuthError;
pub use jwks::{JwksClient, RefreshPolicy, SigningKeySet};
pub use jwt::TokenVerifier;
