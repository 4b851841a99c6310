//! Authentication error taxonomy.
//!
//! Each variant is a distinct failure kind so the HTTP boundary can tell an
//! invalid credential apart from a failing dependency. The `Display` text is
//! the reason surfaced to the caller in the 401 body.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No `Authorization: Bearer <token>` header on the request.
    #[error("Invalid authorization credentials")]
    MissingCredentials,

    /// The identity provider's key set could not be retrieved or parsed.
    /// The inner string is for logs only.
    #[error("unable to retrieve signing keys")]
    KeyFetch(String),

    /// Token header asserts an algorithm other than RS256.
    #[error("unsupported token algorithm: {0}")]
    InvalidAlgorithm(String),

    /// Signature, issuer, audience, expiry or structure check failed.
    #[error("{0}")]
    TokenValidation(String),

    /// A claim needed for identity resolution is absent.
    #[error("missing required claim: {0}")]
    MalformedClaims(String),

    /// The user store failed for a reason other than not-found/conflict.
    #[error("user store error: {0}")]
    UserStore(String),
}

impl AuthError {
    /// Short, bounded label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingCredentials => "missing_credentials",
            AuthError::KeyFetch(_) => "key_fetch",
            AuthError::InvalidAlgorithm(_) => "invalid_algorithm",
            AuthError::TokenValidation(_) => "token_validation",
            AuthError::MalformedClaims(_) => "malformed_claims",
            AuthError::UserStore(_) => "user_store",
        }
    }
}
