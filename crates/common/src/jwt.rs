//! JWT header utilities shared across Whombat services.
//!
//! Bearer tokens issued by the identity provider carry the signing algorithm
//! and the key ID in their (unverified) header. Both are needed before
//! signature verification can start: the algorithm to reject confusion
//! attempts, the key ID to pick the right entry from the provider's JWKS.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (`MAX_JWT_SIZE_BYTES`)
//! - Nothing here verifies a signature; values returned are attacker-controlled
//!   and must only be used to select a key from a trusted key set
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::parse_header;
//!
//! let header = parse_header(token)?;
//! if header.alg != "RS256" {
//!     return Err(...);
//! }
//! let key = key_set.get(&header.kid);
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::Value;
use thiserror::Error;

/// Maximum allowed JWT size in bytes (8KB).
///
/// Provider access tokens are typically 1-2KB. Anything over this limit is
/// rejected before base64 decoding or JSON parsing.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Errors that can occur while reading a JWT header.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("token exceeds maximum size")]
    TokenTooLarge,

    /// Token is not a three-part JWT, or its header is not base64url JSON.
    #[error("malformed token")]
    MalformedToken,
}

/// The header fields needed to select a verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Signing algorithm as asserted by the token (e.g. `RS256`, `none`).
    pub alg: String,

    /// Key ID used to look up the verification key.
    pub kid: Option<String>,
}

/// Parse the header of a JWT without verifying the signature.
///
/// The `alg` value is returned verbatim, including values such as `none`
/// that a verification library would refuse to parse, so callers can
/// classify algorithm-confusion attempts on their own terms. An empty or
/// non-string `kid` is reported as `None`.
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - wrong structure, bad base64url, invalid JSON, or no
///   string `alg`
pub fn parse_header(token: &str) -> Result<TokenHeader, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    let (Some(header_part), Some(_payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
        return Err(JwtValidationError::MalformedToken);
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtValidationError::MalformedToken
    })?;

    let header: Value = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    let alg = header
        .get("alg")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or(JwtValidationError::MalformedToken)?;

    let kid = header
        .get("kid")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);

    Ok(TokenHeader { alg, kid })
}
