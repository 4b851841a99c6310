//! Token claims.
//!
//! Contains the claims carried by a verified access token. The provider
//! object id and the preferred username identify a person, so both are
//! redacted in Debug output to keep them out of logs.

use crate::auth::AuthError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The `aud` claim, which the provider may send as a string or an array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

/// Verified payload of a bearer token.
///
/// `oid` and `preferred_username` are kept as raw JSON so that a token where
/// either one is missing or not a string still verifies and is then
/// rejected as malformed claims by [`TokenClaims::identity`].
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Provider object id - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oid: Option<Value>,

    /// Preferred username, usually an email address - redacted in Debug output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<Value>,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub iss: String,

    pub aud: Audience,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
}

impl fmt::Debug for TokenClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redacted = |value: &Option<Value>| value.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("TokenClaims")
            .field("oid", &redacted(&self.oid))
            .field("preferred_username", &redacted(&self.preferred_username))
            .field("name", &self.name)
            .field("iss", &self.iss)
            .field("aud", &self.aud)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .finish_non_exhaustive()
    }
}

impl TokenClaims {
    /// Extract the claims required to resolve a local user.
    ///
    /// # Errors
    ///
    /// `AuthError::MalformedClaims` naming the first of `oid` and
    /// `preferred_username` that is absent, empty or not a string.
    pub fn identity(&self) -> Result<ProviderIdentity, AuthError> {
        let oid = non_empty_str(&self.oid).ok_or_else(|| AuthError::MalformedClaims("oid".to_string()))?;
        let preferred_username = non_empty_str(&self.preferred_username)
            .ok_or_else(|| AuthError::MalformedClaims("preferred_username".to_string()))?;

        Ok(ProviderIdentity {
            oid: oid.to_string(),
            preferred_username: preferred_username.to_string(),
            name: self.name.clone(),
        })
    }
}

fn non_empty_str(value: &Option<Value>) -> Option<&str> {
    value.as_ref().and_then(Value::as_str).filter(|v| !v.is_empty())
}

/// The provider-side identity of a verified principal.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderIdentity {
    pub oid: String,
    pub preferred_username: String,
    pub name: Option<String>,
}

impl ProviderIdentity {
    /// Local username: the part of `preferred_username` before the first `@`.
    pub fn username(&self) -> &str {
        self.preferred_username
            .split_once('@')
            .map_or(self.preferred_username.as_str(), |(local, _)| local)
    }
}

impl fmt::Debug for ProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderIdentity")
            .field("oid", &"[REDACTED]")
            .field("preferred_username", &"[REDACTED]")
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn claims(oid: Option<&str>, preferred_username: Option<&str>) -> TokenClaims {
        TokenClaims {
            oid: oid.map(Value::from),
            preferred_username: preferred_username.map(Value::from),
            name: Some("Jane Doe".to_string()),
            iss: "https://login.microsoftonline.com/tenant/v2.0".to_string(),
            aud: Audience::Single("client-id".to_string()),
            exp: 1_234_567_890,
            iat: Some(1_234_567_800),
            sub: None,
        }
    }

    #[test]
    fn test_debug_redacts_identifiers() {
        let debug_str = format!("{:?}", claims(Some("abc123"), Some("jane@example.org")));

        assert!(!debug_str.contains("abc123"));
        assert!(!debug_str.contains("jane@example.org"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_identity_requires_oid() {
        let err = claims(None, Some("jane@example.org")).identity().unwrap_err();
        assert_eq!(err, AuthError::MalformedClaims("oid".to_string()));
    }

    #[test]
    fn test_identity_requires_preferred_username() {
        let err = claims(Some("abc123"), None).identity().unwrap_err();
        assert_eq!(err, AuthError::MalformedClaims("preferred_username".to_string()));

        let err = claims(Some("abc123"), Some("")).identity().unwrap_err();
        assert_eq!(err, AuthError::MalformedClaims("preferred_username".to_string()));
    }

    #[test]
    fn test_username_is_local_part() {
        let identity = claims(Some("abc123"), Some("jane@example.org")).identity().unwrap();
        assert_eq!(identity.username(), "jane");
        assert_eq!(identity.oid, "abc123");
        assert_eq!(identity.name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn test_username_without_at_sign_is_whole_string() {
        let identity = claims(Some("abc123"), Some("jane")).identity().unwrap();
        assert_eq!(identity.username(), "jane");

        let identity = claims(Some("abc123"), Some("a@b@c")).identity().unwrap();
        assert_eq!(identity.username(), "a");
    }

    #[test]
    fn test_audience_string_or_array() {
        let single: TokenClaims = serde_json::from_value(serde_json::json!({
            "iss": "i", "aud": "client-id", "exp": 1
        }))
        .unwrap();
        assert_eq!(single.aud, Audience::Single("client-id".to_string()));
        assert!(single.oid.is_none());

        let multiple: TokenClaims = serde_json::from_value(serde_json::json!({
            "iss": "i", "aud": ["other", "client-id"], "exp": 1, "oid": "abc123"
        }))
        .unwrap();
        assert_eq!(
            multiple.aud,
            Audience::Multiple(vec!["other".to_string(), "client-id".to_string()])
        );
    }

    #[test]
    fn test_non_string_identity_claims_are_malformed() {
        let numeric_oid: TokenClaims = serde_json::from_value(serde_json::json!({
            "iss": "i", "aud": "client-id", "exp": 1,
            "oid": 42, "preferred_username": "jane@example.org"
        }))
        .unwrap();
        assert_eq!(
            numeric_oid.identity().unwrap_err(),
            AuthError::MalformedClaims("oid".to_string())
        );

        let object_username: TokenClaims = serde_json::from_value(serde_json::json!({
            "iss": "i", "aud": "client-id", "exp": 1,
            "oid": "abc123", "preferred_username": {"email": "jane@example.org"}
        }))
        .unwrap();
        assert_eq!(
            object_username.identity().unwrap_err(),
            AuthError::MalformedClaims("preferred_username".to_string())
        );
    }
}
