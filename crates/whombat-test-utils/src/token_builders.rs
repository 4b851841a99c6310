//! Builder patterns for test data construction
//!
//! Provides a fluent API for access token claims shaped like the identity
//! provider's v2.0 tokens.

use crate::crypto_fixtures::{FixtureError, TestKeypair};
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Tenant id used by test servers.
pub const TEST_TENANT_ID: &str = "test-tenant";

/// Client id (token audience) used by test servers.
pub const TEST_CLIENT_ID: &str = "test-client-id";

/// Issuer configured on test servers.
pub const TEST_ISSUER: &str = "https://login.microsoftonline.com/test-tenant/v2.0";

/// Builder for creating test access token claims
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user("abc123", "jane@example.org")
///     .expires_in(3600)
///     .sign(&TestKeypair::primary("key-1"));
/// ```
pub struct TestTokenBuilder {
    oid: Option<String>,
    preferred_username: Option<String>,
    name: Option<String>,
    iss: String,
    aud: Value,
    exp: i64,
    iat: i64,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            oid: Some("00000000-0000-0000-0000-000000000001".to_string()),
            preferred_username: Some("tester@example.org".to_string()),
            name: None,
            iss: TEST_ISSUER.to_string(),
            aud: json!(TEST_CLIENT_ID),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: now.timestamp(),
        }
    }

    /// Set the provider object id and preferred username
    pub fn for_user(mut self, oid: &str, preferred_username: &str) -> Self {
        self.oid = Some(oid.to_string());
        self.preferred_username = Some(preferred_username.to_string());
        self
    }

    /// Set the display name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Drop the `oid` claim
    pub fn without_oid(mut self) -> Self {
        self.oid = None;
        self
    }

    /// Drop the `preferred_username` claim
    pub fn without_preferred_username(mut self) -> Self {
        self.preferred_username = None;
        self
    }

    /// Set the issuer
    pub fn with_issuer(mut self, iss: &str) -> Self {
        self.iss = iss.to_string();
        self
    }

    /// Set a single audience
    pub fn with_audience(mut self, aud: &str) -> Self {
        self.aud = json!(aud);
        self
    }

    /// Set an audience array
    pub fn with_audiences(mut self, auds: &[&str]) -> Self {
        self.aud = json!(auds);
        self
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Build the claims as a JSON value
    pub fn build(self) -> Value {
        let mut claims = Map::new();
        if let Some(oid) = self.oid {
            claims.insert("oid".to_string(), json!(oid));
        }
        if let Some(preferred_username) = self.preferred_username {
            claims.insert("preferred_username".to_string(), json!(preferred_username));
        }
        if let Some(name) = self.name {
            claims.insert("name".to_string(), json!(name));
        }
        claims.insert("iss".to_string(), json!(self.iss));
        claims.insert("aud".to_string(), self.aud);
        claims.insert("exp".to_string(), json!(self.exp));
        claims.insert("iat".to_string(), json!(self.iat));
        claims.insert("ver".to_string(), json!("2.0"));
        Value::Object(claims)
    }

    /// Build and sign with RS256
    pub fn sign(self, keypair: &TestKeypair) -> Result<String, FixtureError> {
        keypair.sign(&self.build())
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}
