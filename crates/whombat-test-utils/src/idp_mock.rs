//! Mock identity provider
//!
//! Serves a JWKS document at the tenant discovery path, like
//! `https://login.microsoftonline.com/<tenant>/discovery/v2.0/keys`.

use crate::crypto_fixtures::TestKeypair;
use crate::token_builders::TEST_TENANT_ID;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A wiremock server publishing signing keys.
pub struct MockIdentityProvider {
    server: MockServer,
}

impl MockIdentityProvider {
    /// Start a provider publishing the given keys.
    pub async fn start(keys: &[TestKeypair]) -> Self {
        let server = MockServer::start().await;
        let jwks = serde_json::json!({
            "keys": keys.iter().map(TestKeypair::jwk_json).collect::<Vec<_>>()
        });

        Mock::given(method("GET"))
            .and(path(Self::keys_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks))
            .named("jwks")
            .mount(&server)
            .await;

        Self { server }
    }

    /// Start a provider whose key endpoint always fails.
    pub async fn unavailable() -> Self {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(Self::keys_path()))
            .respond_with(ResponseTemplate::new(503))
            .named("jwks unavailable")
            .mount(&server)
            .await;

        Self { server }
    }

    fn keys_path() -> String {
        format!("/{TEST_TENANT_ID}/discovery/v2.0/keys")
    }

    /// Base URL (the authority host).
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Full JWKS URL.
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), Self::keys_path())
    }

    /// Number of requests the provider has received.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }
}
