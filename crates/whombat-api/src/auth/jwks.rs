//! JWKS client for fetching and caching the identity provider's signing keys.
//!
//! The key set is fetched from the tenant's discovery endpoint
//! (`https://login.microsoftonline.com/<tenant>/discovery/v2.0/keys`) on the
//! first authentication attempt and then reused.
//!
//! # Refresh
//!
//! The default [`RefreshPolicy::Never`] keeps the first successfully fetched
//! key set for the lifetime of the process, so a key rotation at the provider
//! is only picked up after a restart. [`RefreshPolicy::Ttl`] expires the
//! cached set instead. Failed fetches are never cached.
//!
//! # Concurrency
//!
//! The fetch is single-flight: concurrent callers that find the cache empty
//! queue on `fetch_lock`. A caller that acquires the lock after a fetch
//! completed while it waited takes that fetch's outcome, success or
//! failure, instead of going to the network again. Only callers arriving
//! after a failed fetch has finished start a new one.

use crate::auth::AuthError;
use crate::observability::metrics;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// HTTP timeout for the discovery endpoint.
const JWKS_HTTP_TIMEOUT_SECONDS: u64 = 10;

/// JSON Web Key from the provider's JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA" for the provider's signing keys).
    pub kty: String,

    /// Key ID - matched against the token header's `kid`.
    pub kid: String,

    /// Algorithm, when the provider declares one.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use ("sig").
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,
}

/// JWKS document as served by the discovery endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

/// The provider's current verification keys, indexed by key ID.
#[derive(Debug, Clone, Default)]
pub struct SigningKeySet {
    keys: HashMap<String, Jwk>,
}

impl SigningKeySet {
    pub fn get(&self, kid: &str) -> Option<&Jwk> {
        self.keys.get(kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl From<JwksResponse> for SigningKeySet {
    fn from(jwks: JwksResponse) -> Self {
        let keys = jwks
            .keys
            .into_iter()
            .map(|key| (key.kid.clone(), key))
            .collect();
        Self { keys }
    }
}

/// When a cached key set stops being served.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Keep the first fetched key set until the process exits.
    #[default]
    Never,

    /// Refetch once the cached set is older than the given duration.
    Ttl(Duration),
}

impl RefreshPolicy {
    fn is_fresh(&self, fetched_at: Instant) -> bool {
        match self {
            RefreshPolicy::Never => true,
            RefreshPolicy::Ttl(ttl) => fetched_at.elapsed() < *ttl,
        }
    }
}

struct CachedKeys {
    keys: Arc<SigningKeySet>,
    fetched_at: Instant,
}

type FetchOutcome = Result<Arc<SigningKeySet>, AuthError>;

/// Key Material Cache for the identity provider's JWKS.
pub struct JwksClient {
    jwks_url: String,
    http_client: reqwest::Client,
    cache: RwLock<Option<CachedKeys>>,
    /// Holds the outcome of the most recent fetch.
    fetch_lock: Mutex<Option<FetchOutcome>>,
    /// Incremented under `fetch_lock` each time a fetch completes.
    completed_fetches: AtomicU64,
    refresh_policy: RefreshPolicy,
    fetch_count: AtomicU64,
}

impl JwksClient {
    /// Create a client that never refreshes a fetched key set.
    pub fn new(jwks_url: String) -> Self {
        Self::with_policy(jwks_url, RefreshPolicy::Never)
    }

    /// Create a client with an explicit refresh policy.
    pub fn with_policy(jwks_url: String, refresh_policy: RefreshPolicy) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(JWKS_HTTP_TIMEOUT_SECONDS))
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "api.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
            cache: RwLock::new(None),
            fetch_lock: Mutex::new(None),
            completed_fetches: AtomicU64::new(0),
            refresh_policy,
            fetch_count: AtomicU64::new(0),
        }
    }

    pub fn jwks_url(&self) -> &str {
        &self.jwks_url
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        self.refresh_policy
    }

    /// Number of network fetches attempted so far.
    pub fn fetch_count(&self) -> u64 {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// Get the current signing key set, fetching it if nothing usable is cached.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeyFetch` if the HTTP call fails, the endpoint
    /// returns a non-success status, or the body is not a JWKS document.
    #[instrument(skip(self))]
    pub async fn get_keys(&self) -> Result<Arc<SigningKeySet>, AuthError> {
        let seen = self.completed_fetches.load(Ordering::SeqCst);

        if let Some(keys) = self.cached().await {
            tracing::debug!(target: "api.auth.jwks", "JWKS cache hit");
            return Ok(keys);
        }

        let mut last_outcome = self.fetch_lock.lock().await;

        // A fetch finished while we waited: share its result, even a failure.
        if self.completed_fetches.load(Ordering::SeqCst) != seen {
            if let Some(outcome) = last_outcome.as_ref() {
                tracing::debug!(target: "api.auth.jwks", "JWKS outcome shared from concurrent fetch");
                return outcome.clone();
            }
        }

        self.fetch_locked(&mut last_outcome).await
    }

    /// Fetch the key set unconditionally and replace the cached value.
    #[instrument(skip(self))]
    pub async fn force_refresh(&self) -> Result<Arc<SigningKeySet>, AuthError> {
        let mut last_outcome = self.fetch_lock.lock().await;
        self.fetch_locked(&mut last_outcome).await
    }

    async fn fetch_locked(&self, last_outcome: &mut Option<FetchOutcome>) -> FetchOutcome {
        let outcome = self.fetch().await;
        *last_outcome = Some(outcome.clone());
        self.completed_fetches.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    async fn cached(&self) -> Option<Arc<SigningKeySet>> {
        let cache = self.cache.read().await;
        cache
            .as_ref()
            .filter(|cached| self.refresh_policy.is_fresh(cached.fetched_at))
            .map(|cached| Arc::clone(&cached.keys))
    }

    /// Callers must hold `fetch_lock`.
    async fn fetch(&self) -> FetchOutcome {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        let start = Instant::now();

        let result = self.fetch_remote().await;
        metrics::record_jwks_fetch(
            if result.is_ok() { "success" } else { "error" },
            start.elapsed(),
        );
        let keys = Arc::new(result?);

        tracing::info!(
            target: "api.auth.jwks",
            key_count = keys.len(),
            "JWKS cache populated"
        );

        let mut cache = self.cache.write().await;
        *cache = Some(CachedKeys {
            keys: Arc::clone(&keys),
            fetched_at: Instant::now(),
        });

        Ok(keys)
    }

    async fn fetch_remote(&self) -> Result<SigningKeySet, AuthError> {
        tracing::debug!(target: "api.auth.jwks", url = %self.jwks_url, "Fetching JWKS from identity provider");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "api.auth.jwks", error = %e, "Failed to fetch JWKS");
                AuthError::KeyFetch(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!(target: "api.auth.jwks", status = %status, "JWKS endpoint returned error");
            return Err(AuthError::KeyFetch(format!("JWKS endpoint returned {status}")));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "api.auth.jwks", error = %e, "Failed to parse JWKS response");
            AuthError::KeyFetch(e.to_string())
        })?;

        Ok(SigningKeySet::from(jwks))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const KEYS_PATH: &str = "/tenant-1/discovery/v2.0/keys";

    fn jwks_body() -> serde_json::Value {
        serde_json::json!({
            "keys": [
                {"kty": "RSA", "kid": "key-1", "use": "sig", "n": "AQAB", "e": "AQAB"},
                {"kty": "RSA", "kid": "key-2", "use": "sig", "n": "AQAB", "e": "AQAB",
                 "x5t": "key-2", "x5c": ["MIIC"], "issuer": "https://login.example/v2.0"}
            ]
        })
    }

    async fn mount_jwks(server: &MockServer, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path(KEYS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(jwks_body()))
            .expect(expected_calls)
            .mount(server)
            .await;
    }

    #[test]
    fn test_jwk_deserialization_ignores_provider_extras() {
        let jwks: JwksResponse = serde_json::from_value(jwks_body()).unwrap();
        let set = SigningKeySet::from(jwks);

        assert_eq!(set.len(), 2);
        let key = set.get("key-2").unwrap();
        assert_eq!(key.kty, "RSA");
        assert_eq!(key.key_use.as_deref(), Some("sig"));
        assert!(key.alg.is_none());
        assert!(set.get("missing").is_none());
    }

    #[test]
    fn test_refresh_policy_default_is_never() {
        assert_eq!(RefreshPolicy::default(), RefreshPolicy::Never);
        let client = JwksClient::new("http://localhost/keys".to_string());
        assert_eq!(client.refresh_policy(), RefreshPolicy::Never);
        assert_eq!(client.jwks_url(), "http://localhost/keys");
    }

    #[tokio::test]
    async fn test_keys_fetched_once_and_reused() {
        let server = MockServer::start().await;
        mount_jwks(&server, 1).await;

        let client = JwksClient::new(format!("{}{}", server.uri(), KEYS_PATH));

        for _ in 0..5 {
            let keys = client.get_keys().await.unwrap();
            assert_eq!(keys.len(), 2);
        }
        assert_eq!(client.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_requests_share_one_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(KEYS_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(jwks_body())
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = Arc::new(JwksClient::new(format!("{}{}", server.uri(), KEYS_PATH)));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let client = Arc::clone(&client);
                tokio::spawn(async move { client.get_keys().await })
            })
            .collect();

        for task in futures::future::join_all(tasks).await {
            assert_eq!(task.unwrap().unwrap().len(), 2);
        }
        assert_eq!(client.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(KEYS_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_jwks(&server, 1).await;

        let client = JwksClient::new(format!("{}{}", server.uri(), KEYS_PATH));

        let first = client.get_keys().await;
        assert!(matches!(first, Err(AuthError::KeyFetch(_))));

        let second = client.get_keys().await.unwrap();
        assert_eq!(second.len(), 2);
        assert_eq!(client.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_failed_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(KEYS_PATH))
            .respond_with(ResponseTemplate::new(503).set_delay(Duration::from_millis(300)))
            .mount(&server)
            .await;

        let client = Arc::new(JwksClient::new(format!("{}{}", server.uri(), KEYS_PATH)));

        let started = Instant::now();
        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let client = Arc::clone(&client);
                tokio::spawn(async move { client.get_keys().await })
            })
            .collect();

        for task in futures::future::join_all(tasks).await {
            assert!(matches!(task.unwrap(), Err(AuthError::KeyFetch(_))));
        }
        assert_eq!(client.fetch_count(), 1);
        assert!(
            started.elapsed() < Duration::from_millis(1200),
            "waiters should not fetch one after another"
        );

        // The failure is not cached: a later call fetches again.
        assert!(client.get_keys().await.is_err());
        assert_eq!(client.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_document_is_key_fetch_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(KEYS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let client = JwksClient::new(format!("{}{}", server.uri(), KEYS_PATH));
        assert!(matches!(client.get_keys().await, Err(AuthError::KeyFetch(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_key_fetch_error() {
        let client = JwksClient::new("http://127.0.0.1:1/keys".to_string());
        assert!(matches!(client.get_keys().await, Err(AuthError::KeyFetch(_))));
    }

    #[tokio::test]
    async fn test_ttl_policy_refetches_after_expiry() {
        let server = MockServer::start().await;
        mount_jwks(&server, 2).await;

        let client = JwksClient::with_policy(
            format!("{}{}", server.uri(), KEYS_PATH),
            RefreshPolicy::Ttl(Duration::from_millis(50)),
        );

        client.get_keys().await.unwrap();
        client.get_keys().await.unwrap();
        assert_eq!(client.fetch_count(), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;
        client.get_keys().await.unwrap();
        assert_eq!(client.fetch_count(), 2);
    }

    #[tokio::test]
    async fn test_force_refresh_bypasses_cache() {
        let server = MockServer::start().await;
        mount_jwks(&server, 2).await;

        let client = JwksClient::new(format!("{}{}", server.uri(), KEYS_PATH));
        client.get_keys().await.unwrap();
        client.force_refresh().await.unwrap();

        assert_eq!(client.fetch_count(), 2);
    }
}
