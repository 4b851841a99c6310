//! Whombat API configuration.
//!
//! Configuration is loaded from environment variables. The database URL is
//! held as a secret and redacted in Debug output.

use common::secret::{ExposeSecret, SecretString};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5000";

/// Default identity provider authority host.
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Default public domain of the frontend.
pub const DEFAULT_DOMAIN: &str = "localhost";

/// Default frontend port.
pub const DEFAULT_FRONTEND_PORT: u16 = 3000;

/// Whombat API configuration.
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: SecretString,

    /// Server bind address (default: "0.0.0.0:5000").
    pub bind_address: String,

    /// Directory (tenant) id at the identity provider.
    pub tenant_id: String,

    /// Application (client) id; the expected token audience.
    pub client_id: String,

    /// JWKS endpoint for the tenant's signing keys.
    pub jwks_url: String,

    /// Expected token issuer.
    pub token_issuer: String,

    /// How long a fetched key set is served; `None` keeps it for the
    /// process lifetime.
    pub jwks_cache_ttl: Option<Duration>,

    /// Public domain the frontend is served from.
    pub domain: String,

    /// Port the frontend is served on.
    pub frontend_port: u16,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"[REDACTED]")
            .field("bind_address", &self.bind_address)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("jwks_url", &self.jwks_url)
            .field("token_issuer", &self.token_issuer)
            .field("jwks_cache_ttl", &self.jwks_cache_ttl)
            .field("domain", &self.domain)
            .field("frontend_port", &self.frontend_port)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWKS cache TTL configuration: {0}")]
    InvalidJwksCacheTtl(String),

    #[error("Invalid frontend port configuration: {0}")]
    InvalidFrontendPort(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let required = |name: &str| {
            vars.get(name)
                .filter(|v| !v.is_empty())
                .cloned()
                .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
        };

        let database_url = SecretString::from(required("DATABASE_URL")?);
        let tenant_id = required("AZURE_TENANT_ID")?;
        let client_id = required("AZURE_CLIENT_ID")?;

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let authority_host = vars
            .get("AZURE_AUTHORITY_HOST")
            .map(|host| host.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string());

        let jwks_url = vars
            .get("JWKS_URL")
            .cloned()
            .unwrap_or_else(|| format!("{authority_host}/{tenant_id}/discovery/v2.0/keys"));

        let token_issuer = vars
            .get("TOKEN_ISSUER")
            .cloned()
            .unwrap_or_else(|| format!("{authority_host}/{tenant_id}/v2.0"));

        let jwks_cache_ttl = match vars.get("JWKS_CACHE_TTL_SECONDS") {
            Some(value_str) => {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidJwksCacheTtl(format!(
                        "JWKS_CACHE_TTL_SECONDS must be a valid positive integer, got '{value_str}': {e}"
                    ))
                })?;

                if value == 0 {
                    return Err(ConfigError::InvalidJwksCacheTtl(
                        "JWKS_CACHE_TTL_SECONDS must be greater than 0".to_string(),
                    ));
                }

                Some(Duration::from_secs(value))
            }
            None => None,
        };

        let domain = vars
            .get("DOMAIN")
            .cloned()
            .unwrap_or_else(|| DEFAULT_DOMAIN.to_string());

        let frontend_port = match vars.get("FRONTEND_PORT") {
            Some(value_str) => value_str.parse().map_err(|e| {
                ConfigError::InvalidFrontendPort(format!(
                    "FRONTEND_PORT must be a valid port number, got '{value_str}': {e}"
                ))
            })?,
            None => DEFAULT_FRONTEND_PORT,
        };

        Ok(Config {
            database_url,
            bind_address,
            tenant_id,
            client_id,
            jwks_url,
            token_issuer,
            jwks_cache_ttl,
            domain,
            frontend_port,
        })
    }

    /// Public URL of the frontend.
    ///
    /// HTTPS only on port 443; the port is omitted for 80 and 443.
    pub fn frontend_url(&self) -> String {
        let protocol = if self.frontend_port == 443 { "https" } else { "http" };
        match self.frontend_port {
            80 | 443 => format!("{protocol}://{}", self.domain),
            port => format!("{protocol}://{}:{port}", self.domain),
        }
    }

    pub fn database_url(&self) -> &str {
        self.database_url.expose_secret()
    }
}
