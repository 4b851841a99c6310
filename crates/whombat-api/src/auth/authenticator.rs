//! Bearer Authenticator.
//!
//! Turns an `Authorization: Bearer <token>` header into a local
//! [`UserIdentity`]: verify the token, extract the provider identity, then
//! resolve or provision the matching user.
//!
//! # Provisioning races
//!
//! Two first-time requests for the same object id can both miss the lookup
//! and both attempt a create. The store rejects the second create with
//! `Conflict`, and the loser re-fetches the winner's row instead of failing.

use crate::auth::claims::ProviderIdentity;
use crate::auth::jwt::TokenVerifier;
use crate::auth::AuthError;
use crate::observability::metrics;
use crate::services::user_store::{NewUser, UserIdentity, UserStore, UserStoreError};
use axum::http::{header, HeaderMap};
use std::sync::Arc;
use tracing::instrument;

/// Authenticates requests and resolves them to local users.
pub struct BearerAuthenticator {
    verifier: TokenVerifier,
    user_store: Arc<dyn UserStore>,
}

impl BearerAuthenticator {
    pub fn new(verifier: TokenVerifier, user_store: Arc<dyn UserStore>) -> Self {
        Self {
            verifier,
            user_store,
        }
    }

    /// Authenticate a request from its headers.
    ///
    /// # Errors
    ///
    /// - `MissingCredentials` - no usable bearer token; the identity
    ///   provider is not contacted
    /// - `KeyFetch`, `InvalidAlgorithm`, `TokenValidation` - from verification
    /// - `MalformedClaims` - `oid` or `preferred_username` absent
    /// - `UserStore` - the store failed while resolving the user
    #[instrument(skip_all)]
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<UserIdentity, AuthError> {
        let result = self.authenticate_inner(headers).await;
        metrics::record_authentication(match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        });
        result
    }

    async fn authenticate_inner(&self, headers: &HeaderMap) -> Result<UserIdentity, AuthError> {
        let token = extract_bearer_token(headers).ok_or_else(|| {
            tracing::debug!(target: "api.auth.authenticator", "Missing or invalid Authorization header");
            AuthError::MissingCredentials
        })?;

        let claims = self.verifier.verify(token).await?;
        let identity = claims.identity()?;

        self.resolve_user(&identity).await
    }

    async fn resolve_user(&self, identity: &ProviderIdentity) -> Result<UserIdentity, AuthError> {
        match self.user_store.find_by_external_id(&identity.oid).await {
            Ok(user) => return Ok(user),
            Err(UserStoreError::NotFound) => {}
            Err(e) => return Err(store_error(e)),
        }

        let new_user = NewUser {
            username: identity.username().to_string(),
            email: identity.preferred_username.clone(),
            name: identity.name.clone(),
            external_id: identity.oid.clone(),
            is_active: true,
        };

        match self.user_store.create(new_user).await {
            Ok(user) => {
                tracing::info!(target: "api.auth.authenticator", user_id = %user.id, "Provisioned new user");
                metrics::record_user_provisioned("created");
                Ok(user)
            }
            Err(UserStoreError::Conflict) => {
                tracing::debug!(target: "api.auth.authenticator", "User created concurrently, re-fetching");
                metrics::record_user_provisioned("conflict_recovered");
                self.user_store
                    .find_by_external_id(&identity.oid)
                    .await
                    .map_err(store_error)
            }
            Err(e) => {
                metrics::record_user_provisioned("error");
                Err(store_error(e))
            }
        }
    }
}

fn store_error(err: UserStoreError) -> AuthError {
    tracing::error!(target: "api.auth.authenticator", error = %err, "User store operation failed");
    AuthError::UserStore(err.to_string())
}

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is matched case-insensitively. Returns `None` for a missing
/// header, another scheme, or an empty token.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
