//! Authentication middleware for protected routes.
//!
//! Runs the Bearer Authenticator on the request headers and stores the
//! resolved user in the request extensions as [`CurrentUser`].

use crate::auth::BearerAuthenticator;
use crate::errors::ApiError;
use crate::models::UserIdentity;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::instrument;

/// State for the authentication middleware.
#[derive(Clone)]
pub struct AuthState {
    pub authenticator: Arc<BearerAuthenticator>,
}

/// The authenticated user for the current request.
///
/// Inserted by [`require_auth`]; handlers take it as an extractor.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub UserIdentity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<CurrentUser>().cloned().ok_or_else(|| {
            tracing::debug!(target: "api.middleware.auth", "No authenticated user on request");
            ApiError::MissingCredentials("Not authenticated".to_string())
        })
    }
}

/// Authentication middleware.
///
/// # Response
///
/// - 401 with `WWW-Authenticate` and `{"detail": <reason>}` when
///   authentication fails
/// - 500 when the user store fails
/// - Otherwise continues to the next handler with [`CurrentUser`] set
#[instrument(skip_all, name = "api.middleware.auth")]
pub async fn require_auth(
    State(state): State<AuthState>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .authenticator
        .authenticate(req.headers())
        .await
        .map_err(|e| {
            tracing::debug!(target: "api.middleware.auth", kind = e.kind(), "Authentication failed");
            ApiError::from(e)
        })?;

    req.extensions_mut().insert(CurrentUser(user));

    Ok(next.run(req).await)
}
