//! Current user handler.

use crate::middleware::CurrentUser;
use crate::models::UserIdentity;
use axum::Json;
use tracing::instrument;

/// Handler for GET /api/v1/auth/me
///
/// Returns the user resolved by the auth middleware.
#[instrument(skip_all, name = "api.handlers.me")]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<UserIdentity> {
    tracing::debug!(target: "api.handlers.me", user_id = %user.id, "Returning current user");
    Json(user)
}
