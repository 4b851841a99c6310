//! Whombat API models.
//!
//! Contains data types used across the API service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A local user, resolved from a verified bearer token.
///
/// Returned by `GET /api/v1/auth/me`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserIdentity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: Option<String>,

    /// Identity provider object id (`oid`), unique across users.
    pub external_id: String,

    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserIdentity")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &"[REDACTED]")
            .field("external_id", &"[REDACTED]")
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

/// Fields for provisioning a new user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub name: Option<String>,
    pub external_id: String,
    pub is_active: bool,
}

/// Response for `GET /api/v1/config/frontend`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontendConfigResponse {
    pub frontend_url: String,
}

/// Readiness probe response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// "ready" or "not_ready".
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_provider: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
