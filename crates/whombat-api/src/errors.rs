//! API error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl. The
//! response body is always `{"detail": "<reason>"}`, the shape the frontend
//! already consumes. Database details are logged server-side and replaced by
//! a generic message on the wire.

use crate::auth::AuthError;
use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Challenge sent when the request carried no credentials (RFC 6750 §3.1).
const BEARER_CHALLENGE: &str = "Bearer realm=\"whombat\"";

/// Challenge sent when the presented token was rejected.
const INVALID_TOKEN_CHALLENGE: &str = "Bearer realm=\"whombat\", error=\"invalid_token\"";

/// API error type.
///
/// Maps to HTTP status codes:
/// - MissingCredentials, Unauthorized: 401 Unauthorized
/// - Database: 500 Internal Server Error
#[derive(Debug, Error)]
pub enum ApiError {
    /// No bearer token on the request.
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// A bearer token was presented and rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Database error: {0}")]
    Database(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail, challenge) = match self {
            ApiError::MissingCredentials(reason) => {
                (StatusCode::UNAUTHORIZED, reason, Some(BEARER_CHALLENGE))
            }
            ApiError::Unauthorized(reason) => {
                (StatusCode::UNAUTHORIZED, reason, Some(INVALID_TOKEN_CHALLENGE))
            }
            ApiError::Database(err) => {
                tracing::error!(target: "api.database", error = %err, "Database operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal database error occurred".to_string(),
                    None,
                )
            }
        };

        let mut response = (status, Json(ErrorResponse { detail })).into_response();

        if let Some(challenge) = challenge {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static(challenge));
        }

        response
    }
}

/// Authentication failures keep their reason; store outages do not become 401s.
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => ApiError::MissingCredentials(err.to_string()),
            AuthError::UserStore(reason) => ApiError::Database(reason),
            other => ApiError::Unauthorized(other.to_string()),
        }
    }
}
