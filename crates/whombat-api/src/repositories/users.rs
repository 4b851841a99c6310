//! User repository module for database operations.
//!
//! Provides lookup and insertion of provisioned users.
//!
//! # Security
//!
//! - All queries use parameterized statements
//! - Provider object ids and emails are not logged

use crate::models::{NewUser, UserIdentity};
use sqlx::{PgExecutor, PgPool};
use tracing::instrument;
use uuid::Uuid;

/// Unique constraint on `users.external_id`.
pub const EXTERNAL_ID_CONSTRAINT: &str = "users_external_id_unique";

/// Get a user by identity provider object id.
#[instrument(skip_all)]
pub async fn get_by_external_id(
    pool: &PgPool,
    external_id: &str,
) -> Result<Option<UserIdentity>, sqlx::Error> {
    let user = sqlx::query_as::<_, UserIdentity>(
        r#"
        SELECT id, username, email, name, external_id, is_active, created_at
        FROM users
        WHERE external_id = $1
        "#,
    )
    .bind(external_id)
    .fetch_optional(pool)
    .await?;

    tracing::debug!(target: "api.repositories.users", found = user.is_some(), "Looked up user by external id");
    Ok(user)
}

/// Get a user by local id.
#[instrument(skip_all, fields(user_id = %id))]
pub async fn get_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserIdentity>, sqlx::Error> {
    sqlx::query_as::<_, UserIdentity>(
        r#"
        SELECT id, username, email, name, external_id, is_active, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Insert a user and return the stored row.
///
/// Accepts any executor so callers can run it inside a transaction. A
/// duplicate `external_id` fails with a database error whose constraint is
/// [`EXTERNAL_ID_CONSTRAINT`]; see [`is_external_id_conflict`].
#[instrument(skip_all)]
pub async fn insert_user<'e, E>(executor: E, user: &NewUser) -> Result<UserIdentity, sqlx::Error>
where
    E: PgExecutor<'e>,
{
    let created = sqlx::query_as::<_, UserIdentity>(
        r#"
        INSERT INTO users (username, email, name, external_id, is_active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, username, email, name, external_id, is_active, created_at
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.external_id)
    .bind(user.is_active)
    .fetch_one(executor)
    .await?;

    tracing::info!(target: "api.repositories.users", user_id = %created.id, "User inserted");
    Ok(created)
}

/// Whether an error is a unique violation on the external id.
pub fn is_external_id_conflict(err: &sqlx::Error) -> bool {
    err.as_database_error().is_some_and(|db_err| {
        db_err.is_unique_violation() && db_err.constraint() == Some(EXTERNAL_ID_CONSTRAINT)
    })
}
