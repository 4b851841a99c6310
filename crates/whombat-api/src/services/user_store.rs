//! User Store collaborator.
//!
//! The authenticator resolves verified identities through the [`UserStore`]
//! trait: look up by provider object id, and create when missing. Creation
//! must report a duplicate object id as [`UserStoreError::Conflict`] so the
//! caller can recover from a concurrent first sign-in by re-fetching.

use crate::repositories::users;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

pub use crate::models::{NewUser, UserIdentity};

/// User store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UserStoreError {
    #[error("user not found")]
    NotFound,

    /// A user with the same external id already exists.
    #[error("user with this external id already exists")]
    Conflict,

    #[error("database error: {0}")]
    Database(String),
}

/// Trait for user store operations (enables mocking).
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by identity provider object id.
    ///
    /// Fails with `NotFound` if no such user exists.
    async fn find_by_external_id(&self, external_id: &str) -> Result<UserIdentity, UserStoreError>;

    /// Create a user, committing before returning.
    ///
    /// Fails with `Conflict` if the external id is already taken.
    async fn create(&self, user: NewUser) -> Result<UserIdentity, UserStoreError>;
}

/// Postgres-backed user store.
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    #[instrument(skip_all)]
    async fn find_by_external_id(&self, external_id: &str) -> Result<UserIdentity, UserStoreError> {
        users::get_by_external_id(&self.pool, external_id)
            .await
            .map_err(|e| UserStoreError::Database(e.to_string()))?
            .ok_or(UserStoreError::NotFound)
    }

    #[instrument(skip_all)]
    async fn create(&self, user: NewUser) -> Result<UserIdentity, UserStoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| UserStoreError::Database(e.to_string()))?;

        let created = users::insert_user(&mut *tx, &user).await.map_err(|e| {
            if users::is_external_id_conflict(&e) {
                UserStoreError::Conflict
            } else {
                UserStoreError::Database(e.to_string())
            }
        })?;

        tx.commit()
            .await
            .map_err(|e| UserStoreError::Database(e.to_string()))?;

        Ok(created)
    }
}

/// In-memory user store for testing.
pub mod mock {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::{Barrier, Mutex};
    use uuid::Uuid;

    /// In-memory user store keyed by external id.
    #[derive(Default)]
    pub struct InMemoryUserStore {
        users: Mutex<HashMap<String, UserIdentity>>,
        find_count: AtomicUsize,
        create_count: AtomicUsize,
        /// Next create inserts the user but reports `Conflict`.
        lose_next_create: AtomicBool,
        /// Every call returns `Database`.
        failing: bool,
        /// Holds the first `race_remaining` lookups until all of them have
        /// read the map, so they all miss before anyone creates.
        race_gate: Option<Barrier>,
        race_remaining: AtomicUsize,
    }

    impl InMemoryUserStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Create a store whose first `create` behaves as if a concurrent
        /// request inserted the same user first.
        pub fn losing_race() -> Self {
            Self {
                lose_next_create: AtomicBool::new(true),
                ..Self::default()
            }
        }

        /// Create a store where the first `callers` lookups all miss, as
        /// when that many first sign-ins for one user arrive together.
        pub fn racing(callers: usize) -> Self {
            Self {
                race_gate: Some(Barrier::new(callers)),
                race_remaining: AtomicUsize::new(callers),
                ..Self::default()
            }
        }

        /// Create a store that fails every call.
        pub fn failing() -> Self {
            Self {
                failing: true,
                ..Self::default()
            }
        }

        pub fn find_count(&self) -> usize {
            self.find_count.load(Ordering::SeqCst)
        }

        pub fn create_count(&self) -> usize {
            self.create_count.load(Ordering::SeqCst)
        }

        pub async fn user_count(&self) -> usize {
            self.users.lock().await.len()
        }

        pub async fn get(&self, external_id: &str) -> Option<UserIdentity> {
            self.users.lock().await.get(external_id).cloned()
        }
    }

    #[async_trait]
    impl UserStore for InMemoryUserStore {
        async fn find_by_external_id(&self, external_id: &str) -> Result<UserIdentity, UserStoreError> {
            self.find_count.fetch_add(1, Ordering::SeqCst);

            if self.failing {
                return Err(UserStoreError::Database("mock user store failure".to_string()));
            }

            let found = self.users.lock().await.get(external_id).cloned();

            if let Some(gate) = &self.race_gate {
                let gated = self
                    .race_remaining
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();
                if gated {
                    gate.wait().await;
                }
            }

            found.ok_or(UserStoreError::NotFound)
        }

        async fn create(&self, user: NewUser) -> Result<UserIdentity, UserStoreError> {
            self.create_count.fetch_add(1, Ordering::SeqCst);

            if self.failing {
                return Err(UserStoreError::Database("mock user store failure".to_string()));
            }

            let mut users = self.users.lock().await;
            if users.contains_key(&user.external_id) {
                return Err(UserStoreError::Conflict);
            }

            let created = UserIdentity {
                id: Uuid::new_v4(),
                username: user.username,
                email: user.email,
                name: user.name,
                external_id: user.external_id.clone(),
                is_active: user.is_active,
                created_at: Utc::now(),
            };
            users.insert(user.external_id, created.clone());

            if self.lose_next_create.swap(false, Ordering::SeqCst) {
                return Err(UserStoreError::Conflict);
            }

            Ok(created)
        }
    }

}
