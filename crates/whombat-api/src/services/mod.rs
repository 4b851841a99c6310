//! Service layer for the Whombat API.
//!
//! # Components
//!
//! - `user_store` - User Store collaborator (Postgres and in-memory)

pub mod user_store;

pub use user_store::{PgUserStore, UserStore, UserStoreError};
