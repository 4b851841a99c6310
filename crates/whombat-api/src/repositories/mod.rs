//! Repository layer for the Whombat API.
//!
//! Provides database access patterns following the Handler -> Service -> Repository
//! architecture.

pub mod users;
