//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports the [`secrecy`] types used for configuration values such as
//! database connection strings, which embed credentials. `SecretString`
//! implements `Debug` with redaction, so a config struct that derives or
//! hand-writes `Debug` never prints the underlying value.
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! let url = SecretString::from("postgresql://whombat:hunter2@db/whombat");
//! assert!(!format!("{url:?}").contains("hunter2"));
//! assert!(url.expose_secret().starts_with("postgresql://"));
//! ```

pub use secrecy::{ExposeSecret, SecretString};
