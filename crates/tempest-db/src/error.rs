//! Error types for the data layer.
//!
//! Backend failures are reported as [`DbError`] and converted into the
//! engine's [`StoreError`] at the [`AtmosphereStore`] boundary.
//!
//! [`AtmosphereStore`]: tempest_core::AtmosphereStore

use tempest_core::StoreError;

/// Errors that can occur in the data layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<DbError> for StoreError {
    fn from(e: DbError) -> Self {
        Self::Backend {
            message: e.to_string(),
        }
    }
}
