//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and shutdown.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: tempest_core::config::ConfigError,
    },

    /// The atmosphere rejected its configuration or a world.
    #[error("atmosphere error: {source}")]
    Atmosphere {
        /// The underlying atmosphere error.
        #[from]
        source: tempest_core::AtmosphereError,
    },

    /// The Dragonfly backend could not be reached.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying data layer error.
        #[from]
        source: tempest_db::DbError,
    },

    /// Simulated host configuration was unusable.
    #[error("simulation error: {message}")]
    Sim {
        /// Description of the failure.
        message: String,
    },

    /// Waiting for the shutdown signal failed.
    #[error("signal error: {source}")]
    Signal {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}
