//! Error types for the atmosphere engine.
//!
//! Vetoes are not errors: a vetoed transition returns `false` and leaves
//! state untouched. [`AtmosphereError`] covers invalid input and host
//! failures surfaced through the public API.

use tempest_types::{WeatherKind, WorldId};

use crate::config::ConfigError;
use crate::host::HostError;

/// Errors returned by [`Atmosphere`](crate::engine::Atmosphere) operations.
#[derive(Debug, thiserror::Error)]
pub enum AtmosphereError {
    /// A weather id did not match any known kind.
    #[error("unknown weather type: {id}")]
    UnknownWeather {
        /// The rejected id.
        id: String,
    },

    /// A season id did not match any known season.
    #[error("unknown season: {id}")]
    UnknownSeason {
        /// The rejected id.
        id: String,
    },

    /// The weather kind is internal and cannot be set directly.
    #[error("weather type {kind} is reserved")]
    ReservedWeather {
        /// The rejected kind.
        kind: WeatherKind,
    },

    /// The world is excluded by host or configuration.
    #[error("world {world} is not enabled")]
    WorldDisabled {
        /// The excluded world.
        world: WorldId,
    },

    /// A host call failed.
    #[error("host error: {source}")]
    Host {
        /// The underlying host error.
        #[from]
        source: HostError,
    },

    /// A runtime setting was out of range.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: ConfigError,
    },
}
