//! Shared type definitions for the Tempest atmosphere simulation.
//!
//! This crate holds the value types every other Tempest crate agrees on:
//! world and entity identifiers, the fixed weather taxonomy, the season
//! cycle, and the data-driven effect descriptors interpreted by the effect
//! scheduler.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for worlds and entities
//! - [`weather`] -- Weather kinds, categories, and lookup helpers
//! - [`season`] -- Season cycle and default weather pools
//! - [`effect`] -- Effect descriptors, positions, and host-facing payloads

pub mod effect;
pub mod ids;
pub mod season;
pub mod weather;

// Re-export all public types at crate root for convenience.
pub use effect::{
    BlockPos, EffectDescriptor, EffectKind, ParticleBurst, ParticleKind, Position, SoundKind,
    StatusKind,
};
pub use ids::{EntityId, WorldId};
pub use season::SeasonKind;
pub use weather::{WeatherCategory, WeatherKind};
