//! Dragonfly persistence backend for the Tempest atmosphere simulation.
//!
//! Each world's atmosphere lives in one hash, written field by field so a
//! partial update never clobbers the rest of the record.
//!
//! # Modules
//!
//! - [`dragonfly`] -- `Dragonfly` (Redis-compatible) [`AtmosphereStore`]
//! - [`error`] -- Shared error types
//!
//! [`AtmosphereStore`]: tempest_core::AtmosphereStore

pub mod dragonfly;
pub mod error;

pub use dragonfly::DragonflyStore;
pub use error::DbError;
