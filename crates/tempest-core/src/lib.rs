//! Season, weather, night-cycle, and effect scheduling for the Tempest
//! atmosphere simulation.
//!
//! A host runtime (a game server, a simulator, a test double) implements
//! [`Host`]. The [`Atmosphere`] tracks every enabled world of that host,
//! persists its state through a [`Persistence`] writer, runs recurring
//! weather effects, and is advanced by the [`SimulationDriver`].
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `tempest-config.yaml` into
//!   strongly-typed structs.
//! - [`context`] -- Per-world state and the shared [`Services`].
//! - [`driver`] -- The periodic [`SimulationDriver`].
//! - [`effects`] -- Effect table, periodic jobs, and the scheduler.
//! - [`engine`] -- The [`Atmosphere`] API.
//! - [`error`] -- [`AtmosphereError`].
//! - [`host`] -- The [`Host`] trait and world clock arithmetic.
//! - [`notify`] -- Cancellable change notifications.
//! - [`persistence`] -- Per-world records and the ordered writer task.
//! - [`pools`] -- Weighted seasonal weather pools.
//! - [`season`] -- Season transitions and [`DayAdvance`].
//! - [`settings`] -- Hot-settable runtime settings.
//!
//! [`Services`]: context::Services

pub mod config;
pub mod context;
pub mod driver;
pub mod effects;
pub mod engine;
pub mod error;
pub mod host;
mod night;
pub mod notify;
pub mod persistence;
pub mod pools;
pub mod season;
pub mod settings;
mod weather;

#[cfg(test)]
mod test_support;

pub use config::AtmosphereConfig;
pub use driver::SimulationDriver;
pub use engine::Atmosphere;
pub use error::AtmosphereError;
pub use host::{ClockReading, Host, HostError};
pub use notify::{ChangeObserver, Verdict};
pub use persistence::{AtmosphereStore, MemoryStore, Persistence, StoreError};
pub use season::DayAdvance;
