//! Weather effects: the table of recurring effects per weather kind, the
//! generic job that runs one of them, and the scheduler that keeps exactly
//! one effect set alive per world.
//!
//! # Modules
//!
//! - [`catalog`] -- [`effects_for`], the weather to effect table.
//! - [`job`] -- [`CancelToken`], [`BlockLedger`], and the periodic job.
//! - [`scheduler`] -- [`EffectScheduler`], per-world effect lifecycle.

pub mod catalog;
pub mod job;
pub mod scheduler;

pub use catalog::effects_for;
pub use job::{BlockLedger, CancelToken};
pub use scheduler::EffectScheduler;
