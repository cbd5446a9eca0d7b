//! The boundary between Tempest and the game server hosting the worlds.
//!
//! Tempest never owns worlds, entities, or blocks. Everything it reads
//! (clock, entity positions, sky exposure) and everything it does
//! (particles, sounds, status, damage, block changes, chat announcements)
//! goes through the [`Host`] trait. Implementations must be cheap to call
//! from many effect jobs concurrently.
//!
//! # Clock
//!
//! Hosts typically expose a raw world time counting up
//! [`DayCycle::TICKS_PER_DAY`] units per day. [`DayCycle`] turns that into
//! the `(day_index, is_night)` pair the driver consumes.

use tempest_types::{
    BlockPos, EntityId, ParticleBurst, Position, SoundKind, StatusKind, WeatherKind, WorldId,
};

/// Errors reported by a [`Host`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The entity left the world between enumeration and use.
    #[error("entity {0} is no longer present")]
    EntityGone(EntityId),

    /// The world was unloaded.
    #[error("world {0} is unloaded")]
    WorldUnloaded(WorldId),

    /// Any other host-side failure.
    #[error("host unavailable: {0}")]
    Unavailable(String),
}

/// Snapshot of a world's clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    /// Number of whole days elapsed in the world.
    pub day_index: u64,
    /// Whether the world is currently in its night window.
    pub is_night: bool,
}

/// Derives day boundaries and the night window from a raw world time.
pub struct DayCycle;

impl DayCycle {
    /// Raw time units in one day.
    pub const TICKS_PER_DAY: u64 = 24_000;
    /// First time of day that counts as night.
    pub const NIGHT_START: u64 = 13_000;
    /// Last time of day that counts as night.
    pub const NIGHT_END: u64 = 23_000;
    /// Time of day a forced morning jumps to.
    pub const FORCED_DAY_TIME: u64 = 1_000;
    /// Time of day a forced night jumps to.
    pub const FORCED_NIGHT_TIME: u64 = 14_000;

    /// Read a raw, monotonically increasing world time.
    pub const fn reading(full_time: u64) -> ClockReading {
        let time_of_day = full_time % Self::TICKS_PER_DAY;
        ClockReading {
            day_index: full_time / Self::TICKS_PER_DAY,
            is_night: time_of_day >= Self::NIGHT_START && time_of_day <= Self::NIGHT_END,
        }
    }

    /// The raw time a forced transition should jump to: the next moment at
    /// or after `full_time` whose time of day is the forced morning or
    /// night. The clock never moves backwards.
    pub const fn forced_time(full_time: u64, is_day: bool) -> u64 {
        let day_start = full_time.saturating_sub(full_time % Self::TICKS_PER_DAY);
        let offset = if is_day {
            Self::FORCED_DAY_TIME
        } else {
            Self::FORCED_NIGHT_TIME
        };
        let target = day_start.saturating_add(offset);
        if target >= full_time {
            target
        } else {
            target.saturating_add(Self::TICKS_PER_DAY)
        }
    }
}

/// Services the hosting runtime provides to the simulation.
pub trait Host: Send + Sync + 'static {
    /// Worlds currently loaded.
    fn enumerate_worlds(&self) -> Vec<WorldId>;

    /// Host-side opt-out for a world. Configuration filtering is applied on top.
    fn is_world_enabled(&self, _world: WorldId) -> bool {
        true
    }

    /// Current clock of `world`.
    fn clock_tick(&self, world: WorldId) -> Result<ClockReading, HostError>;

    /// Move `world`'s clock to morning (`is_day`) or night.
    fn set_time_of_day(&self, world: WorldId, is_day: bool) -> Result<(), HostError>;

    /// Entities currently in `world`.
    fn present_entities(&self, world: WorldId) -> Result<Vec<EntityId>, HostError>;

    /// Current position of an entity.
    fn entity_position(&self, world: WorldId, entity: EntityId) -> Result<Position, HostError>;

    /// Whether nothing solid is between the entity and the sky.
    fn is_exposed_to_sky(&self, world: WorldId, entity: EntityId) -> Result<bool, HostError>;

    /// Highest solid block in the column `(x, z)` and its material.
    fn surface_block(
        &self,
        world: WorldId,
        x: i32,
        z: i32,
    ) -> Result<Option<(BlockPos, String)>, HostError>;

    /// Render a particle burst.
    fn emit_particles(&self, world: WorldId, burst: &ParticleBurst) -> Result<(), HostError>;

    /// Play a sound to one entity.
    fn play_sound(
        &self,
        world: WorldId,
        entity: EntityId,
        sound: SoundKind,
        volume: f64,
        pitch: f64,
    ) -> Result<(), HostError>;

    /// Apply or refresh a status condition.
    fn apply_status(
        &self,
        world: WorldId,
        entity: EntityId,
        status: StatusKind,
        amplifier: u8,
        duration_ticks: u32,
    ) -> Result<(), HostError>;

    /// Remove hit points.
    fn damage(&self, world: WorldId, entity: EntityId, amount: f64) -> Result<(), HostError>;

    /// Add velocity to an entity.
    fn push_entity(
        &self,
        world: WorldId,
        entity: EntityId,
        velocity: Position,
    ) -> Result<(), HostError>;

    /// Replace the block at `pos` with `material`.
    fn transform_block(&self, world: WorldId, pos: BlockPos, material: &str)
    -> Result<(), HostError>;

    /// Put `original` back at `pos`.
    fn revert_block(&self, world: WorldId, pos: BlockPos, original: &str)
    -> Result<(), HostError>;

    /// Tell an entity the weather changed.
    fn announce_weather(
        &self,
        world: WorldId,
        entity: EntityId,
        kind: WeatherKind,
    ) -> Result<(), HostError>;

    /// Drive the host's own rain and thunder rendering.
    fn set_native_precipitation(
        &self,
        world: WorldId,
        storm: bool,
        thundering: bool,
    ) -> Result<(), HostError>;
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn day_index_counts_whole_days() {
        assert_eq!(DayCycle::reading(0).day_index, 0);
        assert_eq!(DayCycle::reading(23_999).day_index, 0);
        assert_eq!(DayCycle::reading(24_000).day_index, 1);
        assert_eq!(DayCycle::reading(72_500).day_index, 3);
    }

    #[test]
    fn night_window_is_inclusive() {
        assert!(!DayCycle::reading(12_999).is_night);
        assert!(DayCycle::reading(13_000).is_night);
        assert!(DayCycle::reading(23_000).is_night);
        assert!(!DayCycle::reading(23_001).is_night);
        assert!(DayCycle::reading(24_000 + 18_000).is_night);
    }

    #[test]
    fn forced_time_moves_forward_within_the_day() {
        let now = 24_000 * 5 + 500;
        assert_eq!(DayCycle::forced_time(now, true), 24_000 * 5 + 1_000);
        assert_eq!(DayCycle::forced_time(now, false), 24_000 * 5 + 14_000);
        assert!(!DayCycle::reading(DayCycle::forced_time(now, true)).is_night);
        assert!(DayCycle::reading(DayCycle::forced_time(now, false)).is_night);
    }

    #[test]
    fn forcing_morning_at_night_reaches_the_next_day() {
        let now = 24_000 * 5 + 14_000;
        let forced = DayCycle::forced_time(now, true);
        assert!(forced >= now);
        assert_eq!(forced, 24_000 * 6 + 1_000);
        let reading = DayCycle::reading(forced);
        assert_eq!(reading.day_index, DayCycle::reading(now).day_index + 1);
        assert!(!reading.is_night);
    }

    #[test]
    fn forcing_the_current_phase_target_keeps_the_time() {
        let now = 24_000 * 2 + 14_000;
        assert_eq!(DayCycle::forced_time(now, false), now);
        let evening = 24_000 * 2 + 20_000;
        assert_eq!(DayCycle::forced_time(evening, false), 24_000 * 3 + 14_000);
    }
}
