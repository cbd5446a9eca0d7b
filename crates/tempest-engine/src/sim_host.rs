//! A simulated host for running the atmosphere without a game server.
//!
//! Each simulated world has a clock that advances with wall time at a
//! configurable rate, a handful of stationary entities, and a flat
//! surface of grass. Effects are not rendered; they are logged at `debug`
//! and `trace` so a run can be inspected with `RUST_LOG`.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tempest_core::host::DayCycle;
use tempest_core::{ClockReading, Host, HostError};
use tempest_types::{
    BlockPos, EntityId, ParticleBurst, Position, SoundKind, StatusKind, WeatherKind, WorldId,
};
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::error::EngineError;

/// Surface height of every simulated column.
const SURFACE_Y: i32 = 64;

/// Material every column starts with.
const GROUND: &str = "grass_block";

// -----------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------

/// Configuration for the simulated host, loaded from the `sim` section of
/// `tempest-config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SimConfig {
    /// Number of worlds to simulate.
    #[serde(default = "default_worlds")]
    pub worlds: u32,

    /// Entities standing in each world.
    #[serde(default = "default_entities_per_world")]
    pub entities_per_world: u32,

    /// World time units that pass per real second.
    #[serde(default = "default_time_scale")]
    pub time_scale: u64,

    /// Seed for entity placement.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            worlds: default_worlds(),
            entities_per_world: default_entities_per_world(),
            time_scale: default_time_scale(),
            seed: None,
        }
    }
}

const fn default_worlds() -> u32 {
    1
}

const fn default_entities_per_world() -> u32 {
    4
}

const fn default_time_scale() -> u64 {
    20
}

// -----------------------------------------------------------------------
// World state
// -----------------------------------------------------------------------

struct SimEntity {
    id: EntityId,
    position: Position,
    sheltered: bool,
}

/// A world clock pinned to `anchor_time` at `anchor_at`.
#[derive(Clone, Copy)]
struct Clock {
    anchor_time: u64,
    anchor_at: Instant,
}

struct SimWorld {
    entities: Vec<SimEntity>,
    clock: Mutex<Clock>,
    blocks: Mutex<HashMap<(i32, i32), String>>,
}

/// In-process [`Host`] with simulated worlds.
pub struct SimHost {
    worlds: HashMap<WorldId, SimWorld>,
    order: Vec<WorldId>,
    time_scale: u64,
}

impl SimHost {
    /// Build the simulated worlds.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Sim`] if no worlds or a zero time scale are
    /// configured.
    pub fn new(config: &SimConfig) -> Result<Self, EngineError> {
        if config.worlds == 0 {
            return Err(EngineError::Sim {
                message: String::from("sim.worlds must be at least 1"),
            });
        }
        if config.time_scale == 0 {
            return Err(EngineError::Sim {
                message: String::from("sim.time_scale must be at least 1"),
            });
        }

        let mut rng = config
            .seed
            .map_or_else(SmallRng::from_os_rng, SmallRng::seed_from_u64);
        let now = Instant::now();
        let mut worlds = HashMap::new();
        let mut order = Vec::new();
        for _ in 0..config.worlds {
            let id = WorldId::new();
            let entities = (0..config.entities_per_world)
                .map(|index| SimEntity {
                    id: EntityId::new(),
                    position: Position::new(
                        rng.random_range(-64.0..64.0),
                        f64::from(SURFACE_Y) + 1.0,
                        rng.random_range(-64.0..64.0),
                    ),
                    sheltered: index % 3 == 2,
                })
                .collect();
            worlds.insert(
                id,
                SimWorld {
                    entities,
                    clock: Mutex::new(Clock {
                        anchor_time: DayCycle::FORCED_DAY_TIME,
                        anchor_at: now,
                    }),
                    blocks: Mutex::new(HashMap::new()),
                },
            );
            order.push(id);
        }

        info!(
            worlds = config.worlds,
            entities_per_world = config.entities_per_world,
            time_scale = config.time_scale,
            "Simulated host created"
        );
        Ok(Self {
            worlds,
            order,
            time_scale: config.time_scale,
        })
    }

    fn world(&self, world: WorldId) -> Result<&SimWorld, HostError> {
        self.worlds
            .get(&world)
            .ok_or(HostError::WorldUnloaded(world))
    }

    fn entity(&self, world: WorldId, entity: EntityId) -> Result<&SimEntity, HostError> {
        self.world(world)?
            .entities
            .iter()
            .find(|e| e.id == entity)
            .ok_or(HostError::EntityGone(entity))
    }

    fn full_time(&self, clock: Clock) -> u64 {
        let elapsed_ms = u64::try_from(clock.anchor_at.elapsed().as_millis()).unwrap_or(u64::MAX);
        let advanced = elapsed_ms.saturating_mul(self.time_scale) / 1_000;
        clock.anchor_time.saturating_add(advanced)
    }
}

fn poisoned<T>(e: PoisonError<T>) -> HostError {
    HostError::Unavailable(format!("simulated world state poisoned: {e}"))
}

impl Host for SimHost {
    fn enumerate_worlds(&self) -> Vec<WorldId> {
        self.order.clone()
    }

    fn clock_tick(&self, world: WorldId) -> Result<ClockReading, HostError> {
        let clock = *self
            .world(world)?
            .clock
            .lock()
            .map_err(poisoned)?;
        Ok(DayCycle::reading(self.full_time(clock)))
    }

    fn set_time_of_day(&self, world: WorldId, is_day: bool) -> Result<(), HostError> {
        let sim = self.world(world)?;
        let mut clock = sim.clock.lock().map_err(poisoned)?;
        let target = DayCycle::forced_time(self.full_time(*clock), is_day);
        *clock = Clock {
            anchor_time: target,
            anchor_at: Instant::now(),
        };
        info!(world = %world, is_day, time = target, "World clock moved");
        Ok(())
    }

    fn present_entities(&self, world: WorldId) -> Result<Vec<EntityId>, HostError> {
        Ok(self.world(world)?.entities.iter().map(|e| e.id).collect())
    }

    fn entity_position(&self, world: WorldId, entity: EntityId) -> Result<Position, HostError> {
        Ok(self.entity(world, entity)?.position)
    }

    fn is_exposed_to_sky(&self, world: WorldId, entity: EntityId) -> Result<bool, HostError> {
        Ok(!self.entity(world, entity)?.sheltered)
    }

    fn surface_block(
        &self,
        world: WorldId,
        x: i32,
        z: i32,
    ) -> Result<Option<(BlockPos, String)>, HostError> {
        let blocks = self
            .world(world)?
            .blocks
            .lock()
            .map_err(poisoned)?;
        let material = blocks
            .get(&(x, z))
            .cloned()
            .unwrap_or_else(|| GROUND.to_owned());
        Ok(Some((BlockPos::new(x, SURFACE_Y, z), material)))
    }

    fn emit_particles(&self, world: WorldId, burst: &ParticleBurst) -> Result<(), HostError> {
        self.world(world)?;
        trace!(world = %world, particle = ?burst.particle, count = burst.count, "Particles");
        Ok(())
    }

    fn play_sound(
        &self,
        world: WorldId,
        entity: EntityId,
        sound: SoundKind,
        volume: f64,
        pitch: f64,
    ) -> Result<(), HostError> {
        self.entity(world, entity)?;
        trace!(world = %world, entity = %entity, ?sound, volume, pitch, "Sound");
        Ok(())
    }

    fn apply_status(
        &self,
        world: WorldId,
        entity: EntityId,
        status: StatusKind,
        amplifier: u8,
        duration_ticks: u32,
    ) -> Result<(), HostError> {
        self.entity(world, entity)?;
        debug!(world = %world, entity = %entity, ?status, amplifier, duration_ticks, "Status applied");
        Ok(())
    }

    fn damage(&self, world: WorldId, entity: EntityId, amount: f64) -> Result<(), HostError> {
        self.entity(world, entity)?;
        debug!(world = %world, entity = %entity, amount, "Entity damaged");
        Ok(())
    }

    fn push_entity(
        &self,
        world: WorldId,
        entity: EntityId,
        velocity: Position,
    ) -> Result<(), HostError> {
        self.entity(world, entity)?;
        trace!(world = %world, entity = %entity, ?velocity, "Entity pushed");
        Ok(())
    }

    fn transform_block(
        &self,
        world: WorldId,
        pos: BlockPos,
        material: &str,
    ) -> Result<(), HostError> {
        self.world(world)?
            .blocks
            .lock()
            .map_err(poisoned)?
            .insert((pos.x, pos.z), material.to_owned());
        debug!(world = %world, ?pos, material, "Block transformed");
        Ok(())
    }

    fn revert_block(&self, world: WorldId, pos: BlockPos, original: &str) -> Result<(), HostError> {
        let mut blocks = self
            .world(world)?
            .blocks
            .lock()
            .map_err(poisoned)?;
        if original == GROUND {
            blocks.remove(&(pos.x, pos.z));
        } else {
            blocks.insert((pos.x, pos.z), original.to_owned());
        }
        debug!(world = %world, ?pos, original, "Block reverted");
        Ok(())
    }

    fn announce_weather(
        &self,
        world: WorldId,
        entity: EntityId,
        kind: WeatherKind,
    ) -> Result<(), HostError> {
        self.entity(world, entity)?;
        debug!(world = %world, entity = %entity, weather = %kind, "Weather announced");
        Ok(())
    }

    fn set_native_precipitation(
        &self,
        world: WorldId,
        storm: bool,
        thundering: bool,
    ) -> Result<(), HostError> {
        self.world(world)?;
        debug!(world = %world, storm, thundering, "Native precipitation");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::arithmetic_side_effects)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn host() -> SimHost {
        SimHost::new(&SimConfig {
            worlds: 2,
            entities_per_world: 3,
            time_scale: 1_000,
            seed: Some(9),
        })
        .unwrap()
    }

    #[test]
    fn rejects_empty_simulations() {
        let config = SimConfig {
            worlds: 0,
            ..SimConfig::default()
        };
        assert!(matches!(SimHost::new(&config), Err(EngineError::Sim { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn clock_runs_with_wall_time() {
        let host = host();
        let world = host.enumerate_worlds()[0];
        assert_eq!(host.clock_tick(world).unwrap().day_index, 0);
        assert!(!host.clock_tick(world).unwrap().is_night);

        tokio::time::advance(Duration::from_secs(13)).await;
        assert!(host.clock_tick(world).unwrap().is_night);
        tokio::time::advance(Duration::from_secs(11)).await;
        let reading = host.clock_tick(world).unwrap();
        assert_eq!(reading.day_index, 1);
        assert!(!reading.is_night);
    }

    #[tokio::test(start_paused = true)]
    async fn forced_night_sticks() {
        let host = host();
        let world = host.enumerate_worlds()[1];
        host.set_time_of_day(world, false).unwrap();
        let night = host.clock_tick(world).unwrap();
        assert!(night.is_night);
        host.set_time_of_day(world, true).unwrap();
        let morning = host.clock_tick(world).unwrap();
        assert!(!morning.is_night);
        assert_eq!(morning.day_index, night.day_index + 1);
    }

    #[test]
    fn blocks_transform_and_revert() {
        let host = SimHost::new(&SimConfig::default()).unwrap();
        let world = host.enumerate_worlds()[0];
        let (pos, material) = host.surface_block(world, 3, -7).unwrap().unwrap();
        assert_eq!(material, GROUND);
        host.transform_block(world, pos, "snow_block").unwrap();
        assert_eq!(host.surface_block(world, 3, -7).unwrap().unwrap().1, "snow_block");
        host.revert_block(world, pos, GROUND).unwrap();
        assert_eq!(host.surface_block(world, 3, -7).unwrap().unwrap().1, GROUND);
    }

    #[test]
    fn unknown_ids_are_reported() {
        let host = SimHost::new(&SimConfig::default()).unwrap();
        let world = host.enumerate_worlds()[0];
        let stranger = EntityId::new();
        assert_eq!(
            host.entity_position(world, stranger),
            Err(HostError::EntityGone(stranger))
        );
        let missing = WorldId::new();
        assert_eq!(
            host.present_entities(missing),
            Err(HostError::WorldUnloaded(missing))
        );
    }

    #[test]
    fn every_third_entity_is_sheltered() {
        let host = host();
        let world = host.enumerate_worlds()[0];
        let exposed: Vec<bool> = host
            .present_entities(world)
            .unwrap()
            .into_iter()
            .map(|entity| host.is_exposed_to_sky(world, entity).unwrap())
            .collect();
        assert_eq!(exposed, vec![true, true, false]);
    }
}
