//! In-memory host that records every call, for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tempest_types::{
    BlockPos, EntityId, ParticleBurst, ParticleKind, Position, SoundKind, StatusKind,
    WeatherKind, WorldId,
};

use crate::config::AtmosphereConfig;
use crate::engine::Atmosphere;
use crate::host::{ClockReading, DayCycle, Host, HostError};
use crate::persistence::{AtmosphereStore, MemoryStore, Persistence, StoreError};

pub const GROUND: &str = "grass_block";

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Particles {
        world: WorldId,
        particle: ParticleKind,
        count: u32,
    },
    Sound {
        entity: EntityId,
        sound: SoundKind,
    },
    Status {
        entity: EntityId,
        status: StatusKind,
    },
    Damage {
        entity: EntityId,
        amount: f64,
    },
    Push {
        entity: EntityId,
    },
    Transform {
        pos: BlockPos,
        material: String,
    },
    Revert {
        pos: BlockPos,
        material: String,
    },
    Announce {
        entity: EntityId,
        kind: WeatherKind,
    },
    Native {
        world: WorldId,
        storm: bool,
        thundering: bool,
    },
    TimeOfDay {
        world: WorldId,
        is_day: bool,
    },
}

#[derive(Debug, Default)]
struct HostState {
    worlds: Vec<WorldId>,
    clocks: HashMap<WorldId, u64>,
    entities: HashMap<WorldId, Vec<(EntityId, Position)>>,
    sheltered: HashSet<EntityId>,
    gone: HashSet<EntityId>,
    unloaded: HashSet<WorldId>,
    surface: HashMap<(WorldId, i32, i32), String>,
    calls: Vec<HostCall>,
}

impl HostState {
    fn world(&self, world: WorldId) -> Result<(), HostError> {
        if self.unloaded.contains(&world) || !self.worlds.contains(&world) {
            return Err(HostError::WorldUnloaded(world));
        }
        Ok(())
    }

    fn entity(&self, world: WorldId, entity: EntityId) -> Result<(), HostError> {
        self.world(world)?;
        if self.gone.contains(&entity) {
            return Err(HostError::EntityGone(entity));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct RecordingHost {
    state: Mutex<HostState>,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a daytime world with one exposed entity standing on the surface.
    pub fn add_world(&self) -> (WorldId, EntityId) {
        let world = WorldId::new();
        let mut state = self.state.lock().unwrap();
        state.worlds.push(world);
        state.clocks.insert(world, DayCycle::FORCED_DAY_TIME);
        drop(state);
        let entity = self.add_entity(world, Position::new(0.5, 65.0, 0.5));
        (world, entity)
    }

    pub fn add_entity(&self, world: WorldId, position: Position) -> EntityId {
        let entity = EntityId::new();
        self.state
            .lock()
            .unwrap()
            .entities
            .entry(world)
            .or_default()
            .push((entity, position));
        entity
    }

    pub fn set_time(&self, world: WorldId, full_time: u64) {
        self.state.lock().unwrap().clocks.insert(world, full_time);
    }

    pub fn shelter(&self, entity: EntityId) {
        self.state.lock().unwrap().sheltered.insert(entity);
    }

    /// Keep listing the entity but fail every call about it.
    pub fn vanish(&self, entity: EntityId) {
        self.state.lock().unwrap().gone.insert(entity);
    }

    pub fn unload(&self, world: WorldId) {
        self.state.lock().unwrap().unloaded.insert(world);
    }

    pub fn reload(&self, world: WorldId) {
        self.state.lock().unwrap().unloaded.remove(&world);
    }

    pub fn material_at(&self, world: WorldId, pos: BlockPos) -> String {
        self.state
            .lock()
            .unwrap()
            .surface
            .get(&(world, pos.x, pos.z))
            .cloned()
            .unwrap_or_else(|| GROUND.to_owned())
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, matches: impl Fn(&HostCall) -> bool) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|call| matches(call))
            .count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    fn record(&self, call: HostCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

impl Host for RecordingHost {
    fn enumerate_worlds(&self) -> Vec<WorldId> {
        let state = self.state.lock().unwrap();
        state
            .worlds
            .iter()
            .copied()
            .filter(|world| !state.unloaded.contains(world))
            .collect()
    }

    fn clock_tick(&self, world: WorldId) -> Result<ClockReading, HostError> {
        let state = self.state.lock().unwrap();
        state.world(world)?;
        Ok(DayCycle::reading(
            state.clocks.get(&world).copied().unwrap_or_default(),
        ))
    }

    fn set_time_of_day(&self, world: WorldId, is_day: bool) -> Result<(), HostError> {
        let mut state = self.state.lock().unwrap();
        state.world(world)?;
        let now = state.clocks.get(&world).copied().unwrap_or_default();
        state.clocks.insert(world, DayCycle::forced_time(now, is_day));
        state.calls.push(HostCall::TimeOfDay { world, is_day });
        Ok(())
    }

    fn present_entities(&self, world: WorldId) -> Result<Vec<EntityId>, HostError> {
        let state = self.state.lock().unwrap();
        state.world(world)?;
        Ok(state
            .entities
            .get(&world)
            .map(|entities| entities.iter().map(|(id, _)| *id).collect())
            .unwrap_or_default())
    }

    fn entity_position(&self, world: WorldId, entity: EntityId) -> Result<Position, HostError> {
        let state = self.state.lock().unwrap();
        state.entity(world, entity)?;
        state
            .entities
            .get(&world)
            .and_then(|entities| entities.iter().find(|(id, _)| *id == entity))
            .map(|(_, position)| *position)
            .ok_or(HostError::EntityGone(entity))
    }

    fn is_exposed_to_sky(&self, world: WorldId, entity: EntityId) -> Result<bool, HostError> {
        let state = self.state.lock().unwrap();
        state.entity(world, entity)?;
        Ok(!state.sheltered.contains(&entity))
    }

    fn surface_block(
        &self,
        world: WorldId,
        x: i32,
        z: i32,
    ) -> Result<Option<(BlockPos, String)>, HostError> {
        let state = self.state.lock().unwrap();
        state.world(world)?;
        let material = state
            .surface
            .get(&(world, x, z))
            .cloned()
            .unwrap_or_else(|| GROUND.to_owned());
        Ok(Some((BlockPos::new(x, 64, z), material)))
    }

    fn emit_particles(&self, world: WorldId, burst: &ParticleBurst) -> Result<(), HostError> {
        self.state.lock().unwrap().world(world)?;
        self.record(HostCall::Particles {
            world,
            particle: burst.particle,
            count: burst.count,
        });
        Ok(())
    }

    fn play_sound(
        &self,
        world: WorldId,
        entity: EntityId,
        sound: SoundKind,
        _volume: f64,
        _pitch: f64,
    ) -> Result<(), HostError> {
        self.state.lock().unwrap().entity(world, entity)?;
        self.record(HostCall::Sound { entity, sound });
        Ok(())
    }

    fn apply_status(
        &self,
        world: WorldId,
        entity: EntityId,
        status: StatusKind,
        _amplifier: u8,
        _duration_ticks: u32,
    ) -> Result<(), HostError> {
        self.state.lock().unwrap().entity(world, entity)?;
        self.record(HostCall::Status { entity, status });
        Ok(())
    }

    fn damage(&self, world: WorldId, entity: EntityId, amount: f64) -> Result<(), HostError> {
        self.state.lock().unwrap().entity(world, entity)?;
        self.record(HostCall::Damage { entity, amount });
        Ok(())
    }

    fn push_entity(
        &self,
        world: WorldId,
        entity: EntityId,
        _velocity: Position,
    ) -> Result<(), HostError> {
        self.state.lock().unwrap().entity(world, entity)?;
        self.record(HostCall::Push { entity });
        Ok(())
    }

    fn transform_block(
        &self,
        world: WorldId,
        pos: BlockPos,
        material: &str,
    ) -> Result<(), HostError> {
        let mut state = self.state.lock().unwrap();
        state.world(world)?;
        state
            .surface
            .insert((world, pos.x, pos.z), material.to_owned());
        state.calls.push(HostCall::Transform {
            pos,
            material: material.to_owned(),
        });
        Ok(())
    }

    fn revert_block(&self, world: WorldId, pos: BlockPos, original: &str) -> Result<(), HostError> {
        let mut state = self.state.lock().unwrap();
        state
            .surface
            .insert((world, pos.x, pos.z), original.to_owned());
        state.calls.push(HostCall::Revert {
            pos,
            material: original.to_owned(),
        });
        Ok(())
    }

    fn announce_weather(
        &self,
        world: WorldId,
        entity: EntityId,
        kind: WeatherKind,
    ) -> Result<(), HostError> {
        self.state.lock().unwrap().entity(world, entity)?;
        self.record(HostCall::Announce { entity, kind });
        Ok(())
    }

    fn set_native_precipitation(
        &self,
        world: WorldId,
        storm: bool,
        thundering: bool,
    ) -> Result<(), HostError> {
        self.record(HostCall::Native {
            world,
            storm,
            thundering,
        });
        Ok(())
    }
}

/// Seeded configuration with a quiet change roll.
pub fn config(seed: u64) -> AtmosphereConfig {
    let mut config = AtmosphereConfig::default();
    config.weather.seed = Some(seed);
    config.weather.change_chance_percent = 0;
    config
}

/// An atmosphere over `host` backed by a fresh memory store.
pub fn atmosphere(
    host: &Arc<RecordingHost>,
    config: &AtmosphereConfig,
) -> (Arc<Atmosphere>, MemoryStore) {
    let store = MemoryStore::new();
    let atmosphere = Atmosphere::new(
        config,
        Arc::clone(host) as Arc<dyn Host>,
        Persistence::spawn(store.clone()),
    )
    .unwrap();
    (atmosphere, store)
}

/// A memory store whose loads of one world take `delay`.
#[derive(Debug, Clone)]
pub struct SlowStore {
    pub inner: MemoryStore,
    pub slow: WorldId,
    pub delay: Duration,
}

impl AtmosphereStore for SlowStore {
    async fn load(&self, world: WorldId) -> Result<BTreeMap<String, String>, StoreError> {
        if world == self.slow {
            tokio::time::sleep(self.delay).await;
        }
        self.inner.load(world).await
    }

    async fn save(
        &self,
        world: WorldId,
        fields: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        self.inner.save(world, fields).await
    }

    async fn remove(&self, world: WorldId, fields: Vec<String>) -> Result<(), StoreError> {
        self.inner.remove(world, fields).await
    }
}
