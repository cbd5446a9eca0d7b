//! End-to-end scenarios driving an [`Atmosphere`] through its public API
//! against a minimal host.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tempest_core::host::DayCycle;
use tempest_core::persistence::FIELD_SEASON;
use tempest_core::{
    Atmosphere, AtmosphereConfig, ChangeObserver, ClockReading, Host, HostError, MemoryStore,
    Persistence, Verdict,
};
use tempest_types::{
    BlockPos, EntityId, ParticleBurst, Position, SeasonKind, SoundKind, StatusKind, WeatherKind,
    WorldId,
};

const CONFIG: &str = "
seasons:
  days_per_season: 2
  pools:
    summer:
      - heat_wave
      - weather: clear_sky
        weight: 3
weather:
  default_duration_minutes: 600
  change_chance_percent: 0
  seed: 42
driver:
  tick_interval_ms: 100
";

/// One empty world with a settable clock.
struct ScenarioHost {
    world: WorldId,
    clock: AtomicU64,
}

impl ScenarioHost {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            world: WorldId::new(),
            clock: AtomicU64::new(DayCycle::FORCED_DAY_TIME),
        })
    }

    fn morning_of(&self, day: u64) {
        self.clock.store(
            day * DayCycle::TICKS_PER_DAY + DayCycle::FORCED_DAY_TIME,
            Ordering::Release,
        );
    }

    fn evening_of(&self, day: u64) {
        self.clock.store(
            day * DayCycle::TICKS_PER_DAY + DayCycle::FORCED_NIGHT_TIME,
            Ordering::Release,
        );
    }
}

impl Host for ScenarioHost {
    fn enumerate_worlds(&self) -> Vec<WorldId> {
        vec![self.world]
    }

    fn clock_tick(&self, _world: WorldId) -> Result<ClockReading, HostError> {
        Ok(DayCycle::reading(self.clock.load(Ordering::Acquire)))
    }

    fn set_time_of_day(&self, _world: WorldId, is_day: bool) -> Result<(), HostError> {
        let now = self.clock.load(Ordering::Acquire);
        self.clock
            .store(DayCycle::forced_time(now, is_day), Ordering::Release);
        Ok(())
    }

    fn present_entities(&self, _world: WorldId) -> Result<Vec<EntityId>, HostError> {
        Ok(Vec::new())
    }

    fn entity_position(&self, _world: WorldId, entity: EntityId) -> Result<Position, HostError> {
        Err(HostError::EntityGone(entity))
    }

    fn is_exposed_to_sky(&self, _world: WorldId, entity: EntityId) -> Result<bool, HostError> {
        Err(HostError::EntityGone(entity))
    }

    fn surface_block(
        &self,
        _world: WorldId,
        _x: i32,
        _z: i32,
    ) -> Result<Option<(BlockPos, String)>, HostError> {
        Ok(None)
    }

    fn emit_particles(&self, _world: WorldId, _burst: &ParticleBurst) -> Result<(), HostError> {
        Ok(())
    }

    fn play_sound(
        &self,
        _world: WorldId,
        _entity: EntityId,
        _sound: SoundKind,
        _volume: f64,
        _pitch: f64,
    ) -> Result<(), HostError> {
        Ok(())
    }

    fn apply_status(
        &self,
        _world: WorldId,
        _entity: EntityId,
        _status: StatusKind,
        _amplifier: u8,
        _duration_ticks: u32,
    ) -> Result<(), HostError> {
        Ok(())
    }

    fn damage(&self, _world: WorldId, _entity: EntityId, _amount: f64) -> Result<(), HostError> {
        Ok(())
    }

    fn push_entity(
        &self,
        _world: WorldId,
        _entity: EntityId,
        _velocity: Position,
    ) -> Result<(), HostError> {
        Ok(())
    }

    fn transform_block(
        &self,
        _world: WorldId,
        _pos: BlockPos,
        _material: &str,
    ) -> Result<(), HostError> {
        Ok(())
    }

    fn revert_block(
        &self,
        _world: WorldId,
        _pos: BlockPos,
        _original: &str,
    ) -> Result<(), HostError> {
        Ok(())
    }

    fn announce_weather(
        &self,
        _world: WorldId,
        _entity: EntityId,
        _kind: WeatherKind,
    ) -> Result<(), HostError> {
        Ok(())
    }

    fn set_native_precipitation(
        &self,
        _world: WorldId,
        _storm: bool,
        _thundering: bool,
    ) -> Result<(), HostError> {
        Ok(())
    }
}

/// Records every season proposal and allows it.
#[derive(Default)]
struct SeasonLog {
    seen: Mutex<Vec<(SeasonKind, SeasonKind)>>,
}

impl ChangeObserver for SeasonLog {
    fn on_season_change(&self, _world: WorldId, old: SeasonKind, new: SeasonKind) -> Verdict {
        self.seen.lock().unwrap().push((old, new));
        Verdict::Allow
    }
}

fn start(host: &Arc<ScenarioHost>, store: &MemoryStore) -> Arc<Atmosphere> {
    let config = AtmosphereConfig::parse(CONFIG).unwrap();
    Atmosphere::new(
        &config,
        Arc::clone(host) as Arc<dyn Host>,
        Persistence::spawn(store.clone()),
    )
    .unwrap()
}

#[tokio::test(start_paused = true)]
async fn spring_turns_to_summer_with_summer_weather() {
    let host = ScenarioHost::new();
    let store = MemoryStore::new();
    let atmosphere = start(&host, &store);
    let log = Arc::new(SeasonLog::default());
    atmosphere.subscribe(Arc::clone(&log) as Arc<dyn ChangeObserver>);

    // Baseline, then two dawns.
    atmosphere.tick().await;
    host.morning_of(1);
    atmosphere.tick().await;
    assert_eq!(atmosphere.current_day(host.world).await.unwrap(), 2);
    host.morning_of(2);
    atmosphere.tick().await;

    assert_eq!(
        atmosphere.current_season(host.world).await.unwrap(),
        SeasonKind::Summer
    );
    assert_eq!(atmosphere.current_day(host.world).await.unwrap(), 1);
    assert_eq!(
        *log.seen.lock().unwrap(),
        vec![(SeasonKind::Spring, SeasonKind::Summer)]
    );
    let weather = atmosphere.current_weather(host.world).await.unwrap();
    assert!(matches!(
        weather,
        WeatherKind::HeatWave | WeatherKind::ClearSky
    ));

    atmosphere.shutdown().await;
    assert_eq!(
        store.snapshot(host.world).get(FIELD_SEASON).unwrap(),
        "summer"
    );
}

#[tokio::test(start_paused = true)]
async fn dusk_and_dawn_suspend_and_restore() {
    let host = ScenarioHost::new();
    let store = MemoryStore::new();
    let atmosphere = start(&host, &store);
    atmosphere
        .set_weather(host.world, WeatherKind::Drizzle, 0)
        .await
        .unwrap();

    atmosphere.tick().await;
    host.evening_of(0);
    atmosphere.tick().await;
    assert_eq!(
        atmosphere.current_weather(host.world).await.unwrap(),
        WeatherKind::NightCycle
    );
    assert_eq!(atmosphere.effect_job_count(host.world).await, 0);

    host.morning_of(1);
    atmosphere.tick().await;
    assert_eq!(
        atmosphere.current_weather(host.world).await.unwrap(),
        WeatherKind::Drizzle
    );
    assert!(!atmosphere.is_night_cycle_active(host.world).await.unwrap());
    atmosphere.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn state_survives_a_restart() {
    let host = ScenarioHost::new();
    let store = MemoryStore::new();

    let first = start(&host, &store);
    first
        .set_season(host.world, SeasonKind::Winter, 2)
        .await
        .unwrap();
    first
        .set_weather(host.world, WeatherKind::Blizzard, 45)
        .await
        .unwrap();
    first.shutdown().await;

    let second = start(&host, &store);
    let status = second.load_world(host.world).await.unwrap();
    assert_eq!(status.season.season, SeasonKind::Winter);
    assert_eq!(status.season.day, 2);
    assert_eq!(status.weather.kind, WeatherKind::Blizzard);
    assert_eq!(status.weather.remaining_minutes, 45);
    second.shutdown().await;
}
