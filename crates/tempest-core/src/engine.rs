//! The [`Atmosphere`]: per-world season, weather, and night-cycle state
//! behind one API.
//!
//! Worlds are loaded lazily the first time any operation touches them.
//! Each world's [`WorldContext`] sits in its own slot behind an async
//! mutex, so the driver, operator commands, and world loading never
//! interleave on the same world while different worlds proceed in
//! parallel. The map of slots is only locked to look a slot up; loading
//! happens under the slot's own lock. An empty slot that has left the map
//! belongs to an unloaded world and accepts no transitions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tempest_types::{SeasonKind, WeatherKind, WorldId};
use tokio::sync::{Mutex, OwnedMappedMutexGuard, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::config::{AtmosphereConfig, WorldFilter};
use crate::context::{Services, WorldContext, WorldStatus};
use crate::driver::SimulationDriver;
use crate::effects::EffectScheduler;
use crate::error::AtmosphereError;
use crate::host::Host;
use crate::night;
use crate::notify::ChangeObserver;
use crate::persistence::Persistence;
use crate::pools::SeasonPools;
use crate::season::{self, DayAdvance};
use crate::settings::RuntimeSettings;
use crate::weather;

type WorldSlot = Arc<Mutex<Option<WorldContext>>>;
type LockedWorld = OwnedMappedMutexGuard<Option<WorldContext>, WorldContext>;

/// Season, weather, and night-cycle engine for every world of a host.
pub struct Atmosphere {
    services: Services,
    filter: WorldFilter,
    worlds: Mutex<HashMap<WorldId, WorldSlot>>,
    driver: SimulationDriver,
}

impl Atmosphere {
    /// Build an engine from validated configuration.
    ///
    /// `store` must already be spawned. The driver is created stopped.
    pub fn new(
        config: &AtmosphereConfig,
        host: Arc<dyn Host>,
        store: Persistence,
    ) -> Result<Arc<Self>, AtmosphereError> {
        config.validate()?;
        let filter = config.worlds.filter()?;
        let pools = SeasonPools::from_config(&config.seasons)?;
        let settings = Arc::new(RuntimeSettings::from_config(config));
        let effects = EffectScheduler::new(
            Arc::clone(&host),
            Arc::clone(&settings),
            Duration::from_millis(config.effects.tick_duration_ms),
            config.weather.seed.map(|seed| seed.rotate_left(17)),
        );
        let services = Services::new(host, settings, pools, effects, store, config.weather.seed);
        let tick_interval_ms = config.driver.tick_interval_ms;

        Ok(Arc::new_cyclic(|weak| Self {
            services,
            filter,
            worlds: Mutex::new(HashMap::new()),
            driver: SimulationDriver::new(weak.clone(), tick_interval_ms),
        }))
    }

    /// Register a change observer.
    pub fn subscribe(&self, observer: Arc<dyn ChangeObserver>) {
        self.services.bus.subscribe(observer);
    }

    /// The periodic driver.
    pub const fn driver(&self) -> &SimulationDriver {
        &self.driver
    }

    /// Whether both the host and configuration allow `world`.
    pub fn is_enabled(&self, world: WorldId) -> bool {
        self.filter.allows(world) && self.services.host.is_world_enabled(world)
    }

    // -----------------------------------------------------------------------
    // World lifecycle
    // -----------------------------------------------------------------------

    /// Load `world` from persistence and start its effects.
    ///
    /// A world that is already loaded is returned as-is.
    pub async fn load_world(&self, world: WorldId) -> Result<WorldStatus, AtmosphereError> {
        Ok(self.context(world).await?.status())
    }

    /// Persist `world` one last time and stop its effects.
    ///
    /// Waits for a load in progress. Returns `false` if it was not loaded.
    pub async fn unload_world(&self, world: WorldId) -> bool {
        let Some(slot) = self.worlds.lock().await.get(&world).cloned() else {
            return false;
        };
        let mut guard = slot.lock().await;
        let context = guard.take();
        if let Some(context) = &context {
            self.services.store.save(world, &context.record());
            self.services.effects.cancel(world).await;
        }
        // Leave the map only after the effects are gone, so a reload starts
        // from a clean scheduler.
        {
            let mut worlds = self.worlds.lock().await;
            if worlds
                .get(&world)
                .is_some_and(|registered| Arc::ptr_eq(registered, &slot))
            {
                worlds.remove(&world);
            }
        }
        drop(guard);
        if context.is_some() {
            info!(world = %world, "World unloaded");
        }
        context.is_some()
    }

    /// Worlds currently loaded or loading.
    pub async fn loaded_worlds(&self) -> Vec<WorldId> {
        self.worlds.lock().await.keys().copied().collect()
    }

    /// Lock `world`, loading it first if needed.
    async fn context(&self, world: WorldId) -> Result<LockedWorld, AtmosphereError> {
        if !self.is_enabled(world) {
            return Err(AtmosphereError::WorldDisabled { world });
        }
        loop {
            let slot = self.slot(world).await;
            if let Some(context) = self.lock_slot(world, slot).await {
                return Ok(context);
            }
        }
    }

    async fn slot(&self, world: WorldId) -> WorldSlot {
        Arc::clone(self.worlds.lock().await.entry(world).or_default())
    }

    /// Lock `slot` and fill it if it is still `world`'s current slot.
    ///
    /// Returns `None` when the world was unloaded while waiting.
    async fn lock_slot(&self, world: WorldId, slot: WorldSlot) -> Option<LockedWorld> {
        let mut guard = Arc::clone(&slot).lock_owned().await;
        if guard.is_none() {
            let current = self
                .worlds
                .lock()
                .await
                .get(&world)
                .is_some_and(|registered| Arc::ptr_eq(registered, &slot));
            if !current {
                return None;
            }
            *guard = Some(self.restore(world).await);
        }
        OwnedMutexGuard::try_map(guard, Option::as_mut).ok()
    }

    async fn restore(&self, world: WorldId) -> WorldContext {
        let record = self.services.store.load(world).await;
        let context = WorldContext::restore(world, record, &self.services);
        weather::resume(&context, &self.services).await;
        info!(
            world = %world,
            season = %context.season.season,
            day = context.season.day,
            weather = %context.weather.kind,
            night = context.night.active,
            "World loaded"
        );
        context
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Current season of `world`.
    pub async fn current_season(&self, world: WorldId) -> Result<SeasonKind, AtmosphereError> {
        Ok(self.context(world).await?.season.season)
    }

    /// Current day within the season, from 1.
    pub async fn current_day(&self, world: WorldId) -> Result<u32, AtmosphereError> {
        Ok(self.context(world).await?.season.day)
    }

    /// Live weather of `world`.
    pub async fn current_weather(&self, world: WorldId) -> Result<WeatherKind, AtmosphereError> {
        Ok(self.context(world).await?.weather.kind)
    }

    /// Minutes left on the live weather.
    pub async fn remaining_minutes(&self, world: WorldId) -> Result<u32, AtmosphereError> {
        Ok(self.context(world).await?.weather.remaining_minutes)
    }

    /// Whether `world`'s weather is suspended for the night.
    pub async fn is_night_cycle_active(&self, world: WorldId) -> Result<bool, AtmosphereError> {
        Ok(self.context(world).await?.night.active)
    }

    /// Summary of `world`.
    pub async fn status(&self, world: WorldId) -> Result<WorldStatus, AtmosphereError> {
        Ok(self.context(world).await?.status())
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Set the season and day. Returns `false` if vetoed.
    pub async fn set_season(
        &self,
        world: WorldId,
        season: SeasonKind,
        day: u32,
    ) -> Result<bool, AtmosphereError> {
        let mut context = self.context(world).await?;
        Ok(season::set_season(&mut context, &self.services, season, day).await)
    }

    /// [`set_season`](Self::set_season) by season id.
    pub async fn set_season_by_id(
        &self,
        world: WorldId,
        id: &str,
        day: u32,
    ) -> Result<bool, AtmosphereError> {
        let season = SeasonKind::from_id(id).ok_or_else(|| AtmosphereError::UnknownSeason {
            id: id.to_owned(),
        })?;
        self.set_season(world, season, day).await
    }

    /// Set the live weather for `duration_minutes` (zero means the default).
    ///
    /// Returns `false` if vetoed. The night sentinel cannot be set directly.
    pub async fn set_weather(
        &self,
        world: WorldId,
        kind: WeatherKind,
        duration_minutes: u32,
    ) -> Result<bool, AtmosphereError> {
        if !kind.is_selectable() {
            return Err(AtmosphereError::ReservedWeather { kind });
        }
        let mut context = self.context(world).await?;
        Ok(weather::set_weather(&mut context, &self.services, kind, duration_minutes).await)
    }

    /// [`set_weather`](Self::set_weather) by weather id.
    pub async fn set_weather_by_id(
        &self,
        world: WorldId,
        id: &str,
        duration_minutes: u32,
    ) -> Result<bool, AtmosphereError> {
        let kind = WeatherKind::from_id(id).ok_or_else(|| AtmosphereError::UnknownWeather {
            id: id.to_owned(),
        })?;
        self.set_weather(world, kind, duration_minutes).await
    }

    /// Move `world` one day forward.
    pub async fn advance_day(&self, world: WorldId) -> Result<DayAdvance, AtmosphereError> {
        let mut context = self.context(world).await?;
        Ok(season::advance_day(&mut context, &self.services).await)
    }

    /// Age the live weather. Returns whether it expired and was reselected.
    pub async fn decrease_duration(
        &self,
        world: WorldId,
        minutes: u32,
    ) -> Result<bool, AtmosphereError> {
        let mut context = self.context(world).await?;
        Ok(weather::decrease_duration(&mut context, &self.services, minutes).await)
    }

    /// Roll the change chance. Returns whether the weather changed.
    pub async fn try_probabilistic_change(&self, world: WorldId) -> Result<bool, AtmosphereError> {
        let mut context = self.context(world).await?;
        Ok(weather::try_probabilistic_change(&mut context, &self.services).await)
    }

    /// Move the world clock to morning or night and run the matching
    /// night-cycle transition.
    ///
    /// Returns whether the transition changed anything.
    pub async fn force_time_of_day(
        &self,
        world: WorldId,
        is_day: bool,
    ) -> Result<bool, AtmosphereError> {
        let mut context = self.context(world).await?;
        self.services.host.set_time_of_day(world, is_day)?;
        let changed = night::on_clock_edge(&mut context, &self.services, !is_day).await;
        if let Some(clock) = context.last_clock.as_mut() {
            clock.is_night = !is_day;
        }
        Ok(changed)
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    /// Days in each season.
    pub fn days_per_season(&self) -> u32 {
        self.services.settings.days_per_season()
    }

    /// Change the season length. Existing days are not clamped.
    pub fn set_days_per_season(&self, days: u32) -> Result<u32, AtmosphereError> {
        Ok(self.services.settings.set_days_per_season(days)?)
    }

    /// Default weather duration in minutes.
    pub fn default_duration_minutes(&self) -> u32 {
        self.services.settings.default_duration_minutes()
    }

    /// Change the default weather duration.
    pub fn set_default_duration_minutes(&self, minutes: u32) -> Result<u32, AtmosphereError> {
        Ok(self.services.settings.set_default_duration_minutes(minutes)?)
    }

    /// Chance, in percent, of a new-day weather change.
    pub fn change_chance_percent(&self) -> u8 {
        self.services.settings.change_chance_percent()
    }

    /// Change the new-day weather change chance.
    pub fn set_change_chance_percent(&self, percent: u8) -> Result<u8, AtmosphereError> {
        Ok(self.services.settings.set_change_chance_percent(percent)?)
    }

    /// Minutes the live weather ages per driver tick.
    pub fn minutes_per_tick(&self) -> u32 {
        self.services.settings.minutes_per_tick()
    }

    /// Change how fast weather ages. Zero disables aging.
    pub fn set_minutes_per_tick(&self, minutes: u32) -> u32 {
        self.services.settings.set_minutes_per_tick(minutes)
    }

    /// Cadence of cold effects in effect ticks.
    pub fn frostbite_interval_ticks(&self) -> u32 {
        self.services.settings.frostbite_interval_ticks()
    }

    /// Change the cold cadence. Applies to effects started afterwards.
    pub fn set_frostbite_interval_ticks(&self, ticks: u32) -> Result<u32, AtmosphereError> {
        Ok(self.services.settings.set_frostbite_interval_ticks(ticks)?)
    }

    /// Cadence of heat effects in effect ticks.
    pub fn heat_interval_ticks(&self) -> u32 {
        self.services.settings.heat_interval_ticks()
    }

    /// Change the heat cadence. Applies to effects started afterwards.
    pub fn set_heat_interval_ticks(&self, ticks: u32) -> Result<u32, AtmosphereError> {
        Ok(self.services.settings.set_heat_interval_ticks(ticks)?)
    }

    // -----------------------------------------------------------------------
    // Effects
    // -----------------------------------------------------------------------

    /// Weather whose effects are running in `world`.
    pub async fn active_effects(&self, world: WorldId) -> Option<WeatherKind> {
        self.services.effects.active_kind(world).await
    }

    /// Unfinished effect jobs of `world`.
    pub async fn effect_job_count(&self, world: WorldId) -> usize {
        self.services.effects.job_count(world).await
    }

    // -----------------------------------------------------------------------
    // Driver tick
    // -----------------------------------------------------------------------

    /// Run one driver tick over every enabled world, concurrently.
    ///
    /// Per-world failures are logged and never propagate.
    pub async fn tick(&self) {
        let worlds: Vec<WorldId> = self
            .services
            .host
            .enumerate_worlds()
            .into_iter()
            .filter(|&world| self.is_enabled(world))
            .collect();
        let results = join_all(worlds.iter().map(|&world| self.tick_world(world))).await;
        for (world, result) in worlds.into_iter().zip(results) {
            if let Err(e) = result {
                warn!(world = %world, error = %e, "World tick failed");
            }
        }
    }

    async fn tick_world(&self, world: WorldId) -> Result<(), AtmosphereError> {
        let reading = self.services.host.clock_tick(world)?;
        let slot = self.slot(world).await;
        let Some(mut ctx) = self.lock_slot(world, slot).await else {
            debug!(world = %world, "World unloaded during tick");
            return Ok(());
        };
        let services = &self.services;

        let Some(last) = ctx.last_clock else {
            // A suspension restored from storage must not outlive the night.
            if ctx.night.active && !reading.is_night {
                night::end_night(&mut ctx, services).await;
            }
            ctx.last_clock = Some(reading);
            debug!(world = %world, day = reading.day_index, night = reading.is_night, "Clock baseline");
            return Ok(());
        };

        let expired =
            weather::decrease_duration(&mut ctx, services, services.settings.minutes_per_tick())
                .await;

        if reading.day_index > last.day_index {
            season::advance_day(&mut ctx, services).await;
            if !expired {
                weather::try_probabilistic_change(&mut ctx, services).await;
            }
        }

        if reading.is_night != last.is_night {
            night::on_clock_edge(&mut ctx, services, reading.is_night).await;
        }

        ctx.last_clock = Some(reading);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Shutdown
    // -----------------------------------------------------------------------

    /// Stop the driver, cancel every effect, persist every world, and close
    /// the store.
    pub async fn shutdown(&self) {
        self.driver.stop().await;
        self.services.effects.cancel_all().await;
        let slots: Vec<WorldSlot> = self.worlds.lock().await.values().cloned().collect();
        for slot in slots {
            let guard = slot.lock().await;
            if let Some(context) = guard.as_ref() {
                self.services.store.save(context.world, &context.record());
            }
        }
        self.services.store.close().await;
        info!("Atmosphere shut down");
    }
}

impl core::fmt::Debug for Atmosphere {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Atmosphere")
            .field("filter", &self.filter)
            .field("driver", &self.driver)
            .finish_non_exhaustive()
    }
}
