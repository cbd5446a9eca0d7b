//! Per-world state and the shared services every transition uses.
//!
//! A [`WorldContext`] owns the season, weather, and night-cycle state of
//! one world. The engine keeps each context behind its own async mutex, so
//! every mutation of a world is serialized while different worlds proceed
//! in parallel. [`Services`] bundles the collaborators transitions need:
//! the host, settings, pools, observers, effect scheduler, persistence,
//! and the seeded random source.

use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tempest_types::{SeasonKind, WeatherKind, WorldId};
use tracing::{debug, warn};

use crate::effects::EffectScheduler;
use crate::host::{ClockReading, Host};
use crate::notify::NotificationBus;
use crate::persistence::{Persistence, WorldRecord};
use crate::pools::SeasonPools;
use crate::settings::RuntimeSettings;

/// Season position of a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeasonState {
    /// Current season.
    pub season: SeasonKind,
    /// Day within the season, from 1.
    pub day: u32,
}

/// Live weather of a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WeatherState {
    /// Current weather.
    pub kind: WeatherKind,
    /// Minutes until a fresh seasonal pick. Zero means expired.
    pub remaining_minutes: u32,
}

/// Night suspension bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NightCycleState {
    /// Whether the world's weather is suspended for the night.
    pub active: bool,
    /// Weather to restore at dawn.
    pub saved: Option<WeatherKind>,
}

/// Everything Tempest tracks about one world.
#[derive(Debug, Clone)]
pub struct WorldContext {
    /// The world this context belongs to.
    pub world: WorldId,
    /// Season position.
    pub season: SeasonState,
    /// Live weather.
    pub weather: WeatherState,
    /// Night suspension.
    pub night: NightCycleState,
    /// Clock seen by the previous driver tick. `None` until the first tick.
    pub last_clock: Option<ClockReading>,
}

impl WorldContext {
    /// Rebuild a context from its persisted record.
    ///
    /// Missing season data becomes spring day 1, a day outside the season
    /// becomes day 1, and missing weather a fresh seasonal pick. Nothing is written back until the next transition.
    pub fn restore(world: WorldId, record: WorldRecord, services: &Services) -> Self {
        let season = SeasonState {
            season: record.season.unwrap_or(SeasonKind::Spring),
            day: record
                .season_day
                .filter(|&day| (1..=services.settings.days_per_season()).contains(&day))
                .unwrap_or(1),
        };
        if record.season.is_none() {
            debug!(world = %world, "No persisted season, starting in spring");
        }

        let default_minutes = services.settings.default_duration_minutes();
        let (weather, night) = match record.weather {
            Some(WeatherKind::NightCycle) => (
                WeatherState {
                    kind: WeatherKind::NightCycle,
                    remaining_minutes: record.weather_duration.unwrap_or(default_minutes),
                },
                NightCycleState {
                    active: true,
                    saved: record.previous_weather,
                },
            ),
            Some(kind) => (
                WeatherState {
                    kind,
                    remaining_minutes: record
                        .weather_duration
                        .filter(|&minutes| minutes > 0)
                        .unwrap_or(default_minutes),
                },
                NightCycleState::default(),
            ),
            None => {
                let (kind, remaining_minutes) = services.pick_seasonal(season.season);
                (
                    WeatherState {
                        kind,
                        remaining_minutes,
                    },
                    NightCycleState::default(),
                )
            }
        };

        Self {
            world,
            season,
            weather,
            night,
            last_clock: None,
        }
    }

    /// The persisted view of this context.
    pub const fn record(&self) -> WorldRecord {
        WorldRecord {
            season: Some(self.season.season),
            season_day: Some(self.season.day),
            weather: Some(self.weather.kind),
            weather_duration: Some(self.weather.remaining_minutes),
            previous_weather: if self.night.active {
                self.night.saved
            } else {
                None
            },
        }
    }

    /// Serializable summary.
    pub const fn status(&self) -> WorldStatus {
        WorldStatus {
            world: self.world,
            season: self.season,
            weather: self.weather,
            night: self.night,
        }
    }
}

/// Read-only summary of a world for logs and operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WorldStatus {
    /// The world.
    pub world: WorldId,
    /// Season position.
    pub season: SeasonState,
    /// Live weather.
    pub weather: WeatherState,
    /// Night suspension.
    pub night: NightCycleState,
}

/// Collaborators shared by every world.
pub struct Services {
    /// The hosting runtime.
    pub host: Arc<dyn Host>,
    /// Hot-settable settings.
    pub settings: Arc<RuntimeSettings>,
    /// Season weather pools.
    pub pools: SeasonPools,
    /// Change observers.
    pub bus: NotificationBus,
    /// Effect lifecycle.
    pub effects: EffectScheduler,
    /// Persistence writer.
    pub store: Persistence,
    rng: Mutex<StdRng>,
}

impl Services {
    /// Bundle collaborators. `seed` makes weather rolls reproducible.
    pub fn new(
        host: Arc<dyn Host>,
        settings: Arc<RuntimeSettings>,
        pools: SeasonPools,
        effects: EffectScheduler,
        store: Persistence,
        seed: Option<u64>,
    ) -> Self {
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            host,
            settings,
            pools,
            bus: NotificationBus::new(),
            effects,
            store,
            rng: Mutex::new(rng),
        }
    }

    /// Draw a weather kind for `season` and a duration around the default.
    ///
    /// The duration is the default scaled by a factor in `[0.5, 1.5)`,
    /// never less than one minute.
    pub fn pick_seasonal(&self, season: SeasonKind) -> (WeatherKind, u32) {
        let default_minutes = self.settings.default_duration_minutes();
        self.with_rng(|rng| {
            let kind = self.pools.pick(season, rng);
            let factor = 0.5 + rng.random::<f64>();
            let scaled = (f64::from(default_minutes) * factor).round();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let minutes = scaled as u32;
            (kind, minutes.max(1))
        })
    }

    /// Whether a `percent` chance (0 to 100) succeeds.
    pub fn roll_percent(&self, percent: u8) -> bool {
        if percent == 0 {
            return false;
        }
        self.with_rng(|rng| rng.random_range(0..100_u8) < percent)
    }

    fn with_rng<T>(&self, draw: impl FnOnce(&mut dyn rand::RngCore) -> T) -> T {
        match self.rng.lock() {
            Ok(mut rng) => draw(&mut *rng),
            Err(_) => {
                warn!("Weather RNG poisoned, using thread RNG");
                draw(&mut rand::rng())
            }
        }
    }
}

impl core::fmt::Debug for Services {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Services")
            .field("settings", &self.settings)
            .field("bus", &self.bus)
            .finish_non_exhaustive()
    }
}
