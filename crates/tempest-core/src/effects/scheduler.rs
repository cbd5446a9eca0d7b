//! Per-world effect lifecycle.
//!
//! The scheduler keeps at most one effect set per world. Applying a new
//! weather first cancels the previous set completely: its token is
//! cancelled, every job is awaited, and every transformed block is
//! reverted. Only then are the new jobs spawned, so no run of an old job
//! can interleave with the new weather.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::{SmallRng, StdRng};
use rand::{Rng, SeedableRng};
use tempest_types::{WeatherKind, WorldId};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::catalog;
use super::job::{BlockLedger, CancelToken, EffectJob};
use crate::host::Host;
use crate::settings::RuntimeSettings;

/// The running effect set of one world.
struct ActiveEffects {
    weather: WeatherKind,
    token: Arc<CancelToken>,
    jobs: Vec<JoinHandle<()>>,
    ledger: Arc<BlockLedger>,
}

impl ActiveEffects {
    /// Whether any job is still running. An empty set (night) stays live.
    fn is_live(&self) -> bool {
        self.jobs.is_empty() || self.jobs.iter().any(|job| !job.is_finished())
    }

    /// Cancel, wait for every job, and revert transformed blocks.
    async fn shutdown(self, host: &dyn Host, world: WorldId) {
        self.token.cancel();
        for job in self.jobs {
            if let Err(e) = job.await {
                if e.is_panic() {
                    warn!(world = %world, weather = %self.weather, "Effect job panicked");
                } else {
                    debug!(world = %world, error = %e, "Effect job ended abnormally");
                }
            }
        }
        let reverted = self.ledger.drain();
        let count = reverted.len();
        for (pos, original) in reverted {
            if let Err(e) = host.revert_block(world, pos, &original) {
                warn!(world = %world, ?pos, error = %e, "Failed to revert block");
            }
        }
        if count > 0 {
            debug!(world = %world, blocks = count, "Reverted transformed blocks");
        }
    }
}

/// Starts, replaces, and tears down effect jobs.
pub struct EffectScheduler {
    host: Arc<dyn Host>,
    settings: Arc<RuntimeSettings>,
    tick: Duration,
    seeds: Mutex<StdRng>,
    active: tokio::sync::Mutex<HashMap<WorldId, ActiveEffects>>,
}

impl EffectScheduler {
    /// Create a scheduler. `seed` makes per-job randomness reproducible.
    pub fn new(
        host: Arc<dyn Host>,
        settings: Arc<RuntimeSettings>,
        tick: Duration,
        seed: Option<u64>,
    ) -> Self {
        let seeds = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            host,
            settings,
            tick,
            seeds: Mutex::new(seeds),
            active: tokio::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Make `weather`'s effects the only ones running in `world`.
    ///
    /// Returns `false` if `weather` was already active (nothing changes).
    /// A set whose jobs have all stopped on their own is restarted.
    /// [`WeatherKind::NightCycle`] cancels the previous set and starts none.
    pub async fn apply(&self, world: WorldId, weather: WeatherKind) -> bool {
        let previous = {
            let mut active = self.active.lock().await;
            if active
                .get(&world)
                .is_some_and(|set| set.weather == weather && set.is_live())
            {
                return false;
            }
            active.remove(&world)
        };
        if let Some(previous) = previous {
            previous.shutdown(self.host.as_ref(), world).await;
        }

        let descriptors = catalog::effects_for(weather, &self.settings.effect_settings());
        let token = Arc::new(CancelToken::new());
        let ledger = Arc::new(BlockLedger::new());
        let jobs: Vec<JoinHandle<()>> = descriptors
            .into_iter()
            .map(|descriptor| {
                let job = EffectJob {
                    world,
                    weather,
                    descriptor,
                    host: Arc::clone(&self.host),
                    token: Arc::clone(&token),
                    ledger: Arc::clone(&ledger),
                    tick: self.tick,
                    rng: SmallRng::seed_from_u64(self.next_seed()),
                };
                tokio::spawn(job.run())
            })
            .collect();

        info!(world = %world, weather = %weather, jobs = jobs.len(), "Effects applied");
        let mut active = self.active.lock().await;
        active.insert(
            world,
            ActiveEffects {
                weather,
                token,
                jobs,
                ledger,
            },
        );
        true
    }

    /// Cancel every job of `world` and revert its blocks.
    ///
    /// Returns `false` if nothing was running.
    pub async fn cancel(&self, world: WorldId) -> bool {
        let previous = self.active.lock().await.remove(&world);
        match previous {
            Some(previous) => {
                previous.shutdown(self.host.as_ref(), world).await;
                debug!(world = %world, "Effects cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel every world's effects and wait for all jobs.
    pub async fn cancel_all(&self) {
        let drained: Vec<(WorldId, ActiveEffects)> =
            self.active.lock().await.drain().collect();
        let count = drained.len();
        for (world, effects) in drained {
            effects.shutdown(self.host.as_ref(), world).await;
        }
        info!(worlds = count, "All effects cancelled");
    }

    /// The weather whose effects are running in `world`.
    pub async fn active_kind(&self, world: WorldId) -> Option<WeatherKind> {
        self.active.lock().await.get(&world).map(|set| set.weather)
    }

    /// Jobs of `world` that have not finished.
    pub async fn job_count(&self, world: WorldId) -> usize {
        self.active.lock().await.get(&world).map_or(0, |set| {
            set.jobs.iter().filter(|job| !job.is_finished()).count()
        })
    }

    /// Blocks currently transformed in `world`.
    pub async fn transformed_blocks(&self, world: WorldId) -> usize {
        self.active
            .lock()
            .await
            .get(&world)
            .map_or(0, |set| set.ledger.len())
    }

    fn next_seed(&self) -> u64 {
        self.seeds.lock().map_or(0, |mut seeds| seeds.random())
    }
}

impl core::fmt::Debug for EffectScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EffectScheduler")
            .field("tick", &self.tick)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use tempest_types::{EntityId, Position, StatusKind};

    use super::*;
    use crate::config::AtmosphereConfig;
    use crate::test_support::{GROUND, HostCall, RecordingHost};

    fn scheduler(host: &Arc<RecordingHost>) -> EffectScheduler {
        let settings = Arc::new(RuntimeSettings::from_config(&AtmosphereConfig::default()));
        EffectScheduler::new(
            Arc::clone(host) as Arc<dyn Host>,
            settings,
            Duration::from_millis(50),
            Some(7),
        )
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn apply_is_idempotent() {
        let host = RecordingHost::new();
        let (world, _) = host.add_world();
        let effects = scheduler(&host);

        assert!(effects.apply(world, WeatherKind::HeavyRain).await);
        assert!(!effects.apply(world, WeatherKind::HeavyRain).await);
        assert_eq!(effects.active_kind(world).await, Some(WeatherKind::HeavyRain));
        assert_eq!(effects.job_count(world).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn night_cycle_replaces_jobs_with_nothing() {
        let host = RecordingHost::new();
        let (world, _) = host.add_world();
        let effects = scheduler(&host);

        effects.apply(world, WeatherKind::Thunderstorm).await;
        assert!(effects.job_count(world).await > 0);
        assert!(effects.apply(world, WeatherKind::NightCycle).await);
        assert_eq!(effects.active_kind(world).await, Some(WeatherKind::NightCycle));
        assert_eq!(effects.job_count(world).await, 0);

        host.clear_calls();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(host.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_reverts_transformed_blocks() {
        let host = RecordingHost::new();
        let (world, _) = host.add_world();
        let effects = scheduler(&host);

        effects.apply(world, WeatherKind::Blizzard).await;
        settle().await;
        let transformed: BTreeSet<_> = host
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::Transform { pos, .. } => Some(pos),
                _ => None,
            })
            .collect();
        assert!(!transformed.is_empty());
        assert_eq!(effects.transformed_blocks(world).await, transformed.len());
        for pos in &transformed {
            assert_eq!(host.material_at(world, *pos), "snow_block");
        }

        assert!(effects.cancel(world).await);
        for pos in &transformed {
            assert_eq!(host.material_at(world, *pos), GROUND);
        }
        assert_eq!(
            host.count(|call| matches!(call, HostCall::Revert { .. })),
            transformed.len()
        );
        assert_eq!(effects.active_kind(world).await, None);
        assert!(!effects.cancel(world).await);
    }

    #[tokio::test(start_paused = true)]
    async fn replacing_weather_reverts_before_starting() {
        let host = RecordingHost::new();
        let (world, _) = host.add_world();
        let effects = scheduler(&host);

        effects.apply(world, WeatherKind::HeavySnow).await;
        settle().await;
        assert!(effects.transformed_blocks(world).await > 0);

        effects.apply(world, WeatherKind::ClearSky).await;
        assert_eq!(effects.transformed_blocks(world).await, 0);
        assert_eq!(effects.job_count(world).await, 0);
        let reverted = host.count(|call| matches!(call, HostCall::Revert { .. }));
        let transformed = host.count(|call| matches!(call, HostCall::Transform { .. }));
        assert_eq!(reverted, transformed);
    }

    #[tokio::test(start_paused = true)]
    async fn jobs_stop_when_the_world_unloads() {
        let host = RecordingHost::new();
        let (world, _) = host.add_world();
        let effects = scheduler(&host);

        effects.apply(world, WeatherKind::HeavyRain).await;
        settle().await;
        host.unload(world);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(effects.job_count(world).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stopped_jobs_restart_when_the_world_returns() {
        let host = RecordingHost::new();
        let (world, _) = host.add_world();
        let effects = scheduler(&host);

        effects.apply(world, WeatherKind::HeavyRain).await;
        settle().await;
        host.unload(world);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(effects.job_count(world).await, 0);

        host.reload(world);
        assert!(effects.apply(world, WeatherKind::HeavyRain).await);
        assert_eq!(effects.job_count(world).await, 2);
        assert!(!effects.apply(world, WeatherKind::HeavyRain).await);
    }

    #[tokio::test(start_paused = true)]
    async fn status_skips_sheltered_and_departed_entities() {
        let host = RecordingHost::new();
        let (world, outside) = host.add_world();
        let inside = host.add_entity(world, Position::new(4.0, 60.0, 4.0));
        let departed = host.add_entity(world, Position::new(8.0, 65.0, 8.0));
        host.shelter(inside);
        host.vanish(departed);
        let effects = scheduler(&host);

        effects.apply(world, WeatherKind::HeatWave).await;
        settle().await;

        let hungry: Vec<EntityId> = host
            .calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::Status {
                    entity,
                    status: StatusKind::Hunger,
                } => Some(entity),
                _ => None,
            })
            .collect();
        assert_eq!(hungry, vec![outside]);
        assert_eq!(effects.job_count(world).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_all_clears_every_world() {
        let host = RecordingHost::new();
        let (first, _) = host.add_world();
        let (second, _) = host.add_world();
        let effects = scheduler(&host);

        effects.apply(first, WeatherKind::HeavyRain).await;
        effects.apply(second, WeatherKind::Blizzard).await;
        settle().await;
        effects.cancel_all().await;

        assert_eq!(effects.active_kind(first).await, None);
        assert_eq!(effects.active_kind(second).await, None);
        host.clear_calls();
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(host.calls().is_empty());
    }
}
