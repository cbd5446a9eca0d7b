//! The generic periodic effect job.
//!
//! One job interprets one [`EffectDescriptor`] for one world. It wakes
//! every `interval_ticks` effect ticks, checks its [`CancelToken`] before
//! doing anything, and then performs a single run against the host.
//!
//! Host failures are classified per call:
//!
//! - [`HostError::EntityGone`]: the entity is skipped for this run.
//! - [`HostError::WorldUnloaded`]: the job stops itself.
//! - [`HostError::Unavailable`]: logged, the entity is skipped.

use std::collections::BTreeMap;
use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use rand::rngs::SmallRng;
use tempest_types::{
    BlockPos, EffectDescriptor, EffectKind, EntityId, ParticleBurst, Position, WeatherKind,
    WorldId,
};
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::host::{Host, HostError};

/// Cooperative cancellation shared by every job of one effect set.
#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancelToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel and wake every waiting job.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
        self.notify.notify_waiters();
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Resolve once the token is cancelled.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

/// Original materials of every block an effect set has transformed.
#[derive(Debug, Default)]
pub struct BlockLedger {
    originals: Mutex<BTreeMap<BlockPos, String>>,
}

impl BlockLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `pos` has already been transformed.
    pub fn contains(&self, pos: BlockPos) -> bool {
        self.originals
            .lock()
            .is_ok_and(|originals| originals.contains_key(&pos))
    }

    /// Remember `original` for `pos`. The first recorded material wins.
    pub fn record(&self, pos: BlockPos, original: String) {
        if let Ok(mut originals) = self.originals.lock() {
            originals.entry(pos).or_insert(original);
        }
    }

    /// Number of transformed blocks.
    pub fn len(&self) -> usize {
        self.originals.lock().map_or(0, |originals| originals.len())
    }

    /// Whether nothing has been transformed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take every entry, leaving the ledger empty.
    pub fn drain(&self) -> Vec<(BlockPos, String)> {
        self.originals
            .lock()
            .map(|mut originals| std::mem::take(&mut *originals).into_iter().collect())
            .unwrap_or_default()
    }
}

/// Why a job stopped on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobStop {
    /// The world is gone.
    WorldUnloaded,
}

/// Everything one job needs.
pub(crate) struct EffectJob {
    pub world: WorldId,
    pub weather: WeatherKind,
    pub descriptor: EffectDescriptor,
    pub host: Arc<dyn Host>,
    pub token: Arc<CancelToken>,
    pub ledger: Arc<BlockLedger>,
    pub tick: Duration,
    pub rng: SmallRng,
}

impl EffectJob {
    /// Run until cancelled or the world goes away.
    pub async fn run(mut self) {
        let period = self.tick.saturating_mul(self.descriptor.interval_ticks).max(self.tick);
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = self.token.cancelled() => break,
                _ = ticker.tick() => {}
            }
            if self.token.is_cancelled() {
                break;
            }
            if let Err(stop) = self.run_once() {
                debug!(
                    world = %self.world,
                    weather = %self.weather,
                    reason = ?stop,
                    "Effect job stopped itself"
                );
                break;
            }
        }
    }

    /// Perform a single run of the descriptor.
    pub fn run_once(&mut self) -> Result<(), JobStop> {
        let world = self.world;
        let host = Arc::clone(&self.host);
        let host = host.as_ref();
        let descriptor = &self.descriptor;
        let rng = &mut self.rng;

        match &descriptor.kind {
            EffectKind::Particles {
                particle,
                count,
                spread,
                height,
                speed,
            } => {
                let count = descriptor.scaled_count(*count);
                if count == 0 {
                    return Ok(());
                }
                each_entity(host, world, |entity| {
                    let origin = host.entity_position(world, entity)?;
                    let burst = ParticleBurst {
                        particle: *particle,
                        origin: origin.offset(0.0, height / 2.0, 0.0),
                        count,
                        spread: *spread,
                        height: *height,
                        speed: *speed,
                    };
                    host.emit_particles(world, &burst)
                })
            }
            EffectKind::Sound {
                sound,
                volume,
                pitch,
                chance,
            } => {
                if !roll(rng, *chance) {
                    return Ok(());
                }
                let volume = descriptor.scaled(*volume);
                each_entity(host, world, |entity| {
                    host.play_sound(world, entity, *sound, volume, *pitch)
                })
            }
            EffectKind::Status {
                status,
                amplifier,
                duration_ticks,
                exposed_only,
            } => each_entity(host, world, |entity| {
                if *exposed_only && !host.is_exposed_to_sky(world, entity)? {
                    return Ok(());
                }
                host.apply_status(world, entity, *status, *amplifier, *duration_ticks)
            }),
            EffectKind::Damage {
                amount,
                chance,
                exposed_only,
            } => each_entity(host, world, |entity| {
                if *exposed_only && !host.is_exposed_to_sky(world, entity)? {
                    return Ok(());
                }
                if !roll(rng, *chance) {
                    return Ok(());
                }
                host.damage(world, entity, *amount)
            }),
            EffectKind::Gust {
                strength,
                exposed_only,
            } => {
                let strength = descriptor.scaled(*strength);
                each_entity(host, world, |entity| {
                    if *exposed_only && !host.is_exposed_to_sky(world, entity)? {
                        return Ok(());
                    }
                    let angle = rng.random_range(0.0..TAU);
                    let velocity =
                        Position::new(angle.cos() * strength, strength * 0.25, angle.sin() * strength);
                    host.push_entity(world, entity, velocity)
                })
            }
            EffectKind::BlockTransform {
                radius,
                from,
                to,
                attempts,
            } => {
                let attempts = descriptor.scaled_count(*attempts);
                let radius = i32::try_from(*radius).unwrap_or(i32::MAX);
                let ledger = &self.ledger;
                each_entity(host, world, |entity| {
                    let centre = host.entity_position(world, entity)?.block();
                    for _ in 0..attempts {
                        let x = centre.x.saturating_add(rng.random_range(-radius..=radius));
                        let z = centre.z.saturating_add(rng.random_range(-radius..=radius));
                        let Some((pos, material)) = host.surface_block(world, x, z)? else {
                            continue;
                        };
                        if material != *from || ledger.contains(pos) {
                            continue;
                        }
                        host.transform_block(world, pos, to)?;
                        ledger.record(pos, material);
                    }
                    Ok(())
                })
            }
        }
    }
}

/// Whether a `chance` in `[0, 1]` succeeds.
fn roll(rng: &mut SmallRng, chance: f64) -> bool {
    if chance >= 1.0 {
        return true;
    }
    if chance <= 0.0 {
        return false;
    }
    rng.random::<f64>() < chance
}

/// Call `apply` for every entity present in `world`, classifying failures.
fn each_entity(
    host: &dyn Host,
    world: WorldId,
    mut apply: impl FnMut(EntityId) -> Result<(), HostError>,
) -> Result<(), JobStop> {
    let entities = match host.present_entities(world) {
        Ok(entities) => entities,
        Err(HostError::WorldUnloaded(_)) => return Err(JobStop::WorldUnloaded),
        Err(e) => {
            warn!(world = %world, error = %e, "Could not list entities, skipping run");
            return Ok(());
        }
    };
    for entity in entities {
        match apply(entity) {
            Ok(()) => {}
            Err(HostError::EntityGone(_)) => {
                debug!(world = %world, entity = %entity, "Entity left mid-run");
            }
            Err(HostError::WorldUnloaded(_)) => return Err(JobStop::WorldUnloaded),
            Err(e @ HostError::Unavailable(_)) => {
                warn!(world = %world, entity = %entity, error = %e, "Effect skipped for entity");
            }
        }
    }
    Ok(())
}
