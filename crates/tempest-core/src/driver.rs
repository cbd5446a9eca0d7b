//! The periodic simulation driver.
//!
//! The driver owns a background task that calls
//! [`Atmosphere::tick`](crate::engine::Atmosphere::tick) and then sleeps
//! for the current tick interval. Control fields are atomics so the
//! interval can be retuned while the loop runs, without locks on the hot
//! path.
//!
//! Stopping the driver only stops ticking. Running effect jobs are left
//! alone; a full teardown goes through
//! [`Atmosphere::shutdown`](crate::engine::Atmosphere::shutdown).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, MIN_TICK_INTERVAL_MS};
use crate::engine::Atmosphere;

/// Lock-free control state shared with the loop task.
#[derive(Debug)]
struct DriverControl {
    running: AtomicBool,
    tick_interval_ms: AtomicU64,
    ticks: AtomicU64,
}

/// A running loop task and the signal that stops it.
struct RunHandle {
    task: JoinHandle<()>,
    stop: Arc<Notify>,
    started_at: DateTime<Utc>,
}

/// Starts and stops the tick loop.
pub struct SimulationDriver {
    atmosphere: Weak<Atmosphere>,
    control: Arc<DriverControl>,
    run: Mutex<Option<RunHandle>>,
}

impl SimulationDriver {
    pub(crate) fn new(atmosphere: Weak<Atmosphere>, tick_interval_ms: u64) -> Self {
        Self {
            atmosphere,
            control: Arc::new(DriverControl {
                running: AtomicBool::new(false),
                tick_interval_ms: AtomicU64::new(tick_interval_ms.max(MIN_TICK_INTERVAL_MS)),
                ticks: AtomicU64::new(0),
            }),
            run: Mutex::new(None),
        }
    }

    /// Start ticking. The first tick runs immediately.
    ///
    /// Returns `false` if the driver was already running.
    pub async fn start(&self) -> bool {
        let mut run = self.run.lock().await;
        if run.as_ref().is_some_and(|handle| !handle.task.is_finished()) {
            return false;
        }
        self.control.running.store(true, Ordering::Release);
        let stop = Arc::new(Notify::new());
        let task = tokio::spawn(tick_loop(
            self.atmosphere.clone(),
            Arc::clone(&self.control),
            Arc::clone(&stop),
        ));
        *run = Some(RunHandle {
            task,
            stop,
            started_at: Utc::now(),
        });
        info!(
            interval_ms = self.tick_interval_ms(),
            "Simulation driver started"
        );
        true
    }

    /// Stop ticking and wait for an in-flight tick to finish.
    ///
    /// Returns `false` if the driver was not running.
    pub async fn stop(&self) -> bool {
        let mut run = self.run.lock().await;
        let Some(handle) = run.take() else {
            return false;
        };
        self.control.running.store(false, Ordering::Release);
        handle.stop.notify_one();
        if let Err(e) = handle.task.await {
            warn!(error = %e, "Simulation driver ended abnormally");
        }
        info!(ticks = self.ticks(), "Simulation driver stopped");
        true
    }

    /// Whether the loop is running.
    pub fn is_running(&self) -> bool {
        self.control.running.load(Ordering::Acquire)
    }

    /// Current tick interval in milliseconds.
    pub fn tick_interval_ms(&self) -> u64 {
        self.control.tick_interval_ms.load(Ordering::Acquire)
    }

    /// Set the tick interval. Must be at least 100 ms.
    ///
    /// Returns the previous interval. Takes effect after the current sleep.
    pub fn set_tick_interval_ms(&self, ms: u64) -> Result<u64, ConfigError> {
        if ms < MIN_TICK_INTERVAL_MS {
            return Err(ConfigError::Invalid {
                field: "driver.tick_interval_ms",
                message: format!("must be at least {MIN_TICK_INTERVAL_MS}, got {ms}"),
            });
        }
        Ok(self.control.tick_interval_ms.swap(ms, Ordering::AcqRel))
    }

    /// Ticks completed since the driver was created.
    pub fn ticks(&self) -> u64 {
        self.control.ticks.load(Ordering::Acquire)
    }

    /// When the current run started, if running.
    pub async fn started_at(&self) -> Option<DateTime<Utc>> {
        self.run.lock().await.as_ref().map(|handle| handle.started_at)
    }
}

impl core::fmt::Debug for SimulationDriver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimulationDriver")
            .field("control", &self.control)
            .finish_non_exhaustive()
    }
}

async fn tick_loop(atmosphere: Weak<Atmosphere>, control: Arc<DriverControl>, stop: Arc<Notify>) {
    loop {
        if !control.running.load(Ordering::Acquire) {
            break;
        }
        let Some(atmosphere) = atmosphere.upgrade() else {
            debug!("Atmosphere dropped, driver exiting");
            break;
        };
        atmosphere.tick().await;
        drop(atmosphere);
        let tick = control.ticks.fetch_add(1, Ordering::AcqRel).saturating_add(1);
        debug!(tick, "Driver tick complete");

        let interval = Duration::from_millis(control.tick_interval_ms.load(Ordering::Acquire));
        tokio::select! {
            () = tokio::time::sleep(interval) => {}
            () = stop.notified() => break,
        }
    }
    control.running.store(false, Ordering::Release);
}
