//! Atmosphere engine binary for the Tempest simulation.
//!
//! Wires a simulated host, the configured persistence backend, and the
//! [`Atmosphere`] together, then lets the driver run until Ctrl-C.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `tempest-config.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Connect the persistence backend (memory or Dragonfly)
//! 4. Create the simulated host
//! 5. Create the atmosphere and load every world
//! 6. Start the driver and wait for Ctrl-C
//! 7. Shut down: stop the driver, cancel effects, flush persistence

mod error;
mod sim_host;

use std::path::Path;
use std::sync::Arc;

use tempest_core::config::StorageBackend;
use tempest_core::{Atmosphere, AtmosphereConfig, Host, MemoryStore, Persistence};
use tempest_db::DragonflyStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;
use crate::sim_host::{SimConfig, SimHost};

/// Configuration file looked up in the working directory.
const CONFIG_PATH: &str = "tempest-config.yaml";

/// Application entry point for the atmosphere engine.
///
/// # Errors
///
/// Returns an error if configuration, storage, or startup fails.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, config_found) = load_config()?;
    let sim_config = load_sim_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("tempest-engine starting");
    if !config_found {
        info!("Config file not found, using defaults");
    }
    info!(
        days_per_season = config.seasons.days_per_season,
        default_duration_minutes = config.weather.default_duration_minutes,
        change_chance_percent = config.weather.change_chance_percent,
        tick_interval_ms = config.driver.tick_interval_ms,
        backend = ?config.storage.backend,
        "Configuration loaded"
    );

    // 3. Connect persistence.
    let store = match config.storage.backend {
        StorageBackend::Memory => Persistence::spawn(MemoryStore::new()),
        StorageBackend::Dragonfly => {
            let url = &config.storage.dragonfly_url;
            info!(url = %url, "Connecting to Dragonfly");
            Persistence::spawn(DragonflyStore::connect(url).await?)
        }
    };

    // 4. Create the simulated host.
    let host: Arc<dyn Host> = Arc::new(SimHost::new(&sim_config)?);

    // 5. Create the atmosphere and load every enabled world.
    let atmosphere = Atmosphere::new(&config, Arc::clone(&host), store)?;
    for world in host.enumerate_worlds() {
        if !atmosphere.is_enabled(world) {
            info!(world = %world, "World disabled, skipping");
            continue;
        }
        let status = atmosphere.load_world(world).await?;
        info!(
            world = %world,
            status = %serde_json::to_string(&status).unwrap_or_default(),
            "World ready"
        );
    }

    // 6. Run until interrupted.
    atmosphere.driver().start().await;
    tokio::signal::ctrl_c().await.map_err(EngineError::from)?;
    info!("Shutdown requested");

    // 7. Full shutdown.
    atmosphere.shutdown().await;
    info!(
        ticks = atmosphere.driver().ticks(),
        "tempest-engine shutdown complete"
    );
    Ok(())
}

/// Load the atmosphere configuration from `tempest-config.yaml`.
///
/// Returns the configuration and whether the file existed.
fn load_config() -> Result<(AtmosphereConfig, bool), EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if config_path.exists() {
        Ok((AtmosphereConfig::from_file(config_path)?, true))
    } else {
        let mut config = AtmosphereConfig::default();
        config.storage.apply_env_overrides();
        Ok((config, false))
    }
}

/// Load simulated host settings from the `sim` section of
/// `tempest-config.yaml`. A missing file or section yields defaults.
fn load_sim_config() -> Result<SimConfig, EngineError> {
    let config_path = Path::new(CONFIG_PATH);
    if !config_path.exists() {
        return Ok(SimConfig::default());
    }
    let contents = std::fs::read_to_string(config_path).map_err(|e| EngineError::Sim {
        message: format!("failed to read config file: {e}"),
    })?;

    let raw: serde_yml::Value = serde_yml::from_str(&contents).map_err(|e| EngineError::Sim {
        message: format!("failed to parse config YAML: {e}"),
    })?;

    raw.get("sim").map_or_else(
        || Ok(SimConfig::default()),
        |sim_value| {
            serde_yml::from_value(sim_value.clone()).map_err(|e| EngineError::Sim {
                message: format!("failed to parse sim config: {e}"),
            })
        },
    )
}
