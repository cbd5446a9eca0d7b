//! Configuration loading and typed config structures for Tempest.
//!
//! The canonical configuration lives in `tempest-config.yaml` next to the
//! engine binary. This module defines strongly-typed structs that mirror
//! the YAML structure, a loader, and [`AtmosphereConfig::validate`] which
//! rejects values the engine cannot run with. Every field has a default,
//! so an empty file (or no file at all) is a valid configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;
use tempest_types::{SeasonKind, WeatherKind, WorldId};

/// Errors that can occur when loading or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but is outside the accepted range.
    #[error("invalid value for {field}: {message}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// What was wrong with it.
        message: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level Tempest configuration.
///
/// Mirrors the structure of `tempest-config.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AtmosphereConfig {
    /// Which worlds the simulation runs in.
    #[serde(default)]
    pub worlds: WorldsConfig,

    /// Season length and weather pools.
    #[serde(default)]
    pub seasons: SeasonsConfig,

    /// Weather durations and change probability.
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Effect timing.
    #[serde(default)]
    pub effects: EffectsConfig,

    /// Simulation driver cadence.
    #[serde(default)]
    pub driver: DriverConfig,

    /// Persistence backend.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AtmosphereConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `DRAGONFLY_URL` overrides `storage.dragonfly_url` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse and validate configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.storage.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Check every field against its accepted range.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::Invalid`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seasons.days_per_season == 0 {
            return Err(invalid("seasons.days_per_season", "must be at least 1"));
        }
        if self.weather.default_duration_minutes == 0 {
            return Err(invalid(
                "weather.default_duration_minutes",
                "must be at least 1",
            ));
        }
        if self.weather.change_chance_percent > 100 {
            return Err(invalid(
                "weather.change_chance_percent",
                "must be between 0 and 100",
            ));
        }
        if self.effects.frostbite_interval_ticks == 0 {
            return Err(invalid(
                "effects.frostbite_interval_ticks",
                "must be at least 1",
            ));
        }
        if self.effects.heat_interval_ticks == 0 {
            return Err(invalid("effects.heat_interval_ticks", "must be at least 1"));
        }
        if self.effects.tick_duration_ms == 0 {
            return Err(invalid("effects.tick_duration_ms", "must be at least 1"));
        }
        if self.driver.tick_interval_ms < MIN_TICK_INTERVAL_MS {
            return Err(invalid(
                "driver.tick_interval_ms",
                format!("must be at least {MIN_TICK_INTERVAL_MS}"),
            ));
        }
        self.worlds.filter()?;
        self.seasons.pool_overrides()?;
        Ok(())
    }
}

/// Smallest accepted driver tick interval.
pub const MIN_TICK_INTERVAL_MS: u64 = 100;

fn invalid(field: &'static str, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        message: message.into(),
    }
}

/// World selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WorldsConfig {
    /// World ids the simulation runs in. Empty, or any entry equal to
    /// `all`, means every world the host reports.
    #[serde(default)]
    pub enabled: Vec<String>,
}

impl WorldsConfig {
    /// Resolve the configured list into a [`WorldFilter`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if an entry is neither `all` nor a UUID.
    pub fn filter(&self) -> Result<WorldFilter, ConfigError> {
        if self.enabled.is_empty()
            || self
                .enabled
                .iter()
                .any(|entry| entry.trim().eq_ignore_ascii_case("all"))
        {
            return Ok(WorldFilter::All);
        }
        let mut worlds = BTreeSet::new();
        for entry in &self.enabled {
            let id: WorldId = entry
                .trim()
                .parse()
                .map_err(|e| invalid("worlds.enabled", format!("{entry:?}: {e}")))?;
            worlds.insert(id);
        }
        Ok(WorldFilter::Only(worlds))
    }
}

/// Which worlds the simulation is allowed to touch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldFilter {
    /// Every world.
    All,
    /// Only the listed worlds.
    Only(BTreeSet<WorldId>),
}

impl WorldFilter {
    /// Whether `world` passes the filter.
    pub fn allows(&self, world: WorldId) -> bool {
        match self {
            Self::All => true,
            Self::Only(worlds) => worlds.contains(&world),
        }
    }
}

/// Season settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SeasonsConfig {
    /// Days in each season.
    #[serde(default = "default_days_per_season")]
    pub days_per_season: u32,

    /// Per-season pool overrides keyed by season id. Seasons not listed
    /// keep their default pool.
    #[serde(default)]
    pub pools: BTreeMap<String, Vec<PoolEntry>>,
}

impl Default for SeasonsConfig {
    fn default() -> Self {
        Self {
            days_per_season: default_days_per_season(),
            pools: BTreeMap::new(),
        }
    }
}

impl SeasonsConfig {
    /// Resolve the configured overrides into typed weighted pools.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for unknown season or weather ids,
    /// and for pools naming the night-cycle sentinel.
    pub fn pool_overrides(
        &self,
    ) -> Result<BTreeMap<SeasonKind, Vec<(WeatherKind, u32)>>, ConfigError> {
        let mut resolved = BTreeMap::new();
        for (season_id, entries) in &self.pools {
            let season = SeasonKind::from_id(season_id)
                .ok_or_else(|| invalid("seasons.pools", format!("unknown season {season_id:?}")))?;
            let mut pool = Vec::with_capacity(entries.len());
            for entry in entries {
                let (id, weight) = entry.parts();
                let kind = WeatherKind::from_id(id)
                    .ok_or_else(|| invalid("seasons.pools", format!("unknown weather {id:?}")))?;
                if !kind.is_selectable() {
                    return Err(invalid(
                        "seasons.pools",
                        format!("{id:?} cannot appear in a season pool"),
                    ));
                }
                pool.push((kind, weight));
            }
            resolved.insert(season, pool);
        }
        Ok(resolved)
    }
}

/// One weather entry of a season pool: either a bare id (weight 1) or an
/// id with an explicit weight.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum PoolEntry {
    /// Bare weather id.
    Id(String),
    /// Weather id with a relative weight.
    Weighted {
        /// Weather id.
        weather: String,
        /// Relative weight.
        #[serde(default = "default_pool_weight")]
        weight: u32,
    },
}

impl PoolEntry {
    fn parts(&self) -> (&str, u32) {
        match self {
            Self::Id(id) => (id, default_pool_weight()),
            Self::Weighted { weather, weight } => (weather, *weight),
        }
    }
}

/// Weather settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WeatherConfig {
    /// Duration, in minutes, of weather set without an explicit duration.
    #[serde(default = "default_duration_minutes")]
    pub default_duration_minutes: u32,

    /// Percent chance of a weather change on each new day.
    #[serde(default = "default_change_chance_percent")]
    pub change_chance_percent: u8,

    /// Minutes of weather duration consumed per driver tick. Zero disables aging.
    #[serde(default = "default_minutes_per_tick")]
    pub minutes_per_tick: u32,

    /// Seed for reproducible weather rolls. Entropy-seeded when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            default_duration_minutes: default_duration_minutes(),
            change_chance_percent: default_change_chance_percent(),
            minutes_per_tick: default_minutes_per_tick(),
            seed: None,
        }
    }
}

/// Effect timing settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EffectsConfig {
    /// Ticks between cold damage and slowness applications.
    #[serde(default = "default_frostbite_interval_ticks")]
    pub frostbite_interval_ticks: u32,

    /// Ticks between heat damage and hunger applications.
    #[serde(default = "default_heat_interval_ticks")]
    pub heat_interval_ticks: u32,

    /// Wall-clock length of one effect tick in milliseconds.
    #[serde(default = "default_tick_duration_ms")]
    pub tick_duration_ms: u64,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            frostbite_interval_ticks: default_frostbite_interval_ticks(),
            heat_interval_ticks: default_heat_interval_ticks(),
            tick_duration_ms: default_tick_duration_ms(),
        }
    }
}

/// Simulation driver settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DriverConfig {
    /// Milliseconds between driver ticks.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
        }
    }
}

/// Available persistence backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// In-process map; state is lost on exit.
    #[default]
    Memory,
    /// Dragonfly (Redis-compatible) hashes.
    Dragonfly,
}

/// Persistence settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StorageConfig {
    /// Which backend stores world state.
    #[serde(default)]
    pub backend: StorageBackend,

    /// Dragonfly (Redis-compatible) URL.
    #[serde(default = "default_dragonfly_url")]
    pub dragonfly_url: String,
}

impl StorageConfig {
    /// Override the Dragonfly URL with `DRAGONFLY_URL` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DRAGONFLY_URL") {
            self.dragonfly_url = val;
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            dragonfly_url: default_dragonfly_url(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

const fn default_days_per_season() -> u32 {
    30
}

const fn default_pool_weight() -> u32 {
    1
}

const fn default_duration_minutes() -> u32 {
    120
}

const fn default_change_chance_percent() -> u8 {
    30
}

const fn default_minutes_per_tick() -> u32 {
    1
}

const fn default_frostbite_interval_ticks() -> u32 {
    100
}

const fn default_heat_interval_ticks() -> u32 {
    80
}

const fn default_tick_duration_ms() -> u64 {
    50
}

const fn default_tick_interval_ms() -> u64 {
    10_000
}

fn default_dragonfly_url() -> String {
    String::from("redis://localhost:6379")
}

fn default_log_level() -> String {
    String::from("info")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AtmosphereConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.seasons.days_per_season, 30);
        assert_eq!(config.weather.default_duration_minutes, 120);
        assert_eq!(config.weather.change_chance_percent, 30);
        assert_eq!(config.effects.frostbite_interval_ticks, 100);
        assert_eq!(config.effects.heat_interval_ticks, 80);
        assert_eq!(config.worlds.filter().unwrap(), WorldFilter::All);
    }

    #[test]
    fn empty_yaml_uses_defaults() {
        let config: AtmosphereConfig = serde_yml::from_str("{}").unwrap();
        assert_eq!(config, AtmosphereConfig::default());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
worlds:
  enabled:
    - "0191d3c2-7a4e-7cc0-8e4b-2f8a1c3e9d10"
seasons:
  days_per_season: 12
  pools:
    winter:
      - blizzard
      - weather: clear_sky
        weight: 5
weather:
  default_duration_minutes: 60
  change_chance_percent: 50
  minutes_per_tick: 2
  seed: 7
effects:
  frostbite_interval_ticks: 40
  heat_interval_ticks: 60
  tick_duration_ms: 50
driver:
  tick_interval_ms: 500
storage:
  backend: dragonfly
logging:
  level: "debug"
"#;
        let config: AtmosphereConfig = serde_yml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.seasons.days_per_season, 12);
        assert_eq!(config.weather.seed, Some(7));
        assert_eq!(config.storage.backend, StorageBackend::Dragonfly);

        let pools = config.seasons.pool_overrides().unwrap();
        let winter = pools.get(&SeasonKind::Winter).unwrap();
        assert_eq!(
            winter,
            &vec![(WeatherKind::Blizzard, 1), (WeatherKind::ClearSky, 5)]
        );

        let filter = config.worlds.filter().unwrap();
        assert!(matches!(filter, WorldFilter::Only(ref worlds) if worlds.len() == 1));
        assert!(!filter.allows(WorldId::new()));
    }

    #[test]
    fn all_keyword_enables_every_world() {
        let worlds = WorldsConfig {
            enabled: vec![String::from("ALL")],
        };
        assert!(worlds.filter().unwrap().allows(WorldId::new()));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let mut config = AtmosphereConfig::default();
        config.weather.change_chance_percent = 101;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "weather.change_chance_percent",
                ..
            })
        ));

        let mut config = AtmosphereConfig::default();
        config.seasons.days_per_season = 0;
        assert!(config.validate().is_err());

        let mut config = AtmosphereConfig::default();
        config.driver.tick_interval_ms = 50;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_sentinel_and_unknown_pool_entries() {
        let yaml = "seasons:\n  pools:\n    spring:\n      - night_cycle\n";
        assert!(AtmosphereConfig::parse(yaml).is_err());
        let yaml = "seasons:\n  pools:\n    spring:\n      - sunshine\n";
        assert!(AtmosphereConfig::parse(yaml).is_err());
        let yaml = "seasons:\n  pools:\n    monsoon_season:\n      - fog\n";
        assert!(AtmosphereConfig::parse(yaml).is_err());
    }

    #[test]
    fn rejects_malformed_world_ids() {
        let worlds = WorldsConfig {
            enabled: vec![String::from("overworld")],
        };
        assert!(worlds.filter().is_err());
    }
}
