//! Runtime-adjustable settings.
//!
//! Values seeded from [`AtmosphereConfig`] that operators may change while
//! the simulation runs. Atomic fields keep reads lock-free on the driver
//! and effect hot paths. Changes apply to the next decision that reads
//! them; nothing already running is rescaled.

use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};

use crate::config::{AtmosphereConfig, ConfigError};

/// Damage cadences consumed by the effect catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectSettings {
    /// Ticks between cold applications.
    pub frostbite_interval_ticks: u32,
    /// Ticks between heat applications.
    pub heat_interval_ticks: u32,
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            frostbite_interval_ticks: 100,
            heat_interval_ticks: 80,
        }
    }
}

/// Shared, hot-settable simulation settings.
#[derive(Debug)]
pub struct RuntimeSettings {
    days_per_season: AtomicU32,
    default_duration_minutes: AtomicU32,
    change_chance_percent: AtomicU8,
    minutes_per_tick: AtomicU32,
    frostbite_interval_ticks: AtomicU32,
    heat_interval_ticks: AtomicU32,
}

impl RuntimeSettings {
    /// Seed settings from configuration.
    pub const fn from_config(config: &AtmosphereConfig) -> Self {
        Self {
            days_per_season: AtomicU32::new(config.seasons.days_per_season),
            default_duration_minutes: AtomicU32::new(config.weather.default_duration_minutes),
            change_chance_percent: AtomicU8::new(config.weather.change_chance_percent),
            minutes_per_tick: AtomicU32::new(config.weather.minutes_per_tick),
            frostbite_interval_ticks: AtomicU32::new(config.effects.frostbite_interval_ticks),
            heat_interval_ticks: AtomicU32::new(config.effects.heat_interval_ticks),
        }
    }

    /// Days in each season.
    pub fn days_per_season(&self) -> u32 {
        self.days_per_season.load(Ordering::Acquire)
    }

    /// Set days per season. Existing day counters are not clamped.
    ///
    /// Returns the previous value.
    pub fn set_days_per_season(&self, days: u32) -> Result<u32, ConfigError> {
        positive("seasons.days_per_season", days)?;
        Ok(self.days_per_season.swap(days, Ordering::AcqRel))
    }

    /// Duration, in minutes, of weather set without an explicit duration.
    pub fn default_duration_minutes(&self) -> u32 {
        self.default_duration_minutes.load(Ordering::Acquire)
    }

    /// Set the default weather duration. Returns the previous value.
    pub fn set_default_duration_minutes(&self, minutes: u32) -> Result<u32, ConfigError> {
        positive("weather.default_duration_minutes", minutes)?;
        Ok(self.default_duration_minutes.swap(minutes, Ordering::AcqRel))
    }

    /// Percent chance of a weather change on a new day.
    pub fn change_chance_percent(&self) -> u8 {
        self.change_chance_percent.load(Ordering::Acquire)
    }

    /// Set the daily change chance. Returns the previous value.
    pub fn set_change_chance_percent(&self, percent: u8) -> Result<u8, ConfigError> {
        if percent > 100 {
            return Err(ConfigError::Invalid {
                field: "weather.change_chance_percent",
                message: format!("{percent} is not between 0 and 100"),
            });
        }
        Ok(self.change_chance_percent.swap(percent, Ordering::AcqRel))
    }

    /// Minutes of weather duration consumed per driver tick.
    pub fn minutes_per_tick(&self) -> u32 {
        self.minutes_per_tick.load(Ordering::Acquire)
    }

    /// Set weather aging per driver tick. Zero disables aging. Returns the previous value.
    pub fn set_minutes_per_tick(&self, minutes: u32) -> u32 {
        self.minutes_per_tick.swap(minutes, Ordering::AcqRel)
    }

    /// Ticks between cold applications.
    pub fn frostbite_interval_ticks(&self) -> u32 {
        self.frostbite_interval_ticks.load(Ordering::Acquire)
    }

    /// Set the cold cadence. Returns the previous value.
    pub fn set_frostbite_interval_ticks(&self, ticks: u32) -> Result<u32, ConfigError> {
        positive("effects.frostbite_interval_ticks", ticks)?;
        Ok(self.frostbite_interval_ticks.swap(ticks, Ordering::AcqRel))
    }

    /// Ticks between heat applications.
    pub fn heat_interval_ticks(&self) -> u32 {
        self.heat_interval_ticks.load(Ordering::Acquire)
    }

    /// Set the heat cadence. Returns the previous value.
    pub fn set_heat_interval_ticks(&self, ticks: u32) -> Result<u32, ConfigError> {
        positive("effects.heat_interval_ticks", ticks)?;
        Ok(self.heat_interval_ticks.swap(ticks, Ordering::AcqRel))
    }

    /// Current effect cadences.
    pub fn effect_settings(&self) -> EffectSettings {
        EffectSettings {
            frostbite_interval_ticks: self.frostbite_interval_ticks(),
            heat_interval_ticks: self.heat_interval_ticks(),
        }
    }
}

fn positive(field: &'static str, value: u32) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            field,
            message: String::from("must be at least 1"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_from_config() {
        let settings = RuntimeSettings::from_config(&AtmosphereConfig::default());
        assert_eq!(settings.days_per_season(), 30);
        assert_eq!(settings.default_duration_minutes(), 120);
        assert_eq!(settings.change_chance_percent(), 30);
        assert_eq!(settings.effect_settings(), EffectSettings::default());
    }

    #[test]
    fn setters_return_previous_value() {
        let settings = RuntimeSettings::from_config(&AtmosphereConfig::default());
        assert_eq!(settings.set_days_per_season(10).ok(), Some(30));
        assert_eq!(settings.days_per_season(), 10);
        assert_eq!(settings.set_heat_interval_ticks(40).ok(), Some(80));
        assert_eq!(settings.effect_settings().heat_interval_ticks, 40);
    }

    #[test]
    fn setters_reject_out_of_range() {
        let settings = RuntimeSettings::from_config(&AtmosphereConfig::default());
        assert!(settings.set_days_per_season(0).is_err());
        assert!(settings.set_change_chance_percent(150).is_err());
        assert!(settings.set_frostbite_interval_ticks(0).is_err());
        assert_eq!(settings.days_per_season(), 30);
        assert_eq!(settings.change_chance_percent(), 30);
    }
}
