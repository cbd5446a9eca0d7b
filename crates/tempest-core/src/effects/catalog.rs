//! The effect table: which recurring effects each weather kind runs.
//!
//! Intervals are in effect ticks. Cold and heat cadences come from
//! [`EffectSettings`] so operators can retune them at runtime; the new
//! cadence applies the next time a weather's effects are started.

use tempest_types::{
    EffectDescriptor, EffectKind, ParticleKind, SoundKind, StatusKind, WeatherKind,
};

use crate::settings::EffectSettings;

const PRECIPITATION_INTERVAL: u32 = 5;
const HAZE_INTERVAL: u32 = 10;
const RAIN_SOUND_INTERVAL: u32 = 40;
const WIND_SOUND_INTERVAL: u32 = 60;
const THUNDER_INTERVAL: u32 = 100;
const GUST_INTERVAL: u32 = 20;
const SNOW_COVER_INTERVAL: u32 = 100;
const STATUS_DURATION_TICKS: u32 = 100;

/// Effects run while `kind` is the live weather.
///
/// [`WeatherKind::NightCycle`] and calm kinds return an empty list.
pub fn effects_for(kind: WeatherKind, settings: &EffectSettings) -> Vec<EffectDescriptor> {
    use WeatherKind as W;
    match kind {
        W::LightRain => rain(0.25),
        W::ModerateRain | W::MudRain | W::SandRain => rain(0.5),
        W::HeavyRain | W::Shower | W::Monsoon => rain(1.0),
        W::Drizzle | W::Slush => rain(0.125),
        W::FreezingRain | W::Sleet => [rain(0.5), vec![cold_status(settings)]].concat(),
        W::AcidRain => [rain(0.5), vec![damage(1.0, 1.0, 200)]].concat(),
        W::FlashFlood | W::StormSurge => [rain(1.0), wind(0.6)].concat(),

        W::SmallHail => hail(0.4),
        W::MediumHail => [hail(0.7), vec![damage(0.5, 1.0, 200)]].concat(),
        W::LargeHail => [hail(1.0), vec![damage(1.0, 1.0, 100)]].concat(),

        W::LightSnow => snow(0.2),
        W::ModerateSnow | W::ColoredSnow => snow(0.4),
        W::HeavySnow => [snow(0.6), vec![snow_cover(0.6)]].concat(),
        W::Blizzard => [
            snow(1.0),
            vec![
                snow_cover(1.0),
                cold_status(settings),
                damage(1.0, 1.0, settings.frostbite_interval_ticks),
            ],
            wind(0.6),
        ]
        .concat(),

        W::Fog | W::Mist | W::FreezingFog | W::SeaMist | W::IceFog => haze(ParticleKind::Cloud),
        W::Smog | W::Smoke => haze(ParticleKind::Smoke),
        W::DustHaze => haze(ParticleKind::Ash),
        W::VolcanicAsh => [
            haze(ParticleKind::Ash),
            vec![status(StatusKind::Blindness, 0, 200)],
        ]
        .concat(),

        W::Thunderstorm => [rain(1.0), thunder()].concat(),
        W::Lightning | W::Thunder => thunder(),
        W::StElmoFire => vec![particles(ParticleKind::Spark, 8, 1.5, 2.0, 0.05, 20, 1.0)],
        W::Aurora | W::Rainbow | W::Moonbow | W::Halo | W::Sundog | W::LightPillar
        | W::Corona | W::CrepuscularRay | W::GreenFlash => {
            vec![particles(ParticleKind::Glow, 6, 12.0, 20.0, 0.0, 40, 1.0)]
        }

        W::HeatWave => vec![heat_status(settings)],
        W::Heatstroke => vec![
            heat_status(settings),
            damage(1.0, 1.0, settings.heat_interval_ticks),
        ],
        W::Firestorm => vec![
            particles(ParticleKind::Ember, 15, 8.0, 6.0, 0.1, PRECIPITATION_INTERVAL, 1.0),
            heat_status(settings),
            damage(1.0, 1.0, settings.heat_interval_ticks),
        ],
        W::ColdWave | W::FrostEvent | W::Avalanche => vec![cold_status(settings)],

        W::StrongWind | W::Chinook => wind(0.3),
        W::Gust | W::Storm | W::WindBlast => wind(0.6),
        W::SandStorm | W::DustStorm => [
            wind(0.6),
            vec![
                particles(ParticleKind::Ash, 20, 10.0, 4.0, 0.2, PRECIPITATION_INTERVAL, 1.0),
                status(StatusKind::Blindness, 0, 60),
            ],
        ]
        .concat(),
        W::Hurricane | W::TropicalCyclone | W::Waterspout => {
            [wind(1.0), vec![gust(1.0)], rain(1.0)].concat()
        }
        W::Tornado => [wind(1.0), vec![gust(1.0), damage(2.0, 0.2, GUST_INTERVAL)]].concat(),

        W::Frost
        | W::Thaw
        | W::LightBreeze
        | W::ModerateWind
        | W::ClearSky
        | W::PartlyCloudy
        | W::Cloudy
        | W::Overcast
        | W::ThreateningSky
        | W::NightCycle => Vec::new(),
    }
}

fn particles(
    particle: ParticleKind,
    count: u32,
    spread: f64,
    height: f64,
    speed: f64,
    interval_ticks: u32,
    intensity: f64,
) -> EffectDescriptor {
    EffectDescriptor::new(
        EffectKind::Particles {
            particle,
            count,
            spread,
            height,
            speed,
        },
        interval_ticks,
        intensity,
    )
}

fn sound(
    sound: SoundKind,
    volume: f64,
    pitch: f64,
    chance: f64,
    interval: u32,
    intensity: f64,
) -> EffectDescriptor {
    EffectDescriptor::new(
        EffectKind::Sound {
            sound,
            volume,
            pitch,
            chance,
        },
        interval,
        intensity,
    )
}

fn status(status: StatusKind, amplifier: u8, interval: u32) -> EffectDescriptor {
    EffectDescriptor::new(
        EffectKind::Status {
            status,
            amplifier,
            duration_ticks: STATUS_DURATION_TICKS,
            exposed_only: true,
        },
        interval,
        1.0,
    )
}

fn damage(amount: f64, chance: f64, interval: u32) -> EffectDescriptor {
    EffectDescriptor::new(
        EffectKind::Damage {
            amount,
            chance,
            exposed_only: true,
        },
        interval,
        1.0,
    )
}

fn gust(intensity: f64) -> EffectDescriptor {
    EffectDescriptor::new(
        EffectKind::Gust {
            strength: 1.5,
            exposed_only: true,
        },
        GUST_INTERVAL,
        intensity,
    )
}

fn snow_cover(intensity: f64) -> EffectDescriptor {
    EffectDescriptor::new(
        EffectKind::BlockTransform {
            radius: 15,
            from: String::from("grass_block"),
            to: String::from("snow_block"),
            attempts: 10,
        },
        SNOW_COVER_INTERVAL,
        intensity,
    )
}

fn rain(intensity: f64) -> Vec<EffectDescriptor> {
    vec![
        particles(ParticleKind::RainDrop, 20, 20.0, 15.0, 0.0, PRECIPITATION_INTERVAL, intensity),
        sound(SoundKind::Rain, 0.8, 1.0, 1.0, RAIN_SOUND_INTERVAL, intensity),
    ]
}

fn snow(intensity: f64) -> Vec<EffectDescriptor> {
    vec![
        particles(ParticleKind::Snowflake, 25, 20.0, 15.0, 0.0, PRECIPITATION_INTERVAL, intensity),
        status(StatusKind::Slowness, 0, 200),
    ]
}

fn hail(intensity: f64) -> Vec<EffectDescriptor> {
    vec![particles(
        ParticleKind::Hailstone,
        15,
        15.0,
        12.0,
        0.3,
        PRECIPITATION_INTERVAL,
        intensity,
    )]
}

fn haze(particle: ParticleKind) -> Vec<EffectDescriptor> {
    vec![particles(particle, 12, 12.0, 4.0, 0.0, HAZE_INTERVAL, 1.0)]
}

fn thunder() -> Vec<EffectDescriptor> {
    vec![sound(SoundKind::Thunder, 1.0, 1.0, 0.1, THUNDER_INTERVAL, 1.0)]
}

fn wind(intensity: f64) -> Vec<EffectDescriptor> {
    vec![sound(SoundKind::Wind, 1.0, 0.5, 1.0, WIND_SOUND_INTERVAL, intensity)]
}

fn heat_status(settings: &EffectSettings) -> EffectDescriptor {
    status(StatusKind::Hunger, 0, settings.heat_interval_ticks)
}

fn cold_status(settings: &EffectSettings) -> EffectDescriptor {
    status(StatusKind::Slowness, 1, settings.frostbite_interval_ticks)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(effects: &[EffectDescriptor], pred: impl Fn(&EffectKind) -> bool) -> usize {
        effects.iter().filter(|d| pred(&d.kind)).count()
    }

    #[test]
    fn night_cycle_and_clear_sky_run_nothing() {
        let settings = EffectSettings::default();
        assert!(effects_for(WeatherKind::NightCycle, &settings).is_empty());
        assert!(effects_for(WeatherKind::ClearSky, &settings).is_empty());
    }

    #[test]
    fn rain_intensity_scales_particles_and_volume() {
        let settings = EffectSettings::default();
        let light = effects_for(WeatherKind::LightRain, &settings);
        let heavy = effects_for(WeatherKind::HeavyRain, &settings);
        let drizzle = effects_for(WeatherKind::Drizzle, &settings);
        let particles_of = |effects: &[EffectDescriptor]| {
            effects
                .iter()
                .find(|d| matches!(d.kind, EffectKind::Particles { .. }))
                .map(|d| d.scaled_count(20))
        };
        assert_eq!(particles_of(&light), Some(5));
        assert_eq!(particles_of(&heavy), Some(20));
        assert_eq!(particles_of(&drizzle), Some(3));
    }

    #[test]
    fn blizzard_covers_ground_and_hurts() {
        let settings = EffectSettings {
            frostbite_interval_ticks: 40,
            heat_interval_ticks: 80,
        };
        let effects = effects_for(WeatherKind::Blizzard, &settings);
        assert_eq!(
            count(&effects, |k| matches!(k, EffectKind::BlockTransform { .. })),
            1
        );
        let damage = effects
            .iter()
            .find(|d| matches!(d.kind, EffectKind::Damage { .. }))
            .map(|d| d.interval_ticks);
        assert_eq!(damage, Some(40));
    }

    #[test]
    fn heat_cadence_follows_settings() {
        let settings = EffectSettings {
            frostbite_interval_ticks: 100,
            heat_interval_ticks: 33,
        };
        let effects = effects_for(WeatherKind::Heatstroke, &settings);
        assert_eq!(effects.len(), 2);
        assert!(effects.iter().all(|d| d.interval_ticks == 33));
    }

    #[test]
    fn tornado_gusts_and_sometimes_hurts() {
        let effects = effects_for(WeatherKind::Tornado, &EffectSettings::default());
        assert_eq!(count(&effects, |k| matches!(k, EffectKind::Gust { .. })), 1);
        assert!(effects.iter().any(|d| matches!(
            d.kind,
            EffectKind::Damage { chance, .. } if (chance - 0.2).abs() < f64::EPSILON
        )));
    }

    #[test]
    fn every_dangerous_kind_does_something() {
        let settings = EffectSettings::default();
        for kind in WeatherKind::dangerous_kinds() {
            assert!(
                !effects_for(kind, &settings).is_empty(),
                "{kind} has no effects"
            );
        }
    }
}
