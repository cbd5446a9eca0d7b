//! The fixed weather taxonomy.
//!
//! Every weather kind carries four immutable attributes: a stable
//! snake-case id (used for persistence and commands), a category, whether
//! it produces precipitation, and whether it is considered dangerous.
//!
//! [`WeatherKind::NightCycle`] is a reserved sentinel owned by the
//! night-cycle coordinator. It is never produced by a random roll and
//! never appears in a season pool.

use serde::{Deserialize, Serialize};

/// Broad grouping of weather kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCategory {
    /// Rain, snow, hail and other falling water.
    Precipitation,
    /// Heat and cold events.
    Temperature,
    /// Breezes through hurricanes.
    Wind,
    /// Thunder, lightning and glow phenomena.
    Electrical,
    /// Fog, mist, smoke and haze.
    Visibility,
    /// Rainbows, halos and other light phenomena.
    Optical,
    /// Cloud cover.
    SkyCondition,
    /// Rare catastrophic events.
    Extreme,
    /// Internal sentinels.
    Special,
}

/// Declares [`WeatherKind`] together with its attribute table.
macro_rules! weather_kinds {
    (
        $(
            $(#[$meta:meta])*
            $variant:ident => ($id:literal, $category:ident, $precipitation:literal, $dangerous:literal),
        )*
    ) => {
        /// A weather condition a world can be in.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum WeatherKind {
            $(
                $(#[$meta])*
                $variant,
            )*
        }

        impl WeatherKind {
            /// Every weather kind, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)*];

            /// Stable snake-case identifier.
            pub const fn id(self) -> &'static str {
                match self {
                    $(Self::$variant => $id,)*
                }
            }

            /// Category this kind belongs to.
            pub const fn category(self) -> WeatherCategory {
                match self {
                    $(Self::$variant => WeatherCategory::$category,)*
                }
            }

            /// Whether this kind produces precipitation.
            pub const fn has_precipitation(self) -> bool {
                match self {
                    $(Self::$variant => $precipitation,)*
                }
            }

            /// Whether this kind is considered dangerous.
            pub const fn is_dangerous(self) -> bool {
                match self {
                    $(Self::$variant => $dangerous,)*
                }
            }
        }
    };
}

weather_kinds! {
    /// Light rain.
    LightRain => ("light_rain", Precipitation, true, false),
    /// Moderate rain.
    ModerateRain => ("moderate_rain", Precipitation, true, false),
    /// Heavy rain.
    HeavyRain => ("heavy_rain", Precipitation, true, false),
    /// Drizzle.
    Drizzle => ("drizzle", Precipitation, true, false),
    /// Short rain shower.
    Shower => ("shower", Precipitation, true, false),
    /// Rain that freezes on contact.
    FreezingRain => ("freezing_rain", Precipitation, true, true),
    /// Small hail.
    SmallHail => ("small_hail", Precipitation, true, false),
    /// Medium hail.
    MediumHail => ("medium_hail", Precipitation, true, false),
    /// Large hail.
    LargeHail => ("large_hail", Precipitation, true, true),
    /// Light snow.
    LightSnow => ("light_snow", Precipitation, true, false),
    /// Moderate snow.
    ModerateSnow => ("moderate_snow", Precipitation, true, false),
    /// Heavy snow.
    HeavySnow => ("heavy_snow", Precipitation, true, true),
    /// Sleet.
    Sleet => ("sleet", Precipitation, true, false),
    /// Blizzard.
    Blizzard => ("blizzard", Precipitation, true, true),
    /// Slush.
    Slush => ("slush", Precipitation, true, false),
    /// Ground frost.
    Frost => ("frost", Precipitation, false, false),
    /// Rain carrying mud.
    MudRain => ("mud_rain", Precipitation, true, false),
    /// Rain carrying sand.
    SandRain => ("sand_rain", Precipitation, true, false),

    /// Heat wave.
    HeatWave => ("heat_wave", Temperature, false, true),
    /// Cold wave.
    ColdWave => ("cold_wave", Temperature, false, true),
    /// Sudden frost.
    FrostEvent => ("frost_event", Temperature, false, false),
    /// Thaw.
    Thaw => ("thaw", Temperature, false, false),
    /// Extreme heat.
    Heatstroke => ("heatstroke", Temperature, false, true),

    /// Light breeze.
    LightBreeze => ("light_breeze", Wind, false, false),
    /// Moderate wind.
    ModerateWind => ("moderate_wind", Wind, false, false),
    /// Strong wind.
    StrongWind => ("strong_wind", Wind, false, false),
    /// Gusts.
    Gust => ("gust", Wind, false, false),
    /// Storm.
    Storm => ("storm", Wind, false, true),
    /// Hurricane.
    Hurricane => ("hurricane", Wind, false, true),
    /// Tornado.
    Tornado => ("tornado", Wind, false, true),
    /// Waterspout.
    Waterspout => ("waterspout", Wind, false, true),
    /// Sand storm.
    SandStorm => ("sand_storm", Wind, false, true),
    /// Dust storm.
    DustStorm => ("dust_storm", Wind, false, true),
    /// Single violent blast of wind.
    WindBlast => ("wind_blast", Wind, false, false),
    /// Warm dry downslope wind.
    Chinook => ("chinook", Wind, false, false),
    /// Monsoon.
    Monsoon => ("monsoon", Wind, true, true),

    /// Thunderstorm.
    Thunderstorm => ("thunderstorm", Electrical, true, true),
    /// Lightning without rain.
    Lightning => ("lightning", Electrical, false, true),
    /// Distant thunder.
    Thunder => ("thunder", Electrical, false, false),
    /// St. Elmo's fire.
    StElmoFire => ("st_elmo_fire", Electrical, false, false),
    /// Aurora.
    Aurora => ("aurora", Electrical, false, false),

    /// Fog.
    Fog => ("fog", Visibility, false, false),
    /// Mist.
    Mist => ("mist", Visibility, false, false),
    /// Smog.
    Smog => ("smog", Visibility, false, false),
    /// Sea mist.
    SeaMist => ("sea_mist", Visibility, false, false),
    /// Freezing fog.
    FreezingFog => ("freezing_fog", Visibility, false, false),
    /// Smoke.
    Smoke => ("smoke", Visibility, false, false),
    /// Dust haze.
    DustHaze => ("dust_haze", Visibility, false, false),
    /// Volcanic ash.
    VolcanicAsh => ("volcanic_ash", Visibility, false, true),

    /// Rainbow.
    Rainbow => ("rainbow", Optical, false, false),
    /// Moonbow.
    Moonbow => ("moonbow", Optical, false, false),
    /// Halo.
    Halo => ("halo", Optical, false, false),
    /// Sundog.
    Sundog => ("sundog", Optical, false, false),
    /// Light pillar.
    LightPillar => ("light_pillar", Optical, false, false),
    /// Corona.
    Corona => ("corona", Optical, false, false),
    /// Crepuscular rays.
    CrepuscularRay => ("crepuscular_ray", Optical, false, false),
    /// Green flash.
    GreenFlash => ("green_flash", Optical, false, false),

    /// Clear sky.
    ClearSky => ("clear_sky", SkyCondition, false, false),
    /// Partly cloudy.
    PartlyCloudy => ("partly_cloudy", SkyCondition, false, false),
    /// Cloudy.
    Cloudy => ("cloudy", SkyCondition, false, false),
    /// Overcast.
    Overcast => ("overcast", SkyCondition, false, false),
    /// Threatening sky.
    ThreateningSky => ("threatening_sky", SkyCondition, false, false),

    /// Tropical cyclone.
    TropicalCyclone => ("tropical_cyclone", Extreme, true, true),
    /// Firestorm.
    Firestorm => ("firestorm", Extreme, false, true),
    /// Storm surge.
    StormSurge => ("storm_surge", Extreme, true, true),
    /// Avalanche.
    Avalanche => ("avalanche", Extreme, false, true),
    /// Flash flood.
    FlashFlood => ("flash_flood", Extreme, true, true),
    /// Acid rain.
    AcidRain => ("acid_rain", Extreme, true, true),
    /// Ice fog.
    IceFog => ("ice_fog", Extreme, false, true),
    /// Colored snow.
    ColoredSnow => ("colored_snow", Extreme, true, false),

    /// Night suspension sentinel.
    NightCycle => ("night_cycle", Special, false, false),
}

impl WeatherKind {
    /// Look up a weather kind by id, ignoring ASCII case.
    ///
    /// Unknown ids return `None`; they are never mapped to a default.
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.id().eq_ignore_ascii_case(id))
    }

    /// Whether a random roll or a season pool may produce this kind.
    pub const fn is_selectable(self) -> bool {
        !matches!(self, Self::NightCycle)
    }

    /// Whether this kind makes the host world thunder.
    pub const fn is_thundering(self) -> bool {
        matches!(self, Self::Thunderstorm | Self::Lightning | Self::Thunder)
    }

    /// All kinds in `category`.
    pub fn by_category(category: WeatherCategory) -> Vec<Self> {
        Self::ALL
            .iter()
            .copied()
            .filter(|kind| kind.category() == category)
            .collect()
    }

    /// All kinds that produce precipitation.
    pub fn precipitation_kinds() -> Vec<Self> {
        Self::ALL
            .iter()
            .copied()
            .filter(|kind| kind.has_precipitation())
            .collect()
    }

    /// All kinds considered dangerous.
    pub fn dangerous_kinds() -> Vec<Self> {
        Self::ALL
            .iter()
            .copied()
            .filter(|kind| kind.is_dangerous())
            .collect()
    }
}

impl core::fmt::Display for WeatherKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.id())
    }
}
