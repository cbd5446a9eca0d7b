//! The four-season cycle.
//!
//! Seasons advance in a fixed cyclic order. Each season owns a default pool
//! of thirteen weather kinds from which seasonal rolls are drawn.

use serde::{Deserialize, Serialize};

use crate::weather::WeatherKind;

/// A season of the year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonKind {
    /// Mild and wet.
    Spring,
    /// Hot, with violent storms.
    Summer,
    /// Windy, grey and cooling.
    Autumn,
    /// Snow and frost.
    Winter,
}

impl SeasonKind {
    /// Every season in cycle order.
    pub const ALL: [Self; 4] = [Self::Spring, Self::Summer, Self::Autumn, Self::Winter];

    /// Stable lowercase identifier.
    pub const fn id(self) -> &'static str {
        match self {
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Autumn => "autumn",
            Self::Winter => "winter",
        }
    }

    /// Human-readable name.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Spring => "Spring",
            Self::Summer => "Summer",
            Self::Autumn => "Autumn",
            Self::Winter => "Winter",
        }
    }

    /// Position in the cycle, starting at 0 for spring.
    pub const fn order(self) -> u8 {
        match self {
            Self::Spring => 0,
            Self::Summer => 1,
            Self::Autumn => 2,
            Self::Winter => 3,
        }
    }

    /// Season at `order`; anything out of range is spring.
    pub const fn from_order(order: u8) -> Self {
        match order {
            1 => Self::Summer,
            2 => Self::Autumn,
            3 => Self::Winter,
            _ => Self::Spring,
        }
    }

    /// The following season, wrapping winter to spring.
    pub const fn next(self) -> Self {
        match self {
            Self::Spring => Self::Summer,
            Self::Summer => Self::Autumn,
            Self::Autumn => Self::Winter,
            Self::Winter => Self::Spring,
        }
    }

    /// The preceding season, wrapping spring to winter.
    pub const fn previous(self) -> Self {
        match self {
            Self::Spring => Self::Winter,
            Self::Summer => Self::Spring,
            Self::Autumn => Self::Summer,
            Self::Winter => Self::Autumn,
        }
    }

    /// Look up a season by id, ignoring ASCII case. `fall` is accepted for autumn.
    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        if id.eq_ignore_ascii_case("fall") {
            return Some(Self::Autumn);
        }
        Self::ALL
            .into_iter()
            .find(|season| season.id().eq_ignore_ascii_case(id))
    }

    /// The weather kinds commonly seen in this season.
    pub const fn default_pool(self) -> &'static [WeatherKind] {
        use WeatherKind as W;
        match self {
            Self::Spring => &[
                W::LightRain,
                W::ModerateRain,
                W::Drizzle,
                W::Shower,
                W::LightBreeze,
                W::ModerateWind,
                W::Rainbow,
                W::ClearSky,
                W::PartlyCloudy,
                W::Cloudy,
                W::Fog,
                W::Mist,
                W::Thunderstorm,
            ],
            Self::Summer => &[
                W::ClearSky,
                W::PartlyCloudy,
                W::HeatWave,
                W::Heatstroke,
                W::Thunderstorm,
                W::Lightning,
                W::HeavyRain,
                W::Shower,
                W::LightBreeze,
                W::Monsoon,
                W::Rainbow,
                W::Tornado,
                W::Hurricane,
            ],
            Self::Autumn => &[
                W::ModerateRain,
                W::HeavyRain,
                W::Drizzle,
                W::LightSnow,
                W::Frost,
                W::ModerateWind,
                W::StrongWind,
                W::Gust,
                W::Fog,
                W::Cloudy,
                W::Overcast,
                W::ThreateningSky,
                W::ModerateSnow,
            ],
            Self::Winter => &[
                W::LightSnow,
                W::ModerateSnow,
                W::HeavySnow,
                W::Blizzard,
                W::Sleet,
                W::FreezingRain,
                W::Frost,
                W::ColdWave,
                W::FreezingFog,
                W::StrongWind,
                W::Overcast,
                W::ClearSky,
                W::IceFog,
            ],
        }
    }
}

impl core::fmt::Display for SeasonKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.display_name())
    }
}
