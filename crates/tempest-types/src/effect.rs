//! Data-driven effect descriptors.
//!
//! Each weather kind maps to a list of [`EffectDescriptor`]s. A descriptor
//! is pure data: what to do ([`EffectKind`]), how often (`interval_ticks`),
//! and how strongly (`intensity`). One generic job runner interprets them,
//! so adding an effect never means adding a new job type.
//!
//! Intensity scales the magnitude of visual and physical output (particle
//! counts, sound volume, gust strength, block transform attempts). Status
//! amplifiers and damage amounts are absolute.

use serde::{Deserialize, Serialize};

/// A continuous position inside a world.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    /// East-west coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
    /// North-south coordinate.
    pub z: f64,
}

impl Position {
    /// Create a position.
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// This position moved by the given deltas.
    pub const fn offset(self, dx: f64, dy: f64, dz: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z + dz,
        }
    }

    /// The block column containing this position.
    ///
    /// Coordinates outside the `i32` range saturate.
    pub fn block(self) -> BlockPos {
        #[allow(clippy::cast_possible_truncation)]
        let floor = |v: f64| v.floor() as i32;
        BlockPos {
            x: floor(self.x),
            y: floor(self.y),
            z: floor(self.z),
        }
    }
}

/// An integer block coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    /// East-west coordinate.
    pub x: i32,
    /// Vertical coordinate.
    pub y: i32,
    /// North-south coordinate.
    pub z: i32,
}

impl BlockPos {
    /// Create a block position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

/// Visual particle families the host knows how to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleKind {
    /// Falling water drops.
    RainDrop,
    /// Falling snowflakes.
    Snowflake,
    /// Bouncing ice pellets.
    Hailstone,
    /// Low drifting cloud.
    Cloud,
    /// Grey ash or dust.
    Ash,
    /// Dark smoke.
    Smoke,
    /// Electrical sparks.
    Spark,
    /// Rising embers.
    Ember,
    /// Coloured glitter for optical phenomena.
    Glow,
}

/// Ambient sounds the host can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundKind {
    /// Rain on leaves and roofs.
    Rain,
    /// Thunder clap.
    Thunder,
    /// Howling wind.
    Wind,
}

/// Status conditions applied to exposed entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    /// Drains food faster.
    Hunger,
    /// Slows movement.
    Slowness,
    /// Reduces dealt damage.
    Weakness,
    /// Limits sight range.
    Blindness,
}

/// A single particle emission request handed to the host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParticleBurst {
    /// Particle family.
    pub particle: ParticleKind,
    /// Centre of the emission volume.
    pub origin: Position,
    /// Number of particles.
    pub count: u32,
    /// Horizontal half-width of the emission volume.
    pub spread: f64,
    /// Vertical extent of the emission volume.
    pub height: f64,
    /// Initial particle speed.
    pub speed: f64,
}

/// What an effect does each time it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectKind {
    /// Emit particles around every present entity.
    Particles {
        /// Particle family.
        particle: ParticleKind,
        /// Particles per entity at full intensity.
        count: u32,
        /// Horizontal half-width around the entity.
        spread: f64,
        /// Height above the entity.
        height: f64,
        /// Initial particle speed.
        speed: f64,
    },
    /// Play a sound to every present entity.
    Sound {
        /// Sound to play.
        sound: SoundKind,
        /// Volume at full intensity.
        volume: f64,
        /// Pitch multiplier.
        pitch: f64,
        /// Probability in `[0, 1]` that a run plays anything.
        chance: f64,
    },
    /// Apply a status condition.
    Status {
        /// Condition to apply.
        status: StatusKind,
        /// Status level, 0 being the weakest.
        amplifier: u8,
        /// How long the condition lasts, in ticks.
        duration_ticks: u32,
        /// Only affect entities under open sky.
        exposed_only: bool,
    },
    /// Deal damage.
    Damage {
        /// Hit points removed per hit.
        amount: f64,
        /// Probability in `[0, 1]` that an entity is hit on a run.
        chance: f64,
        /// Only affect entities under open sky.
        exposed_only: bool,
    },
    /// Shove entities in a random horizontal direction.
    Gust {
        /// Push velocity at full intensity.
        strength: f64,
        /// Only affect entities under open sky.
        exposed_only: bool,
    },
    /// Replace surface blocks near entities, reverting them when the effect ends.
    BlockTransform {
        /// Horizontal radius around each entity.
        radius: u32,
        /// Material that may be replaced.
        from: String,
        /// Replacement material.
        to: String,
        /// Columns sampled per entity at full intensity.
        attempts: u32,
    },
}

/// One recurring effect of a weather kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectDescriptor {
    /// What the effect does.
    pub kind: EffectKind,
    /// Ticks between runs. Always at least 1.
    pub interval_ticks: u32,
    /// Strength scalar in `[0, 1]`.
    pub intensity: f64,
}

impl EffectDescriptor {
    /// Create a descriptor, clamping intensity to `[0, 1]` and the interval to at least one tick.
    pub fn new(kind: EffectKind, interval_ticks: u32, intensity: f64) -> Self {
        let intensity = if intensity.is_nan() {
            0.0
        } else {
            intensity.clamp(0.0, 1.0)
        };
        Self {
            kind,
            interval_ticks: interval_ticks.max(1),
            intensity,
        }
    }

    /// Scale a full-intensity count by this descriptor's intensity.
    ///
    /// Never rounds a non-zero count down to zero unless intensity is zero.
    pub fn scaled_count(&self, count: u32) -> u32 {
        if count == 0 || self.intensity <= 0.0 {
            return 0;
        }
        let scaled = (f64::from(count) * self.intensity).round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let scaled = scaled as u32;
        scaled.max(1)
    }

    /// Scale a full-intensity magnitude by this descriptor's intensity.
    pub const fn scaled(&self, value: f64) -> f64 {
        value * self.intensity
    }
}
