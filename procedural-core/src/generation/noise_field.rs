//! Seeded fractal noise.
//!
//! A [`NoiseField`] wraps fBm over Perlin noise. Samples are pure functions of
//! `(x, y, seed, settings)` and are clamped to [-1, 1].

use noise::{Fbm, MultiFractal, NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

use crate::constants::CLIMATE_FREQUENCY_SCALE;
use crate::error::GenerationError;
use crate::world::TileCoord;

use super::WorldSeed;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseSettings {
    pub octaves: usize,
    /// Base frequency in cycles per tile.
    pub frequency: f64,
    pub persistence: f64,
    pub lacunarity: f64,
}

impl Default for NoiseSettings {
    fn default() -> Self {
        Self {
            octaves: 5,
            frequency: 1.0 / 32.0,
            persistence: 0.5,
            lacunarity: 2.0,
        }
    }
}

impl NoiseSettings {
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.octaves == 0 || self.octaves > Fbm::<Perlin>::MAX_OCTAVES {
            return Err(GenerationError::invalid(
                "noise.octaves",
                format!("must be within 1..={}", Fbm::<Perlin>::MAX_OCTAVES),
            ));
        }
        if !(self.frequency.is_finite() && self.frequency > 0.0) {
            return Err(GenerationError::invalid("noise.frequency", "must be positive"));
        }
        if !(self.persistence > 0.0 && self.persistence <= 1.0) {
            return Err(GenerationError::invalid(
                "noise.persistence",
                "must be within (0, 1]",
            ));
        }
        if !(self.lacunarity.is_finite() && self.lacunarity > 1.0) {
            return Err(GenerationError::invalid(
                "noise.lacunarity",
                "must be greater than 1",
            ));
        }
        Ok(())
    }

    /// Settings for the temperature channel.
    pub fn climate(&self) -> Self {
        Self {
            frequency: self.frequency * CLIMATE_FREQUENCY_SCALE,
            ..*self
        }
    }
}

pub struct NoiseField {
    fbm: Fbm<Perlin>,
}

impl NoiseField {
    pub fn new(seed: u64, settings: &NoiseSettings) -> Self {
        let fbm = Fbm::<Perlin>::new(fold_seed(seed))
            .set_octaves(settings.octaves)
            .set_frequency(settings.frequency)
            .set_persistence(settings.persistence)
            .set_lacunarity(settings.lacunarity);
        Self { fbm }
    }

    pub fn sample(&self, x: f64, y: f64) -> f64 {
        self.fbm.get([x, y]).clamp(-1.0, 1.0)
    }
}

/// One-off sample with default settings.
pub fn sample(x: f64, y: f64, seed: u64) -> f64 {
    NoiseField::new(seed, &NoiseSettings::default()).sample(x, y)
}

fn fold_seed(seed: u64) -> u32 {
    (seed ^ (seed >> 32)) as u32
}

/// Elevation and temperature for one tile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerrainSample {
    pub elevation: f64,
    pub temperature: f64,
}

/// The two independent noise channels used to classify terrain.
pub struct TerrainSampler {
    elevation: NoiseField,
    temperature: NoiseField,
}

impl TerrainSampler {
    pub fn new(seed: &WorldSeed, settings: &NoiseSettings) -> Self {
        Self {
            elevation: NoiseField::new(seed.derive("elevation"), settings),
            temperature: NoiseField::new(seed.derive("temperature"), &settings.climate()),
        }
    }

    /// Samples at the tile centre so integer lattice points (where Perlin is
    /// always zero) are avoided.
    pub fn sample(&self, coord: TileCoord) -> TerrainSample {
        let x = coord.x as f64 + 0.5;
        let y = coord.y as f64 + 0.5;
        TerrainSample {
            elevation: self.elevation.sample(x, y),
            temperature: self.temperature.sample(x, y),
        }
    }
}
