//! Biome classification from noise samples.
//!
//! Elevation picks the band (water, lowland, forest, highland); temperature
//! then turns hot lowland into desert and cold forest or highland into snow.
//! Classification is total: every pair of finite or non-finite inputs maps to
//! exactly one terrain biome.

use serde::{Deserialize, Serialize};

use crate::constants::{DESERT_TEMPERATURE, SNOW_TEMPERATURE};
use crate::error::GenerationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Biome {
    Grass,
    Forest,
    Water,
    Mountain,
    Desert,
    Snow,
    /// Sentinel for coordinates outside the world. Never produced by
    /// classification.
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiomeProperties {
    pub walkable: bool,
    pub movement_cost: f32,
}

impl Biome {
    /// The six biomes classification can produce.
    pub const TERRAIN: [Biome; 6] = [
        Biome::Grass,
        Biome::Forest,
        Biome::Water,
        Biome::Mountain,
        Biome::Desert,
        Biome::Snow,
    ];

    pub fn properties(self) -> BiomeProperties {
        let (walkable, movement_cost) = match self {
            Biome::Grass => (true, 1.0),
            Biome::Forest => (true, 1.5),
            Biome::Water => (false, f32::INFINITY),
            Biome::Mountain => (true, 2.0),
            Biome::Desert => (true, 1.2),
            Biome::Snow => (true, 1.3),
            Biome::Void => (false, f32::INFINITY),
        };
        BiomeProperties {
            walkable,
            movement_cost,
        }
    }

    pub fn is_walkable(self) -> bool {
        self.properties().walkable
    }

    pub fn movement_cost(self) -> f32 {
        self.properties().movement_cost
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Biome::Grass => "grass",
            Biome::Forest => "forest",
            Biome::Water => "water",
            Biome::Mountain => "mountain",
            Biome::Desert => "desert",
            Biome::Snow => "snow",
            Biome::Void => "void",
        }
    }
}

/// Elevation thresholds plus a global temperature shift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BiomeThresholds {
    /// Elevation below this is water.
    pub water_level: f64,
    /// Elevation at or above this is forest.
    pub forest_level: f64,
    /// Elevation at or above this is mountain.
    pub mountain_level: f64,
    /// Added to every temperature sample. Positive values make deserts more
    /// common and snow rarer.
    pub temperature_bias: f64,
}

impl Default for BiomeThresholds {
    fn default() -> Self {
        Self {
            water_level: -0.3,
            forest_level: 0.15,
            mountain_level: 0.45,
            temperature_bias: 0.0,
        }
    }
}

impl BiomeThresholds {
    pub fn validate(&self) -> Result<(), GenerationError> {
        let fields = [
            ("biomes.water_level", self.water_level),
            ("biomes.forest_level", self.forest_level),
            ("biomes.mountain_level", self.mountain_level),
            ("biomes.temperature_bias", self.temperature_bias),
        ];
        for (field, value) in fields {
            if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
                return Err(GenerationError::invalid(field, "must be within [-1, 1]"));
            }
        }
        if !(self.water_level < self.forest_level && self.forest_level < self.mountain_level) {
            return Err(GenerationError::invalid(
                "biomes",
                "thresholds must satisfy water_level < forest_level < mountain_level",
            ));
        }
        Ok(())
    }
}

/// Validated classifier. Construction fails on inconsistent thresholds so
/// classification itself can never fail.
#[derive(Debug, Clone, Copy)]
pub struct BiomeClassifier {
    thresholds: BiomeThresholds,
}

impl BiomeClassifier {
    pub fn new(thresholds: BiomeThresholds) -> Result<Self, GenerationError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn thresholds(&self) -> &BiomeThresholds {
        &self.thresholds
    }

    /// `noise_value` is the elevation sample, `climate_value` the temperature
    /// sample. Both are nominally in [-1, 1].
    pub fn classify(&self, noise_value: f64, climate_value: f64) -> Biome {
        let t = &self.thresholds;
        let temperature = climate_value + t.temperature_bias;
        let hot = temperature > DESERT_TEMPERATURE;
        let cold = temperature < SNOW_TEMPERATURE;

        if noise_value < t.water_level {
            Biome::Water
        } else if noise_value < t.forest_level {
            if hot {
                Biome::Desert
            } else {
                Biome::Grass
            }
        } else if noise_value < t.mountain_level {
            if cold {
                Biome::Snow
            } else {
                Biome::Forest
            }
        } else if cold {
            Biome::Snow
        } else {
            Biome::Mountain
        }
    }
}
