//! World configuration.
//!
//! One serde struct carries every tunable: world size and seed, noise and
//! biome thresholds, structure densities, spawning, combat, progression, loot
//! and the camera window. Files may be RON or JSON; missing fields fall back
//! to defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::combat::CombatSettings;
use crate::constants::{MAX_WORLD_EDGE, MIN_WORLD_EDGE};
use crate::entity::ProgressionSettings;
use crate::error::{ConfigLoadError, GenerationError};
use crate::generation::biome::BiomeThresholds;
use crate::generation::noise_field::NoiseSettings;
use crate::generation::structures::StructureSettings;
use crate::loot::LootSettings;
use crate::simulation::population::SpawnSettings;
use crate::simulation::snapshot::ViewSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    /// Fixed simulation rate used when the host does not supply a frame time.
    pub tick_rate: u32,
    pub noise: NoiseSettings,
    pub biomes: BiomeThresholds,
    pub structures: StructureSettings,
    pub spawning: SpawnSettings,
    pub combat: CombatSettings,
    pub progression: ProgressionSettings,
    pub loot: LootSettings,
    pub view: ViewSettings,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            width: 100,
            height: 100,
            tick_rate: 60,
            noise: NoiseSettings::default(),
            biomes: BiomeThresholds::default(),
            structures: StructureSettings::default(),
            spawning: SpawnSettings::default(),
            combat: CombatSettings::default(),
            progression: ProgressionSettings::default(),
            loot: LootSettings::default(),
            view: ViewSettings::default(),
        }
    }
}

impl WorldConfig {
    /// Checks every section. Called before any tile is generated.
    pub fn validate(&self) -> Result<(), GenerationError> {
        for (field, edge) in [("width", self.width), ("height", self.height)] {
            if !(MIN_WORLD_EDGE..=MAX_WORLD_EDGE).contains(&edge) {
                return Err(GenerationError::invalid(
                    field,
                    format!("must be within {MIN_WORLD_EDGE}..={MAX_WORLD_EDGE}, got {edge}"),
                ));
            }
        }
        if self.tick_rate == 0 {
            return Err(GenerationError::invalid("tick_rate", "must be at least 1"));
        }
        self.noise.validate()?;
        self.biomes.validate()?;
        self.structures.validate()?;
        self.spawning.validate()?;
        self.combat.validate()?;
        self.progression.validate()?;
        self.loot.validate()?;
        Ok(())
    }

    pub fn tick_seconds(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }

    pub fn from_ron_str(text: &str) -> Result<Self, ConfigLoadError> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigLoadError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads by extension: `.json` is JSON, anything else is RON.
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_ron_str(&text),
        }
    }

    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loot::ItemRarity;

    #[test]
    fn test_default_is_valid() {
        assert!(WorldConfig::default().validate().is_ok());
    }

    #[test]
    fn test_world_too_small() {
        let config = WorldConfig {
            width: 2,
            ..Default::default()
        };
        match config.validate() {
            Err(GenerationError::InvalidConfiguration { field, .. }) => assert_eq!(field, "width"),
            other => panic!("expected width error, got {other:?}"),
        }
    }

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let config = WorldConfig::from_ron_str(
            "(seed: 7, width: 64, loot: (rarity_weights: (common: 70.0, rare: 5.0)))",
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.width, 64);
        assert_eq!(config.height, 100);
        let p = config.loot.rarity_weights.probability(ItemRarity::Rare);
        assert!((p - 0.05).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_ron_threshold_rejected() {
        let err = WorldConfig::from_ron_str("(biomes: (water_level: 0.9, forest_level: 0.1))")
            .unwrap_err();
        assert!(matches!(err, ConfigLoadError::Invalid(_)));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(
            WorldConfig::from_json_str("{ seed: }"),
            Err(ConfigLoadError::Json(_))
        ));
    }

    #[test]
    fn test_ron_roundtrip() {
        let config = WorldConfig {
            seed: 99,
            ..Default::default()
        };
        let text = config.to_ron_string().unwrap();
        assert_eq!(WorldConfig::from_ron_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("world.json");
        std::fs::write(&path, r#"{"seed": 5, "width": 32, "height": 32}"#).unwrap();
        let config = WorldConfig::load(&path).unwrap();
        assert_eq!(config.seed, 5);

        let missing = WorldConfig::load(&dir.path().join("missing.ron"));
        assert!(matches!(missing, Err(ConfigLoadError::Io { .. })));
    }

    #[test]
    fn test_tick_seconds() {
        let config = WorldConfig {
            tick_rate: 20,
            ..Default::default()
        };
        assert!((config.tick_seconds() - 0.05).abs() < 1e-6);
    }
}
