//! World generation pipeline.
//!
//! `seed + config -> noise -> biomes -> structures -> ground loot`. Every stage
//! draws its randomness from a sub-seed derived from the world seed, so the
//! same inputs always produce the same world regardless of thread count.

pub mod biome;
pub mod noise_field;
pub mod structures;

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use tracing::{debug, info};

use crate::config::WorldConfig;
use crate::error::{GenerationBudgetExceeded, GenerationError};
use crate::logging::PhaseTimer;
use crate::loot;
use crate::world::{Tile, TileCoord, WorldGrid};

use self::biome::{Biome, BiomeClassifier};
use self::noise_field::TerrainSampler;
use self::structures::StructurePlacer;

/// Root of all procedural randomness for one world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSeed {
    pub seed: u64,
}

impl Default for WorldSeed {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

impl WorldSeed {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Deterministic sub-seed for a named generation stage.
    pub fn derive(&self, label: &str) -> u64 {
        let mut hasher = Sha3_256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(label.as_bytes());
        first_u64(&hasher.finalize())
    }

    /// Sub-seed for the `index`th draw of a stage (item ids, spawn waves).
    pub fn derive_indexed(&self, label: &str, index: u64) -> u64 {
        let mut hasher = Sha3_256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(label.as_bytes());
        hasher.update(index.to_le_bytes());
        first_u64(&hasher.finalize())
    }
}

fn first_u64(digest: &[u8]) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Summary of one generation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationReport {
    pub seed: u64,
    pub width: u32,
    pub height: u32,
    pub biome_counts: BTreeMap<Biome, usize>,
    pub structures_placed: usize,
    pub structure_shortfalls: Vec<ShortfallEntry>,
    pub ground_items: usize,
}

/// Serializable mirror of [`GenerationBudgetExceeded`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortfallEntry {
    pub kind: structures::StructureKind,
    pub requested: u32,
    pub placed: u32,
    pub attempts: u32,
}

impl From<&GenerationBudgetExceeded> for ShortfallEntry {
    fn from(err: &GenerationBudgetExceeded) -> Self {
        Self {
            kind: err.kind,
            requested: err.requested,
            placed: err.placed,
            attempts: err.attempts,
        }
    }
}

impl GenerationReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

pub struct GeneratedWorld {
    pub grid: WorldGrid,
    pub report: GenerationReport,
}

/// Runs the full pipeline. Fails only on invalid configuration.
pub fn generate_world(config: &WorldConfig) -> Result<GeneratedWorld, GenerationError> {
    config.validate()?;
    let _timer = PhaseTimer::start("generate_world");

    let seed = WorldSeed::new(config.seed);
    let classifier = BiomeClassifier::new(config.biomes)?;
    let sampler = TerrainSampler::new(&seed, &config.noise);

    let tiles = generate_tiles(config.width, config.height, &sampler, &classifier);
    let mut grid = WorldGrid::from_tiles(config.width, config.height, tiles);
    debug!(width = config.width, height = config.height, "terrain classified");

    let placement = StructurePlacer::new(config.structures).place(&grid, seed.derive("structures"));
    let shortfalls = placement.shortfalls.iter().map(ShortfallEntry::from).collect();
    grid.set_structures(placement.structures);

    let ground_items = loot::scatter_items(&mut grid, &config.loot, &seed);

    let report = GenerationReport {
        seed: config.seed,
        width: config.width,
        height: config.height,
        biome_counts: grid.biome_counts(),
        structures_placed: grid.structures().len(),
        structure_shortfalls: shortfalls,
        ground_items,
    };
    info!(
        seed = config.seed,
        structures = report.structures_placed,
        shortfalls = report.structure_shortfalls.len(),
        ground_items,
        "world generated"
    );

    Ok(GeneratedWorld { grid, report })
}

/// Classifies every tile. Rows are sampled in parallel; the result is
/// row-major and identical to a sequential pass.
pub fn generate_tiles(
    width: u32,
    height: u32,
    sampler: &TerrainSampler,
    classifier: &BiomeClassifier,
) -> Vec<Tile> {
    let mut tiles = vec![Tile::void(TileCoord::new(0, 0)); width as usize * height as usize];
    if width == 0 {
        return tiles;
    }
    tiles
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, tile) in row.iter_mut().enumerate() {
                *tile = sample_tile(TileCoord::new(x as i32, y as i32), sampler, classifier);
            }
        });
    tiles
}

pub fn sample_tile(coord: TileCoord, sampler: &TerrainSampler, classifier: &BiomeClassifier) -> Tile {
    let sample = sampler.sample(coord);
    Tile::from_biome(coord, classifier.classify(sample.elevation, sample.temperature))
}
