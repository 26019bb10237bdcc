//! Structure placement by rejection sampling.
//!
//! For each structure kind the placer draws a footprint size and origin,
//! rejects candidates that touch a disallowed biome or come within the buffer
//! margin of an accepted footprint, and stops when the requested count is met
//! or the attempt budget runs out. A shortfall is reported, never fatal.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::DENSITY_AREA;
use crate::error::{GenerationBudgetExceeded, GenerationError};
use crate::world::{TileCoord, TileRect, WorldGrid};

use super::biome::Biome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StructureKind {
    Ruin,
    Tower,
    Cave,
}

impl StructureKind {
    pub const ALL: [StructureKind; 3] = [StructureKind::Ruin, StructureKind::Tower, StructureKind::Cave];

    /// Inclusive side-length range of the footprint, in tiles.
    pub fn footprint_range(self) -> (u32, u32) {
        match self {
            StructureKind::Ruin => (3, 5),
            StructureKind::Tower => (2, 3),
            StructureKind::Cave => (2, 4),
        }
    }

    pub fn allowed_biomes(self) -> &'static [Biome] {
        match self {
            StructureKind::Ruin => &[Biome::Grass, Biome::Desert],
            StructureKind::Tower => &[Biome::Grass, Biome::Forest, Biome::Mountain],
            StructureKind::Cave => &[Biome::Mountain, Biome::Forest, Biome::Snow],
        }
    }

    pub fn allows(self, biome: Biome) -> bool {
        self.allowed_biomes().contains(&biome)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StructureKind::Ruin => "ruin",
            StructureKind::Tower => "tower",
            StructureKind::Cave => "cave",
        }
    }
}

/// A placed structure. Footprints of two structures never overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Structure {
    pub id: u32,
    pub kind: StructureKind,
    pub footprint: TileRect,
    /// Per-structure seed used to derive nearby loot.
    pub seed_offset: u64,
}

impl Structure {
    pub fn origin(&self) -> TileCoord {
        TileCoord::new(self.footprint.x, self.footprint.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureSettings {
    /// Structures per 10,000 tiles.
    pub ruin_density: f32,
    pub tower_density: f32,
    pub cave_density: f32,
    /// Minimum free tiles between two footprints.
    pub buffer_margin: u32,
    /// Placement attempts per structure kind.
    pub attempt_budget: u32,
}

impl Default for StructureSettings {
    fn default() -> Self {
        Self {
            ruin_density: 4.0,
            tower_density: 2.0,
            cave_density: 3.0,
            buffer_margin: 2,
            attempt_budget: 400,
        }
    }
}

impl StructureSettings {
    pub fn density(&self, kind: StructureKind) -> f32 {
        match kind {
            StructureKind::Ruin => self.ruin_density,
            StructureKind::Tower => self.tower_density,
            StructureKind::Cave => self.cave_density,
        }
    }

    pub fn target_count(&self, kind: StructureKind, area: u64) -> u32 {
        (self.density(kind) * area as f32 / DENSITY_AREA).round() as u32
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        for kind in StructureKind::ALL {
            let density = self.density(kind);
            if !density.is_finite() || density < 0.0 {
                return Err(GenerationError::invalid(
                    format!("structures.{}_density", kind.as_str()),
                    "must be a non-negative number",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlacementOutcome {
    pub structures: Vec<Structure>,
    pub shortfalls: Vec<GenerationBudgetExceeded>,
}

pub struct StructurePlacer {
    settings: StructureSettings,
}

impl StructurePlacer {
    pub fn new(settings: StructureSettings) -> Self {
        Self { settings }
    }

    pub fn place(&self, grid: &WorldGrid, seed: u64) -> PlacementOutcome {
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        let mut outcome = PlacementOutcome::default();
        let area = grid.bounds().area();

        for kind in StructureKind::ALL {
            let requested = self.settings.target_count(kind, area);
            if requested == 0 {
                continue;
            }
            let (min_side, max_side) = kind.footprint_range();
            let mut placed = 0;
            let mut attempts = 0;

            while placed < requested && attempts < self.settings.attempt_budget {
                attempts += 1;
                let width = rng.gen_range(min_side..=max_side);
                let height = rng.gen_range(min_side..=max_side);
                if width > grid.width() || height > grid.height() {
                    continue;
                }
                let x = rng.gen_range(0..=grid.width() - width) as i32;
                let y = rng.gen_range(0..=grid.height() - height) as i32;
                let candidate = TileRect::new(x, y, width, height);

                if !fits_terrain(grid, kind, &candidate) {
                    continue;
                }
                let padded = candidate.expanded(self.settings.buffer_margin);
                if outcome
                    .structures
                    .iter()
                    .any(|existing| existing.footprint.intersects(&padded))
                {
                    continue;
                }

                outcome.structures.push(Structure {
                    id: outcome.structures.len() as u32,
                    kind,
                    footprint: candidate,
                    seed_offset: rng.gen(),
                });
                placed += 1;
            }

            if placed < requested {
                let shortfall = GenerationBudgetExceeded {
                    kind,
                    requested,
                    placed,
                    attempts,
                };
                warn!(%shortfall, "structure budget exhausted");
                outcome.shortfalls.push(shortfall);
            }
        }

        outcome
    }
}

fn fits_terrain(grid: &WorldGrid, kind: StructureKind, footprint: &TileRect) -> bool {
    footprint
        .coords()
        .all(|coord| kind.allows(grid.tile_at(coord.x, coord.y).biome))
}
