//! Regional enemy population control.
//!
//! The world is divided into square regions. Every spawn interval, regions
//! around the player are topped up toward a target count, subject to a global
//! cap, using walkable tiles that are far enough from the player.

use bevy::math::Vec2;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use serde::{Deserialize, Serialize};

use crate::constants::PATROL_WAYPOINTS;
use crate::entity::EnemyArchetype;
use crate::error::GenerationError;
use crate::world::{TileCoord, TileRect, WorldGrid};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchetypeWeights {
    pub basic: f32,
    pub goblin: f32,
    pub orc: f32,
    pub skeleton: f32,
}

impl Default for ArchetypeWeights {
    fn default() -> Self {
        Self {
            basic: 1.0,
            goblin: 1.0,
            orc: 1.0,
            skeleton: 1.0,
        }
    }
}

impl ArchetypeWeights {
    pub fn weight(&self, archetype: EnemyArchetype) -> f32 {
        match archetype {
            EnemyArchetype::Basic => self.basic,
            EnemyArchetype::Goblin => self.goblin,
            EnemyArchetype::Orc => self.orc,
            EnemyArchetype::Skeleton => self.skeleton,
            // Elites and bosses are rolled separately from the regular mix.
            EnemyArchetype::Elite | EnemyArchetype::Boss => 0.0,
        }
    }

    fn draw<R: Rng>(&self, rng: &mut R) -> EnemyArchetype {
        let total: f32 = EnemyArchetype::REGULAR.iter().map(|a| self.weight(*a)).sum();
        if total <= 0.0 {
            return EnemyArchetype::Basic;
        }
        let roll = rng.gen::<f32>() * total;
        let mut accumulated = 0.0;
        for archetype in EnemyArchetype::REGULAR {
            accumulated += self.weight(archetype);
            if roll < accumulated && self.weight(archetype) > 0.0 {
                return archetype;
            }
        }
        EnemyArchetype::REGULAR
            .into_iter()
            .rev()
            .find(|a| self.weight(*a) > 0.0)
            .unwrap_or(EnemyArchetype::Basic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnSettings {
    /// Edge length of a population region, in tiles.
    pub region_size: u32,
    /// Desired live enemies per active region.
    pub target_per_region: u32,
    /// Regions within this many steps of the player's region are active.
    pub active_radius: u32,
    /// Hard cap on live enemies across the whole world.
    pub max_concurrent: u32,
    /// Upper bound on spawns in one wave.
    pub max_per_wave: u32,
    /// Enemies never appear closer than this to the player, in tiles.
    pub min_player_distance: f32,
    /// Enemies farther than this from the player are removed.
    pub despawn_distance: f32,
    pub spawn_interval_secs: f32,
    /// Tile samples per region before giving up for this wave.
    pub spawn_attempts: u32,
    /// Half-extent of the square patrol waypoints are drawn from.
    pub patrol_radius: f32,
    /// Spawned enemies are within this many levels of the player.
    pub level_spread: u32,
    pub archetype_weights: ArchetypeWeights,
    /// Chance that a spawn is an elite instead of a regular archetype.
    pub elite_chance: f32,
    /// Chance that a spawn is a boss, once the player reaches `boss_min_level`.
    pub boss_chance: f32,
    pub boss_min_level: u32,
}

impl Default for SpawnSettings {
    fn default() -> Self {
        Self {
            region_size: 16,
            target_per_region: 2,
            active_radius: 1,
            max_concurrent: 10,
            max_per_wave: 3,
            min_player_distance: 8.0,
            despawn_distance: 40.0,
            spawn_interval_secs: 5.0,
            spawn_attempts: 24,
            patrol_radius: 3.0,
            level_spread: 1,
            archetype_weights: ArchetypeWeights::default(),
            elite_chance: 0.05,
            boss_chance: 0.01,
            boss_min_level: 3,
        }
    }
}

impl SpawnSettings {
    pub fn validate(&self) -> Result<(), GenerationError> {
        if self.region_size == 0 {
            return Err(GenerationError::invalid(
                "spawning.region_size",
                "must be at least 1",
            ));
        }
        if !(self.min_player_distance.is_finite() && self.min_player_distance >= 0.0) {
            return Err(GenerationError::invalid(
                "spawning.min_player_distance",
                "must be non-negative",
            ));
        }
        if !(self.despawn_distance > self.min_player_distance) {
            return Err(GenerationError::invalid(
                "spawning.despawn_distance",
                "must exceed min_player_distance",
            ));
        }
        if !(self.spawn_interval_secs.is_finite() && self.spawn_interval_secs > 0.0) {
            return Err(GenerationError::invalid(
                "spawning.spawn_interval_secs",
                "must be positive",
            ));
        }
        if !(self.patrol_radius.is_finite() && self.patrol_radius >= 0.0) {
            return Err(GenerationError::invalid(
                "spawning.patrol_radius",
                "must be non-negative",
            ));
        }
        let weights = &self.archetype_weights;
        if EnemyArchetype::REGULAR
            .iter()
            .any(|a| !(weights.weight(*a).is_finite() && weights.weight(*a) >= 0.0))
        {
            return Err(GenerationError::invalid(
                "spawning.archetype_weights",
                "must be non-negative numbers",
            ));
        }
        for (field, chance) in [
            ("spawning.elite_chance", self.elite_chance),
            ("spawning.boss_chance", self.boss_chance),
        ] {
            if !(0.0..=1.0).contains(&chance) {
                return Err(GenerationError::invalid(field, "must be within [0, 1]"));
            }
        }
        if self.elite_chance + self.boss_chance > 1.0 {
            return Err(GenerationError::invalid(
                "spawning.elite_chance",
                "elite_chance + boss_chance must not exceed 1",
            ));
        }
        Ok(())
    }
}

/// A planned spawn; the simulation turns it into an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnRequest {
    pub archetype: EnemyArchetype,
    pub level: u32,
    pub coord: TileCoord,
    pub waypoints: Vec<Vec2>,
}

pub struct PopulationController {
    settings: SpawnSettings,
    timer: f32,
    rng: Xoshiro256StarStar,
}

impl PopulationController {
    pub fn new(settings: SpawnSettings, seed: u64) -> Self {
        Self {
            settings,
            timer: 0.0,
            rng: Xoshiro256StarStar::seed_from_u64(seed),
        }
    }

    pub fn settings(&self) -> &SpawnSettings {
        &self.settings
    }

    /// Advances the wave timer; true when a wave is due.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.timer += dt.max(0.0);
        if self.timer >= self.settings.spawn_interval_secs {
            self.timer = 0.0;
            return true;
        }
        false
    }

    /// Regions around the player, clipped to the world, in row-major order.
    pub fn active_regions(&self, world: &WorldGrid, player: Vec2) -> Vec<TileRect> {
        let size = self.settings.region_size as i32;
        let tile = TileCoord::from_point(player);
        let (rx, ry) = (tile.x.div_euclid(size), tile.y.div_euclid(size));
        let radius = self.settings.active_radius as i32;
        let bounds = world.bounds();
        let mut regions = Vec::new();
        for y in (ry - radius)..=(ry + radius) {
            for x in (rx - radius)..=(rx + radius) {
                let region = TileRect::new(x * size, y * size, size as u32, size as u32);
                if let Some(clipped) = region.intersection(&bounds) {
                    regions.push(clipped);
                }
            }
        }
        regions
    }

    /// Plans spawns that top up active regions. `live` are the positions of
    /// every live enemy.
    pub fn plan_wave(
        &mut self,
        world: &WorldGrid,
        player: Vec2,
        player_level: u32,
        live: &[Vec2],
    ) -> Vec<SpawnRequest> {
        let cap = self.settings.max_concurrent as usize;
        let mut total = live.len();
        let mut requests: Vec<SpawnRequest> = Vec::new();
        if total >= cap {
            return requests;
        }

        for region in self.active_regions(world, player) {
            let mut in_region = live
                .iter()
                .filter(|p| region.contains(TileCoord::from_point(**p)))
                .count();
            while in_region < self.settings.target_per_region as usize
                && total < cap
                && requests.len() < self.settings.max_per_wave as usize
            {
                let Some(coord) = self.pick_spawn_tile(world, &region, player, &requests) else {
                    break;
                };
                let request = self.build_request(world, coord, player_level);
                requests.push(request);
                in_region += 1;
                total += 1;
            }
        }
        requests
    }

    fn pick_spawn_tile(
        &mut self,
        world: &WorldGrid,
        region: &TileRect,
        player: Vec2,
        taken: &[SpawnRequest],
    ) -> Option<TileCoord> {
        if region.is_empty() {
            return None;
        }
        for _ in 0..self.settings.spawn_attempts {
            let coord = TileCoord::new(
                self.rng.gen_range(region.x..region.max_x()),
                self.rng.gen_range(region.y..region.max_y()),
            );
            if !world.is_walkable(coord.x, coord.y) {
                continue;
            }
            if coord.center().distance(player) < self.settings.min_player_distance {
                continue;
            }
            if taken.iter().any(|r| r.coord == coord) {
                continue;
            }
            return Some(coord);
        }
        None
    }

    /// Bosses first (gated by player level), then elites, then the weighted
    /// regular mix.
    fn draw_archetype(&mut self, player_level: u32) -> EnemyArchetype {
        let roll = self.rng.gen::<f32>();
        let boss_chance = if player_level >= self.settings.boss_min_level {
            self.settings.boss_chance
        } else {
            0.0
        };
        if roll < boss_chance {
            EnemyArchetype::Boss
        } else if roll < boss_chance + self.settings.elite_chance {
            EnemyArchetype::Elite
        } else {
            self.settings.archetype_weights.draw(&mut self.rng)
        }
    }

    fn build_request(&mut self, world: &WorldGrid, coord: TileCoord, player_level: u32) -> SpawnRequest {
        let archetype = self.draw_archetype(player_level);
        let spread = self.settings.level_spread as i64;
        let offset = if spread > 0 {
            self.rng.gen_range(-spread..=spread)
        } else {
            0
        };
        let level = (player_level as i64 + offset).max(1) as u32;

        let origin = coord.center();
        let mut waypoints = vec![origin];
        let radius = self.settings.patrol_radius;
        for _ in 0..PATROL_WAYPOINTS {
            if radius <= 0.0 {
                break;
            }
            let candidate = origin
                + Vec2::new(
                    self.rng.gen_range(-radius..=radius),
                    self.rng.gen_range(-radius..=radius),
                );
            if world.is_walkable_point(candidate) {
                waypoints.push(candidate);
            }
        }

        SpawnRequest {
            archetype,
            level,
            coord,
            waypoints,
        }
    }
}
