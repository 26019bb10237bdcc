//! Terrain-aware movement resolution.
//!
//! A movement vector is split into sub-steps no longer than half a tile. Each
//! sub-step is tried in full, then along x only, then along y only, so an
//! entity pressed against a wall slides along it instead of stopping dead.
//! A resolved position is never inside a non-walkable tile.

use bevy::math::Vec2;

use crate::constants::{MAX_MOVEMENT_SUBSTEP, MAX_MOVEMENT_SUBSTEPS};
use crate::world::WorldGrid;

/// Displacement for one tick: direction (clamped to unit length) times speed,
/// slowed by the cost of the tile the entity is standing on.
pub fn tick_displacement(world: &WorldGrid, position: Vec2, direction: Vec2, speed: f32, dt: f32) -> Vec2 {
    if !direction.is_finite() || !speed.is_finite() || !dt.is_finite() {
        return Vec2::ZERO;
    }
    let tile = world.tile_of(position);
    let cost = world.movement_cost(tile.x, tile.y);
    if !cost.is_finite() || cost <= 0.0 {
        return Vec2::ZERO;
    }
    direction.clamp_length_max(1.0) * speed.max(0.0) * dt.max(0.0) / cost
}

/// Moves from `from` by `delta`, stopping or sliding at non-walkable tiles.
pub fn resolve_movement(world: &WorldGrid, from: Vec2, delta: Vec2) -> Vec2 {
    if !delta.is_finite() || delta == Vec2::ZERO {
        return from;
    }
    let steps = ((delta.length() / MAX_MOVEMENT_SUBSTEP).ceil() as u32).clamp(1, MAX_MOVEMENT_SUBSTEPS);
    let step = delta / steps as f32;
    let mut position = from;
    for _ in 0..steps {
        let next = slide_step(world, position, step);
        if next == position {
            break;
        }
        position = next;
    }
    position
}

fn slide_step(world: &WorldGrid, position: Vec2, step: Vec2) -> Vec2 {
    let full = position + step;
    if world.is_walkable_point(full) {
        return full;
    }
    if step.x != 0.0 {
        let x_only = Vec2::new(position.x + step.x, position.y);
        if world.is_walkable_point(x_only) {
            return x_only;
        }
    }
    if step.y != 0.0 {
        let y_only = Vec2::new(position.x, position.y + step.y);
        if world.is_walkable_point(y_only) {
            return y_only;
        }
    }
    position
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::biome::Biome;

    fn corridor() -> WorldGrid {
        // Water wall along x = 5.
        let mut grid = WorldGrid::filled(10, 10, Biome::Grass);
        for y in 0..10 {
            grid.set_biome(5, y, Biome::Water).unwrap();
        }
        grid
    }

    #[test]
    fn test_blocked_by_water() {
        let grid = corridor();
        let end = resolve_movement(&grid, Vec2::new(3.5, 3.5), Vec2::new(4.0, 0.0));
        assert!(end.x < 5.0, "must not enter the water column, ended at {end:?}");
        assert!(grid.is_walkable_point(end));
    }

    #[test]
    fn test_no_tunnelling_at_high_speed() {
        let grid = corridor();
        let end = resolve_movement(&grid, Vec2::new(4.5, 2.5), Vec2::new(3.0, 0.0));
        assert!(end.x < 5.0);
    }

    #[test]
    fn test_slides_along_wall() {
        let grid = corridor();
        let end = resolve_movement(&grid, Vec2::new(4.5, 2.5), Vec2::new(1.0, 1.0));
        assert!(end.x < 5.0);
        assert!((end.y - 3.5).abs() < 1e-4, "y motion should survive, got {end:?}");
    }

    #[test]
    fn test_world_edge_is_solid() {
        let grid = WorldGrid::filled(4, 4, Biome::Grass);
        let end = resolve_movement(&grid, Vec2::new(0.5, 0.5), Vec2::new(-3.0, 0.0));
        assert!(end.x >= 0.0);
    }

    #[test]
    fn test_cost_slows_movement() {
        let mut grid = WorldGrid::filled(4, 4, Biome::Grass);
        grid.set_biome(1, 1, Biome::Mountain).unwrap();
        let open = tick_displacement(&grid, Vec2::new(0.5, 0.5), Vec2::X, 4.0, 0.5);
        let mountain = tick_displacement(&grid, Vec2::new(1.5, 1.5), Vec2::X, 4.0, 0.5);
        assert_eq!(open, Vec2::new(2.0, 0.0));
        assert_eq!(mountain, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn test_non_finite_input_is_ignored() {
        let grid = WorldGrid::filled(4, 4, Biome::Grass);
        let start = Vec2::new(1.5, 1.5);
        assert_eq!(resolve_movement(&grid, start, Vec2::new(f32::NAN, 0.0)), start);
        assert_eq!(
            tick_displacement(&grid, start, Vec2::new(f32::INFINITY, 0.0), 1.0, 1.0),
            Vec2::ZERO
        );
    }
}
