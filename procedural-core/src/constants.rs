//! Centralized game constants for the roguelike procedural core.
//!
//! Values that are shared between generation, simulation and loot live here.
//! Tunables that a world designer is expected to change are configuration
//! (see [`crate::config::WorldConfig`]), not constants.

// =====================================================
// World Generation
// =====================================================

/// Structure densities are expressed per this many tiles.
pub const DENSITY_AREA: f32 = 10_000.0;

/// Smallest world edge accepted by configuration validation.
pub const MIN_WORLD_EDGE: u32 = 8;

/// Largest world edge accepted by configuration validation.
pub const MAX_WORLD_EDGE: u32 = 4096;

/// Temperature (after bias) above which lowland grass becomes desert.
pub const DESERT_TEMPERATURE: f64 = 0.3;

/// Temperature (after bias) below which highland becomes snow.
pub const SNOW_TEMPERATURE: f64 = -0.3;

/// The temperature channel varies more slowly than elevation.
pub const CLIMATE_FREQUENCY_SCALE: f64 = 0.5;

/// Ground items are scattered up to this many tiles around a structure.
pub const STRUCTURE_ITEM_SPREAD: u32 = 2;

/// Attempts to find a walkable tile for one scattered ground item.
pub const ITEM_PLACEMENT_ATTEMPTS: u32 = 8;

// =====================================================
// Movement
// =====================================================

/// Longest sub-step (in tiles) taken while resolving a movement vector.
/// Keeps fast entities from tunnelling through one-tile walls.
pub const MAX_MOVEMENT_SUBSTEP: f32 = 0.5;

/// Upper bound on sub-steps for a single movement resolution.
pub const MAX_MOVEMENT_SUBSTEPS: u32 = 64;

/// Cell edge (tiles) of the spatial hash used for proximity queries.
pub const SPATIAL_CELL_SIZE: f32 = 4.0;

// =====================================================
// AI
// =====================================================

/// Distance (tiles) at which a patrol waypoint counts as reached.
pub const WAYPOINT_TOLERANCE: f32 = 0.25;

/// Seconds before a patrolling enemy gives up on an unreachable waypoint.
pub const WAYPOINT_TIMEOUT_SECS: f32 = 4.0;

/// Number of patrol waypoints generated around a spawn point.
pub const PATROL_WAYPOINTS: usize = 3;

// =====================================================
// Items
// =====================================================

/// Maximum quantity of one consumable stack.
pub const MAX_STACK: u32 = 5;

/// Per-level multiplier applied to rolled stat magnitudes.
pub const ITEM_LEVEL_SCALE: f32 = 0.1;

// =====================================================
// Enemy tiers
// =====================================================

/// Attack gained when a boss enrages, as a fraction of its level attack.
pub const RAGE_ATTACK_BONUS: f32 = 0.5;

/// Speed gained when a boss enrages, as a fraction of its level speed.
pub const RAGE_SPEED_BONUS: f32 = 0.2;
