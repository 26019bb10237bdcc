//! Roguelike - Procedural Core Library
//!
//! Deterministic game logic for a top-down 2D roguelike:
//! - Fractal noise terrain and climate sampling
//! - Biome classification (elevation + temperature)
//! - Structure placement (rejection sampling with budgets)
//! - Tile world grid with ground items
//! - Entity simulation (movement, AI state machine, combat, progression)
//! - Loot system (rarity tables, inventory, equipment, consumables, crafting)
//! - Quest log fed by simulation events
//! - Bevy plugin and frame snapshots for a rendering host

pub mod combat;
pub mod config;
pub mod constants;
pub mod entity;
pub mod error;
pub mod generation;
pub mod logging;
pub mod loot;
pub mod quests;
pub mod simulation;
pub mod world;

pub use config::WorldConfig;
pub use error::{GenerationError, ItemError, SimulationError};
pub use generation::{generate_world, GeneratedWorld, GenerationReport, WorldSeed};
pub use simulation::plugin::SimulationPlugin;
pub use simulation::snapshot::FrameSnapshot;
pub use simulation::{PlayerAction, SimEvent, Simulation};
pub use world::WorldGrid;
