//! Error taxonomy for world generation, loot handling and the simulation.
//!
//! Fatal problems (bad configuration) abort world creation before any tile is
//! produced. Everything else is reported to the caller and leaves state
//! untouched.

use std::path::PathBuf;

use thiserror::Error;

use crate::generation::structures::StructureKind;
use crate::loot::crafting::RecipeId;
use crate::loot::inventory::EquipSlot;
use crate::loot::ItemId;
use crate::entity::EntityId;

/// Fatal errors raised while validating a config or generating a world.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    #[error("invalid configuration: `{field}` {reason}")]
    InvalidConfiguration { field: String, reason: String },
}

impl GenerationError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Non-fatal: the structure placer ran out of attempts before reaching the
/// requested count for one structure kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("placed {placed}/{requested} {kind:?} structures after {attempts} attempts")]
pub struct GenerationBudgetExceeded {
    pub kind: StructureKind,
    pub requested: u32,
    pub placed: u32,
    pub attempts: u32,
}

/// A tile coordinate outside the world extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("tile ({x}, {y}) is outside the {width}x{height} world")]
pub struct OutOfBounds {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

/// Inventory and equipment failures. All of them are no-ops on the entity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ItemError {
    #[error("item {item:?} cannot be equipped in the {slot:?} slot")]
    IncompatibleSlot { item: ItemId, slot: EquipSlot },
    #[error("item {0:?} is not in the inventory")]
    NotInInventory(ItemId),
    #[error("item {0:?} is not consumable")]
    NotConsumable(ItemId),
    #[error("inventory is full ({capacity} slots)")]
    InventoryFull { capacity: usize },
    #[error("nothing is equipped in the {0:?} slot")]
    SlotEmpty(EquipSlot),
    #[error("recipe {recipe:?} needs level {required}, entity is level {level}")]
    LevelTooLow {
        recipe: RecipeId,
        required: u32,
        level: u32,
    },
    #[error("missing {material}: need {needed}, have {have}")]
    MissingMaterial {
        material: &'static str,
        needed: u32,
        have: u32,
    },
}

/// Invariant violations detected at simulation boundaries.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error("entity {0:?} does not exist")]
    EntityNotFound(EntityId),
    #[error("no walkable tile available for {0}")]
    NoWalkableTile(&'static str),
    #[error("tile ({x}, {y}) is not walkable")]
    NotWalkable { x: i32, y: i32 },
    #[error("population cap of {max} enemies reached")]
    PopulationCap { max: u32 },
    #[error("the player has been defeated")]
    PlayerDefeated,
}

/// Errors while loading a [`crate::config::WorldConfig`] from disk or text.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse RON config: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] GenerationError),
}
