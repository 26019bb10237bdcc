//! Player input and the events a tick produces.

use bevy::math::Vec2;

use crate::entity::{EnemyArchetype, EntityId};
use crate::error::ItemError;
use crate::loot::crafting::RecipeId;
use crate::loot::inventory::EquipSlot;
use crate::loot::{ConsumableEffect, ItemId};
use crate::world::TileCoord;

/// One input for one tick. `Move` carries a direction; lengths above one are
/// clamped so diagonal input is not faster.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlayerAction {
    Move(Vec2),
    Attack,
    PickUp,
    Equip { item: ItemId, slot: EquipSlot },
    Unequip(EquipSlot),
    Consume(ItemId),
    Drop(ItemId),
    Craft(RecipeId),
    OpenInventory,
    OpenMap,
    Pause,
}

/// Interface requests are forwarded to the host; the simulation does not
/// change state for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfaceRequest {
    Inventory,
    Map,
    Pause,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimEvent {
    EnemySpawned {
        id: EntityId,
        archetype: EnemyArchetype,
        level: u32,
        coord: TileCoord,
    },
    EnemyDespawned {
        id: EntityId,
    },
    DamageDealt {
        attacker: EntityId,
        target: EntityId,
        amount: f32,
        remaining: f32,
    },
    /// Precedes the `DamageDealt` of an ability-powered hit.
    AbilityUsed {
        attacker: EntityId,
        target: EntityId,
    },
    EnemyEnraged {
        id: EntityId,
    },
    EnemyKilled {
        id: EntityId,
        archetype: EnemyArchetype,
        level: u32,
        xp_awarded: u32,
    },
    LevelUp {
        entity: EntityId,
        level: u32,
    },
    ItemPickedUp {
        entity: EntityId,
        item: ItemId,
        name: String,
    },
    ItemDropped {
        item: ItemId,
        coord: TileCoord,
        source: EntityId,
    },
    ItemEquipped {
        entity: EntityId,
        item: ItemId,
        slot: EquipSlot,
    },
    ItemUnequipped {
        entity: EntityId,
        item: ItemId,
        slot: EquipSlot,
    },
    ItemConsumed {
        entity: EntityId,
        item: ItemId,
        effect: ConsumableEffect,
    },
    ItemCrafted {
        entity: EntityId,
        recipe: RecipeId,
        item: ItemId,
    },
    ActionRejected {
        entity: EntityId,
        error: ItemError,
    },
    StructureDiscovered {
        structure: u32,
    },
    PlayerDefeated {
        entity: EntityId,
    },
    InterfaceRequested(InterfaceRequest),
}

/// Events collected during one tick, drained when the tick returns.
#[derive(Debug, Default)]
pub struct EventQueue {
    pending: Vec<SimEvent>,
}

impl EventQueue {
    pub fn push(&mut self, event: SimEvent) {
        self.pending.push(event);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn drain(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.pending)
    }
}
