//! Inventory and equipment bookkeeping.
//!
//! The inventory owns items; equipment only records which owned item fills a
//! slot together with the stat delta it applied, so unequipping can reverse
//! exactly what equipping added.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_STACK;
use crate::entity::StatDelta;

use super::{Item, ItemId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EquipSlot {
    Weapon,
    Armor,
}

impl EquipSlot {
    pub const ALL: [EquipSlot; 2] = [EquipSlot::Weapon, EquipSlot::Armor];
}

/// Fixed-capacity item list. Capacity counts entries, so a stack of potions
/// takes one slot.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    items: Vec<Item>,
    capacity: usize,
}

impl Inventory {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    /// Adds an item, merging into an existing stack when possible. A full
    /// inventory hands the item back untouched.
    pub fn try_add(&mut self, item: Item) -> Result<(), Item> {
        let incoming = item.quantity();
        if let Some(stack) = self
            .items
            .iter_mut()
            .find(|existing| existing.stacks_with(&item) && existing.quantity() + incoming <= MAX_STACK)
        {
            if let Some(quantity) = stack.quantity_mut() {
                *quantity += incoming;
                return Ok(());
            }
        }
        if self.is_full() {
            return Err(item);
        }
        self.items.push(item);
        Ok(())
    }

    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    /// Removes one unit of a stack, dropping the entry when it reaches zero.
    /// Returns the unit taken.
    pub fn take_one(&mut self, id: ItemId) -> Option<Item> {
        let index = self.items.iter().position(|item| item.id == id)?;
        let entry = &mut self.items[index];
        let mut unit = entry.clone();
        if let Some(quantity) = entry.quantity_mut() {
            if *quantity > 1 {
                *quantity -= 1;
                if let Some(single) = unit.quantity_mut() {
                    *single = 1;
                }
                return Some(unit);
            }
        }
        Some(self.items.remove(index))
    }

    /// Units of items called `name`, skipping the ids in `reserved`.
    pub fn count_named(&self, name: &str, reserved: &[ItemId]) -> u32 {
        self.items
            .iter()
            .filter(|item| item.name == name && !reserved.contains(&item.id))
            .map(Item::quantity)
            .sum()
    }

    /// Takes `count` units of items called `name`, oldest entries first.
    /// Nothing is removed unless all of them are available.
    pub fn remove_named(&mut self, name: &str, count: u32, reserved: &[ItemId]) -> bool {
        if self.count_named(name, reserved) < count {
            return false;
        }
        let mut needed = count;
        let mut index = 0;
        while needed > 0 && index < self.items.len() {
            let item = &mut self.items[index];
            if item.name != name || reserved.contains(&item.id) {
                index += 1;
                continue;
            }
            let available = item.quantity();
            if available > needed {
                if let Some(quantity) = item.quantity_mut() {
                    *quantity -= needed;
                }
                needed = 0;
            } else {
                self.items.remove(index);
                needed -= available;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquippedItem {
    pub id: ItemId,
    pub delta: StatDelta,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Equipment {
    weapon: Option<EquippedItem>,
    armor: Option<EquippedItem>,
}

impl Equipment {
    pub fn get(&self, slot: EquipSlot) -> Option<&EquippedItem> {
        match slot {
            EquipSlot::Weapon => self.weapon.as_ref(),
            EquipSlot::Armor => self.armor.as_ref(),
        }
    }

    /// Replaces the slot contents, returning what was there.
    pub fn set(&mut self, slot: EquipSlot, equipped: Option<EquippedItem>) -> Option<EquippedItem> {
        let target = match slot {
            EquipSlot::Weapon => &mut self.weapon,
            EquipSlot::Armor => &mut self.armor,
        };
        std::mem::replace(target, equipped)
    }

    pub fn slot_of(&self, id: ItemId) -> Option<EquipSlot> {
        EquipSlot::ALL
            .into_iter()
            .find(|slot| self.get(*slot).is_some_and(|e| e.id == id))
    }

    /// Ids of every equipped item.
    pub fn equipped_ids(&self) -> Vec<ItemId> {
        EquipSlot::ALL
            .iter()
            .filter_map(|slot| self.get(*slot))
            .map(|e| e.id)
            .collect()
    }

    /// Sum of all equipped deltas.
    pub fn total_delta(&self) -> StatDelta {
        EquipSlot::ALL
            .iter()
            .filter_map(|slot| self.get(*slot))
            .fold(StatDelta::ZERO, |acc, e| acc + e.delta)
    }
}
