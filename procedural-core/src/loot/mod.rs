//! Item generation and ground loot.
//!
//! Items are rolled from a seed: rarity first (weighted by config), then a
//! stat magnitude inside the rarity's band, then the item kind. Higher tiers
//! have bands that never sit below a lower tier's band.

pub mod crafting;
pub mod inventory;

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{ITEM_LEVEL_SCALE, ITEM_PLACEMENT_ATTEMPTS, STRUCTURE_ITEM_SPREAD};
use crate::entity::StatDelta;
use crate::error::GenerationError;
use crate::generation::WorldSeed;
use crate::world::{TileCoord, TileRect, WorldGrid};

use self::inventory::EquipSlot;

/// Item ids are derived from the seed that rolled the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemRarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
}

impl ItemRarity {
    pub const ALL: [ItemRarity; 5] = [
        ItemRarity::Common,
        ItemRarity::Uncommon,
        ItemRarity::Rare,
        ItemRarity::Epic,
        ItemRarity::Legendary,
    ];

    /// Inclusive stat magnitude band. Both ends are non-decreasing by tier.
    pub fn stat_range(self) -> (f32, f32) {
        match self {
            ItemRarity::Common => (1.0, 4.0),
            ItemRarity::Uncommon => (3.0, 7.0),
            ItemRarity::Rare => (6.0, 11.0),
            ItemRarity::Epic => (10.0, 16.0),
            ItemRarity::Legendary => (15.0, 24.0),
        }
    }

    fn tier(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ItemRarity::Common => "common",
            ItemRarity::Uncommon => "uncommon",
            ItemRarity::Rare => "rare",
            ItemRarity::Epic => "epic",
            ItemRarity::Legendary => "legendary",
        }
    }
}

/// Relative rarity weights. Missing fields in a config file keep their
/// defaults, so `(rare: 10)` only retunes the rare tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RarityWeights {
    pub common: f32,
    pub uncommon: f32,
    pub rare: f32,
    pub epic: f32,
    pub legendary: f32,
}

impl Default for RarityWeights {
    fn default() -> Self {
        Self {
            common: 70.0,
            uncommon: 20.0,
            rare: 5.0,
            epic: 4.0,
            legendary: 1.0,
        }
    }
}

impl RarityWeights {
    pub fn weight(&self, rarity: ItemRarity) -> f32 {
        match rarity {
            ItemRarity::Common => self.common,
            ItemRarity::Uncommon => self.uncommon,
            ItemRarity::Rare => self.rare,
            ItemRarity::Epic => self.epic,
            ItemRarity::Legendary => self.legendary,
        }
    }

    pub fn total(&self) -> f32 {
        ItemRarity::ALL.iter().map(|r| self.weight(*r)).sum()
    }

    /// Fraction of rolls expected to land on `rarity`.
    pub fn probability(&self, rarity: ItemRarity) -> f32 {
        let total = self.total();
        if total <= 0.0 {
            return 0.0;
        }
        self.weight(rarity) / total
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        for rarity in ItemRarity::ALL {
            let weight = self.weight(rarity);
            if !weight.is_finite() || weight < 0.0 {
                return Err(GenerationError::invalid(
                    format!("loot.rarity_weights.{}", rarity.as_str()),
                    "must be a non-negative number",
                ));
            }
        }
        if self.total() <= 0.0 {
            return Err(GenerationError::invalid(
                "loot.rarity_weights",
                "at least one tier needs a positive weight",
            ));
        }
        Ok(())
    }

    /// Cumulative draw. Tiers with zero weight are never selected.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> ItemRarity {
        let total = self.total();
        let fallback = ItemRarity::ALL
            .iter()
            .copied()
            .find(|r| self.weight(*r) > 0.0)
            .unwrap_or(ItemRarity::Common);
        if total <= 0.0 {
            return fallback;
        }
        let roll = rng.gen::<f32>() * total;
        let mut accumulated = 0.0;
        let mut last_positive = fallback;
        for rarity in ItemRarity::ALL {
            let weight = self.weight(rarity);
            if weight <= 0.0 {
                continue;
            }
            accumulated += weight;
            last_positive = rarity;
            if roll < accumulated {
                return rarity;
            }
        }
        last_positive
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConsumableEffect {
    Heal { amount: f32 },
    Haste { speed_bonus: f32, duration_secs: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ItemKind {
    Weapon { attack_bonus: f32 },
    Armor { defense_bonus: f32, health_bonus: f32 },
    Consumable { effect: ConsumableEffect, quantity: u32 },
    /// Crafting ingredient, identified by item name.
    Material { quantity: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub rarity: ItemRarity,
    pub kind: ItemKind,
}

impl Item {
    pub fn slot(&self) -> Option<EquipSlot> {
        match self.kind {
            ItemKind::Weapon { .. } => Some(EquipSlot::Weapon),
            ItemKind::Armor { .. } => Some(EquipSlot::Armor),
            ItemKind::Consumable { .. } | ItemKind::Material { .. } => None,
        }
    }

    pub fn is_consumable(&self) -> bool {
        matches!(self.kind, ItemKind::Consumable { .. })
    }

    pub fn quantity(&self) -> u32 {
        match self.kind {
            ItemKind::Consumable { quantity, .. } | ItemKind::Material { quantity } => quantity,
            _ => 1,
        }
    }

    pub fn is_stackable(&self) -> bool {
        matches!(self.kind, ItemKind::Consumable { .. } | ItemKind::Material { .. })
    }

    pub(crate) fn quantity_mut(&mut self) -> Option<&mut u32> {
        match &mut self.kind {
            ItemKind::Consumable { quantity, .. } | ItemKind::Material { quantity } => Some(quantity),
            _ => None,
        }
    }

    /// Stat change applied while the item is equipped.
    pub fn equip_delta(&self) -> StatDelta {
        match self.kind {
            ItemKind::Weapon { attack_bonus } => StatDelta {
                attack: attack_bonus,
                ..StatDelta::ZERO
            },
            ItemKind::Armor {
                defense_bonus,
                health_bonus,
            } => StatDelta {
                defense: defense_bonus,
                max_health: health_bonus,
                ..StatDelta::ZERO
            },
            ItemKind::Consumable { .. } | ItemKind::Material { .. } => StatDelta::ZERO,
        }
    }

    /// Consumables with identical name, rarity and effect share a stack, as
    /// do materials with the same name and rarity.
    pub fn stacks_with(&self, other: &Item) -> bool {
        let same_kind = match (&self.kind, &other.kind) {
            (
                ItemKind::Consumable { effect: a, .. },
                ItemKind::Consumable { effect: b, .. },
            ) => a == b,
            (ItemKind::Material { .. }, ItemKind::Material { .. }) => true,
            _ => false,
        };
        same_kind && self.name == other.name && self.rarity == other.rarity
    }
}

const WEAPON_NAMES: [&str; 5] = [
    "Rusty Sword",
    "Iron Sword",
    "Steel Sword",
    "Magic Sword",
    "Legendary Blade",
];

const ARMOR_NAMES: [&str; 5] = [
    "Leather Armor",
    "Chain Mail",
    "Plate Armor",
    "Magic Armor",
    "Dragon Scale",
];

/// Healing potions by tier. Strengths are fixed so equal rolls stack.
const HEAL_POTIONS: [(&str, f32); 5] = [
    ("Health Potion", 50.0),
    ("Health Potion", 50.0),
    ("Greater Health Potion", 100.0),
    ("Elixir of Life", 200.0),
    ("Elixir of Life", 200.0),
];

const SPEED_POTION_BONUS: f32 = 2.0;
const SPEED_POTION_SECS: f32 = 10.0;

/// Kind split: weapons 40%, armor 40%, consumables 20%.
const WEAPON_SHARE: u32 = 40;
const ARMOR_SHARE: u32 = 40;

pub fn roll_item(weights: &RarityWeights, seed: u64) -> Item {
    roll_item_at_level(weights, seed, 1)
}

/// Rolls one item. The same `(weights, seed, level)` always yields the same
/// item, including its id. Level scales equipment magnitudes; potion
/// strengths depend on tier alone.
pub fn roll_item_at_level(weights: &RarityWeights, seed: u64, level: u32) -> Item {
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
    let rarity = weights.draw(&mut rng);
    let (low, high) = rarity.stat_range();
    let level_scale = 1.0 + level.saturating_sub(1) as f32 * ITEM_LEVEL_SCALE;
    let magnitude = rng.gen_range(low..=high) * level_scale;

    let kind_roll = rng.gen_range(0..100u32);
    let tier = rarity.tier();
    let (name, kind) = if kind_roll < WEAPON_SHARE {
        (
            WEAPON_NAMES[tier],
            ItemKind::Weapon {
                attack_bonus: magnitude,
            },
        )
    } else if kind_roll < WEAPON_SHARE + ARMOR_SHARE {
        (
            ARMOR_NAMES[tier],
            ItemKind::Armor {
                defense_bonus: magnitude * 0.5,
                health_bonus: magnitude * 4.0,
            },
        )
    } else if rng.gen_bool(0.75) {
        let (name, amount) = HEAL_POTIONS[tier];
        (
            name,
            ItemKind::Consumable {
                effect: ConsumableEffect::Heal { amount },
                quantity: 1,
            },
        )
    } else {
        (
            "Speed Potion",
            ItemKind::Consumable {
                effect: ConsumableEffect::Haste {
                    speed_bonus: SPEED_POTION_BONUS,
                    duration_secs: SPEED_POTION_SECS,
                },
                quantity: 1,
            },
        )
    };

    Item {
        id: ItemId(seed),
        name: name.to_string(),
        rarity,
        kind,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LootSettings {
    pub rarity_weights: RarityWeights,
    pub items_per_structure_min: u32,
    pub items_per_structure_max: u32,
    /// Items scattered at random walkable tiles, away from structures.
    pub scattered_items: u32,
    /// Chance that a defeated enemy leaves an item behind.
    pub enemy_drop_chance: f32,
    /// Share of enemy drops that are crafting materials instead of gear.
    pub material_drop_share: f32,
    /// Pickup reach in tiles, measured from the entity to tile centres.
    pub pickup_radius: f32,
    pub inventory_capacity: usize,
}

impl Default for LootSettings {
    fn default() -> Self {
        Self {
            rarity_weights: RarityWeights::default(),
            items_per_structure_min: 1,
            items_per_structure_max: 3,
            scattered_items: 15,
            enemy_drop_chance: 0.35,
            material_drop_share: 0.4,
            pickup_radius: 1.0,
            inventory_capacity: 20,
        }
    }
}

impl LootSettings {
    pub fn validate(&self) -> Result<(), GenerationError> {
        self.rarity_weights.validate()?;
        if self.items_per_structure_min > self.items_per_structure_max {
            return Err(GenerationError::invalid(
                "loot.items_per_structure_min",
                "must not exceed items_per_structure_max",
            ));
        }
        if !(0.0..=1.0).contains(&self.enemy_drop_chance) {
            return Err(GenerationError::invalid(
                "loot.enemy_drop_chance",
                "must be within [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&self.material_drop_share) {
            return Err(GenerationError::invalid(
                "loot.material_drop_share",
                "must be within [0, 1]",
            ));
        }
        if !(self.pickup_radius.is_finite() && self.pickup_radius >= 0.0) {
            return Err(GenerationError::invalid(
                "loot.pickup_radius",
                "must be a non-negative number",
            ));
        }
        if self.inventory_capacity == 0 {
            return Err(GenerationError::invalid(
                "loot.inventory_capacity",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Seeds the world with ground loot: a few items around each structure plus
/// a scattering across open terrain. Returns the number of items placed.
pub fn scatter_items(grid: &mut WorldGrid, settings: &LootSettings, seed: &WorldSeed) -> usize {
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed.derive("scatter"));
    let mut placed = 0;

    let footprints: Vec<(u32, TileRect)> = grid
        .structures()
        .iter()
        .map(|s| (s.id, s.footprint))
        .collect();
    for (structure_id, footprint) in footprints {
        let count =
            rng.gen_range(settings.items_per_structure_min..=settings.items_per_structure_max);
        let area = footprint.expanded(STRUCTURE_ITEM_SPREAD);
        for n in 0..count {
            let Some(coord) = pick_walkable(grid, &area, &mut rng) else {
                continue;
            };
            let level = rng.gen_range(1..=5);
            let item_seed = seed.derive_indexed("structure-item", ((structure_id as u64) << 16) | n as u64);
            let item = roll_item_at_level(&settings.rarity_weights, item_seed, level);
            if grid.place_item(coord, item).is_ok() {
                placed += 1;
            }
        }
    }

    let bounds = grid.bounds();
    for n in 0..settings.scattered_items {
        let Some(coord) = pick_walkable(grid, &bounds, &mut rng) else {
            continue;
        };
        let level = rng.gen_range(1..=3);
        let item = roll_item_at_level(
            &settings.rarity_weights,
            seed.derive_indexed("ground-item", n as u64),
            level,
        );
        if grid.place_item(coord, item).is_ok() {
            placed += 1;
        }
    }

    debug!(placed, "ground loot scattered");
    placed
}

fn pick_walkable<R: Rng>(grid: &WorldGrid, area: &TileRect, rng: &mut R) -> Option<TileCoord> {
    let area = area.intersection(&grid.bounds())?;
    for _ in 0..ITEM_PLACEMENT_ATTEMPTS {
        let coord = TileCoord::new(
            rng.gen_range(area.x..area.max_x()),
            rng.gen_range(area.y..area.max_y()),
        );
        if grid.is_walkable(coord.x, coord.y) {
            return Some(coord);
        }
    }
    None
}
