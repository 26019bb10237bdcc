//! Recipe crafting over an [`Inventory`].
//!
//! Ingredients are matched by item name, so a recipe can consume raw
//! materials and finished gear alike. Crafting is instant and all-or-nothing:
//! a failed attempt leaves the inventory exactly as it was.

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use serde::{Deserialize, Serialize};

use crate::error::ItemError;

use super::inventory::Inventory;
use super::{ConsumableEffect, Item, ItemId, ItemKind, ItemRarity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecipeId {
    IronSword,
    SteelSword,
    MagicSword,
    LeatherArmor,
    ChainMail,
    PlateArmor,
    HealthPotion,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recipe {
    pub id: RecipeId,
    pub output_name: &'static str,
    pub rarity: ItemRarity,
    pub kind: ItemKind,
    /// `(item name, units)` pairs consumed by one craft.
    pub materials: &'static [(&'static str, u32)],
    pub required_level: u32,
}

impl RecipeId {
    pub const ALL: [RecipeId; 7] = [
        RecipeId::IronSword,
        RecipeId::SteelSword,
        RecipeId::MagicSword,
        RecipeId::LeatherArmor,
        RecipeId::ChainMail,
        RecipeId::PlateArmor,
        RecipeId::HealthPotion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RecipeId::IronSword => "iron_sword",
            RecipeId::SteelSword => "steel_sword",
            RecipeId::MagicSword => "magic_sword",
            RecipeId::LeatherArmor => "leather_armor",
            RecipeId::ChainMail => "chain_mail",
            RecipeId::PlateArmor => "plate_armor",
            RecipeId::HealthPotion => "health_potion",
        }
    }

    /// Outputs sit at the top of their rarity's stat band.
    pub fn recipe(self) -> Recipe {
        match self {
            RecipeId::IronSword => Recipe::new(
                self,
                "Iron Sword",
                ItemRarity::Common,
                ItemKind::Weapon { attack_bonus: 4.0 },
                &[("Iron Ore", 3), ("Wood", 1)],
                2,
            ),
            RecipeId::SteelSword => Recipe::new(
                self,
                "Steel Sword",
                ItemRarity::Uncommon,
                ItemKind::Weapon { attack_bonus: 7.0 },
                &[("Iron Sword", 1), ("Steel", 2), ("Leather", 1)],
                5,
            ),
            RecipeId::MagicSword => Recipe::new(
                self,
                "Magic Sword",
                ItemRarity::Rare,
                ItemKind::Weapon { attack_bonus: 11.0 },
                &[("Steel Sword", 1), ("Magic Crystal", 2), ("Enchanted Essence", 1)],
                8,
            ),
            RecipeId::LeatherArmor => Recipe::new(
                self,
                "Leather Armor",
                ItemRarity::Common,
                ItemKind::Armor {
                    defense_bonus: 2.0,
                    health_bonus: 16.0,
                },
                &[("Leather", 4), ("Thread", 2)],
                1,
            ),
            RecipeId::ChainMail => Recipe::new(
                self,
                "Chain Mail",
                ItemRarity::Uncommon,
                ItemKind::Armor {
                    defense_bonus: 3.5,
                    health_bonus: 28.0,
                },
                &[("Iron Ore", 5), ("Leather", 2)],
                3,
            ),
            RecipeId::PlateArmor => Recipe::new(
                self,
                "Plate Armor",
                ItemRarity::Rare,
                ItemKind::Armor {
                    defense_bonus: 5.5,
                    health_bonus: 44.0,
                },
                &[("Steel", 4), ("Chain Mail", 1), ("Leather", 3)],
                6,
            ),
            RecipeId::HealthPotion => Recipe::new(
                self,
                "Health Potion",
                ItemRarity::Common,
                ItemKind::Consumable {
                    effect: ConsumableEffect::Heal { amount: 50.0 },
                    quantity: 3,
                },
                &[("Herb", 2), ("Water", 1)],
                1,
            ),
        }
    }
}

impl Recipe {
    fn new(
        id: RecipeId,
        output_name: &'static str,
        rarity: ItemRarity,
        kind: ItemKind,
        materials: &'static [(&'static str, u32)],
        required_level: u32,
    ) -> Self {
        Self {
            id,
            output_name,
            rarity,
            kind,
            materials,
            required_level,
        }
    }

    pub fn output(&self, id: ItemId) -> Item {
        Item {
            id,
            name: self.output_name.to_string(),
            rarity: self.rarity,
            kind: self.kind,
        }
    }

    /// Consumes the ingredients and adds the output as item `id`. Items in
    /// `reserved` (equipped gear) never count as ingredients.
    pub fn craft_into(
        &self,
        inventory: &mut Inventory,
        level: u32,
        reserved: &[ItemId],
        id: ItemId,
    ) -> Result<Item, ItemError> {
        if level < self.required_level {
            return Err(ItemError::LevelTooLow {
                recipe: self.id,
                required: self.required_level,
                level,
            });
        }
        let mut staged = inventory.clone();
        for &(material, needed) in self.materials {
            let have = staged.count_named(material, reserved);
            if !staged.remove_named(material, needed, reserved) {
                return Err(ItemError::MissingMaterial {
                    material,
                    needed,
                    have,
                });
            }
        }
        let item = self.output(id);
        if staged.try_add(item.clone()).is_err() {
            return Err(ItemError::InventoryFull {
                capacity: staged.capacity(),
            });
        }
        *inventory = staged;
        Ok(item)
    }
}

/// Raw materials enemies can drop, with relative weights.
const MATERIALS: [(&str, ItemRarity, u32); 9] = [
    ("Iron Ore", ItemRarity::Common, 14),
    ("Wood", ItemRarity::Common, 10),
    ("Leather", ItemRarity::Common, 14),
    ("Thread", ItemRarity::Common, 10),
    ("Herb", ItemRarity::Common, 12),
    ("Water", ItemRarity::Common, 10),
    ("Steel", ItemRarity::Uncommon, 18),
    ("Magic Crystal", ItemRarity::Rare, 8),
    ("Enchanted Essence", ItemRarity::Rare, 4),
];

/// Rolls one or two units of a raw material. Deterministic in `seed`.
pub fn roll_material(seed: u64) -> Item {
    let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
    let total: u32 = MATERIALS.iter().map(|(_, _, weight)| weight).sum();
    let mut roll = rng.gen_range(0..total);
    let mut chosen = MATERIALS[0];
    for entry in MATERIALS {
        if roll < entry.2 {
            chosen = entry;
            break;
        }
        roll -= entry.2;
    }
    let (name, rarity, _) = chosen;
    Item {
        id: ItemId(seed),
        name: name.to_string(),
        rarity,
        kind: ItemKind::Material {
            quantity: rng.gen_range(1..=2),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn material(id: u64, name: &str, quantity: u32) -> Item {
        let rarity = MATERIALS
            .iter()
            .find(|(n, _, _)| *n == name)
            .map_or(ItemRarity::Common, |(_, rarity, _)| *rarity);
        Item {
            id: ItemId(id),
            name: name.to_string(),
            rarity,
            kind: ItemKind::Material { quantity },
        }
    }

    #[test]
    fn test_iron_sword_consumes_materials() {
        let mut inventory = Inventory::new(8);
        inventory.try_add(material(1, "Iron Ore", 4)).unwrap();
        inventory.try_add(material(2, "Wood", 1)).unwrap();

        let sword = RecipeId::IronSword
            .recipe()
            .craft_into(&mut inventory, 2, &[], ItemId(100))
            .unwrap();
        assert_eq!(sword.name, "Iron Sword");
        assert_eq!(sword.kind, ItemKind::Weapon { attack_bonus: 4.0 });
        assert_eq!(inventory.count_named("Iron Ore", &[]), 1);
        assert_eq!(inventory.count_named("Wood", &[]), 0);
        assert!(inventory.contains(ItemId(100)));
    }

    #[test]
    fn test_missing_material_leaves_inventory_untouched() {
        let mut inventory = Inventory::new(8);
        inventory.try_add(material(1, "Iron Ore", 3)).unwrap();
        let before = inventory.items().to_vec();

        let err = RecipeId::IronSword
            .recipe()
            .craft_into(&mut inventory, 5, &[], ItemId(100))
            .unwrap_err();
        assert_eq!(
            err,
            ItemError::MissingMaterial {
                material: "Wood",
                needed: 1,
                have: 0
            }
        );
        assert_eq!(inventory.items(), before.as_slice());
    }

    #[test]
    fn test_level_gate() {
        let mut inventory = Inventory::new(8);
        let err = RecipeId::PlateArmor
            .recipe()
            .craft_into(&mut inventory, 3, &[], ItemId(1))
            .unwrap_err();
        assert_eq!(
            err,
            ItemError::LevelTooLow {
                recipe: RecipeId::PlateArmor,
                required: 6,
                level: 3
            }
        );
    }

    #[test]
    fn test_reserved_items_are_not_ingredients() {
        let mut inventory = Inventory::new(8);
        inventory
            .try_add(RecipeId::IronSword.recipe().output(ItemId(7)))
            .unwrap();
        inventory.try_add(material(1, "Steel", 2)).unwrap();
        inventory.try_add(material(2, "Leather", 1)).unwrap();

        let recipe = RecipeId::SteelSword.recipe();
        let err = recipe
            .craft_into(&mut inventory, 5, &[ItemId(7)], ItemId(8))
            .unwrap_err();
        assert!(matches!(err, ItemError::MissingMaterial { material: "Iron Sword", .. }));

        recipe.craft_into(&mut inventory, 5, &[], ItemId(8)).unwrap();
        assert!(!inventory.contains(ItemId(7)));
        assert_eq!(inventory.len(), 1);
    }

    #[test]
    fn test_crafted_potions_join_existing_stack() {
        let mut inventory = Inventory::new(3);
        inventory.try_add(material(1, "Herb", 2)).unwrap();
        inventory.try_add(material(2, "Water", 1)).unwrap();
        let single = Item {
            kind: ItemKind::Consumable {
                effect: ConsumableEffect::Heal { amount: 50.0 },
                quantity: 1,
            },
            ..RecipeId::HealthPotion.recipe().output(ItemId(3))
        };
        inventory.try_add(single).unwrap();
        let before = inventory.items()[2].quantity();

        RecipeId::HealthPotion
            .recipe()
            .craft_into(&mut inventory, 1, &[], ItemId(4))
            .unwrap();
        assert_eq!(inventory.len(), 1);
        assert_eq!(inventory.items()[0].quantity(), before + 3);
    }

    #[test]
    fn test_full_inventory_rejects_output() {
        let mut inventory = Inventory::new(2);
        inventory.try_add(material(1, "Leather", 5)).unwrap();
        inventory.try_add(material(2, "Thread", 3)).unwrap();
        let before = inventory.items().to_vec();

        let err = RecipeId::LeatherArmor
            .recipe()
            .craft_into(&mut inventory, 1, &[], ItemId(3))
            .unwrap_err();
        assert_eq!(err, ItemError::InventoryFull { capacity: 2 });
        assert_eq!(inventory.items(), before.as_slice());
    }

    #[test]
    fn test_roll_material_deterministic_and_stackable() {
        assert_eq!(roll_material(9), roll_material(9));
        for seed in 0..200 {
            let item = roll_material(seed);
            assert!(item.is_stackable());
            assert!((1..=2).contains(&item.quantity()));
            assert!(MATERIALS.iter().any(|(name, _, _)| *name == item.name));
        }
    }

    #[test]
    fn test_every_recipe_has_ingredients() {
        for id in RecipeId::ALL {
            let recipe = id.recipe();
            assert_eq!(recipe.id, id);
            assert!(!recipe.materials.is_empty(), "{}", id.as_str());
            assert!(recipe.required_level >= 1);
        }
    }
}
