//! Edge case & boundary tests
//!
//! Behavior at system boundaries:
//! - Out-of-range tile lookups → void sentinel or `OutOfBounds`, never a panic
//! - Invalid configuration → rejected before any tile is generated
//! - Worlds with no walkable ground
//! - Item operations that must be no-ops
//! - Combat cooldowns and the damage floor
//! - Non-finite tick durations

use bevy::math::Vec2;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256StarStar;

use roguelike_core::combat::{resolve_attack, AttackRejection, CombatSettings};
use roguelike_core::entity::ai::AiBrain;
use roguelike_core::entity::{BaseStats, EnemyArchetype, Entity, EntityId, ProgressionSettings};
use roguelike_core::error::{GenerationError, ItemError, SimulationError};
use roguelike_core::generation::biome::{Biome, BiomeClassifier, BiomeThresholds};
use roguelike_core::generation::{generate_world, GeneratedWorld, GenerationReport};
use roguelike_core::loot::inventory::EquipSlot;
use roguelike_core::loot::{ConsumableEffect, Item, ItemId, ItemKind, ItemRarity, RarityWeights};
use roguelike_core::world::{Tile, TileCoord, WorldGrid};
use roguelike_core::{PlayerAction, Simulation, WorldConfig};

// ============================================================
// Helpers
// ============================================================

fn sword(id: u64) -> Item {
    Item {
        id: ItemId(id),
        name: "Iron Sword".to_string(),
        rarity: ItemRarity::Common,
        kind: ItemKind::Weapon { attack_bonus: 3.0 },
    }
}

fn potion(id: u64, quantity: u32) -> Item {
    Item {
        id: ItemId(id),
        name: "Health Potion".to_string(),
        rarity: ItemRarity::Common,
        kind: ItemKind::Consumable {
            effect: ConsumableEffect::Heal { amount: 30.0 },
            quantity,
        },
    }
}

fn player() -> Entity {
    Entity::player(EntityId(0), Vec2::new(0.5, 0.5), &ProgressionSettings::default(), 3)
}

// ============================================================
// 1. World grid boundaries
// ============================================================

#[test]
fn test_tile_at_out_of_range_returns_void() {
    let grid = WorldGrid::filled(10, 10, Biome::Grass);
    for (x, y) in [(-1, 0), (0, -1), (10, 0), (0, 10), (i32::MAX, i32::MIN)] {
        let tile = grid.tile_at(x, y);
        assert_eq!(tile.biome, Biome::Void, "({x}, {y}) should be void");
        assert!(!tile.walkable);
        assert!(tile.movement_cost.is_infinite());
        assert!(grid.try_tile(x, y).is_err());
    }
    assert_eq!(grid.try_tile(9, 9).map(|t| t.biome), Ok(Biome::Grass));
}

#[test]
fn test_place_item_outside_world_fails() {
    let mut grid = WorldGrid::filled(4, 4, Biome::Grass);
    let err = grid.place_item(TileCoord::new(4, 0), sword(1)).unwrap_err();
    assert_eq!((err.x, err.y, err.width, err.height), (4, 0, 4, 4));
    assert_eq!(grid.ground_item_count(), 0);
}

#[test]
fn test_water_tile_example() {
    // 100x100 world, seed 42, water level -0.3: elevation -0.5 is water.
    let config = WorldConfig {
        seed: 42,
        width: 100,
        height: 100,
        ..Default::default()
    };
    assert_eq!(config.biomes.water_level, -0.3);
    let classifier = BiomeClassifier::new(config.biomes).unwrap();
    let biome = classifier.classify(-0.5, 0.0);
    assert_eq!(biome, Biome::Water);
    let tile = Tile::from_biome(TileCoord::new(0, 0), biome);
    assert!(!tile.walkable);
    assert!(tile.movement_cost.is_infinite());

    let world = generate_world(&config).unwrap();
    assert_eq!(world.grid.width(), 100);
    let corner = world.grid.tile_at(0, 0);
    assert_eq!(corner.walkable, corner.biome.is_walkable());
}

// ============================================================
// 2. Configuration validation
// ============================================================

#[test]
fn test_invalid_dimensions_rejected() {
    for (width, height) in [(0, 100), (100, 0), (7, 7), (5000, 10)] {
        let config = WorldConfig {
            width,
            height,
            ..Default::default()
        };
        assert!(
            matches!(
                generate_world(&config),
                Err(GenerationError::InvalidConfiguration { .. })
            ),
            "{width}x{height} should be rejected"
        );
    }
}

#[test]
fn test_inverted_thresholds_rejected() {
    let thresholds = BiomeThresholds {
        water_level: 0.5,
        forest_level: 0.1,
        ..Default::default()
    };
    assert!(BiomeClassifier::new(thresholds).is_err());
    let config = WorldConfig {
        biomes: thresholds,
        ..Default::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_all_zero_rarity_weights_rejected() {
    let mut config = WorldConfig::default();
    config.loot.rarity_weights = RarityWeights {
        common: 0.0,
        uncommon: 0.0,
        rare: 0.0,
        epic: 0.0,
        legendary: 0.0,
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_simulation_error_wraps_generation_error() {
    let config = WorldConfig {
        width: 2,
        ..Default::default()
    };
    assert!(matches!(
        Simulation::new(config),
        Err(SimulationError::Generation(_))
    ));
}

#[test]
fn test_all_water_world_has_no_spawn() {
    let config = WorldConfig {
        width: 16,
        height: 16,
        ..Default::default()
    };
    let generated = GeneratedWorld {
        grid: WorldGrid::filled(16, 16, Biome::Water),
        report: GenerationReport::default(),
    };
    assert!(matches!(
        Simulation::from_world(config, generated),
        Err(SimulationError::NoWalkableTile(_))
    ));
}

// ============================================================
// 3. Item operations that must be no-ops
// ============================================================

#[test]
fn test_weapon_into_armor_slot_is_noop() {
    let mut entity = player();
    entity.pick_up(sword(1)).unwrap();
    let before = entity.stats();
    let max_before = entity.max_health();
    assert_eq!(
        entity.equip(ItemId(1), EquipSlot::Armor),
        Err(ItemError::IncompatibleSlot {
            item: ItemId(1),
            slot: EquipSlot::Armor
        })
    );
    assert_eq!(entity.stats(), before);
    assert_eq!(entity.max_health(), max_before);
    assert!(entity.equipment.get(EquipSlot::Armor).is_none());
}

#[test]
fn test_item_errors() {
    let mut entity = player();
    assert_eq!(
        entity.equip(ItemId(9), EquipSlot::Weapon),
        Err(ItemError::NotInInventory(ItemId(9)))
    );
    assert_eq!(
        entity.unequip(EquipSlot::Weapon),
        Err(ItemError::SlotEmpty(EquipSlot::Weapon))
    );
    entity.pick_up(sword(1)).unwrap();
    assert_eq!(entity.consume(ItemId(1)), Err(ItemError::NotConsumable(ItemId(1))));
    assert!(entity.inventory.contains(ItemId(1)));
}

#[test]
fn test_inventory_capacity_and_stacking() {
    let mut entity = player();
    entity.pick_up(sword(1)).unwrap();
    entity.pick_up(sword(2)).unwrap();
    entity.pick_up(potion(3, 1)).unwrap();
    assert!(entity.inventory.is_full());
    // Same potion stacks instead of needing a slot.
    entity.pick_up(potion(4, 1)).unwrap();
    assert_eq!(entity.inventory.len(), 3);
    let rejected = entity.pick_up(sword(5)).unwrap_err();
    assert_eq!(rejected.id, ItemId(5));
}

#[test]
fn test_consuming_last_potion_removes_it() {
    let mut entity = player();
    entity.pick_up(potion(3, 1)).unwrap();
    entity.health.apply_damage(100.0);
    let effect = entity.consume(ItemId(3)).unwrap();
    assert_eq!(effect, ConsumableEffect::Heal { amount: 30.0 });
    assert_eq!(entity.health.current(), 80.0);
    assert!(entity.inventory.is_empty());
    assert_eq!(entity.consume(ItemId(3)), Err(ItemError::NotInInventory(ItemId(3))));
}

#[test]
fn test_heal_never_exceeds_max() {
    let mut entity = player();
    entity.pick_up(potion(3, 2)).unwrap();
    entity.health.apply_damage(5.0);
    entity.consume(ItemId(3)).unwrap();
    assert_eq!(entity.health.current(), entity.health.max());
}

// ============================================================
// 4. Combat boundaries
// ============================================================

#[test]
fn test_damage_example_respects_cooldown() {
    // Enemy attack 10 against player defense 4 deals 6 per hit.
    let mut progression = ProgressionSettings::default();
    progression.player = BaseStats {
        defense: 4.0,
        ..progression.player
    };
    progression.enemy = BaseStats {
        attack: 10.0,
        ..progression.enemy
    };
    let settings = CombatSettings::default();
    let mut target = Entity::player(EntityId(0), Vec2::ZERO, &progression, 4);
    let mut enemy = Entity::enemy(
        EntityId(1),
        EnemyArchetype::Basic,
        1,
        Vec2::new(1.0, 0.0),
        &progression,
        AiBrain::default(),
    );

    let first = resolve_attack(&mut enemy, &mut target, &settings).unwrap();
    assert_eq!(first.damage, 6.0);
    assert!(matches!(
        resolve_attack(&mut enemy, &mut target, &settings),
        Err(AttackRejection::OnCooldown { .. })
    ));
    enemy.tick_timers(settings.enemy_attack_cooldown);
    let second = resolve_attack(&mut enemy, &mut target, &settings).unwrap();
    assert_eq!(second.damage, 6.0);
    assert_eq!(target.health.current(), target.health.max() - 12.0);
}

#[test]
fn test_overwhelming_defense_still_takes_minimum_damage() {
    let mut progression = ProgressionSettings::default();
    progression.player.defense = 1_000.0;
    let settings = CombatSettings::default();
    let mut target = Entity::player(EntityId(0), Vec2::ZERO, &progression, 4);
    let mut enemy = Entity::enemy(
        EntityId(1),
        EnemyArchetype::Goblin,
        1,
        Vec2::new(0.5, 0.0),
        &progression,
        AiBrain::default(),
    );
    let outcome = resolve_attack(&mut enemy, &mut target, &settings).unwrap();
    assert_eq!(outcome.damage, settings.min_damage);
}

#[test]
fn test_out_of_range_and_dead_targets() {
    let progression = ProgressionSettings::default();
    let settings = CombatSettings::default();
    let mut attacker = player();
    let mut far = Entity::enemy(
        EntityId(1),
        EnemyArchetype::Orc,
        1,
        Vec2::new(10.0, 10.0),
        &progression,
        AiBrain::default(),
    );
    assert!(matches!(
        resolve_attack(&mut attacker, &mut far, &settings),
        Err(AttackRejection::OutOfRange { .. })
    ));
    far.position = attacker.position;
    let max = far.health.max();
    far.health.apply_damage(max + 50.0);
    assert_eq!(far.health.current(), 0.0);
    assert_eq!(
        resolve_attack(&mut attacker, &mut far, &settings),
        Err(AttackRejection::TargetDead)
    );
}

// ============================================================
// 5. Loot distribution
// ============================================================

#[test]
fn test_rare_fraction_matches_weight() {
    // Default table: common 70, rare 5 out of 100.
    let weights = RarityWeights::default();
    let mut rng = Xoshiro256StarStar::seed_from_u64(42);
    let draws = 10_000;
    let rare = (0..draws)
        .filter(|_| weights.draw(&mut rng) == ItemRarity::Rare)
        .count();
    let fraction = rare as f32 / draws as f32;
    assert!((fraction - 0.05).abs() < 0.01, "rare fraction {fraction}");
}

#[test]
fn test_two_tier_table_never_rolls_missing_tiers() {
    let weights = RarityWeights {
        common: 70.0,
        uncommon: 0.0,
        rare: 5.0,
        epic: 0.0,
        legendary: 0.0,
    };
    let mut rng = Xoshiro256StarStar::seed_from_u64(7);
    let mut rare = 0;
    for _ in 0..10_000 {
        match weights.draw(&mut rng) {
            ItemRarity::Rare => rare += 1,
            ItemRarity::Common => {}
            other => panic!("rolled zero-weight tier {other:?}"),
        }
    }
    let expected = weights.probability(ItemRarity::Rare);
    let fraction = rare as f32 / 10_000.0;
    assert!((fraction - expected).abs() < 0.012, "rare fraction {fraction}, expected {expected}");
}

// ============================================================
// 6. Simulation inputs
// ============================================================

#[test]
fn test_non_finite_dt_is_ignored() {
    let config = WorldConfig {
        width: 32,
        height: 32,
        ..Default::default()
    };
    let mut sim = Simulation::new(config).unwrap();
    let start = sim.player().position;
    for dt in [f32::NAN, f32::INFINITY, -1.0] {
        sim.tick(&[PlayerAction::Move(Vec2::X)], dt);
    }
    assert_eq!(sim.player().position, start);
    assert_eq!(sim.elapsed(), 0.0);
}

#[test]
fn test_oversized_move_vector_is_clamped() {
    let mut config = WorldConfig {
        width: 32,
        height: 32,
        ..Default::default()
    };
    config.spawning.target_per_region = 0;
    let generated = GeneratedWorld {
        grid: WorldGrid::filled(32, 32, Biome::Grass),
        report: GenerationReport::default(),
    };
    let mut sim = Simulation::from_world(config, generated).unwrap();
    let start = sim.player().position;
    sim.tick(&[PlayerAction::Move(Vec2::new(1000.0, 0.0))], 0.5);
    let moved = sim.player().position.distance(start);
    let speed = sim.player().stats().speed;
    assert!((moved - speed * 0.5).abs() < 1e-3, "moved {moved}");
}
