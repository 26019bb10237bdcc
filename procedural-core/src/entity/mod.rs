//! Simulated actors: the player and enemies.
//!
//! Stats are layered: level stats come from a template plus per-level growth,
//! equipment adds the deltas recorded at equip time, timed modifiers add on
//! top. Effective stats are recomputed on read, so removing a layer restores
//! the previous values exactly.

pub mod ai;

use std::ops::{Add, AddAssign, Neg};

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::constants::{RAGE_ATTACK_BONUS, RAGE_SPEED_BONUS};
use crate::error::{GenerationError, ItemError};
use crate::loot::crafting::RecipeId;
use crate::loot::inventory::{EquipSlot, Equipment, EquippedItem, Inventory};
use crate::loot::{ConsumableEffect, Item, ItemId, ItemKind};

use self::ai::AiBrain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Enemy(EnemyArchetype),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EnemyArchetype {
    Basic,
    Goblin,
    Orc,
    Skeleton,
    Elite,
    Boss,
}

/// A heavy blow that replaces a regular attack whenever it is off cooldown.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbilityProfile {
    pub damage_multiplier: f32,
    pub cooldown_secs: f32,
}

/// Multipliers applied to the enemy template, plus the extras that set the
/// elite and boss tiers apart.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArchetypeProfile {
    pub health: f32,
    pub attack: f32,
    pub defense: f32,
    pub speed: f32,
    pub detection: f32,
    pub xp_multiplier: u32,
    /// Health fraction at or below which the enemy enrages.
    pub rage_threshold: Option<f32>,
    pub ability: Option<AbilityProfile>,
}

impl EnemyArchetype {
    pub const ALL: [EnemyArchetype; 6] = [
        EnemyArchetype::Basic,
        EnemyArchetype::Goblin,
        EnemyArchetype::Orc,
        EnemyArchetype::Skeleton,
        EnemyArchetype::Elite,
        EnemyArchetype::Boss,
    ];

    /// Archetypes drawn by regular spawn waves.
    pub const REGULAR: [EnemyArchetype; 4] = [
        EnemyArchetype::Basic,
        EnemyArchetype::Goblin,
        EnemyArchetype::Orc,
        EnemyArchetype::Skeleton,
    ];

    pub fn profile(self) -> ArchetypeProfile {
        let (health, attack, defense, speed, detection) = match self {
            EnemyArchetype::Basic => (1.0, 1.0, 1.0, 1.0, 1.0),
            EnemyArchetype::Goblin => (1.0, 0.8, 0.5, 0.8, 1.2),
            EnemyArchetype::Orc => (3.0, 1.5, 1.5, 0.6, 0.8),
            EnemyArchetype::Skeleton => (1.0, 1.2, 1.0, 1.2, 1.0),
            EnemyArchetype::Elite => (4.0, 1.8, 2.5, 1.1, 1.2),
            EnemyArchetype::Boss => (10.0, 2.5, 4.0, 0.8, 1.5),
        };
        let (xp_multiplier, rage_threshold, ability) = match self {
            EnemyArchetype::Elite => (
                3,
                None,
                Some(AbilityProfile {
                    damage_multiplier: 1.5,
                    cooldown_secs: 6.0,
                }),
            ),
            EnemyArchetype::Boss => (
                10,
                Some(0.3),
                Some(AbilityProfile {
                    damage_multiplier: 2.0,
                    cooldown_secs: 5.0,
                }),
            ),
            _ => (1, None, None),
        };
        ArchetypeProfile {
            health,
            attack,
            defense,
            speed,
            detection,
            xp_multiplier,
            rage_threshold,
            ability,
        }
    }

    pub fn is_regular(self) -> bool {
        !matches!(self, EnemyArchetype::Elite | EnemyArchetype::Boss)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EnemyArchetype::Basic => "enemy",
            EnemyArchetype::Goblin => "goblin",
            EnemyArchetype::Orc => "orc",
            EnemyArchetype::Skeleton => "skeleton",
            EnemyArchetype::Elite => "elite",
            EnemyArchetype::Boss => "boss",
        }
    }
}

/// Combat-relevant stats. Speed is in tiles per second on cost-1 terrain.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatBlock {
    pub attack: f32,
    pub defense: f32,
    pub speed: f32,
}

/// Additive stat change from equipment or a timed effect.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatDelta {
    pub attack: f32,
    pub defense: f32,
    pub speed: f32,
    pub max_health: f32,
}

impl StatDelta {
    pub const ZERO: StatDelta = StatDelta {
        attack: 0.0,
        defense: 0.0,
        speed: 0.0,
        max_health: 0.0,
    };
}

impl Add for StatDelta {
    type Output = StatDelta;

    fn add(self, rhs: StatDelta) -> StatDelta {
        StatDelta {
            attack: self.attack + rhs.attack,
            defense: self.defense + rhs.defense,
            speed: self.speed + rhs.speed,
            max_health: self.max_health + rhs.max_health,
        }
    }
}

impl AddAssign for StatDelta {
    fn add_assign(&mut self, rhs: StatDelta) {
        *self = *self + rhs;
    }
}

impl Neg for StatDelta {
    type Output = StatDelta;

    fn neg(self) -> StatDelta {
        StatDelta {
            attack: -self.attack,
            defense: -self.defense,
            speed: -self.speed,
            max_health: -self.max_health,
        }
    }
}

impl Add<StatDelta> for StatBlock {
    type Output = StatBlock;

    fn add(self, rhs: StatDelta) -> StatBlock {
        StatBlock {
            attack: (self.attack + rhs.attack).max(0.0),
            defense: (self.defense + rhs.defense).max(0.0),
            speed: (self.speed + rhs.speed).max(0.0),
        }
    }
}

/// Health clamped to `[0, max]` at every mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    current: f32,
    max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        let max = max.max(1.0);
        Self { current: max, max }
    }

    pub fn current(&self) -> f32 {
        self.current
    }

    pub fn max(&self) -> f32 {
        self.max
    }

    pub fn fraction(&self) -> f32 {
        self.current / self.max
    }

    pub fn is_depleted(&self) -> bool {
        self.current <= 0.0
    }

    /// Returns the damage actually absorbed.
    pub fn apply_damage(&mut self, amount: f32) -> f32 {
        let dealt = amount.max(0.0).min(self.current);
        self.current -= dealt;
        dealt
    }

    /// Returns the health actually restored.
    pub fn heal(&mut self, amount: f32) -> f32 {
        let healed = amount.max(0.0).min(self.max - self.current);
        self.current += healed;
        healed
    }

    pub fn set_max(&mut self, max: f32) {
        self.max = max.max(1.0);
        self.current = self.current.min(self.max);
    }

    pub fn restore_full(&mut self) {
        self.current = self.max;
    }
}

/// Level-1 stats for one kind of entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseStats {
    pub max_health: f32,
    pub attack: f32,
    pub defense: f32,
    pub speed: f32,
}

impl BaseStats {
    pub fn scaled(&self, profile: &ArchetypeProfile) -> Self {
        Self {
            max_health: self.max_health * profile.health,
            attack: self.attack * profile.attack,
            defense: self.defense * profile.defense,
            speed: self.speed * profile.speed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionSettings {
    pub player: BaseStats,
    pub enemy: BaseStats,
    /// Experience for defeating a level-1 enemy; scales linearly with level.
    pub base_xp: u32,
    /// Experience needed to go from level 1 to level 2.
    pub first_level_xp: u32,
    pub xp_growth: f32,
    pub health_per_level: f32,
    pub attack_per_level: f32,
    pub defense_per_level: f32,
    pub max_level: u32,
}

impl Default for ProgressionSettings {
    fn default() -> Self {
        Self {
            player: BaseStats {
                max_health: 150.0,
                attack: 15.0,
                defense: 8.0,
                speed: 6.0,
            },
            enemy: BaseStats {
                max_health: 50.0,
                attack: 10.0,
                defense: 2.0,
                speed: 3.0,
            },
            base_xp: 20,
            first_level_xp: 100,
            xp_growth: 1.2,
            health_per_level: 10.0,
            attack_per_level: 2.0,
            defense_per_level: 1.0,
            max_level: 50,
        }
    }
}

impl ProgressionSettings {
    /// Each requirement is the previous one times the growth factor, truncated.
    pub fn xp_to_next_level(&self, level: u32) -> u32 {
        let mut required = self.first_level_xp;
        for _ in 1..level {
            required = (required as f32 * self.xp_growth) as u32;
        }
        required
    }

    pub fn kill_xp(&self, enemy_level: u32) -> u32 {
        enemy_level.max(1) * self.base_xp
    }

    pub fn validate(&self) -> Result<(), GenerationError> {
        for (field, stats) in [("progression.player", &self.player), ("progression.enemy", &self.enemy)] {
            if !(stats.max_health > 0.0 && stats.speed >= 0.0 && stats.attack >= 0.0 && stats.defense >= 0.0) {
                return Err(GenerationError::invalid(
                    field,
                    "needs positive health and non-negative attack, defense and speed",
                ));
            }
        }
        if self.first_level_xp == 0 {
            return Err(GenerationError::invalid(
                "progression.first_level_xp",
                "must be at least 1",
            ));
        }
        if !(self.xp_growth >= 1.0) {
            return Err(GenerationError::invalid(
                "progression.xp_growth",
                "must be at least 1",
            ));
        }
        if self.max_level == 0 {
            return Err(GenerationError::invalid(
                "progression.max_level",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    fn level_stats(&self, template: &BaseStats, level: u32) -> (StatBlock, f32) {
        let gained = level.saturating_sub(1) as f32;
        let stats = StatBlock {
            attack: template.attack + self.attack_per_level * gained,
            defense: template.defense + self.defense_per_level * gained,
            speed: template.speed,
        };
        (stats, template.max_health + self.health_per_level * gained)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedModifier {
    pub delta: StatDelta,
    pub remaining_secs: f32,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec2,
    pub health: Health,
    pub level: u32,
    pub experience: u32,
    pub inventory: Inventory,
    pub equipment: Equipment,
    pub ai: Option<AiBrain>,
    /// Seconds until the next attack is allowed.
    pub attack_cooldown: f32,
    /// Seconds until the archetype ability is ready again.
    pub ability_cooldown: f32,
    enraged: bool,
    template: BaseStats,
    level_stats: StatBlock,
    level_max_health: f32,
    modifiers: Vec<TimedModifier>,
}

impl Entity {
    fn new(
        id: EntityId,
        kind: EntityKind,
        position: Vec2,
        level: u32,
        template: BaseStats,
        progression: &ProgressionSettings,
        inventory_capacity: usize,
    ) -> Self {
        let level = level.max(1);
        let (level_stats, level_max_health) = progression.level_stats(&template, level);
        Self {
            id,
            kind,
            position,
            health: Health::new(level_max_health),
            level,
            experience: 0,
            inventory: Inventory::new(inventory_capacity),
            equipment: Equipment::default(),
            ai: None,
            attack_cooldown: 0.0,
            ability_cooldown: 0.0,
            enraged: false,
            template,
            level_stats,
            level_max_health,
            modifiers: Vec::new(),
        }
    }

    pub fn player(
        id: EntityId,
        position: Vec2,
        progression: &ProgressionSettings,
        inventory_capacity: usize,
    ) -> Self {
        Self::new(
            id,
            EntityKind::Player,
            position,
            1,
            progression.player,
            progression,
            inventory_capacity,
        )
    }

    pub fn enemy(
        id: EntityId,
        archetype: EnemyArchetype,
        level: u32,
        position: Vec2,
        progression: &ProgressionSettings,
        brain: AiBrain,
    ) -> Self {
        let template = progression.enemy.scaled(&archetype.profile());
        let mut entity = Self::new(
            id,
            EntityKind::Enemy(archetype),
            position,
            level,
            template,
            progression,
            0,
        );
        entity.ai = Some(brain);
        entity
    }

    pub fn is_player(&self) -> bool {
        self.kind == EntityKind::Player
    }

    pub fn archetype(&self) -> Option<EnemyArchetype> {
        match self.kind {
            EntityKind::Enemy(archetype) => Some(archetype),
            EntityKind::Player => None,
        }
    }

    pub fn sprite_tag(&self) -> &'static str {
        match self.kind {
            EntityKind::Player => "player",
            EntityKind::Enemy(archetype) => archetype.as_str(),
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.health.is_depleted()
    }

    /// Effective stats: level stats plus equipment plus active modifiers.
    pub fn stats(&self) -> StatBlock {
        let timed = self
            .modifiers
            .iter()
            .fold(StatDelta::ZERO, |acc, m| acc + m.delta);
        self.level_stats + (self.equipment.total_delta() + timed)
    }

    pub fn max_health(&self) -> f32 {
        self.level_max_health + self.equipment.total_delta().max_health
    }

    pub fn active_modifiers(&self) -> &[TimedModifier] {
        &self.modifiers
    }

    /// Counts down the attack and ability cooldowns and expires timed
    /// modifiers.
    pub fn tick_timers(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        self.attack_cooldown = (self.attack_cooldown - dt).max(0.0);
        self.ability_cooldown = (self.ability_cooldown - dt).max(0.0);
        for modifier in &mut self.modifiers {
            modifier.remaining_secs -= dt;
        }
        self.modifiers.retain(|m| m.remaining_secs > 0.0);
    }

    pub fn ready_to_attack(&self) -> bool {
        self.attack_cooldown <= 0.0
    }

    /// The archetype ability, if it has one and it is off cooldown.
    pub fn ready_ability(&self) -> Option<AbilityProfile> {
        self.archetype()?
            .profile()
            .ability
            .filter(|_| self.ability_cooldown <= 0.0)
    }

    pub fn is_enraged(&self) -> bool {
        self.enraged
    }

    /// Enrages once health falls to the archetype's threshold. Rage lasts
    /// until death. Returns true on the tick it starts.
    pub fn update_rage(&mut self) -> bool {
        let Some(threshold) = self.archetype().and_then(|a| a.profile().rage_threshold) else {
            return false;
        };
        if self.enraged || !self.is_alive() || self.health.fraction() > threshold {
            return false;
        }
        self.enraged = true;
        self.modifiers.push(TimedModifier {
            delta: StatDelta {
                attack: self.level_stats.attack * RAGE_ATTACK_BONUS,
                speed: self.level_stats.speed * RAGE_SPEED_BONUS,
                ..StatDelta::ZERO
            },
            remaining_secs: f32::INFINITY,
        });
        true
    }

    /// Adds experience and applies every level-up it pays for. Returns the
    /// levels reached, in order.
    pub fn gain_experience(&mut self, xp: u32, progression: &ProgressionSettings) -> Vec<u32> {
        self.experience = self.experience.saturating_add(xp);
        let mut reached = Vec::new();
        while self.level < progression.max_level {
            let required = progression.xp_to_next_level(self.level);
            if self.experience < required {
                break;
            }
            self.experience -= required;
            self.level += 1;
            reached.push(self.level);
        }
        if !reached.is_empty() {
            let (level_stats, level_max_health) =
                progression.level_stats(&self.template, self.level);
            self.level_stats = level_stats;
            self.level_max_health = level_max_health;
            self.health.set_max(self.max_health());
            self.health.restore_full();
        }
        reached
    }

    pub fn pick_up(&mut self, item: Item) -> Result<(), Item> {
        self.inventory.try_add(item)
    }

    /// Equips an owned item. Returns the item previously in the slot, if any.
    pub fn equip(&mut self, id: ItemId, slot: EquipSlot) -> Result<Option<ItemId>, ItemError> {
        let item = self.inventory.get(id).ok_or(ItemError::NotInInventory(id))?;
        if item.slot() != Some(slot) {
            return Err(ItemError::IncompatibleSlot { item: id, slot });
        }
        if self.equipment.get(slot).is_some_and(|e| e.id == id) {
            return Ok(None);
        }
        let delta = item.equip_delta();
        let previous = self.equipment.set(slot, Some(EquippedItem { id, delta }));
        self.health.set_max(self.max_health());
        Ok(previous.map(|p| p.id))
    }

    pub fn unequip(&mut self, slot: EquipSlot) -> Result<ItemId, ItemError> {
        let previous = self.equipment.set(slot, None).ok_or(ItemError::SlotEmpty(slot))?;
        self.health.set_max(self.max_health());
        Ok(previous.id)
    }

    /// Uses one unit of a consumable and applies its effect.
    pub fn consume(&mut self, id: ItemId) -> Result<ConsumableEffect, ItemError> {
        let item = self.inventory.get(id).ok_or(ItemError::NotInInventory(id))?;
        let ItemKind::Consumable { effect, .. } = item.kind else {
            return Err(ItemError::NotConsumable(id));
        };
        self.inventory.take_one(id);
        match effect {
            ConsumableEffect::Heal { amount } => {
                self.health.heal(amount);
            }
            ConsumableEffect::Haste {
                speed_bonus,
                duration_secs,
            } => self.modifiers.push(TimedModifier {
                delta: StatDelta {
                    speed: speed_bonus,
                    ..StatDelta::ZERO
                },
                remaining_secs: duration_secs,
            }),
        }
        Ok(effect)
    }

    /// Crafts `recipe` into a new item `id`. Equipped gear is never used up
    /// as an ingredient.
    pub fn craft(&mut self, recipe: RecipeId, id: ItemId) -> Result<Item, ItemError> {
        let reserved = self.equipment.equipped_ids();
        recipe
            .recipe()
            .craft_into(&mut self.inventory, self.level, &reserved, id)
    }

    /// Removes an item from the inventory, unequipping it first if needed.
    pub fn drop_item(&mut self, id: ItemId) -> Result<Item, ItemError> {
        if !self.inventory.contains(id) {
            return Err(ItemError::NotInInventory(id));
        }
        if let Some(slot) = self.equipment.slot_of(id) {
            self.unequip(slot)?;
        }
        self.inventory.remove(id).ok_or(ItemError::NotInInventory(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loot::ItemRarity;

    fn player() -> Entity {
        Entity::player(EntityId(0), Vec2::ZERO, &ProgressionSettings::default(), 10)
    }

    fn weapon(id: u64, attack_bonus: f32) -> Item {
        Item {
            id: ItemId(id),
            name: "Steel Sword".to_string(),
            rarity: ItemRarity::Rare,
            kind: ItemKind::Weapon { attack_bonus },
        }
    }

    fn armor(id: u64) -> Item {
        Item {
            id: ItemId(id),
            name: "Chain Mail".to_string(),
            rarity: ItemRarity::Uncommon,
            kind: ItemKind::Armor {
                defense_bonus: 3.0,
                health_bonus: 20.0,
            },
        }
    }

    fn potion(id: u64, effect: ConsumableEffect) -> Item {
        Item {
            id: ItemId(id),
            name: "Potion".to_string(),
            rarity: ItemRarity::Common,
            kind: ItemKind::Consumable {
                effect,
                quantity: 1,
            },
        }
    }

    #[test]
    fn test_player_defaults() {
        let p = player();
        assert_eq!(p.health.max(), 150.0);
        assert_eq!(p.stats().attack, 15.0);
        assert_eq!(p.stats().defense, 8.0);
        assert_eq!(p.level, 1);
    }

    #[test]
    fn test_archetype_scaling() {
        let progression = ProgressionSettings::default();
        let orc = Entity::enemy(
            EntityId(1),
            EnemyArchetype::Orc,
            1,
            Vec2::ZERO,
            &progression,
            AiBrain::default(),
        );
        assert_eq!(orc.health.max(), 150.0);
        assert_eq!(orc.stats().attack, 15.0);
        let goblin = Entity::enemy(
            EntityId(2),
            EnemyArchetype::Goblin,
            1,
            Vec2::ZERO,
            &progression,
            AiBrain::default(),
        );
        assert_eq!(goblin.stats().attack, 8.0);
        assert!(goblin.stats().speed < progression.enemy.speed);
    }

    #[test]
    fn test_elite_and_boss_tiers() {
        let progression = ProgressionSettings::default();
        let elite = Entity::enemy(
            EntityId(3),
            EnemyArchetype::Elite,
            1,
            Vec2::ZERO,
            &progression,
            AiBrain::default(),
        );
        assert_eq!(elite.health.max(), 200.0);
        assert_eq!(elite.stats().attack, 18.0);
        assert!(elite.ready_ability().is_some());
        assert!(!elite.archetype().is_some_and(EnemyArchetype::is_regular));

        let boss = Entity::enemy(
            EntityId(4),
            EnemyArchetype::Boss,
            1,
            Vec2::ZERO,
            &progression,
            AiBrain::default(),
        );
        assert_eq!(boss.health.max(), 500.0);
        assert_eq!(boss.stats().attack, 25.0);
        assert_eq!(EnemyArchetype::Boss.profile().xp_multiplier, 10);
        assert!(EnemyArchetype::REGULAR.iter().all(|a| a.profile().ability.is_none()));
    }

    #[test]
    fn test_boss_enrages_once_below_threshold() {
        let mut boss = Entity::enemy(
            EntityId(4),
            EnemyArchetype::Boss,
            1,
            Vec2::ZERO,
            &ProgressionSettings::default(),
            AiBrain::default(),
        );
        boss.health.apply_damage(300.0);
        assert!(!boss.update_rage(), "40% health is above the threshold");
        boss.health.apply_damage(60.0);
        assert!(boss.update_rage());
        assert!(boss.is_enraged());
        assert_eq!(boss.stats().attack, 37.5);
        assert!((boss.stats().speed - 3.0 * 0.8 * 1.2).abs() < 1e-5);
        assert!(!boss.update_rage(), "rage starts only once");
        boss.tick_timers(1000.0);
        assert_eq!(boss.stats().attack, 37.5, "rage never expires");
    }

    #[test]
    fn test_ability_cooldown_ticks_down() {
        let mut elite = Entity::enemy(
            EntityId(5),
            EnemyArchetype::Elite,
            1,
            Vec2::ZERO,
            &ProgressionSettings::default(),
            AiBrain::default(),
        );
        elite.ability_cooldown = 6.0;
        assert!(elite.ready_ability().is_none());
        elite.tick_timers(5.0);
        assert!(elite.ready_ability().is_none());
        elite.tick_timers(1.0);
        assert_eq!(elite.ready_ability().map(|a| a.damage_multiplier), Some(1.5));
        assert!(player().ready_ability().is_none());
    }

    #[test]
    fn test_health_clamped() {
        let mut health = Health::new(100.0);
        assert_eq!(health.apply_damage(250.0), 100.0);
        assert_eq!(health.current(), 0.0);
        assert!(health.is_depleted());
        health.heal(500.0);
        assert_eq!(health.current(), 100.0);
        health.apply_damage(f32::NAN);
        assert_eq!(health.current(), 100.0);
        health.set_max(40.0);
        assert_eq!(health.current(), 40.0);
    }

    #[test]
    fn test_equip_unequip_symmetric() {
        let mut p = player();
        let before = p.stats();
        let before_max = p.max_health();
        p.pick_up(weapon(1, 7.0)).unwrap();
        p.pick_up(armor(2)).unwrap();

        p.equip(ItemId(1), EquipSlot::Weapon).unwrap();
        p.equip(ItemId(2), EquipSlot::Armor).unwrap();
        assert_eq!(p.stats().attack, before.attack + 7.0);
        assert_eq!(p.stats().defense, before.defense + 3.0);
        assert_eq!(p.max_health(), before_max + 20.0);

        p.unequip(EquipSlot::Weapon).unwrap();
        p.unequip(EquipSlot::Armor).unwrap();
        assert_eq!(p.stats(), before);
        assert_eq!(p.max_health(), before_max);
    }

    #[test]
    fn test_equip_replaces_previous() {
        let mut p = player();
        p.pick_up(weapon(1, 5.0)).unwrap();
        p.pick_up(weapon(2, 9.0)).unwrap();
        assert_eq!(p.equip(ItemId(1), EquipSlot::Weapon).unwrap(), None);
        assert_eq!(p.equip(ItemId(2), EquipSlot::Weapon).unwrap(), Some(ItemId(1)));
        assert_eq!(p.stats().attack, 15.0 + 9.0, "old bonus must be removed");
    }

    #[test]
    fn test_incompatible_slot_is_noop() {
        let mut p = player();
        p.pick_up(weapon(1, 5.0)).unwrap();
        let before = p.stats();
        let err = p.equip(ItemId(1), EquipSlot::Armor).unwrap_err();
        assert_eq!(
            err,
            ItemError::IncompatibleSlot {
                item: ItemId(1),
                slot: EquipSlot::Armor
            }
        );
        assert_eq!(p.stats(), before);
        assert!(p.equipment.get(EquipSlot::Armor).is_none());
    }

    #[test]
    fn test_equip_requires_ownership() {
        let mut p = player();
        assert_eq!(
            p.equip(ItemId(9), EquipSlot::Weapon),
            Err(ItemError::NotInInventory(ItemId(9)))
        );
        assert_eq!(
            p.unequip(EquipSlot::Weapon),
            Err(ItemError::SlotEmpty(EquipSlot::Weapon))
        );
    }

    #[test]
    fn test_consume_heal_and_haste() {
        let mut p = player();
        p.health.apply_damage(100.0);
        p.pick_up(potion(1, ConsumableEffect::Heal { amount: 50.0 }))
            .unwrap();
        p.consume(ItemId(1)).unwrap();
        assert_eq!(p.health.current(), 100.0);
        assert!(p.inventory.is_empty());

        let base_speed = p.stats().speed;
        p.pick_up(potion(
            2,
            ConsumableEffect::Haste {
                speed_bonus: 2.0,
                duration_secs: 1.0,
            },
        ))
        .unwrap();
        p.consume(ItemId(2)).unwrap();
        assert_eq!(p.stats().speed, base_speed + 2.0);
        p.tick_timers(1.5);
        assert_eq!(p.stats().speed, base_speed, "haste expires");
    }

    #[test]
    fn test_consume_rejects_equipment() {
        let mut p = player();
        p.pick_up(weapon(1, 5.0)).unwrap();
        assert_eq!(p.consume(ItemId(1)), Err(ItemError::NotConsumable(ItemId(1))));
        assert!(p.inventory.contains(ItemId(1)));
    }

    #[test]
    fn test_drop_unequips() {
        let mut p = player();
        p.pick_up(weapon(1, 5.0)).unwrap();
        p.equip(ItemId(1), EquipSlot::Weapon).unwrap();
        let dropped = p.drop_item(ItemId(1)).unwrap();
        assert_eq!(dropped.id, ItemId(1));
        assert_eq!(p.stats().attack, 15.0);
        assert!(p.equipment.get(EquipSlot::Weapon).is_none());
    }

    #[test]
    fn test_xp_curve() {
        let progression = ProgressionSettings::default();
        assert_eq!(progression.xp_to_next_level(1), 100);
        assert_eq!(progression.xp_to_next_level(2), 120);
        assert_eq!(progression.xp_to_next_level(3), 144);
        assert_eq!(progression.kill_xp(3), 60);
    }

    #[test]
    fn test_level_up_applies_growth() {
        let progression = ProgressionSettings::default();
        let mut p = player();
        p.health.apply_damage(60.0);
        let reached = p.gain_experience(230, &progression);
        assert_eq!(reached, vec![2, 3]);
        assert_eq!(p.experience, 10);
        assert_eq!(p.health.max(), 170.0);
        assert_eq!(p.health.current(), 170.0, "level-up restores health");
        assert_eq!(p.stats().attack, 19.0);
        assert_eq!(p.stats().defense, 10.0);
    }

    #[test]
    fn test_cooldown_ticks_down() {
        let mut p = player();
        p.attack_cooldown = 0.5;
        assert!(!p.ready_to_attack());
        p.tick_timers(0.3);
        assert!(!p.ready_to_attack());
        p.tick_timers(0.3);
        assert!(p.ready_to_attack());
    }

    #[test]
    fn test_craft_keeps_equipped_sword() {
        let mut p = player();
        p.level = 5;
        let iron = RecipeId::IronSword.recipe().output(ItemId(1));
        p.pick_up(iron).unwrap();
        p.equip(ItemId(1), EquipSlot::Weapon).unwrap();
        for (id, name) in [(2, "Steel"), (3, "Leather")] {
            p.pick_up(Item {
                id: ItemId(id),
                name: name.to_string(),
                rarity: ItemRarity::Common,
                kind: ItemKind::Material { quantity: 2 },
            })
            .unwrap();
        }

        let err = p.craft(RecipeId::SteelSword, ItemId(10)).unwrap_err();
        assert!(matches!(err, ItemError::MissingMaterial { material: "Iron Sword", have: 0, .. }));
        assert!(p.inventory.contains(ItemId(1)));

        p.unequip(EquipSlot::Weapon).unwrap();
        let steel = p.craft(RecipeId::SteelSword, ItemId(10)).unwrap();
        assert_eq!(steel.name, "Steel Sword");
        assert!(!p.inventory.contains(ItemId(1)));
        assert_eq!(p.inventory.count_named("Leather", &[]), 1);
    }
}
