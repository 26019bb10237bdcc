//! Melee combat resolution.
//!
//! Damage is `max(attack - defense, min_damage)`, so every landed hit moves a
//! fight forward. Attacks are gated by range and a per-attacker cooldown.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::entity::{Entity, EntityId};
use crate::error::GenerationError;

/// Distances are in tiles, cooldowns in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatSettings {
    pub min_damage: f32,
    pub player_attack_cooldown: f32,
    pub enemy_attack_cooldown: f32,
    pub player_attack_range: f32,
    pub enemy_attack_range: f32,
    pub enemy_detection_range: f32,
    /// Extra distance needed before an enemy drops out of Chase or Attack.
    pub hysteresis_margin: f32,
}

impl Default for CombatSettings {
    fn default() -> Self {
        Self {
            min_damage: 1.0,
            player_attack_cooldown: 0.5,
            enemy_attack_cooldown: 1.0,
            player_attack_range: 1.6,
            enemy_attack_range: 1.25,
            enemy_detection_range: 5.0,
            hysteresis_margin: 1.0,
        }
    }
}

impl CombatSettings {
    pub fn validate(&self) -> Result<(), GenerationError> {
        if !(self.min_damage.is_finite() && self.min_damage > 0.0) {
            return Err(GenerationError::invalid(
                "combat.min_damage",
                "must be positive",
            ));
        }
        let non_negative = [
            ("combat.player_attack_cooldown", self.player_attack_cooldown),
            ("combat.enemy_attack_cooldown", self.enemy_attack_cooldown),
            ("combat.hysteresis_margin", self.hysteresis_margin),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(GenerationError::invalid(field, "must be non-negative"));
            }
        }
        let positive = [
            ("combat.player_attack_range", self.player_attack_range),
            ("combat.enemy_attack_range", self.enemy_attack_range),
            ("combat.enemy_detection_range", self.enemy_detection_range),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(GenerationError::invalid(field, "must be positive"));
            }
        }
        Ok(())
    }

    pub fn attack_range_for(&self, attacker: &Entity) -> f32 {
        match &attacker.ai {
            Some(brain) if !attacker.is_player() => brain.profile.attack_range,
            _ => self.player_attack_range,
        }
    }

    pub fn cooldown_for(&self, attacker: &Entity) -> f32 {
        if attacker.is_player() {
            self.player_attack_cooldown
        } else {
            self.enemy_attack_cooldown
        }
    }
}

pub fn compute_damage(attack: f32, defense: f32, min_damage: f32) -> f32 {
    let raw = attack - defense;
    if raw.is_nan() {
        return min_damage;
    }
    raw.max(min_damage)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackOutcome {
    pub attacker: EntityId,
    pub target: EntityId,
    pub damage: f32,
    pub target_remaining: f32,
    pub killed: bool,
    /// The attacker's archetype ability powered this hit.
    pub ability_used: bool,
}

/// Why an attack did not happen. None of these change either entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttackRejection {
    AttackerDead,
    TargetDead,
    OnCooldown { remaining: f32 },
    OutOfRange { distance: f32, range: f32 },
}

/// Applies one attack and starts the attacker's cooldown. An ability that is
/// off cooldown multiplies the attack stat and starts its own cooldown.
pub fn resolve_attack(
    attacker: &mut Entity,
    target: &mut Entity,
    settings: &CombatSettings,
) -> Result<AttackOutcome, AttackRejection> {
    if !attacker.is_alive() {
        return Err(AttackRejection::AttackerDead);
    }
    if !target.is_alive() {
        return Err(AttackRejection::TargetDead);
    }
    if !attacker.ready_to_attack() {
        return Err(AttackRejection::OnCooldown {
            remaining: attacker.attack_cooldown,
        });
    }
    let range = settings.attack_range_for(attacker);
    let distance = attacker.position.distance(target.position);
    if distance > range {
        return Err(AttackRejection::OutOfRange { distance, range });
    }

    let ability = attacker.ready_ability();
    let multiplier = ability.map_or(1.0, |a| a.damage_multiplier);
    let damage = compute_damage(
        attacker.stats().attack * multiplier,
        target.stats().defense,
        settings.min_damage,
    );
    let dealt = target.health.apply_damage(damage);
    attacker.attack_cooldown = settings.cooldown_for(attacker);
    if let Some(ability) = ability {
        attacker.ability_cooldown = ability.cooldown_secs;
    }
    debug!(
        attacker = attacker.id.0,
        target = target.id.0,
        damage = dealt,
        ability = ability.is_some(),
        remaining = target.health.current(),
        "attack landed"
    );

    Ok(AttackOutcome {
        attacker: attacker.id,
        target: target.id,
        damage: dealt,
        target_remaining: target.health.current(),
        killed: !target.is_alive(),
        ability_used: ability.is_some(),
    })
}
