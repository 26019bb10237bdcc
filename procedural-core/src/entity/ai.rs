//! Enemy AI state machine.
//!
//! Transitions are a pure function of the current state, the distance to the
//! player and the enemy's profile. Leaving Chase or Attack requires exceeding
//! the entry range by a hysteresis margin so enemies do not flicker between
//! states at the boundary.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::combat::CombatSettings;
use crate::constants::{WAYPOINT_TIMEOUT_SECS, WAYPOINT_TOLERANCE};

use super::EnemyArchetype;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AiState {
    #[default]
    Idle,
    Patrol,
    Chase,
    Attack,
    Dead,
}

impl AiState {
    pub fn as_str(self) -> &'static str {
        match self {
            AiState::Idle => "idle",
            AiState::Patrol => "patrol",
            AiState::Chase => "chase",
            AiState::Attack => "attack",
            AiState::Dead => "dead",
        }
    }
}

/// Ranges in tiles, speed factors relative to the entity's speed stat.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiProfile {
    pub detection_range: f32,
    pub attack_range: f32,
    pub hysteresis: f32,
    pub patrol_speed_factor: f32,
    pub chase_speed_factor: f32,
}

impl Default for AiProfile {
    fn default() -> Self {
        Self::for_archetype(EnemyArchetype::Basic, &CombatSettings::default())
    }
}

impl AiProfile {
    pub fn for_archetype(archetype: EnemyArchetype, combat: &CombatSettings) -> Self {
        let profile = archetype.profile();
        Self {
            detection_range: combat.enemy_detection_range * profile.detection,
            attack_range: combat.enemy_attack_range,
            hysteresis: combat.hysteresis_margin,
            patrol_speed_factor: 0.5,
            chase_speed_factor: 1.0,
        }
    }
}

/// What the enemy knows about the world this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Perception {
    pub alive: bool,
    /// Distance to the player, `None` when there is no living player.
    pub target_distance: Option<f32>,
}

pub fn next_state(current: AiState, perception: &Perception, profile: &AiProfile) -> AiState {
    if !perception.alive || current == AiState::Dead {
        return AiState::Dead;
    }
    let Some(distance) = perception.target_distance.filter(|d| d.is_finite()) else {
        return AiState::Patrol;
    };
    let detected = distance <= profile.detection_range;
    let in_reach = distance <= profile.attack_range;
    let lost = distance > profile.detection_range + profile.hysteresis;

    match current {
        AiState::Idle | AiState::Patrol => {
            if in_reach {
                AiState::Attack
            } else if detected {
                AiState::Chase
            } else {
                AiState::Patrol
            }
        }
        AiState::Chase => {
            if in_reach {
                AiState::Attack
            } else if lost {
                AiState::Patrol
            } else {
                AiState::Chase
            }
        }
        AiState::Attack => {
            if distance <= profile.attack_range + profile.hysteresis {
                AiState::Attack
            } else if lost {
                AiState::Patrol
            } else {
                AiState::Chase
            }
        }
        AiState::Dead => AiState::Dead,
    }
}

#[derive(Debug, Clone, Default)]
pub struct AiBrain {
    pub state: AiState,
    pub profile: AiProfile,
    pub waypoints: Vec<Vec2>,
    pub waypoint_index: usize,
    waypoint_timer: f32,
}

impl AiBrain {
    pub fn new(profile: AiProfile, waypoints: Vec<Vec2>) -> Self {
        Self {
            state: AiState::Idle,
            profile,
            waypoints,
            waypoint_index: 0,
            waypoint_timer: 0.0,
        }
    }

    pub fn current_waypoint(&self) -> Option<Vec2> {
        self.waypoints.get(self.waypoint_index).copied()
    }

    fn advance_waypoint(&mut self) {
        if !self.waypoints.is_empty() {
            self.waypoint_index = (self.waypoint_index + 1) % self.waypoints.len();
        }
        self.waypoint_timer = 0.0;
    }

    /// Unit direction and speed factor for this tick. Patrol cycles through
    /// waypoints, skipping one that has not been reached in time. Attack
    /// steps toward a target that has drifted out of reach.
    pub fn movement_intent(&mut self, position: Vec2, target: Option<Vec2>, dt: f32) -> (Vec2, f32) {
        match self.state {
            AiState::Patrol => {
                let Some(waypoint) = self.current_waypoint() else {
                    return (Vec2::ZERO, 0.0);
                };
                self.waypoint_timer += dt.max(0.0);
                if position.distance(waypoint) <= WAYPOINT_TOLERANCE
                    || self.waypoint_timer >= WAYPOINT_TIMEOUT_SECS
                {
                    self.advance_waypoint();
                    return (Vec2::ZERO, 0.0);
                }
                (
                    (waypoint - position).normalize_or_zero(),
                    self.profile.patrol_speed_factor,
                )
            }
            AiState::Chase => match target {
                Some(target) => (
                    (target - position).normalize_or_zero(),
                    self.profile.chase_speed_factor,
                ),
                None => (Vec2::ZERO, 0.0),
            },
            // Attack is held inside the hysteresis band, so close the gap
            // until the target is back in reach.
            AiState::Attack => match target {
                Some(target) if position.distance(target) > self.profile.attack_range => (
                    (target - position).normalize_or_zero(),
                    self.profile.chase_speed_factor,
                ),
                _ => (Vec2::ZERO, 0.0),
            },
            AiState::Idle | AiState::Dead => (Vec2::ZERO, 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> AiProfile {
        AiProfile {
            detection_range: 5.0,
            attack_range: 1.0,
            hysteresis: 1.0,
            patrol_speed_factor: 0.5,
            chase_speed_factor: 1.0,
        }
    }

    fn seen(distance: f32) -> Perception {
        Perception {
            alive: true,
            target_distance: Some(distance),
        }
    }

    #[test]
    fn test_idle_without_player_patrols() {
        let p = Perception {
            alive: true,
            target_distance: None,
        };
        assert_eq!(next_state(AiState::Idle, &p, &profile()), AiState::Patrol);
        assert_eq!(next_state(AiState::Idle, &seen(20.0), &profile()), AiState::Patrol);
    }

    #[test]
    fn test_detection_starts_chase() {
        assert_eq!(next_state(AiState::Patrol, &seen(4.0), &profile()), AiState::Chase);
        assert_eq!(next_state(AiState::Idle, &seen(4.0), &profile()), AiState::Chase);
    }

    #[test]
    fn test_chase_to_attack() {
        assert_eq!(next_state(AiState::Chase, &seen(0.8), &profile()), AiState::Attack);
    }

    #[test]
    fn test_hysteresis_holds_attack() {
        // Just past attack range but within the margin.
        assert_eq!(next_state(AiState::Attack, &seen(1.5), &profile()), AiState::Attack);
        assert_eq!(next_state(AiState::Attack, &seen(2.5), &profile()), AiState::Chase);
    }

    #[test]
    fn test_hysteresis_holds_chase() {
        assert_eq!(next_state(AiState::Chase, &seen(5.5), &profile()), AiState::Chase);
        assert_eq!(next_state(AiState::Chase, &seen(6.5), &profile()), AiState::Patrol);
    }

    #[test]
    fn test_no_oscillation_at_boundary() {
        let mut state = AiState::Chase;
        let mut changes = 0;
        for i in 0..40 {
            let wobble = if i % 2 == 0 { 1.05 } else { 0.95 };
            let next = next_state(state, &seen(wobble), &profile());
            if next != state {
                changes += 1;
            }
            state = next;
        }
        assert_eq!(changes, 1, "one transition into Attack, then stable");
    }

    #[test]
    fn test_dead_is_terminal() {
        let dying = Perception {
            alive: false,
            target_distance: Some(0.5),
        };
        assert_eq!(next_state(AiState::Attack, &dying, &profile()), AiState::Dead);
        assert_eq!(next_state(AiState::Dead, &seen(0.5), &profile()), AiState::Dead);
    }

    #[test]
    fn test_patrol_cycles_waypoints() {
        let mut brain = AiBrain::new(profile(), vec![Vec2::new(0.0, 0.0), Vec2::new(3.0, 0.0)]);
        brain.state = AiState::Patrol;
        let (dir, factor) = brain.movement_intent(Vec2::new(0.1, 0.0), None, 0.1);
        assert_eq!(dir, Vec2::ZERO);
        assert_eq!(factor, 0.0);
        assert_eq!(brain.waypoint_index, 1);
        let (dir, factor) = brain.movement_intent(Vec2::new(0.1, 0.0), None, 0.1);
        assert!((dir - Vec2::X).length() < 1e-6);
        assert_eq!(factor, 0.5);
    }

    #[test]
    fn test_unreachable_waypoint_times_out() {
        let mut brain = AiBrain::new(profile(), vec![Vec2::new(10.0, 0.0), Vec2::new(0.0, 10.0)]);
        brain.state = AiState::Patrol;
        brain.movement_intent(Vec2::ZERO, None, WAYPOINT_TIMEOUT_SECS + 0.1);
        assert_eq!(brain.waypoint_index, 1);
    }

    #[test]
    fn test_attack_closes_gap_inside_hysteresis_band() {
        let mut brain = AiBrain::new(profile(), Vec::new());
        brain.state = AiState::Attack;
        let (dir, factor) = brain.movement_intent(Vec2::ZERO, Some(Vec2::new(1.5, 0.0)), 0.1);
        assert_eq!(dir, Vec2::X);
        assert_eq!(factor, 1.0);
        let (dir, _) = brain.movement_intent(Vec2::ZERO, Some(Vec2::new(0.8, 0.0)), 0.1);
        assert_eq!(dir, Vec2::ZERO, "in reach, stand and swing");
    }

    #[test]
    fn test_chase_moves_toward_target() {
        let mut brain = AiBrain::new(profile(), Vec::new());
        brain.state = AiState::Chase;
        let (dir, _) = brain.movement_intent(Vec2::ZERO, Some(Vec2::new(0.0, 4.0)), 0.1);
        assert_eq!(dir, Vec2::Y);
    }
}
