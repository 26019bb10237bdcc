//! Quest log driven by simulation events.
//!
//! Quests never touch the simulation directly: the host feeds every
//! [`SimEvent`] into [`QuestLog::observe`], then claims completed quests and
//! hands the reward experience back through
//! [`crate::simulation::Simulation::grant_experience`].

use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::simulation::{SimEvent, PLAYER_ID};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestObjective {
    Kill,
    Collect,
    Explore,
    ReachLevel,
}

impl QuestObjective {
    pub fn as_str(self) -> &'static str {
        match self {
            QuestObjective::Kill => "kill",
            QuestObjective::Collect => "collect",
            QuestObjective::Explore => "explore",
            QuestObjective::ReachLevel => "reach_level",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestState {
    Available,
    Active,
    /// Objective met, reward not yet claimed.
    Completed,
    Claimed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub id: String,
    pub title: String,
    pub objective: QuestObjective,
    pub target: u32,
    pub progress: u32,
    pub reward_xp: u32,
    pub state: QuestState,
}

impl Quest {
    pub fn new(id: &str, title: &str, objective: QuestObjective, target: u32, reward_xp: u32) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            objective,
            target: target.max(1),
            progress: 0,
            reward_xp,
            state: QuestState::Available,
        }
    }

    pub fn description(&self) -> String {
        match self.objective {
            QuestObjective::Kill => format!("Defeat {} enemies", self.target),
            QuestObjective::Collect => format!("Collect {} items", self.target),
            QuestObjective::Explore => format!("Discover {} structures", self.target),
            QuestObjective::ReachLevel => format!("Reach level {}", self.target),
        }
    }

    pub fn fraction(&self) -> f32 {
        (self.progress as f32 / self.target as f32).min(1.0)
    }

    /// Applies progress; true exactly once, when the target is first met.
    /// Level objectives track the highest level seen instead of a count.
    fn advance(&mut self, amount: u32) -> bool {
        if self.state != QuestState::Active {
            return false;
        }
        self.progress = match self.objective {
            QuestObjective::ReachLevel => self.progress.max(amount),
            _ => self.progress.saturating_add(amount),
        };
        if self.progress >= self.target {
            self.state = QuestState::Completed;
            return true;
        }
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestCompleted {
    pub quest_id: String,
    pub title: String,
    pub reward_xp: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestSummary {
    pub available: usize,
    pub active: usize,
    pub completed: usize,
    pub claimed: usize,
    pub enemies_killed: u32,
    pub items_collected: u32,
    pub structures_explored: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuestLog {
    quests: Vec<Quest>,
    enemies_killed: u32,
    items_collected: u32,
    structures_explored: u32,
}

impl QuestLog {
    /// The fixed starter set.
    pub fn standard() -> Self {
        use QuestObjective::*;
        Self {
            quests: vec![
                Quest::new("first_blood", "First Blood", Kill, 5, 50),
                Quest::new("collector", "Collector", Collect, 10, 75),
                Quest::new("explorer", "Explorer", Explore, 3, 100),
                Quest::new("warrior", "Warrior", ReachLevel, 5, 150),
                Quest::new("slayer", "Slayer", Kill, 20, 200),
                Quest::new("treasure_hunter", "Treasure Hunter", Collect, 25, 250),
                Quest::new("master_explorer", "Master Explorer", Explore, 10, 300),
                Quest::new("legend", "Legend", ReachLevel, 10, 500),
            ],
            ..Default::default()
        }
    }

    pub fn quests(&self) -> &[Quest] {
        &self.quests
    }

    pub fn get(&self, id: &str) -> Option<&Quest> {
        self.quests.iter().find(|q| q.id == id)
    }

    pub fn in_state(&self, state: QuestState) -> impl Iterator<Item = &Quest> {
        self.quests.iter().filter(move |q| q.state == state)
    }

    /// Activates an available quest. False if it is unknown or already taken.
    pub fn accept(&mut self, id: &str) -> bool {
        match self.quests.iter_mut().find(|q| q.id == id) {
            Some(quest) if quest.state == QuestState::Available => {
                quest.state = QuestState::Active;
                true
            }
            _ => false,
        }
    }

    pub fn accept_all(&mut self) {
        for quest in &mut self.quests {
            if quest.state == QuestState::Available {
                quest.state = QuestState::Active;
            }
        }
    }

    /// Marks a completed quest as claimed and returns its experience reward.
    pub fn claim(&mut self, id: &str) -> Option<u32> {
        let quest = self
            .quests
            .iter_mut()
            .find(|q| q.id == id && q.state == QuestState::Completed)?;
        quest.state = QuestState::Claimed;
        Some(quest.reward_xp)
    }

    /// Feeds one simulation event into every active quest.
    pub fn observe(&mut self, event: &SimEvent) -> Vec<QuestCompleted> {
        let (objective, amount) = match event {
            SimEvent::EnemyKilled { .. } => {
                self.enemies_killed += 1;
                (QuestObjective::Kill, 1)
            }
            SimEvent::ItemPickedUp { entity, .. } if *entity == PLAYER_ID => {
                self.items_collected += 1;
                (QuestObjective::Collect, 1)
            }
            SimEvent::StructureDiscovered { .. } => {
                self.structures_explored += 1;
                (QuestObjective::Explore, 1)
            }
            SimEvent::LevelUp { entity, level } if *entity == PLAYER_ID => {
                (QuestObjective::ReachLevel, *level)
            }
            _ => return Vec::new(),
        };

        let mut completed = Vec::new();
        for quest in self.quests.iter_mut().filter(|q| q.objective == objective) {
            if quest.advance(amount) {
                info!(quest = %quest.id, reward_xp = quest.reward_xp, "quest completed");
                completed.push(QuestCompleted {
                    quest_id: quest.id.clone(),
                    title: quest.title.clone(),
                    reward_xp: quest.reward_xp,
                });
            }
        }
        completed
    }

    /// Appends a randomly sized kill, collect or explore quest. The same seed
    /// always yields the same objective and reward; ids stay unique within
    /// the log.
    pub fn generate_random(&mut self, seed: u64) -> &Quest {
        let mut rng = Xoshiro256StarStar::seed_from_u64(seed);
        let (objective, target, xp_per) = match rng.gen_range(0..3) {
            0 => (QuestObjective::Kill, rng.gen_range(5..=20), 10),
            1 => (QuestObjective::Collect, rng.gen_range(8..=15), 8),
            _ => (QuestObjective::Explore, rng.gen_range(2..=5), 25),
        };
        let base = format!("random_{}_{seed:016x}", objective.as_str());
        let mut id = base.clone();
        let mut suffix = self.quests.len();
        while self.get(&id).is_some() {
            id = format!("{base}_{suffix}");
            suffix += 1;
        }
        let title = match objective {
            QuestObjective::Kill => format!("Defeat {target} Enemies"),
            QuestObjective::Collect => format!("Collect {target} Items"),
            _ => format!("Explore {target} Areas"),
        };
        let index = self.quests.len();
        self.quests
            .push(Quest::new(&id, &title, objective, target, target * xp_per));
        &self.quests[index]
    }

    pub fn summary(&self) -> QuestSummary {
        QuestSummary {
            available: self.in_state(QuestState::Available).count(),
            active: self.in_state(QuestState::Active).count(),
            completed: self.in_state(QuestState::Completed).count(),
            claimed: self.in_state(QuestState::Claimed).count(),
            enemies_killed: self.enemies_killed,
            items_collected: self.items_collected,
            structures_explored: self.structures_explored,
        }
    }
}
