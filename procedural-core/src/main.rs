use std::path::PathBuf;

use anyhow::{Context, Result};
use bevy::math::Vec2;
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use tracing::info;

use roguelike_core::entity::Entity;
use roguelike_core::logging::{init_tracing, LogLevel, LogSettings};
use roguelike_core::loot::crafting::RecipeId;
use roguelike_core::loot::inventory::EquipSlot;
use roguelike_core::loot::{ConsumableEffect, ItemKind};
use roguelike_core::quests::QuestLog;
use roguelike_core::{PlayerAction, SimEvent, Simulation, WorldConfig};

/// Headless run: generate a world and let a scripted player wander it.
#[derive(Parser, Debug)]
#[command(name = "roguelike-sim", version, about)]
struct Args {
    /// RON or JSON world config. Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = 600)]
    ticks: u32,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Print the final frame snapshot as JSON.
    #[arg(long)]
    snapshot: bool,

    /// Repeat for more detail (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&LogSettings::verbose(LogLevel::from_verbosity(args.verbose)));

    let mut config = match &args.config {
        Some(path) => WorldConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => WorldConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(width) = args.width {
        config.width = width;
    }
    if let Some(height) = args.height {
        config.height = height;
    }
    config.validate().context("invalid world config")?;

    let dt = config.tick_seconds();
    let mut sim = Simulation::new(config.clone()).context("starting simulation")?;
    info!(report = %sim.report().to_json(), "world generated");

    let mut quests = QuestLog::standard();
    quests.accept_all();
    let mut wanderer = Wanderer::new(config.seed);
    let mut kills = 0u32;
    let mut pickups = 0u32;
    let mut crafted = 0u32;

    for _ in 0..args.ticks {
        let actions = wanderer.plan(sim.player());
        let events = sim.tick(&actions, dt);
        let mut reward_xp = 0;
        for event in &events {
            match event {
                SimEvent::EnemyKilled { .. } => kills += 1,
                SimEvent::ItemPickedUp { .. } => pickups += 1,
                SimEvent::ItemCrafted { .. } => crafted += 1,
                _ => {}
            }
            for done in quests.observe(event) {
                reward_xp += quests.claim(&done.quest_id).unwrap_or(0);
            }
        }
        if reward_xp > 0 && !sim.is_player_defeated() {
            sim.grant_experience(reward_xp)
                .context("granting quest rewards")?;
        }
        if sim.is_player_defeated() {
            break;
        }
    }

    let player = sim.player();
    let summary = quests.summary();
    println!("seed:            {}", config.seed);
    println!("world:           {}x{}", config.width, config.height);
    println!("ticks run:       {}", sim.tick_count());
    println!("structures:      {}", sim.report().structures_placed);
    println!("enemies killed:  {kills}");
    println!("items picked up: {pickups}");
    println!("items crafted:   {crafted}");
    println!("player level:    {} ({} xp)", player.level, player.experience);
    println!(
        "player health:   {:.0}/{:.0}",
        player.health.current(),
        player.health.max()
    );
    println!("quests claimed:  {}", summary.claimed);
    println!("defeated:        {}", sim.is_player_defeated());

    if args.snapshot {
        println!("{}", sim.snapshot().to_json());
    }
    Ok(())
}

/// Scripted player: walks in a direction that changes every few seconds,
/// swings at anything in reach, grabs loot, equips empty slots, crafts
/// whatever its materials allow and drinks a healing potion when low.
struct Wanderer {
    rng: Xoshiro256StarStar,
    heading: Vec2,
    ticks_left: u32,
}

impl Wanderer {
    fn new(seed: u64) -> Self {
        Self {
            rng: Xoshiro256StarStar::seed_from_u64(seed ^ 0x5EED),
            heading: Vec2::X,
            ticks_left: 0,
        }
    }

    fn plan(&mut self, player: &Entity) -> Vec<PlayerAction> {
        if self.ticks_left == 0 {
            let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
            self.heading = Vec2::from_angle(angle);
            self.ticks_left = self.rng.gen_range(60..240);
        }
        self.ticks_left -= 1;

        let mut actions = vec![
            PlayerAction::Move(self.heading),
            PlayerAction::Attack,
            PlayerAction::PickUp,
        ];

        for slot in EquipSlot::ALL {
            if player.equipment.get(slot).is_some() {
                continue;
            }
            if let Some(item) = player.inventory.items().iter().find(|i| i.slot() == Some(slot)) {
                actions.push(PlayerAction::Equip { item: item.id, slot });
            }
        }

        let reserved = player.equipment.equipped_ids();
        let craftable = RecipeId::ALL.into_iter().find(|id| {
            let recipe = id.recipe();
            player.level >= recipe.required_level
                && recipe
                    .materials
                    .iter()
                    .all(|(name, needed)| player.inventory.count_named(name, &reserved) >= *needed)
        });
        if let Some(recipe) = craftable {
            actions.push(PlayerAction::Craft(recipe));
        }

        if player.health.fraction() < 0.4 {
            let potion = player.inventory.items().iter().find(|i| {
                matches!(
                    i.kind,
                    ItemKind::Consumable {
                        effect: ConsumableEffect::Heal { .. },
                        ..
                    }
                )
            });
            if let Some(potion) = potion {
                actions.push(PlayerAction::Consume(potion.id));
            }
        }
        actions
    }
}
