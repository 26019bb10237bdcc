//! Tick-based world simulation.
//!
//! Each tick applies the player's actions, runs enemy AI and combat, removes
//! the dead (awarding experience and rolling drops), despawns far-away
//! enemies and tops up the population. Everything a host needs to react to is
//! returned as [`SimEvent`]s; every random draw comes from the world seed.

pub mod events;
pub mod movement;
pub mod plugin;
pub mod population;
pub mod snapshot;
pub mod spatial;

pub use self::events::{EventQueue, InterfaceRequest, PlayerAction, SimEvent};

use std::collections::{BTreeMap, BTreeSet};

use bevy::math::Vec2;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;
use tracing::{debug, info, trace, warn};

use crate::combat;
use crate::config::WorldConfig;
use crate::constants::SPATIAL_CELL_SIZE;
use crate::entity::ai::{self, AiBrain, AiProfile, AiState, Perception};
use crate::entity::{EnemyArchetype, Entity, EntityId};
use crate::error::{ItemError, OutOfBounds, SimulationError};
use crate::generation::{generate_world, GeneratedWorld, GenerationReport, WorldSeed};
use crate::loot::{self, crafting, Item, ItemId};
use crate::world::{TileCoord, TileRect, WorldGrid};

use self::population::{PopulationController, SpawnRequest};
use self::snapshot::FrameSnapshot;
use self::spatial::SpatialHash;

pub const PLAYER_ID: EntityId = EntityId(0);

pub struct Simulation {
    config: WorldConfig,
    seed: WorldSeed,
    world: WorldGrid,
    report: GenerationReport,
    player: Entity,
    enemies: BTreeMap<EntityId, Entity>,
    next_entity_id: u32,
    population: PopulationController,
    spatial: SpatialHash,
    events: EventQueue,
    rng: Xoshiro256StarStar,
    drops_rolled: u64,
    crafted: u64,
    discovered: BTreeSet<u32>,
    tick: u64,
    elapsed: f32,
    defeated: bool,
}

impl Simulation {
    /// Generates a world from `config` and places the player on it.
    pub fn new(config: WorldConfig) -> Result<Self, SimulationError> {
        let generated = generate_world(&config)?;
        Self::from_world(config, generated)
    }

    /// Starts a simulation on an existing world. The player spawns on the
    /// walkable tile closest to the map centre.
    pub fn from_world(config: WorldConfig, generated: GeneratedWorld) -> Result<Self, SimulationError> {
        config.validate()?;
        let GeneratedWorld { grid, report } = generated;
        let seed = WorldSeed::new(config.seed);

        let center = TileCoord::new(grid.width() as i32 / 2, grid.height() as i32 / 2);
        let spawn = grid
            .nearest_walkable(center, grid.width().max(grid.height()))
            .ok_or(SimulationError::NoWalkableTile("player spawn"))?;
        let player = Entity::player(
            PLAYER_ID,
            spawn.center(),
            &config.progression,
            config.loot.inventory_capacity,
        );

        let mut sim = Self {
            population: PopulationController::new(config.spawning, seed.derive("population")),
            rng: Xoshiro256StarStar::seed_from_u64(seed.derive("simulation")),
            seed,
            world: grid,
            report,
            player,
            enemies: BTreeMap::new(),
            next_entity_id: PLAYER_ID.0 + 1,
            spatial: SpatialHash::new(SPATIAL_CELL_SIZE),
            events: EventQueue::default(),
            drops_rolled: 0,
            crafted: 0,
            discovered: BTreeSet::new(),
            tick: 0,
            elapsed: 0.0,
            defeated: false,
            config,
        };
        sim.populate();
        sim.discover_structures();
        sim.rebuild_spatial();
        info!(
            seed = sim.config.seed,
            x = spawn.x,
            y = spawn.y,
            enemies = sim.enemies.len(),
            "simulation started"
        );
        Ok(sim)
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn world(&self) -> &WorldGrid {
        &self.world
    }

    /// Puts an item on the ground. Terrain itself never changes once the
    /// simulation owns the world.
    pub fn place_item(&mut self, coord: TileCoord, item: Item) -> Result<(), OutOfBounds> {
        self.world.place_item(coord, item)
    }

    pub fn report(&self) -> &GenerationReport {
        &self.report
    }

    pub fn player(&self) -> &Entity {
        &self.player
    }

    #[cfg(test)]
    pub(crate) fn player_mut(&mut self) -> &mut Entity {
        &mut self.player
    }

    /// Puts an item straight into the player's inventory. Hands the item
    /// back when it does not fit.
    pub fn give_item(&mut self, item: Item) -> Result<(), Item> {
        if self.defeated {
            return Err(item);
        }
        let id = item.id;
        let name = item.name.clone();
        self.player.pick_up(item)?;
        self.events.push(SimEvent::ItemPickedUp {
            entity: PLAYER_ID,
            item: id,
            name,
        });
        Ok(())
    }

    pub fn enemies(&self) -> impl Iterator<Item = &Entity> {
        self.enemies.values()
    }

    pub fn enemy(&self, id: EntityId) -> Option<&Entity> {
        self.enemies.get(&id)
    }

    pub fn enemy_count(&self) -> usize {
        self.enemies.len()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_player_defeated(&self) -> bool {
        self.defeated
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        FrameSnapshot::capture(
            self.tick,
            &self.world,
            &self.config.view,
            &self.player,
            self.enemies.values(),
        )
    }

    /// Advances the world by `dt` seconds. Non-finite or negative `dt` is
    /// treated as zero.
    pub fn tick(&mut self, actions: &[PlayerAction], dt: f32) -> Vec<SimEvent> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };
        if self.defeated {
            for action in actions {
                if let Some(request) = interface_request(action) {
                    self.events.push(SimEvent::InterfaceRequested(request));
                }
            }
            return self.events.drain();
        }

        self.tick += 1;
        self.elapsed += dt;
        self.player.tick_timers(dt);
        for enemy in self.enemies.values_mut() {
            enemy.tick_timers(dt);
        }
        self.rebuild_spatial();

        for action in actions {
            self.apply_action(*action, dt);
        }
        self.update_enemies(dt);
        self.collect_dead();
        self.despawn_distant();
        if self.population.advance(dt) {
            self.populate();
        }
        self.discover_structures();
        self.rebuild_spatial();

        self.events.drain()
    }

    /// Spawns an enemy at a walkable tile, outside the regular waves. The
    /// population cap still applies.
    pub fn spawn_enemy(
        &mut self,
        archetype: EnemyArchetype,
        level: u32,
        coord: TileCoord,
    ) -> Result<EntityId, SimulationError> {
        if self.defeated {
            return Err(SimulationError::PlayerDefeated);
        }
        let max = self.config.spawning.max_concurrent;
        if self.enemies.len() >= max as usize {
            return Err(SimulationError::PopulationCap { max });
        }
        if !self.world.is_walkable(coord.x, coord.y) {
            return Err(SimulationError::NotWalkable {
                x: coord.x,
                y: coord.y,
            });
        }
        let request = SpawnRequest {
            archetype,
            level: level.max(1),
            coord,
            waypoints: vec![coord.center()],
        };
        let id = self.spawn_from_request(request);
        self.rebuild_spatial();
        Ok(id)
    }

    /// Removes an enemy without awarding experience or rolling a drop.
    pub fn remove_enemy(&mut self, id: EntityId) -> Result<Entity, SimulationError> {
        let enemy = self
            .enemies
            .remove(&id)
            .ok_or(SimulationError::EntityNotFound(id))?;
        self.events.push(SimEvent::EnemyDespawned { id });
        self.rebuild_spatial();
        Ok(enemy)
    }

    /// Moves the player to the centre of a walkable tile.
    pub fn place_player(&mut self, coord: TileCoord) -> Result<(), SimulationError> {
        if self.defeated {
            return Err(SimulationError::PlayerDefeated);
        }
        if !self.world.is_walkable(coord.x, coord.y) {
            return Err(SimulationError::NotWalkable {
                x: coord.x,
                y: coord.y,
            });
        }
        self.player.position = coord.center();
        Ok(())
    }

    /// Awards experience from outside combat (quest rewards). Level-ups are
    /// reported with the next tick's events.
    pub fn grant_experience(&mut self, xp: u32) -> Result<Vec<u32>, SimulationError> {
        if self.defeated {
            return Err(SimulationError::PlayerDefeated);
        }
        let levels = self.player.gain_experience(xp, &self.config.progression);
        for level in &levels {
            self.events.push(SimEvent::LevelUp {
                entity: PLAYER_ID,
                level: *level,
            });
        }
        Ok(levels)
    }

    fn apply_action(&mut self, action: PlayerAction, dt: f32) {
        match action {
            PlayerAction::Move(direction) => {
                let position = self.player.position;
                let speed = self.player.stats().speed;
                let delta = movement::tick_displacement(&self.world, position, direction, speed, dt);
                self.player.position = movement::resolve_movement(&self.world, position, delta);
            }
            PlayerAction::Attack => self.player_attack(),
            PlayerAction::PickUp => self.pick_up(),
            PlayerAction::Equip { item, slot } => match self.player.equip(item, slot) {
                Ok(previous) => {
                    if let Some(previous) = previous {
                        self.events.push(SimEvent::ItemUnequipped {
                            entity: PLAYER_ID,
                            item: previous,
                            slot,
                        });
                    }
                    self.events.push(SimEvent::ItemEquipped {
                        entity: PLAYER_ID,
                        item,
                        slot,
                    });
                }
                Err(error) => self.reject(error),
            },
            PlayerAction::Unequip(slot) => match self.player.unequip(slot) {
                Ok(item) => self.events.push(SimEvent::ItemUnequipped {
                    entity: PLAYER_ID,
                    item,
                    slot,
                }),
                Err(error) => self.reject(error),
            },
            PlayerAction::Consume(item) => match self.player.consume(item) {
                Ok(effect) => self.events.push(SimEvent::ItemConsumed {
                    entity: PLAYER_ID,
                    item,
                    effect,
                }),
                Err(error) => self.reject(error),
            },
            PlayerAction::Drop(item) => match self.player.drop_item(item) {
                Ok(dropped) => {
                    let coord = self.world.tile_of(self.player.position);
                    let id = dropped.id;
                    match self.world.place_item(coord, dropped) {
                        Ok(()) => self.events.push(SimEvent::ItemDropped {
                            item: id,
                            coord,
                            source: PLAYER_ID,
                        }),
                        Err(err) => warn!(%err, "dropped item landed outside the world"),
                    }
                }
                Err(error) => self.reject(error),
            },
            PlayerAction::Craft(recipe) => {
                let id = ItemId(self.seed.derive_indexed("crafted", self.crafted));
                match self.player.craft(recipe, id) {
                    Ok(item) => {
                        self.crafted += 1;
                        info!(recipe = recipe.as_str(), item = item.id.0, "item crafted");
                        self.events.push(SimEvent::ItemCrafted {
                            entity: PLAYER_ID,
                            recipe,
                            item: item.id,
                        });
                    }
                    Err(error) => self.reject(error),
                }
            }
            PlayerAction::OpenInventory | PlayerAction::OpenMap | PlayerAction::Pause => {
                if let Some(request) = interface_request(&action) {
                    self.events.push(SimEvent::InterfaceRequested(request));
                }
            }
        }
    }

    fn reject(&mut self, error: ItemError) {
        debug!(%error, "player action rejected");
        self.events.push(SimEvent::ActionRejected {
            entity: PLAYER_ID,
            error,
        });
    }

    /// Hits the closest living enemy in reach, if any.
    fn player_attack(&mut self) {
        let reach = self.config.combat.player_attack_range;
        let target = self
            .spatial
            .query_radius(self.player.position, reach)
            .into_iter()
            .map(|(id, _)| id)
            .find(|id| self.enemies.get(id).is_some_and(Entity::is_alive));
        let Some(target) = target else {
            trace!("attack with nothing in reach");
            return;
        };
        let Some(enemy) = self.enemies.get_mut(&target) else {
            return;
        };
        match combat::resolve_attack(&mut self.player, enemy, &self.config.combat) {
            Ok(outcome) => {
                self.events.push(SimEvent::DamageDealt {
                    attacker: outcome.attacker,
                    target: outcome.target,
                    amount: outcome.damage,
                    remaining: outcome.target_remaining,
                });
                if enemy.update_rage() {
                    info!(enemy = target.0, "enemy enraged");
                    self.events.push(SimEvent::EnemyEnraged { id: target });
                }
            }
            Err(rejection) => trace!(?rejection, "player attack rejected"),
        }
    }

    /// Moves ground items within the pickup radius into the inventory, nearest
    /// tiles first. Stops at the first item that does not fit.
    fn pick_up(&mut self) {
        let radius = self.config.loot.pickup_radius;
        let position = self.player.position;
        let origin = self.world.tile_of(position);
        let reach = radius.ceil() as u32;

        let mut candidates: Vec<(f32, TileCoord, ItemId)> = TileRect::around(origin, reach, reach)
            .coords()
            .filter(|coord| *coord == origin || coord.center().distance(position) <= radius)
            .flat_map(|coord| {
                let distance = coord.center().distance(position);
                self.world
                    .items_at(coord.x, coord.y)
                    .iter()
                    .map(move |item| (distance, coord, item.id))
            })
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

        for (_, coord, id) in candidates {
            let Some(item) = self.world.take_item(coord, id) else {
                continue;
            };
            let name = item.name.clone();
            match self.player.pick_up(item) {
                Ok(()) => self.events.push(SimEvent::ItemPickedUp {
                    entity: PLAYER_ID,
                    item: id,
                    name,
                }),
                Err(item) => {
                    if let Err(err) = self.world.place_item(coord, item) {
                        warn!(%err, "could not return item to the ground");
                    }
                    let capacity = self.player.inventory.capacity();
                    self.reject(ItemError::InventoryFull { capacity });
                    break;
                }
            }
        }
    }

    fn update_enemies(&mut self, dt: f32) {
        let combat_settings = self.config.combat;
        let ids: Vec<EntityId> = self.enemies.keys().copied().collect();
        for id in ids {
            let player_alive = self.player.is_alive();
            let target = player_alive.then_some(self.player.position);
            let Some(enemy) = self.enemies.get_mut(&id) else {
                continue;
            };
            if !enemy.is_alive() {
                continue;
            }
            let position = enemy.position;
            let Some(brain) = enemy.ai.as_mut() else {
                continue;
            };

            let perception = Perception {
                alive: true,
                target_distance: target.map(|t| t.distance(position)),
            };
            let previous = brain.state;
            brain.state = ai::next_state(previous, &perception, &brain.profile);
            if brain.state != previous {
                debug!(
                    enemy = id.0,
                    from = previous.as_str(),
                    to = brain.state.as_str(),
                    "ai transition"
                );
            }
            let state = brain.state;
            let (direction, factor) = brain.movement_intent(position, target, dt);

            if direction != Vec2::ZERO {
                let speed = enemy.stats().speed * factor;
                let delta = movement::tick_displacement(&self.world, position, direction, speed, dt);
                enemy.position = movement::resolve_movement(&self.world, position, delta);
            }

            if state != AiState::Attack || !player_alive {
                continue;
            }
            match combat::resolve_attack(enemy, &mut self.player, &combat_settings) {
                Ok(outcome) => {
                    if outcome.ability_used {
                        self.events.push(SimEvent::AbilityUsed {
                            attacker: id,
                            target: PLAYER_ID,
                        });
                    }
                    self.events.push(SimEvent::DamageDealt {
                        attacker: outcome.attacker,
                        target: outcome.target,
                        amount: outcome.damage,
                        remaining: outcome.target_remaining,
                    });
                    if outcome.killed {
                        self.defeated = true;
                        self.events.push(SimEvent::PlayerDefeated { entity: PLAYER_ID });
                        info!(killer = id.0, tick = self.tick, "player defeated");
                    }
                }
                Err(rejection) => trace!(enemy = id.0, ?rejection, "enemy attack rejected"),
            }
        }
    }

    /// Removes dead enemies, awarding experience and rolling drops. Each
    /// death is reported exactly once.
    fn collect_dead(&mut self) {
        let dead: Vec<EntityId> = self
            .enemies
            .iter()
            .filter(|(_, enemy)| !enemy.is_alive())
            .map(|(id, _)| *id)
            .collect();

        for id in dead {
            let Some(mut enemy) = self.enemies.remove(&id) else {
                continue;
            };
            if let Some(brain) = enemy.ai.as_mut() {
                brain.state = AiState::Dead;
            }
            let Some(archetype) = enemy.archetype() else {
                continue;
            };
            let xp = self.config.progression.kill_xp(enemy.level) * archetype.profile().xp_multiplier;
            self.events.push(SimEvent::EnemyKilled {
                id,
                archetype,
                level: enemy.level,
                xp_awarded: xp,
            });
            info!(enemy = id.0, archetype = archetype.as_str(), xp, "enemy defeated");

            for level in self.player.gain_experience(xp, &self.config.progression) {
                self.events.push(SimEvent::LevelUp {
                    entity: PLAYER_ID,
                    level,
                });
                info!(level, "player levelled up");
            }
            self.roll_drop(&enemy);
        }
    }

    fn roll_drop(&mut self, enemy: &Entity) {
        if self.rng.gen::<f32>() >= self.config.loot.enemy_drop_chance {
            return;
        }
        let item_seed = self.seed.derive_indexed("enemy-drop", self.drops_rolled);
        self.drops_rolled += 1;
        let item = if self.rng.gen::<f32>() < self.config.loot.material_drop_share {
            crafting::roll_material(item_seed)
        } else {
            loot::roll_item_at_level(&self.config.loot.rarity_weights, item_seed, enemy.level)
        };
        let coord = self.world.tile_of(enemy.position);
        let id = item.id;
        match self.world.place_item(coord, item) {
            Ok(()) => self.events.push(SimEvent::ItemDropped {
                item: id,
                coord,
                source: enemy.id,
            }),
            Err(err) => warn!(%err, "enemy drop outside the world"),
        }
    }

    fn despawn_distant(&mut self) {
        let limit = self.config.spawning.despawn_distance;
        let player = self.player.position;
        let far: Vec<EntityId> = self
            .enemies
            .iter()
            .filter(|(_, enemy)| enemy.position.distance(player) > limit)
            .map(|(id, _)| *id)
            .collect();
        for id in far {
            self.enemies.remove(&id);
            self.events.push(SimEvent::EnemyDespawned { id });
        }
    }

    fn populate(&mut self) {
        let live: Vec<Vec2> = self.enemies.values().map(|e| e.position).collect();
        let requests = self.population.plan_wave(
            &self.world,
            self.player.position,
            self.player.level,
            &live,
        );
        for request in requests {
            self.spawn_from_request(request);
        }
    }

    fn spawn_from_request(&mut self, request: SpawnRequest) -> EntityId {
        let id = EntityId(self.next_entity_id);
        self.next_entity_id += 1;
        let profile = AiProfile::for_archetype(request.archetype, &self.config.combat);
        let enemy = Entity::enemy(
            id,
            request.archetype,
            request.level,
            request.coord.center(),
            &self.config.progression,
            AiBrain::new(profile, request.waypoints),
        );
        self.enemies.insert(id, enemy);
        self.events.push(SimEvent::EnemySpawned {
            id,
            archetype: request.archetype,
            level: request.level,
            coord: request.coord,
        });
        debug!(
            enemy = id.0,
            archetype = request.archetype.as_str(),
            level = request.level,
            "enemy spawned"
        );
        id
    }

    fn discover_structures(&mut self) {
        let tile = self.world.tile_of(self.player.position);
        if let Some(structure) = self.world.structure_at(tile) {
            if self.discovered.insert(structure.id) {
                self.events.push(SimEvent::StructureDiscovered {
                    structure: structure.id,
                });
            }
        }
    }

    fn rebuild_spatial(&mut self) {
        self.spatial.clear();
        for (id, enemy) in &self.enemies {
            if enemy.is_alive() {
                self.spatial.insert(*id, enemy.position);
            }
        }
    }
}

fn interface_request(action: &PlayerAction) -> Option<InterfaceRequest> {
    match action {
        PlayerAction::OpenInventory => Some(InterfaceRequest::Inventory),
        PlayerAction::OpenMap => Some(InterfaceRequest::Map),
        PlayerAction::Pause => Some(InterfaceRequest::Pause),
        _ => None,
    }
}
