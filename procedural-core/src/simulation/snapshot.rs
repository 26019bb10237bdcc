//! Per-frame render snapshot.
//!
//! The renderer draws only what lies inside the camera window centred on the
//! player. Snapshots are plain data and serialize to JSON for external hosts.

use serde::{Deserialize, Serialize};

use crate::entity::ai::AiState;
use crate::entity::Entity;
use crate::generation::biome::Biome;
use crate::loot::ItemRarity;
use crate::world::{TileCoord, TileRect, WorldGrid};

/// Camera half-extents in tiles.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub half_width: u32,
    pub half_height: u32,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            half_width: 20,
            half_height: 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileView {
    pub x: i32,
    pub y: i32,
    pub biome: Biome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: u32,
    pub x: f32,
    pub y: f32,
    pub sprite: String,
    pub level: u32,
    pub health_fraction: f32,
    pub ai_state: Option<AiState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemView {
    pub id: u64,
    pub x: i32,
    pub y: i32,
    pub name: String,
    pub rarity: ItemRarity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureView {
    pub id: u32,
    pub kind: String,
    pub footprint: TileRect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub tick: u64,
    pub camera: TileRect,
    pub tiles: Vec<TileView>,
    pub structures: Vec<StructureView>,
    pub items: Vec<ItemView>,
    pub entities: Vec<EntityView>,
}

impl FrameSnapshot {
    /// Builds the view around `player`. Tiles outside the world are omitted.
    pub fn capture<'a>(
        tick: u64,
        world: &WorldGrid,
        view: &ViewSettings,
        player: &Entity,
        others: impl IntoIterator<Item = &'a Entity>,
    ) -> Self {
        let center = TileCoord::from_point(player.position);
        let camera = TileRect::around(center, view.half_width, view.half_height);
        let visible = camera.intersection(&world.bounds());

        let tiles = visible
            .map(|rect| {
                rect.coords()
                    .map(|coord| TileView {
                        x: coord.x,
                        y: coord.y,
                        biome: world.tile_at(coord.x, coord.y).biome,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let structures = world
            .structures_overlapping(&camera)
            .into_iter()
            .map(|s| StructureView {
                id: s.id,
                kind: s.kind.as_str().to_string(),
                footprint: s.footprint,
            })
            .collect();

        let items = world
            .ground_items_in(&camera)
            .into_iter()
            .map(|(coord, item)| ItemView {
                id: item.id.0,
                x: coord.x,
                y: coord.y,
                name: item.name.clone(),
                rarity: item.rarity,
            })
            .collect();

        let mut entities = vec![entity_view(player)];
        entities.extend(
            others
                .into_iter()
                .filter(|e| camera.contains(TileCoord::from_point(e.position)))
                .map(entity_view),
        );

        Self {
            tick,
            camera,
            tiles,
            structures,
            items,
            entities,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}

fn entity_view(entity: &Entity) -> EntityView {
    EntityView {
        id: entity.id.0,
        x: entity.position.x,
        y: entity.position.y,
        sprite: entity.sprite_tag().to_string(),
        level: entity.level,
        health_fraction: entity.health.fraction(),
        ai_state: entity.ai.as_ref().map(|brain| brain.state),
    }
}
