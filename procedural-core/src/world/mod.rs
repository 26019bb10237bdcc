//! World grid: the finite rectangular map produced by generation.
//!
//! Tiles are stored row-major. Every in-bounds coordinate maps to exactly one
//! terrain biome; out-of-range lookups return a non-walkable void tile so
//! callers never index outside the map.

use std::collections::{BTreeMap, HashSet};

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::OutOfBounds;
use crate::generation::biome::Biome;
use crate::generation::structures::Structure;
use crate::loot::{Item, ItemId};

/// Integer tile coordinate. Tile `(x, y)` covers `[x, x+1) x [y, y+1)` in
/// world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileCoord {
    pub x: i32,
    pub y: i32,
}

impl TileCoord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Tile containing a continuous world position.
    pub fn from_point(point: Vec2) -> Self {
        Self::new(point.x.floor() as i32, point.y.floor() as i32)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x as f32 + 0.5, self.y as f32 + 0.5)
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Axis-aligned rectangle of tiles. `x`/`y` is the inclusive minimum corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl TileRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Rectangle spanning `center ± half` on each axis.
    pub fn around(center: TileCoord, half_width: u32, half_height: u32) -> Self {
        Self::new(
            center.x - half_width as i32,
            center.y - half_height as i32,
            half_width * 2 + 1,
            half_height * 2 + 1,
        )
    }

    /// Exclusive maximum x.
    pub fn max_x(&self) -> i32 {
        self.x + self.width as i32
    }

    /// Exclusive maximum y.
    pub fn max_y(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn contains(&self, coord: TileCoord) -> bool {
        coord.x >= self.x && coord.x < self.max_x() && coord.y >= self.y && coord.y < self.max_y()
    }

    pub fn intersects(&self, other: &TileRect) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.x < other.max_x()
            && other.x < self.max_x()
            && self.y < other.max_y()
            && other.y < self.max_y()
    }

    pub fn intersection(&self, other: &TileRect) -> Option<TileRect> {
        if !self.intersects(other) {
            return None;
        }
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let max_x = self.max_x().min(other.max_x());
        let max_y = self.max_y().min(other.max_y());
        Some(TileRect::new(x, y, (max_x - x) as u32, (max_y - y) as u32))
    }

    /// Grown by `margin` tiles on every side.
    pub fn expanded(&self, margin: u32) -> TileRect {
        TileRect::new(
            self.x - margin as i32,
            self.y - margin as i32,
            self.width + margin * 2,
            self.height + margin * 2,
        )
    }

    pub fn center(&self) -> TileCoord {
        TileCoord::new(
            self.x + (self.width / 2) as i32,
            self.y + (self.height / 2) as i32,
        )
    }

    /// Row-major iteration over every coordinate in the rectangle.
    pub fn coords(&self) -> impl Iterator<Item = TileCoord> {
        let (x0, x1, y0, y1) = (self.x, self.max_x(), self.y, self.max_y());
        (y0..y1).flat_map(move |y| (x0..x1).map(move |x| TileCoord::new(x, y)))
    }
}

/// One cell of the world grid. Walkability and movement cost are derived from
/// the biome at construction and never change afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    pub coord: TileCoord,
    pub biome: Biome,
    pub movement_cost: f32,
    pub walkable: bool,
}

impl Tile {
    pub fn from_biome(coord: TileCoord, biome: Biome) -> Self {
        let properties = biome.properties();
        Self {
            coord,
            biome,
            movement_cost: properties.movement_cost,
            walkable: properties.walkable,
        }
    }

    /// Sentinel returned for out-of-range lookups.
    pub fn void(coord: TileCoord) -> Self {
        Self::from_biome(coord, Biome::Void)
    }
}

/// The finished map: tiles, placed structures and loose ground items.
#[derive(Debug, Clone)]
pub struct WorldGrid {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
    structures: Vec<Structure>,
    ground_items: BTreeMap<TileCoord, Vec<Item>>,
}

impl WorldGrid {
    /// Builds a grid from row-major tiles. Tiles whose coordinate does not
    /// match their index are rebuilt in place so lookups stay consistent.
    pub fn from_tiles(width: u32, height: u32, mut tiles: Vec<Tile>) -> Self {
        let expected = width as usize * height as usize;
        tiles.resize(expected, Tile::void(TileCoord::new(0, 0)));
        for (index, tile) in tiles.iter_mut().enumerate() {
            let coord = TileCoord::new(
                (index % width.max(1) as usize) as i32,
                (index / width.max(1) as usize) as i32,
            );
            if tile.coord != coord {
                *tile = Tile::from_biome(coord, tile.biome);
            }
        }
        Self {
            width,
            height,
            tiles,
            structures: Vec::new(),
            ground_items: BTreeMap::new(),
        }
    }

    /// Grid whose biomes come from `biome_at`, called once per tile in
    /// row-major order. Terrain is fixed from then on.
    pub fn from_fn(width: u32, height: u32, mut biome_at: impl FnMut(TileCoord) -> Biome) -> Self {
        let tiles = TileRect::new(0, 0, width, height)
            .coords()
            .map(|coord| Tile::from_biome(coord, biome_at(coord)))
            .collect();
        Self::from_tiles(width, height, tiles)
    }

    /// Grid filled with one biome. Handy for scenarios and tests.
    pub fn filled(width: u32, height: u32, biome: Biome) -> Self {
        Self::from_fn(width, height, |_| biome)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn bounds(&self) -> TileRect {
        TileRect::new(0, 0, self.width, self.height)
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        self.in_bounds(x, y)
            .then(|| y as usize * self.width as usize + x as usize)
    }

    /// Tile at `(x, y)`, or the void sentinel when out of range.
    pub fn tile_at(&self, x: i32, y: i32) -> Tile {
        match self.index(x, y) {
            Some(index) => self.tiles[index],
            None => Tile::void(TileCoord::new(x, y)),
        }
    }

    /// Strict lookup that reports out-of-range coordinates.
    pub fn try_tile(&self, x: i32, y: i32) -> Result<&Tile, OutOfBounds> {
        match self.index(x, y) {
            Some(index) => Ok(&self.tiles[index]),
            None => Err(self.out_of_bounds(x, y)),
        }
    }

    /// Replaces the biome at `(x, y)` for test scenarios. Hosts build terrain
    /// through [`WorldGrid::from_fn`].
    #[cfg(test)]
    pub(crate) fn set_biome(&mut self, x: i32, y: i32, biome: Biome) -> Result<(), OutOfBounds> {
        let index = self.index(x, y).ok_or_else(|| self.out_of_bounds(x, y))?;
        self.tiles[index] = Tile::from_biome(TileCoord::new(x, y), biome);
        Ok(())
    }

    pub fn is_walkable(&self, x: i32, y: i32) -> bool {
        self.tile_at(x, y).walkable
    }

    pub fn movement_cost(&self, x: i32, y: i32) -> f32 {
        self.tile_at(x, y).movement_cost
    }

    pub fn tile_of(&self, point: Vec2) -> TileCoord {
        TileCoord::from_point(point)
    }

    pub fn is_walkable_point(&self, point: Vec2) -> bool {
        if !point.is_finite() {
            return false;
        }
        let coord = TileCoord::from_point(point);
        self.is_walkable(coord.x, coord.y)
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn walkable_tiles(&self) -> impl Iterator<Item = &Tile> {
        self.tiles.iter().filter(|tile| tile.walkable)
    }

    pub fn biome_counts(&self) -> BTreeMap<Biome, usize> {
        let mut counts = BTreeMap::new();
        for tile in &self.tiles {
            *counts.entry(tile.biome).or_insert(0) += 1;
        }
        counts
    }

    /// Closest walkable tile to `origin` by expanding square rings.
    pub fn nearest_walkable(&self, origin: TileCoord, max_radius: u32) -> Option<TileCoord> {
        if self.is_walkable(origin.x, origin.y) {
            return Some(origin);
        }
        for radius in 1..=max_radius as i32 {
            let mut best: Option<(i64, TileCoord)> = None;
            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    if dx.abs() != radius && dy.abs() != radius {
                        continue;
                    }
                    let coord = origin.offset(dx, dy);
                    if !self.is_walkable(coord.x, coord.y) {
                        continue;
                    }
                    let distance = (dx as i64).pow(2) + (dy as i64).pow(2);
                    if best.map_or(true, |(d, _)| distance < d) {
                        best = Some((distance, coord));
                    }
                }
            }
            if let Some((_, coord)) = best {
                return Some(coord);
            }
        }
        None
    }

    // ---- structures ----

    pub fn structures(&self) -> &[Structure] {
        &self.structures
    }

    pub(crate) fn set_structures(&mut self, structures: Vec<Structure>) {
        self.structures = structures;
    }

    pub fn structures_overlapping(&self, region: &TileRect) -> Vec<&Structure> {
        self.structures
            .iter()
            .filter(|structure| structure.footprint.intersects(region))
            .collect()
    }

    pub fn structure_at(&self, coord: TileCoord) -> Option<&Structure> {
        self.structures
            .iter()
            .find(|structure| structure.footprint.contains(coord))
    }

    // ---- ground items ----

    pub fn items_at(&self, x: i32, y: i32) -> &[Item] {
        self.ground_items
            .get(&TileCoord::new(x, y))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn place_item(&mut self, coord: TileCoord, item: Item) -> Result<(), OutOfBounds> {
        if !self.in_bounds(coord.x, coord.y) {
            return Err(self.out_of_bounds(coord.x, coord.y));
        }
        self.ground_items.entry(coord).or_default().push(item);
        Ok(())
    }

    pub fn take_item(&mut self, coord: TileCoord, id: ItemId) -> Option<Item> {
        let stack = self.ground_items.get_mut(&coord)?;
        let position = stack.iter().position(|item| item.id == id)?;
        let item = stack.remove(position);
        if stack.is_empty() {
            self.ground_items.remove(&coord);
        }
        Some(item)
    }

    /// Every ground item with its tile, in coordinate order.
    pub fn ground_items(&self) -> impl Iterator<Item = (TileCoord, &Item)> {
        self.ground_items
            .iter()
            .flat_map(|(coord, items)| items.iter().map(move |item| (*coord, item)))
    }

    pub fn ground_items_in(&self, region: &TileRect) -> Vec<(TileCoord, &Item)> {
        self.ground_items()
            .filter(|(coord, _)| region.contains(*coord))
            .collect()
    }

    pub fn ground_item_count(&self) -> usize {
        self.ground_items.values().map(Vec::len).sum()
    }

    /// True when no two ground items share an id.
    pub fn ground_item_ids_unique(&self) -> bool {
        let mut seen = HashSet::new();
        self.ground_items().all(|(_, item)| seen.insert(item.id))
    }

    fn out_of_bounds(&self, x: i32, y: i32) -> OutOfBounds {
        OutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        }
    }
}
