//! Uniform-grid spatial hash for proximity queries.

use std::collections::HashMap;

use bevy::math::Vec2;

use crate::entity::EntityId;

#[derive(Debug, Clone)]
pub struct SpatialHash {
    cell_size: f32,
    cells: HashMap<(i32, i32), Vec<(EntityId, Vec2)>>,
    len: usize,
}

impl SpatialHash {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(f32::EPSILON),
            cells: HashMap::new(),
            len: 0,
        }
    }

    fn cell(&self, position: Vec2) -> (i32, i32) {
        (
            (position.x / self.cell_size).floor() as i32,
            (position.y / self.cell_size).floor() as i32,
        )
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, id: EntityId, position: Vec2) {
        let cell = self.cell(position);
        self.cells.entry(cell).or_default().push((id, position));
        self.len += 1;
    }

    /// Entries within `radius`, nearest first; ties broken by id.
    pub fn query_radius(&self, center: Vec2, radius: f32) -> Vec<(EntityId, Vec2)> {
        let radius_sq = radius * radius;
        let min = self.cell(center - Vec2::splat(radius));
        let max = self.cell(center + Vec2::splat(radius));
        let mut found: Vec<(f32, EntityId, Vec2)> = Vec::new();
        for cx in min.0..=max.0 {
            for cy in min.1..=max.1 {
                let Some(entries) = self.cells.get(&(cx, cy)) else {
                    continue;
                };
                for (id, position) in entries {
                    let distance_sq = position.distance_squared(center);
                    if distance_sq <= radius_sq {
                        found.push((distance_sq, *id, *position));
                    }
                }
            }
        }
        found.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        found.into_iter().map(|(_, id, pos)| (id, pos)).collect()
    }

    /// Entries inside the axis-aligned box `[min, max]`, sorted by id.
    pub fn query_rect(&self, min: Vec2, max: Vec2) -> Vec<EntityId> {
        let low = self.cell(min);
        let high = self.cell(max);
        let mut found = Vec::new();
        for cx in low.0..=high.0 {
            for cy in low.1..=high.1 {
                let Some(entries) = self.cells.get(&(cx, cy)) else {
                    continue;
                };
                found.extend(
                    entries
                        .iter()
                        .filter(|(_, p)| p.x >= min.x && p.x <= max.x && p.y >= min.y && p.y <= max.y)
                        .map(|(id, _)| *id),
                );
            }
        }
        found.sort();
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_radius_sorted() {
        let mut hash = SpatialHash::new(4.0);
        hash.insert(EntityId(1), Vec2::new(3.0, 0.0));
        hash.insert(EntityId(2), Vec2::new(1.0, 0.0));
        hash.insert(EntityId(3), Vec2::new(9.0, 9.0));
        let hits = hash.query_radius(Vec2::ZERO, 5.0);
        let ids: Vec<_> = hits.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![EntityId(2), EntityId(1)]);
    }

    #[test]
    fn test_query_across_cells() {
        let mut hash = SpatialHash::new(2.0);
        hash.insert(EntityId(1), Vec2::new(-0.5, -0.5));
        hash.insert(EntityId(2), Vec2::new(0.5, 0.5));
        assert_eq!(hash.query_radius(Vec2::ZERO, 1.0).len(), 2);
        assert_eq!(
            hash.query_rect(Vec2::new(-1.0, -1.0), Vec2::new(0.0, 0.0)),
            vec![EntityId(1)]
        );
    }

    #[test]
    fn test_clear() {
        let mut hash = SpatialHash::new(8.0);
        hash.insert(EntityId(1), Vec2::ZERO);
        assert_eq!(hash.len(), 1);
        hash.clear();
        assert!(hash.is_empty());
        assert!(hash.query_radius(Vec2::ZERO, 10.0).is_empty());
    }
}
