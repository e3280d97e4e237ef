//! Uniform-grid spatial index.
//!
//! Entities are bucketed by the floor-divided coordinates of their last
//! known position. Radius queries visit every bucket within
//! `ceil(radius / cell_size)` rings of the query point and return the union
//! of their members: a superset of the exact match, never missing an entity
//! that is actually within range. Callers filter by exact distance when
//! precision matters.

use std::collections::HashMap;

use crate::entity::EntityKey;

/// Integer bucket coordinates.
pub type CellKey = (i32, i32);

/// Grid-based spatial partitioning structure.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f64,
    cells: HashMap<CellKey, Vec<EntityKey>>,
    /// Reverse lookup: entity to the bucket it currently sits in.
    entity_cells: HashMap<EntityKey, CellKey>,
}

impl SpatialGrid {
    /// Create an empty grid. `cell_size` must be finite and positive; the
    /// registry validates this before constructing its grids.
    pub fn new(cell_size: f64) -> Self {
        Self {
            cell_size,
            cells: HashMap::new(),
            entity_cells: HashMap::new(),
        }
    }

    /// Side length of one bucket.
    pub fn cell_size(&self) -> f64 {
        self.cell_size
    }

    /// Convert world coordinates to bucket coordinates.
    #[inline]
    pub fn cell_of(&self, x: f64, y: f64) -> CellKey {
        (
            (x / self.cell_size).floor() as i32,
            (y / self.cell_size).floor() as i32,
        )
    }

    /// Insert an entity at a position. Re-adding an entity that is already
    /// indexed moves it instead of duplicating it.
    pub fn add(&mut self, entity: EntityKey, x: f64, y: f64) {
        let cell = self.cell_of(x, y);
        if let Some(&current) = self.entity_cells.get(&entity) {
            if current == cell {
                return;
            }
            self.detach(entity, current);
        }
        self.cells.entry(cell).or_default().push(entity);
        self.entity_cells.insert(entity, cell);
    }

    /// Remove an entity by identity. Returns `false` if it was not indexed.
    pub fn remove(&mut self, entity: EntityKey) -> bool {
        match self.entity_cells.remove(&entity) {
            Some(cell) => {
                self.detach(entity, cell);
                true
            }
            None => false,
        }
    }

    /// Reconcile an entity's bucket after it moved from `(old_x, old_y)` to
    /// `(new_x, new_y)`. Returns `true` if the entity changed bucket.
    ///
    /// Most moves stay within one bucket, so the common case is two
    /// floor-divisions and a comparison.
    pub fn update(&mut self, entity: EntityKey, old_x: f64, old_y: f64, new_x: f64, new_y: f64) -> bool {
        let old_cell = self.cell_of(old_x, old_y);
        let new_cell = self.cell_of(new_x, new_y);
        if old_cell == new_cell {
            return false;
        }
        // The tracked bucket is authoritative if a previous update was skipped.
        let Some(current) = self.entity_cells.get(&entity).copied() else {
            return false;
        };
        if current == new_cell {
            return false;
        }
        self.detach(entity, current);
        self.cells.entry(new_cell).or_default().push(entity);
        self.entity_cells.insert(entity, new_cell);
        true
    }

    /// All entities in buckets within `ceil(radius / cell_size)` rings of
    /// the bucket containing `(x, y)`.
    ///
    /// Buckets are visited in ascending `(column, row)` order. When the ring
    /// box spans more buckets than are occupied, the occupied buckets are
    /// filtered instead, so the cost is bounded by the grid's contents.
    pub fn query(&self, x: f64, y: f64, radius: f64) -> Vec<EntityKey> {
        let rings = self.rings_for(radius);
        let (cx, cy) = self.cell_of(x, y);
        let side = 2 * rings + 1;

        let mut results = Vec::new();
        let box_exceeds_occupied = side
            .checked_mul(side)
            .is_none_or(|cells| cells > self.cells.len() as i64);
        if box_exceeds_occupied {
            let within = |(kx, ky): &CellKey| {
                (i64::from(*kx) - i64::from(cx)).abs() <= rings
                    && (i64::from(*ky) - i64::from(cy)).abs() <= rings
            };
            let mut hits: Vec<CellKey> = self.cells.keys().copied().filter(within).collect();
            hits.sort_unstable();
            for cell in hits {
                results.extend_from_slice(self.cell(cell));
            }
            return results;
        }

        for dx in -rings..=rings {
            for dy in -rings..=rings {
                let kx = i32::try_from(i64::from(cx) + dx);
                let ky = i32::try_from(i64::from(cy) + dy);
                if let (Ok(kx), Ok(ky)) = (kx, ky) {
                    results.extend_from_slice(self.cell((kx, ky)));
                }
            }
        }
        results
    }

    /// Ring count covering `radius`. Non-positive and NaN radii cover only
    /// the query bucket; huge radii saturate.
    fn rings_for(&self, radius: f64) -> i64 {
        if radius > 0.0 {
            (radius / self.cell_size).ceil().min(f64::from(u32::MAX)) as i64
        } else {
            0
        }
    }

    /// Members of a single bucket.
    pub fn cell(&self, cell: CellKey) -> &[EntityKey] {
        self.cells.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The bucket an entity is currently filed under.
    pub fn cell_key_of(&self, entity: EntityKey) -> Option<CellKey> {
        self.entity_cells.get(&entity).copied()
    }

    /// Whether the entity is indexed.
    pub fn contains(&self, entity: EntityKey) -> bool {
        self.entity_cells.contains_key(&entity)
    }

    /// Total indexed entities.
    pub fn len(&self) -> usize {
        self.entity_cells.len()
    }

    /// `true` if no entity is indexed.
    pub fn is_empty(&self) -> bool {
        self.entity_cells.is_empty()
    }

    /// Number of non-empty buckets.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Drop every bucket.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.entity_cells.clear();
    }

    fn detach(&mut self, entity: EntityKey, cell: CellKey) {
        if let Some(entries) = self.cells.get_mut(&cell) {
            entries.retain(|e| *e != entity);
            if entries.is_empty() {
                self.cells.remove(&cell);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityId;
    use crate::species::SpeciesId;

    fn key(id: u32) -> EntityKey {
        EntityKey::new(SpeciesId(1), EntityId(id))
    }

    #[test]
    fn floor_division_handles_negative_coordinates() {
        let grid = SpatialGrid::new(150.0);
        assert_eq!(grid.cell_of(10.0, 10.0), (0, 0));
        assert_eq!(grid.cell_of(160.0, 10.0), (1, 0));
        assert_eq!(grid.cell_of(-0.5, -150.0), (-1, -1));
        assert_eq!(grid.cell_of(-150.5, 0.0), (-2, 0));
    }

    #[test]
    fn add_twice_never_duplicates() {
        let mut grid = SpatialGrid::new(10.0);
        grid.add(key(1), 5.0, 5.0);
        grid.add(key(1), 6.0, 6.0);
        assert_eq!(grid.len(), 1);
        assert_eq!(grid.cell((0, 0)), &[key(1)]);

        // Re-adding in another bucket moves the entry.
        grid.add(key(1), 25.0, 5.0);
        assert_eq!(grid.len(), 1);
        assert!(grid.cell((0, 0)).is_empty());
        assert_eq!(grid.cell((2, 0)), &[key(1)]);
    }

    #[test]
    fn remove_by_identity() {
        let mut grid = SpatialGrid::new(10.0);
        grid.add(key(1), 1.0, 1.0);
        grid.add(key(2), 2.0, 2.0);
        assert!(grid.remove(key(1)));
        assert!(!grid.remove(key(1)));
        assert_eq!(grid.cell((0, 0)), &[key(2)]);
        assert!(!grid.contains(key(1)));
    }

    #[test]
    fn update_within_cell_is_noop() {
        let mut grid = SpatialGrid::new(150.0);
        grid.add(key(1), 10.0, 10.0);
        assert!(!grid.update(key(1), 10.0, 10.0, 140.0, 20.0));
        assert_eq!(grid.cell_key_of(key(1)), Some((0, 0)));
    }

    #[test]
    fn update_across_cells_relocates() {
        let mut grid = SpatialGrid::new(150.0);
        grid.add(key(1), 10.0, 10.0);
        assert!(grid.update(key(1), 10.0, 10.0, 160.0, 10.0));
        assert_eq!(grid.cell_key_of(key(1)), Some((1, 0)));
        assert!(grid.cell((0, 0)).is_empty());
        assert_eq!(grid.occupied_cells(), 1);
    }

    #[test]
    fn update_of_unindexed_entity_is_ignored() {
        let mut grid = SpatialGrid::new(10.0);
        assert!(!grid.update(key(7), 0.0, 0.0, 50.0, 50.0));
        assert!(grid.is_empty());
    }

    #[test]
    fn query_radius_zero_covers_only_own_cell() {
        let mut grid = SpatialGrid::new(10.0);
        grid.add(key(1), 5.0, 5.0);
        grid.add(key(2), 15.0, 5.0);
        assert_eq!(grid.query(5.0, 5.0, 0.0), vec![key(1)]);
    }

    #[test]
    fn query_visits_rings() {
        let mut grid = SpatialGrid::new(10.0);
        grid.add(key(1), 5.0, 5.0);
        grid.add(key(2), 15.0, 5.0);
        grid.add(key(3), 100.0, 100.0);

        let mut nearby = grid.query(5.0, 5.0, 5.0);
        nearby.sort();
        // One ring: buckets (-1..=1, -1..=1) around (0, 0).
        assert_eq!(nearby, vec![key(1), key(2)]);

        let far = grid.query(100.0, 100.0, 10.0);
        assert_eq!(far, vec![key(3)]);
    }

    #[test]
    fn huge_radius_is_bounded_by_occupied_cells() {
        let mut grid = SpatialGrid::new(150.0);
        grid.add(key(1), 10.0, 10.0);
        grid.add(key(2), -4_000.0, 9_000.0);

        let mut found = grid.query(10.0, 10.0, 1.5e6);
        found.sort();
        assert_eq!(found, vec![key(1), key(2)]);

        let mut everything = grid.query(10.0, 10.0, f64::INFINITY);
        everything.sort();
        assert_eq!(everything, vec![key(1), key(2)]);
        assert_eq!(grid.query(10.0, 10.0, f64::NAN), vec![key(1)]);
    }

    #[test]
    fn query_near_the_key_limits_does_not_overflow() {
        let mut grid = SpatialGrid::new(1.0);
        grid.add(key(1), 1e300, 1e300);
        grid.add(key(2), -1e300, -1e300);
        // Dense enough to take the ring walk around the saturated key.
        for id in 3..40 {
            grid.add(key(id), f64::from(id) * 3.0, 0.0);
        }
        assert_eq!(grid.query(1e300, 1e300, 2.0), vec![key(1)]);
        assert_eq!(grid.query(-1e300, -1e300, 2.0), vec![key(2)]);
    }

    #[test]
    fn both_query_paths_agree_on_order() {
        let mut grid = SpatialGrid::new(10.0);
        let mut id = 0;
        for cx in -3..=3 {
            for cy in -3..=3 {
                id += 1;
                grid.add(key(id), f64::from(cx) * 10.0 + 5.0, f64::from(cy) * 10.0 + 5.0);
            }
        }
        // 49 occupied buckets: a one-ring box (9 buckets) is walked, a
        // four-ring box (81 buckets) filters the occupied set.
        let walked = grid.query(5.0, 5.0, 10.0);
        let filtered = grid.query(5.0, 5.0, 40.0);
        assert_eq!(walked.len(), 9);
        assert_eq!(filtered.len(), 49);

        let inner: Vec<EntityKey> = filtered
            .iter()
            .copied()
            .filter(|k| walked.contains(k))
            .collect();
        assert_eq!(inner, walked);
    }

    #[test]
    fn clear_empties_everything() {
        let mut grid = SpatialGrid::new(10.0);
        grid.add(key(1), 5.0, 5.0);
        grid.clear();
        assert!(grid.is_empty());
        assert_eq!(grid.occupied_cells(), 0);
    }
}
