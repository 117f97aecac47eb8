//! The occupancy grid: terrain plus per-node unit reservations.
//!
//! # Reservation model
//!
//! A reservation is keyed by `(NodeIndex, scale, PathNodeType)`, so ground and
//! air units live in separate sub-grids and differently sized footprints do
//! not alias.  Each key holds at most one [`UnitId`].
//!
//! [`OccupancyGrid::reserve`] is a single read-modify-write through the map's
//! entry API: the emptiness check and the insert cannot be separated, so two
//! agents negotiating in the same tick can never both believe they claimed a
//! node.
//!
//! # Terrain snapshots
//!
//! Terrain lives in an `Arc<CostField>`.  [`OccupancyGrid::snapshot`] hands a
//! cheap clone of the `Arc` to a path search; cost edits go through
//! `Arc::make_mut`, which copies the field only while a search still holds
//! the old snapshot.

use std::collections::hash_map::Entry;
use std::sync::Arc;

use glam::Vec3;
use rustc_hash::FxHashMap;
use rts_core::{NodeIndex, PathNodeType, UnitId};

use crate::{CostField, GridCoord, GridResult, GridSettings, NeighborTransforms};

/// Reservation key.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct OccupancyKey {
    pub index:     NodeIndex,
    pub scale:     u8,
    pub node_type: PathNodeType,
}

impl OccupancyKey {
    /// Key of the `scale` sub-grid of `node_type` at `index`.
    #[inline]
    pub fn new(index: NodeIndex, scale: u8, node_type: PathNodeType) -> Self {
        Self { index, scale, node_type }
    }
}

/// Terrain costs plus the reservation table shared by every agent.
pub struct OccupancyGrid {
    field:        Arc<CostField>,
    reservations: FxHashMap<OccupancyKey, UnitId>,
}

impl OccupancyGrid {
    /// Empty grid over a fresh [`CostField`] built from `settings`.
    pub fn new(settings: &GridSettings) -> GridResult<Self> {
        Ok(Self::from_field(CostField::new(settings)?))
    }

    /// Empty grid over an existing terrain field.
    pub fn from_field(field: CostField) -> Self {
        Self {
            field:        Arc::new(field),
            reservations: FxHashMap::default(),
        }
    }

    // ── Terrain ───────────────────────────────────────────────────────────

    /// Current terrain.
    #[inline]
    pub fn field(&self) -> &CostField {
        &self.field
    }

    /// Immutable terrain snapshot for a path search.
    #[inline]
    pub fn snapshot(&self) -> Arc<CostField> {
        Arc::clone(&self.field)
    }

    /// `true` if any node of the `scale`×`scale` footprint at `(x, z)` is
    /// blocked or off the grid.
    #[inline]
    pub fn is_blocked(&self, scale: u8, x: i32, z: i32) -> bool {
        self.field.is_blocked(scale, x, z)
    }

    /// `is_blocked` for the node under a world position.  Off-grid is blocked.
    pub fn is_blocked_at(&self, scale: u8, pos: Vec3) -> bool {
        match self.field.coord_of(pos) {
            Some(c) => self.field.is_blocked(scale, c.x, c.z),
            None    => true,
        }
    }

    /// Write `cost` over a `size`×`size` footprint.  Searches already in
    /// flight keep the snapshot they were given.
    pub fn set_cost(&mut self, x: i32, z: i32, cost: i32, size: u32) {
        Arc::make_mut(&mut self.field).set_cost(x, z, cost, size);
    }

    /// Restore the default cost over a footprint.
    pub fn remove_cost(&mut self, x: i32, z: i32, size: u32) {
        Arc::make_mut(&mut self.field).remove_cost(x, z, size);
    }

    // ── Reservations ──────────────────────────────────────────────────────

    /// Unit currently holding `index` in the given sub-grid, if any.
    #[inline]
    pub fn occupant_at(&self, index: NodeIndex, scale: u8, node_type: PathNodeType) -> Option<UnitId> {
        self.reservations
            .get(&OccupancyKey::new(index, scale, node_type))
            .copied()
    }

    /// Reserve `index` for `unit`.
    ///
    /// Returns `true` if the node was free or already held by `unit`, `false`
    /// if another unit holds it.  Off-grid indices are refused.
    pub fn reserve(&mut self, index: NodeIndex, scale: u8, node_type: PathNodeType, unit: UnitId) -> bool {
        if index.index() >= self.field.node_count() {
            return false;
        }
        match self.reservations.entry(OccupancyKey::new(index, scale, node_type)) {
            Entry::Vacant(slot) => {
                slot.insert(unit);
                true
            }
            Entry::Occupied(slot) => *slot.get() == unit,
        }
    }

    /// Clear the reservation on `index`.  Returns `true` if one existed.
    pub fn release(&mut self, index: NodeIndex, scale: u8, node_type: PathNodeType) -> bool {
        self.reservations
            .remove(&OccupancyKey::new(index, scale, node_type))
            .is_some()
    }

    /// Clear the reservation on `index` only if `unit` holds it.
    pub fn release_held(&mut self, index: NodeIndex, scale: u8, node_type: PathNodeType, unit: UnitId) -> bool {
        let key = OccupancyKey::new(index, scale, node_type);
        match self.reservations.get(&key) {
            Some(&holder) if holder == unit => {
                self.reservations.remove(&key);
                true
            }
            _ => false,
        }
    }

    /// Total live reservations across all sub-grids.
    #[inline]
    pub fn reservation_count(&self) -> usize {
        self.reservations.len()
    }

    /// Keys currently held by `unit`.  O(reservations); for tests and audits.
    pub fn reservations_of(&self, unit: UnitId) -> Vec<OccupancyKey> {
        self.reservations
            .iter()
            .filter(|&(_, &holder)| holder == unit)
            .map(|(&key, _)| key)
            .collect()
    }

    // ── Free-node search ──────────────────────────────────────────────────

    /// `true` if a unit of this footprint could stand on `c`: on the grid,
    /// passable (when `respect_terrain`), and unreserved or held by `ignore`.
    pub fn is_free(
        &self,
        c:               GridCoord,
        scale:           u8,
        node_type:       PathNodeType,
        respect_terrain: bool,
        ignore:          Option<UnitId>,
    ) -> bool {
        let Some(index) = self.field.index_of(c) else {
            return false;
        };
        if respect_terrain && self.field.is_blocked(scale, c.x, c.z) {
            return false;
        }
        match self.occupant_at(index, scale, node_type) {
            None         => true,
            Some(holder) => Some(holder) == ignore,
        }
    }

    /// Centre of the closest free node to `around`, walking `transforms` in
    /// ascending distance.  `None` if `around` is off the grid or no offset in
    /// the table yields a free node.
    pub fn closest_free_node(
        &self,
        around:          Vec3,
        scale:           u8,
        node_type:       PathNodeType,
        respect_terrain: bool,
        ignore:          Option<UnitId>,
        transforms:      &NeighborTransforms,
    ) -> Option<Vec3> {
        let center = self.field.coord_of(around)?;
        transforms
            .iter()
            .map(|(dx, dz)| center.offset(dx, dz))
            .find(|&c| self.is_free(c, scale, node_type, respect_terrain, ignore))
            .map(|c| self.field.center_of(c))
    }
}
