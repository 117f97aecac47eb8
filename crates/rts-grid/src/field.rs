//! Static terrain: a dense per-node cost field.
//!
//! # Layout
//!
//! Nodes are square cells of `node_size` world units on the XZ plane.  Node
//! `(x, z)` covers `[origin.x + x·size, origin.x + (x+1)·size)` and likewise
//! on Z.  Costs are stored row-major and indexed by
//!
//! ```text
//! NodeIndex = z * width + x
//! ```
//!
//! A cost of [`BLOCKED`] (`-1`) marks impassable terrain.  Every other value is
//! a traversal multiplier (`>= 1`).
//!
//! The field is shared with in-flight searches as an `Arc<CostField>` snapshot;
//! the occupancy grid copies on write, so a solver thread never sees a
//! half-applied cost change.

use std::fmt;

use glam::Vec3;
use rts_core::NodeIndex;

use crate::{GridError, GridResult};

/// Cost value marking an impassable node.
pub const BLOCKED: i32 = -1;

// ── GridCoord ─────────────────────────────────────────────────────────────────

/// Integer node coordinate.  Signed so neighbour offsets can step off the
/// edge and be rejected by [`CostField::in_bounds`].
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridCoord {
    pub x: i32,
    pub z: i32,
}

impl GridCoord {
    #[inline]
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Coordinate shifted by `(dx, dz)` nodes.  May leave the grid.
    #[inline]
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self { x: self.x + dx, z: self.z + dz }
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.x, self.z)
    }
}

// ── GridSettings ──────────────────────────────────────────────────────────────

/// Dimensions and placement of a grid.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridSettings {
    pub width:        u32,
    pub height:       u32,
    /// World units per node edge.
    pub node_size:    f32,
    /// World position of the minimum corner of node `(0, 0)`.
    pub origin:       Vec3,
    /// Cost written by `remove_cost` and used for fresh nodes.
    pub default_cost: i32,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            width:        64,
            height:       64,
            node_size:    1.0,
            origin:       Vec3::ZERO,
            default_cost: 1,
        }
    }
}

// ── CostField ─────────────────────────────────────────────────────────────────

/// Dense per-node traversal cost.
#[derive(Clone, Debug)]
pub struct CostField {
    width:        u32,
    height:       u32,
    node_size:    f32,
    origin:       Vec3,
    default_cost: i32,
    costs:        Vec<i32>,
}

impl CostField {
    /// Allocate a field at `default_cost` everywhere.
    ///
    /// Fails on a zero dimension, a non-positive node size, or a default cost
    /// of [`BLOCKED`].
    pub fn new(settings: &GridSettings) -> GridResult<Self> {
        if settings.width == 0 || settings.height == 0 {
            return Err(GridError::InvalidSettings("grid must have at least one node"));
        }
        if !(settings.node_size > 0.0) {
            return Err(GridError::InvalidSettings("node_size must be positive"));
        }
        if settings.default_cost == BLOCKED {
            return Err(GridError::InvalidSettings("default cost cannot be BLOCKED"));
        }
        Ok(Self {
            width:        settings.width,
            height:       settings.height,
            node_size:    settings.node_size,
            origin:       settings.origin,
            default_cost: settings.default_cost,
            costs:        vec![settings.default_cost; settings.width as usize * settings.height as usize],
        })
    }

    // ── Dimensions ────────────────────────────────────────────────────────

    /// Nodes along X.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Nodes along Z.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// World units per node edge.
    #[inline]
    pub fn node_size(&self) -> f32 {
        self.node_size
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.costs.len()
    }

    // ── Coordinate conversion ─────────────────────────────────────────────

    /// `true` if `c` names a node of this field.
    #[inline]
    pub fn in_bounds(&self, c: GridCoord) -> bool {
        c.x >= 0 && c.z >= 0 && (c.x as u32) < self.width && (c.z as u32) < self.height
    }

    /// Node containing world position `pos`, or `None` off the grid.
    pub fn coord_of(&self, pos: Vec3) -> Option<GridCoord> {
        let fx = ((pos.x - self.origin.x) / self.node_size).floor();
        let fz = ((pos.z - self.origin.z) / self.node_size).floor();
        if !fx.is_finite() || !fz.is_finite() {
            return None;
        }
        let c = GridCoord::new(fx as i32, fz as i32);
        self.in_bounds(c).then_some(c)
    }

    /// World-space centre of node `c` at the grid's base height.
    #[inline]
    pub fn center_of(&self, c: GridCoord) -> Vec3 {
        Vec3::new(
            self.origin.x + (c.x as f32 + 0.5) * self.node_size,
            self.origin.y,
            self.origin.z + (c.z as f32 + 0.5) * self.node_size,
        )
    }

    /// Flattened index of an in-bounds coordinate.
    #[inline]
    pub fn index_of(&self, c: GridCoord) -> Option<NodeIndex> {
        self.in_bounds(c)
            .then(|| NodeIndex(c.z as u32 * self.width + c.x as u32))
    }

    /// Index of the node containing `pos`.
    #[inline]
    pub fn index_at(&self, pos: Vec3) -> Option<NodeIndex> {
        self.coord_of(pos).and_then(|c| self.index_of(c))
    }

    /// Inverse of [`index_of`](Self::index_of).
    #[inline]
    pub fn coord_at(&self, index: NodeIndex) -> GridCoord {
        GridCoord::new((index.0 % self.width) as i32, (index.0 / self.width) as i32)
    }

    // ── Costs ─────────────────────────────────────────────────────────────

    /// Cost at `c`; off-grid nodes read as [`BLOCKED`].
    #[inline]
    pub fn cost(&self, c: GridCoord) -> i32 {
        match self.index_of(c) {
            Some(i) => self.costs[i.index()],
            None    => BLOCKED,
        }
    }

    /// `true` if any node in the `scale`×`scale` footprint anchored at
    /// `(x, z)` is blocked or off the grid.
    pub fn is_blocked(&self, scale: u8, x: i32, z: i32) -> bool {
        let size = scale.max(1) as i32;
        for dz in 0..size {
            for dx in 0..size {
                if self.cost(GridCoord::new(x + dx, z + dz)) == BLOCKED {
                    return true;
                }
            }
        }
        false
    }

    /// Write `cost` over the `size`×`size` footprint anchored at `(x, z)`.
    /// Off-grid parts of the footprint are ignored.
    pub fn set_cost(&mut self, x: i32, z: i32, cost: i32, size: u32) {
        let size = size.max(1) as i32;
        for dz in 0..size {
            for dx in 0..size {
                if let Some(i) = self.index_of(GridCoord::new(x + dx, z + dz)) {
                    self.costs[i.index()] = cost;
                }
            }
        }
    }

    /// Restore the default cost over a footprint.
    pub fn remove_cost(&mut self, x: i32, z: i32, size: u32) {
        self.set_cost(x, z, self.default_cost, size);
    }

    /// Inclusive coordinate range of nodes overlapping the XZ rectangle
    /// `[min, max]`, clipped to the grid.  `None` if nothing overlaps.
    pub fn coords_overlapping(&self, min: glam::Vec2, max: glam::Vec2) -> Option<(GridCoord, GridCoord)> {
        let lo_x = ((min.x - self.origin.x) / self.node_size).floor() as i32;
        let lo_z = ((min.y - self.origin.z) / self.node_size).floor() as i32;
        let hi_x = ((max.x - self.origin.x) / self.node_size).ceil() as i32 - 1;
        let hi_z = ((max.y - self.origin.z) / self.node_size).ceil() as i32 - 1;
        let lo = GridCoord::new(lo_x.max(0), lo_z.max(0));
        let hi = GridCoord::new(hi_x.min(self.width as i32 - 1), hi_z.min(self.height as i32 - 1));
        (lo.x <= hi.x && lo.z <= hi.z).then_some((lo, hi))
    }
}
