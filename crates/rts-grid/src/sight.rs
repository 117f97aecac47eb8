//! Static obstacles and line-of-sight queries used by path smoothing.

use glam::{Vec2, Vec3};
use tracing::debug;

use rts_core::planar::flat;

use crate::{BLOCKED, CostField, OccupancyGrid};

/// Answers "can a unit walk straight from `from` to `to`?".
pub trait LineOfSight {
    fn is_clear(&self, from: Vec3, to: Vec3) -> bool;
}

// ── Obstacle ──────────────────────────────────────────────────────────────────

/// Axis-aligned footprint of a static scene object on the XZ plane.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Obstacle {
    /// `(min_x, min_z)`.
    pub min: Vec2,
    /// `(max_x, max_z)`.
    pub max: Vec2,
}

impl Obstacle {
    /// Rectangle centred on `center` (XZ) with the given half extents.
    pub fn from_center(center: Vec3, half_extents: Vec2) -> Self {
        let c = flat(center);
        Self { min: c - half_extents, max: c + half_extents }
    }

    /// Slab test of the segment `a → b` against the rectangle.
    pub fn intersects_segment(&self, a: Vec2, b: Vec2) -> bool {
        let d = b - a;
        let mut t_enter = 0.0_f32;
        let mut t_exit = 1.0_f32;
        for axis in 0..2 {
            if d[axis].abs() < f32::EPSILON {
                if a[axis] < self.min[axis] || a[axis] > self.max[axis] {
                    return false;
                }
                continue;
            }
            let inv = 1.0 / d[axis];
            let mut t0 = (self.min[axis] - a[axis]) * inv;
            let mut t1 = (self.max[axis] - a[axis]) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_enter = t_enter.max(t0);
            t_exit = t_exit.min(t1);
            if t_enter > t_exit {
                return false;
            }
        }
        true
    }
}

// ── ObstacleSet ───────────────────────────────────────────────────────────────

/// All static obstacles in a scene.
#[derive(Clone, Debug, Default)]
pub struct ObstacleSet {
    obstacles: Vec<Obstacle>,
}

impl ObstacleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an obstacle.  Call [`stamp`](Self::stamp) again to block its terrain.
    pub fn push(&mut self, obstacle: Obstacle) {
        self.obstacles.push(obstacle);
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Obstacles in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    /// Mark every node overlapped by an obstacle as [`BLOCKED`].
    pub fn stamp(&self, grid: &mut OccupancyGrid) {
        self.write(grid, Some(BLOCKED));
    }

    /// Restore default cost under every obstacle.
    pub fn unstamp(&self, grid: &mut OccupancyGrid) {
        self.write(grid, None);
    }

    fn write(&self, grid: &mut OccupancyGrid, cost: Option<i32>) {
        for obstacle in &self.obstacles {
            let Some((lo, hi)) = grid.field().coords_overlapping(obstacle.min, obstacle.max) else {
                continue;
            };
            for z in lo.z..=hi.z {
                for x in lo.x..=hi.x {
                    match cost {
                        Some(c) => grid.set_cost(x, z, c, 1),
                        None    => grid.remove_cost(x, z, 1),
                    }
                }
            }
            debug!(min = ?obstacle.min, max = ?obstacle.max, stamped = cost.is_some(), "obstacle_footprint");
        }
    }
}

impl LineOfSight for ObstacleSet {
    fn is_clear(&self, from: Vec3, to: Vec3) -> bool {
        let (a, b) = (flat(from), flat(to));
        !self.obstacles.iter().any(|o| o.intersects_segment(a, b))
    }
}

impl LineOfSight for CostField {
    /// Samples the segment every quarter node and fails on any blocked node.
    fn is_clear(&self, from: Vec3, to: Vec3) -> bool {
        let step = self.node_size() * 0.25;
        let len = flat(to).distance(flat(from));
        let samples = (len / step).ceil().max(1.0) as u32;
        (0..=samples).all(|i| {
            let p = from.lerp(to, i as f32 / samples as f32);
            match self.coord_of(p) {
                Some(c) => self.cost(c) != BLOCKED,
                None    => false,
            }
        })
    }
}

/// Obstacles and blocked terrain together.
pub struct SceneLineOfSight<'a> {
    pub obstacles: &'a ObstacleSet,
    pub field:     &'a CostField,
}

impl LineOfSight for SceneLineOfSight<'_> {
    fn is_clear(&self, from: Vec3, to: Vec3) -> bool {
        self.obstacles.is_clear(from, to) && self.field.is_clear(from, to)
    }
}
