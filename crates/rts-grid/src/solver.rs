//! Path-solver trait and the reference grid solver.
//!
//! # Pluggability
//!
//! The movement core dispatches searches through the [`PathSolver`] trait, so
//! applications can swap in hierarchical or flow-field searches without
//! touching the agent state machine.  The default [`GridSolver`] is a plain
//! best-first search over the cost field, enough to run the workspace end to
//! end.
//!
//! # Cost units
//!
//! Straight steps cost `10 × node cost`, diagonal steps `14 × node cost`
//! (integer octile metric).  Diagonals may not cut the corner of a blocked
//! node.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::Arc;

use glam::Vec3;
use rts_core::{PathNodeType, UnitId};

use crate::{BLOCKED, CostField, GridCoord, GridError, GridResult, NEIGHBOR_OFFSETS};

// ── Request / result ──────────────────────────────────────────────────────────

/// Everything a solver needs, owned, so it can run on a pool thread.
#[derive(Clone, Debug)]
pub struct SearchRequest {
    pub unit:             UnitId,
    pub start:            Vec3,
    pub goal:             Vec3,
    /// Footprint edge in nodes.
    pub scale:            u8,
    pub node_type:        PathNodeType,
    /// Ground units with this flag walk over blocked terrain.
    pub can_pass_blocked: bool,
    /// Terrain snapshot taken at dispatch time.
    pub field:            Arc<CostField>,
}

impl SearchRequest {
    /// `true` if blocked nodes must be avoided.
    #[inline]
    pub fn respects_terrain(&self) -> bool {
        self.node_type.respects_terrain() && !self.can_pass_blocked
    }
}

/// The result of a successful search: world-space waypoints from the start
/// node to the goal node, both inclusive.
#[derive(Debug, Clone, Default)]
pub struct SolvedPath {
    pub waypoints: Vec<Vec3>,
    /// Every node popped from the open set, in expansion order.
    #[cfg(feature = "debug-trace")]
    pub explored:  Vec<GridCoord>,
}

// ── PathSolver trait ──────────────────────────────────────────────────────────

/// Pluggable path search.
///
/// # Thread safety
///
/// Implementations must be `Send + Sync` because searches run on a worker
/// pool in parallel with the simulation thread.
pub trait PathSolver: Send + Sync + 'static {
    fn solve(&self, request: &SearchRequest) -> GridResult<SolvedPath>;
}

impl<S: PathSolver + ?Sized> PathSolver for Arc<S> {
    fn solve(&self, request: &SearchRequest) -> GridResult<SolvedPath> {
        (**self).solve(request)
    }
}

// ── GridSolver ────────────────────────────────────────────────────────────────

/// Octile-heuristic best-first search over a [`CostField`].
#[derive(Clone, Debug)]
pub struct GridSolver {
    /// Node expansions before the search reports [`GridError::SearchLimit`].
    pub max_expansions: usize,
}

impl Default for GridSolver {
    fn default() -> Self {
        Self { max_expansions: 1 << 18 }
    }
}

impl PathSolver for GridSolver {
    fn solve(&self, request: &SearchRequest) -> GridResult<SolvedPath> {
        search(request, self.max_expansions)
    }
}

// ── Search internals ──────────────────────────────────────────────────────────

const STRAIGHT: u32 = 10;
const DIAGONAL: u32 = 14;

#[inline]
fn octile(a: GridCoord, b: GridCoord) -> u32 {
    let dx = (a.x - b.x).unsigned_abs();
    let dz = (a.z - b.z).unsigned_abs();
    STRAIGHT * dx.max(dz) + (DIAGONAL - STRAIGHT) * dx.min(dz)
}

#[inline]
fn passable(field: &CostField, req: &SearchRequest, c: GridCoord) -> bool {
    field.in_bounds(c) && (!req.respects_terrain() || !field.is_blocked(req.scale, c.x, c.z))
}

#[inline]
fn step_multiplier(field: &CostField, c: GridCoord) -> u32 {
    match field.cost(c) {
        BLOCKED => 1,
        cost    => cost.max(1) as u32,
    }
}

fn locate(field: &CostField, pos: Vec3) -> GridResult<GridCoord> {
    field
        .coord_of(pos)
        .ok_or(GridError::OutOfBounds { x: pos.x, z: pos.z })
}

fn search(req: &SearchRequest, max_expansions: usize) -> GridResult<SolvedPath> {
    let field = req.field.as_ref();
    let from = locate(field, req.start)?;
    let to = locate(field, req.goal)?;

    if !passable(field, req, to) {
        return Err(GridError::NoPath { from, to });
    }
    if from == to {
        return Ok(reconstruct(field, req, &[], from, to, Vec::new()));
    }

    let n = field.node_count();
    let width = field.width();
    let flat = |c: GridCoord| (c.z as u32 * width + c.x as u32) as usize;

    // g[v] = best known cost to reach v; prev[v] = flattened predecessor.
    let mut g = vec![u32::MAX; n];
    let mut prev = vec![u32::MAX; n];
    let mut explored = Vec::new();

    g[flat(from)] = 0;

    // Min-heap on (f, g-tiebreak, node).  Reverse turns BinaryHeap into a
    // min-heap; the flattened index makes tie-breaking deterministic.
    let mut heap: BinaryHeap<Reverse<(u32, u32, u32)>> = BinaryHeap::new();
    heap.push(Reverse((octile(from, to), 0, flat(from) as u32)));

    let mut expanded = 0usize;
    while let Some(Reverse((_, cost, node))) = heap.pop() {
        let here = field.coord_at(rts_core::NodeIndex(node));
        if here == to {
            return Ok(reconstruct(field, req, &prev, from, to, explored));
        }
        // Skip stale heap entries.
        if cost > g[node as usize] {
            continue;
        }
        expanded += 1;
        if expanded > max_expansions {
            return Err(GridError::SearchLimit { expanded });
        }
        if cfg!(feature = "debug-trace") {
            explored.push(here);
        }

        for (dx, dz) in NEIGHBOR_OFFSETS {
            let next = here.offset(dx, dz);
            if !passable(field, req, next) {
                continue;
            }
            let diagonal = dx != 0 && dz != 0;
            if diagonal
                && (!passable(field, req, here.offset(dx, 0)) || !passable(field, req, here.offset(0, dz)))
            {
                continue;
            }
            let base = if diagonal { DIAGONAL } else { STRAIGHT };
            let new_cost = cost.saturating_add(base * step_multiplier(field, next));
            let ni = flat(next);
            if new_cost < g[ni] {
                g[ni] = new_cost;
                prev[ni] = node;
                heap.push(Reverse((new_cost.saturating_add(octile(next, to)), new_cost, ni as u32)));
            }
        }
    }

    Err(GridError::NoPath { from, to })
}

#[cfg_attr(not(feature = "debug-trace"), allow(unused_variables))]
fn reconstruct(
    field:    &CostField,
    req:      &SearchRequest,
    prev:     &[u32],
    from:     GridCoord,
    to:       GridCoord,
    explored: Vec<GridCoord>,
) -> SolvedPath {
    let mut coords = vec![to];
    let mut cur = to;
    while cur != from {
        let idx = (cur.z as u32 * field.width() + cur.x as u32) as usize;
        let p = prev[idx];
        if p == u32::MAX {
            break;
        }
        cur = field.coord_at(rts_core::NodeIndex(p));
        coords.push(cur);
    }
    coords.reverse();

    // Waypoints keep the unit's own height so air units stay at altitude.
    let waypoints = coords
        .into_iter()
        .map(|c| {
            let mut p = field.center_of(c);
            p.y = req.start.y;
            p
        })
        .collect();

    SolvedPath {
        waypoints,
        #[cfg(feature = "debug-trace")]
        explored,
    }
}
