//! Unit tests for rts-grid.
//!
//! All tests use small hand-built grids with `node_size = 1` and the origin at
//! zero, so node `(x, z)` has its centre at `(x + 0.5, 0, z + 0.5)`.

#[cfg(test)]
mod helpers {
    use glam::Vec3;

    use crate::{GridSettings, OccupancyGrid};

    pub fn open_grid(width: u32, height: u32) -> OccupancyGrid {
        OccupancyGrid::new(&GridSettings { width, height, ..GridSettings::default() }).unwrap()
    }

    pub fn center(x: i32, z: i32) -> Vec3 {
        Vec3::new(x as f32 + 0.5, 0.0, z as f32 + 0.5)
    }
}

// ── CostField ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod field {
    use glam::Vec3;

    use super::helpers::{center, open_grid};
    use crate::{BLOCKED, CostField, GridCoord, GridSettings};

    #[test]
    fn rejects_empty_grid() {
        let s = GridSettings { width: 0, ..GridSettings::default() };
        assert!(CostField::new(&s).is_err());
    }

    #[test]
    fn coord_and_center_agree() {
        let grid = open_grid(8, 8);
        let f = grid.field();
        let c = f.coord_of(Vec3::new(3.9, 0.0, 5.1)).unwrap();
        assert_eq!(c, GridCoord::new(3, 5));
        assert_eq!(f.center_of(c), center(3, 5));
        assert_eq!(f.coord_at(f.index_of(c).unwrap()), c);
    }

    #[test]
    fn off_grid_positions_have_no_coord() {
        let grid = open_grid(4, 4);
        assert!(grid.field().coord_of(Vec3::new(-0.1, 0.0, 1.0)).is_none());
        assert!(grid.field().coord_of(Vec3::new(1.0, 0.0, 4.0)).is_none());
        assert!(grid.is_blocked_at(1, Vec3::new(9.0, 0.0, 9.0)));
    }

    #[test]
    fn footprint_blocking() {
        let mut grid = open_grid(6, 6);
        grid.set_cost(3, 3, BLOCKED, 1);
        assert!(grid.is_blocked(1, 3, 3));
        assert!(!grid.is_blocked(1, 2, 2));
        // A 2×2 footprint anchored at (2,2) covers (3,3).
        assert!(grid.is_blocked(2, 2, 2));
        // Footprint running off the edge is blocked.
        assert!(grid.is_blocked(2, 5, 0));
        grid.remove_cost(3, 3, 1);
        assert!(!grid.is_blocked(2, 2, 2));
    }

    #[test]
    fn cost_edit_does_not_touch_existing_snapshot() {
        let mut grid = open_grid(4, 4);
        let snap = grid.snapshot();
        grid.set_cost(1, 1, BLOCKED, 2);
        assert_ne!(snap.cost(GridCoord::new(1, 1)), BLOCKED);
        assert_eq!(grid.field().cost(GridCoord::new(2, 2)), BLOCKED);
    }
}

// ── Reservations ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod occupancy {
    use rts_core::{NodeIndex, PathNodeType, UnitId};

    use super::helpers::{center, open_grid};

    #[test]
    fn one_holder_per_key() {
        let mut grid = open_grid(4, 4);
        let i = NodeIndex(5);
        assert!(grid.reserve(i, 1, PathNodeType::Ground, UnitId(0)));
        assert!(!grid.reserve(i, 1, PathNodeType::Ground, UnitId(1)));
        assert!(grid.reserve(i, 1, PathNodeType::Ground, UnitId(0)), "re-reserve by holder is a no-op success");
        assert_eq!(grid.occupant_at(i, 1, PathNodeType::Ground), Some(UnitId(0)));
        assert_eq!(grid.reservation_count(), 1);
    }

    #[test]
    fn ground_and_air_are_separate() {
        let mut grid = open_grid(4, 4);
        let i = NodeIndex(2);
        assert!(grid.reserve(i, 1, PathNodeType::Ground, UnitId(0)));
        assert!(grid.reserve(i, 1, PathNodeType::Air, UnitId(1)));
        assert!(grid.occupant_at(i, 2, PathNodeType::Ground).is_none());
    }

    #[test]
    fn release_and_release_held() {
        let mut grid = open_grid(4, 4);
        let i = NodeIndex(3);
        grid.reserve(i, 1, PathNodeType::Ground, UnitId(4));
        assert!(!grid.release_held(i, 1, PathNodeType::Ground, UnitId(5)));
        assert!(grid.release_held(i, 1, PathNodeType::Ground, UnitId(4)));
        assert!(!grid.release(i, 1, PathNodeType::Ground));
        assert_eq!(grid.reservation_count(), 0);
    }

    #[test]
    fn off_grid_index_is_refused() {
        let mut grid = open_grid(2, 2);
        assert!(!grid.reserve(NodeIndex(4), 1, PathNodeType::Ground, UnitId(0)));
    }

    #[test]
    fn reservations_of_lists_keys() {
        let mut grid = open_grid(4, 4);
        let idx = grid.field().index_at(center(1, 1)).unwrap();
        grid.reserve(idx, 1, PathNodeType::Ground, UnitId(9));
        let keys = grid.reservations_of(UnitId(9));
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].index, idx);
    }
}

// ── Transforms & free-node search ─────────────────────────────────────────────

#[cfg(test)]
mod transforms {
    use rts_core::{PathNodeType, UnitId};

    use super::helpers::{center, open_grid};
    use crate::{BLOCKED, NeighborTransforms};

    #[test]
    fn spiral_starts_at_center_and_is_sorted() {
        let t = NeighborTransforms::new(3);
        let v: Vec<_> = t.iter().collect();
        assert_eq!(v[0], (0, 0));
        let d: Vec<i32> = v.iter().map(|&(x, z)| x * x + z * z).collect();
        assert!(d.windows(2).all(|w| w[0] <= w[1]));
        assert!(v.iter().all(|&(x, z)| x * x + z * z <= 9));
    }

    #[test]
    fn radius_zero_is_just_center() {
        assert_eq!(NeighborTransforms::new(0).len(), 1);
    }

    #[test]
    fn closest_free_skips_blocked_and_occupied() {
        let mut grid = open_grid(8, 8);
        grid.set_cost(4, 4, BLOCKED, 1);
        let t = NeighborTransforms::new(2);
        // Every orthogonal neighbour is taken; the first diagonal in spiral
        // order is (-1, -1).
        for (x, z) in [(4, 3), (5, 4), (4, 5), (3, 4)] {
            let idx = grid.field().index_at(center(x, z)).unwrap();
            grid.reserve(idx, 1, PathNodeType::Ground, UnitId(1));
        }
        let found = grid
            .closest_free_node(center(4, 4), 1, PathNodeType::Ground, true, None, &t)
            .unwrap();
        assert_eq!(found, center(3, 3));
    }

    #[test]
    fn closest_free_counts_own_reservation_as_free() {
        let mut grid = open_grid(4, 4);
        let idx = grid.field().index_at(center(1, 1)).unwrap();
        grid.reserve(idx, 1, PathNodeType::Ground, UnitId(2));
        let t = NeighborTransforms::new(1);
        let found = grid.closest_free_node(center(1, 1), 1, PathNodeType::Ground, true, Some(UnitId(2)), &t);
        assert_eq!(found, Some(center(1, 1)));
    }

    #[test]
    fn closest_free_none_when_table_exhausted() {
        let mut grid = open_grid(5, 5);
        grid.set_cost(0, 0, BLOCKED, 5);
        let t = NeighborTransforms::new(2);
        assert!(grid.closest_free_node(center(2, 2), 1, PathNodeType::Ground, true, None, &t).is_none());
        // Air ignores terrain.
        assert!(grid.closest_free_node(center(2, 2), 1, PathNodeType::Air, false, None, &t).is_some());
    }
}

// ── Line of sight ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod sight {
    use glam::{Vec2, Vec3};

    use super::helpers::{center, open_grid};
    use crate::{BLOCKED, GridCoord, LineOfSight, Obstacle, ObstacleSet, SceneLineOfSight};

    #[test]
    fn segment_through_box_is_blocked() {
        let o = Obstacle::from_center(Vec3::new(5.0, 0.0, 5.0), Vec2::splat(1.0));
        assert!(o.intersects_segment(Vec2::new(0.0, 5.0), Vec2::new(10.0, 5.0)));
        assert!(!o.intersects_segment(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)));
        // Segment ends before reaching the box.
        assert!(!o.intersects_segment(Vec2::new(0.0, 5.0), Vec2::new(3.0, 5.0)));
    }

    #[test]
    fn obstacle_set_los() {
        let mut set = ObstacleSet::new();
        set.push(Obstacle::from_center(Vec3::new(5.0, 0.0, 5.0), Vec2::splat(1.0)));
        assert!(!set.is_clear(Vec3::new(0.0, 0.0, 5.0), Vec3::new(9.0, 0.0, 5.0)));
        assert!(set.is_clear(Vec3::new(0.0, 0.0, 9.0), Vec3::new(9.0, 0.0, 9.0)));
    }

    #[test]
    fn stamp_and_unstamp() {
        let mut grid = open_grid(10, 10);
        let mut set = ObstacleSet::new();
        set.push(Obstacle { min: Vec2::new(2.0, 2.0), max: Vec2::new(4.0, 3.0) });
        set.stamp(&mut grid);
        assert_eq!(grid.field().cost(GridCoord::new(2, 2)), BLOCKED);
        assert_eq!(grid.field().cost(GridCoord::new(3, 2)), BLOCKED);
        assert_ne!(grid.field().cost(GridCoord::new(4, 2)), BLOCKED);
        assert_ne!(grid.field().cost(GridCoord::new(2, 3)), BLOCKED);
        set.unstamp(&mut grid);
        assert_ne!(grid.field().cost(GridCoord::new(2, 2)), BLOCKED);
    }

    #[test]
    fn cost_field_los_sees_blocked_nodes() {
        let mut grid = open_grid(10, 10);
        grid.set_cost(5, 0, BLOCKED, 1);
        assert!(!grid.field().is_clear(center(0, 0), center(9, 0)));
        assert!(grid.field().is_clear(center(0, 1), center(9, 1)));
    }

    #[test]
    fn scene_combines_both() {
        let mut grid = open_grid(10, 10);
        grid.set_cost(5, 0, BLOCKED, 1);
        let set = ObstacleSet::new();
        let scene = SceneLineOfSight { obstacles: &set, field: grid.field() };
        assert!(!scene.is_clear(center(0, 0), center(9, 0)));
    }
}

// ── GridSolver ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod solver {
    use rts_core::{PathNodeType, UnitId};

    use super::helpers::{center, open_grid};
    use crate::{BLOCKED, GridError, GridSolver, OccupancyGrid, PathSolver, SearchRequest};

    fn request(grid: &OccupancyGrid, from: (i32, i32), to: (i32, i32)) -> SearchRequest {
        SearchRequest {
            unit:             UnitId(0),
            start:            center(from.0, from.1),
            goal:             center(to.0, to.1),
            scale:            1,
            node_type:        PathNodeType::Ground,
            can_pass_blocked: false,
            field:            grid.snapshot(),
        }
    }

    #[test]
    fn straight_line() {
        let grid = open_grid(10, 3);
        let path = GridSolver::default().solve(&request(&grid, (0, 1), (5, 1))).unwrap();
        assert_eq!(path.waypoints.len(), 6);
        assert_eq!(path.waypoints[0], center(0, 1));
        assert_eq!(*path.waypoints.last().unwrap(), center(5, 1));
    }

    #[test]
    fn trivial_when_start_is_goal() {
        let grid = open_grid(4, 4);
        let path = GridSolver::default().solve(&request(&grid, (2, 2), (2, 2))).unwrap();
        assert_eq!(path.waypoints, vec![center(2, 2)]);
    }

    #[test]
    fn routes_around_wall() {
        let mut grid = open_grid(7, 7);
        // Vertical wall at x = 3 with a gap at z = 6.
        grid.set_cost(3, 0, BLOCKED, 1);
        for z in 0..6 {
            grid.set_cost(3, z, BLOCKED, 1);
        }
        let path = GridSolver::default().solve(&request(&grid, (0, 0), (6, 0))).unwrap();
        assert!(path.waypoints.iter().any(|p| *p == center(3, 6)), "must pass the gap");
        for p in &path.waypoints {
            let c = grid.field().coord_of(*p).unwrap();
            assert_ne!(grid.field().cost(c), BLOCKED);
        }
    }

    #[test]
    fn blocked_goal_has_no_path() {
        let mut grid = open_grid(5, 5);
        grid.set_cost(4, 4, BLOCKED, 1);
        let err = GridSolver::default().solve(&request(&grid, (0, 0), (4, 4))).unwrap_err();
        assert!(matches!(err, GridError::NoPath { .. }));
    }

    #[test]
    fn air_ignores_terrain() {
        let mut grid = open_grid(5, 1);
        grid.set_cost(2, 0, BLOCKED, 1);
        let mut req = request(&grid, (0, 0), (4, 0));
        assert!(GridSolver::default().solve(&req).is_err());
        req.node_type = PathNodeType::Air;
        assert_eq!(GridSolver::default().solve(&req).unwrap().waypoints.len(), 5);
    }

    #[test]
    fn no_corner_cutting() {
        let mut grid = open_grid(3, 3);
        grid.set_cost(1, 0, BLOCKED, 1);
        grid.set_cost(0, 1, BLOCKED, 1);
        // (0,0) → (1,1) would cut between two blocked nodes.
        assert!(GridSolver::default().solve(&request(&grid, (0, 0), (1, 1))).is_err());
    }

    #[test]
    fn off_grid_start_is_error() {
        let grid = open_grid(3, 3);
        let mut req = request(&grid, (0, 0), (1, 1));
        req.start = glam::Vec3::new(-5.0, 0.0, 0.0);
        assert!(matches!(GridSolver::default().solve(&req), Err(GridError::OutOfBounds { .. })));
    }

    #[test]
    fn expansion_limit() {
        let grid = open_grid(50, 50);
        let solver = GridSolver { max_expansions: 3 };
        assert!(matches!(
            solver.solve(&request(&grid, (0, 0), (49, 49))),
            Err(GridError::SearchLimit { .. })
        ));
    }
}
