//! Integration tests for rts-sim.

use std::thread;
use std::time::Duration;

use glam::Vec3;
use rts_core::{CoreError, NetRole, PathNodeType, PlayerId, SimConfig, Tick, UnitId};
use rts_grid::{GridCoord, GridSettings, GridSolver};
use rts_pathing::{
    CommandQueueRelay, EntityKind, InlineDispatcher, MoveCommand, PathEvent, PathState, PathfindingAgent,
    PathingConfig, PathingError, PooledDispatcher, Seek,
};

use crate::{NoopObserver, Sim, SimBuilder, SimError, SimObserver, TickStats, TracingObserver, UnitSpec};

// ── Helpers ───────────────────────────────────────────────────────────────────

type InlineSim = Sim<InlineDispatcher<GridSolver>, CommandQueueRelay, Seek>;

fn test_config(total_ticks: u64, role: NetRole) -> SimConfig {
    SimConfig {
        tick_hz:        30,
        total_ticks,
        seed:           42,
        solver_threads: Some(1),
        role,
    }
}

fn center(x: i32, z: i32) -> Vec3 {
    Vec3::new(x as f32 + 0.5, 0.0, z as f32 + 0.5)
}

fn infantry(x: i32, z: i32) -> UnitSpec {
    UnitSpec::new(PlayerId(0), EntityKind::Infantry, center(x, z), 4.0)
}

fn builder(
    size:  u32,
    ticks: u64,
    role:  NetRole,
) -> SimBuilder<InlineDispatcher<GridSolver>, CommandQueueRelay, Seek> {
    SimBuilder::new(
        test_config(ticks, role),
        InlineDispatcher::new(GridSolver::default()),
        CommandQueueRelay::new(),
    )
    .grid(GridSettings { width: size, height: size, ..GridSettings::default() })
}

fn open_sim(size: u32, role: NetRole, units: Vec<UnitSpec>) -> InlineSim {
    builder(size, 600, role).units(units).build().unwrap()
}

fn planar_distance(a: Vec3, b: Vec3) -> f32 {
    Vec3::new(a.x - b.x, 0.0, a.z - b.z).length()
}

/// Collects everything the sim reports.
#[derive(Default)]
struct Recorder {
    events:     Vec<(Tick, PathEvent)>,
    violations: Vec<UnitId>,
    stats:      Vec<TickStats>,
    ended_at:   Option<Tick>,
}

impl Recorder {
    fn completions(&self, unit: UnitId) -> usize {
        self.events
            .iter()
            .filter(|(_, e)| matches!(e, PathEvent::GoalCompleted { unit: u, .. } if *u == unit))
            .count()
    }
}

impl SimObserver for Recorder {
    fn on_path_event(&mut self, tick: Tick, event: &PathEvent) {
        self.events.push((tick, event.clone()));
    }

    fn on_invariant_violation(&mut self, _tick: Tick, unit: UnitId, _error: &PathingError) {
        self.violations.push(unit);
    }

    fn on_tick_end(&mut self, _tick: Tick, stats: &TickStats) {
        self.stats.push(*stats);
    }

    fn on_sim_end(&mut self, final_tick: Tick) {
        self.ended_at = Some(final_tick);
    }
}

// ── SimBuilder validation ─────────────────────────────────────────────────────

#[cfg(test)]
mod builder_tests {
    use super::*;

    #[test]
    fn builds_successfully_with_defaults() {
        let sim = builder(16, 10, NetRole::Standalone).build().unwrap();
        assert!(sim.agents.is_empty());
        assert_eq!(sim.grid.field().width(), 16);
        assert_eq!(sim.clock.current_tick, Tick::ZERO);
        assert_eq!(sim.violations, 0);
    }

    #[test]
    fn zero_tick_rate_errors() {
        let mut config = test_config(10, NetRole::Standalone);
        config.tick_hz = 0;
        let result = SimBuilder::new(config, InlineDispatcher::new(GridSolver::default()), CommandQueueRelay::new())
            .build();
        assert!(matches!(result, Err(SimError::Core(CoreError::Config(_)))));
    }

    #[test]
    fn negative_timer_errors() {
        let pathing = PathingConfig { pause_secs: -1.0, ..PathingConfig::default() };
        let result = builder(8, 10, NetRole::Standalone).pathing(pathing).build();
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn heading_blend_out_of_range_errors() {
        let pathing = PathingConfig { heading_smoothing: 0.0, ..PathingConfig::default() };
        let result = builder(8, 10, NetRole::Standalone).pathing(pathing).build();
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn stacked_spawns_snap_to_distinct_nodes() {
        let sim = open_sim(8, NetRole::Standalone, vec![infantry(3, 3), infantry(3, 3), infantry(3, 3)]);
        let cells: Vec<_> = sim.agents.iter().map(|a| a.occupied_at().unwrap()).collect();
        assert_eq!(sim.grid.reservation_count(), 3);
        assert_ne!(cells[0], cells[1]);
        assert_ne!(cells[1], cells[2]);
        assert_ne!(cells[0], cells[2]);
        assert_eq!(sim.bodies[0].position, center(3, 3));
    }

    #[test]
    fn spawn_on_blocked_terrain_moves_off_it() {
        let sim = builder(8, 10, NetRole::Standalone)
            .blocked(2, 2, 1)
            .unit(infantry(2, 2))
            .build()
            .unwrap();
        assert_ne!(sim.bodies[0].position, center(2, 2));
        assert!(!sim.grid.is_blocked_at(1, sim.bodies[0].position));
    }

    #[test]
    fn aircraft_ignore_blocked_terrain_at_spawn() {
        let plane = UnitSpec::new(PlayerId(0), EntityKind::Aircraft, center(2, 2), 6.0);
        let sim = builder(8, 10, NetRole::Standalone).blocked(2, 2, 1).unit(plane).build().unwrap();
        assert_eq!(sim.bodies[0].position, center(2, 2));
        assert_eq!(sim.agents[0].node_type, PathNodeType::Air);
    }

    #[test]
    fn client_spawns_reserve_nothing() {
        let sim = open_sim(8, NetRole::Client, vec![infantry(1, 1), infantry(1, 1)]);
        assert_eq!(sim.grid.reservation_count(), 0);
        assert_eq!(sim.bodies[0].position, sim.bodies[1].position);
    }
}

// ── Basic run ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod run_tests {
    use super::*;

    #[test]
    fn run_reaches_end_tick() {
        let mut sim = builder(8, 25, NetRole::Standalone).build().unwrap();
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();
        assert_eq!(sim.clock.current_tick, Tick(25));
        assert_eq!(rec.ended_at, Some(Tick(25)));
        assert_eq!(rec.stats.len(), 25);
    }

    #[test]
    fn run_ticks_advances_clock() {
        let mut sim = builder(8, 100, NetRole::Standalone).build().unwrap();
        sim.run_ticks(7, &mut NoopObserver).unwrap();
        sim.run_ticks(3, &mut NoopObserver).unwrap();
        assert_eq!(sim.clock.current_tick, Tick(10));
    }

    struct TickCounter {
        starts: usize,
        ends:   usize,
    }

    impl SimObserver for TickCounter {
        fn on_tick_start(&mut self, _t: Tick) { self.starts += 1; }
        fn on_tick_end(&mut self, _t: Tick, _s: &TickStats) { self.ends += 1; }
    }

    #[test]
    fn observer_called_correct_number_of_times() {
        let mut sim = open_sim(8, NetRole::Standalone, vec![infantry(1, 1)]);
        let mut obs = TickCounter { starts: 0, ends: 0 };
        sim.run_ticks(12, &mut obs).unwrap();
        assert_eq!(obs.starts, 12);
        assert_eq!(obs.ends, 12);
    }

    #[test]
    fn unit_walks_to_goal_and_completes_once() {
        let mut sim = open_sim(16, NetRole::Standalone, vec![infantry(1, 1)]);
        sim.add_waypoint_goal(UnitId(0), center(10, 7), false).unwrap();

        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();

        assert_eq!(rec.completions(UnitId(0)), 1);
        assert_eq!(sim.agents[0].state(), PathState::Resting);
        assert!(planar_distance(sim.bodies[0].position, center(10, 7)) < 0.3);
        let goal_cell = sim.grid.field().index_at(center(10, 7));
        assert_eq!(sim.agents[0].occupied_at(), goal_cell);
        assert_eq!(sim.grid.reservation_count(), 1);
        assert!(rec.stats.iter().map(|s| s.claims).sum::<usize>() > 0);
    }

    #[test]
    fn queued_goals_are_visited_in_order() {
        let mut sim = open_sim(16, NetRole::Standalone, vec![infantry(1, 1)]);
        sim.add_waypoint_goal(UnitId(0), center(6, 1), false).unwrap();
        sim.add_waypoint_goal(UnitId(0), center(6, 6), true).unwrap();

        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();

        let goals: Vec<Vec3> = rec
            .events
            .iter()
            .filter_map(|(_, e)| match e {
                PathEvent::GoalCompleted { goal, .. } => Some(*goal),
                _                                     => None,
            })
            .collect();
        assert_eq!(goals, vec![center(6, 1), center(6, 6)]);
    }

    #[test]
    fn tracing_observer_runs_without_subscriber() {
        let mut sim = open_sim(8, NetRole::Standalone, vec![infantry(1, 1)]);
        sim.add_waypoint_goal(UnitId(0), center(6, 6), false).unwrap();
        sim.run_ticks(120, &mut TracingObserver).unwrap();
        assert!(sim.events.is_empty());
    }

    #[test]
    fn pooled_dispatcher_delivers_on_a_later_tick() {
        let dispatcher = PooledDispatcher::new(GridSolver::default(), Some(2)).unwrap();
        let mut sim = SimBuilder::new(test_config(3_000, NetRole::Standalone), dispatcher, CommandQueueRelay::new())
            .grid(GridSettings { width: 16, height: 16, ..GridSettings::default() })
            .unit(infantry(1, 1))
            .unit(infantry(14, 14))
            .build()
            .unwrap();
        sim.add_waypoint_goal(UnitId(0), center(12, 3), false).unwrap();
        sim.add_waypoint_goal(UnitId(1), center(2, 12), false).unwrap();

        let mut rec = Recorder::default();
        for _ in 0..3_000 {
            sim.run_ticks(1, &mut rec).unwrap();
            if rec.completions(UnitId(0)) == 1 && rec.completions(UnitId(1)) == 1 {
                break;
            }
            if sim.searches_in_flight() > 0 {
                thread::sleep(Duration::from_millis(1));
            }
        }

        assert_eq!(rec.completions(UnitId(0)), 1);
        assert_eq!(rec.completions(UnitId(1)), 1);
        assert_eq!(sim.searches_in_flight(), 0);
        assert!(rec.stats.iter().any(|s| s.calculating > 0));
    }
}

// ── Commands and removal ──────────────────────────────────────────────────────

#[cfg(test)]
mod command_tests {
    use super::*;

    #[test]
    fn unknown_unit_is_rejected() {
        let mut sim = open_sim(8, NetRole::Standalone, vec![infantry(1, 1)]);
        assert!(matches!(
            sim.add_waypoint_goal(UnitId(9), center(2, 2), false),
            Err(SimError::UnknownUnit(UnitId(9)))
        ));
        assert!(matches!(sim.remove_unit(UnitId(9)), Err(SimError::UnknownUnit(_))));
        assert!(sim.set_attack_target(UnitId(9), None).is_err());
    }

    #[test]
    fn buildings_refuse_goals() {
        let hq = UnitSpec::new(PlayerId(0), EntityKind::Building { footprint: 2 }, center(4, 4), 0.0);
        let mut sim = open_sim(12, NetRole::Standalone, vec![hq]);
        assert_eq!(sim.agents[0].scale, 2);
        assert!(matches!(
            sim.add_waypoint_goal(UnitId(0), center(1, 1), false),
            Err(SimError::Immobile(UnitId(0)))
        ));
    }

    #[test]
    fn ground_units_route_around_buildings() {
        let hq = UnitSpec::new(PlayerId(1), EntityKind::Building { footprint: 2 }, center(5, 4), 0.0);
        let mut sim = open_sim(12, NetRole::Standalone, vec![hq, infantry(1, 4)]);
        let cells = [(5, 4), (6, 4), (5, 5), (6, 5)];
        assert!(cells.iter().all(|&(x, z)| sim.grid.is_blocked(1, x, z)));
        let under_hq: Vec<_> = cells
            .iter()
            .filter_map(|&(x, z)| sim.grid.field().index_of(GridCoord::new(x, z)))
            .collect();

        sim.add_waypoint_goal(UnitId(1), center(10, 4), false).unwrap();
        let mut rec = Recorder::default();
        for _ in 0..600 {
            sim.run_ticks(1, &mut rec).unwrap();
            let cell = sim.agents[1].occupied_at().unwrap();
            assert!(!under_hq.contains(&cell), "claimed {cell} under the HQ");
            let p = sim.bodies[1].position;
            assert!(!(p.x > 5.25 && p.x < 6.75 && p.z > 4.25 && p.z < 5.75), "walked through the HQ at {p}");
            if rec.completions(UnitId(1)) > 0 {
                break;
            }
        }
        assert_eq!(rec.completions(UnitId(1)), 1);
        let end = sim.agents[1].occupied_at().map(|ix| sim.grid.field().coord_at(ix));
        assert_eq!(end, Some(GridCoord::new(10, 4)));
    }

    #[test]
    fn removed_building_unblocks_and_stops_pushing() {
        let hq = UnitSpec::new(PlayerId(1), EntityKind::Building { footprint: 2 }, center(5, 5), 0.0).with_radius(1.0);
        let mut sim = open_sim(12, NetRole::Standalone, vec![hq]);
        assert!(sim.grid.is_blocked(1, 6, 6));

        sim.remove_unit(UnitId(0)).unwrap();
        assert!(!sim.grid.is_blocked(2, 5, 5));

        let walker = sim.spawn_unit(infantry(5, 5)).unwrap();
        assert_eq!(sim.bodies[walker.index()].position, center(5, 5));
        sim.run_ticks(5, &mut NoopObserver).unwrap();
        assert_eq!(sim.bodies[walker.index()].position, center(5, 5));
    }

    #[test]
    fn remove_unit_releases_reservation_and_stops_ticking() {
        let mut sim = open_sim(16, NetRole::Standalone, vec![infantry(1, 1), infantry(5, 5)]);
        sim.add_waypoint_goal(UnitId(0), center(12, 12), false).unwrap();
        sim.run_ticks(20, &mut NoopObserver).unwrap();

        sim.remove_unit(UnitId(0)).unwrap();
        assert!(sim.agents[0].is_retired());
        assert_eq!(sim.grid.reservations_of(UnitId(0)).len(), 0);
        assert_eq!(sim.grid.reservation_count(), 1);
        assert_eq!(sim.live_units(), 1);

        let parked = sim.bodies[0].position;
        let mut rec = Recorder::default();
        sim.run_ticks(60, &mut rec).unwrap();
        assert_eq!(sim.bodies[0].position, parked);
        assert!(rec.events.iter().all(|(_, e)| e.unit() != UnitId(0)));

        // Idempotent.
        sim.remove_unit(UnitId(0)).unwrap();
        assert_eq!(sim.grid.reservation_count(), 1);
    }

    #[test]
    fn bot_helper_ignores_goals_until_released() {
        let mut sim = open_sim(12, NetRole::Standalone, vec![infantry(1, 1)]);
        sim.set_bot_helper(UnitId(0), true).unwrap();
        sim.add_waypoint_goal(UnitId(0), center(8, 8), false).unwrap();
        sim.run_ticks(60, &mut NoopObserver).unwrap();
        assert_eq!(sim.agents[0].state(), PathState::BotHelper);
        assert_eq!(sim.bodies[0].position, center(1, 1));

        sim.set_bot_helper(UnitId(0), false).unwrap();
        let mut rec = Recorder::default();
        sim.run_ticks(300, &mut rec).unwrap();
        assert_eq!(rec.completions(UnitId(0)), 1);
    }

    #[test]
    fn authoritative_sims_refuse_relayed_moves() {
        let mut sim = open_sim(8, NetRole::Host, vec![infantry(1, 1)]);
        let command = MoveCommand { player: PlayerId(0), unit: UnitId(0), target: center(2, 2) };
        assert!(matches!(
            sim.apply_move_command(&command),
            Err(SimError::Role { role: NetRole::Host, .. })
        ));
    }
}

// ── Host / client ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod network_tests {
    use super::*;

    #[test]
    fn host_relays_every_claim() {
        let mut sim = open_sim(16, NetRole::Host, vec![infantry(1, 1)]);
        sim.add_waypoint_goal(UnitId(0), center(9, 1), false).unwrap();
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();

        let claims: usize = rec.stats.iter().map(|s| s.claims).sum();
        let commands = sim.relay.drain();
        assert_eq!(commands.len(), claims);
        assert!(commands.iter().all(|c| c.unit == UnitId(0) && c.player == PlayerId(0)));
        assert_eq!(commands.last().map(|c| c.target), Some(center(9, 1)));
    }

    #[test]
    fn standalone_relays_nothing() {
        let mut sim = open_sim(16, NetRole::Standalone, vec![infantry(1, 1)]);
        sim.add_waypoint_goal(UnitId(0), center(9, 1), false).unwrap();
        sim.run(&mut NoopObserver).unwrap();
        assert_eq!(sim.relay.pending(), 0);
    }

    #[test]
    fn client_applies_moves_without_searching() {
        let mut sim = open_sim(8, NetRole::Client, vec![infantry(1, 1)]);
        // Goals on a client are accepted but never searched.
        sim.add_waypoint_goal(UnitId(0), center(6, 6), false).unwrap();
        sim.run_ticks(30, &mut NoopObserver).unwrap();
        assert_eq!(sim.agents[0].state(), PathState::Resting);
        assert_eq!(sim.agents[0].queued_goals().len(), 1);
        assert_eq!(sim.searches_in_flight(), 0);

        let command = MoveCommand { player: PlayerId(0), unit: UnitId(0), target: center(3, 1) };
        sim.apply_move_command(&command).unwrap();
        assert_eq!(sim.agents[0].state(), PathState::PathFindingMoving);

        let mut rec = Recorder::default();
        sim.run_ticks(120, &mut rec).unwrap();
        assert_eq!(sim.agents[0].state(), PathState::Resting);
        assert!(planar_distance(sim.bodies[0].position, center(3, 1)) < 0.3);
        assert_eq!(sim.grid.reservation_count(), 0);
        assert_eq!(sim.searches_in_flight(), 0);
        assert!(rec.events.iter().any(|(_, e)| matches!(e, PathEvent::MoveToCompleted { .. })));
    }

    #[test]
    fn client_mirrors_host_walk() {
        let units = || vec![infantry(1, 1), infantry(1, 4)];
        let mut host = open_sim(16, NetRole::Host, units());
        let mut client = open_sim(16, NetRole::Client, units());
        host.add_waypoint_goal(UnitId(0), center(11, 9), false).unwrap();
        host.add_waypoint_goal(UnitId(1), center(12, 2), false).unwrap();

        for _ in 0..600 {
            host.run_ticks(1, &mut NoopObserver).unwrap();
            for command in host.relay.drain() {
                client.apply_move_command(&command).unwrap();
            }
            client.run_ticks(1, &mut NoopObserver).unwrap();
        }

        for i in 0..2 {
            let d = planar_distance(host.bodies[i].position, client.bodies[i].position);
            assert!(d < 0.35, "unit {i} diverged by {d}");
        }
    }
}

// ── Invariant violations ──────────────────────────────────────────────────────

#[cfg(test)]
mod violation_tests {
    use super::*;

    /// An agent with no body slot breaks the parallel-table invariant on
    /// every tick.
    fn sim_with_orphan_agent() -> InlineSim {
        let mut sim = open_sim(16, NetRole::Standalone, vec![infantry(1, 1)]);
        let orphan = PathfindingAgent::new(UnitId(1), PlayerId(0), PathNodeType::Ground, 42);
        sim.agents.push(orphan);
        sim
    }

    #[test]
    fn violation_is_counted_and_reported() {
        let mut sim = sim_with_orphan_agent();
        let mut rec = Recorder::default();
        sim.run_ticks(5, &mut rec).unwrap();

        assert_eq!(sim.violations, 5);
        assert_eq!(rec.violations, vec![UnitId(1); 5]);
        assert!(rec.stats.iter().all(|s| s.violations == 1));
        assert_eq!(sim.agents[1].state(), PathState::Resting);
    }

    #[test]
    fn other_agents_keep_running() {
        let mut sim = sim_with_orphan_agent();
        sim.add_waypoint_goal(UnitId(0), center(8, 8), false).unwrap();
        let mut rec = Recorder::default();
        sim.run(&mut rec).unwrap();

        assert_eq!(rec.completions(UnitId(0)), 1);
        assert_eq!(sim.violations, 600);
    }
}
