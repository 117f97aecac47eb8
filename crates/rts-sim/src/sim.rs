//! The `Sim` struct and its fixed-step tick loop.

use std::sync::Arc;

use glam::Vec3;
use tracing::{debug, error, info};

use rts_core::{SimClock, SimConfig, Tick, UnitId};
use rts_grid::{BLOCKED, GridCoord, NeighborTransforms, ObstacleSet, OccupancyGrid};
use rts_pathing::steering::{separate, steer};
use rts_pathing::{
    EventLog, ForceBehavior, MoveCommand, NetworkRelay, PathEvent, PathState, PathfindingAgent, PathingConfig, QueueCounters,
    SearchDispatcher, TickContext, UnitBody, tick_agent,
};

use crate::{SimError, SimObserver, SimResult, UnitSpec};

// ── TickStats ─────────────────────────────────────────────────────────────────

/// Counts gathered at the end of one tick.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Agents in `Moving` or `PathFindingMoving`.
    pub moving:      usize,
    /// Agents waiting on a search.
    pub calculating: usize,
    /// Agents in `PausePathfinding`.
    pub paused:      usize,
    /// Agents in `Resting`.
    pub resting:     usize,
    /// Node claims made this tick.
    pub claims:      usize,
    /// Events emitted this tick.
    pub events:      usize,
    /// Invariant violations caught this tick.
    pub violations:  usize,
    /// Searches dispatched but not yet delivered, all node types.
    pub in_flight:   usize,
}

// ── Sim ───────────────────────────────────────────────────────────────────────

/// The top-level simulation runner.
///
/// `Sim` is generic over:
/// - `D: SearchDispatcher`: where path searches run
/// - `N: NetworkRelay`: where host move decisions are sent
/// - `F: ForceBehavior`: the steering force toward each unit's next node
///
/// Agents and bodies are parallel `Vec`s indexed by `UnitId`.  Removed units
/// keep their slot so ids stay stable.
///
/// Create via [`SimBuilder`][crate::SimBuilder].
pub struct Sim<D: SearchDispatcher, N: NetworkRelay, F: ForceBehavior> {
    /// Global simulation configuration.
    pub config: SimConfig,

    /// Timers and steering constants shared by all agents.
    pub pathing: PathingConfig,

    /// Tick ↔ seconds converter.
    pub clock: SimClock,

    /// Terrain costs and per-node reservations.
    pub grid: OccupancyGrid,

    /// Scene obstacles used for path smoothing.
    pub obstacles: ObstacleSet,

    /// Spiral offsets for free-node searches.
    pub transforms: NeighborTransforms,

    /// Per-unit pathfinding state.
    pub agents: Vec<PathfindingAgent>,

    /// Per-unit kinematics, parallel to `agents`.
    pub bodies: Vec<UnitBody>,

    pub dispatcher: D,

    pub relay: N,

    pub behavior: F,

    /// In-flight search counts, shared with search tickets.
    pub counters: Arc<QueueCounters>,

    /// Events emitted since the last drain.
    pub events: EventLog,

    /// Invariant violations caught since the sim was built.
    pub violations: u64,
}

impl<D: SearchDispatcher, N: NetworkRelay, F: ForceBehavior> Sim<D, N, F> {
    // ── Units ─────────────────────────────────────────────────────────────

    /// Add a unit and return its id.
    ///
    /// On authoritative sims the unit is snapped to the closest free node
    /// around `spec.position` and reserves it.  A building also blocks the
    /// terrain under its whole footprint.  Clients place units where told and
    /// never reserve.
    pub fn spawn_unit(&mut self, spec: UnitSpec) -> SimResult<UnitId> {
        let id = UnitId::from_index(self.agents.len())?;
        let node_type = spec.kind.node_type();

        let mut agent = PathfindingAgent::new(id, spec.player, node_type, self.config.seed).with_scale(spec.scale);
        agent.ignore_occupied_by_flag = spec.ignore_occupied_by_flag;
        agent.can_pass_over_blocked = spec.can_pass_over_blocked;

        let mut position = spec.position;
        if self.config.role.is_authoritative() {
            let respect = agent.respects_terrain();
            let snapped = self
                .grid
                .closest_free_node(position, agent.scale, node_type, respect, None, &self.transforms)
                .ok_or(SimError::Placement { position })?;
            position = Vec3::new(snapped.x, position.y, snapped.z);
            if !agent.place(&mut self.grid, position) {
                return Err(SimError::Placement { position });
            }
            if !spec.kind.is_mobile() {
                let anchor = self.footprint_anchor(&agent).ok_or(SimError::Placement { position })?;
                self.grid.set_cost(anchor.x, anchor.z, BLOCKED, agent.scale as u32);
            }
        }
        agent.goal_position = position;
        agent.flag_goal_position = position;
        agent.move_to_position = position;

        let body = UnitBody::new(spec.kind, position, spec.max_speed).with_radius(spec.collision_radius);
        debug!(unit = %id, kind = ?spec.kind, ?position, "unit_spawned");
        self.agents.push(agent);
        self.bodies.push(body);
        Ok(id)
    }

    /// Retire a unit: its reservation is released, its search abandoned, and
    /// it stops ticking.  A removed building unblocks its footprint.  The slot
    /// stays so other ids remain valid.
    pub fn remove_unit(&mut self, id: UnitId) -> SimResult<()> {
        let i = id.index();
        let agent = self.agents.get(i).ok_or(SimError::UnknownUnit(id))?;
        if !agent.is_retired() && self.config.role.is_authoritative() {
            let building = self.bodies.get(i).is_some_and(|b| !b.kind.is_mobile());
            if let (true, Some(anchor)) = (building, self.footprint_anchor(agent)) {
                self.grid.remove_cost(anchor.x, anchor.z, agent.scale as u32);
            }
        }
        self.agents[i].retire(&mut self.grid);
        if let Some(body) = self.bodies.get_mut(i) {
            body.velocity = Vec3::ZERO;
        }
        debug!(unit = %id, "unit_removed");
        Ok(())
    }

    /// Grid coordinate of the node an agent's footprint is anchored on.
    fn footprint_anchor(&self, agent: &PathfindingAgent) -> Option<GridCoord> {
        agent.occupied_at().map(|index| self.grid.field().coord_at(index))
    }

    /// Agent of `id`, retired or not.
    pub fn agent(&self, id: UnitId) -> Option<&PathfindingAgent> {
        self.agents.get(id.index())
    }

    /// Body of `id`, retired or not.
    pub fn body(&self, id: UnitId) -> Option<&UnitBody> {
        self.bodies.get(id.index())
    }

    /// Units that have not been removed.
    pub fn live_units(&self) -> usize {
        self.agents.iter().filter(|a| !a.is_retired()).count()
    }

    // ── Commands ──────────────────────────────────────────────────────────

    /// Give `id` a waypoint goal.  With `queue` set the goal is appended;
    /// otherwise it replaces everything the unit was doing.
    pub fn add_waypoint_goal(&mut self, id: UnitId, position: Vec3, queue: bool) -> SimResult<()> {
        let i = id.index();
        let body = self.bodies.get(i).ok_or(SimError::UnknownUnit(id))?;
        if !body.kind.is_mobile() {
            return Err(SimError::Immobile(id));
        }
        let now = self.clock.elapsed_secs();
        self.agents[i].add_waypoint_goal(position, queue, &mut self.events, now);
        Ok(())
    }

    /// Enter attack mode against `target`, or leave it with `None`.
    pub fn set_attack_target(&mut self, id: UnitId, target: Option<Vec3>) -> SimResult<()> {
        let agent = self.agents.get_mut(id.index()).ok_or(SimError::UnknownUnit(id))?;
        agent.set_attack_target(target);
        Ok(())
    }

    /// Hand a unit to (or take it back from) escort logic.
    pub fn set_bot_helper(&mut self, id: UnitId, enabled: bool) -> SimResult<()> {
        let now = self.clock.elapsed_secs();
        let agent = self.agents.get_mut(id.index()).ok_or(SimError::UnknownUnit(id))?;
        agent.set_bot_helper(enabled, &mut self.events, now);
        Ok(())
    }

    /// Apply a move relayed by the host.  Only clients accept these.
    pub fn apply_move_command(&mut self, command: &MoveCommand) -> SimResult<()> {
        if self.config.role.is_authoritative() {
            return Err(SimError::Role { role: self.config.role, action: "apply_move_command" });
        }
        let now = self.clock.elapsed_secs();
        let agent = self
            .agents
            .get_mut(command.unit.index())
            .ok_or(SimError::UnknownUnit(command.unit))?;
        rts_pathing::apply_move_command(agent, command, &mut self.events, now);
        Ok(())
    }

    /// Searches dispatched and not yet delivered.
    pub fn searches_in_flight(&self) -> usize {
        self.counters.total()
    }

    // ── Tick loop ─────────────────────────────────────────────────────────

    /// Run the full simulation from the current tick to `config.total_ticks`.
    pub fn run<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<()> {
        let end = self.config.end_tick();
        info!(units = self.agents.len(), end = %end, "sim_start");

        while self.clock.current_tick < end {
            self.step(observer)?;
        }

        observer.on_sim_end(self.clock.current_tick);
        Ok(())
    }

    /// Run exactly `n` ticks starting from the current clock position.
    ///
    /// Useful for tests and for driving the sim from an outer frame loop.
    pub fn run_ticks<O: SimObserver>(&mut self, n: u64, observer: &mut O) -> SimResult<()> {
        let end = self.clock.current_tick.offset(n);
        while self.clock.current_tick < end {
            self.step(observer)?;
        }
        Ok(())
    }

    fn step<O: SimObserver>(&mut self, observer: &mut O) -> SimResult<TickStats> {
        let now = self.clock.current_tick;
        observer.on_tick_start(now);
        let stats = self.process_tick(now, observer)?;
        observer.on_tick_end(now, &stats);
        self.clock.advance();
        Ok(stats)
    }

    // ── Tick processing ───────────────────────────────────────────────────

    /// Process one tick:
    ///
    /// 1. Tick every agent's state machine, in id order.
    /// 2. Steer every mobile unit in a moving state toward its next node.
    /// 3. Separate overlapping aircraft and units inside buildings.
    /// 4. Hand this tick's events to the observer.
    ///
    /// An agent whose tick breaks an invariant is reset to `Resting` and the
    /// violation is reported; every other agent carries on.
    pub fn process_tick<O: SimObserver>(&mut self, tick: Tick, observer: &mut O) -> SimResult<TickStats> {
        let now = self.clock.elapsed_secs();
        let dt = self.clock.dt();
        let mut stats = TickStats::default();

        // ── Phase 1: state machines ───────────────────────────────────────
        for i in 0..self.agents.len() {
            let id = self.agents[i].unit;
            let result = {
                let mut ctx = TickContext {
                    grid:       &mut self.grid,
                    bodies:     &mut self.bodies,
                    obstacles:  &self.obstacles,
                    transforms: &self.transforms,
                    dispatcher: &self.dispatcher,
                    counters:   &self.counters,
                    relay:      &mut self.relay,
                    events:     &mut self.events,
                    config:     &self.pathing,
                    role:       self.config.role,
                    now,
                    dt,
                };
                tick_agent(&mut self.agents, id, &mut ctx)
            };
            if let Err(err) = result {
                error!(%tick, unit = %id, error = %err, "invariant_violation");
                self.agents[i].reset_after_violation(&mut self.events, now);
                self.violations += 1;
                stats.violations += 1;
                observer.on_invariant_violation(tick, id, &err);
            }
        }

        // ── Phase 2: steering ─────────────────────────────────────────────
        for (agent, body) in self.agents.iter_mut().zip(self.bodies.iter_mut()) {
            if agent.is_retired() || !body.kind.is_mobile() || !agent.state().is_moving() {
                continue;
            }
            steer(agent, body, &self.behavior, dt, &self.pathing);
        }

        // ── Phase 3: non-penetration ──────────────────────────────────────
        let agents = &self.agents;
        separate(&mut self.bodies, |i| agents.get(i).is_some_and(|a| !a.is_retired()));

        // ── Phase 4: events and stats ─────────────────────────────────────
        for event in self.events.drain() {
            if matches!(event, PathEvent::StateUpdated { state: PathState::PathFindingMoving, .. }) {
                stats.claims += 1;
            }
            stats.events += 1;
            observer.on_path_event(tick, &event);
        }
        for agent in self.agents.iter().filter(|a| !a.is_retired()) {
            match agent.state() {
                PathState::Moving | PathState::PathFindingMoving => stats.moving += 1,
                PathState::PathFindingCalc                       => stats.calculating += 1,
                PathState::PausePathfinding                      => stats.paused += 1,
                PathState::Resting                               => stats.resting += 1,
                _                                                => {}
            }
        }
        stats.in_flight = self.counters.total();

        Ok(stats)
    }
}
