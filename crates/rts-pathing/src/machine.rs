//! The per-tick state machine.
//!
//! # Transitions
//!
//! | From                  | Condition                         | To                        |
//! |-----------------------|-----------------------------------|---------------------------|
//! | `Resting`             | stacked or queued goal            | `PathFindingCalc`         |
//! | `PathFindingCalc`     | search found                      | `Ready` / `TempGoal`      |
//! | `PathFindingCalc`     | search failed                     | `Resting`                 |
//! | `Ready` / `TempGoal`  | next node claimed                 | `PathFindingMoving`       |
//! | `Ready` / `TempGoal`  | peer in the way                   | `PausePathfinding`        |
//! | `Ready` / `TempGoal`  | repath / give up / done           | `Resting`                 |
//! | `PausePathfinding`    | pause expired                     | `PathFindingMoving`       |
//! | `PathFindingMoving`   | node reached, nodes left          | `Ready` / `TempGoal`      |
//! | `PathFindingMoving`   | node reached, solution exhausted  | `Resting`                 |
//! | `Moving`              | step-aside node reached           | `Ready` or `Resting`      |
//!
//! A node reached on the way through re-enters `Ready` and claims the next
//! node in the same tick.  An expired pause re-enters `PathFindingMoving`
//! with `move_to_position` unchanged; the unit is already there, so it falls
//! through to `Ready` and retries the claim at once.
//!
//! Only authoritative simulations search, negotiate, and reserve.  Clients
//! run the receptive subset: relayed moves in `PathFindingMoving`, then
//! `Resting`.

use std::sync::Arc;

use glam::Vec3;
use tracing::{debug, warn};

use rts_core::{NetRole, UnitId};
use rts_grid::{NeighborTransforms, ObstacleSet, OccupancyGrid, SceneLineOfSight, SearchRequest};

use crate::negotiation::{ClaimOutcome, claim_next_node};
use crate::repath::{abandon_goal, repath, try_attack_stance};
use crate::smoothing::{Unobstructed, smooth_path};
use crate::{
    EventLog, MoveCommand, NetworkRelay, PathEvent, PathState, PathfindingAgent, PathingConfig, PathingError,
    PathingResult, QueueCounters, SearchDispatcher, SearchStatus, SearchTicket, UnitBody,
};

/// Everything an agent's tick may touch besides the agents themselves.
pub struct TickContext<'a> {
    pub grid:       &'a mut OccupancyGrid,
    /// Indexed by `UnitId::index()`, parallel to the agent slice.
    pub bodies:     &'a mut [UnitBody],
    pub obstacles:  &'a ObstacleSet,
    pub transforms: &'a NeighborTransforms,
    pub dispatcher: &'a dyn SearchDispatcher,
    pub counters:   &'a Arc<QueueCounters>,
    pub relay:      &'a mut dyn NetworkRelay,
    pub events:     &'a mut EventLog,
    pub config:     &'a PathingConfig,
    pub role:       NetRole,
    /// Simulated seconds at the start of this tick.
    pub now:        f64,
    pub dt:         f32,
}

/// Forward a move decision to clients when hosting.
pub(crate) fn announce_move(ctx: &mut TickContext<'_>, agent: &PathfindingAgent, target: Vec3) {
    if ctx.role.relays() {
        ctx.relay.send_move_command(MoveCommand { player: agent.player, unit: agent.unit, target });
    }
}

// ── Entry points ──────────────────────────────────────────────────────────────

/// Advance agent `id` by one tick.
///
/// `agents` is the whole agent table because negotiation may move a peer.
/// An `Err` means an invariant broke; the caller should log it and reset the
/// agent with [`PathfindingAgent::reset_after_violation`].
pub fn tick_agent(agents: &mut [PathfindingAgent], id: UnitId, ctx: &mut TickContext<'_>) -> PathingResult<()> {
    let i = id.index();
    if i >= ctx.bodies.len() {
        return Err(PathingError::UnknownUnit(id));
    }
    let agent = agents.get_mut(i).ok_or(PathingError::UnknownUnit(id))?;
    if agent.is_retired() {
        return Ok(());
    }
    agent.tick_timers(ctx.dt);

    if !ctx.role.is_authoritative() {
        return tick_receptive(agent, i, ctx);
    }
    relocate_if_stranded(agent, i, ctx)?;

    let state = agent.state;
    match state {
        PathState::Resting => begin_next_goal(agent, i, ctx),
        PathState::PathFindingCalc => {
            poll_search(agent, ctx);
            Ok(())
        }
        PathState::PathFindingReady | PathState::PathFindingTempGoal => advance(agents, id, ctx),
        PathState::PausePathfinding => {
            agent.pause_remaining -= ctx.dt;
            agent.unpatience += ctx.dt;
            if agent.pause_remaining > 0.0 {
                return Ok(());
            }
            agent.move_started_at = ctx.now;
            agent.set_state(PathState::PathFindingMoving, ctx.events, ctx.now);
            arrive_if_reached(agents, id, ctx)
        }
        PathState::PathFindingMoving | PathState::Moving => arrive_if_reached(agents, id, ctx),
        PathState::BotHelper => Ok(()),
    }
}

/// Apply a relayed host decision on a client.
pub fn apply_move_command(agent: &mut PathfindingAgent, command: &MoveCommand, events: &mut EventLog, now: f64) {
    if agent.is_retired() {
        return;
    }
    agent.solution.clear();
    agent.move_to_position = command.target;
    agent.move_started_at = now;
    agent.set_state(PathState::PathFindingMoving, events, now);
}

// ── Receptive (client) subset ─────────────────────────────────────────────────

fn tick_receptive(agent: &mut PathfindingAgent, i: usize, ctx: &mut TickContext<'_>) -> PathingResult<()> {
    if agent.state.is_moving() && ctx.bodies[i].has_reached(agent.move_to_position) {
        report_move_completed(agent, ctx);
        agent.set_state(PathState::Resting, ctx.events, ctx.now);
    }
    Ok(())
}

// ── Goal dispatch ─────────────────────────────────────────────────────────────

fn begin_next_goal(agent: &mut PathfindingAgent, i: usize, ctx: &mut TickContext<'_>) -> PathingResult<()> {
    let (goal, temp) = if let Some(goal) = agent.path_stack.pop() {
        (goal, true)
    } else if let Some(goal) = agent.path_queue.pop_front() {
        (goal, false)
    } else {
        return Ok(());
    };

    if temp {
        if !agent.on_temp_goal && agent.goal_active && agent.resume_goal.is_none() {
            agent.resume_goal = Some(agent.goal_position);
        }
    } else {
        if !agent.goal_active {
            agent.goal_started_at = ctx.now;
        }
        agent.goal_active = true;
        agent.resume_goal = None;
    }
    agent.on_temp_goal = temp;
    agent.goal_position = goal;

    let start = ctx.bodies[i].position;
    dispatch_search(agent, start, ctx);
    Ok(())
}

/// Open a new search generation toward `goal_position` and hand it to the
/// dispatcher.  A ground goal on blocked terrain is swapped for the closest
/// free node first; if there is none the agent stays `Resting` and nothing
/// is dispatched.
fn dispatch_search(agent: &mut PathfindingAgent, start: Vec3, ctx: &mut TickContext<'_>) {
    let mut goal = agent.goal_position;
    if agent.respects_terrain() && ctx.grid.is_blocked_at(agent.scale, goal) {
        let substitute = ctx.grid.closest_free_node(
            goal,
            agent.scale,
            agent.node_type,
            true,
            Some(agent.unit),
            ctx.transforms,
        );
        match substitute {
            Some(mut node) => {
                node.y = goal.y;
                debug!(unit = %agent.unit, requested = ?goal, substitute = ?node, "goal_substituted");
                goal = node;
                agent.goal_position = node;
            }
            None => {
                warn!(unit = %agent.unit, goal = ?goal, "goal_unreachable");
                abandon_goal(agent);
                return;
            }
        }
    }

    let generation = agent.channel().begin_search();
    agent.generation = generation;
    agent.solution.clear();
    agent.yielded_to = None;
    agent.unpatience = 0.0;

    let request = SearchRequest {
        unit:             agent.unit,
        start,
        goal,
        scale:            agent.scale,
        node_type:        agent.node_type,
        can_pass_blocked: agent.can_pass_over_blocked,
        field:            ctx.grid.snapshot(),
    };
    let ticket = SearchTicket::new(
        Arc::clone(agent.channel()),
        generation,
        agent.node_type,
        Arc::clone(ctx.counters),
    );
    agent.set_state(PathState::PathFindingCalc, ctx.events, ctx.now);
    debug!(unit = %agent.unit, generation, temp = agent.on_temp_goal, "search_dispatched");
    ctx.dispatcher.dispatch(request, ticket);
}

fn poll_search(agent: &mut PathfindingAgent, ctx: &mut TickContext<'_>) {
    match agent.channel().status(agent.generation) {
        SearchStatus::Pending => {}
        SearchStatus::Found => load_solution(agent, ctx),
        SearchStatus::NotFound | SearchStatus::Idle => {
            debug!(unit = %agent.unit, goal = ?agent.goal_position, "search_not_found");
            abandon_goal(agent);
            agent.set_state(PathState::Resting, ctx.events, ctx.now);
        }
    }
}

fn load_solution(agent: &mut PathfindingAgent, ctx: &mut TickContext<'_>) {
    let nodes = agent.channel().collect(agent.generation);
    let raw = nodes.len();
    let nodes = if ctx.config.smooth_paths && nodes.len() > 2 {
        if agent.respects_terrain() {
            let sight = SceneLineOfSight { obstacles: ctx.obstacles, field: ctx.grid.field() };
            smooth_path(&nodes, &sight)
        } else {
            smooth_path(&nodes, &Unobstructed)
        }
    } else {
        nodes
    };
    debug!(unit = %agent.unit, raw, smoothed = nodes.len(), "solution_loaded");

    agent.solution = nodes.into();
    match agent.solution.pop_front() {
        Some(first) => {
            agent.move_to_position = first;
            let next = if agent.on_temp_goal { PathState::PathFindingTempGoal } else { PathState::PathFindingReady };
            agent.set_state(next, ctx.events, ctx.now);
        }
        None => {
            abandon_goal(agent);
            agent.set_state(PathState::Resting, ctx.events, ctx.now);
        }
    }
}

// ── Claim and arrival ─────────────────────────────────────────────────────────

fn advance(agents: &mut [PathfindingAgent], id: UnitId, ctx: &mut TickContext<'_>) -> PathingResult<()> {
    let outcome = claim_next_node(agents, id, ctx)?;
    let i = id.index();
    let from = ctx.bodies[i].position;
    let agent = &mut agents[i];

    match outcome {
        ClaimOutcome::Claimed(target) => {
            agent.move_to_position = target;
            agent.move_started_at = ctx.now;
            agent.yielded_to = None;
            agent.unpatience = 0.0;
            agent.set_state(PathState::PathFindingMoving, ctx.events, ctx.now);
            announce_move(ctx, agent, target);
        }
        ClaimOutcome::Yield => {
            if !try_attack_stance(agent, from, ctx) {
                agent.pause_remaining = ctx.config.pause_secs;
                agent.set_state(PathState::PausePathfinding, ctx.events, ctx.now);
            }
        }
        ClaimOutcome::Repath => {
            if !try_attack_stance(agent, from, ctx) {
                repath(agent, ctx);
            }
        }
        ClaimOutcome::Exhausted => finish_solution(agent, true, ctx),
        ClaimOutcome::GaveUp => {
            warn!(unit = %id, goal = ?agent.goal_position, "path_left_grid");
            agent.solution.clear();
            abandon_goal(agent);
            agent.set_state(PathState::Resting, ctx.events, ctx.now);
        }
    }
    Ok(())
}

fn arrive_if_reached(agents: &mut [PathfindingAgent], id: UnitId, ctx: &mut TickContext<'_>) -> PathingResult<()> {
    let i = id.index();
    let agent = &mut agents[i];
    if !ctx.bodies[i].has_reached(agent.move_to_position) {
        return Ok(());
    }
    let stepped_aside = agent.state == PathState::Moving;
    report_move_completed(agent, ctx);

    if agent.solution.is_empty() {
        finish_solution(agent, !stepped_aside, ctx);
        return Ok(());
    }
    let next = if agent.on_temp_goal { PathState::PathFindingTempGoal } else { PathState::PathFindingReady };
    agent.set_state(next, ctx.events, ctx.now);
    advance(agents, id, ctx)
}

fn report_move_completed(agent: &PathfindingAgent, ctx: &mut TickContext<'_>) {
    ctx.events.push(PathEvent::MoveToCompleted {
        unit:    agent.unit,
        target:  agent.move_to_position,
        state:   agent.state,
        elapsed: (ctx.now - agent.move_started_at).max(0.0) as f32,
    });
}

/// The loaded solution is used up.  A goal completes once; a detour resumes
/// the goal it interrupted.
fn finish_solution(agent: &mut PathfindingAgent, completes_goal: bool, ctx: &mut TickContext<'_>) {
    if agent.on_temp_goal {
        abandon_goal(agent);
    } else if completes_goal && agent.goal_active {
        agent.goal_active = false;
        ctx.events.push(PathEvent::GoalCompleted {
            unit:  agent.unit,
            goal:  agent.goal_position,
            total: agent.goal_elapsed(ctx.now),
        });
        debug!(unit = %agent.unit, goal = ?agent.goal_position, "goal_completed");
    }
    agent.set_state(PathState::Resting, ctx.events, ctx.now);
}

// ── Stranded units ────────────────────────────────────────────────────────────

/// Periodically move a resting ground unit off terrain that became blocked
/// under it.
fn relocate_if_stranded(agent: &mut PathfindingAgent, i: usize, ctx: &mut TickContext<'_>) -> PathingResult<()> {
    if agent.block_recheck > 0.0 {
        return Ok(());
    }
    agent.block_recheck = ctx.config.block_recheck_secs;
    if !agent.state.is_parked() || !agent.respects_terrain() || !ctx.bodies[i].kind.is_mobile() {
        return Ok(());
    }
    let position = ctx.bodies[i].position;
    if !ctx.grid.is_blocked_at(agent.scale, position) {
        return Ok(());
    }

    let spot = ctx
        .grid
        .closest_free_node(position, agent.scale, agent.node_type, true, Some(agent.unit), ctx.transforms);
    let Some(index) = spot.and_then(|p| ctx.grid.field().index_at(p)) else {
        warn!(unit = %agent.unit, position = ?position, "stranded_no_free_node");
        return Ok(());
    };
    let mut spot = ctx.grid.field().center_of(ctx.grid.field().coord_at(index));
    spot.y = position.y;

    agent.move_reservation(ctx.grid, index)?;
    ctx.bodies[i].teleport(spot);
    agent.move_to_position = spot;
    warn!(unit = %agent.unit, from = ?position, to = ?spot, "stranded_relocated");
    announce_move(ctx, agent, spot);
    Ok(())
}
