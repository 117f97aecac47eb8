//! Per-unit pathfinding agent.

use std::collections::VecDeque;
use std::sync::Arc;

use glam::Vec3;
use tracing::debug;

use rts_core::{NodeIndex, PathNodeType, PlayerId, UnitId, UnitRng};
use rts_grid::{CostField, OccupancyGrid};

use crate::{EventLog, PathEvent, PathState, PathingError, PathingResult, SolutionChannel};

/// Movement brain of one unit.
///
/// The agent owns its goal queue, detour stack, the loaded solution, and at
/// most one occupancy reservation.  All of it is mutated only from the
/// simulation thread; the solver side touches nothing but the
/// [`SolutionChannel`].
#[derive(Debug)]
pub struct PathfindingAgent {
    pub unit:      UnitId,
    pub player:    PlayerId,
    pub node_type: PathNodeType,
    /// Footprint edge in nodes.
    pub scale:     u8,

    pub(crate) state: PathState,

    /// Goal currently being pursued (may be a substitute for a blocked one).
    pub goal_position:      Vec3,
    /// Last goal the player commanded.
    pub flag_goal_position: Vec3,
    /// Node the unit is steering toward right now.
    pub move_to_position:   Vec3,

    /// Player waypoints, consumed front to back.
    pub(crate) path_queue: VecDeque<Vec3>,
    /// Detours, consumed LIFO and always before the queue.
    pub(crate) path_stack: Vec<Vec3>,
    /// Remaining nodes of the loaded solution.
    pub(crate) solution:   VecDeque<Vec3>,

    channel:               Arc<SolutionChannel>,
    pub(crate) generation: u64,

    occupied_at: Option<NodeIndex>,

    /// This unit defers at the goal flag: any peer may ask it to step aside
    /// at once, without waiting first.
    pub ignore_occupied_by_flag: bool,
    /// Ground unit that walks over blocked terrain.
    pub can_pass_over_blocked:   bool,

    pub heading:        Vec3,
    pub smooth_heading: Vec3,

    pub(crate) attack_target: Option<Vec3>,
    pub(crate) on_temp_goal:  bool,
    /// A player goal is being pursued; cleared when it completes or is
    /// abandoned so completion fires once.
    pub(crate) goal_active:   bool,
    /// Goal a detour interrupted.
    pub(crate) resume_goal:   Option<Vec3>,

    // Timers count down to zero, except `unpatience` which counts up.
    pub(crate) block_recheck:   f32,
    pub(crate) alt_goal_recheck: f32,
    pub(crate) pause_remaining: f32,
    pub(crate) unpatience:      f32,

    /// Peer this agent already yielded to once in the current standoff.
    pub(crate) yielded_to:   Option<UnitId>,
    /// Last cell this unit stepped aside to.
    pub(crate) last_evasion: Option<NodeIndex>,

    pub(crate) goal_started_at:  f64,
    pub(crate) state_entered_at: f64,
    pub(crate) move_started_at:  f64,

    pub(crate) rng: UnitRng,
    retired:        bool,
}

impl PathfindingAgent {
    /// A resting agent with empty goals, no reservation, and its own
    /// solution channel.  `seed` is mixed with `unit` for the agent's RNG.
    pub fn new(unit: UnitId, player: PlayerId, node_type: PathNodeType, seed: u64) -> Self {
        Self {
            unit,
            player,
            node_type,
            scale:                   1,
            state:                   PathState::Resting,
            goal_position:           Vec3::ZERO,
            flag_goal_position:      Vec3::ZERO,
            move_to_position:        Vec3::ZERO,
            path_queue:              VecDeque::new(),
            path_stack:              Vec::new(),
            solution:                VecDeque::new(),
            channel:                 Arc::new(SolutionChannel::new()),
            generation:              0,
            occupied_at:             None,
            ignore_occupied_by_flag: false,
            can_pass_over_blocked:   false,
            heading:                 Vec3::Z,
            smooth_heading:          Vec3::Z,
            attack_target:           None,
            on_temp_goal:            false,
            goal_active:             false,
            resume_goal:             None,
            block_recheck:           0.0,
            alt_goal_recheck:        0.0,
            pause_remaining:         0.0,
            unpatience:              0.0,
            yielded_to:              None,
            last_evasion:            None,
            goal_started_at:         0.0,
            state_entered_at:        0.0,
            move_started_at:         0.0,
            rng:                     UnitRng::new(seed, unit),
            retired:                 false,
        }
    }

    /// Footprint edge in nodes.  Clamped to at least 1.
    pub fn with_scale(mut self, scale: u8) -> Self {
        self.scale = scale.max(1);
        self
    }

    // ── Read access ───────────────────────────────────────────────────────

    /// Current state.
    #[inline]
    pub fn state(&self) -> PathState {
        self.state
    }

    /// Node this agent holds, if any.
    #[inline]
    pub fn occupied_at(&self) -> Option<NodeIndex> {
        self.occupied_at
    }

    /// Channel the solver publishes this agent's waypoints into.
    pub fn channel(&self) -> &Arc<SolutionChannel> {
        &self.channel
    }

    /// Waypoints of the loaded solution not yet claimed.
    pub fn solution(&self) -> impl ExactSizeIterator<Item = &Vec3> {
        self.solution.iter()
    }

    /// Player goals waiting behind the current one, in order.
    pub fn queued_goals(&self) -> impl ExactSizeIterator<Item = &Vec3> {
        self.path_queue.iter()
    }

    /// Pending detours; the last one runs next.
    pub fn stacked_goals(&self) -> &[Vec3] {
        &self.path_stack
    }

    /// Target of attack mode, if set.
    pub fn attack_target(&self) -> Option<Vec3> {
        self.attack_target
    }

    /// `true` once [`retire`](Self::retire) has run.
    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// `true` if blocked terrain stops this unit.
    #[inline]
    pub fn respects_terrain(&self) -> bool {
        self.node_type.respects_terrain() && !self.can_pass_over_blocked
    }

    /// Node this agent will try to claim next.
    ///
    /// While walking into a node that is not yet its reservation, that node;
    /// otherwise the front of the remaining solution.
    pub fn wanted_index(&self, field: &CostField) -> Option<NodeIndex> {
        if self.state.is_moving() {
            let target = field.index_at(self.move_to_position);
            if target.is_some() && target != self.occupied_at {
                return target;
            }
        }
        self.solution.front().and_then(|&p| field.index_at(p))
    }

    // ── Commands ──────────────────────────────────────────────────────────

    /// Queue or replace a player goal.
    ///
    /// Without the queue modifier the queue, the detour stack, and the loaded
    /// solution are discarded and any in-flight search is abandoned.  A unit
    /// walking into a claimed node finishes that step first.
    pub fn add_waypoint_goal(
        &mut self,
        position:                Vec3,
        queue_if_modifier_held:  bool,
        events:                  &mut EventLog,
        now:                     f64,
    ) {
        if self.retired {
            return;
        }
        self.flag_goal_position = position;
        if !queue_if_modifier_held {
            self.path_queue.clear();
            self.path_stack.clear();
            self.solution.clear();
            self.channel.cancel();
            self.goal_active = false;
            self.on_temp_goal = false;
            self.resume_goal = None;
            self.yielded_to = None;
            self.last_evasion = None;
            self.unpatience = 0.0;
            if !self.state.is_moving() && self.state != PathState::BotHelper {
                self.set_state(PathState::Resting, events, now);
            }
        }
        self.path_queue.push_back(position);
        debug!(unit = %self.unit, queued = queue_if_modifier_held, depth = self.path_queue.len(), "waypoint_goal");
    }

    /// Enter or leave attack mode.  `None` clears it.
    pub fn set_attack_target(&mut self, target: Option<Vec3>) {
        self.attack_target = target;
        self.alt_goal_recheck = 0.0;
    }

    /// Hand the unit to escort logic (or take it back).
    pub fn set_bot_helper(&mut self, enabled: bool, events: &mut EventLog, now: f64) {
        let to = if enabled { PathState::BotHelper } else { PathState::Resting };
        self.set_state(to, events, now);
    }

    // ── Reservations ──────────────────────────────────────────────────────

    /// Reserve the node under `position` as the agent's starting cell.
    pub fn place(&mut self, grid: &mut OccupancyGrid, position: Vec3) -> bool {
        match grid.field().index_at(position) {
            Some(index) => self.move_reservation(grid, index).is_ok(),
            None        => false,
        }
    }

    /// Move this agent's single reservation to `index`.
    ///
    /// The old node is released first, so the agent never holds two.  A
    /// refusal on a node the caller found free means the grid is
    /// inconsistent.
    pub(crate) fn move_reservation(&mut self, grid: &mut OccupancyGrid, index: NodeIndex) -> PathingResult<()> {
        if self.occupied_at == Some(index) {
            return Ok(());
        }
        self.release_reservation(grid);
        if !grid.reserve(index, self.scale, self.node_type, self.unit) {
            return Err(PathingError::ReservationFailed { unit: self.unit, index });
        }
        self.occupied_at = Some(index);
        Ok(())
    }

    pub(crate) fn release_reservation(&mut self, grid: &mut OccupancyGrid) -> bool {
        match self.occupied_at.take() {
            Some(old) => grid.release_held(old, self.scale, self.node_type, self.unit),
            None      => false,
        }
    }

    /// Release everything and stop ticking.  Idempotent.
    pub fn retire(&mut self, grid: &mut OccupancyGrid) {
        if self.retired {
            return;
        }
        self.release_reservation(grid);
        self.channel.cancel();
        self.path_queue.clear();
        self.path_stack.clear();
        self.solution.clear();
        self.goal_active = false;
        self.retired = true;
    }

    // ── State changes ─────────────────────────────────────────────────────

    /// Transition to `to`, bracketing it with updating/updated events.
    /// A self-loop emits nothing.
    pub(crate) fn set_state(&mut self, to: PathState, events: &mut EventLog, now: f64) {
        let from = self.state;
        if from == to {
            return;
        }
        let elapsed = (now - self.state_entered_at) as f32;
        let total = self.goal_elapsed(now);
        events.push(PathEvent::StateUpdating { unit: self.unit, from, to, elapsed, total });
        self.state = to;
        self.state_entered_at = now;
        events.push(PathEvent::StateUpdated { unit: self.unit, state: to, elapsed, total });
    }

    pub(crate) fn goal_elapsed(&self, now: f64) -> f32 {
        (now - self.goal_started_at).max(0.0) as f32
    }

    /// Count timers down by `dt` seconds.
    pub(crate) fn tick_timers(&mut self, dt: f32) {
        self.block_recheck = (self.block_recheck - dt).max(0.0);
        self.alt_goal_recheck = (self.alt_goal_recheck - dt).max(0.0);
    }

    /// Drop the loaded solution and park after an invariant violation.
    pub fn reset_after_violation(&mut self, events: &mut EventLog, now: f64) {
        self.solution.clear();
        self.goal_active = false;
        self.on_temp_goal = false;
        self.resume_goal = None;
        self.yielded_to = None;
        self.unpatience = 0.0;
        self.set_state(PathState::Resting, events, now);
    }
}
