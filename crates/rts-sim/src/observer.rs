//! Simulation observer trait for progress reporting and event collection.

use rts_core::{Tick, UnitId};
use rts_pathing::{PathEvent, PathingError};
use tracing::{debug, error, trace};

use crate::TickStats;

/// Callbacks invoked by [`Sim::run`][crate::Sim::run] at key points in the
/// tick loop.
///
/// All methods have default no-op implementations so implementors only need to
/// override what they care about.
///
/// # Example: arrival counter
///
/// ```rust,ignore
/// struct Arrivals(usize);
///
/// impl SimObserver for Arrivals {
///     fn on_path_event(&mut self, _tick: Tick, event: &PathEvent) {
///         if matches!(event, PathEvent::GoalCompleted { .. }) {
///             self.0 += 1;
///         }
///     }
/// }
/// ```
pub trait SimObserver {
    /// Called at the very start of each tick, before any agent runs.
    fn on_tick_start(&mut self, _tick: Tick) {}

    /// Called for every event agents emitted this tick, in emission order,
    /// after all agents and steering have run.
    fn on_path_event(&mut self, _tick: Tick, _event: &PathEvent) {}

    /// Called when an agent's tick broke an invariant.  The agent has
    /// already been reset to `Resting`.
    fn on_invariant_violation(&mut self, _tick: Tick, _unit: UnitId, _error: &PathingError) {}

    /// Called at the end of each tick.
    fn on_tick_end(&mut self, _tick: Tick, _stats: &TickStats) {}

    /// Called once after the final tick completes.
    fn on_sim_end(&mut self, _final_tick: Tick) {}
}

/// A [`SimObserver`] that does nothing.
pub struct NoopObserver;

impl SimObserver for NoopObserver {}

/// Forwards events to `tracing`: state changes at `trace`, completions at
/// `debug`, violations at `error`.
pub struct TracingObserver;

impl SimObserver for TracingObserver {
    fn on_path_event(&mut self, tick: Tick, event: &PathEvent) {
        match *event {
            PathEvent::StateUpdating { unit, from, to, elapsed, .. } => {
                trace!(%tick, %unit, %from, %to, elapsed, "state_updating");
            }
            PathEvent::StateUpdated { unit, state, total, .. } => {
                trace!(%tick, %unit, %state, total, "state_updated");
            }
            PathEvent::GoalCompleted { unit, goal, total } => {
                debug!(%tick, %unit, goal = ?goal, total, "goal_completed");
            }
            PathEvent::MoveToCompleted { unit, target, state, elapsed } => {
                trace!(%tick, %unit, target = ?target, %state, elapsed, "move_to_completed");
            }
        }
    }

    fn on_invariant_violation(&mut self, tick: Tick, unit: UnitId, err: &PathingError) {
        error!(%tick, %unit, error = %err, "invariant_violation");
    }

    fn on_tick_end(&mut self, tick: Tick, stats: &TickStats) {
        trace!(
            %tick,
            moving = stats.moving,
            calculating = stats.calculating,
            paused = stats.paused,
            claims = stats.claims,
            "tick_end"
        );
    }

    fn on_sim_end(&mut self, final_tick: Tick) {
        debug!(%final_tick, "sim_end");
    }
}
