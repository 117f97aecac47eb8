//! Outbound state-change records.
//!
//! Agents push [`PathEvent`]s into an [`EventLog`] instead of invoking
//! subscriber callbacks; the simulation drains the log once per tick and hands
//! each record to its observer.  UI and debug overlays never run inside an
//! agent's tick.

use glam::Vec3;
use rts_core::UnitId;

use crate::PathState;

/// One state-change record.  `elapsed` is seconds spent in the previous state
/// (or on the move), `total` is seconds since the current goal was dispatched.
#[derive(Clone, Debug, PartialEq)]
pub enum PathEvent {
    /// Emitted just before a transition.
    StateUpdating {
        unit:    UnitId,
        from:    PathState,
        to:      PathState,
        elapsed: f32,
        total:   f32,
    },
    /// Emitted just after a transition.
    StateUpdated {
        unit:    UnitId,
        state:   PathState,
        elapsed: f32,
        total:   f32,
    },
    /// The last node of a goal's solution was reached.
    GoalCompleted {
        unit:  UnitId,
        goal:  Vec3,
        total: f32,
    },
    /// A single `moveToPosition` was reached.
    MoveToCompleted {
        unit:    UnitId,
        target:  Vec3,
        state:   PathState,
        elapsed: f32,
    },
}

impl PathEvent {
    /// Unit the event concerns.
    pub fn unit(&self) -> UnitId {
        match *self {
            PathEvent::StateUpdating { unit, .. }
            | PathEvent::StateUpdated { unit, .. }
            | PathEvent::GoalCompleted { unit, .. }
            | PathEvent::MoveToCompleted { unit, .. } => unit,
        }
    }

    /// Snake-case event name used as the log message.
    pub fn name(&self) -> &'static str {
        match self {
            PathEvent::StateUpdating { .. }   => "state_updating",
            PathEvent::StateUpdated { .. }    => "state_updated",
            PathEvent::GoalCompleted { .. }   => "goal_completed",
            PathEvent::MoveToCompleted { .. } => "move_to_completed",
        }
    }
}

/// Per-tick buffer of [`PathEvent`]s.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<PathEvent>,
}

impl EventLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    #[inline]
    pub fn push(&mut self, event: PathEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events in emission order.
    pub fn iter(&self) -> impl Iterator<Item = &PathEvent> {
        self.events.iter()
    }

    /// Events of one unit only (the per-instance subscription).
    pub fn for_unit(&self, unit: UnitId) -> impl Iterator<Item = &PathEvent> {
        self.events.iter().filter(move |e| e.unit() == unit)
    }

    /// Take every buffered event, leaving the log empty.
    pub fn drain(&mut self) -> std::vec::Drain<'_, PathEvent> {
        self.events.drain(..)
    }
}
