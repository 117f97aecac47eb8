//! Host-to-client move relay.
//!
//! The host forwards every node claim and every move-out-of-the-way target
//! as a [`MoveCommand`]; clients apply them verbatim and never search.

use std::sync::Arc;

use crossbeam_queue::SegQueue;
use glam::Vec3;
use rts_core::{PlayerId, UnitId};

/// "Unit `unit` of `player` now moves to `target`."
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MoveCommand {
    pub player: PlayerId,
    pub unit:   UnitId,
    pub target: Vec3,
}

/// Outbound transport for move commands.
pub trait NetworkRelay {
    fn send_move_command(&mut self, command: MoveCommand);
}

/// Drops every command (standalone games, tests).
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopRelay;

impl NetworkRelay for NoopRelay {
    fn send_move_command(&mut self, _command: MoveCommand) {}
}

/// Pushes commands onto a shared lock-free queue a transport thread drains.
#[derive(Clone, Debug, Default)]
pub struct CommandQueueRelay {
    queue: Arc<SegQueue<MoveCommand>>,
}

impl CommandQueueRelay {
    /// Relay over a fresh queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumer handle for the transport side.
    pub fn handle(&self) -> Arc<SegQueue<MoveCommand>> {
        Arc::clone(&self.queue)
    }

    /// Commands not yet drained.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Pop every queued command, in send order.
    pub fn drain(&self) -> Vec<MoveCommand> {
        std::iter::from_fn(|| self.queue.pop()).collect()
    }
}

impl NetworkRelay for CommandQueueRelay {
    fn send_move_command(&mut self, command: MoveCommand) {
        self.queue.push(command);
    }
}

impl<N: NetworkRelay + ?Sized> NetworkRelay for Box<N> {
    fn send_move_command(&mut self, command: MoveCommand) {
        (**self).send_move_command(command)
    }
}
