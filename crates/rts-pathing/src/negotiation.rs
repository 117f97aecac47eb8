//! Claiming the next node of a solution against the occupancy grid.
//!
//! # Protocol
//!
//! 1. The next node left the grid: give up on the goal.
//! 2. The next node became impassable: repath.
//! 3. The node is free (or already ours): move the reservation there.
//! 4. A resting unit holds it: a unit with priority asks it to step aside at
//!    once; otherwise the agent waits one pause first and asks on the second
//!    encounter.
//! 5. A unit that wants our own cell holds it (face to face): both sides
//!    wait once; on the second encounter the standoff winner asks the other
//!    to step aside and the loser keeps waiting until its patience runs out.
//! 6. Any other unit holds it: wait until patience runs out, then repath.
//!
//! The occupancy check and the reservation are one call on the grid, so an
//! agent that sees a free node always gets it.

use glam::Vec3;
use tracing::trace;

use rts_core::{NodeIndex, UnitId};

use crate::evasion::move_out_of_the_way;
use crate::machine::TickContext;
use crate::{PathState, PathfindingAgent, PathingError, PathingResult, UnitBody};

/// Result of one claim attempt.
#[derive(Copy, Clone, PartialEq, Debug)]
pub enum ClaimOutcome {
    /// The node is reserved; steer toward it.
    Claimed(Vec3),
    /// Wait behind a peer.
    Yield,
    /// The way is shut; look for a free node near the goal instead.
    Repath,
    /// The solution has no nodes left.
    Exhausted,
    /// The solution leaves the grid.
    GaveUp,
}

/// `true` if a unit may ask `peer` to step aside without waiting first:
/// it is strictly faster, or the peer defers at its goal flag.
pub fn has_priority(me: &UnitBody, peer: &PathfindingAgent, peer_body: &UnitBody) -> bool {
    me.max_speed > peer_body.max_speed || peer.ignore_occupied_by_flag
}

/// Priority with a deterministic tie-break: on equal speed the lower unit id
/// wins, so exactly one side of a face-to-face standoff acts.
pub fn wins_standoff(me: UnitId, me_body: &UnitBody, peer: &PathfindingAgent, peer_body: &UnitBody) -> bool {
    has_priority(me_body, peer, peer_body)
        || (me_body.max_speed == peer_body.max_speed && me < peer.unit)
}

enum Stance {
    /// Ask the occupant to step aside.
    Evict,
    /// Wait one pause and remember the peer.
    Wait,
    /// Wait until patience runs out, then repath.
    Endure,
}

/// Try to claim the front node of `id`'s solution.
pub fn claim_next_node(
    agents: &mut [PathfindingAgent],
    id:     UnitId,
    ctx:    &mut TickContext<'_>,
) -> PathingResult<ClaimOutcome> {
    let i = id.index();
    let agent = agents.get(i).ok_or(PathingError::UnknownUnit(id))?;
    let Some(&next) = agent.solution.front() else {
        return Ok(ClaimOutcome::Exhausted);
    };

    let field = ctx.grid.field();
    let Some(index) = field.index_at(next) else {
        return Ok(ClaimOutcome::GaveUp);
    };
    let coord = field.coord_at(index);
    if agent.respects_terrain() && field.is_blocked(agent.scale, coord.x, coord.z) {
        trace!(unit = %id, node = %coord, "next_node_blocked");
        return Ok(ClaimOutcome::Repath);
    }

    match ctx.grid.occupant_at(index, agent.scale, agent.node_type) {
        Some(other) if other != id => negotiate_with(agents, id, other, index, ctx),
        _ => {
            let agent = &mut agents[i];
            agent.move_reservation(ctx.grid, index)?;
            agent.solution.pop_front();
            Ok(ClaimOutcome::Claimed(next))
        }
    }
}

fn negotiate_with(
    agents: &mut [PathfindingAgent],
    id:     UnitId,
    other:  UnitId,
    index:  NodeIndex,
    ctx:    &mut TickContext<'_>,
) -> PathingResult<ClaimOutcome> {
    let i = id.index();
    let me = &agents[i];
    let peer = agents.get(other.index()).ok_or(PathingError::UnknownUnit(other))?;
    let my_body = ctx.bodies.get(i).ok_or(PathingError::UnknownUnit(id))?;
    let peer_body = ctx.bodies.get(other.index()).ok_or(PathingError::UnknownUnit(other))?;

    let second_encounter = me.yielded_to == Some(other);
    let stance = match peer.state {
        PathState::Resting => {
            if second_encounter || has_priority(my_body, peer, peer_body) {
                Stance::Evict
            } else {
                Stance::Wait
            }
        }
        PathState::BotHelper => Stance::Endure,
        _ => {
            let mine = me.occupied_at();
            let face_to_face = mine.is_some() && peer.wanted_index(ctx.grid.field()) == mine;
            if face_to_face && second_encounter && wins_standoff(id, my_body, peer, peer_body) {
                Stance::Evict
            } else if face_to_face && !second_encounter {
                Stance::Wait
            } else {
                Stance::Endure
            }
        }
    };
    let impatient = me.unpatience >= ctx.config.unpatience_limit_secs;
    trace!(unit = %id, peer = %other, node = %index, peer_state = %peer.state, second_encounter, "node_contested");

    match stance {
        Stance::Evict => {
            if move_out_of_the_way(agents, other, ctx)? {
                agents[i].yielded_to = None;
                Ok(ClaimOutcome::Yield)
            } else {
                Ok(ClaimOutcome::Repath)
            }
        }
        Stance::Wait => {
            agents[i].yielded_to = Some(other);
            Ok(ClaimOutcome::Yield)
        }
        Stance::Endure if impatient => Ok(ClaimOutcome::Repath),
        Stance::Endure => {
            agents[i].yielded_to = Some(other);
            Ok(ClaimOutcome::Yield)
        }
    }
}
