//! "Move out of the way": a blocker steps to an adjacent free node.

use rts_core::{NodeIndex, UnitId};
use rts_grid::{GridCoord, NEIGHBOR_OFFSETS};
use tracing::debug;

use crate::machine::{TickContext, announce_move};
use crate::{PathState, PathfindingAgent, PathingError, PathingResult};

/// Ask `id` to step onto a random free neighbour.
///
/// Candidates exclude occupied and blocked nodes and the next few nodes of
/// the unit's own solution.  If the only candidate is the node the unit
/// stepped to last time, the request is refused so two units cannot bounce
/// one blocker back and forth.  Stationary entities always refuse.
///
/// On success the unit's reservation moves to the chosen node and it enters
/// [`PathState::Moving`].
pub fn move_out_of_the_way(
    agents: &mut [PathfindingAgent],
    id:     UnitId,
    ctx:    &mut TickContext<'_>,
) -> PathingResult<bool> {
    let i = id.index();
    let body = ctx.bodies.get(i).ok_or(PathingError::UnknownUnit(id))?;
    let agent = agents.get(i).ok_or(PathingError::UnknownUnit(id))?;
    if !body.kind.is_mobile() || agent.is_retired() || agent.state == PathState::BotHelper {
        return Ok(false);
    }

    let field = ctx.grid.field();
    let here = match agent.occupied_at() {
        Some(index) => field.coord_at(index),
        None => match field.coord_of(body.position) {
            Some(c) => c,
            None    => return Ok(false),
        },
    };
    let upcoming: Vec<NodeIndex> = agent
        .solution
        .iter()
        .take(ctx.config.lookahead_nodes)
        .filter_map(|&p| field.index_at(p))
        .collect();
    let respects = agent.respects_terrain();
    let candidates: Vec<GridCoord> = NEIGHBOR_OFFSETS
        .iter()
        .map(|&(dx, dz)| here.offset(dx, dz))
        .filter(|&c| ctx.grid.is_free(c, agent.scale, agent.node_type, respects, None))
        .filter(|&c| field.index_of(c).is_some_and(|ix| !upcoming.contains(&ix)))
        .collect();
    let height = body.position.y;

    let agent = &mut agents[i];
    let chosen = match candidates.as_slice() {
        [] => None,
        [only] if field.index_of(*only) == agent.last_evasion => None,
        [only] => Some(*only),
        many => agent.rng.choose(many).copied(),
    };
    let Some((coord, index)) = chosen.and_then(|c| field.index_of(c).map(|ix| (c, ix))) else {
        debug!(unit = %id, candidates = candidates.len(), "evasion_refused");
        return Ok(false);
    };
    let mut target = field.center_of(coord);
    target.y = height;

    agent.move_reservation(ctx.grid, index)?;
    agent.last_evasion = Some(index);
    agent.move_to_position = target;
    agent.move_started_at = ctx.now;
    agent.set_state(PathState::Moving, ctx.events, ctx.now);
    announce_move(ctx, agent, target);
    debug!(unit = %id, to = %coord, "evasion");
    Ok(true)
}
