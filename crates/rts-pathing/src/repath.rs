//! Recovery when the way ahead stays shut: goal substitution, repath, and
//! the alternate attack stance.

use glam::Vec3;
use tracing::debug;

use rts_core::planar;

use crate::machine::TickContext;
use crate::{PathState, PathfindingAgent};

/// Abandon the loaded solution and requeue the closest free node to the
/// goal.  Gives up (goal abandoned) when that node is the goal's own node.
pub(crate) fn repath(agent: &mut PathfindingAgent, ctx: &mut TickContext<'_>) {
    let field = ctx.grid.field();
    let goal_center = field.coord_of(agent.goal_position).map(|c| field.center_of(c));
    let alternative = ctx.grid.closest_free_node(
        agent.goal_position,
        agent.scale,
        agent.node_type,
        agent.respects_terrain(),
        Some(agent.unit),
        ctx.transforms,
    );

    agent.solution.clear();
    agent.yielded_to = None;
    agent.unpatience = 0.0;

    match (alternative, goal_center) {
        (Some(mut alt), Some(center)) if planar::distance(alt, center) > ctx.config.give_up_epsilon => {
            alt.y = agent.goal_position.y;
            if agent.on_temp_goal {
                agent.path_stack.push(alt);
            } else {
                agent.path_queue.push_front(alt);
            }
            debug!(unit = %agent.unit, goal = ?agent.goal_position, alternative = ?alt, "repath");
        }
        _ => {
            debug!(unit = %agent.unit, goal = ?agent.goal_position, "repath_gave_up");
            abandon_goal(agent);
        }
    }
    agent.set_state(PathState::Resting, ctx.events, ctx.now);
}

/// Drop the current goal.  A detour resumes the goal it interrupted unless
/// the unit is in attack mode.
pub(crate) fn abandon_goal(agent: &mut PathfindingAgent) {
    if agent.on_temp_goal {
        agent.on_temp_goal = false;
        if let Some(goal) = agent.resume_goal.take() {
            if agent.attack_target.is_none() {
                agent.path_queue.push_front(goal);
                return;
            }
        }
    }
    agent.resume_goal = None;
    agent.goal_active = false;
}

/// First free node on the ring of radius `attack_range` around `target`,
/// rotating the unit's bearing in 45° steps.
pub fn attack_stance(agent: &PathfindingAgent, from: Vec3, target: Vec3, ctx: &TickContext<'_>) -> Option<Vec3> {
    let mut bearing = from - target;
    bearing.y = 0.0;
    let bearing = bearing.try_normalize().unwrap_or(Vec3::X) * ctx.config.attack_range;
    let field = ctx.grid.field();
    (1..=8)
        .map(|k| target + planar::rotate_y(bearing, 45.0 * k as f32))
        .filter_map(|p| field.coord_of(p))
        .find(|&c| {
            ctx.grid
                .is_free(c, agent.scale, agent.node_type, agent.respects_terrain(), Some(agent.unit))
        })
        .map(|c| {
            let mut p = field.center_of(c);
            p.y = from.y;
            p
        })
}

/// In attack mode, when stuck and the recheck timer allows, detour to an
/// attack stance.  Returns `true` if a detour was pushed.
pub(crate) fn try_attack_stance(agent: &mut PathfindingAgent, from: Vec3, ctx: &mut TickContext<'_>) -> bool {
    let Some(target) = agent.attack_target else {
        return false;
    };
    if agent.alt_goal_recheck > 0.0 {
        return false;
    }
    agent.alt_goal_recheck = ctx.config.alt_goal_recheck_secs;
    let Some(stance) = attack_stance(agent, from, target, ctx) else {
        debug!(unit = %agent.unit, target = ?target, "attack_stance_none");
        return false;
    };
    agent.path_stack.push(stance);
    agent.solution.clear();
    agent.yielded_to = None;
    agent.unpatience = 0.0;
    agent.set_state(PathState::Resting, ctx.events, ctx.now);
    debug!(unit = %agent.unit, stance = ?stance, "attack_stance");
    true
}
