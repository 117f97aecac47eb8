//! Force-based steering, velocity integration, and the non-penetration pass.
//!
//! # Integration
//!
//! ```text
//! v' = v · max(0, 1 − friction·dt) + F·dt
//! v' = clamp(v', −max_speed, +max_speed)      (per component)
//! if |v'|² > min_speed_sq:  p' = p + v'·dt
//! ```
//!
//! The clamp is per component, so diagonal speed can exceed `max_speed` by up
//! to √2 on the XZ plane.  Gameplay tuning assumes this.

use glam::Vec3;
use rstar::RTree;
use rstar::primitives::GeomWithData;

use rts_core::planar::{self, scrub_nan};

use crate::{EntityKind, PathfindingAgent, PathingConfig, UnitBody};

// ── Force sources ─────────────────────────────────────────────────────────────

/// Source of the steering force toward the agent's `move_to_position`.
pub trait ForceBehavior {
    fn steering_force(&self, body: &UnitBody, target: Vec3) -> Vec3;
}

/// Seek with linear slow-down inside `slowing_radius`.
#[derive(Copy, Clone, Debug)]
pub struct Seek {
    pub gain:           f32,
    pub slowing_radius: f32,
    /// Floor of the desired speed while slowing, so a unit keeps creeping
    /// above the integration threshold until it arrives.
    pub creep_speed:    f32,
}

impl Seek {
    /// Seek with `gain`, a one-node slowing radius, and a 0.5 creep speed.
    pub fn new(gain: f32) -> Self {
        Self { gain, slowing_radius: 1.0, creep_speed: 0.5 }
    }
}

impl Default for Seek {
    fn default() -> Self {
        Self::new(PathingConfig::default().steering_gain)
    }
}

impl ForceBehavior for Seek {
    fn steering_force(&self, body: &UnitBody, target: Vec3) -> Vec3 {
        let mut to_target = target - body.position;
        to_target.y = 0.0;
        let distance = to_target.length();
        if distance <= f32::EPSILON {
            return -body.velocity * self.gain;
        }
        let ramp = if self.slowing_radius > 0.0 {
            (distance / self.slowing_radius).min(1.0)
        } else {
            1.0
        };
        let speed = (body.max_speed * ramp).max(self.creep_speed.min(body.max_speed));
        let desired = to_target / distance * speed;
        (desired - body.velocity) * self.gain
    }
}

impl<F: ForceBehavior + ?Sized> ForceBehavior for Box<F> {
    fn steering_force(&self, body: &UnitBody, target: Vec3) -> Vec3 {
        (**self).steering_force(body, target)
    }
}

// ── Integration ───────────────────────────────────────────────────────────────

/// Apply friction and force, then clamp each component to `±max_speed`.
pub fn integrate_velocity(velocity: Vec3, force: Vec3, dt: f32, friction: f32, max_speed: f32) -> Vec3 {
    let decay = (1.0 - friction * dt).max(0.0);
    let limit = Vec3::splat(max_speed.abs());
    scrub_nan(velocity * decay + force * dt).clamp(-limit, limit)
}

/// One steering step for a unit in a moving state.
pub fn steer<F: ForceBehavior + ?Sized>(
    agent:    &mut PathfindingAgent,
    body:     &mut UnitBody,
    behavior: &F,
    dt:       f32,
    config:   &PathingConfig,
) {
    let force = scrub_nan(behavior.steering_force(body, agent.move_to_position) + body.take_external_force());
    body.velocity = integrate_velocity(body.velocity, force, dt, config.friction, body.max_speed);
    if body.velocity.length_squared() <= config.min_speed_sq {
        return;
    }
    body.position = scrub_nan(body.position + body.velocity * dt);

    let heading = scrub_nan(body.velocity.normalize_or_zero());
    if heading != Vec3::ZERO {
        agent.heading = heading;
    }
    let blend = config.heading_smoothing.clamp(0.0, 1.0);
    agent.smooth_heading = scrub_nan(agent.smooth_heading.lerp(agent.heading, blend));
}

// ── Non-penetration ───────────────────────────────────────────────────────────

type BodyPoint = GeomWithData<[f32; 2], usize>;

/// Push bodies out of stationary buildings and aircraft out of each other.
///
/// Only building and aircraft bodies anchor the pass; ground units are never
/// separated from each other here because occupancy already keeps them
/// apart.  Buildings never move; two overlapping aircraft each take half of
/// the correction.  Slots for which `is_live` returns `false` (removed
/// units) neither push nor get pushed.  Returns the number of overlaps
/// resolved.
pub fn separate(bodies: &mut [UnitBody], is_live: impl Fn(usize) -> bool) -> usize {
    let anchors: Vec<usize> = (0..bodies.len())
        .filter(|&i| is_live(i) && bodies[i].kind.anchors_separation())
        .collect();
    if anchors.is_empty() {
        return 0;
    }

    let points: Vec<BodyPoint> = bodies
        .iter()
        .enumerate()
        .filter(|&(i, _)| is_live(i))
        .map(|(i, b)| BodyPoint::new(planar::flat(b.position).to_array(), i))
        .collect();
    let max_radius = bodies.iter().map(|b| b.collision_radius).fold(0.0_f32, f32::max);
    let tree = RTree::bulk_load(points);

    let mut shifts = vec![Vec3::ZERO; bodies.len()];
    let mut resolved = 0;
    for &i in &anchors {
        let anchor = &bodies[i];
        let reach = anchor.collision_radius + max_radius;
        let center = planar::flat(anchor.position).to_array();
        for hit in tree.locate_within_distance(center, reach * reach) {
            let j = hit.data;
            if j == i {
                continue;
            }
            let other = &bodies[j];
            let (moves_other, moves_anchor) = match (anchor.kind, other.kind) {
                (EntityKind::Building { .. }, EntityKind::Building { .. }) => continue,
                (EntityKind::Building { .. }, EntityKind::Aircraft) => continue,
                (EntityKind::Building { .. }, _) => (1.0, 0.0),
                (EntityKind::Aircraft, EntityKind::Aircraft) if j > i => (0.5, 0.5),
                _ => continue,
            };
            let mut offset = other.position - anchor.position;
            offset.y = 0.0;
            let distance = offset.length();
            let overlap = anchor.collision_radius + other.collision_radius - distance;
            if overlap <= 0.0 {
                continue;
            }
            let dir = if distance > f32::EPSILON { offset / distance } else { Vec3::X };
            shifts[j] += dir * overlap * moves_other;
            shifts[i] -= dir * overlap * moves_anchor;
            resolved += 1;
        }
    }

    for (body, shift) in bodies.iter_mut().zip(shifts) {
        body.position = scrub_nan(body.position + shift);
    }
    resolved
}
