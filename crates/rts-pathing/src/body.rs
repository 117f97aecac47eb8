//! Physical state the movement core steers: position, velocity, limits.

use glam::Vec3;
use rts_core::PathNodeType;
use rts_core::planar;

/// What kind of entity owns an agent.
///
/// Steering and negotiation branch on this tag instead of on a chain of
/// runtime type tests.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityKind {
    #[default]
    Infantry,
    Vehicle,
    Aircraft,
    /// Stationary structure; `footprint` is its edge in nodes.
    Building { footprint: u8 },
    /// Escort unit driven by external logic.
    Helper,
}

impl EntityKind {
    /// `true` if the entity has a force source and can be steered or asked
    /// to step aside.
    #[inline]
    pub fn is_mobile(self) -> bool {
        !matches!(self, EntityKind::Building { .. })
    }

    /// Sub-grid the entity lives in.
    #[inline]
    pub fn node_type(self) -> PathNodeType {
        match self {
            EntityKind::Aircraft => PathNodeType::Air,
            _                    => PathNodeType::Ground,
        }
    }

    /// `true` for the kinds that anchor the non-penetration pass.
    #[inline]
    pub fn anchors_separation(self) -> bool {
        matches!(self, EntityKind::Aircraft | EntityKind::Building { .. })
    }
}

/// Kinematic body of one unit.
#[derive(Clone, Debug)]
pub struct UnitBody {
    pub kind:             EntityKind,
    pub position:         Vec3,
    pub velocity:         Vec3,
    /// Per-axis velocity limit.
    pub max_speed:        f32,
    pub collision_radius: f32,
    /// A waypoint counts as reached within this XZ distance.
    pub arrival_radius:   f32,
    external_force:       Vec3,
}

impl UnitBody {
    /// A body at rest at `position` with default collision and arrival radii.
    pub fn new(kind: EntityKind, position: Vec3, max_speed: f32) -> Self {
        Self {
            kind,
            position,
            velocity:         Vec3::ZERO,
            max_speed:        max_speed.max(0.0),
            collision_radius: 0.4,
            arrival_radius:   0.15,
            external_force:   Vec3::ZERO,
        }
    }

    /// Radius used by the non-penetration pass.
    pub fn with_radius(mut self, collision_radius: f32) -> Self {
        self.collision_radius = collision_radius.max(0.0);
        self
    }

    /// Distance within which a waypoint counts as reached.
    pub fn with_arrival_radius(mut self, arrival_radius: f32) -> Self {
        self.arrival_radius = arrival_radius.max(0.0);
        self
    }

    /// XZ arrival test against `target`.
    #[inline]
    pub fn has_reached(&self, target: Vec3) -> bool {
        planar::distance_sq(self.position, target) <= self.arrival_radius * self.arrival_radius
    }

    /// Accumulate a one-tick external push (knock-back, formation nudge).
    pub fn add_force(&mut self, force: Vec3) {
        self.external_force += force;
    }

    pub(crate) fn take_external_force(&mut self) -> Vec3 {
        std::mem::take(&mut self.external_force)
    }

    /// Snap to `position` and stop.
    pub fn teleport(&mut self, position: Vec3) {
        self.position = position;
        self.velocity = Vec3::ZERO;
    }
}
