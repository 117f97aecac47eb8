//! Ground-plane helpers on `glam::Vec3`.
//!
//! The world is Y-up; units walk on the XZ plane.  Arrival and occupancy
//! decisions ignore height so a hovering unit still "reaches" a ground node.

use glam::{Quat, Vec2, Vec3};

/// Project onto the XZ plane as a `Vec2(x, z)`.
#[inline]
pub fn flat(v: Vec3) -> Vec2 {
    Vec2::new(v.x, v.z)
}

/// Squared XZ distance.
#[inline]
pub fn distance_sq(a: Vec3, b: Vec3) -> f32 {
    flat(a).distance_squared(flat(b))
}

/// XZ distance.
#[inline]
pub fn distance(a: Vec3, b: Vec3) -> f32 {
    distance_sq(a, b).sqrt()
}

/// Rotate `v` about the Y axis by `degrees`.
#[inline]
pub fn rotate_y(v: Vec3, degrees: f32) -> Vec3 {
    Quat::from_rotation_y(degrees.to_radians()) * v
}

/// Replace NaN components with zero.
///
/// A degenerate normalisation upstream must never leak NaN into positions,
/// where it would persist for the rest of the match.
#[inline]
pub fn scrub_nan(v: Vec3) -> Vec3 {
    Vec3::new(
        if v.x.is_nan() { 0.0 } else { v.x },
        if v.y.is_nan() { 0.0 } else { v.y },
        if v.z.is_nan() { 0.0 } else { v.z },
    )
}
