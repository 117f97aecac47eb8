//! `rts-core`: foundational types for the RTS unit movement core.
//!
//! This crate is a dependency of every other `rts-*` crate.  It has no
//! `rts-*` dependencies and only a few external ones (`glam`, `rand`,
//! `thiserror`, plus optional `serde`).
//!
//! # What lives here
//!
//! | Module        | Contents                                                 |
//! |---------------|----------------------------------------------------------|
//! | [`ids`]       | `UnitId`, `PlayerId`, `NodeIndex`                        |
//! | [`node`]      | `PathNodeType` (Ground / Air), `NetRole`                 |
//! | [`planar`]    | XZ-plane helpers on `glam::Vec3` (distance, rotation, NaN scrub) |
//! | [`time`]      | `Tick`, `SimClock`, `SimConfig`                          |
//! | [`rng`]       | `UnitRng` (per-unit), `SimRng` (global)                  |
//! | [`error`]     | `CoreError`, `CoreResult`                                |
//!
//! # Feature flags
//!
//! | Flag    | Effect                                                     |
//! |---------|------------------------------------------------------------|
//! | `serde` | Adds `Serialize`/`Deserialize` to all public types.        |

pub mod error;
pub mod ids;
pub mod node;
pub mod planar;
pub mod rng;
pub mod time;

#[cfg(test)]
mod tests;

// ── Re-exports ────────────────────────────────────────────────────────────────

pub use error::{CoreError, CoreResult};
pub use glam::{Vec2, Vec3};
pub use ids::{NodeIndex, PlayerId, UnitId};
pub use node::{NetRole, PathNodeType};
pub use rng::{SimRng, UnitRng};
pub use time::{SimClock, SimConfig, Tick};
