//! `rts-grid`: terrain costs, occupancy, line of sight, and path solving.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                    |
//! |-----------------|-------------------------------------------------------------|
//! | [`field`]       | `CostField`, `GridSettings`, `GridCoord`: static terrain   |
//! | [`occupancy`]   | `OccupancyGrid`, `OccupancyKey`: per-node unit reservations |
//! | [`transforms`]  | `NeighborTransforms`, `NEIGHBOR_OFFSETS`: spiral offset tables |
//! | [`sight`]       | `LineOfSight` trait, `ObstacleSet`, `SceneLineOfSight`      |
//! | [`solver`]      | `PathSolver` trait, `SearchRequest`, `SolvedPath`, `GridSolver` |
//! | [`error`]       | `GridError`, `GridResult<T>`                                |
//!
//! # Feature flags
//!
//! | Flag          | Effect                                                   |
//! |---------------|----------------------------------------------------------|
//! | `debug-trace` | `SolvedPath` carries the explored node set.              |
//! | `serde`       | Derives `Serialize`/`Deserialize` on public types.       |

pub mod error;
pub mod field;
pub mod occupancy;
pub mod sight;
pub mod solver;
pub mod transforms;

#[cfg(test)]
mod tests;

pub use error::{GridError, GridResult};
pub use field::{BLOCKED, CostField, GridCoord, GridSettings};
pub use occupancy::{OccupancyGrid, OccupancyKey};
pub use sight::{LineOfSight, Obstacle, ObstacleSet, SceneLineOfSight};
pub use solver::{GridSolver, PathSolver, SearchRequest, SolvedPath};
pub use transforms::{NEIGHBOR_OFFSETS, NeighborTransforms};
