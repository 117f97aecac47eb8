//! `rts-sim`: fixed-step tick loop for the RTS unit movement core.
//!
//! # Tick loop
//!
//! ```text
//! for tick in 0..config.total_ticks:
//!   ① Agents    : tick_agent for every unit in id order: poll searches,
//!                  claim nodes, negotiate, relay host decisions.
//!                  A broken invariant resets that agent only.
//!   ② Steering  : integrate every mobile unit in Moving / PathFindingMoving
//!                  toward its move_to_position.
//!   ③ Separation: push bodies out of buildings; split overlapping aircraft.
//!   ④ Events    : drain the EventLog into the observer; compute TickStats.
//! ```
//!
//! Searches run wherever the dispatcher sends them.  With
//! `InlineDispatcher` a search is solved before `tick_agent` returns, so a
//! run is fully deterministic for a given seed.  With `PooledDispatcher`
//! results arrive on a later tick.
//!
//! # Network roles
//!
//! | Role         | Searches | Reserves | Relays moves | Accepts moves |
//! |--------------|----------|----------|--------------|---------------|
//! | `Standalone` | yes      | yes      | no           | no            |
//! | `Host`       | yes      | yes      | yes          | no            |
//! | `Client`     | no       | no       | no           | yes           |
//!
//! # Cargo features
//!
//! | Feature       | Effect                                                |
//! |---------------|-------------------------------------------------------|
//! | `debug-trace` | Solution channels keep each search's explored nodes.  |
//! | `serde`       | Serializable configs, ids, and move commands.         |
//!
//! # Quick-start
//!
//! ```rust,ignore
//! use rts_core::{PlayerId, SimConfig};
//! use rts_grid::{GridSettings, GridSolver};
//! use rts_pathing::{EntityKind, InlineDispatcher, NoopRelay};
//! use rts_sim::{NoopObserver, SimBuilder, UnitSpec};
//!
//! let mut sim = SimBuilder::new(config, InlineDispatcher::new(GridSolver::default()), NoopRelay)
//!     .grid(GridSettings { width: 64, height: 64, ..Default::default() })
//!     .unit(UnitSpec::new(PlayerId(0), EntityKind::Infantry, Vec3::new(2.5, 0.0, 2.5), 3.0))
//!     .build()?;
//! sim.add_waypoint_goal(UnitId(0), Vec3::new(40.5, 0.0, 40.5), false)?;
//! sim.run(&mut NoopObserver)?;
//! ```

pub mod builder;
pub mod error;
pub mod observer;
pub mod sim;

#[cfg(test)]
mod tests;

pub use builder::{SimBuilder, UnitSpec};
pub use error::{SimError, SimResult};
pub use observer::{NoopObserver, SimObserver, TracingObserver};
pub use sim::{Sim, TickStats};
