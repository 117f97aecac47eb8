//! `rts-pathing`: the per-unit pathfinding state machine.
//!
//! # Crate layout
//!
//! | Module          | Contents                                                         |
//! |-----------------|------------------------------------------------------------------|
//! | [`state`]       | `PathState`: life-cycle states                                  |
//! | [`agent`]       | `PathfindingAgent`: goals, solution, reservation, timers        |
//! | [`body`]        | `UnitBody`, `EntityKind`: kinematics the agent steers           |
//! | [`channel`]     | `SolutionChannel`: lock-free solver → agent hand-off            |
//! | [`dispatch`]    | `SearchDispatcher`, inline and pooled dispatchers, `SearchTicket` |
//! | [`machine`]     | `TickContext`, `tick_agent`, `apply_move_command`                |
//! | [`negotiation`] | `claim_next_node`, `ClaimOutcome`, priority rules                |
//! | [`evasion`]     | `move_out_of_the_way`                                            |
//! | [`repath`]      | Repath, goal abandonment, attack stances                         |
//! | [`smoothing`]   | `smooth_path`: line-of-sight waypoint pruning                   |
//! | [`steering`]    | `ForceBehavior`, `Seek`, velocity integration, separation        |
//! | [`events`]      | `PathEvent`, `EventLog`                                          |
//! | [`relay`]       | `MoveCommand`, `NetworkRelay`, `CommandQueueRelay`               |
//! | [`config`]      | `PathingConfig`                                                  |
//! | [`error`]       | `PathingError`, `PathingResult<T>`                               |
//!
//! # Threading
//!
//! Agents, bodies, and the occupancy grid belong to the simulation thread.
//! Solvers run wherever the dispatcher puts them and talk to agents only
//! through each agent's `Arc<SolutionChannel>`.

pub mod agent;
pub mod body;
pub mod channel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod evasion;
pub mod events;
pub mod machine;
pub mod negotiation;
pub mod relay;
pub mod repath;
pub mod smoothing;
pub mod state;
pub mod steering;


pub use agent::PathfindingAgent;
pub use body::{EntityKind, UnitBody};
pub use channel::{SearchStatus, SolutionChannel};
pub use config::PathingConfig;
pub use dispatch::{InlineDispatcher, PooledDispatcher, QueueCounters, SearchDispatcher, SearchTicket};
pub use error::{PathingError, PathingResult};
pub use events::{EventLog, PathEvent};
pub use machine::{TickContext, apply_move_command, tick_agent};
pub use negotiation::{ClaimOutcome, claim_next_node};
pub use relay::{CommandQueueRelay, MoveCommand, NetworkRelay, NoopRelay};
pub use state::PathState;
pub use steering::{ForceBehavior, Seek};
