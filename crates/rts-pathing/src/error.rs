use rts_core::{NodeIndex, UnitId};
use thiserror::Error;

/// Invariant violations inside the movement core.
///
/// Ordinary negotiation failures (node occupied, peer uncooperative, no path)
/// are not errors; they are expressed as state transitions.
#[derive(Debug, Error)]
pub enum PathingError {
    #[error("unit {unit} failed to reserve apparently free node {index}: occupancy grid is inconsistent")]
    ReservationFailed { unit: UnitId, index: NodeIndex },

    #[error("unit {0} has no agent or body")]
    UnknownUnit(UnitId),

    #[error("solver pool could not be built: {0}")]
    SolverPool(String),
}

pub type PathingResult<T> = Result<T, PathingError>;
