use glam::Vec3;
use rts_core::{CoreError, NetRole, UnitId};
use rts_grid::GridError;
use rts_pathing::PathingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("simulation configuration error: {0}")]
    Config(String),

    #[error("unit {0} does not exist")]
    UnknownUnit(UnitId),

    #[error("unit {0} cannot move")]
    Immobile(UnitId),

    #[error("no free node near spawn position {position}")]
    Placement { position: Vec3 },

    #[error("{action} is not allowed on a {role:?} simulation")]
    Role { role: NetRole, action: &'static str },

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("grid error: {0}")]
    Grid(#[from] GridError),

    #[error("pathing error: {0}")]
    Pathing(#[from] PathingError),
}

pub type SimResult<T> = Result<T, SimError>;
