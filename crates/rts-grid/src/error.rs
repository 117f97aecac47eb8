//! Grid-subsystem error type.

use thiserror::Error;

use crate::GridCoord;

/// Errors produced by `rts-grid`.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("world position ({x:.2}, {z:.2}) is outside the grid")]
    OutOfBounds { x: f32, z: f32 },

    #[error("no path from {from} to {to}")]
    NoPath { from: GridCoord, to: GridCoord },

    #[error("search gave up after expanding {expanded} nodes")]
    SearchLimit { expanded: usize },

    #[error("invalid grid settings: {0}")]
    InvalidSettings(&'static str),
}

pub type GridResult<T> = Result<T, GridError>;
