//! Framework error type.
//!
//! `rts-sim` wraps `CoreError` as one variant of its own error via `#[from]`.

use thiserror::Error;

/// Errors raised by `rts-core` itself.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{kind} id space exhausted at {count} entries")]
    IdSpaceExhausted { kind: &'static str, count: usize },
}

/// Shorthand result type for `rts-core`.
pub type CoreResult<T> = Result<T, CoreError>;
