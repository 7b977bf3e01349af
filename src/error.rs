//! Construction errors of the disciplines.

use std::time::Duration;
use thiserror::Error;

/// Errors reported by discipline constructors.
///
/// All of them are detected before any background thread is started; a running discipline
/// never produces an error value.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DisciplineError {
    /// No input source was supplied.
    #[error("input source is missing")]
    MissingInput,

    /// Join size was zero.
    #[error("join size must be greater than zero")]
    InvalidJoinSize,

    /// Timeout inaccuracy is not a percentage in `1..=100`.
    #[error("timeout inaccuracy must be within 1..=100 percent, got {0}")]
    InvalidTimeoutInaccuracy(u32),

    /// Timeout divided by detection steps rounds down to zero.
    #[error("timeout {timeout:?} is too small to detect with {inaccuracy}% inaccuracy")]
    TimeoutTooSmall {
        timeout: Duration,
        inaccuracy: u32,
    },
}
