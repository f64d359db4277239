//! Error types for control blocks.

use sp_core::CoreError;
use sp_signal::SignalError;
use thiserror::Error;

/// Result type for control block operations.
pub type ControlResult<T> = Result<T, ControlError>;

/// Errors that can occur while building or stepping control blocks.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// Invalid block parameter.
    #[error("Invalid configuration: {what} (got {value})")]
    Configuration { what: &'static str, value: f64 },

    /// Failure in the underlying signal engine.
    #[error(transparent)]
    Signal(#[from] SignalError),
}

impl From<CoreError> for ControlError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::NonFinite { what, value } | CoreError::InvalidArg { what, value } => {
                ControlError::Configuration { what, value }
            }
            other => ControlError::Signal(other.into()),
        }
    }
}
