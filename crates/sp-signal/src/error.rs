//! Error types for signal operations.

use sp_core::CoreError;
use thiserror::Error;

/// Result type for signal operations.
pub type SignalResult<T> = Result<T, SignalError>;

/// Errors that can occur while building or stepping signals.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SignalError {
    /// A construction parameter is out of range.
    #[error("Invalid configuration: {what} (got {value})")]
    Configuration { what: &'static str, value: f64 },

    /// A step was requested with an unusable step size.
    #[error("Domain error: {what} (got {value})")]
    Domain { what: &'static str, value: f64 },

    /// A declared input was stepped before being wired.
    #[error("Uninitialized reference: {what}")]
    UninitializedReference { what: String },

    /// Signal handle not found or of the wrong kind.
    #[error("Invalid signal reference: {what}")]
    InvalidReference { what: String },

    /// Derivative index outside `0..=order`.
    #[error("Index out of bounds: {what} (index={index}, len={len})")]
    IndexOob {
        what: &'static str,
        index: usize,
        len: usize,
    },
}

impl From<CoreError> for SignalError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::NonFinite { what, value } | CoreError::InvalidArg { what, value } => {
                SignalError::Configuration { what, value }
            }
            CoreError::IndexOob { what, index, len } => SignalError::IndexOob { what, index, len },
        }
    }
}
