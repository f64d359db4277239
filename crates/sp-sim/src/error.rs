//! Error types for closed-loop runs.

use sp_controls::ControlError;
use sp_project::ValidationError;
use sp_signal::SignalError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Invalid scenario: {0}")]
    Scenario(#[from] ValidationError),

    #[error(transparent)]
    Control(#[from] ControlError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SimResult<T> = Result<T, SimError>;

impl From<SignalError> for SimError {
    fn from(e: SignalError) -> Self {
        SimError::Control(ControlError::Signal(e))
    }
}
