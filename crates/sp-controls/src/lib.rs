//! Plant model, PID regulator and Smith predictor built on `sp-signal`.
//!
//! # Architecture
//!
//! Every block is a bundle of [`SignalId`](sp_signal::SignalId) handles into a
//! shared [`SignalBus`](sp_signal::SignalBus) plus its validated parameters.
//! Blocks never own each other's signals; wiring is done by binding handles
//! into computed-signal input slots.
//!
//! # Tick order
//!
//! Each block documents the order in which its own signals are stepped, and
//! composing code must step blocks in data-dependency order:
//! - [`Plant`]: output, then its delayed view
//! - [`PidRegulator`]: shaped input, then output
//! - [`SmithPredictor`]: corrected error, then regulator, then internal model
//!
//! The Smith error reads the internal model before the model is stepped, so it
//! sees last tick's prediction. That one-step lag is part of the discrete
//! predictor and is intentional.

pub mod error;
pub mod plant;
pub mod regulator;
pub mod smith;

pub use error::{ControlError, ControlResult};
pub use plant::{MAX_MODEL_ORDER, Plant, PlantParams};
pub use regulator::{PidParams, PidRegulator};
pub use smith::SmithPredictor;
