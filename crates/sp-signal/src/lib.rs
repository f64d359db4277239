//! Differential-state signals advanced by fixed-step Euler updates.
//!
//! A [`Signal`] tracks a value together with a configurable number of its time
//! derivatives. Each step sets exactly one derivative level and the remaining
//! levels are kept consistent with it:
//! - levels above the driven one become backward finite differences
//! - levels below it are integrated with forward Euler from the pre-step state
//!
//! # Update policies
//!
//! - [`Forced`]: the driven level is a function of elapsed time
//! - [`Computed`]: the driven level is a function of the signal's own pre-step
//!   state and of other signals read through declared input slots
//! - [`Delayed`]: a time-shifted view of another signal, rebuilt by linear
//!   interpolation over a minimal history
//!
//! # Ownership and ordering
//!
//! Signals live in a [`SignalBus`] and refer to each other by [`SignalId`].
//! The bus performs no dependency tracking. A computed signal observes whatever
//! state its inputs hold when it is stepped, so composing code must call
//! [`SignalBus::step`] on each signal in a fixed order consistent with its data
//! dependencies, once per tick. Reading a signal that has not been stepped yet
//! this tick yields its previous-tick value.

pub mod bus;
pub mod computed;
pub mod delayed;
pub mod error;
pub mod forced;
pub mod signal;

pub use bus::{SignalBus, SignalNode};
pub use computed::{ComputeContext, Computed};
pub use delayed::Delayed;
pub use error::{SignalError, SignalResult};
pub use forced::Forced;
pub use signal::{MAX_ORDER, Signal, SignalId, check_order, check_step_size};
