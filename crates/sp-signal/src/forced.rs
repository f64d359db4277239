//! Signals driven by a function of elapsed time.

use std::fmt;

use sp_core::Real;

use crate::error::{SignalError, SignalResult};
use crate::signal::{Signal, check_order, check_step_size};

/// Time-to-value function supplying the driven derivative.
pub type DriveFn = Box<dyn FnMut(Real) -> Real>;

/// A signal whose `driven_index`-th derivative is `drive(t)`.
///
/// `t` starts at zero and is advanced by the step size *before* each
/// evaluation, so the first step samples `drive(h)`.
pub struct Forced {
    signal: Signal,
    drive: DriveFn,
    driven_index: usize,
    elapsed: Real,
}

impl Forced {
    /// Create a forced signal of the given order.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Configuration`] if `order > MAX_ORDER` or
    /// `driven_index > order`.
    pub fn new(
        order: usize,
        driven_index: usize,
        drive: impl FnMut(Real) -> Real + 'static,
    ) -> SignalResult<Self> {
        let order = check_order(order)?;
        if driven_index > order {
            return Err(SignalError::Configuration {
                what: "driven index must not exceed order",
                value: driven_index as f64,
            });
        }
        Ok(Self {
            signal: Signal::new(order),
            drive: Box::new(drive),
            driven_index,
            elapsed: 0.0,
        })
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }

    pub fn signal_mut(&mut self) -> &mut Signal {
        &mut self.signal
    }

    pub fn driven_index(&self) -> usize {
        self.driven_index
    }

    /// Time accumulated over all successful steps.
    pub fn elapsed(&self) -> Real {
        self.elapsed
    }

    /// Advance the clock by `step_size`, sample the drive function and update.
    pub fn step(&mut self, step_size: Real) -> SignalResult<&[Real]> {
        let h = check_step_size(step_size)?;
        self.elapsed += h;
        let value = (self.drive)(self.elapsed);
        self.signal.apply_update(value, self.driven_index, h)
    }

    /// Zero the state. The clock keeps running.
    pub fn clear(&mut self) {
        self.signal.clear();
    }
}

impl fmt::Debug for Forced {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Forced")
            .field("signal", &self.signal)
            .field("driven_index", &self.driven_index)
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}
