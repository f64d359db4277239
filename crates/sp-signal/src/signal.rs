//! Signal handles and the differential-state container.

use serde::{Deserialize, Serialize};
use sp_core::Real;

use crate::error::{SignalError, SignalResult};

/// Unique identifier for a signal in a [`SignalBus`](crate::SignalBus).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SignalId(pub u64);

impl SignalId {
    /// Create a new signal ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for SignalId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<SignalId> for u64 {
    fn from(id: SignalId) -> Self {
        id.0
    }
}

/// Highest derivative order a signal may track.
pub const MAX_ORDER: usize = 16;

/// Reject orders above [`MAX_ORDER`].
pub fn check_order(order: usize) -> SignalResult<usize> {
    if order > MAX_ORDER {
        return Err(SignalError::Configuration {
            what: "signal order exceeds the supported maximum",
            value: order as f64,
        });
    }
    Ok(order)
}

/// Reject step sizes that are zero, negative or not finite.
pub fn check_step_size(step_size: Real) -> SignalResult<Real> {
    if step_size.is_finite() && step_size > 0.0 {
        Ok(step_size)
    } else {
        Err(SignalError::Domain {
            what: "step size must be positive and finite",
            value: step_size,
        })
    }
}

/// A value and its first `order` time derivatives at the current simulated time.
///
/// Index `i` of [`values`](Self::values) is the `i`-th derivative. The length
/// is fixed at `order + 1` for the lifetime of the signal.
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    order: usize,
    value: Vec<Real>,
}

impl Signal {
    /// Create a zeroed signal tracking `order` derivatives beyond the value.
    pub fn new(order: usize) -> Self {
        Self {
            order,
            value: vec![0.0; order + 1],
        }
    }

    /// Number of derivatives tracked beyond the 0th.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Current derivative values, index `i` being the `i`-th derivative.
    pub fn values(&self) -> &[Real] {
        &self.value
    }

    /// Read the `i`-th derivative.
    pub fn get(&self, i: usize) -> SignalResult<Real> {
        self.check_index(i, "derivative index")?;
        Ok(self.value[i])
    }

    /// Overwrite the `i`-th derivative without any update bookkeeping.
    ///
    /// Meant for initial conditions only.
    pub fn set_raw(&mut self, i: usize, v: Real) -> SignalResult<()> {
        self.check_index(i, "derivative index")?;
        self.value[i] = v;
        Ok(())
    }

    /// Reset every derivative to zero.
    pub fn clear(&mut self) {
        self.value.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Set derivative `index` to `new_value` and advance the other levels by one
    /// Euler step of size `step_size`.
    ///
    /// Levels above `index` become backward differences of the freshly updated
    /// level below them. Levels below `index` are integrated from the pre-update
    /// state: `new[o] = old[o] + h * old[o + 1]`.
    ///
    /// # Errors
    ///
    /// [`SignalError::Domain`] if `step_size` is not positive and finite,
    /// [`SignalError::IndexOob`] if `index > order`. The state is left untouched
    /// on error.
    pub fn apply_update(
        &mut self,
        new_value: Real,
        index: usize,
        step_size: Real,
    ) -> SignalResult<&[Real]> {
        let h = check_step_size(step_size)?;
        self.check_index(index, "driven index")?;

        let old = &self.value;
        let mut new = vec![0.0; old.len()];
        new[index] = new_value;
        for o in index + 1..new.len() {
            new[o] = (new[o - 1] - old[o - 1]) / h;
        }
        for o in (0..index).rev() {
            new[o] = old[o] + h * old[o + 1];
        }

        self.value = new;
        Ok(&self.value)
    }

    /// Replace the whole value sequence. Length must already match.
    pub(crate) fn overwrite(&mut self, values: &[Real]) {
        debug_assert_eq!(values.len(), self.value.len());
        self.value.copy_from_slice(values);
    }

    pub(crate) fn check_index(&self, i: usize, what: &'static str) -> SignalResult<()> {
        if i > self.order {
            return Err(SignalError::IndexOob {
                what,
                index: i,
                len: self.value.len(),
            });
        }
        Ok(())
    }
}
