//! Signals driven by a function of their own state and of other signals.

use std::fmt;

use sp_core::Real;

use crate::error::{SignalError, SignalResult};
use crate::signal::{Signal, SignalId, check_order, check_step_size};

/// Update rule for a computed signal.
pub type ComputeFn = Box<dyn Fn(&ComputeContext<'_>) -> Real>;

/// Everything a compute function may read during one step.
#[derive(Debug, Clone, Copy)]
pub struct ComputeContext<'a> {
    me: &'a [Real],
    inputs: &'a [&'a [Real]],
    step_size: Real,
}

impl<'a> ComputeContext<'a> {
    pub fn new(me: &'a [Real], inputs: &'a [&'a [Real]], step_size: Real) -> Self {
        Self {
            me,
            inputs,
            step_size,
        }
    }

    /// Pre-step value sequence of the signal being computed.
    pub fn me(&self) -> &'a [Real] {
        self.me
    }

    /// Value sequence of the input wired to `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` was not declared when the signal was created.
    pub fn input(&self, slot: usize) -> &'a [Real] {
        self.inputs[slot]
    }

    pub fn step_size(&self) -> Real {
        self.step_size
    }
}

/// A signal whose `driven_index`-th derivative is produced by a compute
/// function each step.
///
/// The function sees the signal's pre-step state plus the current state of
/// every declared input. Inputs are read as they are at call time; nothing
/// here checks that they were already stepped this tick.
pub struct Computed {
    signal: Signal,
    compute: ComputeFn,
    driven_index: usize,
    inputs: Vec<Option<SignalId>>,
}

impl Computed {
    /// Create a computed signal with `input_slots` unbound inputs.
    ///
    /// # Errors
    ///
    /// Returns [`SignalError::Configuration`] if `order > MAX_ORDER` or
    /// `driven_index > order`.
    pub fn new(
        order: usize,
        driven_index: usize,
        input_slots: usize,
        compute: impl Fn(&ComputeContext<'_>) -> Real + 'static,
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
            compute: Box::new(compute),
            driven_index,
            inputs: vec![None; input_slots],
        })
    }

    /// Create a computed signal with its inputs already bound, in slot order.
    pub fn with_inputs(
        order: usize,
        driven_index: usize,
        inputs: &[SignalId],
        compute: impl Fn(&ComputeContext<'_>) -> Real + 'static,
    ) -> SignalResult<Self> {
        let mut computed = Self::new(order, driven_index, inputs.len(), compute)?;
        for (slot, id) in inputs.iter().enumerate() {
            computed.inputs[slot] = Some(*id);
        }
        Ok(computed)
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

    /// Declared input slots; `None` means not wired yet.
    pub fn inputs(&self) -> &[Option<SignalId>] {
        &self.inputs
    }

    /// Wire `source` into `slot`, replacing any previous binding.
    pub fn bind_input(&mut self, slot: usize, source: SignalId) -> SignalResult<()> {
        let len = self.inputs.len();
        let entry = self.inputs.get_mut(slot).ok_or(SignalError::IndexOob {
            what: "input slot",
            index: slot,
            len,
        })?;
        *entry = Some(source);
        Ok(())
    }

    /// Evaluate the compute function without touching the state.
    ///
    /// `inputs` must hold one value sequence per declared slot.
    pub fn evaluate(&self, inputs: &[&[Real]], step_size: Real) -> SignalResult<Real> {
        let h = check_step_size(step_size)?;
        if inputs.len() != self.inputs.len() {
            return Err(SignalError::InvalidReference {
                what: format!(
                    "expected {} input sequences, got {}",
                    self.inputs.len(),
                    inputs.len()
                ),
            });
        }
        let ctx = ComputeContext::new(self.signal.values(), inputs, h);
        Ok((self.compute)(&ctx))
    }

    /// Store a previously evaluated value at the driven index.
    pub fn commit(&mut self, value: Real, step_size: Real) -> SignalResult<&[Real]> {
        self.signal.apply_update(value, self.driven_index, step_size)
    }

    /// Evaluate then commit, for signals used outside a bus.
    pub fn step_with(&mut self, inputs: &[&[Real]], step_size: Real) -> SignalResult<&[Real]> {
        let value = self.evaluate(inputs, step_size)?;
        self.commit(value, step_size)
    }

    pub fn clear(&mut self) {
        self.signal.clear();
    }
}

impl fmt::Debug for Computed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("signal", &self.signal)
            .field("driven_index", &self.driven_index)
            .field("inputs", &self.inputs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sp_core::{Tolerances, nearly_equal};

    #[test]
    fn constant_second_derivative() {
        let mut a = Computed::new(2, 2, 0, |_| -0.1).unwrap();
        a.signal_mut().set_raw(0, 0.2).unwrap();
        a.signal_mut().set_raw(1, 0.3).unwrap();

        let h = 0.01;
        for _ in 0..100 {
            a.step_with(&[], h).unwrap();
        }

        // velocity lags one step behind the continuous solution
        let tol = Tolerances {
            abs: 1e-9,
            rel: 1e-9,
        };
        assert!(nearly_equal(a.signal().get(1).unwrap(), 0.3 - 0.1 * 0.99, tol));
        assert!(a.signal().get(0).unwrap() > 0.2);
    }

    #[test]
    fn reads_own_pre_step_state() {
        // x <- x + 1 each step
        let mut c = Computed::new(0, 0, 0, |ctx| ctx.me()[0] + 1.0).unwrap();
        for _ in 0..3 {
            c.step_with(&[], 0.1).unwrap();
        }
        assert_eq!(c.signal().get(0).unwrap(), 3.0);
    }

    #[test]
    fn reads_inputs_in_slot_order() {
        let mut diff = Computed::new(0, 0, 2, |ctx| ctx.input(0)[0] - ctx.input(1)[0]).unwrap();
        let a = [5.0];
        let b = [2.0, 9.0];
        diff.step_with(&[&a[..], &b[..]], 0.1).unwrap();
        assert_eq!(diff.signal().get(0).unwrap(), 3.0);
    }

    #[test]
    fn step_size_is_exposed() {
        let mut c = Computed::new(0, 0, 0, |ctx| ctx.step_size()).unwrap();
        c.step_with(&[], 0.02).unwrap();
        assert_eq!(c.signal().get(0).unwrap(), 0.02);
    }

    #[test]
    fn binding_inputs() {
        let mut c = Computed::new(0, 0, 2, |_| 0.0).unwrap();
        assert_eq!(c.inputs(), &[None, None]);

        c.bind_input(1, SignalId::new(7)).unwrap();
        assert_eq!(c.inputs(), &[None, Some(SignalId::new(7))]);
        assert!(matches!(
            c.bind_input(2, SignalId::new(1)),
            Err(SignalError::IndexOob { index: 2, .. })
        ));

        let pre = Computed::with_inputs(0, 0, &[SignalId::new(3)], |_| 0.0).unwrap();
        assert_eq!(pre.inputs(), &[Some(SignalId::new(3))]);
    }

    #[test]
    fn evaluate_checks_arity_and_step() {
        let c = Computed::new(0, 0, 1, |_| 0.0).unwrap();
        assert!(matches!(
            c.evaluate(&[], 0.1),
            Err(SignalError::InvalidReference { .. })
        ));
        assert!(matches!(
            c.evaluate(&[&[0.0][..]], 0.0),
            Err(SignalError::Domain { .. })
        ));
    }

    #[test]
    fn rejects_driven_index_above_order() {
        assert!(Computed::new(1, 2, 0, |_| 0.0).is_err());
    }

    #[test]
    fn rejects_unusable_order() {
        assert!(matches!(
            Computed::new(usize::MAX, usize::MAX, 0, |_| 0.0),
            Err(SignalError::Configuration { .. })
        ));
        assert!(Computed::new(crate::MAX_ORDER, 0, 0, |_| 0.0).is_ok());
    }
}
