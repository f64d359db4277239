//! PID regulator.
//!
//! The regulator shapes its input through an order-2 computed signal driven
//! at index 1 by the raw error. The signal update then yields the running
//! integral at index 0 (Euler from the pre-step state) and the backward
//! difference at index 2. The output applies
//!
//! ```text
//! u = K * (e + integral(e) / Ti + de/dt * Td)
//! ```

use serde::{Deserialize, Serialize};
use sp_core::{Real, ensure_finite, ensure_positive};
use sp_signal::{Computed, SignalBus, SignalId};
use tracing::debug;

use crate::error::{ControlError, ControlResult};

/// PID gains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PidParams {
    /// Proportional gain.
    pub k: Real,
    /// Integral time constant (seconds). `+inf` disables integral action.
    pub ti: Real,
    /// Derivative time constant (seconds).
    pub td: Real,
}

impl PidParams {
    /// Create PID gains.
    ///
    /// # Arguments
    ///
    /// * `k` - Proportional gain (finite)
    /// * `ti` - Integral time constant, positive (infinity allowed)
    /// * `td` - Derivative time constant, finite and non-negative
    pub fn new(k: Real, ti: Real, td: Real) -> ControlResult<Self> {
        ensure_finite(k, "k must be finite")?;
        ensure_positive(ti, "ti must be positive")?;
        ensure_finite(td, "td must be finite")?;
        if td < 0.0 {
            return Err(ControlError::Configuration {
                what: "td must be non-negative",
                value: td,
            });
        }
        Ok(Self { k, ti, td })
    }

    /// Pure proportional action.
    pub fn proportional(k: Real) -> ControlResult<Self> {
        Self::new(k, Real::INFINITY, 0.0)
    }
}

/// PID regulator living on a [`SignalBus`].
///
/// Tick order: [`shaped_input`](Self::shaped_input), then
/// [`output`](Self::output).
#[derive(Debug, Clone, PartialEq)]
pub struct PidRegulator {
    params: PidParams,
    shaped: SignalId,
    output: SignalId,
}

impl PidRegulator {
    /// Input slot of the shaped signal that carries the error.
    pub const INPUT_SLOT: usize = 0;

    /// Register the regulator's signals on `bus`. The input is left unwired.
    pub fn new(bus: &mut SignalBus, label: &str, params: PidParams) -> ControlResult<Self> {
        let params = PidParams::new(params.k, params.ti, params.td)?;
        let PidParams { k, ti, td } = params;

        let shaped = bus.add_computed(
            format!("{label}.shaped_input"),
            Computed::new(2, 1, 1, |ctx| ctx.input(Self::INPUT_SLOT)[0])?,
        )?;
        let law = Computed::with_inputs(0, 0, &[shaped], move |ctx| {
            let e = ctx.input(0);
            k * (e[1] + e[0] / ti + e[2] * td)
        })?;
        let output = bus.add_computed(format!("{label}.output"), law)?;

        debug!(regulator = label, k, ti, td, "pid regulator created");
        Ok(Self {
            params,
            shaped,
            output,
        })
    }

    pub fn params(&self) -> &PidParams {
        &self.params
    }

    /// Error with its running integral (index 0) and derivative (index 2).
    pub fn shaped_input(&self) -> SignalId {
        self.shaped
    }

    /// Control output.
    pub fn output(&self) -> SignalId {
        self.output
    }

    /// Wire the error signal.
    pub fn connect_input(&self, bus: &mut SignalBus, source: SignalId) -> ControlResult<()> {
        bus.bind_input(self.shaped, Self::INPUT_SLOT, source)?;
        Ok(())
    }

    /// Signals in the order they must be stepped.
    pub fn tick_order(&self) -> [SignalId; 2] {
        [self.shaped, self.output]
    }

    pub fn step(&self, bus: &mut SignalBus, step_size: Real) -> ControlResult<()> {
        bus.step_in_order(&self.tick_order(), step_size)?;
        Ok(())
    }

    /// Zero the integral, derivative and output.
    pub fn clear(&self, bus: &mut SignalBus) -> ControlResult<()> {
        bus.clear(self.shaped)?;
        bus.clear(self.output)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sp_signal::Forced;

    fn wired(params: PidParams, error: impl FnMut(Real) -> Real + 'static) -> (SignalBus, SignalId, PidRegulator) {
        let mut bus = SignalBus::new();
        let e = bus.add_forced("e", Forced::new(0, 0, error).unwrap());
        let pid = PidRegulator::new(&mut bus, "pid", params).unwrap();
        pid.connect_input(&mut bus, e).unwrap();
        (bus, e, pid)
    }

    fn tick(bus: &mut SignalBus, e: SignalId, pid: &PidRegulator, h: Real) {
        bus.step(e, h).unwrap();
        pid.step(bus, h).unwrap();
    }

    #[test]
    fn params_validation() {
        assert!(PidParams::new(0.2, 20.0, 14.0).is_ok());
        assert!(PidParams::new(1.0, Real::INFINITY, 0.0).is_ok());
        assert!(matches!(
            PidParams::new(1.0, 0.0, 0.0),
            Err(ControlError::Configuration { .. })
        ));
        assert!(PidParams::new(1.0, -2.0, 0.0).is_err());
        assert!(PidParams::new(1.0, 1.0, -0.5).is_err());
        assert!(PidParams::new(Real::NAN, 1.0, 0.0).is_err());
    }

    #[test]
    fn proportional_only() {
        let (mut bus, e, pid) = wired(PidParams::proportional(1.0).unwrap(), |_| 0.7);
        for _ in 0..5 {
            tick(&mut bus, e, &pid, 0.01);
            assert!((bus.get(pid.output(), 0).unwrap() - 0.7).abs() < 1e-12);
        }
    }

    #[test]
    fn integral_lags_one_step() {
        let (mut bus, e, pid) = wired(PidParams::new(1.0, 1.0, 0.0).unwrap(), |_| 1.0);
        let h = 0.1;
        for n in 1..=10 {
            tick(&mut bus, e, &pid, h);
            let integral = (n - 1) as Real * h;
            assert!((bus.get(pid.shaped_input(), 0).unwrap() - integral).abs() < 1e-12);
            assert!((bus.get(pid.output(), 0).unwrap() - (1.0 + integral)).abs() < 1e-12);
        }
    }

    #[test]
    fn derivative_of_ramp() {
        let (mut bus, e, pid) = wired(PidParams::new(2.0, Real::INFINITY, 0.5).unwrap(), |t| t);
        let h = 0.25;
        for _ in 0..4 {
            tick(&mut bus, e, &pid, h);
        }
        // e = 1.0, de/dt = 1
        assert!((bus.get(pid.shaped_input(), 2).unwrap() - 1.0).abs() < 1e-12);
        assert!((bus.get(pid.output(), 0).unwrap() - 2.0 * (1.0 + 0.5)).abs() < 1e-12);
    }

    #[test]
    fn clear_resets_integral() {
        let (mut bus, e, pid) = wired(PidParams::new(1.0, 1.0, 0.0).unwrap(), |_| 1.0);
        for _ in 0..5 {
            tick(&mut bus, e, &pid, 0.1);
        }
        pid.clear(&mut bus).unwrap();
        assert_eq!(bus.values(pid.shaped_input()).unwrap(), &[0.0, 0.0, 0.0]);
        assert_eq!(bus.get(pid.output(), 0).unwrap(), 0.0);
    }

    #[test]
    fn unwired_regulator_fails() {
        let mut bus = SignalBus::new();
        let pid = PidRegulator::new(&mut bus, "pid", PidParams::new(1.0, 1.0, 1.0).unwrap()).unwrap();
        assert!(pid.step(&mut bus, 0.01).is_err());
    }
}
