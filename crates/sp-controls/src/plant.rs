//! First-order-lag plant with transport delay.
//!
//! The plant integrates `K0 / (T0 s + 1)` at its highest tracked derivative
//! using backward (implicit) Euler:
//!
//! ```text
//! y[n+1] = (y[n] + h * K0 / T0 * u) / (1 + h / T0)
//! ```
//!
//! Lower derivatives follow by forward Euler integration of the pre-step
//! state, so with `model_order = 2` the lag produces an acceleration that is
//! integrated into velocity and position. A delayed view of the output models
//! the dead time between command and measured response.

use serde::{Deserialize, Serialize};
use sp_core::{Real, ensure_finite, ensure_positive};
use sp_signal::{Computed, SignalBus, SignalId};
use tracing::debug;

use crate::error::{ControlError, ControlResult};

/// Highest derivative level the lag may drive.
pub const MAX_MODEL_ORDER: usize = 4;

/// Plant configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantParams {
    /// Static gain.
    pub k0: Real,
    /// Lag time constant (seconds).
    pub t0: Real,
    /// Number of derivatives tracked below the lagged one.
    pub model_order: usize,
}

impl PlantParams {
    /// Create plant parameters.
    ///
    /// # Arguments
    ///
    /// * `k0` - Static gain (finite)
    /// * `t0` - Time constant in seconds (must be positive and finite)
    /// * `model_order` - Derivative level driven by the lag, at most
    ///   [`MAX_MODEL_ORDER`]
    pub fn new(k0: Real, t0: Real, model_order: usize) -> ControlResult<Self> {
        ensure_finite(k0, "k0 must be finite")?;
        ensure_finite(t0, "t0 must be finite")?;
        ensure_positive(t0, "t0 must be positive")?;
        if model_order > MAX_MODEL_ORDER {
            return Err(ControlError::Configuration {
                what: "model_order exceeds the supported maximum",
                value: model_order as f64,
            });
        }
        Ok(Self {
            k0,
            t0,
            model_order,
        })
    }

    /// Same plant with gain and time constant scaled, e.g. to model a
    /// mismatch between a process and its internal model.
    pub fn scaled(&self, gain_factor: Real, time_constant_factor: Real) -> ControlResult<Self> {
        Self::new(
            self.k0 * gain_factor,
            self.t0 * time_constant_factor,
            self.model_order,
        )
    }
}

/// Plant model living on a [`SignalBus`].
///
/// Tick order: [`output`](Self::output), then
/// [`delayed_output`](Self::delayed_output).
#[derive(Debug, Clone, PartialEq)]
pub struct Plant {
    params: PlantParams,
    delay: Real,
    output: SignalId,
    delayed: SignalId,
}

impl Plant {
    /// Input slot of the output signal that carries the command.
    pub const INPUT_SLOT: usize = 0;

    /// Register the plant's signals on `bus`. The input is left unwired.
    pub fn new(
        bus: &mut SignalBus,
        label: &str,
        params: PlantParams,
        delay: Real,
    ) -> ControlResult<Self> {
        let params = PlantParams::new(params.k0, params.t0, params.model_order)?;
        let PlantParams {
            k0,
            t0,
            model_order,
        } = params;

        let lag = Computed::new(model_order, model_order, 1, move |ctx| {
            let h = ctx.step_size();
            let u = ctx.input(Self::INPUT_SLOT)[0];
            (ctx.me()[model_order] + h * k0 / t0 * u) / (1.0 + h / t0)
        })?;
        let output = bus.add_computed(format!("{label}.output"), lag)?;
        let delayed = bus.add_delayed(format!("{label}.output_delayed"), output, delay)?;

        debug!(plant = label, k0, t0, model_order, delay, "plant created");
        Ok(Self {
            params,
            delay,
            output,
            delayed,
        })
    }

    pub fn params(&self) -> &PlantParams {
        &self.params
    }

    /// Current dead time (seconds).
    pub fn delay(&self) -> Real {
        self.delay
    }

    /// Undelayed model output.
    pub fn output(&self) -> SignalId {
        self.output
    }

    /// Output as seen after the dead time.
    pub fn delayed_output(&self) -> SignalId {
        self.delayed
    }

    /// Wire the command signal.
    pub fn connect_input(&self, bus: &mut SignalBus, source: SignalId) -> ControlResult<()> {
        bus.bind_input(self.output, Self::INPUT_SLOT, source)?;
        Ok(())
    }

    /// Reconfigure the dead time.
    ///
    /// The delay line is rebuilt, so previously recorded history is lost and
    /// the delayed output reads zero until the new delay is covered again.
    pub fn set_delay(&mut self, bus: &mut SignalBus, delay: Real) -> ControlResult<()> {
        bus.replace_delayed(self.delayed, delay)?;
        debug!(old = self.delay, new = delay, "plant delay reset");
        self.delay = delay;
        Ok(())
    }

    /// Signals in the order they must be stepped.
    pub fn tick_order(&self) -> [SignalId; 2] {
        [self.output, self.delayed]
    }

    /// Advance the output, then sample it into the delay line.
    pub fn step(&self, bus: &mut SignalBus, step_size: Real) -> ControlResult<()> {
        bus.step_in_order(&self.tick_order(), step_size)
            .map_err(ControlError::from)
    }

    /// Zero the output and restart the delay line.
    pub fn clear(&self, bus: &mut SignalBus) -> ControlResult<()> {
        bus.clear(self.output)?;
        bus.clear(self.delayed)?;
        Ok(())
    }
}
