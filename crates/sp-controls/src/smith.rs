//! Smith predictor for plants with dead time.
//!
//! The predictor runs an internal [`Plant`] model driven by its own
//! [`PidRegulator`]. The regulator does not act on the command directly but on
//! a corrected error:
//!
//! ```text
//! error = command - model_output + model_output_delayed
//! ```
//!
//! Subtracting the undelayed prediction and adding back the delayed one
//! cancels the model's dead time from the loop, so the regulator reacts to a
//! delay-free estimate while the real process still shows its delay.

use sp_core::Real;
use sp_signal::{Computed, SignalBus, SignalId};
use tracing::debug;

use crate::error::ControlResult;
use crate::plant::{Plant, PlantParams};
use crate::regulator::{PidParams, PidRegulator};

/// Smith predictor owning its internal model and regulator.
///
/// Tick order: corrected error, regulator, internal model. The error reads the
/// model before the model is stepped, i.e. last tick's prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct SmithPredictor {
    model: Plant,
    regulator: PidRegulator,
    error: SignalId,
}

impl SmithPredictor {
    /// Error input slot for the externally supplied command.
    pub const COMMAND_SLOT: usize = 0;
    const MODEL_SLOT: usize = 1;
    const MODEL_DELAYED_SLOT: usize = 2;

    /// Build and cross-wire the model, regulator and corrected error.
    ///
    /// The command input is left unwired; see [`connect_input`](Self::connect_input).
    pub fn new(
        bus: &mut SignalBus,
        label: &str,
        model: PlantParams,
        regulator: PidParams,
        delay: Real,
    ) -> ControlResult<Self> {
        let model = Plant::new(bus, &format!("{label}.model"), model, delay)?;
        let regulator = PidRegulator::new(bus, &format!("{label}.regulator"), regulator)?;
        model.connect_input(bus, regulator.output())?;

        let correction = Computed::new(0, 0, 3, |ctx| {
            ctx.input(Self::COMMAND_SLOT)[0] - ctx.input(Self::MODEL_SLOT)[0]
                + ctx.input(Self::MODEL_DELAYED_SLOT)[0]
        })?;
        let error = bus.add_computed(format!("{label}.error"), correction)?;
        bus.bind_input(error, Self::MODEL_SLOT, model.output())?;
        bus.bind_input(error, Self::MODEL_DELAYED_SLOT, model.delayed_output())?;
        regulator.connect_input(bus, error)?;

        debug!(predictor = label, delay, "smith predictor wired");
        Ok(Self {
            model,
            regulator,
            error,
        })
    }

    /// Wire the command (typically setpoint minus measured output).
    pub fn connect_input(&self, bus: &mut SignalBus, command: SignalId) -> ControlResult<()> {
        bus.bind_input(self.error, Self::COMMAND_SLOT, command)?;
        Ok(())
    }

    /// Reconfigure the internal model's dead time, discarding its history.
    pub fn set_delay(&mut self, bus: &mut SignalBus, delay: Real) -> ControlResult<()> {
        self.model.set_delay(bus, delay)
    }

    pub fn model(&self) -> &Plant {
        &self.model
    }

    pub fn regulator(&self) -> &PidRegulator {
        &self.regulator
    }

    /// Corrected error fed to the regulator.
    pub fn error(&self) -> SignalId {
        self.error
    }

    /// Control output (the regulator's output).
    pub fn output(&self) -> SignalId {
        self.regulator.output()
    }

    /// Every owned signal in the order it must be stepped.
    pub fn tick_order(&self) -> Vec<SignalId> {
        let mut order = vec![self.error];
        order.extend(self.regulator.tick_order());
        order.extend(self.model.tick_order());
        order
    }

    /// Advance error, regulator and model, in that order.
    ///
    /// The command must already hold this tick's value.
    pub fn step(&self, bus: &mut SignalBus, step_size: Real) -> ControlResult<()> {
        bus.step(self.error, step_size)?;
        self.regulator.step(bus, step_size)?;
        self.model.step(bus, step_size)
    }

    /// Reset the model and regulator. The error is recomputed on the next step.
    pub fn clear(&self, bus: &mut SignalBus) -> ControlResult<()> {
        self.model.clear(bus)?;
        self.regulator.clear(bus)
    }
}
