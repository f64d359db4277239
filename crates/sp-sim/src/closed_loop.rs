//! Closed-loop run of a Smith predictor against a mismatched process.
//!
//! Signal flow per tick (this is also the step order):
//!
//! ```text
//! command -> feedback error -> smith predictor -> process
//!               ^                                   |
//!               +------- process delayed output ----+
//! ```
//!
//! The feedback error reads the process output from the previous tick, and
//! the process consumes the regulator output computed in this tick.

use sp_controls::{PidParams, Plant, PlantParams, SmithPredictor};
use sp_core::Real;
use sp_project::{ScenarioDef, validate_scenario};
use sp_signal::{Computed, Forced, SignalBus, SignalId};
use tracing::{debug, info, warn};

use crate::command::step_command;
use crate::error::{SimError, SimResult};

/// Options for closed-loop runs.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Fixed time step (seconds)
    pub dt: Real,
    /// Final simulation time (seconds)
    pub t_end: Real,
    /// Maximum number of steps (safety limit)
    pub max_steps: usize,
    /// Record every N-th step (decimation)
    pub record_every: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            dt: 0.01,
            t_end: 10.0,
            max_steps: 1_000_000,
            record_every: 1,
        }
    }
}

impl SimOptions {
    pub fn from_scenario(scenario: &ScenarioDef) -> Self {
        Self {
            dt: scenario.run.dt_s,
            t_end: scenario.run.t_end_s,
            record_every: scenario.run.record_every,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(SimError::InvalidArg {
                what: "dt must be positive and finite",
            });
        }
        if !(self.t_end.is_finite() && self.t_end >= 0.0) {
            return Err(SimError::InvalidArg {
                what: "t_end must be non-negative and finite",
            });
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "max_steps must be positive",
            });
        }
        if self.record_every == 0 {
            return Err(SimError::InvalidArg {
                what: "record_every must be positive",
            });
        }
        Ok(())
    }
}

/// Values of interest at one recorded instant.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LoopSample {
    /// Setpoint including noise.
    pub command: Real,
    /// Process output after its dead time.
    pub measured: Real,
    /// Internal model output, free of dead time.
    pub model_prediction: Real,
    /// Corrected error seen by the regulator.
    pub smith_error: Real,
    /// Command minus measured output.
    pub feedback_error: Real,
    pub regulator_output: Real,
}

/// Record of a closed-loop run.
#[derive(Clone, Debug, Default)]
pub struct SimRecord {
    /// Time points (seconds)
    pub t: Vec<Real>,
    /// Loop snapshots, one per time point
    pub samples: Vec<LoopSample>,
}

impl SimRecord {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }

    pub fn last(&self) -> Option<(Real, &LoopSample)> {
        Some((*self.t.last()?, self.samples.last()?))
    }

    /// Largest measured output over the run.
    pub fn peak_measured(&self) -> Option<Real> {
        self.samples.iter().map(|s| s.measured).reduce(Real::max)
    }
}

/// The assembled loop: every signal on one bus plus the handles the driver
/// needs to step and observe it.
#[derive(Debug)]
pub struct ClosedLoop {
    bus: SignalBus,
    command: SignalId,
    feedback: SignalId,
    smith: SmithPredictor,
    process: Plant,
    elapsed: Real,
}

impl ClosedLoop {
    /// Build and wire the loop described by `scenario`.
    pub fn new(scenario: &ScenarioDef) -> SimResult<Self> {
        validate_scenario(scenario)?;

        let model = PlantParams::new(
            scenario.plant.k0,
            scenario.plant.t0,
            scenario.plant.model_order,
        )?;
        let process_params = model.scaled(
            scenario.process.gain_factor,
            scenario.process.time_constant_factor,
        )?;
        let process_delay = scenario
            .process
            .delay_s
            .unwrap_or(scenario.plant.delay_s);
        let pid = PidParams::new(
            scenario.regulator.k,
            scenario.regulator.effective_ti_s(),
            scenario.regulator.td_s,
        )?;

        let mut bus = SignalBus::new();
        let command = bus.add_forced("command", Forced::new(0, 0, step_command(&scenario.command))?);
        let smith = SmithPredictor::new(&mut bus, "smith", model, pid, scenario.plant.delay_s)?;
        let process = Plant::new(&mut bus, "process", process_params, process_delay)?;
        process.connect_input(&mut bus, smith.output())?;

        let feedback = bus.add_computed(
            "feedback_error",
            Computed::with_inputs(0, 0, &[command, process.delayed_output()], |ctx| {
                ctx.input(0)[0] - ctx.input(1)[0]
            })?,
        )?;
        smith.connect_input(&mut bus, feedback)?;

        debug!(
            scenario = %scenario.name,
            signals = bus.len(),
            process_delay,
            "closed loop assembled"
        );
        Ok(Self {
            bus,
            command,
            feedback,
            smith,
            process,
            elapsed: 0.0,
        })
    }

    pub fn bus(&self) -> &SignalBus {
        &self.bus
    }

    pub fn smith(&self) -> &SmithPredictor {
        &self.smith
    }

    pub fn process(&self) -> &Plant {
        &self.process
    }

    /// Simulated time covered by all ticks so far (seconds).
    pub fn elapsed(&self) -> Real {
        self.elapsed
    }

    /// Advance every signal by one tick.
    pub fn tick(&mut self, step_size: Real) -> SimResult<()> {
        self.bus.step(self.command, step_size)?;
        self.bus.step(self.feedback, step_size)?;
        self.smith.step(&mut self.bus, step_size)?;
        self.process.step(&mut self.bus, step_size)?;
        self.elapsed += step_size;
        Ok(())
    }

    pub fn sample(&self) -> SimResult<LoopSample> {
        Ok(LoopSample {
            command: self.bus.get(self.command, 0)?,
            measured: self.bus.get(self.process.delayed_output(), 0)?,
            model_prediction: self.bus.get(self.smith.model().output(), 0)?,
            smith_error: self.bus.get(self.smith.error(), 0)?,
            feedback_error: self.bus.get(self.feedback, 0)?,
            regulator_output: self.bus.get(self.smith.output(), 0)?,
        })
    }

    /// Run from the current state, recording every `record_every` steps.
    /// The initial and final states are always recorded. Times continue from
    /// [`elapsed`](Self::elapsed), so consecutive runs form one time axis.
    pub fn run(&mut self, opts: &SimOptions) -> SimResult<SimRecord> {
        opts.validate()?;

        let wanted = (opts.t_end / opts.dt).round() as usize;
        let n_steps = wanted.min(opts.max_steps);
        if n_steps < wanted {
            warn!(wanted, max_steps = opts.max_steps, "run truncated by max_steps");
        }

        let mut record = SimRecord::default();
        let start = self.elapsed;
        record.t.push(start);
        record.samples.push(self.sample()?);

        for step in 1..=n_steps {
            self.tick(opts.dt)?;
            if step % opts.record_every == 0 {
                record.t.push(start + step as Real * opts.dt);
                record.samples.push(self.sample()?);
            }
        }

        // Always record final state
        if n_steps % opts.record_every != 0 {
            record.t.push(start + n_steps as Real * opts.dt);
            record.samples.push(self.sample()?);
        }
        // snap to the grid so repeated runs do not accumulate rounding
        self.elapsed = start + n_steps as Real * opts.dt;

        Ok(record)
    }
}

/// Build the loop for `scenario` and run it with the scenario's own options.
pub fn run_closed_loop(scenario: &ScenarioDef) -> SimResult<SimRecord> {
    let opts = SimOptions::from_scenario(scenario);
    let mut closed_loop = ClosedLoop::new(scenario)?;
    let record = closed_loop.run(&opts)?;

    if let Some((t, last)) = record.last() {
        info!(
            scenario = %scenario.name,
            t_end = t,
            measured = last.measured,
            points = record.len(),
            "closed-loop run finished"
        );
    }
    Ok(record)
}
