//! Scenario validation.
//!
//! Every check reports the dotted path of the offending field so a failed
//! load points straight at the line to fix.

use crate::schema::{CommandDef, PlantDef, ProcessDef, RegulatorDef, RunDef, ScenarioDef};

/// Latest schema version understood by this crate.
pub const LATEST_VERSION: u32 = 1;

/// Highest derivative level a plant may be driven at.
pub const MAX_MODEL_ORDER: usize = 4;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

pub fn validate_scenario(scenario: &ScenarioDef) -> Result<(), ValidationError> {
    if scenario.version == 0 || scenario.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: scenario.version,
        });
    }
    if scenario.name.trim().is_empty() {
        return Err(invalid("name", "\"\"", "must not be empty"));
    }

    validate_plant(&scenario.plant)?;
    validate_regulator(&scenario.regulator)?;
    validate_process(&scenario.process)?;
    validate_command(&scenario.command)?;
    validate_run(&scenario.run)
}

fn validate_plant(plant: &PlantDef) -> Result<(), ValidationError> {
    finite("plant.k0", plant.k0)?;
    positive("plant.t0", plant.t0)?;
    non_negative("plant.delay_s", plant.delay_s)?;
    if plant.model_order > MAX_MODEL_ORDER {
        return Err(invalid(
            "plant.model_order",
            plant.model_order,
            &format!("must be at most {MAX_MODEL_ORDER}"),
        ));
    }
    Ok(())
}

fn validate_regulator(regulator: &RegulatorDef) -> Result<(), ValidationError> {
    finite("regulator.k", regulator.k)?;
    if let Some(ti) = regulator.ti_s {
        // infinity switches the integral term off
        if ti.is_nan() || ti <= 0.0 {
            return Err(invalid("regulator.ti_s", ti, "must be positive"));
        }
    }
    non_negative("regulator.td_s", regulator.td_s)
}

fn validate_process(process: &ProcessDef) -> Result<(), ValidationError> {
    positive("process.gain_factor", process.gain_factor)?;
    positive("process.time_constant_factor", process.time_constant_factor)?;
    if let Some(delay) = process.delay_s {
        non_negative("process.delay_s", delay)?;
    }
    Ok(())
}

fn validate_command(command: &CommandDef) -> Result<(), ValidationError> {
    non_negative("command.step_time_s", command.step_time_s)?;
    finite("command.amplitude", command.amplitude)?;
    non_negative("command.noise_amplitude", command.noise_amplitude)
}

fn validate_run(run: &RunDef) -> Result<(), ValidationError> {
    positive("run.dt_s", run.dt_s)?;
    positive("run.t_end_s", run.t_end_s)?;
    if run.t_end_s < run.dt_s {
        return Err(invalid(
            "run.t_end_s",
            run.t_end_s,
            "must cover at least one step",
        ));
    }
    if run.record_every == 0 {
        return Err(invalid("run.record_every", 0, "must be at least 1"));
    }
    Ok(())
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn finite(field: &str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, value, "must be finite"))
    }
}

fn positive(field: &str, value: f64) -> Result<(), ValidationError> {
    finite(field, value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be positive"))
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), ValidationError> {
    finite(field, value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, value, "must be non-negative"))
    }
}
