//! Scenario schema definitions.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScenarioDef {
    pub version: u32,
    pub name: String,
    pub plant: PlantDef,
    pub regulator: RegulatorDef,
    #[serde(default)]
    pub process: ProcessDef,
    pub command: CommandDef,
    pub run: RunDef,
}

/// Internal model of the Smith predictor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlantDef {
    pub k0: f64,
    pub t0: f64,
    pub model_order: usize,
    pub delay_s: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegulatorDef {
    pub k: f64,
    /// Integral time. Omitted means no integral action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ti_s: Option<f64>,
    #[serde(default)]
    pub td_s: f64,
}

impl RegulatorDef {
    /// Integral time with "no integral action" mapped to infinity.
    pub fn effective_ti_s(&self) -> f64 {
        self.ti_s.unwrap_or(f64::INFINITY)
    }
}

/// The "real" process, described relative to the internal model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessDef {
    #[serde(default = "unit_factor")]
    pub gain_factor: f64,
    #[serde(default = "unit_factor")]
    pub time_constant_factor: f64,
    /// Dead time of the process. Defaults to the model's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_s: Option<f64>,
}

impl Default for ProcessDef {
    fn default() -> Self {
        Self {
            gain_factor: 1.0,
            time_constant_factor: 1.0,
            delay_s: None,
        }
    }
}

fn unit_factor() -> f64 {
    1.0
}

/// Step command with optional uniform noise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommandDef {
    pub step_time_s: f64,
    pub amplitude: f64,
    #[serde(default)]
    pub noise_amplitude: f64,
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunDef {
    pub dt_s: f64,
    pub t_end_s: f64,
    #[serde(default = "every_step")]
    pub record_every: usize,
}

fn every_step() -> usize {
    1
}
