//! Headless closed-loop simulation of a Smith-predictor controlled process.
//!
//! Provides:
//! - Loop assembly from a scenario file (`ClosedLoop`)
//! - Fixed-step driver with decimated recording (`run_closed_loop`)
//! - Seeded step command generator
//! - CSV export

pub mod closed_loop;
pub mod command;
pub mod csv;
pub mod error;

pub use closed_loop::{ClosedLoop, LoopSample, SimOptions, SimRecord, run_closed_loop};
pub use command::step_command;
pub use csv::{CSV_HEADER, write_csv};
pub use error::{SimError, SimResult};
