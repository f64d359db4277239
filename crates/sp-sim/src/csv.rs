//! CSV export of closed-loop records.

use std::io::Write;

use crate::closed_loop::SimRecord;

pub const CSV_HEADER: &str =
    "time_s,command,measured,model_prediction,smith_error,feedback_error,regulator_output";

/// Write `record` as CSV, one row per time point, header first.
pub fn write_csv<W: Write>(record: &SimRecord, mut out: W) -> std::io::Result<()> {
    writeln!(out, "{CSV_HEADER}")?;
    for (t, s) in record.t.iter().zip(&record.samples) {
        writeln!(
            out,
            "{},{},{},{},{},{},{}",
            t,
            s.command,
            s.measured,
            s.model_prediction,
            s.smith_error,
            s.feedback_error,
            s.regulator_output
        )?;
    }
    out.flush()
}
