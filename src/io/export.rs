//! CSV and JSON export for steering results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::Result;
use crate::runner::SimulationResult;
use crate::sim::kpi::SteeringReport;
use crate::sim::types::{Horizon, Traces};

/// Column header for the per-round trace CSV.
const TRACE_HEADER: &str = "round,improvement,objective,gini,winner";

/// Column header for the per-interval profile CSV.
const PROFILE_HEADER: &str = "interval,time_hr,target_kw,initial_kw,final_kw";

/// Writes per-round traces as CSV to any writer.
///
/// One row per executed round; `winner` is empty for a round without one.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_trace_csv(traces: &Traces, writer: impl Write) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(TRACE_HEADER.split(','))?;

    for round in 0..traces.rounds() {
        wtr.write_record(&[
            round.to_string(),
            format!("{:.6}", traces.improvement[round]),
            format!("{:.6}", traces.objective[round]),
            format!("{:.6}", traces.gini[round]),
            traces.winners[round].map_or_else(String::new, |w| w.to_string()),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Writes target, initial and final aggregate profiles side by side.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_profile_csv(
    horizon: &Horizon,
    target: &[f64],
    initial: &[f64],
    final_profile: &[f64],
    writer: impl Write,
) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(PROFILE_HEADER.split(','))?;

    let rows = target.iter().zip(initial).zip(final_profile).enumerate();
    for (t, ((p, x0), x)) in rows {
        wtr.write_record(&[
            t.to_string(),
            format!("{:.2}", t as f64 * horizon.dt_hours),
            format!("{p:.4}"),
            format!("{x0:.4}"),
            format!("{x:.4}"),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Machine-readable summary of a scenario run.
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    pub intervals: usize,
    pub dt_hours: f64,
    pub reports: Vec<&'a SteeringReport>,
    /// Traces of each run, aligned with `reports`.
    pub traces: Vec<&'a Traces>,
}

impl<'a> RunSummary<'a> {
    pub fn from_result(result: &'a SimulationResult) -> Self {
        Self {
            intervals: result.horizon.intervals,
            dt_hours: result.horizon.dt_hours,
            reports: result.runs.iter().map(|r| &r.report).collect(),
            traces: result.runs.iter().map(|r| &r.outcome.traces).collect(),
        }
    }
}

/// Writes the JSON summary of `result` to any writer.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_summary_json(result: &SimulationResult, writer: impl Write) -> Result<()> {
    serde_json::to_writer_pretty(writer, &RunSummary::from_result(result))?;
    Ok(())
}

/// Exports the trace of the last run to a CSV file at `path`.
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn export_trace_csv(result: &SimulationResult, path: &Path) -> Result<()> {
    let buf = io::BufWriter::new(File::create(path)?);
    match result.runs.last() {
        Some(run) => write_trace_csv(&run.outcome.traces, buf),
        None => write_trace_csv(&Traces::default(), buf),
    }
}

/// Exports target, initial and final profiles of the last run to `path`.
///
/// # Errors
///
/// Returns an error if file creation or writing fails.
pub fn export_profile_csv(result: &SimulationResult, path: &Path) -> Result<()> {
    let buf = io::BufWriter::new(File::create(path)?);
    let final_profile = result
        .runs
        .last()
        .map_or(result.initial.as_slice(), |r| r.outcome.profile.as_slice());
    write_profile_csv(
        &result.horizon,
        &result.target,
        &result.initial,
        final_profile,
        buf,
    )
}

/// Exports the JSON summary of every run to `path`.
///
/// # Errors
///
/// Returns an error if file creation, serialization or writing fails.
pub fn export_summary_json(result: &SimulationResult, path: &Path) -> Result<()> {
    let mut buf = io::BufWriter::new(File::create(path)?);
    write_summary_json(result, &mut buf)?;
    buf.flush()?;
    Ok(())
}
