//! Profile steering entry point: CLI wiring, scenario run and exports.

use std::process;

use clap::Parser;
use tracing::{error, info};

use profile_steering::cli::CliOptions;
use profile_steering::error::Result;
use profile_steering::io::export;
use profile_steering::runner::run_scenario;
use profile_steering::telemetry::init_tracing;

fn run(cli: &CliOptions) -> Result<()> {
    let cfg = cli.load_config()?;
    let result = run_scenario(&cfg, &cli.tau)?;

    for run in &result.runs {
        println!("{}", run.report);
        println!();
    }

    if let Some(path) = &cli.trace_out {
        export::export_trace_csv(&result, path)?;
        info!(path = %path.display(), "trace exported");
    }
    if let Some(path) = &cli.profile_out {
        export::export_profile_csv(&result, path)?;
        info!(path = %path.display(), "profiles exported");
    }
    if let Some(path) = &cli.summary_out {
        export::export_summary_json(&result, path)?;
        info!(path = %path.display(), "summary exported");
    }
    Ok(())
}

fn main() {
    let cli = CliOptions::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        error!("{e}");
        process::exit(1);
    }
}
