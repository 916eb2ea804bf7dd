use std::path::PathBuf;

use clap::Parser;

use crate::config::{ConfigError, ScenarioConfig};

#[derive(Debug, Parser)]
#[command(
    name = "profile-steering",
    version,
    about = "Fairness-aware profile steering of flexible household devices"
)]
pub struct CliOptions {
    /// Load scenario from a TOML config file
    #[arg(long, conflicts_with = "preset")]
    pub scenario: Option<PathBuf>,

    /// Use a built-in preset (baseline, small, ev_heavy)
    #[arg(long)]
    pub preset: Option<String>,

    /// Override the master random seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Fairness weight in [0, 1], or -1 for plain maximum improvement.
    /// Repeat to sweep several values over the same population.
    #[arg(long, allow_negative_numbers = true)]
    pub tau: Vec<f64>,

    /// Broadcast planning requests on all cores
    #[arg(long)]
    pub parallel: bool,

    /// Export per-round traces of the last run to CSV
    #[arg(long)]
    pub trace_out: Option<PathBuf>,

    /// Export target, initial and final profiles of the last run to CSV
    #[arg(long)]
    pub profile_out: Option<PathBuf>,

    /// Export the JSON summary of every run
    #[arg(long)]
    pub summary_out: Option<PathBuf>,

    /// Log every steering round
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliOptions {
    /// Resolves the scenario source and applies command-line overrides.
    ///
    /// Falls back to the baseline preset when neither `--scenario` nor
    /// `--preset` is given.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file or preset cannot be loaded.
    pub fn load_config(&self) -> Result<ScenarioConfig, ConfigError> {
        let mut cfg = match (&self.scenario, &self.preset) {
            (Some(path), _) => ScenarioConfig::from_toml_file(path)?,
            (None, Some(name)) => ScenarioConfig::from_preset(name)?,
            (None, None) => ScenarioConfig::baseline(),
        };
        if let Some(seed) = self.seed {
            cfg.simulation.seed = seed;
        }
        if self.parallel {
            cfg.simulation.parallel_plan = true;
        }
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliOptions, clap::Error> {
        CliOptions::try_parse_from(std::iter::once("profile-steering").chain(args.iter().copied()))
    }

    #[test]
    fn supports_preset_and_seed() {
        let opts = parse(&["--preset", "small", "--seed", "9"]).expect("parse should succeed");
        let cfg = opts.load_config().expect("preset should load");
        assert_eq!(cfg.simulation.seed, 9);
        assert_eq!(cfg.simulation.intervals, 24);
    }

    #[test]
    fn repeated_tau_collects_sweep() {
        let opts = parse(&["--tau", "0", "--tau", "-1", "--tau", "0.5"])
            .expect("parse should succeed");
        assert_eq!(opts.tau, vec![0.0, -1.0, 0.5]);
    }

    #[test]
    fn scenario_and_preset_conflict() {
        assert!(parse(&["--scenario", "a.toml", "--preset", "small"]).is_err());
    }

    #[test]
    fn defaults_to_baseline() {
        let opts = parse(&[]).expect("parse should succeed");
        let cfg = opts.load_config().expect("baseline should load");
        assert_eq!(cfg.population.total(), ScenarioConfig::baseline().population.total());
        assert!(!cfg.simulation.parallel_plan);
    }
}
