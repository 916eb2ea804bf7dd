use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ScenarioConfig;
use crate::error::{Result, SteeringError};
use crate::planner::ExchangePlanner;
use crate::profile::Profile;
use crate::scenario::build_population;
use crate::sim::coordinator::{Coordinator, CoordinatorOptions};
use crate::sim::kpi::SteeringReport;
use crate::sim::types::{Horizon, SelectionRule, SteeringOutcome, StopReason};

/// One iterative phase under a single selection rule.
#[derive(Debug, Clone)]
pub struct RuleRun {
    pub rule: SelectionRule,
    pub outcome: SteeringOutcome,
    pub report: SteeringReport,
}

/// Everything a scenario run produces.
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub horizon: Horizon,
    /// Target profile `p`.
    pub target: Profile,
    /// Aggregate after initial planning, shared by every rule in a sweep.
    pub initial: Profile,
    /// One entry per requested tau, in request order.
    pub runs: Vec<RuleRun>,
}

/// Runs a scenario: builds the population, plans initially, then runs the
/// iterative phase once per tau in `taus`.
///
/// An empty `taus` uses `cfg.simulation.tau`. Every run after the first
/// starts from the same initial aggregate via [`Coordinator::rerun`], so
/// sweeps compare rules on identical populations.
///
/// # Errors
///
/// Returns the first configuration violation, an invalid tau, or any device
/// failure during planning.
pub fn run_scenario(cfg: &ScenarioConfig, taus: &[f64]) -> Result<SimulationResult> {
    let mut errors = cfg.validate();
    if !errors.is_empty() {
        for e in &errors {
            warn!(field = %e.field, message = %e.message, "invalid configuration");
        }
        return Err(SteeringError::Config(errors.swap_remove(0)));
    }

    let rules = if taus.is_empty() {
        vec![SelectionRule::from_tau(cfg.simulation.tau)?]
    } else {
        taus.iter()
            .map(|&tau| SelectionRule::from_tau(tau))
            .collect::<Result<Vec<_>>>()?
    };

    let horizon = Horizon::new(cfg.simulation.intervals);
    let target = cfg.target.resolve(&horizon)?;
    let devices = build_population(cfg, Arc::new(ExchangePlanner::default()))?;
    info!(
        devices = devices.len(),
        intervals = horizon.intervals,
        seed = cfg.simulation.seed,
        "population ready"
    );

    let mut coordinator = Coordinator::new(
        devices,
        CoordinatorOptions {
            seed: cfg.simulation.seed,
            parallel_plan: cfg.simulation.parallel_plan,
        },
    );
    let initial = coordinator.init(&target)?;

    let mut runs = Vec::with_capacity(rules.len());
    for (i, rule) in rules.into_iter().enumerate() {
        if i > 0 {
            coordinator.rerun(&initial)?;
        }
        let outcome =
            coordinator.iterative(cfg.simulation.e_min, cfg.simulation.max_iters, rule)?;
        if outcome.stop == StopReason::NoCandidates {
            warn!(%rule, rounds = outcome.traces.rounds(), "no device could improve the profile");
        }
        let report = SteeringReport::from_outcome(&target, &initial, &outcome, rule);
        runs.push(RuleRun {
            rule,
            outcome,
            report,
        });
    }

    Ok(SimulationResult {
        horizon,
        target,
        initial,
        runs,
    })
}
