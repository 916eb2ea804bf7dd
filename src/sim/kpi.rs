//! Post-hoc KPI computation from a steering run.

use std::fmt;

use serde::Serialize;

use crate::profile;

use super::types::{SelectionRule, SteeringOutcome, StopReason};

/// Aggregate key performance indicators derived from one iterative phase.
///
/// Computed post-hoc from the outcome and its traces to ensure consistency
/// between traces and reported metrics.
#[derive(Debug, Clone, Serialize)]
pub struct SteeringReport {
    /// Tau of the selection rule (`-1` for plain maximum improvement).
    pub tau: f64,
    /// Rounds executed.
    pub rounds: usize,
    pub stop_reason: StopReason,
    /// `‖x - p‖₂` before the first round.
    pub initial_objective: f64,
    /// `‖x - p‖₂` after the last round.
    pub final_objective: f64,
    /// Relative objective reduction (%).
    pub objective_reduction_pct: f64,
    /// Root-mean-square tracking error of the final aggregate (kW).
    pub rmse_tracking_kw: f64,
    /// Highest interval of the final aggregate (kW).
    pub peak_kw: f64,
    /// Peak-to-average ratio of the final aggregate.
    pub peak_to_average: f64,
    /// Sum of winning improvements.
    pub total_improvement: f64,
    /// Gini coefficient of active burdens after the last round.
    pub final_gini: f64,
}

impl SteeringReport {
    /// Computes all KPIs for one run.
    ///
    /// # Arguments
    ///
    /// * `target` - Target profile `p`
    /// * `initial` - Aggregate before the iterative phase
    /// * `outcome` - Result of the iterative phase
    /// * `rule` - Selection rule used for the run
    pub fn from_outcome(
        target: &[f64],
        initial: &[f64],
        outcome: &SteeringOutcome,
        rule: SelectionRule,
    ) -> Self {
        let final_profile = &outcome.profile;
        let traces = &outcome.traces;
        let initial_objective = profile::distance2(initial, target).unwrap_or(0.0);
        let final_objective = traces
            .objective
            .last()
            .copied()
            .unwrap_or(initial_objective);

        let reduction = if initial_objective > 0.0 {
            100.0 * (1.0 - final_objective / initial_objective)
        } else {
            0.0
        };

        let n = final_profile.len().max(1) as f64;
        let peak = final_profile
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let peak = if peak.is_finite() { peak } else { 0.0 };
        let mean = final_profile.iter().sum::<f64>() / n;
        let peak_to_average = if mean > 0.0 { peak / mean } else { 0.0 };

        Self {
            tau: rule.tau(),
            rounds: traces.rounds(),
            stop_reason: outcome.stop,
            initial_objective,
            final_objective,
            objective_reduction_pct: reduction,
            rmse_tracking_kw: final_objective / n.sqrt(),
            peak_kw: peak,
            peak_to_average,
            total_improvement: traces.improvement.iter().sum(),
            final_gini: traces.gini.last().copied().unwrap_or(0.0),
        }
    }
}

impl fmt::Display for SteeringReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Steering Report (tau={:.2}) ---", self.tau)?;
        writeln!(
            f,
            "Rounds executed:       {} ({})",
            self.rounds, self.stop_reason
        )?;
        writeln!(f, "Initial objective:     {:.3} kW", self.initial_objective)?;
        writeln!(f, "Final objective:       {:.3} kW", self.final_objective)?;
        writeln!(f, "Objective reduction:   {:.1}%", self.objective_reduction_pct)?;
        writeln!(f, "RMSE tracking error:   {:.3} kW", self.rmse_tracking_kw)?;
        writeln!(
            f,
            "Peak aggregate:        {:.2} kW (PAR {:.2})",
            self.peak_kw, self.peak_to_average
        )?;
        write!(f, "Final Gini:            {:.3}", self.final_gini)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::types::Traces;

    fn outcome(profile: Vec<f64>, objectives: &[f64]) -> SteeringOutcome {
        let mut traces = Traces::default();
        for (i, o) in objectives.iter().enumerate() {
            traces.push(Some(i), 0.5, *o, 0.25);
        }
        SteeringOutcome {
            profile,
            traces,
            stop: StopReason::Converged,
        }
    }

    #[test]
    fn reduction_and_rmse() {
        let target = vec![0.0; 4];
        let initial = vec![1.0; 4];
        let out = outcome(vec![0.5; 4], &[1.5, 1.0]);
        let r = SteeringReport::from_outcome(&target, &initial, &out, SelectionRule::MaxImprovement);
        assert_eq!(r.rounds, 2);
        assert!((r.initial_objective - 2.0).abs() < 1e-12);
        assert!((r.objective_reduction_pct - 50.0).abs() < 1e-9);
        assert!((r.rmse_tracking_kw - 0.5).abs() < 1e-12);
        assert!((r.total_improvement - 1.0).abs() < 1e-12);
        assert_eq!(r.final_gini, 0.25);
        assert_eq!(r.tau, -1.0);
    }

    #[test]
    fn peak_to_average() {
        let target = vec![0.0; 4];
        let out = outcome(vec![1.0, 1.0, 1.0, 5.0], &[]);
        let r = SteeringReport::from_outcome(&target, &target, &out, SelectionRule::Fairness { tau: 0.5 });
        assert_eq!(r.peak_kw, 5.0);
        assert!((r.peak_to_average - 2.5).abs() < 1e-12);
        assert_eq!(r.rounds, 0);
    }

    #[test]
    fn display_does_not_panic() {
        let out = outcome(vec![0.0; 2], &[0.0]);
        let r = SteeringReport::from_outcome(&[0.0; 2], &[0.0; 2], &out, SelectionRule::MaxImprovement);
        assert!(format!("{r}").contains("RMSE tracking error:"));
    }
}
