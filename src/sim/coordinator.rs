//! Round-based profile steering coordinator.

use rand::seq::SliceRandom;
use rand::{SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::devices::{DeviceAgent, Proposal};
use crate::error::{Result, SteeringError};
use crate::profile::{self, Profile};

use super::fairness::gini;
use super::types::{SelectionRule, SteeringOutcome, StopReason, Traces};

/// Coordinator settings fixed for the lifetime of a population.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorOptions {
    /// Seed of the tie-break shuffle.
    pub seed: u64,
    /// Broadcast `plan` across devices on the rayon thread pool.
    pub parallel_plan: bool,
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self {
            seed: 42,
            parallel_plan: false,
        }
    }
}

/// Owns the target and aggregate profiles and steers a device population
/// toward the target one committed device per round.
pub struct Coordinator {
    devices: Vec<Box<dyn DeviceAgent>>,
    target: Profile,
    aggregate: Profile,
    options: CoordinatorOptions,
    rng: StdRng,
}

impl Coordinator {
    pub fn new(devices: Vec<Box<dyn DeviceAgent>>, options: CoordinatorOptions) -> Self {
        Self {
            devices,
            target: Vec::new(),
            aggregate: Vec::new(),
            options,
            rng: StdRng::seed_from_u64(options.seed),
        }
    }

    /// Sets the target, asks every device for its baseline in population
    /// order and returns the summed aggregate.
    ///
    /// # Errors
    ///
    /// Propagates device failures, including baselines whose length differs
    /// from `desired`.
    pub fn init(&mut self, desired: &[f64]) -> Result<Profile> {
        self.target = desired.to_vec();
        self.aggregate = profile::zeros(desired.len());
        self.rng = StdRng::seed_from_u64(self.options.seed);
        for device in &mut self.devices {
            let baseline = device.init(desired)?;
            profile::add_assign(&mut self.aggregate, &baseline)?;
        }
        info!(
            devices = self.devices.len(),
            intervals = desired.len(),
            objective = self.objective(),
            "initial planning complete"
        );
        Ok(self.aggregate.clone())
    }

    /// Restores every device to its initial profile with zero burden and
    /// resets the aggregate to `x0` and the shuffle to its seed.
    ///
    /// # Errors
    ///
    /// Returns [`SteeringError::ProfileLength`] if `x0` does not match the
    /// target set by [`Coordinator::init`].
    pub fn rerun(&mut self, x0: &[f64]) -> Result<()> {
        profile::ensure_len(self.target.len(), x0.len())?;
        for device in &mut self.devices {
            device.rerun();
        }
        self.aggregate = x0.to_vec();
        self.rng = StdRng::seed_from_u64(self.options.seed);
        Ok(())
    }

    /// Runs up to `max_iters` steering rounds.
    ///
    /// Each round broadcasts the deviation `x - p`, selects at most one winner
    /// under `rule`, commits it and records improvement, objective and Gini.
    /// Stops early when no device improves or the winning improvement is
    /// below `e_min`.
    ///
    /// # Errors
    ///
    /// Returns [`SteeringError::InvalidParameter`] for a negative `e_min`,
    /// zero `max_iters` or an out-of-range tau, and propagates device
    /// failures.
    pub fn iterative(
        &mut self,
        e_min: f64,
        max_iters: usize,
        rule: SelectionRule,
    ) -> Result<SteeringOutcome> {
        if e_min.is_nan() || e_min < 0.0 {
            return Err(SteeringError::InvalidParameter {
                name: "e_min",
                reason: format!("{e_min} must be >= 0"),
            });
        }
        if max_iters == 0 {
            return Err(SteeringError::InvalidParameter {
                name: "max_iters",
                reason: "must be > 0".into(),
            });
        }
        rule.validate()?;

        info!(%rule, e_min, max_iters, "starting iterative phase");
        let mut traces = Traces::with_capacity(max_iters);
        let mut stop = StopReason::MaxIterations;

        for round in 0..max_iters {
            let difference = profile::sub(&self.aggregate, &self.target)?;
            let proposals = self.plan_all(&difference)?;
            let winner = select_winner(&proposals, rule, &mut self.rng);
            let best_improvement = winner.map_or(0.0, |w| proposals[w].improvement);

            if let Some(w) = winner {
                let delta = self.devices[w].accept();
                profile::add_assign(&mut self.aggregate, &delta)?;
            }

            let objective = self.objective();
            let inequality = gini(&self.active_burdens());
            traces.push(winner, best_improvement, objective, inequality);
            debug!(
                round,
                winner = ?winner,
                device = winner.map_or("-", |w| self.devices[w].device_type()),
                improvement = best_improvement,
                objective,
                gini = inequality,
                "round complete"
            );

            if winner.is_none() {
                stop = StopReason::NoCandidates;
                break;
            }
            if best_improvement < e_min {
                stop = StopReason::Converged;
                break;
            }
        }

        info!(
            rounds = traces.rounds(),
            stop = %stop,
            objective = self.objective(),
            "iterative phase finished"
        );
        Ok(SteeringOutcome {
            profile: self.aggregate.clone(),
            traces,
            stop,
        })
    }

    fn plan_all(&mut self, difference: &[f64]) -> Result<Vec<Proposal>> {
        if self.options.parallel_plan {
            self.devices
                .par_iter_mut()
                .map(|device| device.plan(difference))
                .collect()
        } else {
            self.devices
                .iter_mut()
                .map(|device| device.plan(difference))
                .collect()
        }
    }

    /// `‖x - p‖₂` for the current aggregate.
    pub fn objective(&self) -> f64 {
        profile::distance2(&self.aggregate, &self.target).unwrap_or(f64::NAN)
    }

    /// Burdens of active (non-fixed) devices in population order.
    pub fn active_burdens(&self) -> Vec<f64> {
        self.devices
            .iter()
            .filter(|d| d.is_active())
            .map(|d| d.burden())
            .collect()
    }

    pub fn target(&self) -> &[f64] {
        &self.target
    }

    pub fn aggregate(&self) -> &[f64] {
        &self.aggregate
    }

    pub fn devices(&self) -> &[Box<dyn DeviceAgent>] {
        &self.devices
    }
}

/// Picks the round winner among `proposals` (indexed by population order).
///
/// Only devices with a strictly positive improvement compete. Under
/// [`SelectionRule::Fairness`] the contributing set is shuffled with `rng`
/// first, so the first minimal score after shuffling wins.
pub fn select_winner(
    proposals: &[Proposal],
    rule: SelectionRule,
    rng: &mut StdRng,
) -> Option<usize> {
    match rule {
        SelectionRule::MaxImprovement => {
            let mut best = None;
            let mut best_improvement = 0.0;
            for (i, p) in proposals.iter().enumerate() {
                if p.improvement > best_improvement {
                    best_improvement = p.improvement;
                    best = Some(i);
                }
            }
            best
        }
        SelectionRule::Fairness { tau } => {
            let mut contributing: Vec<usize> = proposals
                .iter()
                .enumerate()
                .filter(|(_, p)| p.improvement > 0.0)
                .map(|(i, _)| i)
                .collect();
            if contributing.is_empty() {
                return None;
            }
            contributing.shuffle(rng);

            let m = contributing.len() as f64;
            let mean_burden = contributing.iter().map(|&i| proposals[i].burden).sum::<f64>() / m;
            let mean_improvement =
                contributing.iter().map(|&i| proposals[i].improvement).sum::<f64>() / m;

            let score = |p: &Proposal| {
                // All-zero burdens leave only the improvement term.
                let norm_burden = if mean_burden > 0.0 {
                    p.burden / mean_burden
                } else {
                    0.0
                };
                let norm_improvement = p.improvement / mean_improvement;
                tau * norm_burden - (1.0 - tau) * norm_improvement
            };

            let mut best: Option<(usize, f64)> = None;
            for &i in &contributing {
                let s = score(&proposals[i]);
                if best.is_none_or(|(_, b)| s < b) {
                    best = Some((i, s));
                }
            }
            best.map(|(i, _)| i)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposal(improvement: f64, burden: f64) -> Proposal {
        Proposal {
            improvement,
            burden,
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn empty_contributing_set_has_no_winner() {
        let proposals = [proposal(0.0, 1.0), proposal(-0.5, 0.0)];
        let rule = SelectionRule::Fairness { tau: 0.5 };
        assert_eq!(select_winner(&proposals, rule, &mut rng()), None);
        assert_eq!(
            select_winner(&proposals, SelectionRule::MaxImprovement, &mut rng()),
            None
        );
    }

    #[test]
    fn tau_zero_picks_max_improvement() {
        let proposals = [
            proposal(1.0, 0.0),
            proposal(3.0, 9.0),
            proposal(0.0, 0.0),
            proposal(2.0, 0.1),
        ];
        let rule = SelectionRule::Fairness { tau: 0.0 };
        for seed in 0..20 {
            let mut r = StdRng::seed_from_u64(seed);
            assert_eq!(select_winner(&proposals, rule, &mut r), Some(1));
        }
    }

    #[test]
    fn tau_one_picks_min_burden_among_improvers() {
        let proposals = [
            proposal(1.0, 0.5),
            proposal(3.0, 9.0),
            proposal(0.0, 0.0),
            proposal(0.1, 0.2),
        ];
        let rule = SelectionRule::Fairness { tau: 1.0 };
        for seed in 0..20 {
            let mut r = StdRng::seed_from_u64(seed);
            assert_eq!(select_winner(&proposals, rule, &mut r), Some(3));
        }
    }

    #[test]
    fn zero_burdens_reduce_to_improvement_ranking() {
        let proposals = [proposal(1.0, 0.0), proposal(2.0, 0.0)];
        let rule = SelectionRule::Fairness { tau: 0.5 };
        assert_eq!(select_winner(&proposals, rule, &mut rng()), Some(1));
    }

    #[test]
    fn max_improvement_keeps_earliest_on_ties() {
        let proposals = [proposal(2.0, 0.0), proposal(2.0, 0.0)];
        assert_eq!(
            select_winner(&proposals, SelectionRule::MaxImprovement, &mut rng()),
            Some(0)
        );
    }

    #[test]
    fn ties_follow_seeded_shuffle() {
        let proposals = vec![proposal(1.0, 1.0); 8];
        let rule = SelectionRule::Fairness { tau: 0.5 };
        let a = select_winner(&proposals, rule, &mut StdRng::seed_from_u64(3));
        let b = select_winner(&proposals, rule, &mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
        assert!(a.is_some());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let mut c = Coordinator::new(Vec::new(), CoordinatorOptions::default());
        c.init(&[0.0; 4]).expect("empty population should init");
        assert!(c.iterative(-1.0, 10, SelectionRule::MaxImprovement).is_err());
        assert!(c.iterative(0.0, 0, SelectionRule::MaxImprovement).is_err());
        assert!(
            c.iterative(0.0, 10, SelectionRule::Fairness { tau: 2.0 })
                .is_err()
        );
    }

    #[test]
    fn rerun_checks_length() {
        let mut c = Coordinator::new(Vec::new(), CoordinatorOptions::default());
        c.init(&[0.0; 4]).expect("empty population should init");
        assert!(c.rerun(&[0.0; 3]).is_err());
        assert!(c.rerun(&[1.0; 4]).is_ok());
        assert_eq!(c.aggregate(), &[1.0; 4]);
    }
}
