//! Common types and traits for steerable devices.

use serde::Deserialize;

use crate::error::Result;
use crate::profile::{self, Profile};

/// Candidate metrics returned by [`DeviceAgent::plan`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proposal {
    /// Reduction in aggregate deviation if this device alone switches to its
    /// candidate: `‖x_m - p_m‖₂ - ‖x̂_m - p_m‖₂`.
    pub improvement: f64,
    /// Personal cost the candidate would impose on the device.
    pub burden: f64,
}

/// How a device folds the burden of an accepted candidate into its total.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurdenPolicy {
    /// Add each accepted candidate's burden to the running total.
    #[default]
    Accumulate,
    /// Replace the total with the latest accepted candidate's burden.
    Replace,
}

impl BurdenPolicy {
    fn apply(self, total: f64, latest: f64) -> f64 {
        match self {
            Self::Accumulate => total + latest,
            Self::Replace => latest,
        }
    }
}

/// A flexible power agent steered by the coordinator.
///
/// Lifecycle: `init` once, then any number of `plan` calls with at most one
/// `accept` after each. A device never learns whether it won a round; only
/// the coordinator decides who commits.
pub trait DeviceAgent: Send {
    /// Establishes the baseline profile for a horizon of `desired.len()`
    /// intervals, stores it as the initial profile and returns it.
    fn init(&mut self, desired: &[f64]) -> Result<Profile>;

    /// Computes and stores a candidate that tracks `current - difference`.
    /// Does not change the committed profile.
    fn plan(&mut self, difference: &[f64]) -> Result<Proposal>;

    /// Commits the stored candidate and returns `candidate - previous`.
    fn accept(&mut self) -> Profile;

    /// Restores the initial profile and clears the accumulated burden.
    fn rerun(&mut self);

    /// Committed profile.
    fn profile(&self) -> &[f64];

    /// Accumulated burden.
    fn burden(&self) -> f64;

    /// Fixed loads are inactive: they never contribute candidates and are
    /// left out of the fairness metric.
    fn is_active(&self) -> bool {
        true
    }

    /// Returns a human-readable type name for the device.
    fn device_type(&self) -> &'static str;
}

/// Profile and burden bookkeeping shared by every device family.
#[derive(Debug, Clone, Default)]
pub struct AgentState {
    pub profile: Profile,
    pub candidate: Profile,
    pub initial: Profile,
    pub candidate_improvement: f64,
    pub candidate_burden: f64,
    pub burden: f64,
    pub policy: BurdenPolicy,
}

impl AgentState {
    pub fn new(policy: BurdenPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Desired device profile `p_m = x_m - d`.
    pub fn desired(&self, difference: &[f64]) -> Result<Profile> {
        profile::sub(&self.profile, difference)
    }

    /// Stores `candidate` and scores it against `desired`.
    ///
    /// `burden_scale` normalizes the L1 distance of the candidate from the
    /// initial profile; pass `None` for devices without a burden notion.
    pub fn propose(
        &mut self,
        candidate: Profile,
        desired: &[f64],
        burden_scale: Option<f64>,
    ) -> Result<Proposal> {
        profile::ensure_len(self.profile.len(), candidate.len())?;
        let before = profile::distance2(&self.profile, desired)?;
        let after = profile::distance2(&candidate, desired)?;
        self.candidate_improvement = before - after;
        self.candidate_burden = match burden_scale {
            Some(scale) if scale > 0.0 && !self.initial.is_empty() => {
                profile::distance1(&candidate, &self.initial)? / scale
            }
            _ => 0.0,
        };
        self.candidate = candidate;
        Ok(Proposal {
            improvement: self.candidate_improvement,
            burden: self.candidate_burden,
        })
    }

    /// Commits the candidate and returns the delta against the old profile.
    pub fn commit(&mut self) -> Profile {
        let delta = self
            .candidate
            .iter()
            .zip(&self.profile)
            .map(|(c, p)| c - p)
            .collect();
        self.profile = self.candidate.clone();
        self.burden = self.policy.apply(self.burden, self.candidate_burden);
        delta
    }

    /// Records the committed profile as the baseline.
    pub fn freeze_initial(&mut self) {
        self.initial = self.profile.clone();
        self.candidate = self.profile.clone();
        self.candidate_improvement = 0.0;
        self.candidate_burden = 0.0;
        self.burden = 0.0;
    }

    pub fn reset(&mut self) {
        self.profile = self.initial.clone();
        self.candidate = self.initial.clone();
        self.candidate_improvement = 0.0;
        self.candidate_burden = 0.0;
        self.burden = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(policy: BurdenPolicy) -> AgentState {
        let mut s = AgentState::new(policy);
        s.profile = vec![0.0; 4];
        s.freeze_initial();
        s
    }

    #[test]
    fn propose_scores_without_committing() {
        let mut s = state(BurdenPolicy::Accumulate);
        let desired = vec![-1.0; 4];
        let p = s
            .propose(vec![-1.0, -1.0, 0.0, 0.0], &desired, Some(2.0))
            .unwrap_or(Proposal {
                improvement: 0.0,
                burden: 0.0,
            });
        // ‖0 - (-1)‖ = 2, ‖candidate - (-1)‖ = √2
        assert!((p.improvement - (2.0 - 2.0_f64.sqrt())).abs() < 1e-12);
        assert!((p.burden - 1.0).abs() < 1e-12);
        assert_eq!(s.profile, vec![0.0; 4]);
    }

    #[test]
    fn commit_returns_delta_and_accumulates() {
        let mut s = state(BurdenPolicy::Accumulate);
        let desired = vec![1.0; 4];
        s.propose(vec![1.0; 4], &desired, Some(4.0)).expect("propose should succeed");
        assert_eq!(s.commit(), vec![1.0; 4]);
        s.propose(vec![2.0; 4], &desired, Some(4.0)).expect("propose should succeed");
        assert_eq!(s.commit(), vec![1.0; 4]);
        assert!((s.burden - 3.0).abs() < 1e-12);
    }

    #[test]
    fn replace_policy_keeps_latest_burden() {
        let mut s = state(BurdenPolicy::Replace);
        let desired = vec![1.0; 4];
        s.propose(vec![1.0; 4], &desired, Some(4.0)).expect("propose should succeed");
        s.commit();
        s.propose(vec![2.0; 4], &desired, Some(4.0)).expect("propose should succeed");
        s.commit();
        assert!((s.burden - 2.0).abs() < 1e-12);
    }

    #[test]
    fn reset_restores_initial() {
        let mut s = state(BurdenPolicy::Accumulate);
        s.propose(vec![3.0; 4], &[3.0; 4], Some(1.0)).expect("propose should succeed");
        s.commit();
        s.reset();
        assert_eq!(s.profile, vec![0.0; 4]);
        assert_eq!(s.burden, 0.0);
    }
}
