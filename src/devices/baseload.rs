use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::devices::types::{AgentState, BurdenPolicy, DeviceAgent, Proposal};
use crate::error::Result;
use crate::profile::{self, Profile};

/// An inflexible household load.
///
/// `BaseLoad` offers no flexibility: its candidate is always its current
/// profile, so it never reports a positive improvement and is never picked.
///
/// # Examples
///
/// ```
/// use profile_steering::devices::{BaseLoad, DeviceAgent};
///
/// let mut load = BaseLoad::new(vec![1.0, 1.0, 1.0, 1.0]);
/// let baseline = load.init(&[0.0; 4]).unwrap();
/// assert_eq!(baseline, vec![1.0; 4]);
/// assert_eq!(load.plan(&[1.0; 4]).unwrap().improvement, 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct BaseLoad {
    demand_kw: Profile,
    state: AgentState,
}

impl BaseLoad {
    /// Creates a load that consumes exactly `demand_kw`.
    pub fn new(demand_kw: Profile) -> Self {
        Self {
            demand_kw,
            state: AgentState::new(BurdenPolicy::Accumulate),
        }
    }

    /// Samples a load uniformly in `[0, max_kw)` per interval.
    ///
    /// # Arguments
    ///
    /// * `intervals` - Horizon length
    /// * `max_kw` - Upper bound of the per-interval draw (kW)
    /// * `seed` - Random seed for reproducible sampling
    pub fn sampled(intervals: usize, max_kw: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let demand_kw = (0..intervals)
            .map(|_| max_kw * rng.random::<f64>())
            .collect();
        Self::new(demand_kw)
    }
}

impl DeviceAgent for BaseLoad {
    fn init(&mut self, desired: &[f64]) -> Result<Profile> {
        profile::ensure_len(desired.len(), self.demand_kw.len())?;
        self.state.profile = self.demand_kw.clone();
        self.state.freeze_initial();
        Ok(self.state.profile.clone())
    }

    fn plan(&mut self, difference: &[f64]) -> Result<Proposal> {
        let desired = self.state.desired(difference)?;
        let candidate = self.state.profile.clone();
        self.state.propose(candidate, &desired, None)
    }

    fn accept(&mut self) -> Profile {
        self.state.commit()
    }

    fn rerun(&mut self) {
        self.state.reset();
    }

    fn profile(&self) -> &[f64] {
        &self.state.profile
    }

    fn burden(&self) -> f64 {
        self.state.burden
    }

    fn is_active(&self) -> bool {
        false
    }

    fn device_type(&self) -> &'static str {
        "BaseLoad"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampled_load_is_deterministic_and_bounded() {
        let a = BaseLoad::sampled(96, 5.0, 42);
        let b = BaseLoad::sampled(96, 5.0, 42);
        assert_eq!(a.demand_kw, b.demand_kw);
        assert!(a.demand_kw.iter().all(|v| (0.0..5.0).contains(v)));
    }

    #[test]
    fn never_improves() {
        let mut load = BaseLoad::new(vec![1.0, 2.0, 3.0]);
        load.init(&[0.0; 3]).expect("init should succeed");
        let p = load.plan(&[6.0, -2.0, 1.0]).expect("plan should succeed");
        assert_eq!(p.improvement, 0.0);
        assert!(!load.is_active());
    }

    #[test]
    fn horizon_mismatch_fails() {
        let mut load = BaseLoad::new(vec![1.0; 3]);
        assert!(load.init(&[0.0; 4]).is_err());
    }
}
