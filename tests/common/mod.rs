//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use profile_steering::config::ScenarioConfig;
use profile_steering::devices::{AgentState, BaseLoad, BurdenPolicy, DeviceAgent, Proposal};
use profile_steering::error::Result;
use profile_steering::planner::{ExchangePlanner, LocalPlanner};
use profile_steering::profile::Profile;
use profile_steering::scenario::build_population;
use profile_steering::sim::coordinator::{Coordinator, CoordinatorOptions};

/// A buffer that can take any power in `[-limit_kw, limit_kw]` per interval
/// with no energy constraint. Starts idle.
pub struct ClampDevice {
    limit_kw: f64,
    state: AgentState,
}

impl ClampDevice {
    pub fn new(limit_kw: f64) -> Self {
        Self {
            limit_kw,
            state: AgentState::new(BurdenPolicy::Accumulate),
        }
    }
}

impl DeviceAgent for ClampDevice {
    fn init(&mut self, desired: &[f64]) -> Result<Profile> {
        self.state.profile = vec![0.0; desired.len()];
        self.state.freeze_initial();
        Ok(self.state.profile.clone())
    }

    fn plan(&mut self, difference: &[f64]) -> Result<Proposal> {
        let desired = self.state.desired(difference)?;
        let candidate = desired
            .iter()
            .map(|v| v.clamp(-self.limit_kw, self.limit_kw))
            .collect();
        self.state.propose(candidate, &desired, Some(self.limit_kw))
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

    fn device_type(&self) -> &'static str {
        "ClampDevice"
    }
}

/// Four-interval scenario: a `[1, 1, 1, 1]` fixed load next to one ±1 kW
/// clamp device.
pub fn four_interval_coordinator() -> Coordinator {
    let devices: Vec<Box<dyn DeviceAgent>> = vec![
        Box::new(BaseLoad::new(vec![1.0; 4])),
        Box::new(ClampDevice::new(1.0)),
    ];
    Coordinator::new(devices, CoordinatorOptions::default())
}

/// Shared default planner.
pub fn planner() -> Arc<dyn LocalPlanner> {
    Arc::new(ExchangePlanner::default())
}

/// Small preset population behind a coordinator.
pub fn small_coordinator(parallel_plan: bool) -> (Coordinator, ScenarioConfig) {
    let cfg = ScenarioConfig::small();
    let devices = build_population(&cfg, planner()).expect("small preset should build");
    let options = CoordinatorOptions {
        seed: cfg.simulation.seed,
        parallel_plan,
    };
    (Coordinator::new(devices, options), cfg)
}

/// Sum of committed device profiles.
pub fn summed_profiles(coordinator: &Coordinator) -> Vec<f64> {
    let mut sum = vec![0.0; coordinator.target().len()];
    for device in coordinator.devices() {
        for (s, v) in sum.iter_mut().zip(device.profile()) {
            *s += v;
        }
    }
    sum
}

/// Asserts element-wise closeness.
pub fn assert_close(a: &[f64], b: &[f64], tol: f64) {
    assert_eq!(a.len(), b.len(), "length mismatch");
    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        assert!((x - y).abs() <= tol, "index {i}: {x} vs {y}");
    }
}
