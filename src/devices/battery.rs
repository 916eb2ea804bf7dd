use std::sync::Arc;

use crate::devices::types::{AgentState, BurdenPolicy, DeviceAgent, Proposal};
use crate::error::{Result, SteeringError};
use crate::planner::{BufferRequest, LocalPlanner, feasible_start};
use crate::profile::{self, Profile};
use crate::sim::types::Horizon;

/// A bidirectional battery energy storage system.
///
/// The battery starts from an all-zero plan and must end every horizon at its
/// initial state of charge.
///
/// # Power Flow Convention
/// - Positive power: charging (load on the aggregate)
/// - Negative power: discharging (generation on the aggregate)
#[derive(Clone)]
pub struct Battery {
    /// Battery capacity in kilowatt-hours.
    pub capacity_kwh: f64,

    /// Initial (and final) state of charge as a fraction (0.0 to 1.0).
    pub soc: f64,

    /// Maximum charge power in kilowatts (positive value).
    pub max_charge_kw: f64,

    /// Maximum discharge power in kilowatts (positive value).
    pub max_discharge_kw: f64,

    /// Duration of one interval in hours.
    dt_hours: f64,

    /// Number of intervals the battery was built for.
    intervals: usize,

    planner: Arc<dyn LocalPlanner>,
    state: AgentState,
}

impl Battery {
    /// Creates a new battery with the specified parameters.
    ///
    /// # Arguments
    ///
    /// * `capacity_kwh` - Battery capacity in kWh (must be > 0)
    /// * `soc` - Initial state of charge as a fraction (0.0 to 1.0)
    /// * `max_charge_kw` - Maximum charging power in kW
    /// * `max_discharge_kw` - Maximum discharging power in kW
    /// * `horizon` - Planning horizon for timing
    /// * `planner` - Local optimizer
    /// * `policy` - Burden accounting policy
    ///
    /// # Errors
    ///
    /// Returns [`SteeringError::Infeasible`] if capacity is not positive, SOC
    /// is out of range, or a power limit is negative.
    pub fn new(
        capacity_kwh: f64,
        soc: f64,
        max_charge_kw: f64,
        max_discharge_kw: f64,
        horizon: &Horizon,
        planner: Arc<dyn LocalPlanner>,
        policy: BurdenPolicy,
    ) -> Result<Self> {
        if capacity_kwh <= 0.0 {
            return Err(SteeringError::infeasible("Battery", "capacity must be > 0"));
        }
        if !(0.0..=1.0).contains(&soc) {
            return Err(SteeringError::infeasible("Battery", "soc must be in [0, 1]"));
        }
        if max_charge_kw < 0.0 || max_discharge_kw < 0.0 {
            return Err(SteeringError::infeasible(
                "Battery",
                "power limits must be >= 0",
            ));
        }

        Ok(Self {
            capacity_kwh,
            soc,
            max_charge_kw,
            max_discharge_kw,
            dt_hours: horizon.dt_hours,
            intervals: horizon.intervals,
            planner,
            state: AgentState::new(policy),
        })
    }

    fn request<'a>(&self, desired: &'a [f64], demand: &'a [f64]) -> BufferRequest<'a> {
        let soc_kwh = self.soc * self.capacity_kwh;
        BufferRequest {
            desired,
            demand,
            capacity_kwh: self.capacity_kwh,
            initial_soc_kwh: soc_kwh,
            target_soc_kwh: soc_kwh,
            min_kw: -self.max_discharge_kw,
            max_kw: self.max_charge_kw,
            prices: None,
            weight: 1.0,
            dt_hours: self.dt_hours,
        }
    }
}

impl DeviceAgent for Battery {
    fn init(&mut self, desired: &[f64]) -> Result<Profile> {
        profile::ensure_len(self.intervals, desired.len())?;
        // Nothing is known about the rest of the population yet: idle.
        let idle = profile::zeros(desired.len());
        feasible_start(&self.request(desired, &idle))?;
        self.state.profile = idle;
        self.state.freeze_initial();
        Ok(self.state.profile.clone())
    }

    fn plan(&mut self, difference: &[f64]) -> Result<Proposal> {
        let desired = self.state.desired(difference)?;
        let demand = profile::zeros(desired.len());
        let candidate = self
            .planner
            .plan_buffer(&self.request(&desired, &demand), Some(self.state.profile.as_slice()))?;
        self.state
            .propose(candidate, &desired, Some(self.capacity_kwh / self.dt_hours))
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
        "Battery"
    }
}
