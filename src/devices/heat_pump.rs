use std::sync::Arc;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::devices::types::{AgentState, BurdenPolicy, DeviceAgent, Proposal};
use crate::error::{Result, SteeringError};
use crate::planner::{BufferRequest, LocalPlanner, feasible_start};
use crate::profile::{self, Profile};
use crate::sim::types::Horizon;

/// A heat pump coupled to a thermal buffer.
///
/// Heat demand drains the buffer every interval; the heat pump refills it
/// with electric power in `[0, max_kw]` (in electricity-equivalent units).
/// The buffer must end the horizon at its initial state of charge.
#[derive(Clone)]
pub struct HeatPump {
    /// Thermal buffer capacity in kWh (electricity equivalent).
    pub capacity_kwh: f64,

    /// Maximum electric power in kW.
    pub max_kw: f64,

    /// Initial (and final) buffer fill as a fraction (0.0 to 1.0).
    pub soc: f64,

    /// Exogenous heat demand per interval (kW).
    heat_demand_kw: Profile,

    dt_hours: f64,
    planner: Arc<dyn LocalPlanner>,
    state: AgentState,
}

impl HeatPump {
    /// Creates a heat pump for a given heat-demand profile.
    ///
    /// # Errors
    ///
    /// Returns [`SteeringError::Infeasible`] if parameters are out of range or
    /// the demand cannot be met within the power and buffer limits.
    pub fn new(
        capacity_kwh: f64,
        max_kw: f64,
        soc: f64,
        heat_demand_kw: Profile,
        horizon: &Horizon,
        planner: Arc<dyn LocalPlanner>,
        policy: BurdenPolicy,
    ) -> Result<Self> {
        if capacity_kwh <= 0.0 || max_kw <= 0.0 {
            return Err(SteeringError::infeasible(
                "HeatPump",
                "capacity and max power must be > 0",
            ));
        }
        if !(0.0..=1.0).contains(&soc) {
            return Err(SteeringError::infeasible("HeatPump", "soc must be in [0, 1]"));
        }
        profile::ensure_len(horizon.intervals, heat_demand_kw.len())?;

        let hp = Self {
            capacity_kwh,
            max_kw,
            soc,
            heat_demand_kw,
            dt_hours: horizon.dt_hours,
            planner,
            state: AgentState::new(policy),
        };
        let desired = profile::zeros(horizon.intervals);
        feasible_start(&hp.request(&desired)).map_err(|e| match e {
            SteeringError::Infeasible { reason, .. } => SteeringError::infeasible(
                "HeatPump",
                format!("heat demand cannot be served: {reason}"),
            ),
            other => other,
        })?;
        Ok(hp)
    }

    /// Samples heat demand uniformly in `[0, demand_factor * max_kw)`.
    ///
    /// # Errors
    ///
    /// See [`HeatPump::new`].
    #[expect(clippy::too_many_arguments)]
    pub fn sampled(
        capacity_kwh: f64,
        max_kw: f64,
        soc: f64,
        demand_factor: f64,
        horizon: &Horizon,
        planner: Arc<dyn LocalPlanner>,
        policy: BurdenPolicy,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let demand = (0..horizon.intervals)
            .map(|_| max_kw * demand_factor * rng.random::<f64>())
            .collect();
        Self::new(capacity_kwh, max_kw, soc, demand, horizon, planner, policy)
    }

    /// Exogenous heat demand (kW).
    pub fn heat_demand_kw(&self) -> &[f64] {
        &self.heat_demand_kw
    }

    fn request<'a>(&'a self, desired: &'a [f64]) -> BufferRequest<'a> {
        let soc_kwh = self.soc * self.capacity_kwh;
        BufferRequest {
            desired,
            demand: &self.heat_demand_kw,
            capacity_kwh: self.capacity_kwh,
            initial_soc_kwh: soc_kwh,
            target_soc_kwh: soc_kwh,
            min_kw: 0.0,
            max_kw: self.max_kw,
            prices: None,
            weight: 1.0,
            dt_hours: self.dt_hours,
        }
    }
}

impl DeviceAgent for HeatPump {
    fn init(&mut self, desired: &[f64]) -> Result<Profile> {
        profile::ensure_len(self.heat_demand_kw.len(), desired.len())?;
        self.state.profile = profile::zeros(desired.len());
        self.state.initial.clear();
        self.plan(desired)?;
        self.state.commit();
        self.state.freeze_initial();
        Ok(self.state.profile.clone())
    }

    fn plan(&mut self, difference: &[f64]) -> Result<Proposal> {
        let desired = self.state.desired(difference)?;
        let warm = (!self.state.initial.is_empty()).then_some(self.state.profile.as_slice());
        let candidate = self.planner.plan_buffer(&self.request(&desired), warm)?;
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
        "HeatPump"
    }
}
