use std::sync::Arc;

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Deserialize;

use crate::devices::types::{AgentState, BurdenPolicy, DeviceAgent, Proposal};
use crate::error::{Result, SteeringError};
use crate::planner::{BufferRequest, DiscreteRequest, LocalPlanner, feasible_start};
use crate::profile::{self, Profile};
use crate::sim::types::Horizon;

/// How the charger may modulate its power while connected.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum ChargingMode {
    /// Any power in `[0, max_kw]`.
    Continuous { max_kw: f64 },
    /// Only the listed power levels (kW, ascending, starting at 0).
    Discrete { levels_kw: Vec<f64> },
}

impl ChargingMode {
    /// Highest power the mode allows (kW).
    pub fn max_kw(&self) -> f64 {
        match self {
            Self::Continuous { max_kw } => *max_kw,
            Self::Discrete { levels_kw } => levels_kw.last().copied().unwrap_or(0.0),
        }
    }
}

/// Parameter ranges for sampling a charging session.
#[derive(Debug, Clone, Copy)]
pub struct SessionRanges {
    /// Earliest and latest arrival interval (inclusive).
    pub arrival: (usize, usize),
    /// Earliest and latest departure interval (inclusive).
    pub departure: (usize, usize),
    /// Smallest and largest energy request (kWh).
    pub request_kwh: (f64, f64),
}

/// An electric vehicle that may only charge inside its connection window.
///
/// The vehicle arrives at `arrival` and leaves at `departure` (exclusive) and
/// must receive `request_kwh` in between. Outside the window its power is
/// zero.
///
/// # Power Flow Convention
/// Returns **positive** values (consumption / load).
#[derive(Clone)]
pub struct EvCharger {
    /// Battery capacity of the vehicle in kWh.
    pub capacity_kwh: f64,

    /// Energy to deliver while connected (kWh).
    pub request_kwh: f64,

    /// First connected interval.
    pub arrival: usize,

    /// First interval after departure.
    pub departure: usize,

    /// Continuous or discrete power modulation.
    pub mode: ChargingMode,

    dt_hours: f64,
    intervals: usize,
    planner: Arc<dyn LocalPlanner>,
    state: AgentState,
}

impl EvCharger {
    /// Creates a new EV charger session.
    ///
    /// # Errors
    ///
    /// Returns [`SteeringError::Infeasible`] if the window is empty or leaves
    /// the horizon, the request exceeds the vehicle capacity, or the request
    /// cannot be delivered at full power within the window.
    #[expect(clippy::too_many_arguments)]
    pub fn new(
        capacity_kwh: f64,
        request_kwh: f64,
        arrival: usize,
        departure: usize,
        mode: ChargingMode,
        horizon: &Horizon,
        planner: Arc<dyn LocalPlanner>,
        policy: BurdenPolicy,
    ) -> Result<Self> {
        if arrival >= departure || departure > horizon.intervals {
            return Err(SteeringError::infeasible(
                "EvCharger",
                format!(
                    "window [{arrival}, {departure}) must be non-empty and within {} intervals",
                    horizon.intervals
                ),
            ));
        }
        if request_kwh < 0.0 || request_kwh > capacity_kwh {
            return Err(SteeringError::infeasible(
                "EvCharger",
                format!("request {request_kwh:.2} kWh outside [0, {capacity_kwh:.2}] kWh"),
            ));
        }
        if let ChargingMode::Discrete { levels_kw } = &mode {
            if levels_kw.is_empty() || levels_kw.windows(2).any(|w| w[0] >= w[1]) {
                return Err(SteeringError::infeasible(
                    "EvCharger",
                    "discrete levels must be non-empty and strictly ascending",
                ));
            }
        }
        let deliverable = mode.max_kw() * horizon.dt_hours * (departure - arrival) as f64;
        if request_kwh > deliverable + 1e-9 {
            return Err(SteeringError::infeasible(
                "EvCharger",
                format!(
                    "request {request_kwh:.2} kWh exceeds {deliverable:.2} kWh deliverable in window"
                ),
            ));
        }

        Ok(Self {
            capacity_kwh,
            request_kwh,
            arrival,
            departure,
            mode,
            dt_hours: horizon.dt_hours,
            intervals: horizon.intervals,
            planner,
            state: AgentState::new(policy),
        })
    }

    /// Samples a session from `ranges`, shrinking the request to what the
    /// window can deliver so that construction never fails on sampling alone.
    ///
    /// # Errors
    ///
    /// Returns [`SteeringError::Infeasible`] when the ranges themselves are
    /// invalid for the horizon.
    pub fn sampled(
        capacity_kwh: f64,
        mode: ChargingMode,
        ranges: SessionRanges,
        horizon: &Horizon,
        planner: Arc<dyn LocalPlanner>,
        policy: BurdenPolicy,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let arrival = rng.random_range(ranges.arrival.0..=ranges.arrival.1);
        let departure = rng.random_range(ranges.departure.0..=ranges.departure.1);
        let raw_request = rng.random_range(ranges.request_kwh.0..=ranges.request_kwh.1);
        let window = departure.saturating_sub(arrival) as f64;
        let request_kwh = raw_request
            .min(mode.max_kw() * horizon.dt_hours * window)
            .min(capacity_kwh)
            .max(0.0);
        Self::new(
            capacity_kwh,
            request_kwh,
            arrival,
            departure,
            mode,
            horizon,
            planner,
            policy,
        )
    }

    fn window_candidate(&self, desired: &[f64], warm: Option<&[f64]>) -> Result<Profile> {
        let segment = &desired[self.arrival..self.departure];
        let planned = match &self.mode {
            ChargingMode::Continuous { max_kw } => {
                let idle = profile::zeros(segment.len());
                let request = BufferRequest {
                    desired: segment,
                    demand: &idle,
                    capacity_kwh: self.capacity_kwh,
                    initial_soc_kwh: self.capacity_kwh - self.request_kwh,
                    target_soc_kwh: self.capacity_kwh,
                    min_kw: 0.0,
                    max_kw: *max_kw,
                    prices: None,
                    weight: 1.0,
                    dt_hours: self.dt_hours,
                };
                if warm.is_none() {
                    feasible_start(&request)?;
                }
                self.planner.plan_buffer(&request, warm)?
            }
            ChargingMode::Discrete { levels_kw } => {
                self.planner.plan_discrete(&DiscreteRequest {
                    desired: segment,
                    energy_kwh: self.request_kwh,
                    levels_kw,
                    prices: None,
                    weight: 1.0,
                    dt_hours: self.dt_hours,
                })?
            }
        };

        let mut candidate = profile::zeros(desired.len());
        candidate[self.arrival..self.departure].copy_from_slice(&planned);
        Ok(candidate)
    }
}

impl DeviceAgent for EvCharger {
    fn init(&mut self, desired: &[f64]) -> Result<Profile> {
        profile::ensure_len(self.intervals, desired.len())?;
        // Plan once with the target as the deviation and keep the result as baseline.
        self.state.profile = profile::zeros(desired.len());
        self.state.initial.clear();
        self.plan(desired)?;
        self.state.commit();
        self.state.freeze_initial();
        Ok(self.state.profile.clone())
    }

    fn plan(&mut self, difference: &[f64]) -> Result<Proposal> {
        let desired = self.state.desired(difference)?;
        let warm = if self.state.initial.is_empty() {
            None
        } else {
            Some(self.state.profile[self.arrival..self.departure].to_vec())
        };
        let candidate = self.window_candidate(&desired, warm.as_deref())?;
        let scale = (self.request_kwh > 0.0).then_some(self.request_kwh / self.dt_hours);
        self.state.propose(candidate, &desired, scale)
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
        "EvCharger"
    }
}
