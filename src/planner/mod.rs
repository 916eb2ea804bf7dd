//! Device-local optimization oracle.
//!
//! The coordinator never looks inside a planner: each device hands its own
//! constraints and a desired profile segment to a [`LocalPlanner`] and gets a
//! feasible profile back. [`ExchangePlanner`] is the default solver.

/// Continuous storage planning.
pub mod buffer;
/// Discrete power-level planning.
pub mod discrete;

use crate::error::{Result, SteeringError};
use crate::profile::{Profile, ensure_len};

pub use buffer::feasible_start;

/// Continuous buffer planning problem over one profile segment.
///
/// State of charge evolves as `soc_t = soc_0 + dt * Σ_{s≤t} (x_s - demand_s)`
/// and must stay within `[0, capacity_kwh]`, ending at `target_soc_kwh`.
/// The planner minimizes `weight * Σ (x_t - desired_t)² + Σ price_t * x_t`.
#[derive(Debug, Clone, Copy)]
pub struct BufferRequest<'a> {
    /// Profile the device would ideally follow (kW).
    pub desired: &'a [f64],
    /// Exogenous drain on the buffer per interval (kW), e.g. heat demand.
    pub demand: &'a [f64],
    pub capacity_kwh: f64,
    pub initial_soc_kwh: f64,
    pub target_soc_kwh: f64,
    /// Lowest allowed power (kW, negative means discharge).
    pub min_kw: f64,
    /// Highest allowed power (kW).
    pub max_kw: f64,
    /// Optional per-interval price weighting.
    pub prices: Option<&'a [f64]>,
    /// Weight of the tracking term (must be > 0).
    pub weight: f64,
    /// Interval length in hours.
    pub dt_hours: f64,
}

impl BufferRequest<'_> {
    /// Checks segment lengths and scalar bounds.
    pub fn validate(&self) -> Result<()> {
        let n = self.desired.len();
        ensure_len(n, self.demand.len())?;
        if let Some(prices) = self.prices {
            ensure_len(n, prices.len())?;
        }
        if self.min_kw > self.max_kw {
            return Err(SteeringError::InvalidParameter {
                name: "min_kw",
                reason: format!("{} exceeds max_kw {}", self.min_kw, self.max_kw),
            });
        }
        if self.capacity_kwh < 0.0 || self.weight <= 0.0 || self.dt_hours <= 0.0 {
            return Err(SteeringError::InvalidParameter {
                name: "buffer",
                reason: "capacity must be >= 0, weight and dt_hours > 0".into(),
            });
        }
        Ok(())
    }

    pub(crate) fn price(&self, t: usize) -> f64 {
        self.prices.map_or(0.0, |p| p[t])
    }
}

/// Discrete-level charging problem: meet `energy_kwh` using only the given
/// power levels while tracking `desired`.
#[derive(Debug, Clone, Copy)]
pub struct DiscreteRequest<'a> {
    pub desired: &'a [f64],
    /// Energy that must be delivered over the segment (kWh).
    pub energy_kwh: f64,
    /// Allowed power levels (kW), ascending.
    pub levels_kw: &'a [f64],
    pub prices: Option<&'a [f64]>,
    pub weight: f64,
    pub dt_hours: f64,
}

impl DiscreteRequest<'_> {
    pub(crate) fn price(&self, t: usize) -> f64 {
        self.prices.map_or(0.0, |p| p[t])
    }
}

/// A solver that turns a desired profile into a feasible one.
///
/// Implementations must be deterministic and free of I/O so that plan calls
/// can run in parallel across devices.
pub trait LocalPlanner: Send + Sync {
    /// Solves a continuous buffer problem. `warm_start`, when given, is a
    /// feasible profile the solver may improve on.
    fn plan_buffer(&self, request: &BufferRequest<'_>, warm_start: Option<&[f64]>)
    -> Result<Profile>;

    /// Solves a discrete-level charging problem.
    fn plan_discrete(&self, request: &DiscreteRequest<'_>) -> Result<Profile>;
}

/// Default planner: water-filling with a pairwise energy-exchange fallback.
#[derive(Debug, Clone, Copy)]
pub struct ExchangePlanner {
    /// Exchange budget per interval of the segment.
    pub exchanges_per_interval: usize,
    /// Objective improvements below this are treated as converged.
    pub tolerance: f64,
}

impl Default for ExchangePlanner {
    fn default() -> Self {
        Self {
            exchanges_per_interval: 40,
            tolerance: 1e-9,
        }
    }
}

impl LocalPlanner for ExchangePlanner {
    fn plan_buffer(
        &self,
        request: &BufferRequest<'_>,
        warm_start: Option<&[f64]>,
    ) -> Result<Profile> {
        request.validate()?;
        if request.desired.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(x) = buffer::water_fill(request, self.tolerance)? {
            if buffer::soc_path_feasible(request, &x, self.tolerance) {
                return Ok(x);
            }
        }

        let start = match warm_start {
            Some(w)
                if w.len() == request.desired.len()
                    && buffer::is_feasible(request, w, self.tolerance) =>
            {
                w.to_vec()
            }
            _ => feasible_start(request)?,
        };
        let budget = self.exchanges_per_interval * request.desired.len();
        Ok(buffer::exchange(request, start, budget, self.tolerance))
    }

    fn plan_discrete(&self, request: &DiscreteRequest<'_>) -> Result<Profile> {
        let budget = self.exchanges_per_interval * request.desired.len();
        discrete::plan(request, budget, self.tolerance)
    }
}
