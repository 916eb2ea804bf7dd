//! Device population construction from a [`ScenarioConfig`].

use std::sync::Arc;

use tracing::debug;

use crate::config::ScenarioConfig;
use crate::devices::{BaseLoad, Battery, DeviceAgent, EvCharger, HeatPump, SessionRanges};
use crate::error::Result;
use crate::planner::LocalPlanner;
use crate::sim::types::Horizon;

const FIXED_LOAD_SEED_OFFSET: u64 = 0;
const EV_SEED_OFFSET: u64 = 57;
const HEAT_PUMP_SEED_OFFSET: u64 = 113;

/// Per-device seed: the family offset keeps families independent, the index
/// keeps devices within a family independent.
fn device_seed(master: u64, family_offset: u64, index: usize) -> u64 {
    master
        .wrapping_add(family_offset.wrapping_mul(1_000_003))
        .wrapping_add(index as u64)
}

/// Converts a fractional window range into interval indices.
///
/// Arrivals round down and departures round up, so an ordered pair of
/// fractions never collapses into an empty window.
fn window_range(frac: (f64, f64), intervals: usize, round_up: bool) -> (usize, usize) {
    let h = intervals as f64;
    let to_index = |f: f64| {
        let x = f * h;
        let i = if round_up { x.ceil() } else { x.floor() };
        (i as usize).min(intervals)
    };
    (to_index(frac.0), to_index(frac.1))
}

/// Builds the population in a fixed family order: fixed loads, batteries,
/// EVs, heat pumps.
///
/// All sampling is driven by `cfg.simulation.seed`, so equal configs give
/// equal populations.
///
/// # Errors
///
/// Returns [`crate::error::SteeringError::Infeasible`] if a device cannot be
/// constructed from the configured parameters.
pub fn build_population(
    cfg: &ScenarioConfig,
    planner: Arc<dyn LocalPlanner>,
) -> Result<Vec<Box<dyn DeviceAgent>>> {
    let horizon = Horizon::new(cfg.simulation.intervals);
    let seed = cfg.simulation.seed;
    let policy = cfg.simulation.burden_policy;
    let pop = &cfg.population;
    let mut devices: Vec<Box<dyn DeviceAgent>> = Vec::with_capacity(pop.total());

    for i in 0..pop.fixed_loads {
        devices.push(Box::new(BaseLoad::sampled(
            horizon.intervals,
            cfg.fixed_load.max_kw,
            device_seed(seed, FIXED_LOAD_SEED_OFFSET, i),
        )));
    }

    let bat = &cfg.battery;
    for _ in 0..pop.batteries {
        devices.push(Box::new(Battery::new(
            bat.capacity_kwh,
            bat.initial_soc,
            bat.max_charge_kw,
            bat.max_discharge_kw,
            &horizon,
            Arc::clone(&planner),
            policy,
        )?));
    }

    let ev = &cfg.ev;
    let ranges = SessionRanges {
        arrival: window_range(ev.arrival_frac, horizon.intervals, false),
        departure: window_range(ev.departure_frac, horizon.intervals, true),
        request_kwh: (ev.request_kwh_min, ev.request_kwh_max),
    };
    for i in 0..pop.evs {
        devices.push(Box::new(EvCharger::sampled(
            ev.capacity_kwh,
            ev.charging.clone(),
            ranges,
            &horizon,
            Arc::clone(&planner),
            policy,
            device_seed(seed, EV_SEED_OFFSET, i),
        )?));
    }

    let hp = &cfg.heat_pump;
    for i in 0..pop.heat_pumps {
        devices.push(Box::new(HeatPump::sampled(
            hp.capacity_kwh,
            hp.max_kw,
            hp.initial_soc,
            hp.demand_factor,
            &horizon,
            Arc::clone(&planner),
            policy,
            device_seed(seed, HEAT_PUMP_SEED_OFFSET, i),
        )?));
    }

    debug!(
        fixed_loads = pop.fixed_loads,
        batteries = pop.batteries,
        evs = pop.evs,
        heat_pumps = pop.heat_pumps,
        "population built"
    );
    Ok(devices)
}
