use crate::error::{Result, SteeringError};
use crate::profile::Profile;

use super::BufferRequest;

const BISECTION_STEPS: usize = 200;

/// Energy the profile must deliver over the segment (kWh) to land on the
/// target state of charge.
fn required_energy_kwh(req: &BufferRequest<'_>) -> f64 {
    let demand_kwh: f64 = req.demand.iter().sum::<f64>() * req.dt_hours;
    req.target_soc_kwh - req.initial_soc_kwh + demand_kwh
}

/// State of charge at the end of each interval.
fn soc_path(req: &BufferRequest<'_>, x: &[f64]) -> Vec<f64> {
    let mut soc = req.initial_soc_kwh;
    x.iter()
        .zip(req.demand)
        .map(|(p, d)| {
            soc += (p - d) * req.dt_hours;
            soc
        })
        .collect()
}

/// Backward pass: for every interval, the band of end-of-interval SoC from
/// which the target is still reachable.
fn reachable_bands(req: &BufferRequest<'_>) -> Vec<(f64, f64)> {
    let n = req.desired.len();
    let mut bands = vec![(0.0, 0.0); n];
    let mut lo = req.target_soc_kwh;
    let mut hi = req.target_soc_kwh;
    for t in (0..n).rev() {
        bands[t] = (lo, hi);
        let d = req.demand[t];
        lo = (lo - (req.max_kw - d) * req.dt_hours).max(0.0);
        hi = (hi - (req.min_kw - d) * req.dt_hours).min(req.capacity_kwh);
    }
    bands
}

/// Builds a feasible profile that steers the state of charge toward its target
/// as early as possible.
///
/// # Errors
///
/// Returns [`SteeringError::Infeasible`] when no profile within the power and
/// SoC bounds reaches the target state of charge.
pub fn feasible_start(req: &BufferRequest<'_>) -> Result<Profile> {
    req.validate()?;
    let tol = 1e-9 * (1.0 + req.capacity_kwh);
    let bands = reachable_bands(req);
    let dt = req.dt_hours;
    let mut soc = req.initial_soc_kwh;
    let mut x = Vec::with_capacity(req.desired.len());

    for (t, &(band_lo, band_hi)) in bands.iter().enumerate() {
        let d = req.demand[t];
        let lo = req.min_kw.max(d + (band_lo - soc) / dt);
        let hi = req.max_kw.min(d + (band_hi - soc) / dt);
        if lo > hi + tol / dt {
            return Err(SteeringError::infeasible(
                "buffer",
                format!(
                    "target SoC {:.3} kWh unreachable from interval {t} (SoC {soc:.3} kWh)",
                    req.target_soc_kwh
                ),
            ));
        }
        let want = d + (req.target_soc_kwh - soc) / dt;
        let p = want.clamp(lo, hi.max(lo));
        soc += (p - d) * dt;
        x.push(p);
    }

    Ok(x)
}

/// True when every end-of-interval SoC lies within `[0, capacity]`.
pub(crate) fn soc_path_feasible(req: &BufferRequest<'_>, x: &[f64], tol: f64) -> bool {
    let slack = tol * (1.0 + req.capacity_kwh);
    soc_path(req, x)
        .iter()
        .all(|s| *s >= -slack && *s <= req.capacity_kwh + slack)
}

/// Full feasibility: power bounds, SoC path and terminal SoC.
pub(crate) fn is_feasible(req: &BufferRequest<'_>, x: &[f64], tol: f64) -> bool {
    let slack = tol * (1.0 + req.capacity_kwh);
    let within_bounds = x
        .iter()
        .all(|p| *p >= req.min_kw - slack && *p <= req.max_kw + slack);
    let end = soc_path(req, x).last().copied().unwrap_or(req.initial_soc_kwh);
    within_bounds
        && soc_path_feasible(req, x, tol)
        && (end - req.target_soc_kwh).abs() <= slack.max(1e-6)
}

/// Optimum of the relaxation that keeps power bounds and energy balance but
/// drops the intermediate SoC bounds. `None` when the energy target is outside
/// what the power bounds can deliver.
pub(crate) fn water_fill(req: &BufferRequest<'_>, tol: f64) -> Result<Option<Profile>> {
    let n = req.desired.len();
    let total_kw = required_energy_kwh(req) / req.dt_hours;
    let slack = tol * (1.0 + total_kw.abs());
    if total_kw < req.min_kw * n as f64 - slack || total_kw > req.max_kw * n as f64 + slack {
        return Ok(None);
    }

    let anchor: Vec<f64> = (0..n)
        .map(|t| req.desired[t] - req.price(t) / (2.0 * req.weight))
        .collect();
    let fill = |lambda: f64| -> Vec<f64> {
        anchor
            .iter()
            .map(|a| (a + lambda).clamp(req.min_kw, req.max_kw))
            .collect()
    };

    let a_min = anchor.iter().copied().fold(f64::INFINITY, f64::min);
    let a_max = anchor.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut lo = req.min_kw - a_max;
    let mut hi = req.max_kw - a_min;
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        let sum: f64 = fill(mid).iter().sum();
        if (sum - total_kw).abs() <= slack {
            lo = mid;
            hi = mid;
            break;
        }
        if sum < total_kw {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(Some(fill(0.5 * (lo + hi))))
}

/// Pairwise energy exchange from a feasible start.
///
/// Each step lowers one interval and raises another by the same amount, which
/// keeps the energy balance intact; the step is capped so power and SoC bounds
/// stay satisfied. The exchange with the largest objective gain is applied
/// until no exchange gains more than `tol` or `budget` runs out.
pub(crate) fn exchange(req: &BufferRequest<'_>, mut x: Profile, budget: usize, tol: f64) -> Profile {
    let n = x.len();
    let dt = req.dt_hours;
    let w = req.weight;

    for _ in 0..budget {
        let grad: Vec<f64> = (0..n)
            .map(|t| 2.0 * w * (x[t] - req.desired[t]) + req.price(t))
            .collect();
        let soc = soc_path(req, &x);

        let mut best: Option<(f64, usize, usize, f64)> = None;
        let mut consider = |i: usize, j: usize, room: f64| {
            let diff = grad[i] - grad[j];
            if diff <= tol || room <= tol {
                return;
            }
            let step = (diff / (4.0 * w)).min(room);
            let gain = diff * step - 2.0 * w * step * step;
            if best.is_none_or(|(g, ..)| gain > g) {
                best = Some((gain, i, j, step));
            }
        };

        for i in 0..n {
            let down = x[i] - req.min_kw;
            if down <= tol {
                continue;
            }
            // Moving energy later drains the buffer over [i, j).
            let mut room = f64::INFINITY;
            for j in i + 1..n {
                room = room.min(soc[j - 1].max(0.0) / dt);
                consider(i, j, down.min(req.max_kw - x[j]).min(room));
            }
            // Moving energy earlier fills the buffer over [j, i).
            let mut room = f64::INFINITY;
            for j in (0..i).rev() {
                room = room.min((req.capacity_kwh - soc[j]).max(0.0) / dt);
                consider(i, j, down.min(req.max_kw - x[j]).min(room));
            }
        }

        match best {
            Some((gain, i, j, step)) if gain > tol => {
                x[i] -= step;
                x[j] += step;
            }
            _ => break,
        }
    }

    x
}
