use crate::error::{Result, SteeringError};
use crate::profile::Profile;

use super::DiscreteRequest;

/// Plans a discrete-level profile that delivers at least the requested energy.
///
/// Levels are raised greedily by lowest marginal cost per kWh until the energy
/// is met, then single-level swaps between intervals are applied while they
/// lower the cost. The result overshoots the request by less than one level
/// step.
pub(crate) fn plan(req: &DiscreteRequest<'_>, budget: usize, tol: f64) -> Result<Profile> {
    let n = req.desired.len();
    if let Some(prices) = req.prices {
        crate::profile::ensure_len(n, prices.len())?;
    }
    let levels = req.levels_kw;
    if levels.is_empty() || levels.windows(2).any(|w| w[0] >= w[1]) {
        return Err(SteeringError::InvalidParameter {
            name: "levels_kw",
            reason: "must be non-empty and strictly ascending".into(),
        });
    }
    let top = levels.len() - 1;
    let dt = req.dt_hours;
    let need = req.energy_kwh - tol;

    let cost = |t: usize, k: usize| -> f64 {
        let e = levels[k] - req.desired[t];
        req.weight * e * e + req.price(t) * levels[k]
    };

    let mut idx = vec![0usize; n];
    let mut energy: f64 = levels[0] * dt * n as f64;

    while energy < need {
        let pick = (0..n).filter(|&t| idx[t] < top).min_by(|&a, &b| {
            let per_kwh = |t: usize| {
                (cost(t, idx[t] + 1) - cost(t, idx[t])) / ((levels[idx[t] + 1] - levels[idx[t]]) * dt)
            };
            per_kwh(a).total_cmp(&per_kwh(b))
        });
        let Some(t) = pick else {
            return Err(SteeringError::infeasible(
                "discrete charger",
                format!(
                    "{:.3} kWh requested, at most {energy:.3} kWh deliverable",
                    req.energy_kwh
                ),
            ));
        };
        energy += (levels[idx[t] + 1] - levels[idx[t]]) * dt;
        idx[t] += 1;
    }

    for _ in 0..budget {
        let mut best: Option<(f64, Option<usize>, Option<usize>)> = None;
        let mut consider = |gain: f64, down: Option<usize>, up: Option<usize>| {
            if gain > tol && best.is_none_or(|(g, ..)| gain > g) {
                best = Some((gain, down, up));
            }
        };

        for i in (0..n).filter(|&i| idx[i] > 0) {
            let drop_kwh = (levels[idx[i]] - levels[idx[i] - 1]) * dt;
            let drop_gain = cost(i, idx[i]) - cost(i, idx[i] - 1);
            if energy - drop_kwh >= need {
                consider(drop_gain, Some(i), None);
            }
            for j in (0..n).filter(|&j| j != i && idx[j] < top) {
                let rise_kwh = (levels[idx[j] + 1] - levels[idx[j]]) * dt;
                if energy - drop_kwh + rise_kwh >= need {
                    consider(drop_gain + cost(j, idx[j]) - cost(j, idx[j] + 1), Some(i), Some(j));
                }
            }
        }

        let Some((_, down, up)) = best else {
            break;
        };
        if let Some(i) = down {
            energy -= (levels[idx[i]] - levels[idx[i] - 1]) * dt;
            idx[i] -= 1;
        }
        if let Some(j) = up {
            energy += (levels[idx[j] + 1] - levels[idx[j]]) * dt;
            idx[j] += 1;
        }
    }

    Ok(idx.into_iter().map(|k| levels[k]).collect())
}
