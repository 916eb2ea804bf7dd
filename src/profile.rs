//! Fixed-horizon power profiles and the elementwise arithmetic on them.
//!
//! Every helper that combines two profiles checks that their lengths match and
//! fails with [`SteeringError::ProfileLength`] otherwise.

use crate::error::{Result, SteeringError};

/// Ordered power values (kW), one per interval of the horizon.
pub type Profile = Vec<f64>;

/// Returns a zero profile of length `len`.
pub fn zeros(len: usize) -> Profile {
    vec![0.0; len]
}

/// Fails unless `found` equals `expected`.
pub fn ensure_len(expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(SteeringError::ProfileLength { expected, found })
    }
}

/// Elementwise `a - b`.
pub fn sub(a: &[f64], b: &[f64]) -> Result<Profile> {
    ensure_len(a.len(), b.len())?;
    Ok(a.iter().zip(b).map(|(x, y)| x - y).collect())
}

/// In-place `acc += delta`.
pub fn add_assign(acc: &mut [f64], delta: &[f64]) -> Result<()> {
    ensure_len(acc.len(), delta.len())?;
    for (a, d) in acc.iter_mut().zip(delta) {
        *a += d;
    }
    Ok(())
}

/// Euclidean norm.
pub fn norm2(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Euclidean distance `‖a - b‖₂`.
pub fn distance2(a: &[f64], b: &[f64]) -> Result<f64> {
    ensure_len(a.len(), b.len())?;
    Ok(a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt())
}

/// Manhattan distance `‖a - b‖₁`.
pub fn distance1(a: &[f64], b: &[f64]) -> Result<f64> {
    ensure_len(a.len(), b.len())?;
    Ok(a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum())
}
