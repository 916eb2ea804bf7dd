use serde::Deserialize;

use crate::error::Result;
use crate::profile::{self, Profile};

use super::types::Horizon;

/// Target profile generation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum TargetSchedule {
    /// Constant target over the horizon.
    Flat { kw: f64 },
    /// Explicit per-interval target.
    Values { kw: Vec<f64> },
    /// Flat target at the average of a reference profile.
    Flattened { kw: Vec<f64> },
}

impl Default for TargetSchedule {
    fn default() -> Self {
        Self::Flat { kw: 0.0 }
    }
}

impl TargetSchedule {
    /// Expands the schedule to a profile over `horizon`.
    ///
    /// # Errors
    ///
    /// Explicit and reference profiles must have exactly
    /// `horizon.intervals` entries.
    pub fn resolve(&self, horizon: &Horizon) -> Result<Profile> {
        match self {
            Self::Flat { kw } => Ok(vec![*kw; horizon.intervals]),
            Self::Values { kw } => {
                profile::ensure_len(horizon.intervals, kw.len())?;
                Ok(kw.clone())
            }
            Self::Flattened { kw } => {
                profile::ensure_len(horizon.intervals, kw.len())?;
                Ok(flat_target(kw))
            }
        }
    }
}

/// Generate a flat target schedule equal to the average of the reference.
pub fn flat_target(reference: &[f64]) -> Profile {
    if reference.is_empty() {
        return Vec::new();
    }

    let avg = reference.iter().sum::<f64>() / reference.len() as f64;
    vec![avg; reference.len()]
}
