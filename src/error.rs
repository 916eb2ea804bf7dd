//! Crate-wide error type.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while building a population or steering it.
#[derive(Debug, Error)]
pub enum SteeringError {
    /// Two profiles that must share the horizon length do not.
    #[error("profile length mismatch: expected {expected} intervals, found {found}")]
    ProfileLength { expected: usize, found: usize },

    /// A device cannot satisfy its constraints over the horizon.
    #[error("infeasible {device}: {reason}")]
    Infeasible {
        device: &'static str,
        reason: String,
    },

    /// A control parameter is outside its allowed range.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Scenario configuration failed to load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SteeringError {
    /// Shorthand for an [`SteeringError::Infeasible`] with a formatted reason.
    pub fn infeasible(device: &'static str, reason: impl Into<String>) -> Self {
        Self::Infeasible {
            device,
            reason: reason.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T, E = SteeringError> = std::result::Result<T, E>;
