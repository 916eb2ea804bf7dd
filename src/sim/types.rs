//! Core steering types: horizon, selection rule, traces and outcomes.

use std::fmt;

use serde::Serialize;

use crate::error::{Result, SteeringError};
use crate::profile::Profile;

/// Planning horizon shared by every profile in a run.
///
/// # Examples
///
/// ```
/// use profile_steering::sim::types::Horizon;
///
/// let h = Horizon::new(96);
/// assert_eq!(h.dt_hours, 0.25);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Horizon {
    /// Number of intervals `H`.
    pub intervals: usize,
    /// Duration of one interval in hours, derived as `24.0 / intervals`.
    pub dt_hours: f64,
}

impl Horizon {
    /// Creates a one-day horizon split into `intervals` equal intervals.
    ///
    /// # Panics
    ///
    /// Panics if `intervals` is zero.
    pub fn new(intervals: usize) -> Self {
        assert!(intervals > 0, "intervals must be > 0");
        Self {
            intervals,
            dt_hours: 24.0 / intervals as f64,
        }
    }
}

/// How the coordinator picks one winner per round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionRule {
    /// Score `tau * normB - (1 - tau) * normE` over devices with positive
    /// improvement; lowest score wins, ties broken by a seeded shuffle.
    Fairness { tau: f64 },
    /// Plain profile steering: the largest raw improvement wins, earlier
    /// devices win ties.
    MaxImprovement,
}

impl SelectionRule {
    /// Tau value that selects [`SelectionRule::MaxImprovement`].
    pub const MAX_IMPROVEMENT_TAU: f64 = -1.0;

    /// Parses a tau value: `[0, 1]` selects fairness scoring, `-1` selects
    /// plain maximum improvement.
    ///
    /// # Errors
    ///
    /// Returns [`SteeringError::InvalidParameter`] for any other value.
    pub fn from_tau(tau: f64) -> Result<Self> {
        if tau == Self::MAX_IMPROVEMENT_TAU {
            Ok(Self::MaxImprovement)
        } else if (0.0..=1.0).contains(&tau) {
            Ok(Self::Fairness { tau })
        } else {
            Err(SteeringError::InvalidParameter {
                name: "tau",
                reason: format!("{tau} must be in [0, 1] or -1"),
            })
        }
    }

    /// Tau value this rule corresponds to.
    pub fn tau(&self) -> f64 {
        match self {
            Self::Fairness { tau } => *tau,
            Self::MaxImprovement => Self::MAX_IMPROVEMENT_TAU,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        Self::from_tau(self.tau()).map(|_| ())
    }
}

impl fmt::Display for SelectionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fairness { tau } => write!(f, "fairness(tau={tau:.2})"),
            Self::MaxImprovement => write!(f, "max-improvement"),
        }
    }
}

/// Why [`crate::sim::coordinator::Coordinator::iterative`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The winning improvement fell below `e_min`.
    Converged,
    /// No device offered a positive improvement.
    NoCandidates,
    /// `max_iters` rounds were executed.
    MaxIterations,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Converged => "converged",
            Self::NoCandidates => "no candidates",
            Self::MaxIterations => "max iterations",
        };
        f.write_str(s)
    }
}

/// Per-round convergence and fairness traces. All vectors have one entry per
/// executed round.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Traces {
    /// Winning improvement (0 when no device improved).
    pub improvement: Vec<f64>,
    /// `‖x - p‖₂` after the round.
    pub objective: Vec<f64>,
    /// Gini coefficient of active devices' burdens after the round.
    pub gini: Vec<f64>,
    /// Population index of the winner, if any.
    pub winners: Vec<Option<usize>>,
}

impl Traces {
    pub(crate) fn with_capacity(rounds: usize) -> Self {
        Self {
            improvement: Vec::with_capacity(rounds),
            objective: Vec::with_capacity(rounds),
            gini: Vec::with_capacity(rounds),
            winners: Vec::with_capacity(rounds),
        }
    }

    pub(crate) fn push(&mut self, winner: Option<usize>, improvement: f64, objective: f64, gini: f64) {
        self.winners.push(winner);
        self.improvement.push(improvement);
        self.objective.push(objective);
        self.gini.push(gini);
    }

    /// Number of executed rounds.
    pub fn rounds(&self) -> usize {
        self.objective.len()
    }
}

/// Result of one iterative phase.
#[derive(Debug, Clone, PartialEq)]
pub struct SteeringOutcome {
    /// Final aggregate profile `x`.
    pub profile: Profile,
    pub traces: Traces,
    pub stop: StopReason,
}
