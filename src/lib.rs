//! Fairness-aware profile steering for populations of flexible devices.

pub mod cli;
pub mod config;
pub mod devices;
pub mod error;
pub mod io;
pub mod planner;
pub mod profile;
pub mod runner;
pub mod scenario;
/// Coordinator, fairness metric, schedules and run reports.
pub mod sim;
pub mod telemetry;
