/// Round-based steering coordinator.
pub mod coordinator;
/// Burden inequality metric.
pub mod fairness;
pub mod kpi;
/// Target profile generation.
pub mod schedule;
pub mod types;
