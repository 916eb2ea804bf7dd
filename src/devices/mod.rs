//! Steerable device agents.

/// Inflexible household load.
pub mod baseload;
/// Bidirectional battery storage.
pub mod battery;
/// Connection-windowed electric vehicle charger.
pub mod ev_charger;
/// Heat pump with a thermal buffer.
pub mod heat_pump;
pub mod types;

// Re-export the main types for convenience
pub use baseload::BaseLoad;
pub use battery::Battery;
pub use ev_charger::{ChargingMode, EvCharger, SessionRanges};
pub use heat_pump::HeatPump;
pub use types::{AgentState, BurdenPolicy, DeviceAgent, Proposal};
