//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::devices::{BurdenPolicy, ChargingMode};
use crate::sim::schedule::TargetSchedule;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Horizon, stopping rule and selection parameters.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Number of devices per family.
    #[serde(default)]
    pub population: PopulationConfig,
    /// Inflexible load parameters.
    #[serde(default)]
    pub fixed_load: FixedLoadConfig,
    /// Battery storage parameters.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// EV charger parameters.
    #[serde(default)]
    pub ev: EvConfig,
    /// Heat pump parameters.
    #[serde(default)]
    pub heat_pump: HeatPumpConfig,
    /// Target profile `p`.
    #[serde(default)]
    pub target: TargetSchedule,
}

/// Horizon, stopping rule and selection parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Number of intervals in the one-day horizon (must be > 0).
    pub intervals: usize,
    /// Master random seed for population sampling and tie-breaking.
    pub seed: u64,
    /// Stop once the winning improvement falls below this value.
    pub e_min: f64,
    /// Maximum number of steering rounds (must be > 0).
    pub max_iters: usize,
    /// Fairness weight in `[0, 1]`, or `-1` for plain maximum improvement.
    pub tau: f64,
    /// Plan devices on the rayon thread pool.
    pub parallel_plan: bool,
    /// How accepted burdens are folded into each device's total.
    pub burden_policy: BurdenPolicy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            intervals: 96,
            seed: 42,
            e_min: 0.001,
            max_iters: 100,
            tau: 0.5,
            parallel_plan: false,
            burden_policy: BurdenPolicy::Accumulate,
        }
    }
}

/// Number of devices per family.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PopulationConfig {
    pub fixed_loads: usize,
    pub batteries: usize,
    pub evs: usize,
    pub heat_pumps: usize,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            fixed_loads: 100,
            batteries: 100,
            evs: 100,
            heat_pumps: 100,
        }
    }
}

impl PopulationConfig {
    /// Total number of devices.
    pub fn total(&self) -> usize {
        self.fixed_loads + self.batteries + self.evs + self.heat_pumps
    }
}

/// Inflexible load parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FixedLoadConfig {
    /// Upper bound of the uniform per-interval draw (kW).
    pub max_kw: f64,
}

impl Default for FixedLoadConfig {
    fn default() -> Self {
        Self { max_kw: 5.0 }
    }
}

/// Battery storage parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Total energy capacity (kWh).
    pub capacity_kwh: f64,
    /// Initial state of charge (0.0–1.0).
    pub initial_soc: f64,
    /// Maximum charging power (kW).
    pub max_charge_kw: f64,
    /// Maximum discharging power (kW).
    pub max_discharge_kw: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 3.5,
            initial_soc: 0.5,
            max_charge_kw: 5.0,
            max_discharge_kw: 5.0,
        }
    }
}

/// EV charger parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvConfig {
    /// Vehicle battery capacity (kWh).
    pub capacity_kwh: f64,
    /// Continuous or discrete power modulation.
    pub charging: ChargingMode,
    /// Earliest and latest arrival, as fractions of the day (0.0–1.0).
    pub arrival_frac: (f64, f64),
    /// Earliest and latest departure, as fractions of the day (0.0–1.0).
    pub departure_frac: (f64, f64),
    /// Smallest energy request (kWh).
    pub request_kwh_min: f64,
    /// Largest energy request (kWh).
    pub request_kwh_max: f64,
}

impl Default for EvConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 40.0,
            charging: ChargingMode::Discrete {
                levels_kw: vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0],
            },
            arrival_frac: (7.0 / 24.0, 12.0 / 24.0),
            departure_frac: (15.0 / 24.0, 22.0 / 24.0),
            request_kwh_min: 4.0,
            request_kwh_max: 22.0,
        }
    }
}

/// Heat pump parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeatPumpConfig {
    /// Thermal buffer capacity in electricity equivalent (kWh).
    pub capacity_kwh: f64,
    /// Maximum electrical power (kW).
    pub max_kw: f64,
    /// Initial buffer fill (0.0–1.0).
    pub initial_soc: f64,
    /// Heat demand is drawn uniformly in `[0, demand_factor * max_kw)`.
    pub demand_factor: f64,
}

impl Default for HeatPumpConfig {
    fn default() -> Self {
        Self {
            capacity_kwh: 3.5,
            max_kw: 5.0,
            initial_soc: 0.5,
            demand_factor: 0.9,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, thiserror::Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.intervals"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: one hundred devices per family over a
    /// 96-interval day and a flat zero target.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            population: PopulationConfig::default(),
            fixed_load: FixedLoadConfig::default(),
            battery: BatteryConfig::default(),
            ev: EvConfig::default(),
            heat_pump: HeatPumpConfig::default(),
            target: TargetSchedule::default(),
        }
    }

    /// Returns the small preset: a handful of devices on an hourly horizon,
    /// quick enough for smoke runs and tests.
    pub fn small() -> Self {
        Self {
            simulation: SimulationConfig {
                intervals: 24,
                max_iters: 50,
                ..SimulationConfig::default()
            },
            population: PopulationConfig {
                fixed_loads: 4,
                batteries: 3,
                evs: 3,
                heat_pumps: 2,
            },
            fixed_load: FixedLoadConfig { max_kw: 2.0 },
            ev: EvConfig {
                charging: ChargingMode::Continuous { max_kw: 7.0 },
                request_kwh_max: 14.0,
                ..EvConfig::default()
            },
            ..Self::baseline()
        }
    }

    /// Returns the EV-heavy preset: a large continuous-charging fleet next to
    /// a few buffers, steered toward a flat 2 kW per-household target.
    pub fn ev_heavy() -> Self {
        Self {
            simulation: SimulationConfig {
                max_iters: 200,
                ..SimulationConfig::default()
            },
            population: PopulationConfig {
                fixed_loads: 50,
                batteries: 10,
                evs: 150,
                heat_pumps: 10,
            },
            ev: EvConfig {
                charging: ChargingMode::Continuous { max_kw: 11.0 },
                request_kwh_min: 8.0,
                request_kwh_max: 30.0,
                ..EvConfig::default()
            },
            target: TargetSchedule::Flat { kw: 100.0 },
            ..Self::baseline()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "small", "ev_heavy"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "small" => Ok(Self::small()),
            "ev_heavy" => Ok(Self::ev_heavy()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.intervals == 0 {
            errors.push(ConfigError::new("simulation.intervals", "must be > 0"));
        }
        if s.max_iters == 0 {
            errors.push(ConfigError::new("simulation.max_iters", "must be > 0"));
        }
        if s.e_min.is_nan() || s.e_min < 0.0 {
            errors.push(ConfigError::new("simulation.e_min", "must be >= 0"));
        }
        if s.tau != -1.0 && !(0.0..=1.0).contains(&s.tau) {
            errors.push(ConfigError::new(
                "simulation.tau",
                format!("must be in [0.0, 1.0] or -1, got {}", s.tau),
            ));
        }

        if self.fixed_load.max_kw < 0.0 {
            errors.push(ConfigError::new("fixed_load.max_kw", "must be >= 0"));
        }

        let bat = &self.battery;
        if bat.capacity_kwh <= 0.0 {
            errors.push(ConfigError::new("battery.capacity_kwh", "must be > 0"));
        }
        if !(0.0..=1.0).contains(&bat.initial_soc) {
            errors.push(ConfigError::new("battery.initial_soc", "must be in [0.0, 1.0]"));
        }
        if bat.max_charge_kw < 0.0 || bat.max_discharge_kw < 0.0 {
            errors.push(ConfigError::new("battery.max_charge_kw", "power limits must be >= 0"));
        }

        let ev = &self.ev;
        if ev.capacity_kwh <= 0.0 {
            errors.push(ConfigError::new("ev.capacity_kwh", "must be > 0"));
        }
        match &ev.charging {
            ChargingMode::Continuous { max_kw } if *max_kw <= 0.0 => {
                errors.push(ConfigError::new("ev.charging.max_kw", "must be > 0"));
            }
            ChargingMode::Discrete { levels_kw }
                if levels_kw.is_empty() || levels_kw.windows(2).any(|w| w[0] >= w[1]) =>
            {
                errors.push(ConfigError::new(
                    "ev.charging.levels_kw",
                    "must be non-empty and strictly ascending",
                ));
            }
            _ => {}
        }
        for (field, (lo, hi)) in [
            ("ev.arrival_frac", ev.arrival_frac),
            ("ev.departure_frac", ev.departure_frac),
        ] {
            if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo > hi {
                errors.push(ConfigError::new(field, "must be an ordered pair within [0.0, 1.0]"));
            }
        }
        if ev.arrival_frac.1 >= ev.departure_frac.0 {
            errors.push(ConfigError::new(
                "ev.arrival_frac",
                "latest arrival must precede earliest departure",
            ));
        }
        if ev.request_kwh_min < 0.0 || ev.request_kwh_min > ev.request_kwh_max {
            errors.push(ConfigError::new(
                "ev.request_kwh_min",
                "must be >= 0 and <= ev.request_kwh_max",
            ));
        }

        let hp = &self.heat_pump;
        if hp.capacity_kwh <= 0.0 {
            errors.push(ConfigError::new("heat_pump.capacity_kwh", "must be > 0"));
        }
        if hp.max_kw <= 0.0 {
            errors.push(ConfigError::new("heat_pump.max_kw", "must be > 0"));
        }
        if !(0.0..=1.0).contains(&hp.initial_soc) {
            errors.push(ConfigError::new("heat_pump.initial_soc", "must be in [0.0, 1.0]"));
        }
        // Above 1 the buffer must pre-heat; HeatPump::new rejects demand it cannot serve.
        if hp.demand_factor < 0.0 || !hp.demand_factor.is_finite() {
            errors.push(ConfigError::new("heat_pump.demand_factor", "must be finite and >= 0"));
        }

        if s.intervals > 0 {
            let expected = s.intervals;
            let found = match &self.target {
                TargetSchedule::Flat { .. } => expected,
                TargetSchedule::Values { kw } | TargetSchedule::Flattened { kw } => kw.len(),
            };
            if found != expected {
                errors.push(ConfigError::new(
                    "target.kw",
                    format!("expected {expected} values, got {found}"),
                ));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_preset_valid() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "baseline should be valid: {errors:?}");
        assert_eq!(cfg.population.total(), 400);
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.is_err());
        assert!(err.err().is_some_and(|e| e.message.contains("unknown preset")));
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
intervals = 48
seed = 7
e_min = 0.01
max_iters = 30
tau = -1.0
parallel_plan = true
burden_policy = "replace"

[population]
fixed_loads = 2
batteries = 1
evs = 1
heat_pumps = 0

[battery]
capacity_kwh = 10.0
initial_soc = 0.3

[ev]
capacity_kwh = 50.0
charging = { mode = "continuous", max_kw = 11.0 }
arrival_frac = [0.3, 0.4]
departure_frac = [0.7, 0.8]

[target]
kind = "flat"
kw = 1.5
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).expect("valid TOML should parse");
        assert_eq!(cfg.simulation.intervals, 48);
        assert_eq!(cfg.simulation.burden_policy, BurdenPolicy::Replace);
        assert_eq!(
            cfg.ev.charging,
            ChargingMode::Continuous { max_kw: 11.0 }
        );
        assert_eq!(cfg.target, TargetSchedule::Flat { kw: 1.5 });
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[simulation]
intervals = 24
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[simulation]
seed = 99
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).expect("partial TOML should parse");
        // seed overridden
        assert_eq!(cfg.simulation.seed, 99);
        // horizon kept default
        assert_eq!(cfg.simulation.intervals, 96);
        assert_eq!(cfg.battery.capacity_kwh, 3.5);
    }

    #[test]
    fn validation_catches_bad_tau() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.tau = 1.5;
        assert!(cfg.validate().iter().any(|e| e.field == "simulation.tau"));
        cfg.simulation.tau = -1.0;
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn demand_factor_above_one_is_left_to_the_device() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.heat_pump.demand_factor = 1.5;
        assert!(cfg.validate().is_empty());

        cfg.heat_pump.demand_factor = -0.1;
        let errors = cfg.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "heat_pump.demand_factor");
    }

    #[test]
    fn validation_catches_zero_intervals() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.intervals = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.intervals"));
    }

    #[test]
    fn validation_catches_target_length() {
        let mut cfg = ScenarioConfig::small();
        cfg.target = TargetSchedule::Values { kw: vec![0.0; 5] };
        assert!(cfg.validate().iter().any(|e| e.field == "target.kw"));
    }

    #[test]
    fn validation_catches_unordered_levels() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.ev.charging = ChargingMode::Discrete {
            levels_kw: vec![0.0, 3.0, 2.0],
        };
        assert!(cfg.validate().iter().any(|e| e.field == "ev.charging.levels_kw"));
    }

    #[test]
    fn validation_catches_window_overlap() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.ev.arrival_frac = (0.5, 0.7);
        cfg.ev.departure_frac = (0.6, 0.9);
        assert!(cfg.validate().iter().any(|e| e.field == "ev.arrival_frac"));
    }

    #[test]
    fn ev_heavy_has_more_evs() {
        let base = ScenarioConfig::baseline();
        let heavy = ScenarioConfig::ev_heavy();
        assert!(heavy.population.evs > base.population.evs);
        assert!(heavy.ev.request_kwh_max > base.ev.request_kwh_max);
    }

    #[test]
    fn config_error_display() {
        let e = ConfigError::new("simulation.tau", "bad");
        assert_eq!(e.to_string(), "config error: simulation.tau: bad");
    }
}
