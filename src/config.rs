//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::Deserialize;

use crate::devices::vehicle::ElectricVehicle;
use crate::error::ScheduleError;
use crate::schedule::{Interval, Request, TimeframeInterval};

/// Top-level scenario configuration parsed from TOML.
///
/// Missing sections fall back to the baseline scenario. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or use [`ScenarioConfig::baseline`]
/// for the built-in default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Run timing and queue policy.
    pub simulation: SimulationConfig,
    /// Charger and connected vehicle parameters.
    pub charger: ChargerConfig,
    /// Appliance meter parameters.
    pub meter: MeterConfig,
    /// Vehicles known to the charger.
    pub vehicles: Vec<VehicleConfig>,
    /// Schedule windows admitted before the first tick.
    pub timeframes: Vec<TimeframeConfig>,
}

/// Run timing and queue policy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Appliance id used in log lines.
    pub appliance_id: String,
    /// Instant of the first tick (`YYYY-MM-DDTHH:MM:SS`).
    pub start: NaiveDateTime,
    /// Seconds between ticks (must be > 0).
    pub tick_seconds: i64,
    /// Number of ticks to run (must be > 0).
    pub ticks: usize,
    /// Master random seed.
    pub seed: u64,
    /// Whether overlapping windows are admitted.
    pub allow_overlap: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            appliance_id: "F-00000001-000000000001-00".to_string(),
            start: default_start(),
            tick_seconds: 60,
            ticks: 720,
            seed: 42,
            allow_overlap: false,
        }
    }
}

fn default_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 1, 5)
        .and_then(|d| d.and_hms_opt(18, 0, 0))
        .unwrap_or_default()
}

/// Charger and connected vehicle parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChargerConfig {
    /// Maximum charging power (kW).
    pub max_charge_kw: f64,
    /// Vehicle plugged in for the run.
    pub ev_id: u32,
    /// SoC of the vehicle when plugged in (0–100).
    pub initial_soc: f64,
    /// Noise on reported SoC (percentage points).
    pub soc_noise_std: f32,
    /// Power available to optional-energy windows (kW).
    pub surplus_kw: f64,
    /// Ticks between SoC reports from the vehicle (must be > 0).
    pub soc_report_ticks: usize,
}

impl Default for ChargerConfig {
    fn default() -> Self {
        Self {
            max_charge_kw: 11.0,
            ev_id: 1,
            initial_soc: 20.0,
            soc_noise_std: 0.0,
            surplus_kw: 3.7,
            soc_report_ticks: 5,
        }
    }
}

/// Appliance meter parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MeterConfig {
    /// Whether the appliance has a meter.
    pub enabled: bool,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Vehicle known to the charger.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VehicleConfig {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    /// Usable battery capacity (Wh).
    pub battery_capacity_wh: i64,
    /// Charge loss (percent).
    #[serde(default = "default_charge_loss")]
    pub charge_loss_pct: i64,
    /// Target SoC for optional-energy windows without one.
    #[serde(default)]
    pub default_soc_optional_energy: Option<u8>,
}

fn default_charge_loss() -> i64 {
    ElectricVehicle::DEFAULT_CHARGE_LOSS_PCT
}

impl From<&VehicleConfig> for ElectricVehicle {
    fn from(v: &VehicleConfig) -> Self {
        Self {
            id: v.id,
            name: v.name.clone(),
            battery_capacity_wh: v.battery_capacity_wh,
            charge_loss_pct: v.charge_loss_pct,
            default_soc_optional_energy: v.default_soc_optional_energy,
        }
    }
}

/// Request variant of a configured window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Runtime,
    Soc,
    OptionalEnergySoc,
}

/// Schedule window relative to the simulation start.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeframeConfig {
    /// Window start as minutes after `simulation.start`.
    pub start_offset_min: i64,
    /// Window end as minutes after `simulation.start`.
    pub end_offset_min: i64,
    pub request: RequestType,
    /// Minimum runtime (seconds, runtime windows).
    #[serde(default)]
    pub min_seconds: Option<i64>,
    /// Maximum runtime (seconds, runtime windows).
    #[serde(default)]
    pub max_seconds: Option<i64>,
    /// Target SoC (SoC windows).
    #[serde(default)]
    pub soc: Option<u8>,
    /// Vehicle reference (SoC windows).
    #[serde(default)]
    pub ev_id: Option<u32>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl TimeframeConfig {
    fn soc_window(start_offset_min: i64, end_offset_min: i64, soc: u8) -> Self {
        Self {
            start_offset_min,
            end_offset_min,
            request: RequestType::Soc,
            min_seconds: None,
            max_seconds: None,
            soc: Some(soc),
            ev_id: Some(1),
            enabled: true,
        }
    }

    /// Builds the timeframe interval this window describes.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError::OffsetOutOfRange`] if an offset leaves the
    /// representable time range, or [`ScheduleError::InvalidInterval`] if the
    /// offsets do not form a non-empty range.
    pub fn to_timeframe_interval(
        &self,
        start: NaiveDateTime,
    ) -> Result<TimeframeInterval, ScheduleError> {
        let interval = Interval::new(
            offset_by_minutes(start, self.start_offset_min)?,
            offset_by_minutes(start, self.end_offset_min)?,
        )?;
        let request = match self.request {
            RequestType::Runtime => Request::runtime(self.min_seconds, self.max_seconds.unwrap_or(0)),
            RequestType::Soc => Request::soc(self.soc, self.ev_id),
            RequestType::OptionalEnergySoc => Request::optional_energy_soc(self.soc, self.ev_id),
        };
        Ok(TimeframeInterval::new(interval, request.with_enabled(self.enabled)))
    }
}

fn offset_by_minutes(base: NaiveDateTime, offset_min: i64) -> Result<NaiveDateTime, ScheduleError> {
    TimeDelta::try_minutes(offset_min)
        .and_then(|offset| base.checked_add_signed(offset))
        .ok_or(ScheduleError::OffsetOutOfRange { base, offset_min })
}

/// Configuration error with field path and constraint description.
#[derive(Debug)]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.tick_seconds"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config error: {}: {}", self.field, self.message)
    }
}

impl std::error::Error for ConfigError {}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::baseline()
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: one overnight SoC window for a 50 kWh car.
    pub fn baseline() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            charger: ChargerConfig::default(),
            meter: MeterConfig::default(),
            vehicles: vec![VehicleConfig {
                id: 1,
                name: "Nissan Leaf".to_string(),
                battery_capacity_wh: 50_000,
                charge_loss_pct: 10,
                default_soc_optional_energy: None,
            }],
            timeframes: vec![TimeframeConfig::soc_window(0, 12 * 60, 80)],
        }
    }

    /// Returns the overlap preset: a runtime plan with a SoC override on top.
    pub fn overlap() -> Self {
        Self {
            simulation: SimulationConfig {
                allow_overlap: true,
                ..SimulationConfig::default()
            },
            timeframes: vec![
                TimeframeConfig {
                    start_offset_min: 0,
                    end_offset_min: 120,
                    request: RequestType::Runtime,
                    min_seconds: Some(1800),
                    max_seconds: Some(3600),
                    soc: None,
                    ev_id: None,
                    enabled: true,
                },
                TimeframeConfig::soc_window(60, 10 * 60, 70),
            ],
            ..Self::baseline()
        }
    }

    /// Returns the optional-energy preset: surplus charging before a mandatory target.
    pub fn optional_energy() -> Self {
        let base = Self::baseline();
        Self {
            vehicles: vec![VehicleConfig {
                default_soc_optional_energy: Some(60),
                ..base.vehicles[0].clone()
            }],
            timeframes: vec![
                TimeframeConfig {
                    request: RequestType::OptionalEnergySoc,
                    soc: None,
                    ..TimeframeConfig::soc_window(0, 4 * 60, 60)
                },
                TimeframeConfig::soc_window(4 * 60, 12 * 60, 90),
            ],
            ..base
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "overlap", "optional_energy"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "overlap" => Ok(Self::overlap()),
            "optional_energy" => Ok(Self::optional_energy()),
            _ => Err(ConfigError {
                field: "preset".to_string(),
                message: format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            }),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError {
            field: "scenario".to_string(),
            message: format!("cannot read \"{}\": {e}", path.display()),
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError {
            field: "toml".to_string(),
            message: e.to_string(),
        })
    }

    /// Vehicles as the registry expects them.
    pub fn electric_vehicles(&self) -> Vec<ElectricVehicle> {
        self.vehicles.iter().map(ElectricVehicle::from).collect()
    }

    /// Longest tick accepted by [`validate`](Self::validate) (one day).
    pub const MAX_TICK_SECONDS: i64 = 86_400;

    /// Largest window offset accepted by [`validate`](Self::validate), in
    /// minutes either side of `simulation.start` (366 days).
    pub const MAX_OFFSET_MIN: i64 = 366 * 24 * 60;

    /// Largest vehicle battery accepted by [`validate`](Self::validate) (10 MWh).
    pub const MAX_BATTERY_CAPACITY_WH: i64 = 10_000_000;

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let s = &self.simulation;

        if s.tick_seconds <= 0 || s.tick_seconds > Self::MAX_TICK_SECONDS {
            errors.push(ConfigError {
                field: "simulation.tick_seconds".into(),
                message: format!("must be in [1, {}]", Self::MAX_TICK_SECONDS),
            });
        }
        if s.ticks == 0 {
            errors.push(ConfigError {
                field: "simulation.ticks".into(),
                message: "must be > 0".into(),
            });
        }
        if s.appliance_id.is_empty() {
            errors.push(ConfigError {
                field: "simulation.appliance_id".into(),
                message: "must not be empty".into(),
            });
        }

        let c = &self.charger;
        if c.max_charge_kw <= 0.0 {
            errors.push(ConfigError {
                field: "charger.max_charge_kw".into(),
                message: "must be > 0".into(),
            });
        }
        if c.surplus_kw < 0.0 {
            errors.push(ConfigError {
                field: "charger.surplus_kw".into(),
                message: "must be >= 0".into(),
            });
        }
        if c.soc_report_ticks == 0 {
            errors.push(ConfigError {
                field: "charger.soc_report_ticks".into(),
                message: "must be > 0".into(),
            });
        }
        if !(0.0..=100.0).contains(&c.initial_soc) {
            errors.push(ConfigError {
                field: "charger.initial_soc".into(),
                message: "must be in [0, 100]".into(),
            });
        }
        if !self.vehicles.iter().any(|v| v.id == c.ev_id) {
            errors.push(ConfigError {
                field: "charger.ev_id".into(),
                message: format!("no vehicle with id {}", c.ev_id),
            });
        }

        for (i, v) in self.vehicles.iter().enumerate() {
            if v.battery_capacity_wh <= 0 || v.battery_capacity_wh > Self::MAX_BATTERY_CAPACITY_WH {
                errors.push(ConfigError {
                    field: format!("vehicles[{i}].battery_capacity_wh"),
                    message: format!("must be in [1, {}]", Self::MAX_BATTERY_CAPACITY_WH),
                });
            }
            if !(0..=100).contains(&v.charge_loss_pct) {
                errors.push(ConfigError {
                    field: format!("vehicles[{i}].charge_loss_pct"),
                    message: "must be in [0, 100]".into(),
                });
            }
            if v.default_soc_optional_energy.is_some_and(|soc| soc > 100) {
                errors.push(ConfigError {
                    field: format!("vehicles[{i}].default_soc_optional_energy"),
                    message: "must be <= 100".into(),
                });
            }
            if self.vehicles[..i].iter().any(|other| other.id == v.id) {
                errors.push(ConfigError {
                    field: format!("vehicles[{i}].id"),
                    message: format!("duplicate vehicle id {}", v.id),
                });
            }
        }

        for (i, t) in self.timeframes.iter().enumerate() {
            for (name, offset) in [("start_offset_min", t.start_offset_min), ("end_offset_min", t.end_offset_min)] {
                if !(-Self::MAX_OFFSET_MIN..=Self::MAX_OFFSET_MIN).contains(&offset) {
                    errors.push(ConfigError {
                        field: format!("timeframes[{i}].{name}"),
                        message: format!("must be within +/-{} minutes", Self::MAX_OFFSET_MIN),
                    });
                }
            }
            if t.start_offset_min >= t.end_offset_min {
                errors.push(ConfigError {
                    field: format!("timeframes[{i}].start_offset_min"),
                    message: format!("must be < timeframes[{i}].end_offset_min"),
                });
            }
            match t.request {
                RequestType::Runtime => {
                    if t.max_seconds.is_none_or(|max| max <= 0) {
                        errors.push(ConfigError {
                            field: format!("timeframes[{i}].max_seconds"),
                            message: "runtime windows need max_seconds > 0".into(),
                        });
                    }
                    if let (Some(min), Some(max)) = (t.min_seconds, t.max_seconds) {
                        if min > max {
                            errors.push(ConfigError {
                                field: format!("timeframes[{i}].min_seconds"),
                                message: format!("must be <= timeframes[{i}].max_seconds"),
                            });
                        }
                    }
                }
                RequestType::Soc | RequestType::OptionalEnergySoc => {
                    if t.soc.is_some_and(|soc| soc > 100) {
                        errors.push(ConfigError {
                            field: format!("timeframes[{i}].soc"),
                            message: "must be <= 100".into(),
                        });
                    }
                }
            }
        }

        errors
    }
}
