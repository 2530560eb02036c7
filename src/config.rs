//! Configuration models and loaders for the autopilot.
//!
//! Every field carries a default, so an empty TOML document is a valid
//! configuration and a file only needs the values it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// PID gains, given per second and scaled by `dt` on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub dt: f64, // s, controller period
}

impl Default for PidGains {
    fn default() -> Self {
        Self { kp: 1.0, ki: 0.0, kd: 0.0, dt: 1.0 }
    }
}

/// Launch to a target apoapsis along a linear gravity turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AscentConfig {
    pub target_apoapsis_altitude: f64, // m
    pub turn_start_altitude: f64,      // m
    pub turn_end_fraction: f64,        // of the atmosphere depth
    pub max_q: f64,                    // Pa
    pub heading_deg: f64,
}

impl Default for AscentConfig {
    fn default() -> Self {
        Self {
            target_apoapsis_altitude: 80_000.0,
            turn_start_altitude: 250.0,
            turn_end_fraction: 0.75,
            max_q: 7000.0,
            heading_deg: 90.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    pub delay: f64, // s between activations
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self { delay: 1.0 }
    }
}

/// Timed burn execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeExecutorConfig {
    pub lead_time: f64,               // s, warp stops this long before the burn
    pub g0: f64,                      // m/s², converts Isp to exhaust velocity
    pub fine_burn_time: f64,          // s, below this remaining time the throttle tapers
    pub min_throttle: f64,
    pub alignment_tolerance_deg: f64, // pointing error allowed before warping
    pub flameout_grace: f64,          // s without thrust before the burn is abandoned
}

impl Default for NodeExecutorConfig {
    fn default() -> Self {
        Self {
            lead_time: 5.0,
            g0: 9.82,
            fine_burn_time: 2.0,
            min_throttle: 0.005,
            alignment_tolerance_deg: 2.0,
            flameout_grace: 10.0,
        }
    }
}

/// Retrograde braking burn ahead of atmospheric entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeorbitConfig {
    pub target_periapsis_altitude: f64, // m
    pub alignment_tolerance_deg: f64,
    pub separation_delay: f64,          // s between cutoff and decoupling
    pub flameout_grace: f64,            // s without thrust before the burn is abandoned
}

impl Default for DeorbitConfig {
    fn default() -> Self {
        Self {
            target_periapsis_altitude: 35_000.0,
            alignment_tolerance_deg: 5.0,
            separation_delay: 1.0,
            flameout_grace: 10.0,
        }
    }
}

/// Launch-to-orbit sequencing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MissionConfig {
    /// Coast until this multiple of the atmosphere depth before planning
    /// the circularization burn.
    pub coast_altitude_factor: f64,
    pub stage_during_burns: bool,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            coast_altitude_factor: 1.01,
            stage_during_burns: true,
        }
    }
}

/// Top-level configuration, one table per controller.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutopilotConfig {
    pub attitude: PidGains,
    pub ascent: AscentConfig,
    pub staging: StagingConfig,
    pub executor: NodeExecutorConfig,
    pub deorbit: DeorbitConfig,
    pub mission: MissionConfig,
}

impl AutopilotConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load a configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Every setting, defaults included, as a TOML document.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        std::fs::write(path.as_ref(), self.to_toml_string()?)?;
        Ok(())
    }
}
