use thiserror::Error;

use crate::orbital::NodeId;

/// Failures reported by controllers, planners and phase controllers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GncError {
    #[error("target direction has zero length")]
    DegenerateDirection,
    #[error("orbit cannot be planned against: {0}")]
    InvalidOrbit(String),
    #[error("maneuver node {0} no longer exists")]
    NodeMissing(NodeId),
    #[error("engine flameout: no thrust available for {idle_for:.1} s during burn")]
    Flameout { idle_for: f64 },
    #[error("phase `{phase}` exceeded its deadline of {limit:.1} s")]
    DeadlineExceeded { phase: String, limit: f64 },
}

/// Errors that can occur while loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("failed to write TOML: {0}")]
    TomlWrite(#[from] toml::ser::Error),
}
