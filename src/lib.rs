//! Guidance and control for rocket flight.
//!
//! Controllers talk to a vehicle through the [`vessel::Telemetry`] and
//! [`vessel::Actuation`] traits; [`sim::SimVessel`] implements both for
//! offline flights.

#[macro_use]
pub mod logger;

pub mod config;
pub mod error;
pub mod gnc;
pub mod io;
pub mod orbital;
pub mod sim;
pub mod vessel;

#[doc(hidden)]
pub use chrono;

pub use config::AutopilotConfig;
pub use error::{ConfigError, GncError};
pub use gnc::{PhaseController, PhaseStatus};
pub use vessel::{Actuation, Telemetry, Vessel};
