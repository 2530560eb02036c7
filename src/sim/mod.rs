//! Deterministic vessel simulation used to fly the controllers offline.

pub mod body;
pub mod dynamics;
pub mod integrator;
pub mod runner;
pub mod stage;
pub mod state;
pub mod vessel;

pub use body::{kerbin, CelestialBody, G0};
pub use integrator::rk4_step;
pub use runner::{FlightLog, FlightRunner, FlightSample, RunnerConfig};
pub use stage::{Stage, StageBuilder};
pub use vessel::SimVessel;
