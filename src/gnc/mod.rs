//! Guidance, navigation and control: the controllers and the phase
//! controllers built from them.

pub mod attitude;
pub mod deorbit;
pub mod executor;
pub mod guidance;
pub mod mission;
pub mod phase;
pub mod pid;
pub mod rate;
pub mod stabilizer;
pub mod staging;
pub mod throttle;

pub use attitude::{AttitudeController, ControllerTarget};
pub use deorbit::{DeorbitBurn, DeorbitPhase};
pub use executor::{burn_time, ExecutorState, NodeExecutor};
pub use guidance::{pitch_program, AscentGuidance, AscentPhase};
pub use mission::{LaunchToOrbit, MissionPhase};
pub use phase::{Deadline, PhaseController, PhaseStatus};
pub use pid::Pid;
pub use rate::RotationRateController;
pub use stabilizer::{PitchHold, RollHold, Stabilizer};
pub use staging::{AutoStager, StagerState};
pub use throttle::{MaxDynamicPressureLimiter, MaxSpeedLimiter, ThrottleController};
