//! Vehicle interface consumed by the controllers.
//!
//! Telemetry accessors re-sample the vehicle on every call; controllers read
//! each signal once per tick into locals. Commands are plain setters and the
//! implementation is responsible for clamping them into range.

pub mod clock;

use nalgebra::Vector3;

use crate::orbital::{ManeuverNode, NodeId, OrbitState};

pub use clock::{Clock, ManualClock, WallClock};

// ---------------------------------------------------------------------------
// Reference frames and snapshots
// ---------------------------------------------------------------------------

/// Coordinate frame a `FlightFrame` is expressed in. All are right-handed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceFrame {
    /// Non-rotating, centred on the primary body.
    Inertial,
    /// Local east, north, up at the vessel position.
    Surface,
    /// x radial (outward), y prograde, z orbit normal.
    Orbital,
    /// +Y along the node's burn vector, x towards radial-out.
    Maneuver(NodeId),
}

/// Vessel kinematics expressed in one reference frame.
///
/// `angular_velocity` follows the game convention: a vector fixed to the
/// vessel evolves as `dv/dt = v × ω`. With that convention a positive
/// component along `pitch_axis` raises the nose, and a positive component
/// along `direction` rolls the vessel so that `roll` increases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlightFrame {
    pub direction: Vector3<f64>,        // unit, vessel forward (roll axis)
    pub pitch_axis: Vector3<f64>,       // unit
    pub yaw_axis: Vector3<f64>,         // unit
    pub angular_velocity: Vector3<f64>, // rad/s
    pub prograde: Vector3<f64>,         // unit velocity direction, zero at rest
    pub pitch: f64,                     // rad above the local horizon
    pub heading: f64,                   // rad clockwise from north
    pub roll: f64,                      // rad, (-π, π]
}

/// Scalar vessel telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VesselState {
    pub mass: f64,              // kg
    pub available_thrust: f64,  // N, active engines with fuel at full throttle
    pub specific_impulse: f64,  // s, combined over active engines; 0 when none
    pub throttle: f64,          // [0, 1]
    pub dynamic_pressure: f64,  // Pa
    pub speed: f64,             // m/s
    pub mean_altitude: f64,     // m above the body radius
}

/// One part as seen by the stager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartState {
    pub has_engine: bool,
    pub engine_active: bool,
    pub has_fuel: bool,
    pub decouple_stage: i32, // -1 when never decoupled
}

impl PartState {
    /// Engine that is lit and still has propellant.
    pub fn is_burning(&self) -> bool {
        self.has_engine && self.engine_active && self.has_fuel
    }
}

/// Rotation command, each axis in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RotationCommand {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl RotationCommand {
    pub fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    /// Clamp each axis into [-1, 1]; NaN becomes 0.
    pub fn clamped(self) -> Self {
        let c = |x: f64| if x.is_nan() { 0.0 } else { x.clamp(-1.0, 1.0) };
        Self {
            pitch: c(self.pitch),
            yaw: c(self.yaw),
            roll: c(self.roll),
        }
    }
}

/// Clamp a throttle request into [0, 1]; NaN becomes 0.
pub fn clamp_throttle(throttle: f64) -> f64 {
    if throttle.is_nan() {
        0.0
    } else {
        throttle.clamp(0.0, 1.0)
    }
}

// ---------------------------------------------------------------------------
// Vehicle traits
// ---------------------------------------------------------------------------

pub trait Telemetry {
    /// Universal time, s.
    fn ut(&self) -> f64;
    fn flight(&self, frame: ReferenceFrame) -> FlightFrame;
    fn orbit(&self) -> OrbitState;
    fn state(&self) -> VesselState;
    fn current_stage(&self) -> i32;
    fn parts_in_decouple_stage(&self, stage: i32) -> Vec<PartState>;
    fn node(&self, id: NodeId) -> Option<ManeuverNode>;
    /// Delta-v still to be applied for a node, in that node's maneuver frame
    /// (the y component is the remaining burn along the planned burn axis).
    fn remaining_burn_vector(&self, id: NodeId) -> Option<Vector3<f64>>;
}

pub trait Actuation {
    fn set_throttle(&mut self, throttle: f64);
    fn set_rotation(&mut self, command: RotationCommand);
    fn set_sas(&mut self, enabled: bool);
    fn set_rcs(&mut self, enabled: bool);
    fn activate_next_stage(&mut self);
    fn add_node(&mut self, node: ManeuverNode) -> NodeId;
    fn remove_node(&mut self, id: NodeId);
    fn remove_nodes(&mut self);
    /// Request time warp up to `ut`. Returns immediately.
    fn warp_to(&mut self, ut: f64);
}

/// Anything that can be both observed and commanded.
pub trait Vessel: Telemetry + Actuation {}

impl<T: Telemetry + Actuation + ?Sized> Vessel for T {}

/// Unit direction for a pitch above the horizon and a heading clockwise from
/// north, in the surface frame (east, north, up).
pub fn direction_from_pitch_heading(pitch: f64, heading: f64) -> Vector3<f64> {
    let (sp, cp) = pitch.sin_cos();
    let (sh, ch) = heading.sin_cos();
    Vector3::new(cp * sh, cp * ch, sp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn rotation_command_is_clamped() {
        let cmd = RotationCommand::new(3.0, -7.0, f64::NAN).clamped();
        assert_eq!(cmd, RotationCommand::new(1.0, -1.0, 0.0));
        assert_eq!(clamp_throttle(1.4), 1.0);
        assert_eq!(clamp_throttle(-0.2), 0.0);
    }

    #[test]
    fn pitch_heading_directions() {
        let up = direction_from_pitch_heading(FRAC_PI_2, FRAC_PI_2);
        assert!((up - Vector3::z()).norm() < 1e-12);
        let east = direction_from_pitch_heading(0.0, FRAC_PI_2);
        assert!((east - Vector3::x()).norm() < 1e-12);
        let north = direction_from_pitch_heading(0.0, 0.0);
        assert!((north - Vector3::y()).norm() < 1e-12);
    }
}
