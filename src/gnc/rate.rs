use nalgebra::Vector3;

use crate::config::PidGains;
use crate::vessel::{Actuation, FlightFrame, ReferenceFrame, RotationCommand, Telemetry};
use super::pid::Pid;

// ---------------------------------------------------------------------------
// Angular-rate loop: target angular velocity -> pitch/yaw/roll commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RotationRateController {
    pub frame: ReferenceFrame,
    pub target: Vector3<f64>, // rad/s, in `frame`
    pid: Pid<3>,
}

impl RotationRateController {
    pub fn new(frame: ReferenceFrame, gains: &PidGains) -> Self {
        Self {
            frame,
            target: Vector3::zeros(),
            pid: Pid::from_gains(gains),
        }
    }

    /// Rate error and measured rate, both projected onto (pitch, yaw, roll).
    pub fn axis_errors(&self, flight: &FlightFrame) -> (Vector3<f64>, Vector3<f64>) {
        let project = |v: &Vector3<f64>| {
            Vector3::new(
                v.dot(&flight.pitch_axis),
                v.dot(&flight.yaw_axis),
                v.dot(&flight.direction),
            )
        };
        let measured = flight.angular_velocity;
        (project(&(self.target - measured)), project(&measured))
    }

    /// Run one step against an already sampled flight frame.
    pub fn command(&mut self, flight: &FlightFrame) -> RotationCommand {
        let (error, measured) = self.axis_errors(flight);
        let out = self.pid.update(
            &error,
            &measured,
            &Vector3::repeat(-1.0),
            &Vector3::repeat(1.0),
        );
        RotationCommand::new(out.x, out.y, out.z)
    }

    pub fn tick<V: Telemetry + Actuation + ?Sized>(&mut self, vessel: &mut V) {
        let flight = vessel.flight(self.frame);
        let cmd = self.command(&flight);
        vessel.set_rotation(cmd);
    }

    pub fn pid_mut(&mut self) -> &mut Pid<3> {
        &mut self.pid
    }
}
