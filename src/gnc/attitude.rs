use std::f64::consts::FRAC_PI_2;

use nalgebra::Vector3;

use crate::config::PidGains;
use crate::error::GncError;
use crate::orbital::kepler::wrap_pi;
use crate::vessel::{Actuation, FlightFrame, ReferenceFrame, RotationCommand, Telemetry};
use super::rate::RotationRateController;

/// Unit vector along `direction`, rejecting zero-length and non-finite input.
pub fn unit_direction(direction: &Vector3<f64>) -> Result<Vector3<f64>, GncError> {
    let norm = direction.norm();
    if !norm.is_finite() || norm < 1e-12 {
        return Err(GncError::DegenerateDirection);
    }
    Ok(direction / norm)
}

/// Where the vessel should point. `roll: None` leaves roll unconstrained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerTarget {
    direction: Vector3<f64>,
    pub roll: Option<f64>, // rad
}

impl ControllerTarget {
    pub fn new(direction: Vector3<f64>, roll: Option<f64>) -> Result<Self, GncError> {
        Ok(Self {
            direction: unit_direction(&direction)?,
            roll,
        })
    }

    pub fn direction(&self) -> &Vector3<f64> {
        &self.direction
    }
}

// ---------------------------------------------------------------------------
// Attitude hold: target direction (+ roll) -> target angular velocity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AttitudeController {
    target: ControllerTarget,
    rate: RotationRateController,
}

impl AttitudeController {
    pub fn new(
        frame: ReferenceFrame,
        direction: Vector3<f64>,
        roll: Option<f64>,
        gains: &PidGains,
    ) -> Result<Self, GncError> {
        Ok(Self {
            target: ControllerTarget::new(direction, roll)?,
            rate: RotationRateController::new(frame, gains),
        })
    }

    pub fn frame(&self) -> ReferenceFrame {
        self.rate.frame
    }

    pub fn target(&self) -> &ControllerTarget {
        &self.target
    }

    pub fn set_target_direction(&mut self, direction: Vector3<f64>) -> Result<(), GncError> {
        self.target.direction = unit_direction(&direction)?;
        Ok(())
    }

    pub fn set_target_roll(&mut self, roll: Option<f64>) {
        self.target.roll = roll;
    }

    /// Roll error wrapped to (-π, π]; zero when roll is unconstrained.
    pub fn roll_error(&self, flight: &FlightFrame) -> f64 {
        match self.target.roll {
            Some(roll) => wrap_pi(roll - flight.roll),
            None => 0.0,
        }
    }

    /// Angular velocity that turns the current direction onto the target.
    pub fn rate_target(&self, flight: &FlightFrame) -> Vector3<f64> {
        let t = self.target.direction;
        let mut rate = t.cross(&flight.direction);
        // Pointing directly away: the cross product vanishes, pitch over
        if rate.norm() < 1e-3 && t.dot(&flight.direction) < 0.0 {
            rate = flight.pitch_axis;
        }
        if self.target.roll.is_some() {
            rate += t * (self.roll_error(flight) / FRAC_PI_2);
        }
        rate
    }

    /// Angle between the target and the current direction, rad.
    pub fn pointing_error(&self, flight: &FlightFrame) -> f64 {
        self.target.direction.angle(&flight.direction)
    }

    pub fn command(&mut self, flight: &FlightFrame) -> RotationCommand {
        self.rate.target = self.rate_target(flight);
        self.rate.command(flight)
    }

    /// Sample the vessel once and write the rotation command.
    /// Returns the frame that was sampled.
    pub fn tick<V: Telemetry + Actuation + ?Sized>(&mut self, vessel: &mut V) -> FlightFrame {
        let flight = vessel.flight(self.rate.frame);
        let cmd = self.command(&flight);
        vessel.set_rotation(cmd);
        flight
    }

    /// Stop steering.
    pub fn release<V: Actuation + ?Sized>(&mut self, vessel: &mut V) {
        vessel.set_rotation(RotationCommand::zero());
    }
}
