use crate::error::GncError;
use crate::event;
use crate::orbital::kepler::wrap_pi;
use crate::vessel::{FlightFrame, ReferenceFrame, RotationCommand, Vessel};
use super::phase::{PhaseController, PhaseStatus};
use super::throttle::{MaxSpeedLimiter, ThrottleController};

// ---------------------------------------------------------------------------
// Proportional holds for winged flight
// ---------------------------------------------------------------------------

/// Roll command proportional to the bank angle error.
#[derive(Debug, Clone, Copy)]
pub struct RollHold {
    pub target: f64, // rad
    pub gain: f64,
}

impl RollHold {
    pub fn new(target_deg: f64) -> Self {
        Self { target: target_deg.to_radians(), gain: 1.0 }
    }

    pub fn error(&self, flight: &FlightFrame) -> f64 {
        wrap_pi(self.target - flight.roll)
    }

    pub fn command(&self, flight: &FlightFrame) -> f64 {
        (self.error(flight) * self.gain).clamp(-1.0, 1.0)
    }
}

/// Pitch command proportional to the flight-path angle error, where the
/// flight-path angle is the climb angle of the velocity vector.
#[derive(Debug, Clone, Copy)]
pub struct PitchHold {
    pub target: f64, // rad
    pub gain: f64,
}

impl PitchHold {
    pub fn new(target_deg: f64) -> Self {
        Self { target: target_deg.to_radians(), gain: 1.0 }
    }

    /// Expects a surface-frame snapshot, where z is up.
    pub fn flight_path_angle(flight: &FlightFrame) -> f64 {
        flight.prograde.z.clamp(-1.0, 1.0).asin()
    }

    pub fn error(&self, flight: &FlightFrame) -> f64 {
        self.target - Self::flight_path_angle(flight)
    }

    pub fn command(&self, flight: &FlightFrame) -> f64 {
        (self.error(flight) * self.gain).clamp(-1.0, 1.0)
    }
}

/// Wing leveler: holds a bank angle and a flight-path angle, and keeps the
/// speed under a ceiling. Runs until the caller stops ticking it.
#[derive(Debug, Clone)]
pub struct Stabilizer {
    pub roll: RollHold,
    pub pitch: PitchHold,
    pub throttle: MaxSpeedLimiter,
}

impl Stabilizer {
    pub fn new(roll_deg: f64, flight_path_deg: f64, max_speed: f64) -> Self {
        Self {
            roll: RollHold::new(roll_deg),
            pitch: PitchHold::new(flight_path_deg),
            throttle: MaxSpeedLimiter::new(max_speed),
        }
    }
}

impl Default for Stabilizer {
    /// Level flight under 200 m/s.
    fn default() -> Self {
        Self::new(0.0, 0.0, 200.0)
    }
}

impl<V: Vessel + ?Sized> PhaseController<V> for Stabilizer {
    fn tick(&mut self, vessel: &mut V) -> Result<PhaseStatus, GncError> {
        let flight = vessel.flight(ReferenceFrame::Surface);
        let cmd = RotationCommand::new(self.pitch.command(&flight), 0.0, self.roll.command(&flight));
        vessel.set_rotation(cmd);
        let throttle = self.throttle.update(vessel);
        event!(
            "stabilizer roll={:.1} fpa={:.1} throttle={:.2}",
            flight.roll.to_degrees(),
            PitchHold::flight_path_angle(&flight).to_degrees(),
            throttle
        );
        Ok(PhaseStatus::InProgress)
    }

    fn name(&self) -> &str {
        "stabilizer"
    }
}
