use std::f64::consts::FRAC_PI_2;

use crate::config::{AscentConfig, PidGains};
use crate::error::GncError;
use crate::vessel::{direction_from_pitch_heading, ReferenceFrame, Vessel};
use crate::{event, info};
use super::attitude::AttitudeController;
use super::phase::{PhaseController, PhaseStatus};
use super::throttle::{MaxDynamicPressureLimiter, ThrottleController};

// ---------------------------------------------------------------------------
// Guidance: desired pitch angle as a function of altitude
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AscentPhase {
    VerticalRise,
    GravityTurn,
    ProgradeCoast,
    Complete,
}

/// Which part of the pitch program applies at `altitude`.
pub fn ascent_phase(altitude: f64, turn_start: f64, turn_end: f64) -> AscentPhase {
    if altitude < turn_start {
        AscentPhase::VerticalRise
    } else if altitude < turn_end {
        AscentPhase::GravityTurn
    } else {
        AscentPhase::ProgradeCoast
    }
}

/// Pitch program: returns desired pitch angle (rad from horizontal).
/// - below `turn_start`: vertical ascent (90 deg)
/// - `turn_start` to `turn_end`: linear pitchover from 90 deg to 0
/// - above `turn_end`: horizontal
pub fn pitch_program(altitude: f64, turn_start: f64, turn_end: f64) -> f64 {
    match ascent_phase(altitude, turn_start, turn_end) {
        AscentPhase::VerticalRise => FRAC_PI_2,
        AscentPhase::GravityTurn => {
            let frac = (altitude - turn_start) / (turn_end - turn_start);
            FRAC_PI_2 * (1.0 - frac)
        }
        AscentPhase::ProgradeCoast | AscentPhase::Complete => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Ascent phase controller
// ---------------------------------------------------------------------------

/// Flies a gravity turn until the apoapsis reaches the target altitude,
/// holding dynamic pressure under max-Q on the way.
#[derive(Debug, Clone)]
pub struct AscentGuidance {
    target_apoapsis: f64,
    turn_start: f64,
    turn_end: f64,
    heading: f64, // rad
    phase: AscentPhase,
    attitude: AttitudeController,
    limiter: MaxDynamicPressureLimiter,
}

impl AscentGuidance {
    /// Prepare the vessel for launch: SAS and RCS off, full throttle,
    /// attitude hold engaged straight up in the surface frame.
    pub fn new<V: Vessel + ?Sized>(
        vessel: &mut V,
        config: &AscentConfig,
        gains: &PidGains,
    ) -> Result<Self, GncError> {
        let turn_end = vessel.orbit().body.atmosphere_depth * config.turn_end_fraction;
        let heading = config.heading_deg.to_radians();
        let attitude = AttitudeController::new(
            ReferenceFrame::Surface,
            direction_from_pitch_heading(FRAC_PI_2, heading),
            None,
            gains,
        )?;

        vessel.set_sas(false);
        vessel.set_rcs(false);
        vessel.set_throttle(1.0);

        info!(
            "Ascent to {:.0} m apoapsis, turn {:.0} m to {:.0} m",
            config.target_apoapsis_altitude, config.turn_start_altitude, turn_end
        );
        Ok(Self {
            target_apoapsis: config.target_apoapsis_altitude,
            turn_start: config.turn_start_altitude,
            turn_end,
            heading,
            phase: AscentPhase::VerticalRise,
            attitude,
            limiter: MaxDynamicPressureLimiter::new(config.max_q),
        })
    }

    pub fn phase(&self) -> AscentPhase {
        self.phase
    }

    pub fn turn_end_altitude(&self) -> f64 {
        self.turn_end
    }
}

impl<V: Vessel + ?Sized> PhaseController<V> for AscentGuidance {
    fn tick(&mut self, vessel: &mut V) -> Result<PhaseStatus, GncError> {
        if self.phase == AscentPhase::Complete {
            return Ok(PhaseStatus::Done);
        }

        let altitude = vessel.state().mean_altitude;
        let apoapsis = vessel.orbit().apoapsis_altitude();

        let phase = ascent_phase(altitude, self.turn_start, self.turn_end);
        if phase != self.phase {
            info!("Ascent: {:?} -> {:?} at {:.0} m", self.phase, phase, altitude);
            self.phase = phase;
        }
        let pitch = pitch_program(altitude, self.turn_start, self.turn_end);
        self.attitude
            .set_target_direction(direction_from_pitch_heading(pitch, self.heading))?;

        if apoapsis > self.target_apoapsis {
            vessel.set_throttle(0.0);
            self.attitude.release(vessel);
            self.phase = AscentPhase::Complete;
            info!("Ascent complete, apoapsis {:.0} m", apoapsis);
            return Ok(PhaseStatus::Done);
        }

        let throttle = self.limiter.update(vessel);
        self.attitude.tick(vessel);
        event!(
            "ascent alt={:.0} ap={:.0} pitch={:.1} throttle={:.2}",
            altitude,
            apoapsis,
            pitch.to_degrees(),
            throttle
        );
        Ok(PhaseStatus::InProgress)
    }

    fn name(&self) -> &str {
        "ascent"
    }
}
