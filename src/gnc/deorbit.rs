use nalgebra::Vector3;

use crate::config::{DeorbitConfig, PidGains};
use crate::error::GncError;
use crate::vessel::{ReferenceFrame, Vessel};
use crate::{event, info, warn};
use super::attitude::AttitudeController;
use super::phase::{PhaseController, PhaseStatus};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeorbitPhase {
    Orienting,
    Braking,
    Separating { until: f64 },
    Done,
}

/// Lowers the periapsis into the atmosphere with a retrograde burn, then
/// drops the spent stage once the engine has been shut down for
/// `separation_delay` seconds.
#[derive(Debug, Clone)]
pub struct DeorbitBurn {
    config: DeorbitConfig,
    attitude: AttitudeController,
    phase: DeorbitPhase,
    idle_since: Option<f64>,
}

impl DeorbitBurn {
    pub fn new<V: Vessel + ?Sized>(
        vessel: &mut V,
        config: &DeorbitConfig,
        gains: &PidGains,
    ) -> Result<Self, GncError> {
        let orbit = vessel.orbit();
        if !orbit.is_closed() {
            return Err(GncError::InvalidOrbit("deorbit from an open trajectory".into()));
        }
        // retrograde
        let attitude = AttitudeController::new(ReferenceFrame::Orbital, -Vector3::y(), None, gains)?;
        vessel.set_throttle(0.0);
        info!(
            "Deorbit: periapsis {:.0} m, target {:.0} m",
            orbit.periapsis_altitude(),
            config.target_periapsis_altitude
        );
        Ok(Self {
            config: config.clone(),
            attitude,
            phase: DeorbitPhase::Orienting,
            idle_since: None,
        })
    }

    pub fn phase(&self) -> DeorbitPhase {
        self.phase
    }

    fn enter(&mut self, phase: DeorbitPhase) {
        info!("Deorbit: {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }
}

impl<V: Vessel + ?Sized> PhaseController<V> for DeorbitBurn {
    fn tick(&mut self, vessel: &mut V) -> Result<PhaseStatus, GncError> {
        let ut = vessel.ut();
        match self.phase {
            DeorbitPhase::Orienting => {
                let flight = self.attitude.tick(vessel);
                let error = self.attitude.pointing_error(&flight);
                if error < self.config.alignment_tolerance_deg.to_radians() {
                    vessel.set_throttle(1.0);
                    self.enter(DeorbitPhase::Braking);
                }
            }
            DeorbitPhase::Braking => {
                self.attitude.tick(vessel);
                let periapsis = vessel.orbit().periapsis_altitude();
                if periapsis <= self.config.target_periapsis_altitude {
                    vessel.set_throttle(0.0);
                    self.attitude.release(vessel);
                    info!("Deorbit: cutoff with periapsis {:.0} m", periapsis);
                    self.enter(DeorbitPhase::Separating { until: ut + self.config.separation_delay });
                    return Ok(PhaseStatus::InProgress);
                }

                if vessel.state().available_thrust > 0.0 {
                    self.idle_since = None;
                } else {
                    let idle_for = ut - *self.idle_since.get_or_insert(ut);
                    if idle_for > self.config.flameout_grace {
                        vessel.set_throttle(0.0);
                        self.attitude.release(vessel);
                        warn!("Deorbit: no thrust for {:.1} s, periapsis {:.0} m", idle_for, periapsis);
                        return Err(GncError::Flameout { idle_for });
                    }
                }
                event!("deorbit pe={:.0}", periapsis);
            }
            DeorbitPhase::Separating { until } => {
                if ut >= until {
                    vessel.activate_next_stage();
                    info!("Deorbit: separated, descending");
                    self.enter(DeorbitPhase::Done);
                    return Ok(PhaseStatus::Done);
                }
            }
            DeorbitPhase::Done => return Ok(PhaseStatus::Done),
        }
        Ok(PhaseStatus::InProgress)
    }

    fn name(&self) -> &str {
        "deorbit"
    }
}
