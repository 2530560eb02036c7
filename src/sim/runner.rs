use std::rc::Rc;

use crate::error::GncError;
use crate::gnc::{PhaseController, PhaseStatus};
use crate::vessel::{Actuation, ManualClock, ReferenceFrame, RotationCommand, Telemetry};
use crate::{info, warn};
use super::vessel::SimVessel;

// ---------------------------------------------------------------------------
// Runner configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub dt: f64,         // s, integration step
    pub control_dt: f64, // s, between phase ticks
    pub max_time: f64,   // s, simulated time before giving up
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            dt: 0.02,
            control_dt: 0.1,
            max_time: 3600.0,
        }
    }
}

impl RunnerConfig {
    /// Integration steps per control tick, at least one.
    pub fn substeps(&self) -> usize {
        ((self.control_dt / self.dt).round() as usize).max(1)
    }
}

// ---------------------------------------------------------------------------
// Flight log
// ---------------------------------------------------------------------------

/// One row of telemetry, taken after each control tick.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightSample {
    pub time: f64,               // s
    pub altitude: f64,           // m above the mean radius
    pub speed: f64,              // m/s, inertial
    pub apoapsis_altitude: f64,  // m
    pub periapsis_altitude: f64, // m
    pub pitch_deg: f64,
    pub heading_deg: f64,
    pub throttle: f64,
    pub dynamic_pressure: f64,   // Pa
    pub mass: f64,               // kg
    pub stage: i32,
}

impl FlightSample {
    pub fn capture(vessel: &SimVessel) -> Self {
        let state = vessel.state();
        let orbit = vessel.orbit();
        let flight = vessel.flight(ReferenceFrame::Surface);
        Self {
            time: vessel.ut(),
            altitude: state.mean_altitude,
            speed: state.speed,
            apoapsis_altitude: orbit.apoapsis_altitude(),
            periapsis_altitude: orbit.periapsis_altitude(),
            pitch_deg: flight.pitch.to_degrees(),
            heading_deg: flight.heading.to_degrees(),
            throttle: state.throttle,
            dynamic_pressure: state.dynamic_pressure,
            mass: state.mass,
            stage: vessel.current_stage(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FlightLog {
    pub samples: Vec<FlightSample>,
}

impl FlightLog {
    pub fn last(&self) -> Option<&FlightSample> {
        self.samples.last()
    }

    pub fn max_dynamic_pressure(&self) -> f64 {
        self.samples.iter().map(|s| s.dynamic_pressure).fold(0.0, f64::max)
    }

    pub fn max_altitude(&self) -> f64 {
        self.samples
            .iter()
            .map(|s| s.altitude)
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

// ---------------------------------------------------------------------------
// Closed-loop runner
// ---------------------------------------------------------------------------

/// Drives a phase against a simulated vessel: tick the phase, integrate
/// `control_dt` seconds of flight, record a sample, repeat until the phase
/// reports `Done`.
#[derive(Debug, Clone, Default)]
pub struct FlightRunner {
    config: RunnerConfig,
    clock: Option<Rc<ManualClock>>,
}

impl FlightRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config, clock: None }
    }

    /// Keep `clock` in step with vessel time, for controllers that read a
    /// clock of their own.
    pub fn with_clock(mut self, clock: Rc<ManualClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn run<P>(&self, vessel: &mut SimVessel, mut phase: P) -> Result<FlightLog, GncError>
    where
        P: PhaseController<SimVessel>,
    {
        let start = vessel.ut();
        let substeps = self.config.substeps();
        let mut log = FlightLog::default();
        info!("Runner: starting {} at UT {:.1}", phase.name(), start);

        loop {
            if let Some(clock) = &self.clock {
                clock.set(vessel.ut());
            }
            if phase.tick(vessel)? == PhaseStatus::Done {
                log.samples.push(FlightSample::capture(vessel));
                info!("Runner: {} done at UT {:.1}", phase.name(), vessel.ut());
                return Ok(log);
            }
            for _ in 0..substeps {
                vessel.step(self.config.dt);
            }
            log.samples.push(FlightSample::capture(vessel));

            if vessel.ut() - start > self.config.max_time {
                warn!("Runner: {} still running after {:.0} s", phase.name(), self.config.max_time);
                vessel.set_throttle(0.0);
                vessel.set_rotation(RotationCommand::zero());
                return Err(GncError::DeadlineExceeded {
                    phase: phase.name().to_string(),
                    limit: self.config.max_time,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{kerbin, StageBuilder};
    use crate::vessel::{Actuation, Clock, Vessel};

    struct BurnFor {
        until: f64,
    }

    impl PhaseController<SimVessel> for BurnFor {
        fn tick(&mut self, vessel: &mut SimVessel) -> Result<PhaseStatus, GncError> {
            if vessel.ut() >= self.until {
                vessel.set_throttle(0.0);
                return Ok(PhaseStatus::Done);
            }
            if vessel.current_stage() > 0 {
                vessel.activate_next_stage();
            }
            vessel.set_throttle(1.0);
            Ok(PhaseStatus::InProgress)
        }

        fn name(&self) -> &str {
            "burn-for"
        }
    }

    struct Idle;

    impl<V: Vessel + ?Sized> PhaseController<V> for Idle {
        fn tick(&mut self, _vessel: &mut V) -> Result<PhaseStatus, GncError> {
            Ok(PhaseStatus::InProgress)
        }
    }

    #[test]
    fn substeps_follow_rates() {
        assert_eq!(RunnerConfig::default().substeps(), 5);
        let odd = RunnerConfig { dt: 0.5, control_dt: 0.1, max_time: 1.0 };
        assert_eq!(odd.substeps(), 1);
    }

    #[test]
    fn records_a_sample_per_tick() {
        let mut vessel = SimVessel::new(kerbin(), vec![StageBuilder::new("s").build()]);
        let log = FlightRunner::new(RunnerConfig::default())
            .run(&mut vessel, BurnFor { until: 5.0 })
            .unwrap();
        // 50 ticks of 0.1 s plus the final sample
        assert!((50..=52).contains(&log.samples.len()), "{}", log.samples.len());
        assert!(log.samples.windows(2).all(|w| w[1].time >= w[0].time));
        assert!(log.max_altitude() > 50.0);
        assert!(log.max_dynamic_pressure() > 0.0);
        assert_eq!(log.last().map(|s| s.throttle), Some(0.0));
        assert_eq!(log.samples[0].stage, 0);
    }

    #[test]
    fn gives_up_after_max_time() {
        let mut vessel = SimVessel::new(kerbin(), vec![StageBuilder::new("s").build()]);
        let config = RunnerConfig { max_time: 2.0, ..RunnerConfig::default() };
        let err = FlightRunner::new(config).run(&mut vessel, Idle).unwrap_err();
        assert_eq!(
            err,
            GncError::DeadlineExceeded { phase: "unnamed".into(), limit: 2.0 }
        );
        assert!(vessel.ut() > 2.0 && vessel.ut() < 2.2);
    }

    #[test]
    fn giving_up_cuts_the_engine() {
        let mut vessel = SimVessel::new(kerbin(), vec![StageBuilder::new("s").build()]);
        let config = RunnerConfig { max_time: 2.0, ..RunnerConfig::default() };
        let err = FlightRunner::new(config)
            .run(&mut vessel, BurnFor { until: 100.0 })
            .unwrap_err();
        assert!(matches!(err, GncError::DeadlineExceeded { .. }));
        assert_eq!(vessel.state().throttle, 0.0);
        assert_eq!(vessel.rotation_command(), RotationCommand::zero());
    }

    #[test]
    fn clock_follows_vessel_time() {
        let clock = Rc::new(ManualClock::new(-1.0));
        let mut vessel = SimVessel::new(kerbin(), vec![StageBuilder::new("s").build()]);
        FlightRunner::new(RunnerConfig::default())
            .with_clock(Rc::clone(&clock))
            .run(&mut vessel, BurnFor { until: 1.0 })
            .unwrap();
        assert!((clock.now() - vessel.ut()).abs() < 1e-9);
    }
}
