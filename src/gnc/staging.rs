use crate::config::StagingConfig;
use crate::error::GncError;
use crate::info;
use crate::vessel::{Clock, Vessel};
use super::phase::{PhaseController, PhaseStatus};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StagerState {
    Settled,
    CoolingDown { until: f64 },
}

/// Activates the next stage once nothing in the stage about to be dropped
/// is still burning, then waits `delay` seconds before looking again.
///
/// Never reports `Done`; it is meant to be ticked alongside another phase.
#[derive(Debug, Clone)]
pub struct AutoStager<C: Clock> {
    clock: C,
    delay: f64,
    state: StagerState,
    activations: u32,
}

impl<C: Clock> AutoStager<C> {
    pub fn new(clock: C, config: &StagingConfig) -> Self {
        Self {
            clock,
            delay: config.delay,
            state: StagerState::Settled,
            activations: 0,
        }
    }

    pub fn state(&self) -> StagerState {
        self.state
    }

    pub fn activations(&self) -> u32 {
        self.activations
    }

    /// One stager step; returns true when a stage was activated.
    pub fn update<V: Vessel + ?Sized>(&mut self, vessel: &mut V) -> bool {
        let now = self.clock.now();
        if let StagerState::CoolingDown { until } = self.state {
            if now < until {
                return false;
            }
            self.state = StagerState::Settled;
        }

        let stage = vessel.current_stage();
        if stage <= 0 {
            return false;
        }
        let burning = vessel
            .parts_in_decouple_stage(stage - 1)
            .iter()
            .any(|part| part.is_burning());
        if burning {
            return false;
        }

        vessel.activate_next_stage();
        self.activations += 1;
        self.state = StagerState::CoolingDown { until: now + self.delay };
        info!("Staging: activated stage {}", stage - 1);
        true
    }
}

impl<V: Vessel + ?Sized, C: Clock> PhaseController<V> for AutoStager<C> {
    fn tick(&mut self, vessel: &mut V) -> Result<PhaseStatus, GncError> {
        self.update(vessel);
        Ok(PhaseStatus::InProgress)
    }

    fn name(&self) -> &str {
        "auto-stager"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{kerbin, SimVessel, StageBuilder};
    use crate::vessel::{Actuation, ManualClock, Telemetry};
    use std::rc::Rc;

    fn two_stage() -> SimVessel {
        SimVessel::new(
            kerbin(),
            vec![
                StageBuilder::new("booster").propellant_mass(50.0).build(),
                StageBuilder::new("upper").build(),
            ],
        )
    }

    #[test]
    fn launches_from_the_pad() {
        let clock = ManualClock::new(0.0);
        let mut vessel = two_stage();
        let mut stager = AutoStager::new(&clock, &StagingConfig::default());
        assert_eq!(vessel.current_stage(), 2);
        assert!(stager.update(&mut vessel));
        assert_eq!(vessel.current_stage(), 1);
        assert!(vessel.state().available_thrust > 0.0);
    }

    #[test]
    fn stages_once_when_fuel_runs_out() {
        let clock = Rc::new(ManualClock::new(0.0));
        let mut vessel = two_stage();
        vessel.activate_next_stage();
        vessel.set_throttle(1.0);
        let mut stager = AutoStager::new(Rc::clone(&clock), &StagingConfig::default());

        // booster has fuel: nothing happens, however often we call
        for _ in 0..20 {
            assert!(!stager.update(&mut vessel));
            clock.advance(0.1);
        }
        assert_eq!(vessel.current_stage(), 1);

        vessel.drain_stage(0);
        assert!(stager.update(&mut vessel));
        assert_eq!(vessel.current_stage(), 0);
        assert!(matches!(stager.state(), StagerState::CoolingDown { .. }));

        // inside the debounce window nothing more happens
        for _ in 0..9 {
            clock.advance(0.1);
            assert!(!stager.update(&mut vessel));
        }
        assert_eq!(stager.activations(), 1);
    }

    #[test]
    fn debounce_blocks_even_with_nothing_burning() {
        let clock = Rc::new(ManualClock::new(0.0));
        let mut vessel = SimVessel::new(
            kerbin(),
            vec![
                StageBuilder::new("a").thrust(0.0).build(),
                StageBuilder::new("b").thrust(0.0).build(),
                StageBuilder::new("c").thrust(0.0).build(),
            ],
        );
        let mut stager = AutoStager::new(Rc::clone(&clock), &StagingConfig { delay: 1.0 });
        assert!(stager.update(&mut vessel));
        clock.advance(0.5);
        assert!(!stager.update(&mut vessel));
        clock.advance(0.6);
        assert!(stager.update(&mut vessel));
        assert_eq!(stager.activations(), 2);
        match stager.state() {
            StagerState::CoolingDown { until } => assert!((until - 2.1).abs() < 1e-9),
            other => panic!("expected cooldown, got {:?}", other),
        }
    }

    #[test]
    fn nothing_left_to_stage() {
        let clock = ManualClock::new(0.0);
        let mut vessel = SimVessel::new(kerbin(), vec![StageBuilder::new("only").thrust(0.0).build()]);
        let mut stager = AutoStager::new(&clock, &StagingConfig::default());
        assert!(stager.update(&mut vessel));
        assert_eq!(vessel.current_stage(), 0);
        clock.advance(5.0);
        assert!(!stager.update(&mut vessel));
        assert_eq!(vessel.current_stage(), 0);
    }
}
