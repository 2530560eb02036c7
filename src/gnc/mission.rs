use crate::config::AutopilotConfig;
use crate::error::GncError;
use crate::info;
use crate::orbital::{circularize, Apsis, NodeId};
use crate::vessel::{Clock, Vessel};
use super::executor::NodeExecutor;
use super::guidance::AscentGuidance;
use super::phase::{PhaseController, PhaseStatus};
use super::staging::AutoStager;

#[derive(Debug, Clone)]
enum Step {
    Ascent(AscentGuidance),
    Coast,
    Circularize,
    Execute { executor: NodeExecutor, node: NodeId },
    Complete,
}

/// Stage of the launch sequence, for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionPhase {
    Ascent,
    Coast,
    Circularize,
    Execute,
    Complete,
}

/// Pad to circular orbit: gravity-turn ascent with automatic staging, coast
/// out of the atmosphere, then plan and fly a circularization burn at
/// apoapsis.
#[derive(Debug, Clone)]
pub struct LaunchToOrbit<C: Clock> {
    config: AutopilotConfig,
    stager: AutoStager<C>,
    step: Step,
}

impl<C: Clock> LaunchToOrbit<C> {
    pub fn new<V: Vessel + ?Sized>(
        vessel: &mut V,
        clock: C,
        config: &AutopilotConfig,
    ) -> Result<Self, GncError> {
        let ascent = AscentGuidance::new(vessel, &config.ascent, &config.attitude)?;
        Ok(Self {
            config: config.clone(),
            stager: AutoStager::new(clock, &config.staging),
            step: Step::Ascent(ascent),
        })
    }

    pub fn phase(&self) -> MissionPhase {
        match self.step {
            Step::Ascent(_) => MissionPhase::Ascent,
            Step::Coast => MissionPhase::Coast,
            Step::Circularize => MissionPhase::Circularize,
            Step::Execute { .. } => MissionPhase::Execute,
            Step::Complete => MissionPhase::Complete,
        }
    }

    pub fn stager(&self) -> &AutoStager<C> {
        &self.stager
    }
}

impl<V: Vessel + ?Sized, C: Clock> PhaseController<V> for LaunchToOrbit<C> {
    fn tick(&mut self, vessel: &mut V) -> Result<PhaseStatus, GncError> {
        match &mut self.step {
            Step::Ascent(ascent) => {
                self.stager.update(vessel);
                if ascent.tick(vessel)?.is_done() {
                    info!("Mission: coasting out of the atmosphere");
                    self.step = Step::Coast;
                }
            }
            Step::Coast => {
                let exit = vessel.orbit().body.atmosphere_depth * self.config.mission.coast_altitude_factor;
                if vessel.state().mean_altitude >= exit {
                    self.step = Step::Circularize;
                }
            }
            Step::Circularize => {
                vessel.remove_nodes();
                let node = circularize(&vessel.orbit(), vessel.ut(), Apsis::Apoapsis)?;
                info!("Mission: circularizing with {:.1} m/s", node.delta_v());
                let id = vessel.add_node(node);
                let executor =
                    NodeExecutor::new(vessel, id, &self.config.executor, &self.config.attitude)?;
                self.step = Step::Execute { executor, node: id };
            }
            Step::Execute { executor, node } => {
                if self.config.mission.stage_during_burns {
                    self.stager.update(vessel);
                }
                if executor.tick(vessel)?.is_done() {
                    vessel.remove_node(*node);
                    let orbit = vessel.orbit();
                    info!(
                        "Mission: complete, {:.0} x {:.0} m",
                        orbit.apoapsis_altitude(),
                        orbit.periapsis_altitude()
                    );
                    self.step = Step::Complete;
                    return Ok(PhaseStatus::Done);
                }
            }
            Step::Complete => return Ok(PhaseStatus::Done),
        }
        Ok(PhaseStatus::InProgress)
    }

    fn name(&self) -> &str {
        "launch-to-orbit"
    }
}
