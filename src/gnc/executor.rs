use nalgebra::Vector3;

use crate::config::{NodeExecutorConfig, PidGains};
use crate::error::GncError;
use crate::orbital::NodeId;
use crate::vessel::{ReferenceFrame, Vessel};
use crate::{event, info, warn};
use super::attitude::AttitudeController;
use super::phase::{PhaseController, PhaseStatus};

// ---------------------------------------------------------------------------
// Rocket-equation burn timing
// ---------------------------------------------------------------------------

/// Time to change velocity by `delta_v` at constant thrust.
///
/// `isp` is in seconds and converted to exhaust velocity with `g0`.
/// Returns `None` when the burn cannot be timed (no thrust, no Isp or a
/// non-finite result).
pub fn burn_time(thrust: f64, isp: f64, mass: f64, delta_v: f64, g0: f64) -> Option<f64> {
    if !(thrust > 0.0 && isp > 0.0) {
        return None;
    }
    let ve = isp * g0;
    let m1 = mass / (delta_v / ve).exp();
    let flow_rate = thrust / ve;
    let t = (mass - m1) / flow_rate;
    t.is_finite().then_some(t)
}

/// Throttle that would finish `delta_v` in exactly `over` seconds.
fn tapered_throttle(available_thrust: f64, isp: f64, mass: f64, delta_v: f64, g0: f64, over: f64) -> f64 {
    let ve = isp * g0;
    let m1 = mass / (delta_v / ve).exp();
    let thrust = (mass - m1) / over * ve;
    thrust / available_thrust
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorState {
    Orienting,
    Warping,
    Waiting,
    BurningFull,
    BurningFine,
    Done,
}

// ---------------------------------------------------------------------------
// Node executor
// ---------------------------------------------------------------------------

/// Flies one maneuver node: points along the burn vector, warps to just
/// before the burn, burns centred on the node time and tapers the throttle
/// over the last seconds. Removing the node afterwards is up to the caller.
#[derive(Debug, Clone)]
pub struct NodeExecutor {
    node: NodeId,
    burn_time: f64,
    config: NodeExecutorConfig,
    attitude: AttitudeController,
    state: ExecutorState,
    idle_since: Option<f64>,
}

impl NodeExecutor {
    pub fn new<V: Vessel + ?Sized>(
        vessel: &mut V,
        node: NodeId,
        config: &NodeExecutorConfig,
        gains: &PidGains,
    ) -> Result<Self, GncError> {
        let planned = vessel.node(node).ok_or(GncError::NodeMissing(node))?;
        let st = vessel.state();
        let burn_time = match burn_time(
            st.available_thrust,
            st.specific_impulse,
            st.mass,
            planned.delta_v(),
            config.g0,
        ) {
            Some(t) => t,
            None => {
                warn!("Node {}: no thrust available, burn time unknown", node);
                0.0
            }
        };
        let attitude =
            AttitudeController::new(ReferenceFrame::Maneuver(node), Vector3::y(), None, gains)?;

        info!(
            "Node {}: {:.1} m/s at UT {:.1}, estimated burn {:.1} s",
            node,
            planned.delta_v(),
            planned.ut,
            burn_time
        );
        Ok(Self {
            node,
            burn_time,
            config: config.clone(),
            attitude,
            state: ExecutorState::Orienting,
            idle_since: None,
        })
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn burn_time(&self) -> f64 {
        self.burn_time
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Cut the engine and stop steering before handing `err` back.
    fn abort<V: Vessel + ?Sized>(&mut self, vessel: &mut V, err: GncError) -> GncError {
        vessel.set_throttle(0.0);
        self.attitude.release(vessel);
        err
    }

    fn enter(&mut self, state: ExecutorState) {
        if self.state != state {
            event!("node {}: {:?} -> {:?}", self.node, self.state, state);
            self.state = state;
        }
    }
}

impl<V: Vessel + ?Sized> PhaseController<V> for NodeExecutor {
    fn tick(&mut self, vessel: &mut V) -> Result<PhaseStatus, GncError> {
        if self.state == ExecutorState::Done {
            return Ok(PhaseStatus::Done);
        }
        let Some(node) = vessel.node(self.node) else {
            return Err(self.abort(vessel, GncError::NodeMissing(self.node)));
        };
        let ut = vessel.ut();
        let flight = self.attitude.tick(vessel);

        let burn_ut = node.ut - self.burn_time / 2.0;
        let warp_until = burn_ut - self.config.lead_time;
        if ut < warp_until {
            let pointing = self.attitude.pointing_error(&flight);
            if pointing > self.config.alignment_tolerance_deg.to_radians() {
                self.enter(ExecutorState::Orienting);
            } else {
                if self.state != ExecutorState::Warping {
                    info!("Node {}: aligned, warping to UT {:.1}", self.node, warp_until);
                }
                // re-sent every tick in case the vessel dropped out of warp
                vessel.warp_to(warp_until);
                self.enter(ExecutorState::Warping);
            }
            return Ok(PhaseStatus::InProgress);
        }
        if ut < burn_ut {
            self.enter(ExecutorState::Waiting);
            return Ok(PhaseStatus::InProgress);
        }

        let Some(remaining) = vessel.remaining_burn_vector(self.node) else {
            return Err(self.abort(vessel, GncError::NodeMissing(self.node)));
        };
        let dv = remaining.y;
        let st = vessel.state();
        let g0 = self.config.g0;

        let remaining_time = match burn_time(st.available_thrust, st.specific_impulse, st.mass, dv, g0) {
            Some(t) => {
                self.idle_since = None;
                t
            }
            None => {
                let since = *self.idle_since.get_or_insert(ut);
                let idle_for = ut - since;
                if idle_for > self.config.flameout_grace {
                    warn!("Node {}: no thrust for {:.1} s", self.node, idle_for);
                    return Err(self.abort(vessel, GncError::Flameout { idle_for }));
                }
                event!("node {}: burn time not measurable", self.node);
                return Ok(PhaseStatus::InProgress);
            }
        };

        if remaining_time > self.config.fine_burn_time {
            vessel.set_throttle(1.0);
            self.enter(ExecutorState::BurningFull);
        } else if dv > 0.0 {
            let throttle = tapered_throttle(
                st.available_thrust,
                st.specific_impulse,
                st.mass,
                dv,
                g0,
                self.config.fine_burn_time,
            );
            vessel.set_throttle(throttle.max(self.config.min_throttle));
            self.enter(ExecutorState::BurningFine);
        } else {
            vessel.set_throttle(0.0);
            self.attitude.release(vessel);
            self.enter(ExecutorState::Done);
            info!("Node {}: burn complete, {:.2} m/s residual", self.node, remaining.norm());
            return Ok(PhaseStatus::Done);
        }
        event!("node {}: dv {:.2} m/s, {:.2} s left", self.node, dv, remaining_time);
        Ok(PhaseStatus::InProgress)
    }

    fn name(&self) -> &str {
        "node-executor"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orbital::{circularize, Apsis, ManeuverNode, OrbitState};
    use crate::sim::{kerbin, FlightRunner, RunnerConfig, SimVessel, StageBuilder};
    use crate::vessel::{Actuation, RotationCommand, Telemetry};

    #[test]
    fn burn_time_closed_form() {
        let (f, isp, m0, dv) = (200_000.0, 300.0, 5000.0, 500.0);
        let expected = (m0 - m0 / (dv / (isp * 9.82_f64)).exp()) / (f / (isp * 9.82));
        assert_eq!(burn_time(f, isp, m0, dv, 9.82), Some(expected));
    }

    #[test]
    fn burn_time_unmeasurable() {
        assert_eq!(burn_time(0.0, 300.0, 5000.0, 100.0, 9.82), None);
        assert_eq!(burn_time(1000.0, 0.0, 5000.0, 100.0, 9.82), None);
        assert_eq!(burn_time(f64::NAN, 300.0, 5000.0, 100.0, 9.82), None);
    }

    #[test]
    fn taper_finishes_in_requested_time() {
        let (f, isp, m, dv) = (60_000.0, 320.0, 4000.0, 10.0);
        let throttle = tapered_throttle(f, isp, m, dv, 9.82, 2.0);
        let t = burn_time(f * throttle, isp, m, dv, 9.82).unwrap();
        assert!((t - 2.0).abs() < 1e-9);
    }

    fn orbiting_vessel(ap: f64, pe: f64, true_anom: f64) -> SimVessel {
        let body = kerbin();
        let a = (ap + pe) / 2.0 + body.radius;
        let e = (ap - pe) / (ap + pe + 2.0 * body.radius);
        let orbit = OrbitState::from_elements(body.primary(), a, e, 0.0, 0.0, 0.0, true_anom);
        let stage = StageBuilder::new("orbiter")
            .dry_mass(1_500.0)
            .propellant_mass(2_000.0)
            .thrust(60_000.0)
            .isp(320.0)
            .build();
        SimVessel::in_orbit(body, vec![stage], &orbit)
    }

    #[test]
    fn missing_node_is_an_error() {
        let mut vessel = orbiting_vessel(100_000.0, 80_000.0, 0.0);
        let err = NodeExecutor::new(&mut vessel, NodeId(42), &NodeExecutorConfig::default(), &PidGains::default());
        assert_eq!(err.unwrap_err(), GncError::NodeMissing(NodeId(42)));

        let id = vessel.add_node(ManeuverNode::prograde(vessel.ut() + 100.0, 10.0));
        let mut exec =
            NodeExecutor::new(&mut vessel, id, &NodeExecutorConfig::default(), &PidGains::default())
                .unwrap();
        vessel.set_throttle(1.0);
        vessel.remove_node(id);
        assert_eq!(exec.tick(&mut vessel), Err(GncError::NodeMissing(id)));
        assert_eq!(vessel.state().throttle, 0.0);
        assert_eq!(vessel.rotation_command(), RotationCommand::zero());
    }

    #[test]
    fn warp_is_requested_again_after_dropping_out() {
        let mut vessel = orbiting_vessel(100_000.0, 80_000.0, 0.0);
        let id = vessel.add_node(ManeuverNode::prograde(vessel.ut() + 600.0, 20.0));
        let mut exec =
            NodeExecutor::new(&mut vessel, id, &NodeExecutorConfig::default(), &PidGains::default())
                .unwrap();

        let mut ticks = 0;
        loop {
            exec.tick(&mut vessel).unwrap();
            if exec.state() == ExecutorState::Warping {
                break;
            }
            for _ in 0..5 {
                vessel.step(0.02);
            }
            ticks += 1;
            assert!(ticks < 1000, "never aligned");
        }
        assert!(vessel.is_warping());

        vessel.stop_warp();
        assert_eq!(exec.tick(&mut vessel), Ok(PhaseStatus::InProgress));
        assert_eq!(exec.state(), ExecutorState::Warping);
        assert!(vessel.is_warping());
    }

    #[test]
    fn fine_burn_never_drops_below_min_throttle() {
        let mut vessel = orbiting_vessel(100_000.0, 80_000.0, 0.0);
        let id = vessel.add_node(ManeuverNode::prograde(vessel.ut(), 0.001));
        let config = NodeExecutorConfig::default();
        let mut exec = NodeExecutor::new(&mut vessel, id, &config, &PidGains::default()).unwrap();

        assert_eq!(exec.tick(&mut vessel), Ok(PhaseStatus::InProgress));
        assert_eq!(exec.state(), ExecutorState::BurningFine);
        assert_eq!(vessel.state().throttle, config.min_throttle);
    }

    #[test]
    fn throttle_holds_through_thrust_loss_until_grace_ends() {
        let mut vessel = orbiting_vessel(100_000.0, 80_000.0, 0.0);
        let id = vessel.add_node(ManeuverNode::prograde(vessel.ut() + 2.0, 400.0));
        let config = NodeExecutorConfig::default();
        let mut exec = NodeExecutor::new(&mut vessel, id, &config, &PidGains::default()).unwrap();

        for _ in 0..20 {
            assert_eq!(exec.tick(&mut vessel), Ok(PhaseStatus::InProgress));
            for _ in 0..5 {
                vessel.step(0.02);
            }
        }
        assert_eq!(exec.state(), ExecutorState::BurningFull);
        assert_eq!(vessel.state().throttle, 1.0);

        // tanks run dry mid-burn
        vessel.drain_stage(0);
        let dry_at = vessel.ut();
        let mut failure = None;
        for _ in 0..200 {
            match exec.tick(&mut vessel) {
                Ok(status) => {
                    assert_eq!(status, PhaseStatus::InProgress);
                    assert_eq!(exec.state(), ExecutorState::BurningFull);
                    assert_eq!(vessel.state().throttle, 1.0);
                }
                Err(err) => {
                    failure = Some(err);
                    break;
                }
            }
            for _ in 0..5 {
                vessel.step(0.02);
            }
        }

        assert!(matches!(failure, Some(GncError::Flameout { .. })), "{:?}", failure);
        assert!(vessel.ut() - dry_at > config.flameout_grace);
        assert_eq!(vessel.state().throttle, 0.0);
        assert_eq!(vessel.rotation_command(), RotationCommand::zero());
    }

    #[test]
    fn does_not_warp_before_aligned() {
        let mut vessel = orbiting_vessel(100_000.0, 80_000.0, 0.0);
        // radial burn: far from the prograde attitude the vessel starts in
        let id = vessel.add_node(ManeuverNode::new(vessel.ut() + 600.0, 0.0, 0.0, 20.0));
        let mut exec =
            NodeExecutor::new(&mut vessel, id, &NodeExecutorConfig::default(), &PidGains::default())
                .unwrap();
        assert_eq!(exec.tick(&mut vessel), Ok(PhaseStatus::InProgress));
        assert_eq!(exec.state(), ExecutorState::Orienting);
        assert!(!vessel.is_warping());
    }

    #[test]
    fn flameout_is_reported_after_grace() {
        let body = kerbin();
        let orbit = OrbitState::circular(body.primary(), 100_000.0, 0.0);
        let dry = StageBuilder::new("dry").propellant_mass(0.0).build();
        let mut vessel = SimVessel::in_orbit(body, vec![dry], &orbit);
        let id = vessel.add_node(ManeuverNode::prograde(vessel.ut() + 1.0, 10.0));
        let exec =
            NodeExecutor::new(&mut vessel, id, &NodeExecutorConfig::default(), &PidGains::default())
                .unwrap();
        assert_eq!(exec.burn_time(), 0.0);

        let err = FlightRunner::new(RunnerConfig::default())
            .run(&mut vessel, exec)
            .unwrap_err();
        match err {
            GncError::Flameout { idle_for } => assert!(idle_for > 10.0 && idle_for < 10.5),
            other => panic!("expected flameout, got {:?}", other),
        }
        assert_eq!(vessel.state().throttle, 0.0);
    }

    #[test]
    fn circularizes_at_apoapsis() {
        let mut vessel = orbiting_vessel(100_000.0, 75_000.0, 0.3);
        let orbit = vessel.orbit();
        let node = circularize(&orbit, vessel.ut(), Apsis::Apoapsis).unwrap();
        let id = vessel.add_node(node);
        let exec =
            NodeExecutor::new(&mut vessel, id, &NodeExecutorConfig::default(), &PidGains::default())
                .unwrap();
        assert!(exec.burn_time() > 0.5 && exec.burn_time() < 5.0);

        let log = FlightRunner::new(RunnerConfig::default())
            .run(&mut vessel, exec)
            .unwrap();
        vessel.remove_node(id);

        let after = vessel.orbit();
        assert!(after.eccentricity < 0.005, "e = {}", after.eccentricity);
        assert!(after.periapsis_altitude() > 97_000.0, "pe = {}", after.periapsis_altitude());
        assert!(after.apoapsis_altitude() < 103_000.0, "ap = {}", after.apoapsis_altitude());
        assert_eq!(vessel.state().throttle, 0.0);
        // the burn straddled the node time
        let node_ut = node.ut;
        let burning: Vec<_> = log.samples.iter().filter(|s| s.throttle > 0.0).collect();
        assert!(!burning.is_empty());
        assert!(burning[0].time < node_ut && burning[burning.len() - 1].time > node_ut);
    }
}
