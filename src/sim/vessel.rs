use std::collections::BTreeMap;

use nalgebra::{Matrix3, UnitQuaternion, Vector3};

use crate::event;
use crate::orbital::{coast, kepler, CoastState, ManeuverNode, NodeId, OrbitState};
use crate::vessel::{
    clamp_throttle, Actuation, FlightFrame, PartState, ReferenceFrame, RotationCommand, Telemetry,
    VesselState,
};
use super::body::CelestialBody;
use super::dynamics::{dynamic_pressure, Drive};
use super::integrator::rk4_step;
use super::stage::Stage;
use super::state::{orientation, RigidState};

/// Simulated seconds per real second while warping.
const WARP_RATE: f64 = 1000.0;
/// Largest propagation step used while on rails.
const WARP_SUBSTEP: f64 = 1.0;

#[derive(Debug, Clone)]
struct StageSlot {
    stage: Stage,
    propellant: f64,
    ignited: bool,
    attached: bool,
}

impl StageSlot {
    fn burning(&self) -> bool {
        self.attached && self.ignited && self.stage.has_engine() && self.propellant > 0.0
    }

    fn mass(&self) -> f64 {
        self.stage.dry_mass + self.propellant
    }
}

#[derive(Debug, Clone)]
struct NodeRecord {
    node: ManeuverNode,
    burn: Vector3<f64>,    // inertial, fixed when the node is created
    applied: Vector3<f64>, // thrust delta-v delivered since then
}

// ---------------------------------------------------------------------------
// Simulated vessel
// ---------------------------------------------------------------------------

/// Deterministic in-process vessel: a staged rocket flying around a
/// spherical body. Implements the same telemetry and actuation interface
/// the controllers use against a real vehicle.
///
/// Staging follows the usual countdown: a rocket with `n` stages starts at
/// stage `n`; each activation decrements the counter, lights the engine of
/// the next stage up and drops the stage below it. The first activation
/// releases the launch clamps.
#[derive(Debug, Clone)]
pub struct SimVessel {
    body: CelestialBody,
    stages: Vec<StageSlot>,
    current_stage: i32,
    state: RigidState,
    throttle: f64,
    rotation: RotationCommand,
    sas: bool,
    rcs: bool,
    released: bool,
    nodes: BTreeMap<NodeId, NodeRecord>,
    next_node: u64,
    warp_target: Option<f64>,
}

impl SimVessel {
    /// On the launch pad at the equator, nose up, top side facing east.
    pub fn new(body: CelestialBody, stages: Vec<Stage>) -> Self {
        let pos = Vector3::new(body.radius, 0.0, 0.0);
        let quat = orientation(&Vector3::x(), &Vector3::y());
        Self::assemble(body, stages, pos, Vector3::zeros(), quat)
    }

    /// Already in orbit with the bottom stage lit, nose prograde.
    pub fn in_orbit(body: CelestialBody, stages: Vec<Stage>, orbit: &OrbitState) -> Self {
        let (pos, vel) = orbit.state_vector();
        let quat = orientation(&vel, &pos);
        let mut vessel = Self::assemble(body, stages, pos, vel, quat);
        vessel.activate_next_stage();
        vessel
    }

    fn assemble(
        body: CelestialBody,
        stages: Vec<Stage>,
        pos: Vector3<f64>,
        vel: Vector3<f64>,
        quat: UnitQuaternion<f64>,
    ) -> Self {
        let stages: Vec<StageSlot> = stages
            .into_iter()
            .map(|stage| StageSlot {
                propellant: stage.propellant_mass,
                stage,
                ignited: false,
                attached: true,
            })
            .collect();
        let current_stage = stages.len() as i32;
        let mut vessel = Self {
            body,
            stages,
            current_stage,
            state: RigidState {
                time: 0.0,
                pos,
                vel,
                quat,
                omega: Vector3::zeros(),
                mass: 0.0,
            },
            throttle: 0.0,
            rotation: RotationCommand::zero(),
            sas: false,
            rcs: false,
            released: false,
            nodes: BTreeMap::new(),
            next_node: 0,
            warp_target: None,
        };
        vessel.state.mass = vessel.total_mass();
        vessel
    }

    // -----------------------------------------------------------------------
    // Inspection helpers
    // -----------------------------------------------------------------------

    pub fn body(&self) -> &CelestialBody {
        &self.body
    }

    pub fn rigid_state(&self) -> &RigidState {
        &self.state
    }

    pub fn orientation(&self) -> UnitQuaternion<f64> {
        self.state.quat
    }

    /// Point the vessel without going through the controllers.
    pub fn set_orientation(&mut self, quat: UnitQuaternion<f64>) {
        self.state.quat = quat;
    }

    /// Angular velocity in body axes, game sign convention.
    pub fn set_body_rates(&mut self, omega: Vector3<f64>) {
        self.state.omega = omega;
    }

    pub fn sas(&self) -> bool {
        self.sas
    }

    pub fn rcs(&self) -> bool {
        self.rcs
    }

    pub fn rotation_command(&self) -> RotationCommand {
        self.rotation
    }

    pub fn is_warping(&self) -> bool {
        self.warp_target.is_some()
    }

    /// Drop out of warp at the current time.
    pub fn stop_warp(&mut self) {
        self.warp_target = None;
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Empty a stage's tanks.
    pub fn drain_stage(&mut self, index: usize) {
        if let Some(slot) = self.stages.get_mut(index) {
            slot.propellant = 0.0;
        }
        self.state.mass = self.total_mass();
    }

    fn total_mass(&self) -> f64 {
        self.stages.iter().filter(|s| s.attached).map(StageSlot::mass).sum()
    }

    fn altitude(&self) -> f64 {
        self.body.altitude(&self.state.pos)
    }

    fn drive(&self) -> Drive {
        let mut drive = Drive {
            thrust: 0.0,
            mass_flow: 0.0,
            drag_area: 0.0,
            inertia: Vector3::zeros(),
            torque: Vector3::zeros(),
        };
        for slot in self.stages.iter().filter(|s| s.attached) {
            drive.drag_area += slot.stage.drag_area;
            drive.inertia += slot.stage.inertia;
            drive.torque += slot.stage.control_torque;
            if slot.burning() {
                drive.thrust += slot.stage.thrust * self.throttle;
                drive.mass_flow += slot.stage.mass_flow() * self.throttle;
            }
        }
        let cmd = Vector3::new(self.rotation.pitch, self.rotation.roll, self.rotation.yaw);
        drive.torque = drive.torque.component_mul(&cmd);
        if drive.inertia.min() <= 0.0 {
            drive.inertia = Vector3::repeat(1.0);
        }
        drive
    }

    // -----------------------------------------------------------------------
    // Reference frames
    // -----------------------------------------------------------------------

    /// Unit vectors east, north, up at the current position.
    fn surface_axes(&self) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
        let up = self.state.pos.try_normalize(1e-9).unwrap_or_else(Vector3::z);
        let east = Vector3::z()
            .cross(&up)
            .try_normalize(1e-9)
            .unwrap_or_else(Vector3::y);
        let north = up.cross(&east);
        (east, north, up)
    }

    fn orbital_basis(&self) -> Option<Matrix3<f64>> {
        let prograde = self.state.vel.try_normalize(1e-9)?;
        let normal = self.state.pos.cross(&self.state.vel).try_normalize(1e-9)?;
        let radial = prograde.cross(&normal);
        Some(Matrix3::from_columns(&[radial, prograde, normal]))
    }

    fn maneuver_basis(&self, id: NodeId) -> Option<Matrix3<f64>> {
        let record = self.nodes.get(&id)?;
        let y = record.burn.try_normalize(1e-9)?;
        let up = self.state.pos.try_normalize(1e-9)?;
        let x = (up - y * y.dot(&up))
            .try_normalize(1e-9)
            .or_else(|| y.cross(&Vector3::z()).try_normalize(1e-9))
            .or_else(|| y.cross(&Vector3::x()).try_normalize(1e-9))?;
        let z = x.cross(&y);
        Some(Matrix3::from_columns(&[x, y, z]))
    }

    /// Columns are the frame's unit axes in inertial coordinates. A maneuver
    /// frame whose node is gone falls back to the orbital frame, and the
    /// orbital frame of a vessel at rest falls back to the surface frame.
    fn basis(&self, frame: ReferenceFrame) -> Matrix3<f64> {
        let surface = || {
            let (east, north, up) = self.surface_axes();
            Matrix3::from_columns(&[east, north, up])
        };
        match frame {
            ReferenceFrame::Inertial => Matrix3::identity(),
            ReferenceFrame::Surface => surface(),
            ReferenceFrame::Orbital => self.orbital_basis().unwrap_or_else(surface),
            ReferenceFrame::Maneuver(id) => self
                .maneuver_basis(id)
                .or_else(|| self.orbital_basis())
                .unwrap_or_else(surface),
        }
    }

    // -----------------------------------------------------------------------
    // Time stepping
    // -----------------------------------------------------------------------

    /// Advance the simulation by `dt` seconds of real time.
    pub fn step(&mut self, dt: f64) {
        if let Some(target) = self.warp_target {
            self.warp_step(target, dt);
            return;
        }
        if !self.released {
            self.state.time += dt;
            return;
        }

        let drive = self.drive();
        let forward_before = self.state.forward();
        let mass_before = self.state.mass;
        let next = rk4_step(&self.state, &self.body, &drive, dt);

        // Thrust delta-v, credited to every pending node
        if drive.thrust > 0.0 {
            let mass_mid = 0.5 * (mass_before + next.mass);
            let dir = (forward_before + next.forward()).normalize();
            let dv = dir * (drive.thrust / mass_mid.max(1e-6) * dt);
            for record in self.nodes.values_mut() {
                record.applied += dv;
            }
        }

        // Propellant bookkeeping per stage
        for slot in self.stages.iter_mut() {
            if slot.burning() {
                let used = slot.stage.mass_flow() * self.throttle * dt;
                slot.propellant = (slot.propellant - used).max(0.0);
            }
        }

        self.state = next;
        self.state.mass = self.total_mass();

        // Ground contact
        if self.altitude() < 0.0 {
            let up = self.state.pos.normalize();
            self.state.pos = up * self.body.radius;
            let radial = self.state.vel.dot(&up);
            if radial < 0.0 {
                self.state.vel = Vector3::zeros();
                self.state.omega = Vector3::zeros();
            }
        }
    }

    /// On rails: Kepler coast, attitude frozen, no thrust.
    fn warp_step(&mut self, target: f64, dt: f64) {
        let span = (dt * WARP_RATE).min(target - self.state.time);
        if span > 0.0 {
            let initial = CoastState {
                time: self.state.time,
                pos: self.state.pos,
                vel: self.state.vel,
            };
            let end = coast(&initial, self.body.mu, span, WARP_SUBSTEP);
            self.state.pos = end.pos;
            self.state.vel = end.vel;
            self.state.time = end.time;
        }
        self.state.omega = Vector3::zeros();
        if self.state.time >= target - 1e-6 {
            self.state.time = target;
            self.warp_target = None;
            event!("warp ended at UT {:.1}", target);
        }
    }

    /// Inertial burn vector of a node, resolved on the state predicted at
    /// the node time.
    fn burn_vector_for(&self, node: &ManeuverNode) -> Vector3<f64> {
        let initial = CoastState { time: self.state.time, pos: self.state.pos, vel: self.state.vel };
        let ahead = (node.ut - self.state.time).max(0.0);
        let CoastState { pos, vel, .. } = coast(&initial, self.body.mu, ahead, WARP_SUBSTEP);
        let prograde = vel.try_normalize(1e-9).unwrap_or_else(Vector3::y);
        let normal = pos.cross(&vel).try_normalize(1e-9).unwrap_or_else(Vector3::z);
        let radial = prograde.cross(&normal);
        prograde * node.prograde + normal * node.normal + radial * node.radial
    }
}

// ---------------------------------------------------------------------------
// Vehicle interface
// ---------------------------------------------------------------------------

impl Telemetry for SimVessel {
    fn ut(&self) -> f64 {
        self.state.time
    }

    fn flight(&self, frame: ReferenceFrame) -> FlightFrame {
        let b = self.basis(frame);
        let to_frame = |v: Vector3<f64>| b.transpose() * v;

        let forward = self.state.forward();
        let pitch_axis = self.state.pitch_axis();
        let top = self.state.top();
        let prograde = self.state.vel.try_normalize(1e-9).unwrap_or_else(Vector3::zeros);

        let (east, north, up) = self.surface_axes();
        let pitch = forward.dot(&up).clamp(-1.0, 1.0).asin();
        let heading = kepler::wrap_two_pi(forward.dot(&east).atan2(forward.dot(&north)));
        let roll = kepler::wrap_pi((-up.dot(&pitch_axis)).atan2(up.dot(&top)));

        FlightFrame {
            direction: to_frame(forward),
            pitch_axis: to_frame(pitch_axis),
            yaw_axis: to_frame(self.state.yaw_axis()),
            angular_velocity: to_frame(self.state.angular_velocity()),
            prograde: to_frame(prograde),
            pitch,
            heading,
            roll,
        }
    }

    fn orbit(&self) -> OrbitState {
        OrbitState::from_state_vector(&self.state.pos, &self.state.vel, self.body.primary())
    }

    fn state(&self) -> VesselState {
        let (thrust, flow_per_isp) = self
            .stages
            .iter()
            .filter(|s| s.burning())
            .fold((0.0, 0.0), |(f, w), s| (f + s.stage.thrust, w + s.stage.thrust / s.stage.isp));
        let specific_impulse = if flow_per_isp > 0.0 { thrust / flow_per_isp } else { 0.0 };
        VesselState {
            mass: self.state.mass,
            available_thrust: thrust,
            specific_impulse,
            throttle: self.throttle,
            dynamic_pressure: dynamic_pressure(&self.state, &self.body),
            speed: self.state.vel.norm(),
            mean_altitude: self.altitude(),
        }
    }

    fn current_stage(&self) -> i32 {
        self.current_stage
    }

    fn parts_in_decouple_stage(&self, stage: i32) -> Vec<PartState> {
        let n = self.stages.len() as i32;
        self.stages
            .iter()
            .enumerate()
            .filter(|(i, slot)| slot.attached && n - 2 - *i as i32 == stage)
            .map(|(_, slot)| PartState {
                has_engine: slot.stage.has_engine(),
                engine_active: slot.ignited,
                has_fuel: slot.propellant > 0.0,
                decouple_stage: stage,
            })
            .collect()
    }

    fn node(&self, id: NodeId) -> Option<ManeuverNode> {
        self.nodes.get(&id).map(|r| r.node)
    }

    fn remaining_burn_vector(&self, id: NodeId) -> Option<Vector3<f64>> {
        let record = self.nodes.get(&id)?;
        let remaining = record.burn - record.applied;
        Some(self.basis(ReferenceFrame::Maneuver(id)).transpose() * remaining)
    }
}

impl Actuation for SimVessel {
    fn set_throttle(&mut self, throttle: f64) {
        self.throttle = clamp_throttle(throttle);
    }

    fn set_rotation(&mut self, command: RotationCommand) {
        self.rotation = command.clamped();
    }

    fn set_sas(&mut self, enabled: bool) {
        self.sas = enabled;
    }

    fn set_rcs(&mut self, enabled: bool) {
        self.rcs = enabled;
    }

    fn activate_next_stage(&mut self) {
        if self.current_stage <= 0 {
            return;
        }
        self.current_stage -= 1;
        self.released = true;
        let n = self.stages.len() as i32;
        let ignite = n - 1 - self.current_stage;
        let drop = n - 2 - self.current_stage;
        if let Some(slot) = usize::try_from(ignite).ok().and_then(|i| self.stages.get_mut(i)) {
            slot.ignited = true;
        }
        if let Some(slot) = usize::try_from(drop).ok().and_then(|i| self.stages.get_mut(i)) {
            slot.attached = false;
            event!("sim: dropped stage {}", slot.stage.name);
        }
        self.state.mass = self.total_mass();
    }

    fn add_node(&mut self, node: ManeuverNode) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        let burn = self.burn_vector_for(&node);
        self.nodes.insert(id, NodeRecord { node, burn, applied: Vector3::zeros() });
        id
    }

    fn remove_node(&mut self, id: NodeId) {
        self.nodes.remove(&id);
    }

    fn remove_nodes(&mut self) {
        self.nodes.clear();
    }

    fn warp_to(&mut self, ut: f64) {
        if ut > self.state.time {
            self.warp_target = Some(ut);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{kerbin, StageBuilder};

    fn orbiter() -> SimVessel {
        let body = kerbin();
        let orbit = OrbitState::circular(body.primary(), 100_000.0, 0.0);
        SimVessel::in_orbit(body, vec![StageBuilder::new("s").build()], &orbit)
    }

    #[test]
    fn pad_is_held_until_launch() {
        let mut v = SimVessel::new(kerbin(), vec![StageBuilder::new("s").build()]);
        v.set_throttle(1.0);
        for _ in 0..50 {
            v.step(0.02);
        }
        assert!(v.state().mean_altitude.abs() < 1e-9);
        assert!((v.ut() - 1.0).abs() < 1e-9);

        v.activate_next_stage();
        for _ in 0..100 {
            v.step(0.02);
        }
        assert!(v.state().mean_altitude > 10.0);
        assert!(v.state().mass < 3_000.0);
    }

    #[test]
    fn pad_attitude_is_vertical() {
        let v = SimVessel::new(kerbin(), vec![StageBuilder::new("s").build()]);
        let f = v.flight(ReferenceFrame::Surface);
        assert!((f.direction - Vector3::z()).norm() < 1e-12);
        assert!((f.pitch - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn positive_pitch_raises_nose() {
        let mut v = orbiter();
        let start = v.flight(ReferenceFrame::Orbital);
        assert!((start.direction - Vector3::y()).norm() < 1e-9, "starts prograde");
        v.set_rotation(RotationCommand::new(1.0, 0.0, 0.0));
        for _ in 0..10 {
            v.step(0.02);
        }
        let end = v.flight(ReferenceFrame::Orbital);
        assert!(end.direction.x > 0.0, "nose should move radial-out");
        assert!(end.pitch > start.pitch);
    }

    #[test]
    fn positive_roll_increases_roll_angle() {
        let mut v = orbiter();
        let before = v.flight(ReferenceFrame::Surface).roll;
        assert!(before.abs() < 1e-9);
        v.set_rotation(RotationCommand::new(0.0, 0.0, 1.0));
        for _ in 0..10 {
            v.step(0.02);
        }
        let after = v.flight(ReferenceFrame::Surface);
        assert!(after.roll > 0.0);
        assert!(after.angular_velocity.dot(&after.direction) > 0.0);
    }

    #[test]
    fn staging_drops_and_lights() {
        let mut v = SimVessel::new(
            kerbin(),
            vec![
                StageBuilder::new("booster").build(),
                StageBuilder::new("upper").thrust(20_000.0).build(),
            ],
        );
        assert_eq!(v.current_stage(), 2);
        assert!(v.parts_in_decouple_stage(1).is_empty());

        v.activate_next_stage();
        let booster = v.parts_in_decouple_stage(0);
        assert_eq!(booster.len(), 1);
        assert!(booster[0].is_burning());
        assert_eq!(v.state().available_thrust, 50_000.0);
        let upper = v.parts_in_decouple_stage(-1);
        assert!(!upper[0].engine_active);

        v.activate_next_stage();
        assert_eq!(v.current_stage(), 0);
        assert!(v.parts_in_decouple_stage(0).is_empty());
        assert_eq!(v.state().available_thrust, 20_000.0);
        assert!((v.state().mass - 3_000.0).abs() < 1e-9);

        v.activate_next_stage();
        assert_eq!(v.current_stage(), 0);
    }

    #[test]
    fn warp_coasts_to_target() {
        let mut v = orbiter();
        let r0 = v.orbit().radius;
        v.warp_to(500.0);
        assert!(v.is_warping());
        let mut steps = 0;
        while v.is_warping() {
            v.step(0.02);
            steps += 1;
            assert!(steps < 100);
        }
        assert_eq!(v.ut(), 500.0);
        assert!((v.orbit().radius - r0).abs() < 10.0);
    }

    #[test]
    fn remaining_burn_tracks_thrust() {
        let mut v = orbiter();
        let id = v.add_node(ManeuverNode::prograde(v.ut(), 50.0));
        let before = v.remaining_burn_vector(id).unwrap();
        assert!((before.y - 50.0).abs() < 1e-6);
        assert!(before.x.abs() < 1e-6 && before.z.abs() < 1e-6);

        // nose is prograde: burn along the node
        v.set_throttle(1.0);
        for _ in 0..50 {
            v.step(0.02);
        }
        let after = v.remaining_burn_vector(id).unwrap();
        // ~1 s at 50 kN on 3 t
        assert!(after.y < 35.0 && after.y > 30.0, "remaining {}", after.y);
        v.remove_nodes();
        assert!(v.remaining_burn_vector(id).is_none());
    }

    #[test]
    fn node_frame_points_along_burn() {
        let mut v = orbiter();
        let id = v.add_node(ManeuverNode::new(v.ut() + 200.0, 0.0, 30.0, 0.0));
        let f = v.flight(ReferenceFrame::Maneuver(id));
        let orbital = v.flight(ReferenceFrame::Orbital);
        // vessel is prograde, burn is normal: 90 degrees apart
        assert!(f.direction.y.abs() < 1e-6);
        assert!(orbital.direction.y > 0.999);
    }
}
