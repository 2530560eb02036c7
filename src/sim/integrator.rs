use nalgebra::UnitQuaternion;

use super::body::CelestialBody;
use super::dynamics::{derivatives, Drive};
use super::state::RigidState;

// ---------------------------------------------------------------------------
// RK4 integrator with the drive held constant over the step
// ---------------------------------------------------------------------------

pub fn rk4_step(state: &RigidState, body: &CelestialBody, drive: &Drive, dt: f64) -> RigidState {
    let k1 = derivatives(state, body, drive);
    let k2 = derivatives(&state.apply(&k1, dt * 0.5), body, drive);
    let k3 = derivatives(&state.apply(&k2, dt * 0.5), body, drive);
    let k4 = derivatives(&state.apply(&k3, dt), body, drive);

    let new_quat_raw = state.quat.quaternion()
        + (k1.dquat + k2.dquat * 2.0 + k3.dquat * 2.0 + k4.dquat) * (dt / 6.0);

    RigidState {
        time: state.time + dt,
        pos: state.pos + (k1.dpos + 2.0 * k2.dpos + 2.0 * k3.dpos + k4.dpos) * (dt / 6.0),
        vel: state.vel + (k1.dvel + 2.0 * k2.dvel + 2.0 * k3.dvel + k4.dvel) * (dt / 6.0),
        quat: UnitQuaternion::new_normalize(new_quat_raw),
        omega: state.omega
            + (k1.domega + 2.0 * k2.domega + 2.0 * k3.domega + k4.domega) * (dt / 6.0),
        mass: (state.mass
            + (k1.dmass + 2.0 * k2.dmass + 2.0 * k3.dmass + k4.dmass) * (dt / 6.0))
            .max(0.0),
    }
}
