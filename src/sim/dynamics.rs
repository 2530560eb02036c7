use nalgebra::{Quaternion, Vector3};

use super::body::CelestialBody;
use super::state::{Deriv, RigidState};

/// Actuator and vehicle inputs held constant over one integration step.
#[derive(Debug, Clone)]
pub struct Drive {
    pub thrust: f64,           // N along the nose
    pub mass_flow: f64,        // kg/s
    pub drag_area: f64,        // m^2
    pub inertia: Vector3<f64>, // kg·m^2, principal
    pub torque: Vector3<f64>,  // N·m, body axes, game sign convention
}

/// Dynamic pressure at a state (Pa).
pub fn dynamic_pressure(state: &RigidState, body: &CelestialBody) -> f64 {
    let speed = state.vel.norm();
    0.5 * body.density(body.altitude(&state.pos)) * speed * speed
}

/// Compute rigid-body state derivatives.
///
/// Forces: point-mass gravity, thrust along the nose, drag opposing the
/// velocity. Moments: commanded control torque only.
pub fn derivatives(state: &RigidState, body: &CelestialBody, drive: &Drive) -> Deriv {
    let mass = state.mass.max(1e-6);

    // --- Translational ---
    let gravity = body.gravity_accel(&state.pos);
    let thrust = state.forward() * (drive.thrust / mass);
    let speed = state.vel.norm();
    let drag = if speed > 1e-6 {
        -state.vel / speed * (dynamic_pressure(state, body) * drive.drag_area / mass)
    } else {
        Vector3::zeros()
    };

    // --- Euler's equation ---
    // omega uses the game convention (physical rate is -omega), so the
    // physical I * w' = tau - w × (I w) becomes I * omega' = T + omega × (I omega)
    // for a commanded torque T along the game-convention axes.
    let i_vec = drive.inertia;
    let w = state.omega;
    let i_omega = Vector3::new(i_vec.x * w.x, i_vec.y * w.y, i_vec.z * w.z);
    let gyro = w.cross(&i_omega);
    let domega = Vector3::new(
        (drive.torque.x + gyro.x) / i_vec.x,
        (drive.torque.y + gyro.y) / i_vec.y,
        (drive.torque.z + gyro.z) / i_vec.z,
    );

    // --- Quaternion kinematics: dq/dt = 0.5 * q * w_physical ---
    let omega_quat = Quaternion::new(0.0, -w.x, -w.y, -w.z);
    let dquat = state.quat.quaternion() * omega_quat * 0.5;

    Deriv {
        dpos: state.vel,
        dvel: gravity + thrust + drag,
        dquat,
        domega,
        dmass: -drive.mass_flow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::body::kerbin;
    use nalgebra::UnitQuaternion;

    fn idle() -> Drive {
        Drive {
            thrust: 0.0,
            mass_flow: 0.0,
            drag_area: 1.0,
            inertia: Vector3::repeat(100.0),
            torque: Vector3::zeros(),
        }
    }

    fn state_at(alt: f64, vel: Vector3<f64>) -> RigidState {
        RigidState {
            time: 0.0,
            pos: Vector3::new(600_000.0 + alt, 0.0, 0.0),
            vel,
            quat: UnitQuaternion::identity(),
            omega: Vector3::zeros(),
            mass: 1000.0,
        }
    }

    #[test]
    fn drag_opposes_velocity_in_atmosphere() {
        let body = kerbin();
        let s = state_at(1_000.0, Vector3::new(0.0, 300.0, 0.0));
        let d = derivatives(&s, &body, &idle());
        assert!(d.dvel.y < 0.0);
        let vacuum = derivatives(&state_at(80_000.0, s.vel), &body, &idle());
        assert!(vacuum.dvel.y.abs() < 1e-12);
    }

    #[test]
    fn thrust_acts_along_nose() {
        let body = kerbin();
        let s = state_at(80_000.0, Vector3::zeros());
        let drive = Drive { thrust: 10_000.0, mass_flow: 3.0, ..idle() };
        let d = derivatives(&s, &body, &drive);
        // identity attitude: nose is +y
        assert!((d.dvel.y - 10.0).abs() < 1e-9);
        assert_eq!(d.dmass, -3.0);
    }

    #[test]
    fn torque_gives_angular_acceleration() {
        let body = kerbin();
        let s = state_at(80_000.0, Vector3::zeros());
        let drive = Drive { torque: Vector3::new(200.0, 0.0, 0.0), ..idle() };
        let d = derivatives(&s, &body, &drive);
        assert!((d.domega.x - 2.0).abs() < 1e-12);
    }

    #[test]
    fn quat_deriv_zero_at_rest() {
        let body = kerbin();
        let d = derivatives(&state_at(0.0, Vector3::zeros()), &body, &idle());
        let dq_norm = (d.dquat.w.powi(2) + d.dquat.i.powi(2)
            + d.dquat.j.powi(2) + d.dquat.k.powi(2))
        .sqrt();
        assert!(dq_norm < 1e-10, "No rotation → zero quat derivative");
    }
}
