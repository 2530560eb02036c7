use nalgebra::{Matrix3, Quaternion, Rotation3, UnitQuaternion, Vector3};

// ---------------------------------------------------------------------------
// Rigid-body state: position, velocity, attitude, angular rate, mass
// ---------------------------------------------------------------------------

/// Body axes: x is the pitch axis, y points out of the nose, z is the yaw
/// axis and points to the vessel's underside.
#[derive(Debug, Clone)]
pub struct RigidState {
    pub time: f64,
    pub pos: Vector3<f64>,         // m, body-centred inertial
    pub vel: Vector3<f64>,         // m/s, inertial
    pub quat: UnitQuaternion<f64>, // body→inertial rotation
    pub omega: Vector3<f64>,       // rad/s, body axes, game sign convention
    pub mass: f64,                 // kg
}

impl RigidState {
    pub fn apply(&self, d: &Deriv, dt: f64) -> RigidState {
        // Quaternion integration: q_new = normalize(q + dq * dt)
        let q_raw = self.quat.quaternion() + d.dquat * dt;
        RigidState {
            time: self.time + dt,
            pos: self.pos + d.dpos * dt,
            vel: self.vel + d.dvel * dt,
            quat: UnitQuaternion::new_normalize(q_raw),
            omega: self.omega + d.domega * dt,
            mass: (self.mass + d.dmass * dt).max(0.0),
        }
    }

    pub fn pitch_axis(&self) -> Vector3<f64> {
        self.quat * Vector3::x()
    }

    /// Nose direction, also the thrust direction.
    pub fn forward(&self) -> Vector3<f64> {
        self.quat * Vector3::y()
    }

    pub fn yaw_axis(&self) -> Vector3<f64> {
        self.quat * Vector3::z()
    }

    /// Unit vector out of the vessel's top side.
    pub fn top(&self) -> Vector3<f64> {
        -self.yaw_axis()
    }

    /// Angular velocity in inertial axes.
    pub fn angular_velocity(&self) -> Vector3<f64> {
        self.quat * self.omega
    }
}

/// Attitude whose nose points along `forward` and whose top side leans
/// towards `top`. Falls back to identity for parallel or zero inputs.
pub fn orientation(forward: &Vector3<f64>, top: &Vector3<f64>) -> UnitQuaternion<f64> {
    let y = match forward.try_normalize(1e-12) {
        Some(y) => y,
        None => return UnitQuaternion::identity(),
    };
    let up = match (top - y * y.dot(top)).try_normalize(1e-9) {
        Some(up) => up,
        None => return UnitQuaternion::identity(),
    };
    let z = -up;
    let x = y.cross(&z);
    let rot = Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[x, y, z]));
    UnitQuaternion::from_rotation_matrix(&rot)
}

// ---------------------------------------------------------------------------
// State derivative
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Deriv {
    pub dpos: Vector3<f64>,
    pub dvel: Vector3<f64>,
    pub dquat: Quaternion<f64>, // raw derivative, not unit
    pub domega: Vector3<f64>,   // angular acceleration, body frame
    pub dmass: f64,
}
