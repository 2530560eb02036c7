use nalgebra::Vector3;

/// Point-mass gravity acceleration about the body centre.
pub fn point_mass_accel(pos: &Vector3<f64>, mu: f64) -> Vector3<f64> {
    let r = pos.norm();
    if r < 1.0 {
        return Vector3::zeros();
    }
    -mu / (r * r * r) * pos
}

/// Translational state for unpowered flight.
#[derive(Debug, Clone)]
pub struct CoastState {
    pub time: f64,
    pub pos: Vector3<f64>, // m, body-centred inertial
    pub vel: Vector3<f64>, // m/s
}

/// RK4 step under point-mass gravity.
fn rk4_coast_step(state: &CoastState, mu: f64, dt: f64) -> CoastState {
    let deriv = |pos: &Vector3<f64>, vel: &Vector3<f64>| -> (Vector3<f64>, Vector3<f64>) {
        (*vel, point_mass_accel(pos, mu))
    };

    let (k1_dr, k1_dv) = deriv(&state.pos, &state.vel);
    let (k2_dr, k2_dv) = deriv(
        &(state.pos + k1_dr * dt * 0.5),
        &(state.vel + k1_dv * dt * 0.5),
    );
    let (k3_dr, k3_dv) = deriv(
        &(state.pos + k2_dr * dt * 0.5),
        &(state.vel + k2_dv * dt * 0.5),
    );
    let (k4_dr, k4_dv) = deriv(&(state.pos + k3_dr * dt), &(state.vel + k3_dv * dt));

    CoastState {
        time: state.time + dt,
        pos: state.pos + (k1_dr + 2.0 * k2_dr + 2.0 * k3_dr + k4_dr) * (dt / 6.0),
        vel: state.vel + (k1_dv + 2.0 * k2_dv + 2.0 * k3_dv + k4_dv) * (dt / 6.0),
    }
}

/// Coast for `duration` seconds in steps no longer than `max_step`.
/// Returns only the final state.
pub fn coast(initial: &CoastState, mu: f64, duration: f64, max_step: f64) -> CoastState {
    let mut state = initial.clone();
    let mut remaining = duration;
    while remaining > 1e-9 {
        let dt = remaining.min(max_step);
        state = rk4_coast_step(&state, mu, dt);
        remaining -= dt;
    }
    state
}
