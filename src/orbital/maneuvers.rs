use std::f64::consts::{PI, TAU};

use crate::error::GncError;
use super::elements::OrbitState;
use super::kepler;
use super::node::{Apsis, ManeuverNode, OrbitNode};

// ---------------------------------------------------------------------------
// Maneuver planning: pure functions from an orbit snapshot to a node
// ---------------------------------------------------------------------------

/// Orbital speed at radius `r` on an orbit with semi-major axis `a`.
pub fn vis_viva(mu: f64, r: f64, a: f64) -> f64 {
    (mu * (2.0 / r - 1.0 / a)).sqrt()
}

/// Circular orbit velocity at a given radius.
pub fn circular_velocity(r: f64, mu: f64) -> f64 {
    (mu / r).sqrt()
}

fn finite(value: f64, what: &str) -> Result<f64, GncError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(GncError::InvalidOrbit(format!("{what} is not finite")))
    }
}

/// Prograde delta-v that changes the semi-major axis to `a2` while at radius `r`.
fn tangential_change(orbit: &OrbitState, r: f64, a2: f64) -> Result<f64, GncError> {
    let mu = orbit.body.mu;
    let v1 = vis_viva(mu, r, orbit.semi_major_axis);
    let v2 = vis_viva(mu, r, a2);
    finite(v2 - v1, "delta-v")
}

/// Burn at an apsis that makes the orbit circular at that radius.
pub fn circularize(orbit: &OrbitState, ut: f64, at: Apsis) -> Result<ManeuverNode, GncError> {
    let (r, wait) = match at {
        Apsis::Apoapsis => (orbit.apoapsis(), orbit.time_to_apoapsis()),
        Apsis::Periapsis => (orbit.periapsis(), orbit.time_to_periapsis()),
    };
    let dv = tangential_change(orbit, r, r)?;
    Ok(ManeuverNode::prograde(ut + finite(wait, "time to apsis")?, dv))
}

/// Burn at periapsis that moves the apoapsis to `new_apoapsis` (radius, m).
pub fn change_apoapsis(orbit: &OrbitState, ut: f64, new_apoapsis: f64) -> Result<ManeuverNode, GncError> {
    let r1 = orbit.periapsis();
    let a2 = (r1 + new_apoapsis) / 2.0;
    let dv = tangential_change(orbit, r1, a2)?;
    Ok(ManeuverNode::prograde(ut + finite(orbit.time_to_periapsis(), "time to periapsis")?, dv))
}

/// Burn at apoapsis that moves the periapsis to `new_periapsis` (radius, m).
pub fn change_periapsis(orbit: &OrbitState, ut: f64, new_periapsis: f64) -> Result<ManeuverNode, GncError> {
    let r1 = orbit.apoapsis();
    let a2 = (r1 + new_periapsis) / 2.0;
    let dv = tangential_change(orbit, r1, a2)?;
    Ok(ManeuverNode::prograde(ut + finite(orbit.time_to_apoapsis(), "time to apoapsis")?, dv))
}

/// Burn at `node_ut` that sets the semi-major axis to `sma`.
///
/// The burn radius is the radius the vessel will have at `node_ut`,
/// obtained by advancing the mean anomaly from `ut`.
pub fn change_sma(orbit: &OrbitState, ut: f64, sma: f64, node_ut: f64) -> Result<ManeuverNode, GncError> {
    let nu = orbit.true_anomaly_after(node_ut - ut);
    let r1 = orbit.radius_at(nu);
    let dv = tangential_change(orbit, r1, sma)?;
    Ok(ManeuverNode::prograde(node_ut, dv))
}

/// Time until the vessel crosses the reference plane heading north.
///
/// Closed form: the node's true anomaly is converted to a mean anomaly, and
/// by the equal-areas law the waiting time is the mean-anomaly gap over the
/// mean motion. No iteration is involved, which keeps this an approximation
/// for strongly eccentric orbits whose snapshot elements drift between reads.
pub fn time_to_ascending_node(orbit: &OrbitState) -> f64 {
    orbit.time_to_true_anomaly(kepler::wrap_two_pi(-orbit.argument_of_periapsis))
}

pub fn time_to_descending_node(orbit: &OrbitState) -> f64 {
    orbit.time_to_true_anomaly(kepler::wrap_two_pi(PI - orbit.argument_of_periapsis))
}

/// Plane change at an equator crossing, rotating the velocity by the
/// inclination difference without changing its magnitude.
pub fn change_inclination(
    orbit: &OrbitState,
    ut: f64,
    new_inclination: f64,
    at: OrbitNode,
) -> Result<ManeuverNode, GncError> {
    let delta_i = new_inclination - orbit.inclination;
    let (wait, nu, sign) = match at {
        OrbitNode::Ascending => (
            time_to_ascending_node(orbit),
            kepler::wrap_two_pi(-orbit.argument_of_periapsis),
            1.0,
        ),
        OrbitNode::Descending => (
            time_to_descending_node(orbit),
            kepler::wrap_two_pi(PI - orbit.argument_of_periapsis),
            -1.0,
        ),
    };
    let r = orbit.radius_at(nu);
    let v = finite(vis_viva(orbit.body.mu, r, orbit.semi_major_axis), "speed at node")?;
    let normal = sign * v * delta_i.sin();
    let prograde = v * delta_i.cos() - v;
    Ok(ManeuverNode::new(ut + finite(wait, "time to node")?, prograde, normal, 0.0))
}

// ---------------------------------------------------------------------------
// Hohmann transfer
// ---------------------------------------------------------------------------

/// Result of a Hohmann transfer calculation.
#[derive(Debug, Clone, Copy)]
pub struct HohmannTransfer {
    pub dv1: f64,            // m/s, first burn (raise apoapsis)
    pub dv2: f64,            // m/s, second burn (circularize)
    pub total_dv: f64,       // m/s, total delta-v
    pub transfer_time: f64,  // s, half the transfer orbit period
    pub transfer_angle: f64, // rad, target lead angle at departure
    pub r1: f64,             // m, initial orbit radius
    pub r2: f64,             // m, final orbit radius
}

/// Compute Hohmann transfer between two circular orbits.
///
/// `r1` and `r2` are orbital radii (not altitudes), in meters.
pub fn hohmann(r1: f64, r2: f64, mu: f64) -> HohmannTransfer {
    let a_transfer = (r1 + r2) / 2.0;

    let v_circ1 = circular_velocity(r1, mu);
    let v_circ2 = circular_velocity(r2, mu);

    let v_transfer_1 = vis_viva(mu, r1, a_transfer);
    let v_transfer_2 = vis_viva(mu, r2, a_transfer);

    let dv1 = (v_transfer_1 - v_circ1).abs();
    let dv2 = (v_circ2 - v_transfer_2).abs();

    let transfer_time = PI * (a_transfer.powi(3) / mu).sqrt();
    // The target moves n2 * t during the transfer and must arrive opposite
    // the departure point.
    let transfer_angle = PI - circular_velocity(r2, mu) / r2 * transfer_time;

    HohmannTransfer {
        dv1,
        dv2,
        total_dv: dv1 + dv2,
        transfer_time,
        transfer_angle,
        r1,
        r2,
    }
}

/// Departure burn towards a target on a coplanar, near-circular orbit.
///
/// Coarse estimate: radii are the current radii of both bodies and phase is
/// measured with mean longitudes, so eccentric or inclined orbits drift from
/// the true optimum. The burn waits until the phase angle reaches the
/// transfer angle, wrapping by the synodic period.
pub fn hohmann_transfer(
    orbit: &OrbitState,
    target: &OrbitState,
    ut: f64,
) -> Result<(ManeuverNode, HohmannTransfer), GncError> {
    let mu = orbit.body.mu;
    let r1 = orbit.radius;
    let r2 = target.radius;
    let transfer = hohmann(r1, r2, mu);

    let n_vessel = orbit.mean_motion();
    let n_target = target.mean_motion();
    let closing_rate = n_target - n_vessel;
    if !closing_rate.is_finite() || closing_rate.abs() < 1e-12 {
        return Err(GncError::InvalidOrbit("no relative motion to target".into()));
    }

    let phase = kepler::wrap_pi(target.mean_longitude() - orbit.mean_longitude());
    let synodic = TAU / closing_rate.abs();
    let wait = ((transfer.transfer_angle - phase) / closing_rate).rem_euclid(synodic);

    let a2 = (r1 + r2) / 2.0;
    let dv = tangential_change(orbit, r1, a2)?;
    Ok((ManeuverNode::prograde(ut + finite(wait, "transfer wait")?, dv), transfer))
}
