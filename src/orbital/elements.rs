use std::f64::consts::{PI, TAU};

use nalgebra::Vector3;

use super::kepler;

/// Constants of the body being orbited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrimaryBody {
    pub mu: f64,               // gravitational parameter, m^3/s^2
    pub radius: f64,           // equatorial radius, m
    pub atmosphere_depth: f64, // m, 0 for airless bodies
}

/// Read-only orbit snapshot.
///
/// Holds the classical elements plus the current radius and speed; every
/// other quantity (apsides, anomalies, timings) is derived from them, so a
/// vessel interface only has to fill these fields. The planner consumes
/// snapshots and never mutates them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitState {
    pub body: PrimaryBody,
    pub semi_major_axis: f64,  // m
    pub eccentricity: f64,
    pub inclination: f64,      // rad
    pub longitude_of_ascending_node: f64, // rad
    pub argument_of_periapsis: f64,       // rad
    pub true_anomaly: f64,     // rad
    pub radius: f64,           // m, distance from body centre
    pub speed: f64,            // m/s
}

impl OrbitState {
    /// Build a snapshot from elements, deriving radius and speed.
    pub fn from_elements(
        body: PrimaryBody,
        sma: f64,
        ecc: f64,
        inc: f64,
        raan: f64,
        argp: f64,
        true_anom: f64,
    ) -> Self {
        let p = sma * (1.0 - ecc * ecc);
        let radius = p / (1.0 + ecc * true_anom.cos());
        let speed = (body.mu * (2.0 / radius - 1.0 / sma)).sqrt();
        Self {
            body,
            semi_major_axis: sma,
            eccentricity: ecc,
            inclination: inc,
            longitude_of_ascending_node: raan,
            argument_of_periapsis: argp,
            true_anomaly: true_anom,
            radius,
            speed,
        }
    }

    /// Circular orbit at the given altitude.
    pub fn circular(body: PrimaryBody, altitude: f64, inc: f64) -> Self {
        Self::from_elements(body, body.radius + altitude, 0.0, inc, 0.0, 0.0, 0.0)
    }

    /// Convert an inertial state vector to elements.
    ///
    /// Degenerate cases are given fixed conventions: with no angular momentum
    /// (vertical flight) the inclination and node are zero; for equatorial
    /// orbits the periapsis is measured from the +X axis; for circular orbits
    /// the anomaly is measured from the node (or +X).
    pub fn from_state_vector(pos: &Vector3<f64>, vel: &Vector3<f64>, body: PrimaryBody) -> Self {
        let mu = body.mu;
        let r = pos.norm();
        let v = vel.norm();

        let h = pos.cross(vel);
        let h_mag = h.norm();

        // Node vector
        let n = Vector3::new(-h.y, h.x, 0.0);
        let n_mag = n.norm();

        // Eccentricity vector
        let e_vec = ((v * v - mu / r) * pos - pos.dot(vel) * vel) / mu;
        let ecc = e_vec.norm();

        // Vis-viva energy; negative for bound orbits
        let energy = 0.5 * v * v - mu / r;
        let sma = -mu / (2.0 * energy);

        let inc = if h_mag > 1e-9 {
            (h.z / h_mag).clamp(-1.0, 1.0).acos()
        } else {
            0.0
        };

        let raan = if n_mag > 1e-9 {
            let w = (n.x / n_mag).clamp(-1.0, 1.0).acos();
            if n.y < 0.0 { TAU - w } else { w }
        } else {
            0.0
        };

        let argp = if ecc > 1e-9 {
            if n_mag > 1e-9 {
                let w = (n.dot(&e_vec) / (n_mag * ecc)).clamp(-1.0, 1.0).acos();
                if e_vec.z < 0.0 { TAU - w } else { w }
            } else {
                kepler::wrap_two_pi(e_vec.y.atan2(e_vec.x))
            }
        } else {
            0.0
        };

        let true_anom = if ecc > 1e-9 {
            let nu = (e_vec.dot(pos) / (ecc * r)).clamp(-1.0, 1.0).acos();
            if pos.dot(vel) < 0.0 { TAU - nu } else { nu }
        } else if n_mag > 1e-9 {
            let u = (n.dot(pos) / (n_mag * r)).clamp(-1.0, 1.0).acos();
            if pos.z < 0.0 { TAU - u } else { u }
        } else {
            kepler::wrap_two_pi(pos.y.atan2(pos.x))
        };

        Self {
            body,
            semi_major_axis: sma,
            eccentricity: ecc,
            inclination: inc,
            longitude_of_ascending_node: raan,
            argument_of_periapsis: argp,
            true_anomaly: true_anom,
            radius: r,
            speed: v,
        }
    }

    /// Inertial state vector (position, velocity) at the current anomaly.
    pub fn state_vector(&self) -> (Vector3<f64>, Vector3<f64>) {
        self.state_vector_at(self.true_anomaly)
    }

    /// Inertial state vector at an arbitrary true anomaly on this orbit.
    pub fn state_vector_at(&self, true_anom: f64) -> (Vector3<f64>, Vector3<f64>) {
        let ecc = self.eccentricity;
        let p = self.semi_major_axis * (1.0 - ecc * ecc);
        let r_pqw = p / (1.0 + ecc * true_anom.cos());

        // Position and velocity in perifocal frame (PQW)
        let r_pqw_vec = Vector3::new(r_pqw * true_anom.cos(), r_pqw * true_anom.sin(), 0.0);
        let sqrt_mu_p = (self.body.mu / p).sqrt();
        let v_pqw_vec = Vector3::new(
            -sqrt_mu_p * true_anom.sin(),
            sqrt_mu_p * (ecc + true_anom.cos()),
            0.0,
        );

        let (sin_raan, cos_raan) = self.longitude_of_ascending_node.sin_cos();
        let (sin_argp, cos_argp) = self.argument_of_periapsis.sin_cos();
        let (sin_inc, cos_inc) = self.inclination.sin_cos();

        let rot = |v: &Vector3<f64>| -> Vector3<f64> {
            Vector3::new(
                (cos_raan * cos_argp - sin_raan * sin_argp * cos_inc) * v.x
                    + (-cos_raan * sin_argp - sin_raan * cos_argp * cos_inc) * v.y,
                (sin_raan * cos_argp + cos_raan * sin_argp * cos_inc) * v.x
                    + (-sin_raan * sin_argp + cos_raan * cos_argp * cos_inc) * v.y,
                (sin_argp * sin_inc) * v.x + (cos_argp * sin_inc) * v.y,
            )
        };

        (rot(&r_pqw_vec), rot(&v_pqw_vec))
    }

    /// Bound orbit (negative energy). Radial trajectories have e = 1 but
    /// still fall back, so only the energy is checked.
    pub fn is_closed(&self) -> bool {
        self.semi_major_axis > 0.0 && self.semi_major_axis.is_finite()
    }

    /// Apoapsis radius; infinite for open orbits.
    pub fn apoapsis(&self) -> f64 {
        if self.is_closed() {
            self.semi_major_axis * (1.0 + self.eccentricity)
        } else {
            f64::INFINITY
        }
    }

    pub fn periapsis(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.eccentricity)
    }

    pub fn apoapsis_altitude(&self) -> f64 {
        self.apoapsis() - self.body.radius
    }

    pub fn periapsis_altitude(&self) -> f64 {
        self.periapsis() - self.body.radius
    }

    pub fn semi_minor_axis(&self) -> f64 {
        self.semi_major_axis * (1.0 - self.eccentricity * self.eccentricity).max(0.0).sqrt()
    }

    /// Mean motion, rad/s.
    pub fn mean_motion(&self) -> f64 {
        (self.body.mu / self.semi_major_axis.powi(3)).sqrt()
    }

    /// Orbital period (s).
    pub fn period(&self) -> f64 {
        TAU / self.mean_motion()
    }

    pub fn eccentric_anomaly(&self) -> f64 {
        kepler::eccentric_from_true(self.true_anomaly, self.eccentricity)
    }

    pub fn mean_anomaly(&self) -> f64 {
        kepler::mean_from_true(self.true_anomaly, self.eccentricity)
    }

    /// Mean longitude (node + argument of periapsis + mean anomaly), used
    /// for coarse phasing between coplanar orbits.
    pub fn mean_longitude(&self) -> f64 {
        kepler::wrap_two_pi(
            self.longitude_of_ascending_node + self.argument_of_periapsis + self.mean_anomaly(),
        )
    }

    /// Time until the vessel next reaches the given true anomaly.
    pub fn time_to_true_anomaly(&self, true_anom: f64) -> f64 {
        let target = kepler::mean_from_true(true_anom, self.eccentricity);
        kepler::period_fraction_between(self.mean_anomaly(), target) * self.period()
    }

    pub fn time_to_apoapsis(&self) -> f64 {
        self.time_to_true_anomaly(PI)
    }

    pub fn time_to_periapsis(&self) -> f64 {
        self.time_to_true_anomaly(0.0)
    }

    /// True anomaly `dt` seconds from now.
    pub fn true_anomaly_after(&self, dt: f64) -> f64 {
        let m = self.mean_anomaly() + self.mean_motion() * dt;
        kepler::true_from_mean(m, self.eccentricity)
    }

    /// Orbital radius at a given true anomaly (conic equation).
    pub fn radius_at(&self, true_anom: f64) -> f64 {
        let ecc = self.eccentricity;
        self.semi_major_axis * (1.0 - ecc * ecc) / (1.0 + ecc * true_anom.cos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KERBIN: PrimaryBody = PrimaryBody {
        mu: 3.5316e12,
        radius: 600_000.0,
        atmosphere_depth: 70_000.0,
    };

    #[test]
    fn circular_roundtrip() {
        let orbit = OrbitState::circular(KERBIN, 100_000.0, 0.3);
        let (pos, vel) = orbit.state_vector();

        let recovered = OrbitState::from_state_vector(&pos, &vel, KERBIN);
        assert!((recovered.semi_major_axis - orbit.semi_major_axis).abs() < 1.0, "SMA mismatch");
        assert!(recovered.eccentricity < 1e-6, "Should be nearly circular");
        assert!((recovered.inclination - orbit.inclination).abs() < 1e-6, "Inclination mismatch");
    }

    #[test]
    fn elliptical_roundtrip_keeps_anomaly() {
        let orbit = OrbitState::from_elements(KERBIN, 750_000.0, 0.1, 0.2, 0.4, 1.1, 2.0);
        let (pos, vel) = orbit.state_vector();
        let back = OrbitState::from_state_vector(&pos, &vel, KERBIN);
        assert!((back.eccentricity - 0.1).abs() < 1e-9);
        assert!((back.argument_of_periapsis - 1.1).abs() < 1e-6);
        assert!((back.longitude_of_ascending_node - 0.4).abs() < 1e-6);
        assert!((back.true_anomaly - 2.0).abs() < 1e-6);
        assert!(back.radius >= back.periapsis());
    }

    #[test]
    fn apsis_timing() {
        let orbit = OrbitState::from_elements(KERBIN, 700_000.0, 0.05, 0.0, 0.0, 0.0, 0.0);
        assert!(orbit.time_to_periapsis() < 1e-6);
        assert!((orbit.time_to_apoapsis() - orbit.period() / 2.0).abs() < 1e-6);
        assert!((orbit.apoapsis() - 735_000.0).abs() < 1e-6);
        assert!((orbit.periapsis_altitude() - 65_000.0).abs() < 1e-6);
    }

    #[test]
    fn vertical_flight_is_degenerate_but_finite() {
        let pos = Vector3::new(0.0, 0.0, KERBIN.radius + 1_000.0);
        let vel = Vector3::new(0.0, 0.0, 300.0);
        let orbit = OrbitState::from_state_vector(&pos, &vel, KERBIN);
        assert!(orbit.semi_major_axis.is_finite());
        assert_eq!(orbit.inclination, 0.0);
        assert!(orbit.apoapsis_altitude() > 1_000.0);
    }
}
