use nalgebra::Vector3;

use crate::orbital::propagator::point_mass_accel;
use crate::orbital::PrimaryBody;

/// Standard gravity, converts specific impulse to exhaust velocity.
pub const G0: f64 = 9.80665;

/// A spherical, non-rotating body with an exponential atmosphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CelestialBody {
    pub name: &'static str,
    pub mu: f64,               // m^3/s^2
    pub radius: f64,           // m
    pub atmosphere_depth: f64, // m, density is zero above this
    pub surface_density: f64,  // kg/m^3
    pub scale_height: f64,     // m
}

/// Kerbin-like home world: small, dense, 70 km atmosphere.
pub fn kerbin() -> CelestialBody {
    CelestialBody {
        name: "Kerbin",
        mu: 3.5316e12,
        radius: 600_000.0,
        atmosphere_depth: 70_000.0,
        surface_density: 1.2,
        scale_height: 5_600.0,
    }
}

impl CelestialBody {
    pub fn primary(&self) -> PrimaryBody {
        PrimaryBody {
            mu: self.mu,
            radius: self.radius,
            atmosphere_depth: self.atmosphere_depth,
        }
    }

    pub fn altitude(&self, pos: &Vector3<f64>) -> f64 {
        pos.norm() - self.radius
    }

    /// Air density at altitude (kg/m^3).
    pub fn density(&self, altitude: f64) -> f64 {
        if altitude >= self.atmosphere_depth {
            return 0.0;
        }
        self.surface_density * (-altitude.max(0.0) / self.scale_height).exp()
    }

    /// Inverse-square gravity acceleration at an inertial position.
    pub fn gravity_accel(&self, pos: &Vector3<f64>) -> Vector3<f64> {
        point_mass_accel(pos, self.mu)
    }

    /// Surface gravity magnitude.
    pub fn surface_gravity(&self) -> f64 {
        self.mu / (self.radius * self.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sea_level_gravity() {
        let body = kerbin();
        let g = body.gravity_accel(&Vector3::new(body.radius, 0.0, 0.0));
        assert!((g.x + 9.81).abs() < 0.01, "got {}", g.x);
        assert!((body.surface_gravity() - 9.81).abs() < 0.01);
    }

    #[test]
    fn gravity_decreases_with_altitude() {
        let body = kerbin();
        let g0 = body.gravity_accel(&Vector3::new(body.radius, 0.0, 0.0)).norm();
        let g100k = body.gravity_accel(&Vector3::new(body.radius + 100_000.0, 0.0, 0.0)).norm();
        assert!(g100k < g0);
    }

    #[test]
    fn atmosphere_ends_at_its_depth() {
        let body = kerbin();
        assert!((body.density(0.0) - 1.2).abs() < 1e-12);
        assert!(body.density(10_000.0) < body.density(5_000.0));
        assert_eq!(body.density(70_000.0), 0.0);
        assert_eq!(body.density(-50.0), 1.2);
    }
}
