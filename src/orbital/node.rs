use std::fmt;

use nalgebra::Vector3;

/// Handle returned by the vessel when a node is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which extremum of the orbit a burn is placed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Apsis {
    Apoapsis,
    Periapsis,
}

/// Equator crossing used for plane changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrbitNode {
    Ascending,
    Descending,
}

/// A scheduled impulsive burn.
///
/// Delta-v components are relative to the orbital velocity at `ut`:
/// prograde along velocity, normal along orbital angular momentum,
/// radial completing the right-handed set (pointing away from the body).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManeuverNode {
    pub ut: f64,       // s, universal time of the burn
    pub prograde: f64, // m/s
    pub normal: f64,   // m/s
    pub radial: f64,   // m/s
}

impl ManeuverNode {
    pub fn new(ut: f64, prograde: f64, normal: f64, radial: f64) -> Self {
        Self { ut, prograde, normal, radial }
    }

    /// Purely tangential burn.
    pub fn prograde(ut: f64, delta_v: f64) -> Self {
        Self::new(ut, delta_v, 0.0, 0.0)
    }

    /// Burn vector as (prograde, normal, radial) components.
    pub fn burn_components(&self) -> Vector3<f64> {
        Vector3::new(self.prograde, self.normal, self.radial)
    }

    /// Total delta-v magnitude, m/s.
    pub fn delta_v(&self) -> f64 {
        self.burn_components().norm()
    }
}
