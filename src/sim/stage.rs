use nalgebra::Vector3;

use super::body::G0;

// ---------------------------------------------------------------------------
// Stage definition (one stage of a multi-stage rocket)
// ---------------------------------------------------------------------------

/// Stages are listed bottom first: stage 0 lights first and is dropped first.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    pub name: String,
    pub dry_mass: f64,
    pub propellant_mass: f64,
    pub thrust: f64,                  // N, vacuum, full throttle; 0 for no engine
    pub isp: f64,                     // s
    pub drag_area: f64,               // m^2, Cd times reference area
    pub inertia: Vector3<f64>,        // [Ixx, Iyy, Izz] principal moments, kg·m^2
    pub control_torque: Vector3<f64>, // N·m at full command, per body axis
}

impl Stage {
    pub fn has_engine(&self) -> bool {
        self.thrust > 0.0
    }

    pub fn mass_flow(&self) -> f64 {
        if self.has_engine() && self.isp > 0.0 {
            self.thrust / (self.isp * G0)
        } else {
            0.0
        }
    }

    pub fn total_mass(&self) -> f64 {
        self.dry_mass + self.propellant_mass
    }

    /// Self-consistent burn time from propellant and mass flow.
    pub fn burn_time(&self) -> f64 {
        let flow = self.mass_flow();
        if flow > 0.0 {
            self.propellant_mass / flow
        } else {
            0.0
        }
    }

    pub fn delta_v(&self, payload_mass: f64) -> f64 {
        let m0 = self.total_mass() + payload_mass;
        let mf = self.dry_mass + payload_mass;
        self.isp * G0 * (m0 / mf).ln()
    }
}

// ---------------------------------------------------------------------------
// Stage builder
// ---------------------------------------------------------------------------

pub struct StageBuilder {
    name: String,
    dry_mass: f64,
    propellant_mass: f64,
    thrust: f64,
    isp: f64,
    drag_area: f64,
    inertia: Vector3<f64>,
    control_torque: Vector3<f64>,
}

impl StageBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dry_mass: 1_000.0,
            propellant_mass: 2_000.0,
            thrust: 50_000.0,
            isp: 300.0,
            drag_area: 1.0,
            inertia: Vector3::repeat(2_000.0),
            control_torque: Vector3::repeat(4_000.0),
        }
    }

    pub fn dry_mass(mut self, v: f64) -> Self { self.dry_mass = v; self }
    pub fn propellant_mass(mut self, v: f64) -> Self { self.propellant_mass = v; self }
    pub fn thrust(mut self, v: f64) -> Self { self.thrust = v; self }
    pub fn isp(mut self, v: f64) -> Self { self.isp = v; self }
    pub fn drag_area(mut self, v: f64) -> Self { self.drag_area = v; self }
    pub fn inertia(mut self, v: Vector3<f64>) -> Self { self.inertia = v; self }
    pub fn control_torque(mut self, v: Vector3<f64>) -> Self { self.control_torque = v; self }

    pub fn build(self) -> Stage {
        Stage {
            name: self.name,
            dry_mass: self.dry_mass,
            propellant_mass: self.propellant_mass,
            thrust: self.thrust,
            isp: self.isp,
            drag_area: self.drag_area,
            inertia: self.inertia,
            control_torque: self.control_torque,
        }
    }
}
