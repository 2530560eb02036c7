use crate::vessel::{clamp_throttle, Actuation, Telemetry};

// ---------------------------------------------------------------------------
// Deadband throttle limiters
// ---------------------------------------------------------------------------

/// Full throttle below 90 % of the setpoint, idle above 110 %, and a linear
/// ramp from 1 down to 0 across the band in between.
pub fn deadband_throttle(pv: f64, setpoint: f64) -> f64 {
    let high = setpoint * 1.1;
    let low = setpoint * 0.9;
    let out = if pv <= low {
        1.0
    } else if pv >= high {
        0.0
    } else {
        (high - pv) / (high - low)
    };
    clamp_throttle(out)
}

/// A throttle limiter samples one process variable per tick and commands the
/// throttle from it.
pub trait ThrottleController<V: Telemetry + Actuation + ?Sized> {
    /// Current process variable.
    fn pv(&self, vessel: &V) -> f64;

    fn setpoint(&self) -> f64;

    /// Write the manipulated variable.
    fn mv(&self, vessel: &mut V, throttle: f64) {
        vessel.set_throttle(throttle);
    }

    /// One limiter step; returns the throttle that was written.
    fn update(&self, vessel: &mut V) -> f64 {
        let throttle = deadband_throttle(self.pv(vessel), self.setpoint());
        self.mv(vessel, throttle);
        throttle
    }
}

/// Throttles back around a dynamic-pressure ceiling.
#[derive(Debug, Clone, Copy)]
pub struct MaxDynamicPressureLimiter {
    pub max_q: f64, // Pa
}

impl MaxDynamicPressureLimiter {
    pub fn new(max_q: f64) -> Self {
        Self { max_q }
    }
}

impl Default for MaxDynamicPressureLimiter {
    fn default() -> Self {
        Self::new(7000.0)
    }
}

impl<V: Telemetry + Actuation + ?Sized> ThrottleController<V> for MaxDynamicPressureLimiter {
    fn pv(&self, vessel: &V) -> f64 {
        vessel.state().dynamic_pressure
    }

    fn setpoint(&self) -> f64 {
        self.max_q
    }
}

/// Throttles back around a target speed.
#[derive(Debug, Clone, Copy)]
pub struct MaxSpeedLimiter {
    pub max_speed: f64, // m/s
}

impl MaxSpeedLimiter {
    pub fn new(max_speed: f64) -> Self {
        Self { max_speed }
    }
}

impl<V: Telemetry + Actuation + ?Sized> ThrottleController<V> for MaxSpeedLimiter {
    fn pv(&self, vessel: &V) -> f64 {
        vessel.state().speed
    }

    fn setpoint(&self) -> f64 {
        self.max_speed
    }
}
