use nalgebra::SVector;

use crate::config::PidGains;

// ---------------------------------------------------------------------------
// PID controller, element-wise over N channels
// ---------------------------------------------------------------------------

/// Vector PID with a clamped integral and derivative-on-measurement.
///
/// Gains are stored pre-scaled by the sample period: `ki` is multiplied by
/// `dt` and `kd` divided by it, so `update` takes no time argument and must
/// be called once per period.
#[derive(Debug, Clone)]
pub struct Pid<const N: usize> {
    kp: f64,
    ki: f64,
    kd: f64,
    integral: SVector<f64, N>,
    last_measurement: SVector<f64, N>,
}

impl<const N: usize> Pid<N> {
    pub fn new(kp: f64, ki: f64, kd: f64, dt: f64) -> Self {
        let mut pid = Self {
            kp: 0.0,
            ki: 0.0,
            kd: 0.0,
            integral: SVector::zeros(),
            last_measurement: SVector::zeros(),
        };
        pid.set_gains(kp, ki, kd, dt);
        pid
    }

    pub fn from_gains(gains: &PidGains) -> Self {
        Self::new(gains.kp, gains.ki, gains.kd, gains.dt)
    }

    /// Replace the gains, keeping the accumulated state.
    pub fn set_gains(&mut self, kp: f64, ki: f64, kd: f64, dt: f64) {
        let dt = if dt > 0.0 { dt } else { 1.0 };
        self.kp = kp;
        self.ki = ki * dt;
        self.kd = kd / dt;
    }

    /// One controller step.
    ///
    /// `measurement` is the process variable itself; its change since the
    /// previous call drives the derivative term, so a jump in the setpoint
    /// produces no derivative kick.
    pub fn update(
        &mut self,
        error: &SVector<f64, N>,
        measurement: &SVector<f64, N>,
        min_output: &SVector<f64, N>,
        max_output: &SVector<f64, N>,
    ) -> SVector<f64, N> {
        self.integral = clamp(&(self.integral + error * self.ki), min_output, max_output);
        let d_input = measurement - self.last_measurement;
        let output = error * self.kp + self.integral - d_input * self.kd;
        self.last_measurement = *measurement;
        clamp(&output, min_output, max_output)
    }

    pub fn reset(&mut self) {
        self.integral = SVector::zeros();
        self.last_measurement = SVector::zeros();
    }

    pub fn integral(&self) -> &SVector<f64, N> {
        &self.integral
    }
}

impl Pid<1> {
    /// Single-channel convenience wrapper around `update`.
    pub fn update_scalar(&mut self, error: f64, measurement: f64, min_output: f64, max_output: f64) -> f64 {
        self.update(
            &SVector::from([error]),
            &SVector::from([measurement]),
            &SVector::from([min_output]),
            &SVector::from([max_output]),
        )[0]
    }
}

impl<const N: usize> Default for Pid<N> {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0)
    }
}

fn clamp<const N: usize>(
    v: &SVector<f64, N>,
    lo: &SVector<f64, N>,
    hi: &SVector<f64, N>,
) -> SVector<f64, N> {
    v.zip_zip_map(lo, hi, |x, lo, hi| x.min(hi).max(lo))
}
