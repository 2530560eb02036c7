use std::f64::consts::TAU;

// ---------------------------------------------------------------------------
// Anomaly conversions for elliptical orbits (0 <= e < 1)
// ---------------------------------------------------------------------------

/// Wrap an angle into [0, 2π).
pub fn wrap_two_pi(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    if a >= TAU { 0.0 } else { a }
}

/// Wrap an angle into (-π, π].
pub fn wrap_pi(angle: f64) -> f64 {
    let a = wrap_two_pi(angle);
    if a > std::f64::consts::PI { a - TAU } else { a }
}

pub fn eccentric_from_true(true_anom: f64, ecc: f64) -> f64 {
    let (s, c) = true_anom.sin_cos();
    wrap_two_pi(((1.0 - ecc * ecc).max(0.0).sqrt() * s).atan2(ecc + c))
}

pub fn true_from_eccentric(ecc_anom: f64, ecc: f64) -> f64 {
    let (s, c) = ecc_anom.sin_cos();
    wrap_two_pi(((1.0 - ecc * ecc).max(0.0).sqrt() * s).atan2(c - ecc))
}

/// Kepler's equation, M = E - e sin E.
pub fn mean_from_eccentric(ecc_anom: f64, ecc: f64) -> f64 {
    wrap_two_pi(ecc_anom - ecc * ecc_anom.sin())
}

/// Closed form: true anomaly → eccentric anomaly → mean anomaly.
pub fn mean_from_true(true_anom: f64, ecc: f64) -> f64 {
    mean_from_eccentric(eccentric_from_true(true_anom, ecc), ecc)
}

/// Inverse of Kepler's equation by Newton iteration.
pub fn eccentric_from_mean(mean_anom: f64, ecc: f64) -> f64 {
    let m = wrap_two_pi(mean_anom);
    let mut e_anom = if ecc < 0.8 { m } else { std::f64::consts::PI };
    for _ in 0..50 {
        let f = e_anom - ecc * e_anom.sin() - m;
        let step = f / (1.0 - ecc * e_anom.cos());
        e_anom -= step;
        if step.abs() < 1e-13 {
            break;
        }
    }
    wrap_two_pi(e_anom)
}

pub fn true_from_mean(mean_anom: f64, ecc: f64) -> f64 {
    true_from_eccentric(eccentric_from_mean(mean_anom, ecc), ecc)
}

/// Fraction of the orbital period separating two mean anomalies, in [0, 1).
///
/// Equal areas: the area swept since periapsis is ½ab(E - e sin E) = ½ab·M,
/// so elapsed time is proportional to the mean-anomaly difference.
pub fn period_fraction_between(mean_from: f64, mean_to: f64) -> f64 {
    wrap_two_pi(mean_to - mean_from) / TAU
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    #[test]
    fn circular_orbit_anomalies_coincide() {
        for nu in [0.0, 0.3, FRAC_PI_2, 2.5, 4.0] {
            assert!((mean_from_true(nu, 0.0) - nu).abs() < 1e-12);
        }
    }

    #[test]
    fn apsides_are_fixed_points() {
        let e = 0.4;
        assert!(mean_from_true(0.0, e).abs() < 1e-12);
        assert!((mean_from_true(PI, e) - PI).abs() < 1e-12);
    }

    #[test]
    fn kepler_inverse_recovers_true_anomaly() {
        let e = 0.25;
        for nu in [0.1, 1.0, 2.0, 3.0, 5.5] {
            let m = mean_from_true(nu, e);
            let back = true_from_mean(m, e);
            assert!((back - nu).abs() < 1e-9, "nu={} back={}", nu, back);
        }
    }

    #[test]
    fn eccentric_orbit_spends_less_time_near_periapsis() {
        // Quarter of the way round in true anomaly is less than a quarter period.
        let frac = period_fraction_between(0.0, mean_from_true(FRAC_PI_2, 0.5));
        assert!(frac < 0.25);
    }

    #[test]
    fn wrap_helpers() {
        assert!((wrap_two_pi(-0.5) - (TAU - 0.5)).abs() < 1e-12);
        assert!((wrap_pi(3.0 * PI / 2.0) + FRAC_PI_2).abs() < 1e-12);
    }
}
