//! Conversions between true, eccentric and mean anomaly.
//!
//! Elliptical orbits (`0 <= e < 1`) use the eccentric anomaly E, hyperbolic
//! orbits (`e > 1`) the hyperbolic anomaly H, and the parabolic case falls
//! back to Barker's parabolic anomaly D = tan(ν/2).
//!
//! Kepler's equation is solved by Newton iteration with a fixed iteration
//! count and no convergence test, so the cost of a call is bounded.

use std::f64::consts::{PI, TAU};

/// Default Newton iteration count for Kepler's equation.
pub const KEPLER_ITERATIONS: usize = 12;

/// Eccentricities this close to 1 are treated as parabolic.
const PARABOLIC_TOLERANCE: f64 = 1e-12;

fn is_parabolic(ecc: f64) -> bool {
    (ecc - 1.0).abs() < PARABOLIC_TOLERANCE
}

/// True anomaly -> eccentric (or hyperbolic / parabolic) anomaly.
pub fn eccentric_from_true(nu: f64, ecc: f64) -> f64 {
    let half = (nu / 2.0).tan();
    if is_parabolic(ecc) {
        half
    } else if ecc < 1.0 {
        // Keep E on the same revolution as ν.
        let revs = (nu / TAU).round();
        let nu0 = nu - revs * TAU;
        let e = 2.0 * (((1.0 - ecc) / (1.0 + ecc)).sqrt() * (nu0 / 2.0).tan()).atan();
        e + revs * TAU
    } else {
        2.0 * (((ecc - 1.0) / (ecc + 1.0)).sqrt() * half).atanh()
    }
}

/// Eccentric (or hyperbolic / parabolic) anomaly -> true anomaly.
pub fn true_from_eccentric(ea: f64, ecc: f64) -> f64 {
    if is_parabolic(ecc) {
        2.0 * ea.atan()
    } else if ecc < 1.0 {
        let revs = (ea / TAU).round();
        let e0 = ea - revs * TAU;
        let nu = 2.0 * (((1.0 + ecc) / (1.0 - ecc)).sqrt() * (e0 / 2.0).tan()).atan();
        nu + revs * TAU
    } else {
        2.0 * (((ecc + 1.0) / (ecc - 1.0)).sqrt() * (ea / 2.0).tanh()).atan()
    }
}

/// Kepler's equation, forward direction.
pub fn mean_from_eccentric(ea: f64, ecc: f64) -> f64 {
    if is_parabolic(ecc) {
        ea + ea.powi(3) / 3.0
    } else if ecc < 1.0 {
        ea - ecc * ea.sin()
    } else {
        ecc * ea.sinh() - ea
    }
}

/// Invert Kepler's equation with exactly `iterations` Newton steps.
pub fn eccentric_from_mean(mean: f64, ecc: f64, iterations: usize) -> f64 {
    if is_parabolic(ecc) {
        // Barker's equation has a closed-form root.
        let w = 1.5 * mean.abs();
        let y = (w + (w * w + 1.0).sqrt()).cbrt();
        return (y - 1.0 / y).copysign(mean);
    }

    if ecc < 1.0 {
        let revs = (mean / TAU).round();
        let m = mean - revs * TAU;
        let mut ea = if ecc < 0.8 { m } else { PI.copysign(m) };
        for _ in 0..iterations {
            let f = ea - ecc * ea.sin() - m;
            let fp = 1.0 - ecc * ea.cos();
            ea -= f / fp;
        }
        ea + revs * TAU
    } else {
        let mut ha = if mean == 0.0 {
            0.0
        } else {
            (2.0 * mean.abs() / ecc + 1.8).ln().copysign(mean)
        };
        for _ in 0..iterations {
            let f = ecc * ha.sinh() - ha - mean;
            let fp = ecc * ha.cosh() - 1.0;
            ha -= f / fp;
        }
        ha
    }
}

/// Mean anomaly -> true anomaly, using the default iteration count.
pub fn true_from_mean(mean: f64, ecc: f64) -> f64 {
    true_from_eccentric(eccentric_from_mean(mean, ecc, KEPLER_ITERATIONS), ecc)
}

/// True anomaly -> mean anomaly.
pub fn mean_from_true(nu: f64, ecc: f64) -> f64 {
    mean_from_eccentric(eccentric_from_true(nu, ecc), ecc)
}
