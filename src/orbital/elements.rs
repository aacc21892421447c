use std::f64::consts::TAU;

use nalgebra::Vector3;
use serde::Serialize;

use crate::math::{wrap_two_pi, Axis, Rotation};

use super::anomaly::{
    eccentric_from_mean, eccentric_from_true, mean_from_eccentric, true_from_eccentric,
    KEPLER_ITERATIONS,
};

/// |specific energy| below this fraction of mu/r is treated as parabolic.
const ZERO_ENERGY: f64 = 1e-12;
/// Eccentricity below this is treated as circular.
const ZERO_ECCENTRICITY: f64 = 1e-10;
/// Node vector shorter than this fraction of |h| is treated as equatorial.
const ZERO_INCLINATION: f64 = 1e-10;

/// Classical Keplerian orbital elements plus the derived anomalies and rates.
///
/// For hyperbolic orbits `sma` is negative, `ecc_anom` holds the hyperbolic
/// anomaly and `period` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KeplerianElements {
    pub sma: f64,         // semi-major axis, m
    pub ecc: f64,         // eccentricity (0 = circular)
    pub inc: f64,         // inclination, rad
    pub lan: f64,         // longitude of ascending node, rad
    pub argp: f64,        // argument of periapsis, rad
    pub true_anom: f64,   // rad
    pub ecc_anom: f64,    // rad (hyperbolic anomaly when ecc > 1)
    pub mean_anom: f64,   // rad
    pub mean_motion: f64, // rad/s
    pub period: Option<f64>,
}

impl KeplerianElements {
    /// Build elements from the angular set and a mean anomaly.
    pub fn from_mean_anomaly(
        sma: f64,
        ecc: f64,
        inc: f64,
        lan: f64,
        argp: f64,
        mean_anom: f64,
        mu: f64,
    ) -> Option<Self> {
        if mu <= 0.0 || sma == 0.0 || ecc < 0.0 || (ecc < 1.0) != (sma > 0.0) {
            return None;
        }
        let mean_motion = (mu / sma.abs().powi(3)).sqrt();
        let ecc_anom = eccentric_from_mean(mean_anom, ecc, KEPLER_ITERATIONS);
        Some(KeplerianElements {
            sma,
            ecc,
            inc,
            lan,
            argp,
            true_anom: true_from_eccentric(ecc_anom, ecc),
            ecc_anom,
            mean_anom,
            mean_motion,
            period: (ecc < 1.0).then(|| TAU / mean_motion),
        })
    }

    /// Create a circular orbit of the given radius and inclination.
    pub fn circular(radius: f64, inc: f64, true_anom: f64, mu: f64) -> Option<Self> {
        Self::from_mean_anomaly(radius, 0.0, inc, 0.0, 0.0, true_anom, mu)
    }

    /// Convert a body-centred state vector to Keplerian elements.
    ///
    /// `None` for zero orbital energy (parabolic) and for degenerate
    /// (radial or zero) states.
    pub fn from_state(pos: &Vector3<f64>, vel: &Vector3<f64>, mu: f64) -> Option<Self> {
        let r = pos.norm();
        if r <= 0.0 || mu <= 0.0 {
            return None;
        }
        let v2 = vel.norm_squared();

        let energy = 0.5 * v2 - mu / r;
        if energy.abs() < ZERO_ENERGY * mu / r {
            return None;
        }

        // Angular momentum
        let h = pos.cross(vel);
        let h_mag = h.norm();
        if h_mag <= 0.0 {
            return None;
        }
        let h_hat = h / h_mag;

        // Node vector
        let node = Vector3::new(-h.y, h.x, 0.0);
        let equatorial = node.norm() <= ZERO_INCLINATION * h_mag;

        // Eccentricity vector
        let e_vec = ((v2 - mu / r) * pos - pos.dot(vel) * vel) / mu;
        let ecc = e_vec.norm();
        let circular = ecc < ZERO_ECCENTRICITY;

        let sma = -mu / (2.0 * energy);
        let inc = h.x.hypot(h.y).atan2(h.z);

        // Angle from `a` to `b`, measured in the direction of motion.
        let angle = |a: &Vector3<f64>, b: &Vector3<f64>| h_hat.dot(&a.cross(b)).atan2(a.dot(b));

        let (lan, argp, nu) = if !equatorial {
            let lan = node.y.atan2(node.x);
            if circular {
                // Periapsis undefined: measure from the node instead.
                (lan, 0.0, angle(&node, pos))
            } else {
                (lan, angle(&node, &e_vec), angle(&e_vec, pos))
            }
        } else {
            // Node undefined: place it so the true anomaly lands on the
            // current position.
            let nu = if circular { 0.0 } else { angle(&e_vec, pos) };
            let theta = pos.y.atan2(pos.x);
            let lan = if h.z >= 0.0 { theta - nu } else { theta + nu };
            (lan, 0.0, nu)
        };

        let hyperbolic = ecc > 1.0;
        let nu = if hyperbolic { nu } else { wrap_two_pi(nu) };
        let ecc_anom = eccentric_from_true(nu, ecc);
        let mean_anom = mean_from_eccentric(ecc_anom, ecc);
        let mean_motion = (mu / sma.abs().powi(3)).sqrt();

        Some(KeplerianElements {
            sma,
            ecc,
            inc,
            lan: wrap_two_pi(lan),
            argp: wrap_two_pi(argp),
            true_anom: nu,
            ecc_anom,
            mean_anom,
            mean_motion,
            period: (!hyperbolic).then(|| TAU / mean_motion),
        })
    }

    /// Perifocal -> inertial rotation: LAN about z, then inclination about x,
    /// then argument of periapsis about z.
    pub fn orientation(&self) -> Rotation {
        Rotation::about(Axis::Z, self.lan)
            * Rotation::about(Axis::X, self.inc)
            * Rotation::about(Axis::Z, self.argp)
    }

    /// Convert elements to a body-centred state vector (position, velocity).
    pub fn to_state(&self, mu: f64) -> (Vector3<f64>, Vector3<f64>) {
        let p = self.semi_latus_rectum();
        let (s, c) = self.true_anom.sin_cos();
        let r = p / (1.0 + self.ecc * c);

        // Position in perifocal frame (PQW)
        let r_pqw = Vector3::new(r * c, r * s, 0.0);

        // Velocity in perifocal frame
        let sqrt_mu_p = (mu / p).sqrt();
        let v_pqw = Vector3::new(-sqrt_mu_p * s, sqrt_mu_p * (self.ecc + c), 0.0);

        let rot = self.orientation();
        (rot * r_pqw, rot * v_pqw)
    }

    /// Unit orbit normal (direction of angular momentum).
    pub fn normal(&self) -> Vector3<f64> {
        (Rotation::about(Axis::Z, self.lan) * Rotation::about(Axis::X, self.inc)) * Vector3::z()
    }

    /// Angle between this orbital plane and another, rad.
    pub fn relative_inclination(&self, other: &KeplerianElements) -> f64 {
        let n1 = self.normal();
        let n2 = other.normal();
        n1.cross(&n2).norm().atan2(n1.dot(&n2))
    }

    pub fn semi_latus_rectum(&self) -> f64 {
        self.sma * (1.0 - self.ecc * self.ecc)
    }

    /// Periapsis radius, m.
    pub fn periapsis(&self) -> f64 {
        self.sma * (1.0 - self.ecc)
    }

    /// Apoapsis radius, m; `None` for open orbits.
    pub fn apoapsis(&self) -> Option<f64> {
        (self.ecc < 1.0).then(|| self.sma * (1.0 + self.ecc))
    }

    /// Radius at an eccentric (or hyperbolic) anomaly.
    pub fn radius_at_eccentric(&self, ea: f64) -> f64 {
        if self.ecc < 1.0 {
            self.sma * (1.0 - self.ecc * ea.cos())
        } else {
            self.sma * (1.0 - self.ecc * ea.cosh())
        }
    }

    /// The same orbit `dt` seconds later.
    pub fn advanced(&self, dt: f64) -> Self {
        let mut mean = self.mean_anom + self.mean_motion * dt;
        if self.ecc < 1.0 {
            mean = wrap_two_pi(mean);
        }
        self.with_mean_anomaly(mean)
    }

    /// The same orbit at a different mean anomaly.
    pub fn with_mean_anomaly(&self, mean: f64) -> Self {
        let ecc_anom = eccentric_from_mean(mean, self.ecc, KEPLER_ITERATIONS);
        self.with_anomalies(mean, ecc_anom)
    }

    /// The same orbit at a different eccentric (or hyperbolic) anomaly.
    pub fn with_eccentric_anomaly(&self, ecc_anom: f64) -> Self {
        self.with_anomalies(mean_from_eccentric(ecc_anom, self.ecc), ecc_anom)
    }

    fn with_anomalies(&self, mean: f64, ecc_anom: f64) -> Self {
        KeplerianElements {
            true_anom: true_from_eccentric(ecc_anom, self.ecc),
            ecc_anom,
            mean_anom: mean,
            ..*self
        }
    }

    /// State vector `dt` seconds from now.
    pub fn state_at(&self, dt: f64, mu: f64) -> (Vector3<f64>, Vector3<f64>) {
        self.advanced(dt).to_state(mu)
    }
}

// ---------------------------------------------------------------------------
// Planar (2D) variant for cheap apsis estimates in the surface frame
// ---------------------------------------------------------------------------

/// Size and shape of an orbit from radius plus horizontal/vertical speed,
/// assuming all motion lies in one plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanarOrbit {
    pub sma: f64,
    pub ecc: f64,
}

impl PlanarOrbit {
    /// `radius` is measured from the body centre.
    pub fn from_speeds(radius: f64, hs: f64, vs: f64, mu: f64) -> Option<Self> {
        if radius <= 0.0 || mu <= 0.0 {
            return None;
        }
        let energy = 0.5 * (hs * hs + vs * vs) - mu / radius;
        if energy.abs() < ZERO_ENERGY * mu / radius {
            return None;
        }
        let h = radius * hs;
        let sma = -mu / (2.0 * energy);
        let ecc = (1.0 + 2.0 * energy * h * h / (mu * mu)).max(0.0).sqrt();
        Some(PlanarOrbit { sma, ecc })
    }

    pub fn periapsis(&self) -> f64 {
        self.sma * (1.0 - self.ecc)
    }

    pub fn apoapsis(&self) -> Option<f64> {
        (self.ecc < 1.0).then(|| self.sma * (1.0 + self.ecc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    const MU: f64 = 3.5316e12; // Kerbin
    const R: f64 = 600_000.0;

    fn round_trip(pos: Vector3<f64>, vel: Vector3<f64>) {
        let el = KeplerianElements::from_state(&pos, &vel, MU).unwrap();
        let (p2, v2) = el.to_state(MU);
        assert_relative_eq!(p2, pos, max_relative = 1e-6, epsilon = 1e-6 * pos.norm());
        assert_relative_eq!(v2, vel, max_relative = 1e-6, epsilon = 1e-6 * vel.norm());
    }

    #[rstest]
    #[case::elliptic_inclined(Vector3::new(700_000.0, 120_000.0, -40_000.0), Vector3::new(-300.0, 2_300.0, 400.0))]
    #[case::elliptic_descending(Vector3::new(-500_000.0, 650_000.0, 90_000.0), Vector3::new(-1_900.0, -900.0, -350.0))]
    #[case::hyperbolic(Vector3::new(900_000.0, 0.0, 0.0), Vector3::new(100.0, 3_500.0, 200.0))]
    #[case::hyperbolic_inbound(Vector3::new(-2.0e6, 1.5e6, 3.0e5), Vector3::new(2_200.0, -400.0, 0.0))]
    #[case::equatorial_elliptic(Vector3::new(680_000.0, 50_000.0, 0.0), Vector3::new(-200.0, 2_500.0, 0.0))]
    #[case::equatorial_retrograde(Vector3::new(680_000.0, 50_000.0, 0.0), Vector3::new(200.0, -2_500.0, 0.0))]
    fn state_elements_round_trip(#[case] pos: Vector3<f64>, #[case] vel: Vector3<f64>) {
        round_trip(pos, vel);
    }

    #[rstest]
    #[case(0.0)]
    #[case(0.4)]
    #[case(std::f64::consts::PI)]
    fn circular_round_trip(#[case] inc: f64) {
        let el = KeplerianElements::from_mean_anomaly(R + 100_000.0, 0.0, inc, 1.0, 0.0, 2.0, MU).unwrap();
        let (pos, vel) = el.to_state(MU);
        round_trip(pos, vel);
        let back = KeplerianElements::from_state(&pos, &vel, MU).unwrap();
        assert!(back.ecc < 1e-9);
        assert!((back.sma - el.sma).abs() < 1e-3);
        assert!((back.inc - inc).abs() < 1e-9);
    }

    #[test]
    fn radius_at_eccentric_matches_state() {
        let el = KeplerianElements::from_mean_anomaly(2.0e6, 0.3, 0.5, 1.2, 2.1, 0.7, MU).unwrap();
        assert_relative_eq!(el.radius_at_eccentric(0.0), el.periapsis(), max_relative = 1e-12);
        assert_relative_eq!(el.radius_at_eccentric(std::f64::consts::PI), el.apoapsis().unwrap(), max_relative = 1e-12);
        let (pos, _) = el.with_eccentric_anomaly(1.1).to_state(MU);
        assert_relative_eq!(el.radius_at_eccentric(1.1), pos.norm(), max_relative = 1e-9);
    }

    #[test]
    fn elements_round_trip() {
        let el = KeplerianElements::from_mean_anomaly(2.0e6, 0.3, 0.5, 1.2, 2.1, 0.7, MU).unwrap();
        let (pos, vel) = el.to_state(MU);
        let back = KeplerianElements::from_state(&pos, &vel, MU).unwrap();
        assert!((back.sma - el.sma).abs() / el.sma < 1e-9);
        assert!((back.ecc - el.ecc).abs() < 1e-9);
        assert!((back.inc - el.inc).abs() < 1e-9);
        assert!((back.lan - el.lan).abs() < 1e-9);
        assert!((back.argp - el.argp).abs() < 1e-9);
        assert!((back.mean_anom - el.mean_anom).abs() < 1e-9);
    }

    #[test]
    fn zero_energy_is_unavailable() {
        let r = R + 100_000.0;
        let v_escape = (2.0 * MU / r).sqrt();
        let pos = Vector3::new(r, 0.0, 0.0);
        let vel = Vector3::new(0.0, v_escape, 0.0);
        assert!(KeplerianElements::from_state(&pos, &vel, MU).is_none());
    }

    #[test]
    fn circular_orbit_speed() {
        let r = R + 100_000.0;
        let el = KeplerianElements::circular(r, 0.0, 0.0, MU).unwrap();
        let (_, vel) = el.to_state(MU);
        assert!((vel.norm() - (MU / r).sqrt()).abs() < 1e-6);
    }

    #[test]
    fn low_kerbin_orbit_period() {
        let el = KeplerianElements::circular(R + 100_000.0, 0.0, 0.0, MU).unwrap();
        let period = el.period.unwrap();
        // ~32 min for a 100 km Kerbin orbit
        assert!(period > 1900.0 && period < 2000.0, "got {:.0} s", period);
    }

    #[test]
    fn hyperbolic_has_no_period() {
        let pos = Vector3::new(R + 100_000.0, 0.0, 0.0);
        let vel = Vector3::new(0.0, 4_000.0, 0.0);
        let el = KeplerianElements::from_state(&pos, &vel, MU).unwrap();
        assert!(el.ecc > 1.0 && el.sma < 0.0);
        assert!(el.period.is_none() && el.apoapsis().is_none());
    }

    #[test]
    fn advancing_one_period_returns_home() {
        let el = KeplerianElements::from_mean_anomaly(2.0e6, 0.2, 0.1, 0.0, 0.5, 1.0, MU).unwrap();
        let (p0, _) = el.to_state(MU);
        let (p1, _) = el.state_at(el.period.unwrap(), MU);
        assert!((p1 - p0).norm() < 1e-3);
    }

    #[test]
    fn relative_inclination_between_planes() {
        let a = KeplerianElements::circular(1e6, 0.1, 0.0, MU).unwrap();
        let b = KeplerianElements::circular(2e6, 0.4, 0.0, MU).unwrap();
        assert!((a.relative_inclination(&b) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn planar_circular() {
        let r = R + 80_000.0;
        let o = PlanarOrbit::from_speeds(r, (MU / r).sqrt(), 0.0, MU).unwrap();
        assert!((o.sma - r).abs() < 1e-3);
        assert!(o.ecc < 1e-6);
    }

    #[test]
    fn planar_matches_full_elements() {
        let r = R + 30_000.0;
        let (hs, vs) = (1_800.0, 350.0);
        let planar = PlanarOrbit::from_speeds(r, hs, vs, MU).unwrap();
        let full = KeplerianElements::from_state(
            &Vector3::new(r, 0.0, 0.0),
            &Vector3::new(vs, hs, 0.0),
            MU,
        )
        .unwrap();
        assert!((planar.sma - full.sma).abs() < 1e-6 * full.sma);
        assert!((planar.ecc - full.ecc).abs() < 1e-9);
        assert!((planar.apoapsis().unwrap() - full.apoapsis().unwrap()).abs() < 1e-3);
    }
}
