//! Encounter prediction: closest approach to a target body and the
//! sphere-of-influence crossings either side of it.
//!
//! Both the vessel and the target are evaluated analytically from their
//! elements (mean motion), never integrated. Every search has a fixed sample
//! count and a bounded Newton refinement; degenerate geometry yields `None`.

use log::{debug, warn};
use nalgebra::Vector3;

use crate::physics::gravity::gravity_pointmass;

use super::body::BodyRegistry;
use super::elements::KeplerianElements;

/// Coarse samples across one synodic period.
pub const APPROACH_SAMPLES: usize = 80;
/// Maximum Newton iterations when refining an event time.
pub const REFINE_ITERATIONS: usize = 24;
/// Refinement stops once a Newton step is shorter than this, s.
const REFINE_TOLERANCE: f64 = 1.0;

/// Body being approached, expressed about the vessel's current parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetBody {
    pub elements: KeplerianElements, // about the common parent, at t = 0
    pub mu: f64,
    pub soi: f64,
}

impl TargetBody {
    /// Look a target up in the registry at universal time `ut`.
    pub fn from_registry(registry: &BodyRegistry, name: &str, ut: f64) -> Option<Self> {
        Some(TargetBody {
            elements: registry.elements_at(name, ut)?,
            mu: registry.get(name)?.mu,
            soi: registry.soi(name)?,
        })
    }
}

/// Closest approach between vessel and target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Approach {
    pub time: f64,              // s from now
    pub distance: f64,          // m
    pub rel_pos: Vector3<f64>,  // vessel - target
    pub rel_vel: Vector3<f64>,
}

/// State at a sphere-of-influence boundary, in the frame being entered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoiCrossing {
    pub time: f64,
    pub pos: Vector3<f64>,
    pub vel: Vector3<f64>,
    pub elements: Option<KeplerianElements>,
}

/// Relative position, velocity and acceleration `t` seconds from now.
fn relative(
    vessel: &KeplerianElements,
    target: &KeplerianElements,
    mu: f64,
    t: f64,
) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let (rv, vv) = vessel.state_at(t, mu);
    let (rt, vt) = target.state_at(t, mu);
    let accel = gravity_pointmass(&rv, mu) - gravity_pointmass(&rt, mu);
    (rv - rt, vv - vt, accel)
}

/// Newton iteration on `f(t) = 0`, where `f` returns (value, derivative).
/// Gives up if a step grows relative to the previous one or the iteration
/// budget runs out.
fn refine<F>(t0: f64, f: F) -> Option<f64>
where
    F: Fn(f64) -> (f64, f64),
{
    let mut t = t0;
    let mut last_step = f64::INFINITY;
    for _ in 0..REFINE_ITERATIONS {
        let (g, dg) = f(t);
        if dg == 0.0 || !g.is_finite() || !dg.is_finite() {
            return None;
        }
        let step = g / dg;
        if step.abs() > last_step {
            warn!("refinement diverging at t={:.1} (step {:.1}s)", t, step);
            return None;
        }
        t -= step;
        if step.abs() < REFINE_TOLERANCE {
            return Some(t);
        }
        last_step = step.abs();
    }
    debug!("refinement did not settle in {} iterations", REFINE_ITERATIONS);
    None
}

/// Time window over which the relative geometry repeats.
pub fn synodic_period(a: &KeplerianElements, b: &KeplerianElements) -> Option<f64> {
    match (a.period, b.period) {
        (Some(p1), Some(p2)) => {
            let rate = (1.0 / p1 - 1.0 / p2).abs();
            if rate * p1.max(p2) < 1e-9 {
                Some(p1.max(p2))
            } else {
                Some(1.0 / rate)
            }
        }
        (None, Some(p)) | (Some(p), None) => Some(p),
        (None, None) => None,
    }
}

/// Closest approach of `vessel` to `target` within one synodic period.
/// Both orbits are about the same parent (gravitational parameter `mu`).
pub fn closest_approach(
    vessel: &KeplerianElements,
    target: &KeplerianElements,
    mu: f64,
) -> Option<Approach> {
    let window = synodic_period(vessel, target)?;

    // Coarse pass: bracket the minimum separation.
    let (t_best, _) = (0..=APPROACH_SAMPLES)
        .map(|i| {
            let t = window * i as f64 / APPROACH_SAMPLES as f64;
            let (dr, _, _) = relative(vessel, target, mu, t);
            (t, dr.norm())
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))?;

    // Fine pass: d/dt(|dr|^2 / 2) = dr·dv = 0
    let t = refine(t_best, |t| {
        let (dr, dv, da) = relative(vessel, target, mu, t);
        (dr.dot(&dv), dv.dot(&dv) + dr.dot(&da))
    })?;
    if t < 0.0 || t > window {
        return None;
    }

    let (rel_pos, rel_vel, _) = relative(vessel, target, mu, t);
    Some(Approach { time: t, distance: rel_pos.norm(), rel_pos, rel_vel })
}

/// Entry into the target's sphere of influence before closest approach.
///
/// The crossing time is first estimated from straight-line relative motion
/// through the approach point, then refined against the real orbits.
pub fn soi_entry(
    vessel: &KeplerianElements,
    target: &TargetBody,
    mu: f64,
    approach: &Approach,
) -> Option<SoiCrossing> {
    if approach.distance >= target.soi {
        return None;
    }
    let dr = approach.rel_pos;
    let dv = approach.rel_vel;

    // |dr + dv·τ|² = soi²
    let a = dv.dot(&dv);
    let b = 2.0 * dr.dot(&dv);
    let c = dr.dot(&dr) - target.soi * target.soi;
    if a <= 0.0 {
        return None;
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    // Entry is the earlier root (separation decreasing).
    let tau = (-b - disc.sqrt()) / (2.0 * a);
    let t0 = approach.time + tau;

    let soi2 = target.soi * target.soi;
    let t = refine(t0, |t| {
        let (dr, dv, _) = relative(vessel, &target.elements, mu, t);
        (dr.dot(&dr) - soi2, 2.0 * dr.dot(&dv))
    })?;

    let (pos, vel, _) = relative(vessel, &target.elements, mu, t);
    if pos.dot(&vel) > 0.0 {
        // Converged onto the exit side.
        return None;
    }
    Some(SoiCrossing {
        time: t,
        pos,
        vel,
        elements: KeplerianElements::from_state(&pos, &vel, target.mu),
    })
}

/// Exit from the current body's sphere of influence, re-expressed about
/// the parent body.
///
/// `orbit` is the vessel about the current body (mu `mu`, SOI radius `soi`);
/// `body` is the current body's own orbit about its parent (mu `parent_mu`).
pub fn soi_exit(
    orbit: &KeplerianElements,
    mu: f64,
    soi: f64,
    body: &KeplerianElements,
    parent_mu: f64,
) -> Option<SoiCrossing> {
    if orbit.ecc <= 0.0 || orbit.sma == 0.0 {
        return None;
    }
    // r = a(1 - e cos E) or r = a(1 - e cosh H), solved for the anomaly.
    let k = (1.0 - soi / orbit.sma) / orbit.ecc;
    let exit_anom = if orbit.ecc < 1.0 {
        if !(-1.0..=1.0).contains(&k) {
            return None; // apoapsis inside the SOI
        }
        k.acos()
    } else {
        if k < 1.0 {
            return None;
        }
        k.acosh()
    };

    if (orbit.radius_at_eccentric(exit_anom) - soi).abs() > 1e-6 * soi {
        return None;
    }
    let exit = orbit.with_eccentric_anomaly(exit_anom);
    let mut dt = (exit.mean_anom - orbit.mean_anom) / orbit.mean_motion;
    if dt < 0.0 {
        match orbit.period {
            Some(period) => dt += period * (-dt / period).ceil(),
            None => return None, // already outbound past the boundary
        }
    }

    let (rel_pos, rel_vel) = exit.to_state(mu);
    let (body_pos, body_vel) = body.state_at(dt, parent_mu);
    let pos = body_pos + rel_pos;
    let vel = body_vel + rel_vel;

    Some(SoiCrossing {
        time: dt,
        pos,
        vel,
        elements: KeplerianElements::from_state(&pos, &vel, parent_mu),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const MU: f64 = 3.5316e12;

    #[test]
    fn stock_mun_encounter_from_registry() {
        let mun = TargetBody::from_registry(&BodyRegistry::stock(), "Mun", 0.0).unwrap();
        assert_eq!(mun.soi, 2_429_559.1);

        // Transfer ellipse from 700 km to 11.5 Mm, apoapsis timed to pass
        // 500 km inside the Mun's orbit.
        let (rp, ra) = (700_000.0, 11_500_000.0);
        let a: f64 = (rp + ra) / 2.0;
        let n = (MU / a.powi(3)).sqrt();
        let n_mun = (MU / 12_000_000f64.powi(3)).sqrt();
        let argp = 1.7 + n_mun * PI / n - PI;
        let vp = (MU * (2.0 / rp - 1.0 / a)).sqrt();
        let pos = Vector3::new(rp * argp.cos(), rp * argp.sin(), 0.0);
        let vel = Vector3::new(-vp * argp.sin(), vp * argp.cos(), 0.0);
        let vessel = KeplerianElements::from_state(&pos, &vel, MU).unwrap();

        let app = closest_approach(&vessel, &mun.elements, MU).unwrap();
        assert!((app.time - PI / n).abs() < 5.0, "approach at {:.1}", app.time);
        assert!((app.distance - 500_000.0).abs() < 1_000.0, "distance {:.0}", app.distance);

        let entry = soi_entry(&vessel, &mun, MU, &app).unwrap();
        assert!(entry.time < app.time);
        assert!((entry.time - 18_430.0).abs() < 10.0, "entry at {:.1}", entry.time);
        assert!((entry.pos.norm() - mun.soi).abs() < 100.0);
        assert!(entry.elements.is_some());
    }

    #[test]
    fn registry_target_needs_a_parent() {
        assert!(TargetBody::from_registry(&BodyRegistry::stock(), "Sun", 0.0).is_none());
        assert!(TargetBody::from_registry(&BodyRegistry::NotLoaded, "Mun", 0.0).is_none());
    }

    #[test]
    fn coplanar_circular_closest_approach() {
        let (r1, r2) = (1.0e6, 1.5e6);
        let vessel = KeplerianElements::circular(r1, 0.0, 0.0, MU).unwrap();
        let target = KeplerianElements::circular(r2, 0.0, 1.0, MU).unwrap();

        let app = closest_approach(&vessel, &target, MU).unwrap();
        let n1 = vessel.mean_motion;
        let n2 = target.mean_motion;
        let expected_t = 1.0 / (n1 - n2);

        assert!((app.time - expected_t).abs() < 1.0, "t {} vs {}", app.time, expected_t);
        assert!((app.distance - (r2 - r1)).abs() < 1.0, "d {}", app.distance);
    }

    #[test]
    fn phase_wraps_within_synodic_window() {
        let (r1, r2) = (1.0e6, 1.5e6);
        let vessel = KeplerianElements::circular(r1, 0.0, 2.0, MU).unwrap();
        let target = KeplerianElements::circular(r2, 0.0, 0.5, MU).unwrap();
        let app = closest_approach(&vessel, &target, MU).unwrap();
        // Vessel is 1.5 rad ahead; it must lap the target: 2π - 1.5 rad to gain.
        let expected_t = (std::f64::consts::TAU - 1.5) / (vessel.mean_motion - target.mean_motion);
        assert!((app.time - expected_t).abs() < 1.0);
        assert!((app.distance - 0.5e6).abs() < 1.0);
    }

    #[test]
    fn hyperbolic_pair_has_no_window() {
        let pos = Vector3::new(1e6, 0.0, 0.0);
        let vel = Vector3::new(0.0, 5_000.0, 0.0);
        let h = KeplerianElements::from_state(&pos, &vel, MU).unwrap();
        assert!(closest_approach(&h, &h, MU).is_none());
    }

    #[test]
    fn soi_entry_precedes_approach() {
        let vessel = KeplerianElements::circular(1.0e6, 0.0, 0.0, MU).unwrap();
        let target_el = KeplerianElements::circular(1.2e6, 0.0, 0.8, MU).unwrap();
        let target = TargetBody { elements: target_el, mu: 6.5e10, soi: 300_000.0 };
        let app = closest_approach(&vessel, &target_el, MU).unwrap();
        let entry = soi_entry(&vessel, &target, MU, &app).unwrap();
        assert!(entry.time < app.time);
        assert!((entry.pos.norm() - 300_000.0).abs() < 100.0, "entry at {}", entry.pos.norm());
        assert!(entry.pos.dot(&entry.vel) < 0.0);
        assert!(entry.elements.is_some());
    }

    #[test]
    fn soi_entry_misses_when_too_far() {
        let vessel = KeplerianElements::circular(1.0e6, 0.0, 0.0, MU).unwrap();
        let target_el = KeplerianElements::circular(1.5e6, 0.0, 0.8, MU).unwrap();
        let target = TargetBody { elements: target_el, mu: 6.5e10, soi: 100_000.0 };
        let app = closest_approach(&vessel, &target_el, MU).unwrap();
        assert!(soi_entry(&vessel, &target, MU, &app).is_none());
    }

    #[test]
    fn soi_exit_on_escape_orbit() {
        let reg = BodyRegistry::stock();
        let kerbin = reg.get("Kerbin").unwrap();
        let soi = reg.soi("Kerbin").unwrap();
        let body = reg.elements_at("Kerbin", 0.0).unwrap();
        let sun_mu = reg.get("Sun").unwrap().mu;

        let r = kerbin.radius + 100_000.0;
        let pos = Vector3::new(r, 0.0, 0.0);
        let vel = Vector3::new(0.0, 3_500.0, 0.0);
        let escape = KeplerianElements::from_state(&pos, &vel, kerbin.mu).unwrap();
        assert!(escape.ecc > 1.0);

        let exit = soi_exit(&escape, kerbin.mu, soi, &body, sun_mu).unwrap();
        assert!(exit.time > 0.0);
        let (body_pos, _) = body.state_at(exit.time, sun_mu);
        assert!(((exit.pos - body_pos).norm() - soi).abs() < 1.0);
        let sun_orbit = exit.elements.unwrap();
        assert!(sun_orbit.ecc < 1.0, "should be bound to the Sun");
    }

    #[test]
    fn bound_orbit_inside_soi_never_exits() {
        let vessel = KeplerianElements::circular(700_000.0, 0.0, 0.0, MU).unwrap();
        let body = KeplerianElements::circular(1.36e10, 0.0, 0.0, 1.17e18).unwrap();
        assert!(soi_exit(&vessel, MU, 8.4e7, &body, 1.17e18).is_none());
    }

    #[test]
    fn elliptic_exit_on_outbound_leg() {
        // Apoapsis beyond the SOI: exits at E = acos((1 - soi/a)/e)
        let vessel = KeplerianElements::from_mean_anomaly(5.0e6, 0.8, 0.0, 0.0, 0.0, 0.0, MU).unwrap();
        let body = KeplerianElements::circular(1.36e10, 0.0, 0.0, 1.17e18).unwrap();
        let exit = soi_exit(&vessel, MU, 8.0e6, &body, 1.17e18).unwrap();
        let (bp, _) = body.state_at(exit.time, 1.17e18);
        assert!(((exit.pos - bp).norm() - 8.0e6).abs() < 1e-3 * 8.0e6);
        assert!(exit.time > 0.0 && exit.time < vessel.period.unwrap() / 2.0);
    }
}
