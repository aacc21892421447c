use std::f64::consts::{PI, TAU};

use crate::math::wrap_two_pi;

use super::elements::KeplerianElements;

/// Result of a Hohmann transfer calculation.
#[derive(Debug, Clone, Copy)]
pub struct HohmannTransfer {
    pub dv1: f64,           // m/s, first burn (raise apoapsis)
    pub dv2: f64,           // m/s, second burn (circularize)
    pub total_dv: f64,      // m/s, total delta-v
    pub transfer_time: f64, // s, half the transfer orbit period
    pub r1: f64,            // m, initial orbit radius
    pub r2: f64,            // m, final orbit radius
}

/// Compute Hohmann transfer between two circular orbits.
///
/// `r1` and `r2` are orbital radii (not altitudes), in meters, about a body
/// with gravitational parameter `mu`.
pub fn hohmann(r1: f64, r2: f64, mu: f64) -> Option<HohmannTransfer> {
    if r1 <= 0.0 || r2 <= 0.0 || mu <= 0.0 {
        return None;
    }
    let a_transfer = (r1 + r2) / 2.0;

    let v_circ1 = circular_velocity(r1, mu);
    let v_circ2 = circular_velocity(r2, mu);

    let v_transfer_1 = (mu * (2.0 / r1 - 1.0 / a_transfer)).sqrt();
    let v_transfer_2 = (mu * (2.0 / r2 - 1.0 / a_transfer)).sqrt();

    let dv1 = (v_transfer_1 - v_circ1).abs();
    let dv2 = (v_circ2 - v_transfer_2).abs();

    let transfer_time = PI * (a_transfer.powi(3) / mu).sqrt();

    Some(HohmannTransfer {
        dv1,
        dv2,
        total_dv: dv1 + dv2,
        transfer_time,
        r1,
        r2,
    })
}

/// Circular orbit velocity at a given radius.
pub fn circular_velocity(r: f64, mu: f64) -> f64 {
    (mu / r).sqrt()
}

/// Phase angle (target ahead of departure, rad) at which a Hohmann transfer
/// from `r1` arrives at a target on a circular orbit of radius `r2`.
/// Negative when the target must trail (outer-to-inner transfers).
pub fn transfer_phase_angle(r1: f64, r2: f64, mu: f64) -> Option<f64> {
    let transfer = hohmann(r1, r2, mu)?;
    let target_rate = (mu / r2.powi(3)).sqrt();
    Some(PI - target_rate * transfer.transfer_time)
}

/// Departure window between two coplanar orbits about the same parent.
#[derive(Debug, Clone, Copy)]
pub struct TransferWindow {
    pub phase_angle: f64,  // rad, required target lead at departure
    pub current_phase: f64, // rad, current target lead
    pub wait: f64,         // s until departure
    pub transfer: HohmannTransfer,
}

/// Time until the Hohmann departure window from `origin` to `target`,
/// treating both orbits as circular at their semi-major axes.
///
/// `None` for open orbits or when the two orbits share a mean motion
/// (the phase never changes).
pub fn transfer_window(
    origin: &KeplerianElements,
    target: &KeplerianElements,
    mu: f64,
) -> Option<TransferWindow> {
    if origin.period.is_none() || target.period.is_none() {
        return None;
    }
    let transfer = hohmann(origin.sma, target.sma, mu)?;
    let phase_angle = transfer_phase_angle(origin.sma, target.sma, mu)?;

    let longitude = |el: &KeplerianElements| el.lan + el.argp + el.true_anom;
    let current_phase = wrap_two_pi(longitude(target) - longitude(origin));

    // The lead changes at the difference of the mean motions.
    let rate = target.mean_motion - origin.mean_motion;
    if rate.abs() < 1e-15 {
        return None;
    }
    let mut wait = (phase_angle - current_phase) / rate;
    if wait < 0.0 {
        wait += TAU / rate.abs() * (-wait * rate.abs() / TAU).ceil();
    }

    Some(TransferWindow { phase_angle, current_phase, wait, transfer })
}

/// Delta-v for a pure plane change of `angle` rad at speed `v`.
pub fn plane_change_dv(v: f64, angle: f64) -> f64 {
    2.0 * v * (angle / 2.0).sin().abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MU_KERBIN: f64 = 3.5316e12;
    const MU_SUN: f64 = 1.172_332_8e18;

    #[test]
    fn hohmann_lko_to_mun() {
        let r_lko = 600_000.0 + 80_000.0;
        let r_mun = 12_000_000.0;
        let h = hohmann(r_lko, r_mun, MU_KERBIN).unwrap();

        // ~860 m/s trans-Munar injection
        assert!(h.dv1 > 820.0 && h.dv1 < 880.0, "TMI dv should be ~860 m/s, got {:.0}", h.dv1);
        assert!((h.total_dv - h.dv1 - h.dv2).abs() < 1e-9);
        assert!(h.transfer_time > 25_000.0 && h.transfer_time < 35_000.0,
            "transfer time {:.0} s", h.transfer_time);
    }

    #[test]
    fn zero_dv_for_same_orbit() {
        let r = 700_000.0;
        let h = hohmann(r, r, MU_KERBIN).unwrap();
        assert!(h.total_dv < 1e-6);
        assert!(hohmann(0.0, r, MU_KERBIN).is_none());
    }

    #[test]
    fn kerbin_to_duna_phase_angle() {
        let phase = transfer_phase_angle(13_599_840_256.0, 20_726_155_264.0, MU_SUN).unwrap();
        // ~44 degrees lead for Duna
        assert!((phase.to_degrees() - 44.0).abs() < 2.0, "got {:.1} deg", phase.to_degrees());
    }

    #[test]
    fn inward_transfer_target_trails() {
        let phase = transfer_phase_angle(13_599_840_256.0, 9_832_684_544.0, MU_SUN).unwrap();
        assert!(phase < 0.0);
    }

    #[test]
    fn window_wait_reaches_required_phase() {
        let origin = KeplerianElements::circular(13_599_840_256.0, 0.0, 0.0, MU_SUN).unwrap();
        let target = KeplerianElements::circular(20_726_155_264.0, 0.0, 2.0, MU_SUN).unwrap();
        let w = transfer_window(&origin, &target, MU_SUN).unwrap();
        assert!(w.wait >= 0.0);

        let o = origin.advanced(w.wait);
        let t = target.advanced(w.wait);
        let lead = wrap_two_pi(t.mean_anom - o.mean_anom);
        assert!((lead - wrap_two_pi(w.phase_angle)).abs() < 1e-6, "lead {}", lead);
    }

    #[test]
    fn plane_change_cost() {
        assert!(plane_change_dv(2000.0, 0.0).abs() < 1e-12);
        assert!((plane_change_dv(2000.0, PI / 3.0) - 2000.0).abs() < 1e-9);
    }
}
