use nalgebra::Vector3;

pub const G0: f64 = 9.80665; // standard gravity, m/s^2, used for Isp -> exhaust velocity

/// Inverse-square gravitational deceleration at `altitude` above a body of
/// radius `radius` (m) and gravitational parameter `mu` (m^3/s^2).
///
/// Unknown body parameters give zero gravity rather than failing.
pub fn gravity_accel(altitude: f64, radius: Option<f64>, mu: Option<f64>) -> f64 {
    match (radius, mu) {
        (Some(r), Some(mu)) => {
            let dist = r + altitude;
            if dist > 0.0 { mu / (dist * dist) } else { 0.0 }
        }
        _ => 0.0,
    }
}

/// Point-mass gravity acceleration vector in a body-centred inertial frame.
pub fn gravity_pointmass(pos: &Vector3<f64>, mu: f64) -> Vector3<f64> {
    let r = pos.norm();
    if r < 1.0 {
        return Vector3::zeros();
    }
    -mu / (r * r * r) * pos
}

#[cfg(test)]
mod tests {
    use super::*;

    const KERBIN_R: f64 = 600_000.0;
    const KERBIN_MU: f64 = 3.5316e12;

    #[test]
    fn surface_gravity() {
        let g = gravity_accel(0.0, Some(KERBIN_R), Some(KERBIN_MU));
        assert!((g - 9.81).abs() < 0.01, "Kerbin surface gravity ~9.81, got {}", g);
    }

    #[test]
    fn gravity_decreases_with_altitude() {
        let g0 = gravity_accel(0.0, Some(KERBIN_R), Some(KERBIN_MU));
        let g100k = gravity_accel(100_000.0, Some(KERBIN_R), Some(KERBIN_MU));
        assert!(g100k < g0);
    }

    #[test]
    fn unknown_body_has_no_gravity() {
        assert_eq!(gravity_accel(1000.0, None, Some(KERBIN_MU)), 0.0);
        assert_eq!(gravity_accel(1000.0, Some(KERBIN_R), None), 0.0);
    }

    #[test]
    fn pointmass_matches_scalar() {
        let pos = Vector3::new(KERBIN_R + 80_000.0, 0.0, 0.0);
        let a = gravity_pointmass(&pos, KERBIN_MU);
        let g = gravity_accel(80_000.0, Some(KERBIN_R), Some(KERBIN_MU));
        assert!((a.x + g).abs() < 1e-9);
        assert!(a.y.abs() < 1e-12 && a.z.abs() < 1e-12);
    }
}
