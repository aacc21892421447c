pub mod rotation;

pub use nalgebra::Vector3;
pub use rotation::{Axis, Rotation};

/// Wrap an angle into [0, 2π).
pub fn wrap_two_pi(angle: f64) -> f64 {
    let tau = std::f64::consts::TAU;
    let a = angle % tau;
    if a < 0.0 { a + tau } else { a }
}
