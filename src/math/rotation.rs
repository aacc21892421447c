use std::ops::Mul;

use nalgebra::{Matrix3, Vector3};

// ---------------------------------------------------------------------------
// Coordinate axis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl TryFrom<usize> for Axis {
    type Error = usize;

    fn try_from(index: usize) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Axis::X),
            1 => Ok(Axis::Y),
            2 => Ok(Axis::Z),
            other => Err(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Rotation: orthonormal 3x3 transform, composed by multiplication
// ---------------------------------------------------------------------------

/// Rotation matrix. `a * b` applies `b` first, then `a`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation(Matrix3<f64>);

impl Rotation {
    pub fn identity() -> Self {
        Rotation(Matrix3::identity())
    }

    /// Right-handed rotation by `angle` (rad) about a coordinate axis.
    pub fn about(axis: Axis, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        let m = match axis {
            Axis::X => Matrix3::new(
                1.0, 0.0, 0.0,
                0.0, c, -s,
                0.0, s, c,
            ),
            Axis::Y => Matrix3::new(
                c, 0.0, s,
                0.0, 1.0, 0.0,
                -s, 0.0, c,
            ),
            Axis::Z => Matrix3::new(
                c, -s, 0.0,
                s, c, 0.0,
                0.0, 0.0, 1.0,
            ),
        };
        Rotation(m)
    }

    /// Inverse rotation (transpose, since the matrix is orthonormal).
    pub fn inverse(&self) -> Self {
        Rotation(self.0.transpose())
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.0
    }
}

impl Mul for Rotation {
    type Output = Rotation;

    fn mul(self, rhs: Rotation) -> Rotation {
        Rotation(self.0 * rhs.0)
    }
}

impl Mul<Vector3<f64>> for Rotation {
    type Output = Vector3<f64>;

    fn mul(self, rhs: Vector3<f64>) -> Vector3<f64> {
        self.0 * rhs
    }
}

impl Mul<&Vector3<f64>> for &Rotation {
    type Output = Vector3<f64>;

    fn mul(self, rhs: &Vector3<f64>) -> Vector3<f64> {
        self.0 * rhs
    }
}
