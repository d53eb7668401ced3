//! Frame to quaternion encoding.
//!
//! Beam nodes are rigid bodies: a position plus an orientation stored as a
//! unit quaternion in `(x, y, z, w)` order.

use crate::{CenterlineError, Frame, Result};
use nalgebra::{Matrix3, Point3, Quaternion, UnitQuaternion};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default orthonormality tolerance for [`RotationEncoder`].
pub const DEFAULT_ORTHONORMAL_TOLERANCE: f64 = 1e-6;

/// A rigid node pose: position plus orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Pose {
    /// Node position.
    pub position: Point3<f64>,
    /// Node orientation.
    pub orientation: UnitQuaternion<f64>,
}

impl Pose {
    /// Create a pose.
    #[must_use]
    pub const fn new(position: Point3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// Orientation components in `(x, y, z, w)` order.
    #[must_use]
    pub fn to_xyzw(&self) -> [f64; 4] {
        let q = self.orientation.quaternion();
        [q.i, q.j, q.k, q.w]
    }

    /// `[px, py, pz, qx, qy, qz, qw]`, the layout of a Rigid3 state.
    #[must_use]
    pub fn to_rigid_array(&self) -> [f64; 7] {
        let [qx, qy, qz, qw] = self.to_xyzw();
        [
            self.position.x,
            self.position.y,
            self.position.z,
            qx,
            qy,
            qz,
            qw,
        ]
    }

    /// Rotation matrix of the orientation.
    #[must_use]
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        quaternion_to_matrix(&self.orientation)
    }
}

/// Converts frames to unit quaternions after validating them.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RotationEncoder {
    /// Tolerance on unit lengths, pairwise dot products and `det - 1`.
    pub tolerance: f64,
}

impl Default for RotationEncoder {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_ORTHONORMAL_TOLERANCE,
        }
    }
}

impl RotationEncoder {
    /// Encoder with a custom tolerance.
    #[must_use]
    pub const fn with_tolerance(tolerance: f64) -> Self {
        Self { tolerance }
    }

    /// Quaternion of the matrix with columns `(tangent, normal, binormal)`.
    ///
    /// # Errors
    ///
    /// Returns [`CenterlineError::InvalidFrame`] if the frame is not a proper
    /// rotation within tolerance.
    pub fn encode(&self, frame: &Frame, index: usize) -> Result<UnitQuaternion<f64>> {
        if !frame.is_orthonormal(self.tolerance) {
            return Err(CenterlineError::invalid_frame(index, "frame is not orthonormal"));
        }
        let m = frame.rotation_matrix();
        let det = m.determinant();
        if (det - 1.0).abs() > self.tolerance {
            return Err(CenterlineError::invalid_frame(
                index,
                format!("frame is not right-handed (det = {det})"),
            ));
        }
        Ok(matrix_to_quaternion(&m))
    }

    /// Encode every frame as a pose.
    ///
    /// # Errors
    ///
    /// Returns the first [`CenterlineError::InvalidFrame`].
    pub fn poses(&self, frames: &[Frame]) -> Result<Vec<Pose>> {
        frames
            .iter()
            .enumerate()
            .map(|(i, f)| self.encode(f, i).map(|q| Pose::new(f.position, q)))
            .collect()
    }
}

/// Shepperd's trace method for a rotation matrix.
///
/// Branches on the trace and the largest diagonal entry so the divisor is
/// never close to zero.
#[must_use]
pub fn matrix_to_quaternion(m: &Matrix3<f64>) -> UnitQuaternion<f64> {
    let trace = m[(0, 0)] + m[(1, 1)] + m[(2, 2)];

    let (w, x, y, z) = if trace > 0.0 {
        let s = (trace + 1.0).sqrt() * 2.0;
        (
            0.25 * s,
            (m[(2, 1)] - m[(1, 2)]) / s,
            (m[(0, 2)] - m[(2, 0)]) / s,
            (m[(1, 0)] - m[(0, 1)]) / s,
        )
    } else if m[(0, 0)] > m[(1, 1)] && m[(0, 0)] > m[(2, 2)] {
        let s = (1.0 + m[(0, 0)] - m[(1, 1)] - m[(2, 2)]).sqrt() * 2.0;
        (
            (m[(2, 1)] - m[(1, 2)]) / s,
            0.25 * s,
            (m[(0, 1)] + m[(1, 0)]) / s,
            (m[(0, 2)] + m[(2, 0)]) / s,
        )
    } else if m[(1, 1)] > m[(2, 2)] {
        let s = (1.0 + m[(1, 1)] - m[(0, 0)] - m[(2, 2)]).sqrt() * 2.0;
        (
            (m[(0, 2)] - m[(2, 0)]) / s,
            (m[(0, 1)] + m[(1, 0)]) / s,
            0.25 * s,
            (m[(1, 2)] + m[(2, 1)]) / s,
        )
    } else {
        let s = (1.0 + m[(2, 2)] - m[(0, 0)] - m[(1, 1)]).sqrt() * 2.0;
        (
            (m[(1, 0)] - m[(0, 1)]) / s,
            (m[(0, 2)] + m[(2, 0)]) / s,
            (m[(1, 2)] + m[(2, 1)]) / s,
            0.25 * s,
        )
    };

    UnitQuaternion::new_normalize(Quaternion::new(w, x, y, z))
}

/// Rotation matrix of a unit quaternion.
#[must_use]
pub fn quaternion_to_matrix(q: &UnitQuaternion<f64>) -> Matrix3<f64> {
    q.to_rotation_matrix().into_inner()
}
