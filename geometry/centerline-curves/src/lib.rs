//! Centerline geometry for vessel beam models.
//!
//! This crate turns one raw centerline polyline into framed, oriented samples:
//!
//! - [`resample_branch`] - Greedy arc-length resampling into a [`SampledBranch`]
//! - [`FittedCurve`] - C¹ piecewise cubic Bézier through the samples, with
//!   analytic derivatives
//! - [`FrameBuilder`] - Tangent / normal / binormal [`Frame`]s per sample
//! - [`RotationEncoder`] - Frames as unit quaternions, packaged as [`Pose`]s
//!
//! # Example
//!
//! ```
//! use centerline_curves::{FittedCurve, FrameBuilder, RotationEncoder, resample_branch};
//! use nalgebra::Point3;
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//!
//! let raw: Vec<_> = (0..20)
//!     .map(|i| {
//!         let t = f64::from(i) * 0.1;
//!         Point3::new(t, t.sin(), 0.0)
//!     })
//!     .collect();
//!
//! let sampled = resample_branch(&raw, 0.25).unwrap();
//! let curve = FittedCurve::fit(&sampled).unwrap();
//! let tangents = curve.tangents().unwrap();
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! let frames = FrameBuilder::new()
//!     .build(sampled.points(), &tangents, &mut rng)
//!     .unwrap();
//! let poses = RotationEncoder::default().poses(&frames).unwrap();
//!
//! assert_eq!(poses.len(), sampled.len());
//! ```
//!
//! # Coordinate System
//!
//! Frames are right-handed: `tangent × normal = binormal`. A frame's
//! rotation matrix has columns `(tangent, normal, binormal)`.
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate: one branch at a time, no I/O. Multi-branch
//! graphs and skeleton files live in `vessel-model`.
//!
//! # Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for all types

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::many_single_char_names,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::suboptimal_flops,
    clippy::needless_range_loop,
    clippy::doc_markdown
)]

mod bezier;
mod error;
mod frame;
mod resample;
mod rotation;

pub use bezier::{CubicBezier, FittedCurve};
pub use error::CenterlineError;
pub use frame::{
    COLLINEARITY_EPSILON, CollinearityTest, Frame, FrameBuilder, FrameMode, MAX_SEED_ATTEMPTS,
    assemble_frames, binormals, normals_from_seed, random_unit_vector,
};
pub use resample::{SampledBranch, resample_branch};
pub use rotation::{
    DEFAULT_ORTHONORMAL_TOLERANCE, Pose, RotationEncoder, matrix_to_quaternion,
    quaternion_to_matrix,
};

// Re-export nalgebra types for convenience
pub use nalgebra::{Point3, UnitQuaternion, Vector3};

/// Result type for centerline operations.
pub type Result<T> = std::result::Result<T, CenterlineError>;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Straight branch of 5 points 0.01 apart sampled at 0.02.
    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_straight_branch_pipeline() {
        let raw: Vec<_> = (0..5)
            .map(|i| Point3::new(f64::from(i) * 0.01, 0.0, 0.0))
            .collect();

        let sampled = resample_branch(&raw, 0.02).unwrap();
        assert_eq!(sampled.points(), &[raw[0], raw[2], raw[4]]);

        let curve = FittedCurve::fit(&sampled).unwrap();
        for tangent in curve.tangents().unwrap() {
            assert_relative_eq!(tangent, Vector3::x(), epsilon = 1e-12);
        }
    }

    /// Full chain on a curved branch: frames orthonormal, quaternions round-trip.
    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_helix_frames_and_poses() {
        let raw: Vec<_> = (0..200)
            .map(|i| {
                let t = f64::from(i) * 0.02;
                Point3::new(t.cos(), t.sin(), 0.25 * t)
            })
            .collect();

        let sampled = resample_branch(&raw, 0.1).unwrap();
        let curve = FittedCurve::fit(&sampled).unwrap();
        let tangents = curve.tangents().unwrap();

        let mut rng = StdRng::seed_from_u64(2024);
        let frames = FrameBuilder::new()
            .build(sampled.points(), &tangents, &mut rng)
            .unwrap();
        let poses = RotationEncoder::default().poses(&frames).unwrap();

        assert_eq!(frames.len(), sampled.len());
        for (frame, pose) in frames.iter().zip(&poses) {
            assert_relative_eq!(frame.tangent.norm(), 1.0, epsilon = 1e-10);
            assert_relative_eq!(frame.normal.norm(), 1.0, epsilon = 1e-10);
            assert_relative_eq!(frame.binormal.norm(), 1.0, epsilon = 1e-10);
            assert_relative_eq!(frame.tangent.dot(&frame.normal), 0.0, epsilon = 1e-10);
            assert_relative_eq!(frame.normal.dot(&frame.binormal), 0.0, epsilon = 1e-10);
            assert_relative_eq!(frame.tangent.dot(&frame.binormal), 0.0, epsilon = 1e-10);

            assert_relative_eq!(
                pose.rotation_matrix(),
                frame.rotation_matrix(),
                epsilon = 1e-10
            );
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    #[allow(clippy::unwrap_used)]
    fn test_serde_sampled_and_pose() {
        let raw = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.5, 0.0, 0.0),
            Point3::new(1.0, 0.25, 0.0),
        ];
        let sampled = resample_branch(&raw, 0.25).unwrap();
        let json = serde_json::to_string(&sampled).unwrap();
        let back: SampledBranch = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sampled);

        let pose = Pose::new(
            Point3::new(1.0, 2.0, 3.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.5),
        );
        let json = serde_json::to_string(&pose).unwrap();
        let back: Pose = serde_json::from_str(&json).unwrap();
        assert_relative_eq!(back.position, pose.position);
        assert_relative_eq!(back.orientation, pose.orientation, epsilon = 1e-12);

        let json = serde_json::to_string(&FrameMode::RotationMinimizing).unwrap();
        assert_eq!(
            serde_json::from_str::<FrameMode>(&json).unwrap(),
            FrameMode::RotationMinimizing
        );
    }
}
