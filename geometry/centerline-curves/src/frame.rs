//! Orthonormal frames along a fitted centerline.
//!
//! The default [`FrameMode::FixedSeed`] builds every normal from one global
//! seed vector: `normal_i = normalize(tangent_i × seed)`. The seed is not
//! transported along the curve, so strongly curved branches show frame twist.
//! [`FrameMode::RotationMinimizing`] transports the first frame with the
//! double reflection method instead and must be requested explicitly.

use crate::{CenterlineError, Result};
use nalgebra::{Matrix3, Point3, Vector3};
use rand::Rng;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Threshold used by both collinearity tests.
pub const COLLINEARITY_EPSILON: f64 = 1e-10;

/// Maximum number of random draws when looking for a seed vector.
pub const MAX_SEED_ATTEMPTS: usize = 64;

/// A coordinate frame at a sample of a centerline.
///
/// - `tangent`: along the curve in sample order
/// - `normal`: perpendicular to the tangent
/// - `binormal`: `tangent × normal`
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Frame {
    /// Sample position.
    pub position: Point3<f64>,
    /// Unit tangent vector.
    pub tangent: Vector3<f64>,
    /// Unit normal vector.
    pub normal: Vector3<f64>,
    /// Unit binormal vector.
    pub binormal: Vector3<f64>,
}

impl Frame {
    /// Create a new frame. The vectors are assumed to be orthonormal.
    #[must_use]
    pub fn new(
        position: Point3<f64>,
        tangent: Vector3<f64>,
        normal: Vector3<f64>,
        binormal: Vector3<f64>,
    ) -> Self {
        Self {
            position,
            tangent,
            normal,
            binormal,
        }
    }

    /// Rotation matrix with columns `(tangent, normal, binormal)`.
    #[must_use]
    pub fn rotation_matrix(&self) -> Matrix3<f64> {
        Matrix3::from_columns(&[self.tangent, self.normal, self.binormal])
    }

    /// Check if the frame is orthonormal within tolerance.
    #[must_use]
    pub fn is_orthonormal(&self, tolerance: f64) -> bool {
        let t_len = (self.tangent.norm() - 1.0).abs();
        let n_len = (self.normal.norm() - 1.0).abs();
        let b_len = (self.binormal.norm() - 1.0).abs();
        let tn_dot = self.tangent.dot(&self.normal).abs();
        let tb_dot = self.tangent.dot(&self.binormal).abs();
        let nb_dot = self.normal.dot(&self.binormal).abs();

        t_len < tolerance
            && n_len < tolerance
            && b_len < tolerance
            && tn_dot < tolerance
            && tb_dot < tolerance
            && nb_dot < tolerance
    }

    /// Check that `tangent × normal` points along `binormal`.
    #[must_use]
    pub fn is_right_handed(&self) -> bool {
        self.tangent.cross(&self.normal).dot(&self.binormal) > 0.0
    }
}

/// How normals are propagated along a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FrameMode {
    /// One random seed for the whole branch, crossed with each tangent.
    #[default]
    FixedSeed,
    /// Seeded first frame, then parallel transport by double reflection.
    RotationMinimizing,
}

/// How a random vector is judged collinear with the reference tangent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CollinearityTest {
    /// `|(a × b).x + (a × b).y + (a × b).z| < ε`.
    ///
    /// Coarser than a magnitude test: a large cross product whose components
    /// cancel is reported as collinear. The sum is `b · ((1, 1, 1) × a)`, so
    /// for a reference tangent along `±(1, 1, 1)` every draw is rejected and
    /// the seed draw ends in [`CenterlineError::DegenerateSeed`]; use
    /// [`CollinearityTest::CrossNorm`] for such branches.
    #[default]
    ComponentSum,
    /// `‖a × b‖ < ε`.
    CrossNorm,
}

impl CollinearityTest {
    /// Apply the test to two vectors.
    #[must_use]
    pub fn are_collinear(self, a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
        let cross = a.cross(b);
        match self {
            Self::ComponentSum => (cross.x + cross.y + cross.z).abs() < COLLINEARITY_EPSILON,
            Self::CrossNorm => cross.norm() < COLLINEARITY_EPSILON,
        }
    }
}

/// Builds normals and binormals from per-sample tangents.
///
/// # Example
///
/// ```
/// use centerline_curves::FrameBuilder;
/// use nalgebra::Vector3;
/// use rand::SeedableRng;
/// use rand::rngs::StdRng;
///
/// let tangents = vec![Vector3::x(), Vector3::new(1.0, 1.0, 0.0).normalize()];
/// let mut rng = StdRng::seed_from_u64(7);
///
/// let (normals, binormals) = FrameBuilder::new().normals_and_binormals(&tangents, &mut rng).unwrap();
/// assert_eq!(normals.len(), 2);
/// assert_eq!(binormals.len(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameBuilder {
    /// Propagation mode.
    pub mode: FrameMode,
    /// Collinearity test used while drawing the seed vector.
    pub collinearity: CollinearityTest,
}

impl FrameBuilder {
    /// Builder with the fixed-seed mode and the component-sum test.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            mode: FrameMode::FixedSeed,
            collinearity: CollinearityTest::ComponentSum,
        }
    }

    /// Set the propagation mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: FrameMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the collinearity test.
    #[must_use]
    pub const fn with_collinearity(mut self, test: CollinearityTest) -> Self {
        self.collinearity = test;
        self
    }

    /// Draw the seed vector `reference × r` for a random unit `r` that is not
    /// collinear with `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`CenterlineError::DegenerateSeed`] if every draw within
    /// [`MAX_SEED_ATTEMPTS`] is rejected, whether it fell outside the unit
    /// ball or was collinear with `reference`.
    pub fn seed_vector<R: Rng + ?Sized>(
        &self,
        reference: &Vector3<f64>,
        rng: &mut R,
    ) -> Result<Vector3<f64>> {
        for attempt in 1..=MAX_SEED_ATTEMPTS {
            let Some(candidate) = random_unit_vector(rng) else {
                continue;
            };
            if !self.collinearity.are_collinear(reference, &candidate) {
                debug!(attempt, "Drew frame seed vector");
                return Ok(reference.cross(&candidate));
            }
        }
        Err(CenterlineError::DegenerateSeed {
            attempts: MAX_SEED_ATTEMPTS,
        })
    }

    /// Normals and binormals for tangents with a freshly drawn seed.
    ///
    /// Uses [`FrameMode::FixedSeed`] regardless of `self.mode`, since the
    /// rotation-minimizing mode needs sample positions; see
    /// [`FrameBuilder::build`].
    ///
    /// # Errors
    ///
    /// Returns an error for an empty tangent list, a failed seed draw, or a
    /// tangent parallel to the seed.
    pub fn normals_and_binormals<R: Rng + ?Sized>(
        &self,
        tangents: &[Vector3<f64>],
        rng: &mut R,
    ) -> Result<(Vec<Vector3<f64>>, Vec<Vector3<f64>>)> {
        let reference = tangents
            .first()
            .ok_or_else(|| CenterlineError::invalid_frame(0, "no tangents to frame"))?;
        let seed = self.seed_vector(reference, rng)?;
        let normals = normals_from_seed(tangents, &seed)?;
        let binormals = binormals(tangents, &normals)?;
        Ok((normals, binormals))
    }

    /// Build one frame per sample.
    ///
    /// # Errors
    ///
    /// Returns [`CenterlineError::FrameConsistency`] if `positions` and
    /// `tangents` differ in length, and otherwise the errors of
    /// [`FrameBuilder::normals_and_binormals`].
    pub fn build<R: Rng + ?Sized>(
        &self,
        positions: &[Point3<f64>],
        tangents: &[Vector3<f64>],
        rng: &mut R,
    ) -> Result<Vec<Frame>> {
        if positions.len() != tangents.len() {
            return Err(CenterlineError::FrameConsistency {
                tangents: tangents.len(),
                normals: positions.len(),
                binormals: positions.len(),
            });
        }

        match self.mode {
            FrameMode::FixedSeed => {
                let (normals, binormals) = self.normals_and_binormals(tangents, rng)?;
                assemble_frames(positions, tangents, &normals, &binormals)
            }
            FrameMode::RotationMinimizing => {
                let reference = tangents
                    .first()
                    .ok_or_else(|| CenterlineError::invalid_frame(0, "no tangents to frame"))?;
                let seed = self.seed_vector(reference, rng)?;
                let first = seeded_frame(positions[0], tangents[0], &seed, 0)?;

                let mut frames = Vec::with_capacity(tangents.len());
                frames.push(first);
                for i in 1..tangents.len() {
                    let next = transport_frame(&frames[i - 1], positions[i], tangents[i]);
                    frames.push(next);
                }
                Ok(frames)
            }
        }
    }
}

/// `normalize(tangent_i × seed)` for every tangent.
///
/// # Errors
///
/// Returns [`CenterlineError::InvalidFrame`] for a tangent parallel to the
/// seed.
pub fn normals_from_seed(
    tangents: &[Vector3<f64>],
    seed: &Vector3<f64>,
) -> Result<Vec<Vector3<f64>>> {
    tangents
        .iter()
        .enumerate()
        .map(|(i, t)| normalized(t.cross(seed), i, "tangent is parallel to the seed vector"))
        .collect()
}

/// `normalize(tangent_i × normal_i)` for every index.
///
/// # Errors
///
/// Returns [`CenterlineError::FrameConsistency`] when the lists differ in
/// length, or [`CenterlineError::InvalidFrame`] for a parallel pair.
pub fn binormals(
    tangents: &[Vector3<f64>],
    normals: &[Vector3<f64>],
) -> Result<Vec<Vector3<f64>>> {
    if tangents.len() != normals.len() {
        return Err(CenterlineError::FrameConsistency {
            tangents: tangents.len(),
            normals: normals.len(),
            binormals: 0,
        });
    }

    tangents
        .iter()
        .zip(normals)
        .enumerate()
        .map(|(i, (t, n))| normalized(t.cross(n), i, "tangent is parallel to the normal"))
        .collect()
}

/// Zip per-index lists into frames.
///
/// # Errors
///
/// Returns [`CenterlineError::FrameConsistency`] if any list length differs.
pub fn assemble_frames(
    positions: &[Point3<f64>],
    tangents: &[Vector3<f64>],
    normals: &[Vector3<f64>],
    binormals: &[Vector3<f64>],
) -> Result<Vec<Frame>> {
    let n = tangents.len();
    if positions.len() != n || normals.len() != n || binormals.len() != n {
        return Err(CenterlineError::FrameConsistency {
            tangents: n,
            normals: normals.len(),
            binormals: binormals.len(),
        });
    }

    Ok((0..n)
        .map(|i| Frame::new(positions[i], tangents[i], normals[i], binormals[i]))
        .collect())
}

/// One rejection-sampling draw of a uniformly distributed unit vector.
///
/// Draws a point in `[-1, 1)^3` and projects it onto the sphere. Returns
/// `None` when the point falls outside the unit ball or too close to the
/// origin; callers decide how many draws to spend.
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Option<Vector3<f64>> {
    let v = Vector3::<f64>::new(
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
        rng.gen_range(-1.0..1.0),
    );
    let norm_sq = v.norm_squared();
    (norm_sq > 1e-12 && norm_sq <= 1.0).then(|| v / norm_sq.sqrt())
}

fn normalized(v: Vector3<f64>, index: usize, reason: &str) -> Result<Vector3<f64>> {
    let norm = v.norm();
    if norm > COLLINEARITY_EPSILON && norm.is_finite() {
        Ok(v / norm)
    } else {
        Err(CenterlineError::invalid_frame(index, reason))
    }
}

fn seeded_frame(
    position: Point3<f64>,
    tangent: Vector3<f64>,
    seed: &Vector3<f64>,
    index: usize,
) -> Result<Frame> {
    let normal = normalized(tangent.cross(seed), index, "tangent is parallel to the seed vector")?;
    let binormal = normalized(tangent.cross(&normal), index, "tangent is parallel to the normal")?;
    Ok(Frame::new(position, tangent, normal, binormal))
}

/// Mirror `v` in the plane through the origin with normal `axis`.
///
/// `axis_sq` is `axis · axis`, already known by the caller.
fn reflect(v: &Vector3<f64>, axis: &Vector3<f64>, axis_sq: f64) -> Vector3<f64> {
    v - axis * (2.0 * axis.dot(v) / axis_sq)
}

/// Carry `prev` to the next sample by two reflections (Wang et al., 2008).
///
/// The first reflection maps `prev.position` onto `position`; the second
/// turns the reflected tangent onto `tangent`. Coincident samples keep the
/// previous normal, projected off the new tangent.
fn transport_frame(prev: &Frame, position: Point3<f64>, tangent: Vector3<f64>) -> Frame {
    let step = position - prev.position;
    let step_sq = step.norm_squared();

    let carried = if step_sq < 1e-20 {
        prev.normal - tangent * tangent.dot(&prev.normal)
    } else {
        let normal = reflect(&prev.normal, &step, step_sq);
        let turn = tangent - reflect(&prev.tangent, &step, step_sq);
        let turn_sq = turn.norm_squared();
        if turn_sq < 1e-20 {
            normal
        } else {
            reflect(&normal, &turn, turn_sq)
        }
    };

    let normal = carried.try_normalize(1e-10).unwrap_or(prev.normal);
    let binormal = tangent.cross(&normal).try_normalize(1e-10).unwrap_or(prev.binormal);
    Frame::new(position, tangent, normal, binormal)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand::rngs::mock::StepRng;

    fn arc_tangents(n: u32) -> (Vec<Point3<f64>>, Vec<Vector3<f64>>) {
        (0..n)
            .map(|i| {
                let a = f64::from(i) * 0.2;
                (
                    Point3::new(a.cos(), a.sin(), 0.3 * a),
                    Vector3::new(-a.sin(), a.cos(), 0.3).normalize(),
                )
            })
            .unzip()
    }

    #[test]
    fn test_component_sum_is_coarser_than_norm() {
        let a = Vector3::x();
        // a × b = (0, -1, 1): components cancel but the vectors are orthogonal
        let b = Vector3::new(0.0, 1.0, 1.0).normalize();

        assert!(CollinearityTest::ComponentSum.are_collinear(&a, &b));
        assert!(!CollinearityTest::CrossNorm.are_collinear(&a, &b));

        assert!(CollinearityTest::ComponentSum.are_collinear(&a, &(a * 2.0)));
        assert!(CollinearityTest::CrossNorm.are_collinear(&a, &(a * -1.0)));
    }

    #[test]
    fn test_random_unit_vector() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            if let Some(v) = random_unit_vector(&mut rng) {
                assert_relative_eq!(v.norm(), 1.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_random_unit_vector_rejects_outside_ball() {
        // All-zero bits map every coordinate to -1: the cube corner.
        let mut corner = StepRng::new(0, 0);
        assert!(random_unit_vector(&mut corner).is_none());
    }

    #[test]
    fn test_seed_draws_outside_ball_are_bounded() {
        let mut corner = StepRng::new(0, 0);
        let err = FrameBuilder::new()
            .seed_vector(&Vector3::x(), &mut corner)
            .unwrap_err();
        assert_eq!(
            err,
            CenterlineError::DegenerateSeed {
                attempts: MAX_SEED_ATTEMPTS
            }
        );
    }

    #[test]
    fn test_component_sum_rejects_diagonal_tangent() {
        // Every cross product with (1, 1, 1) has components summing to zero.
        let diagonal = Vector3::new(1.0, 1.0, 1.0).normalize();
        let mut rng = StdRng::seed_from_u64(5);

        let err = FrameBuilder::new()
            .seed_vector(&diagonal, &mut rng)
            .unwrap_err();
        assert!(matches!(err, CenterlineError::DegenerateSeed { .. }));

        let seed = FrameBuilder::new()
            .with_collinearity(CollinearityTest::CrossNorm)
            .seed_vector(&diagonal, &mut rng)
            .unwrap();
        assert!(seed.norm() > 0.0);
    }

    #[test]
    fn test_fixed_seed_frames_are_orthonormal() {
        let (positions, tangents) = arc_tangents(20);
        let mut rng = StdRng::seed_from_u64(42);

        let frames = FrameBuilder::new()
            .build(&positions, &tangents, &mut rng)
            .unwrap();

        assert_eq!(frames.len(), 20);
        for frame in &frames {
            assert!(frame.is_orthonormal(1e-10));
            assert!(frame.is_right_handed());
        }
    }

    #[test]
    fn test_fixed_seed_is_shared_across_samples() {
        let (_, tangents) = arc_tangents(10);
        let mut rng = StdRng::seed_from_u64(3);

        let (normals, _) = FrameBuilder::new()
            .normals_and_binormals(&tangents, &mut rng)
            .unwrap();

        // Every normal is perpendicular to the same seed vector
        let mut rng = StdRng::seed_from_u64(3);
        let seed = FrameBuilder::new().seed_vector(&tangents[0], &mut rng).unwrap();
        for n in &normals {
            assert_relative_eq!(n.dot(&seed), 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_same_seed_same_frames() {
        let (positions, tangents) = arc_tangents(8);

        let a = FrameBuilder::new()
            .build(&positions, &tangents, &mut StdRng::seed_from_u64(9))
            .unwrap();
        let b = FrameBuilder::new()
            .build(&positions, &tangents, &mut StdRng::seed_from_u64(9))
            .unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_rotation_minimizing_frames() {
        let (positions, tangents) = arc_tangents(20);
        let mut rng = StdRng::seed_from_u64(42);

        let frames = FrameBuilder::new()
            .with_mode(FrameMode::RotationMinimizing)
            .build(&positions, &tangents, &mut rng)
            .unwrap();

        for frame in &frames {
            assert!(frame.is_orthonormal(1e-6));
        }
    }

    #[test]
    fn test_rotation_minimizing_straight_line_does_not_twist() {
        let positions: Vec<_> = (0..5)
            .map(|i| Point3::new(f64::from(i), 0.0, 0.0))
            .collect();
        let tangents = vec![Vector3::x(); 5];
        let mut rng = StdRng::seed_from_u64(5);

        let frames = FrameBuilder::new()
            .with_mode(FrameMode::RotationMinimizing)
            .build(&positions, &tangents, &mut rng)
            .unwrap();

        for i in 1..frames.len() {
            assert_relative_eq!(frames[i].normal.dot(&frames[i - 1].normal), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_rotation_minimizing_coincident_samples() {
        let positions = vec![Point3::origin(), Point3::origin(), Point3::new(1.0, 1.0, 0.0)];
        let turned = Vector3::new(1.0, 1.0, 0.0).normalize();
        let tangents = vec![Vector3::x(), turned, turned];
        let mut rng = StdRng::seed_from_u64(9);

        let frames = FrameBuilder::new()
            .with_mode(FrameMode::RotationMinimizing)
            .build(&positions, &tangents, &mut rng)
            .unwrap();

        for frame in &frames {
            assert!(frame.is_orthonormal(1e-9));
            assert_relative_eq!(frame.binormal.norm(), 1.0, epsilon = 1e-12);
        }
        assert_relative_eq!(frames[1].normal.dot(&turned), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_length_mismatch() {
        let err = binormals(&[Vector3::x(), Vector3::y()], &[Vector3::z()]).unwrap_err();
        assert!(err.is_frame_consistency());

        let err = assemble_frames(
            &[Point3::origin()],
            &[Vector3::x()],
            &[Vector3::y()],
            &[],
        )
        .unwrap_err();
        assert!(err.is_frame_consistency());

        let mut rng = StdRng::seed_from_u64(0);
        let err = FrameBuilder::new()
            .build(&[Point3::origin()], &[Vector3::x(), Vector3::y()], &mut rng)
            .unwrap_err();
        assert!(err.is_frame_consistency());
    }

    #[test]
    fn test_tangent_parallel_to_seed() {
        let seed = Vector3::z();
        let err = normals_from_seed(&[Vector3::x(), Vector3::z()], &seed).unwrap_err();
        assert!(matches!(err, CenterlineError::InvalidFrame { index: 1, .. }));
    }

    #[test]
    fn test_empty_tangents() {
        let mut rng = StdRng::seed_from_u64(0);
        let err = FrameBuilder::new()
            .normals_and_binormals(&[], &mut rng)
            .unwrap_err();
        assert!(err.is_invalid_frame());
    }

    #[test]
    fn test_degenerate_seed_source() {
        // A constant source keeps drawing the same vector; against a tangent
        // collinear with it the draw can never succeed.
        let mut stuck = StepRng::new(0xC000_0000_0000_0000, 0);
        let candidate = random_unit_vector(&mut stuck).unwrap();

        let err = FrameBuilder::new()
            .seed_vector(&candidate, &mut stuck)
            .unwrap_err();
        assert_eq!(
            err,
            CenterlineError::DegenerateSeed {
                attempts: MAX_SEED_ATTEMPTS
            }
        );
    }
}
