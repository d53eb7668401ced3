//! Cubic Bézier fitting through sampled centerline points.
//!
//! The fitted curve is a C¹ piecewise cubic that interpolates every sample.
//! Its analytic derivative gives the tangent directions used for framing.

use crate::{CenterlineError, Result, SampledBranch};
use nalgebra::{DMatrix, DVector, Point3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A cubic Bézier curve defined by 4 control points.
///
/// The curve passes through P₀ and P₃, and is tangent to P₀P₁ at the
/// start and P₂P₃ at the end.
///
/// # Equation
///
/// ```text
/// B(t) = (1-t)³P₀ + 3(1-t)²tP₁ + 3(1-t)t²P₂ + t³P₃
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CubicBezier {
    /// Start point.
    pub p0: Point3<f64>,
    /// First control point (affects start tangent).
    pub p1: Point3<f64>,
    /// Second control point (affects end tangent).
    pub p2: Point3<f64>,
    /// End point.
    pub p3: Point3<f64>,
}

impl CubicBezier {
    /// Create a new cubic Bézier curve.
    #[must_use]
    pub const fn new(p0: Point3<f64>, p1: Point3<f64>, p2: Point3<f64>, p3: Point3<f64>) -> Self {
        Self { p0, p1, p2, p3 }
    }

    /// Get the control points as an array.
    #[must_use]
    pub fn control_points(&self) -> [Point3<f64>; 4] {
        [self.p0, self.p1, self.p2, self.p3]
    }

    /// Evaluate the curve at `t ∈ [0, 1]` (clamped).
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point3<f64> {
        let t = t.clamp(0.0, 1.0);
        let s = 1.0 - t;
        let s2 = s * s;
        let t2 = t * t;

        Point3::from(
            self.p0.coords * (s2 * s)
                + self.p1.coords * (3.0 * s2 * t)
                + self.p2.coords * (3.0 * s * t2)
                + self.p3.coords * (t2 * t),
        )
    }

    /// First derivative at `t ∈ [0, 1]` (clamped), unnormalized.
    #[must_use]
    pub fn derivative_at(&self, t: f64) -> Vector3<f64> {
        let t = t.clamp(0.0, 1.0);
        let s = 1.0 - t;

        // B'(t) = -3(1-t)²P₀ + (3(1-t)² - 6t(1-t))P₁ + 3t(2-3t)P₂ + 3t²P₃
        self.p0.coords * (-3.0 * s * s)
            + self.p1.coords * (3.0 * s * s - 6.0 * t * s)
            + self.p2.coords * (3.0 * t * (2.0 - 3.0 * t))
            + self.p3.coords * (3.0 * t * t)
    }

    /// Unit tangent at `t`.
    ///
    /// # Errors
    ///
    /// Returns [`CenterlineError::CurveFitting`] when the derivative vanishes.
    pub fn tangent_at(&self, t: f64) -> Result<Vector3<f64>> {
        let d = self.derivative_at(t);
        let norm = d.norm();
        if norm > 1e-12 && norm.is_finite() {
            Ok(d / norm)
        } else {
            Err(CenterlineError::curve_fitting(format!(
                "derivative vanishes at t={t}"
            )))
        }
    }
}

/// A C¹ piecewise cubic interpolating a sampled branch.
///
/// Segment `i` runs from sample `i` to sample `i + 1` with inner control
/// points `A_i` and `B_i` from a single global solve.
///
/// # Example
///
/// ```
/// use centerline_curves::{FittedCurve, resample_branch};
/// use nalgebra::Point3;
///
/// let raw = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.5, 0.0),
///     Point3::new(2.0, 0.0, 0.0),
/// ];
/// let sampled = resample_branch(&raw, 0.1).unwrap();
/// let curve = FittedCurve::fit(&sampled).unwrap();
///
/// assert_eq!(curve.num_segments(), 2);
/// let tangents = curve.tangents().unwrap();
/// assert_eq!(tangents.len(), 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "FittedCurveData"))]
pub struct FittedCurve {
    segments: Vec<CubicBezier>,
}

/// Unchecked wire form of a [`FittedCurve`].
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct FittedCurveData {
    segments: Vec<CubicBezier>,
}

#[cfg(feature = "serde")]
impl TryFrom<FittedCurveData> for FittedCurve {
    type Error = CenterlineError;

    fn try_from(data: FittedCurveData) -> Result<Self> {
        if data.segments.is_empty() {
            return Err(CenterlineError::curve_fitting("curve has no segments"));
        }
        Ok(Self {
            segments: data.segments,
        })
    }
}

impl FittedCurve {
    /// Fit the interpolating cubic through a sampled branch.
    ///
    /// # Errors
    ///
    /// See [`FittedCurve::fit_points`].
    pub fn fit(sampled: &SampledBranch) -> Result<Self> {
        Self::fit_points(sampled.points())
    }

    /// Fit the interpolating cubic through an arbitrary point sequence.
    ///
    /// For `n + 1` points the first control points `A` solve
    ///
    /// ```text
    /// | 2 1           | |A_0    |   | p_0 + 2p_1         |
    /// | 1 4 1         | |A_1    |   | 4p_1 + 2p_2        |
    /// |   ... ... ... | |...    | = | ...                |
    /// |         2 7   | |A_{n-1}|   | 8p_{n-1} + p_n     |
    /// ```
    ///
    /// and `B_i = 2p_{i+1} - A_{i+1}`, `B_{n-1} = (A_{n-1} + p_n) / 2`.
    /// A single segment has coinciding first and last rows and is fitted as
    /// the straight cubic `A_0 = (2p_0 + p_1) / 3`.
    ///
    /// # Errors
    ///
    /// Returns [`CenterlineError::CurveFitting`] for fewer than 2 points or a
    /// singular system.
    pub fn fit_points(points: &[Point3<f64>]) -> Result<Self> {
        if points.len() < 2 {
            return Err(CenterlineError::curve_fitting(format!(
                "need at least 2 points, got {}",
                points.len()
            )));
        }

        let n = points.len() - 1;
        let (a, b) = if n == 1 {
            let a0 = Point3::from((points[0].coords * 2.0 + points[1].coords) / 3.0);
            let b0 = Point3::from((a0.coords + points[1].coords) * 0.5);
            (vec![a0], vec![b0])
        } else {
            let a = solve_first_controls(points)?;
            let mut b = Vec::with_capacity(n);
            for i in 0..n - 1 {
                b.push(Point3::from(points[i + 1].coords * 2.0 - a[i + 1].coords));
            }
            b.push(Point3::from((a[n - 1].coords + points[n].coords) * 0.5));
            (a, b)
        };

        let segments = (0..n)
            .map(|i| CubicBezier::new(points[i], a[i], b[i], points[i + 1]))
            .collect();

        Ok(Self { segments })
    }

    /// Number of cubic segments.
    #[must_use]
    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }

    /// Number of interpolated samples (`num_segments + 1`).
    #[must_use]
    pub fn num_samples(&self) -> usize {
        self.segments.len() + 1
    }

    /// All segments in order.
    #[must_use]
    pub fn segments(&self) -> &[CubicBezier] {
        &self.segments
    }

    /// Get a specific segment.
    #[must_use]
    pub fn segment(&self, index: usize) -> Option<&CubicBezier> {
        self.segments.get(index)
    }

    /// The `(A_i, B_i)` inner control points of every segment.
    #[must_use]
    pub fn control_pairs(&self) -> Vec<(Point3<f64>, Point3<f64>)> {
        self.segments.iter().map(|s| (s.p1, s.p2)).collect()
    }

    /// Position on segment `segment` at local parameter `t`.
    ///
    /// # Errors
    ///
    /// Returns [`CenterlineError::CurveFitting`] for an unknown segment.
    pub fn point_at(&self, segment: usize, t: f64) -> Result<Point3<f64>> {
        self.checked_segment(segment).map(|s| s.point_at(t))
    }

    /// Unnormalized derivative on segment `segment` at local parameter `t`.
    ///
    /// # Errors
    ///
    /// Returns [`CenterlineError::CurveFitting`] for an unknown segment.
    pub fn derivative_at(&self, segment: usize, t: f64) -> Result<Vector3<f64>> {
        self.checked_segment(segment).map(|s| s.derivative_at(t))
    }

    /// Unit tangent at sample `index`.
    ///
    /// Uses segment `index` at `t = 0`, or the last segment at `t = 1` for
    /// the final sample.
    ///
    /// # Errors
    ///
    /// Returns [`CenterlineError::CurveFitting`] for an out-of-range index or
    /// a vanishing derivative.
    pub fn tangent_at_sample(&self, index: usize) -> Result<Vector3<f64>> {
        let n = self.segments.len();
        let (segment, t) = match n.checked_sub(1) {
            Some(last) if index == n => (last, 1.0),
            _ => (index, 0.0),
        };
        let tangent = self.checked_segment(segment)?.tangent_at(t);
        tangent.map_err(|_| {
            CenterlineError::curve_fitting(format!("degenerate tangent at sample {index}"))
        })
    }

    /// Unit tangents at every sample.
    ///
    /// # Errors
    ///
    /// Propagates the first failing [`FittedCurve::tangent_at_sample`].
    pub fn tangents(&self) -> Result<Vec<Vector3<f64>>> {
        (0..self.num_samples())
            .map(|i| self.tangent_at_sample(i))
            .collect()
    }

    /// Evaluate every segment at `per_segment` evenly spaced parameters.
    ///
    /// Points are returned segment by segment; shared endpoints appear once
    /// at the end of one segment and again at the start of the next.
    #[must_use]
    pub fn sample(&self, per_segment: usize) -> Vec<Point3<f64>> {
        let k = per_segment.max(2);
        let mut out = Vec::with_capacity(k * self.segments.len());
        for seg in &self.segments {
            for j in 0..k {
                let t = j as f64 / (k - 1) as f64;
                out.push(seg.point_at(t));
            }
        }
        out
    }

    fn checked_segment(&self, index: usize) -> Result<&CubicBezier> {
        self.segments.get(index).ok_or_else(|| {
            CenterlineError::curve_fitting(format!(
                "segment {index} out of range ({} segments)",
                self.segments.len()
            ))
        })
    }
}

/// Solve the banded system for the first control points `A`.
fn solve_first_controls(points: &[Point3<f64>]) -> Result<Vec<Point3<f64>>> {
    let n = points.len() - 1;

    let mut matrix = DMatrix::<f64>::zeros(n, n);
    for i in 0..n {
        matrix[(i, i)] = 4.0;
        if i > 0 {
            matrix[(i, i - 1)] = 1.0;
        }
        if i + 1 < n {
            matrix[(i, i + 1)] = 1.0;
        }
    }
    matrix[(0, 0)] = 2.0;
    matrix[(n - 1, n - 1)] = 7.0;
    matrix[(n - 1, n - 2)] = 2.0;

    let mut rhs_x = DVector::<f64>::zeros(n);
    let mut rhs_y = DVector::<f64>::zeros(n);
    let mut rhs_z = DVector::<f64>::zeros(n);

    for i in 0..n {
        let r = if i == 0 {
            points[0].coords + points[1].coords * 2.0
        } else if i == n - 1 {
            points[n - 1].coords * 8.0 + points[n].coords
        } else {
            points[i].coords * 4.0 + points[i + 1].coords * 2.0
        };
        rhs_x[i] = r.x;
        rhs_y[i] = r.y;
        rhs_z[i] = r.z;
    }

    let lu = matrix.lu();
    let solve = |rhs: &DVector<f64>, axis: &str| {
        lu.solve(rhs).ok_or_else(|| {
            CenterlineError::curve_fitting(format!("singular control point system for {axis}"))
        })
    };
    let ax = solve(&rhs_x, "X")?;
    let ay = solve(&rhs_y, "Y")?;
    let az = solve(&rhs_z, "Z")?;

    let controls: Vec<Point3<f64>> = (0..n).map(|i| Point3::new(ax[i], ay[i], az[i])).collect();
    if controls.iter().any(|p| !p.coords.iter().all(|c| c.is_finite())) {
        return Err(CenterlineError::curve_fitting(
            "non-finite control points in solution",
        ));
    }
    Ok(controls)
}
