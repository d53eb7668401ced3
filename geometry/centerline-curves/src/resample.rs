//! Arc-length resampling of raw centerline branches.
//!
//! Skeleton extraction produces dense, unevenly spaced points. Downstream
//! beam models want nodes roughly `sampling_rate` apart, so branches are
//! thinned with a greedy forward scan before any curve is fitted.

use crate::{CenterlineError, Result};
use nalgebra::Point3;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A branch reduced to points at (at least) the sampling spacing.
///
/// Invariants, established by [`resample_branch`]:
/// - the first point is the raw branch's first point,
/// - the last point is the raw branch's last point,
/// - every consecutive pair except possibly the last one is more than
///   `sampling_rate / 2` apart,
/// - there are at least two points.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "SampledBranchData"))]
pub struct SampledBranch {
    points: Vec<Point3<f64>>,
    sampling_rate: f64,
}

/// Unchecked wire form of a [`SampledBranch`].
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct SampledBranchData {
    points: Vec<Point3<f64>>,
    sampling_rate: f64,
}

#[cfg(feature = "serde")]
impl TryFrom<SampledBranchData> for SampledBranch {
    type Error = CenterlineError;

    fn try_from(data: SampledBranchData) -> Result<Self> {
        if !(data.sampling_rate.is_finite() && data.sampling_rate > 0.0) {
            return Err(CenterlineError::resampling(format!(
                "sampling rate must be positive and finite, got {}",
                data.sampling_rate
            )));
        }
        if data.points.len() < 2 {
            return Err(CenterlineError::resampling(format!(
                "sampled branch has {} points, need at least 2",
                data.points.len()
            )));
        }
        Ok(Self {
            points: data.points,
            sampling_rate: data.sampling_rate,
        })
    }
}

impl SampledBranch {
    /// The sampled points in branch order.
    #[must_use]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// The spacing the branch was sampled with.
    #[must_use]
    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }

    /// Number of sampled points (always at least 2).
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Never true for a branch built by [`resample_branch`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of segments between consecutive samples.
    #[must_use]
    pub fn num_segments(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// First sampled point.
    #[must_use]
    pub fn first(&self) -> Point3<f64> {
        self.points.first().copied().unwrap_or_else(Point3::origin)
    }

    /// Last sampled point.
    #[must_use]
    pub fn last(&self) -> Point3<f64> {
        self.points.last().copied().unwrap_or_else(Point3::origin)
    }

    /// Both branch endpoints, `[first, last]`.
    #[must_use]
    pub fn endpoints(&self) -> [Point3<f64>; 2] {
        [self.first(), self.last()]
    }

    /// Index of the first sample exactly equal to `point`.
    #[must_use]
    pub fn index_of(&self, point: &Point3<f64>) -> Option<usize> {
        self.points.iter().position(|p| p == point)
    }

    /// Consume the branch and return its points.
    #[must_use]
    pub fn into_points(self) -> Vec<Point3<f64>> {
        self.points
    }
}

/// Resample a raw branch to the given spacing.
///
/// # Algorithm
///
/// 1. Keep the first point, then every raw point at distance
///    `>= sampling_rate` from the most recently kept point.
/// 2. One pass over the kept points removing the later point of any pair
///    at distance `<= sampling_rate / 2`. The pass walks the list as it
///    shrinks and does not revisit a pair after a removal.
/// 3. Append the raw last point unless it is already the last kept point.
///
/// # Errors
///
/// Returns [`CenterlineError::Resampling`] if `sampling_rate` is not a
/// positive finite number, if the branch has fewer than 2 raw points, or if
/// fewer than 2 points survive (e.g. all raw points coincide).
///
/// # Example
///
/// ```
/// use centerline_curves::resample_branch;
/// use nalgebra::Point3;
///
/// let raw: Vec<_> = (0..5).map(|i| Point3::new(f64::from(i) * 0.01, 0.0, 0.0)).collect();
/// let sampled = resample_branch(&raw, 0.02).unwrap();
/// assert_eq!(sampled.points(), &[raw[0], raw[2], raw[4]]);
/// ```
pub fn resample_branch(raw: &[Point3<f64>], sampling_rate: f64) -> Result<SampledBranch> {
    if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
        return Err(CenterlineError::resampling(format!(
            "sampling rate must be positive and finite, got {sampling_rate}"
        )));
    }

    let (Some(&first), Some(&last)) = (raw.first(), raw.last()) else {
        return Err(CenterlineError::resampling("branch has no points"));
    };
    if raw.len() < 2 {
        return Err(CenterlineError::resampling(format!(
            "branch has {} raw point, need at least 2",
            raw.len()
        )));
    }

    let mut kept = Vec::with_capacity(raw.len());
    kept.push(first);
    for point in &raw[1..] {
        let anchor = kept[kept.len() - 1];
        if (point - anchor).norm() >= sampling_rate {
            kept.push(*point);
        }
    }
    let scanned = kept.len();

    let half = 0.5 * sampling_rate;
    let mut i = 0;
    while i + 1 < kept.len() {
        if (kept[i + 1] - kept[i]).norm() <= half {
            kept.remove(i + 1);
        }
        i += 1;
    }
    let removed = scanned - kept.len();

    if kept[kept.len() - 1] != last {
        kept.push(last);
    }

    debug!(
        raw = raw.len(),
        kept = kept.len(),
        removed,
        sampling_rate,
        "Resampled branch"
    );

    if kept.len() < 2 {
        return Err(CenterlineError::resampling(format!(
            "only {} point left after resampling {} raw points",
            kept.len(),
            raw.len()
        )));
    }

    Ok(SampledBranch {
        points: kept,
        sampling_rate,
    })
}
