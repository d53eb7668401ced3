//! Per-branch beam layout.

use centerline_curves::{Frame, Point3, Pose, SampledBranch, Vector3};

use crate::{VesselError, VesselResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Axis-aligned box around a beam.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Smallest x, y, z.
    pub min: Point3<f64>,
    /// Largest x, y, z.
    pub max: Point3<f64>,
}

impl Aabb {
    /// Box spanning `points`, or `None` when there are none.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = *points.next()?;
        Some(points.fold(
            Self {
                min: first,
                max: first,
            },
            |acc, p| Self {
                min: acc.min.inf(p),
                max: acc.max.sup(p),
            },
        ))
    }

    /// Copy grown by `margin` on every side.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        let m = Vector3::repeat(margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Edge lengths.
    #[must_use]
    pub fn size(&self) -> Vector3<f64> {
        self.max - self.min
    }

    /// Whether `point` lies inside or on the boundary.
    #[must_use]
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        (0..3).all(|k| point[k] >= self.min[k] && point[k] <= self.max[k])
    }
}

/// One branch as a chain of rigid beam nodes.
///
/// Node `i` sits at the `i`-th sampled point with the orientation of the
/// `i`-th frame; consecutive nodes are joined by an edge.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BeamModel {
    /// Branch index in the input.
    pub index: usize,
    /// Resampled centerline.
    pub sampled: SampledBranch,
    /// Frame per node.
    pub frames: Vec<Frame>,
    /// Pose per node.
    pub poses: Vec<Pose>,
}

impl BeamModel {
    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sampled.len()
    }

    /// Whether the beam has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sampled.is_empty()
    }

    /// Node positions.
    #[must_use]
    pub fn positions(&self) -> &[Point3<f64>] {
        self.sampled.points()
    }

    /// Node frames.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Node poses.
    #[must_use]
    pub fn poses(&self) -> &[Pose] {
        &self.poses
    }

    /// Edges `[i, i + 1]` along the chain.
    #[must_use]
    pub fn topology(&self) -> Vec<[usize; 2]> {
        (1..self.len()).map(|i| [i - 1, i]).collect()
    }

    /// Flattened `[px, py, pz, qx, qy, qz, qw]` per node.
    #[must_use]
    pub fn rigid_state(&self) -> Vec<f64> {
        self.poses.iter().flat_map(Pose::to_rigid_array).collect()
    }

    /// Index of the node exactly at `point`.
    ///
    /// # Errors
    ///
    /// Returns [`VesselError::VertexNotFound`] if no sampled point equals
    /// `point`.
    pub fn bifurcation_index(&self, point: &Point3<f64>) -> VesselResult<usize> {
        self.sampled
            .index_of(point)
            .ok_or_else(|| VesselError::VertexNotFound {
                branch: self.index,
                point: *point,
            })
    }

    /// Bounding box of the nodes grown by `margin`.
    #[must_use]
    pub fn bounding_box(&self, margin: f64) -> Option<Aabb> {
        Aabb::from_points(self.positions()).map(|b| b.expanded(margin))
    }
}
