//! Centerlines to beam model.
//!
//! Every branch goes through the same chain, in index order:
//!
//! 1. Arc-length resampling
//! 2. Cubic Bézier fit and tangents at the samples
//! 3. Frames from one seed vector per branch
//! 4. Quaternion encoding
//!
//! The graph is built from the resampled endpoints and the raw points.

use centerline_curves::{
    FittedCurve, FrameBuilder, Point3, RotationEncoder, SampledBranch, resample_branch,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::{
    Aabb, BeamModel, Branch, Endpoint, PipelineConfig, Stage, VesselError, VesselGraph,
    VesselResult,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which nodes of a beam are held fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FixedIndices {
    /// First node only: the branch is attached at its end.
    Start,
    /// Last node only: the branch is attached at its start.
    End,
    /// First and last nodes: the branch is attached nowhere.
    Both,
    /// No node: the branch is attached at both ends.
    None,
}

impl FixedIndices {
    /// Node indices for a beam of `len` nodes.
    #[must_use]
    pub fn indices(self, len: usize) -> Vec<usize> {
        let last = len.saturating_sub(1);
        match self {
            Self::Start => vec![0],
            Self::End => vec![last],
            Self::Both if last == 0 => vec![0],
            Self::Both => vec![0, last],
            Self::None => Vec::new(),
        }
    }
}

/// A joint between two beams at a shared vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coupling {
    /// Branch whose endpoint is the vertex.
    pub source: usize,
    /// Neighbor branch passing through the vertex.
    pub target: usize,
    /// Which end of `source`.
    pub endpoint: Endpoint,
    /// Node index of the vertex in `source`.
    pub source_index: usize,
    /// Node index of the vertex in `target`.
    pub target_index: usize,
}

/// Beams for every branch plus their connectivity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VesselModel {
    /// One beam per input branch, in input order.
    pub beams: Vec<BeamModel>,
    /// Branch adjacency.
    pub graph: VesselGraph,
    /// Margin added on every side by [`VesselModel::bounding_box`].
    pub bounding_box_margin: f64,
}

impl VesselModel {
    /// Build a model, seeding the frame RNG from `config.seed` when set.
    ///
    /// # Errors
    ///
    /// Returns [`VesselError::InvalidConfig`] for a bad configuration and
    /// [`VesselError::Branch`] for the first branch that fails.
    ///
    /// # Example
    ///
    /// ```
    /// use nalgebra::Point3;
    /// use vessel_model::{PipelineConfig, VesselModel};
    ///
    /// let branch: Vec<_> = (0..10)
    ///     .map(|i| Point3::new(f64::from(i) * 0.01, 0.0, 0.0))
    ///     .collect();
    /// let config = PipelineConfig::default().with_sampling_rate(0.02).with_seed(1);
    /// let model = VesselModel::build(&[branch], &config).unwrap();
    ///
    /// assert_eq!(model.len(), 1);
    /// assert_eq!(model.beams[0].poses().len(), model.beams[0].len());
    /// ```
    pub fn build(branches: &[Branch], config: &PipelineConfig) -> VesselResult<Self> {
        match config.seed {
            Some(seed) => {
                let mut rng = StdRng::seed_from_u64(seed);
                Self::build_with_rng(branches, config, &mut rng)
            }
            None => Self::build_with_rng(branches, config, &mut rand::thread_rng()),
        }
    }

    /// Build a model drawing seed vectors from `rng`.
    ///
    /// Branches share the generator and are processed in index order, so a
    /// seeded generator gives the same model every time.
    ///
    /// # Errors
    ///
    /// Same as [`VesselModel::build`].
    pub fn build_with_rng<R: Rng + ?Sized>(
        branches: &[Branch],
        config: &PipelineConfig,
        rng: &mut R,
    ) -> VesselResult<Self> {
        config.validate()?;
        info!(
            branches = branches.len(),
            sampling_rate = config.sampling_rate,
            mode = ?config.frame_mode,
            "Building vessel model"
        );

        let sampled = branches
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                resample_branch(raw, config.sampling_rate)
                    .map_err(|e| VesselError::at_stage(i, Stage::Resampling, e))
            })
            .collect::<VesselResult<Vec<_>>>()?;

        let graph = VesselGraph::from_sampled(branches, &sampled);

        let frame_builder = config.frame_builder();
        let encoder = RotationEncoder::with_tolerance(config.orthonormal_tolerance);

        let mut beams = Vec::with_capacity(sampled.len());
        for (index, sampled) in sampled.into_iter().enumerate() {
            let beam = build_beam(index, sampled, &frame_builder, &encoder, rng)?;
            debug!(branch = index, nodes = beam.len(), "Built beam");
            beams.push(beam);
        }

        let model = Self {
            beams,
            graph,
            bounding_box_margin: config.bounding_box_margin,
        };
        info!(
            beams = model.len(),
            nodes = model.node_count(),
            symmetric = model.graph.is_symmetric(),
            "Vessel model complete"
        );
        Ok(model)
    }

    /// Number of beams.
    #[must_use]
    pub fn len(&self) -> usize {
        self.beams.len()
    }

    /// Whether the model has no beams.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.beams.is_empty()
    }

    /// Total node count over all beams.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.beams.iter().map(BeamModel::len).sum()
    }

    /// Beam of one branch.
    ///
    /// # Errors
    ///
    /// Returns [`VesselError::BranchOutOfRange`] for an unknown index.
    pub fn beam(&self, branch: usize) -> VesselResult<&BeamModel> {
        self.beams
            .get(branch)
            .ok_or(VesselError::BranchOutOfRange {
                index: branch,
                count: self.beams.len(),
            })
    }

    /// Nodes of a beam to hold fixed, from its free ends.
    ///
    /// # Errors
    ///
    /// Returns [`VesselError::BranchOutOfRange`] for an unknown index.
    pub fn fixed_indices(&self, branch: usize) -> VesselResult<FixedIndices> {
        let adjacency = self
            .graph
            .adjacency(branch)
            .ok_or(VesselError::BranchOutOfRange {
                index: branch,
                count: self.graph.len(),
            })?;

        let fixed = match (adjacency.start.is_empty(), adjacency.end.is_empty()) {
            (true, false) => FixedIndices::Start,
            (false, true) => FixedIndices::End,
            (true, true) => FixedIndices::Both,
            (false, false) => FixedIndices::None,
        };
        Ok(fixed)
    }

    /// A coupling for every `(branch, endpoint, neighbor)` in the graph.
    ///
    /// # Errors
    ///
    /// Returns [`VesselError::VertexNotFound`] when a neighbor passes through
    /// the vertex in its raw points but not in its resampled ones.
    pub fn couplings(&self) -> VesselResult<Vec<Coupling>> {
        self.graph
            .edges()
            .map(|(source, endpoint, target)| {
                let vertex = self.vertex(source, endpoint)?;
                let source_index = self.beam(source)?.bifurcation_index(&vertex)?;
                let target_index = self.beam(target)?.bifurcation_index(&vertex)?;
                Ok(Coupling {
                    source,
                    target,
                    endpoint,
                    source_index,
                    target_index,
                })
            })
            .collect()
    }

    /// Bounding box of all beams grown by the configured margin.
    #[must_use]
    pub fn bounding_box(&self) -> Option<Aabb> {
        Aabb::from_points(self.beams.iter().flat_map(BeamModel::positions))
            .map(|b| b.expanded(self.bounding_box_margin))
    }

    fn vertex(&self, branch: usize, endpoint: Endpoint) -> VesselResult<Point3<f64>> {
        let beam = self.beam(branch)?;
        Ok(match endpoint {
            Endpoint::Start => beam.sampled.first(),
            Endpoint::End => beam.sampled.last(),
        })
    }
}

fn build_beam<R: Rng + ?Sized>(
    index: usize,
    sampled: SampledBranch,
    frame_builder: &FrameBuilder,
    encoder: &RotationEncoder,
    rng: &mut R,
) -> VesselResult<BeamModel> {
    let curve = FittedCurve::fit(&sampled)
        .map_err(|e| VesselError::at_stage(index, Stage::CurveFitting, e))?;
    let tangents = curve
        .tangents()
        .map_err(|e| VesselError::at_stage(index, Stage::CurveFitting, e))?;

    let frames = frame_builder
        .build(sampled.points(), &tangents, rng)
        .map_err(|e| VesselError::at_stage(index, Stage::Framing, e))?;

    let poses = encoder
        .poses(&frames)
        .map_err(|e| VesselError::at_stage(index, Stage::RotationEncoding, e))?;

    Ok(BeamModel {
        index,
        sampled,
        frames,
        poses,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use centerline_curves::Vector3;

    fn line(from: Point3<f64>, dir: Vector3<f64>, n: usize, step: f64) -> Branch {
        (0..n).map(|k| from + dir * (step * k as f64)).collect()
    }

    /// Trunk along x with two daughters leaving its last point.
    fn bifurcation() -> Vec<Branch> {
        let trunk = line(Point3::origin(), Vector3::x(), 11, 0.01);
        let tip = trunk[10];
        vec![
            trunk,
            line(tip, Vector3::new(1.0, 1.0, 0.0).normalize(), 11, 0.01),
            line(tip, Vector3::new(1.0, -1.0, 0.0).normalize(), 11, 0.01),
        ]
    }

    fn config() -> PipelineConfig {
        PipelineConfig::default().with_sampling_rate(0.02).with_seed(3)
    }

    #[test]
    fn test_build_bifurcation() {
        let model = VesselModel::build(&bifurcation(), &config()).unwrap();

        assert_eq!(model.len(), 3);
        for beam in &model.beams {
            assert_eq!(beam.frames.len(), beam.len());
            assert_eq!(beam.poses.len(), beam.len());
            for frame in beam.frames() {
                assert!(frame.is_orthonormal(1e-9));
            }
        }

        assert_eq!(model.graph.neighbors(0, Endpoint::End), &[1, 2]);
        assert_eq!(model.graph.neighbors(1, Endpoint::Start), &[0, 2]);
        assert!(model.graph.is_symmetric());
    }

    #[test]
    fn test_seed_is_reproducible() {
        let a = VesselModel::build(&bifurcation(), &config()).unwrap();
        let b = VesselModel::build(&bifurcation(), &config()).unwrap();
        assert_eq!(a, b);

        let mut rng = StdRng::seed_from_u64(3);
        let c = VesselModel::build_with_rng(&bifurcation(), &config(), &mut rng).unwrap();
        assert_eq!(a, c);
    }

    #[test]
    fn test_fixed_indices() {
        let model = VesselModel::build(&bifurcation(), &config()).unwrap();

        // Trunk is attached at its end only: fix the inlet.
        assert_eq!(model.fixed_indices(0).unwrap(), FixedIndices::Start);
        // Daughters are attached at their start: fix the outlets.
        assert_eq!(model.fixed_indices(1).unwrap(), FixedIndices::End);
        assert_eq!(model.fixed_indices(2).unwrap(), FixedIndices::End);

        let last = model.beams[1].len() - 1;
        assert_eq!(FixedIndices::End.indices(model.beams[1].len()), vec![last]);
        assert!(model.fixed_indices(9).is_err());
    }

    #[test]
    fn test_fixed_indices_isolated() {
        let a = line(Point3::origin(), Vector3::x(), 5, 0.01);
        let b = line(Point3::new(0.0, 1.0, 0.0), Vector3::y(), 5, 0.01);
        let model = VesselModel::build(&[a, b], &config()).unwrap();
        assert_eq!(model.fixed_indices(0).unwrap(), FixedIndices::Both);
        assert_eq!(FixedIndices::Both.indices(3), vec![0, 2]);
        assert!(FixedIndices::None.indices(3).is_empty());
    }

    #[test]
    fn test_couplings() {
        let model = VesselModel::build(&bifurcation(), &config()).unwrap();
        let couplings = model.couplings().unwrap();

        assert_eq!(couplings.len(), 6);
        let first = couplings[0];
        assert_eq!(first.source, 0);
        assert_eq!(first.target, 1);
        assert_eq!(first.endpoint, Endpoint::End);
        assert_eq!(first.source_index, model.beams[0].len() - 1);
        assert_eq!(first.target_index, 0);
    }

    #[test]
    fn test_coupling_vertex_dropped_by_resampling() {
        // Side branch starts at trunk[3], which resampling at 0.02 drops.
        let trunk = line(Point3::origin(), Vector3::x(), 11, 0.01);
        let side = line(trunk[3], Vector3::y(), 6, 0.01);
        let model = VesselModel::build(&[trunk, side], &config()).unwrap();

        let err = model.couplings().unwrap_err();
        assert!(matches!(err, VesselError::VertexNotFound { branch: 0, .. }));
    }

    #[test]
    fn test_failure_attribution() {
        let mut branches = bifurcation();
        branches.push(vec![Point3::origin()]);

        let err = VesselModel::build(&branches, &config()).unwrap_err();
        assert_eq!(err.branch_index(), Some(3));
        assert_eq!(err.stage(), Some(Stage::Resampling));
    }

    #[test]
    fn test_invalid_config() {
        let err = VesselModel::build(&bifurcation(), &config().with_sampling_rate(-1.0))
            .unwrap_err();
        assert!(matches!(err, VesselError::InvalidConfig { .. }));
    }

    #[test]
    fn test_model_bounding_box() {
        let model = VesselModel::build(&bifurcation(), &config()).unwrap();
        let bbox = model.bounding_box().unwrap();
        assert_relative_eq!(bbox.min.x, -0.001, epsilon = 1e-12);
        assert!(bbox.max.x > 0.1);
        assert!(bbox.min.y < 0.0 && bbox.max.y > 0.0);
    }

    #[test]
    fn test_bounding_box_uses_configured_margin() {
        let tight = VesselModel::build(&bifurcation(), &config().with_bounding_box_margin(0.0))
            .unwrap();
        let loose = VesselModel::build(&bifurcation(), &config().with_bounding_box_margin(0.5))
            .unwrap();
        assert_relative_eq!(loose.bounding_box_margin, 0.5);

        let (tight, loose) = (tight.bounding_box().unwrap(), loose.bounding_box().unwrap());
        assert_relative_eq!(tight.min.x, 0.0);
        assert_relative_eq!(loose.min.coords, tight.min.coords - Vector3::repeat(0.5));
        assert_relative_eq!(loose.max.coords, tight.max.coords + Vector3::repeat(0.5));
    }
}
