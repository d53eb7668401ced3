//! Vessel-tree beam models from skeleton centerlines.
//!
//! Takes the branches of a vessel skeleton and produces one beam per branch
//! (resampled nodes, frames and poses) plus the branch adjacency at
//! bifurcations:
//!
//! - [`parse_skeleton`] / [`load_skeleton`] - Read branches from text
//! - [`VesselGraph`] - Which branches touch each branch endpoint
//! - [`BeamModel`] - Nodes, edges and rigid states of one branch
//! - [`VesselModel`] - All beams, fixed nodes and couplings
//!
//! # Example
//!
//! ```
//! use vessel_model::{PipelineConfig, VesselModel, parse_skeleton};
//!
//! let text = "\
//! 0 0 0
//! 0.01 0 0
//! 0.02 0 0
//! 0.03 0 0
//!
//! 0.03 0 0
//! 0.04 0.01 0
//! 0.05 0.02 0
//! ";
//! let branches = parse_skeleton(text.as_bytes()).unwrap();
//!
//! let config = PipelineConfig::default().with_sampling_rate(0.01).with_seed(7);
//! let model = VesselModel::build(&branches, &config).unwrap();
//!
//! assert_eq!(model.len(), 2);
//! assert_eq!(model.couplings().unwrap().len(), 2);
//! ```
//!
//! # Feature Flags
//!
//! - `serde`: Enable serialization/deserialization for all model types

#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::cast_precision_loss
)]

mod beam;
mod config;
mod error;
mod graph;
mod pipeline;
mod skeleton;

pub use beam::{Aabb, BeamModel};
pub use config::PipelineConfig;
pub use error::{Stage, VesselError, VesselResult};
pub use graph::{BranchAdjacency, Endpoint, VesselGraph};
pub use pipeline::{Coupling, FixedIndices, VesselModel};
pub use skeleton::{load_skeleton, parse_skeleton, write_skeleton};

// Re-export the per-branch geometry for convenience
pub use centerline_curves::{
    CollinearityTest, Frame, FrameMode, Point3, Pose, SampledBranch, UnitQuaternion, Vector3,
};

/// A raw centerline branch as read from a skeleton.
pub type Branch = Vec<Point3<f64>>;
