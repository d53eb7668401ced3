//! Error types for vessel model construction.

use std::fmt;
use std::path::PathBuf;

use centerline_curves::CenterlineError;
use nalgebra::Point3;
use thiserror::Error;

/// Result type for vessel model operations.
pub type VesselResult<T> = Result<T, VesselError>;

/// Pipeline stage in which a branch failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stage {
    /// Arc-length resampling of the raw branch.
    Resampling,
    /// Cubic fitting and tangent evaluation.
    CurveFitting,
    /// Normal/binormal construction.
    Framing,
    /// Frame to quaternion conversion.
    RotationEncoding,
}

impl Stage {
    /// Stage implied by a geometry error.
    ///
    /// [`CenterlineError::InvalidFrame`] is raised by both framing and
    /// encoding; callers that know the stage should use
    /// [`VesselError::at_stage`].
    #[must_use]
    pub fn of(error: &CenterlineError) -> Self {
        match error {
            CenterlineError::Resampling { .. } => Self::Resampling,
            CenterlineError::CurveFitting { .. } => Self::CurveFitting,
            CenterlineError::FrameConsistency { .. } | CenterlineError::DegenerateSeed { .. } => {
                Self::Framing
            }
            CenterlineError::InvalidFrame { .. } => Self::RotationEncoding,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Resampling => "resampling",
            Self::CurveFitting => "curve fitting",
            Self::Framing => "framing",
            Self::RotationEncoding => "rotation encoding",
        };
        f.write_str(name)
    }
}

/// Errors that can occur while building a vessel model.
#[derive(Debug, Error)]
pub enum VesselError {
    /// A branch failed in one of the geometry stages.
    #[error("branch {index} failed during {stage}: {source}")]
    Branch {
        /// Index of the failing branch.
        index: usize,
        /// Stage that failed.
        stage: Stage,
        /// Underlying geometry error.
        #[source]
        source: CenterlineError,
    },

    /// A bifurcation point is not among a branch's sampled points.
    #[error("vertex {point:?} not found in sampled branch {branch}")]
    VertexNotFound {
        /// Branch that was searched.
        branch: usize,
        /// The missing vertex.
        point: Point3<f64>,
    },

    /// A branch index outside the model.
    #[error("branch index {index} out of range ({count} branches)")]
    BranchOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of branches.
        count: usize,
    },

    /// Configuration values are invalid.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// Malformed skeleton text.
    #[error("skeleton line {line}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// Description of the problem.
        message: String,
    },

    /// Skeleton file not found.
    #[error("file not found: {path}")]
    FileNotFound {
        /// Path that was not found.
        path: PathBuf,
    },

    /// Underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl VesselError {
    /// Attribute a geometry error to a branch.
    #[must_use]
    pub fn branch(index: usize, source: CenterlineError) -> Self {
        Self::Branch {
            index,
            stage: Stage::of(&source),
            source,
        }
    }

    /// Attribute a geometry error to a branch and a known stage.
    #[must_use]
    pub fn at_stage(index: usize, stage: Stage, source: CenterlineError) -> Self {
        Self::Branch {
            index,
            stage,
            source,
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Index of the offending branch, when the error is attributable to one.
    #[must_use]
    pub fn branch_index(&self) -> Option<usize> {
        match self {
            Self::Branch { index, .. } => Some(*index),
            Self::VertexNotFound { branch, .. } => Some(*branch),
            _ => None,
        }
    }

    /// Failing stage of a branch error.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Branch { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
