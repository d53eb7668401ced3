//! Error types for centerline geometry operations.

use thiserror::Error;

/// Errors that can occur while turning a centerline into framed samples.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CenterlineError {
    /// The branch cannot be reduced to at least two sampled points.
    #[error("resampling failed: {reason}")]
    Resampling {
        /// Description of why the branch could not be resampled.
        reason: String,
    },

    /// The interpolating cubic could not be fitted or evaluated.
    #[error("curve fitting failed: {reason}")]
    CurveFitting {
        /// Description of the fitting failure.
        reason: String,
    },

    /// Per-index tangent, normal and binormal lists disagree in length.
    #[error(
        "frame lists out of step: {tangents} tangents, {normals} normals, {binormals} binormals"
    )]
    FrameConsistency {
        /// Number of tangents.
        tangents: usize,
        /// Number of normals.
        normals: usize,
        /// Number of binormals.
        binormals: usize,
    },

    /// A frame is not a proper orthonormal basis.
    #[error("invalid frame at index {index}: {reason}")]
    InvalidFrame {
        /// Sample index of the offending frame.
        index: usize,
        /// What is wrong with the frame.
        reason: String,
    },

    /// No usable seed vector was drawn from the random source.
    #[error("no non-collinear seed vector found after {attempts} attempts")]
    DegenerateSeed {
        /// Number of draws that were rejected.
        attempts: usize,
    },
}

impl CenterlineError {
    /// Create a resampling error.
    #[must_use]
    pub fn resampling(reason: impl Into<String>) -> Self {
        Self::Resampling {
            reason: reason.into(),
        }
    }

    /// Create a curve fitting error.
    #[must_use]
    pub fn curve_fitting(reason: impl Into<String>) -> Self {
        Self::CurveFitting {
            reason: reason.into(),
        }
    }

    /// Create an invalid frame error.
    #[must_use]
    pub fn invalid_frame(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidFrame {
            index,
            reason: reason.into(),
        }
    }

    /// Check if this is a resampling error.
    #[must_use]
    pub fn is_resampling(&self) -> bool {
        matches!(self, Self::Resampling { .. })
    }

    /// Check if this is a curve fitting error.
    #[must_use]
    pub fn is_curve_fitting(&self) -> bool {
        matches!(self, Self::CurveFitting { .. })
    }

    /// Check if this is a frame consistency error.
    #[must_use]
    pub fn is_frame_consistency(&self) -> bool {
        matches!(self, Self::FrameConsistency { .. })
    }

    /// Check if this is an invalid frame error.
    #[must_use]
    pub fn is_invalid_frame(&self) -> bool {
        matches!(self, Self::InvalidFrame { .. })
    }
}
