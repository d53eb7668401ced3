//! Pipeline configuration.

use centerline_curves::{CollinearityTest, DEFAULT_ORTHONORMAL_TOLERANCE, FrameBuilder, FrameMode};

use crate::{VesselError, VesselResult};

/// Parameters for building a vessel model from centerlines.
///
/// # Example
///
/// ```
/// use vessel_model::PipelineConfig;
///
/// let config = PipelineConfig::default()
///     .with_sampling_rate(0.01)
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Target minimum spacing between resampled points, in model units.
    pub sampling_rate: f64,

    /// Seed for the frame seed-vector draw. `None` uses the thread RNG.
    pub seed: Option<u64>,

    /// How normals are propagated along each branch.
    pub frame_mode: FrameMode,

    /// Collinearity test for the seed-vector draw.
    pub collinearity: CollinearityTest,

    /// Tolerance for the orthonormality check before quaternion encoding.
    pub orthonormal_tolerance: f64,

    /// Margin added on every side of the model's bounding box.
    pub bounding_box_margin: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sampling_rate: 0.005,
            seed: None,
            frame_mode: FrameMode::FixedSeed,
            collinearity: CollinearityTest::ComponentSum,
            orthonormal_tolerance: DEFAULT_ORTHONORMAL_TOLERANCE,
            bounding_box_margin: 0.001,
        }
    }
}

impl PipelineConfig {
    /// Set the sampling rate.
    #[must_use]
    pub const fn with_sampling_rate(mut self, rate: f64) -> Self {
        self.sampling_rate = rate;
        self
    }

    /// Set a fixed RNG seed for reproducible frames.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the frame propagation mode.
    #[must_use]
    pub const fn with_frame_mode(mut self, mode: FrameMode) -> Self {
        self.frame_mode = mode;
        self
    }

    /// Set the collinearity test.
    #[must_use]
    pub const fn with_collinearity(mut self, test: CollinearityTest) -> Self {
        self.collinearity = test;
        self
    }

    /// Set the orthonormality tolerance.
    #[must_use]
    pub const fn with_orthonormal_tolerance(mut self, tolerance: f64) -> Self {
        self.orthonormal_tolerance = tolerance;
        self
    }

    /// Set the bounding box margin.
    #[must_use]
    pub const fn with_bounding_box_margin(mut self, margin: f64) -> Self {
        self.bounding_box_margin = margin;
        self
    }

    /// Frame builder matching this configuration.
    #[must_use]
    pub const fn frame_builder(&self) -> FrameBuilder {
        FrameBuilder::new()
            .with_mode(self.frame_mode)
            .with_collinearity(self.collinearity)
    }

    /// Validates the parameters.
    ///
    /// # Errors
    ///
    /// Returns [`VesselError::InvalidConfig`] for the first invalid value.
    pub fn validate(&self) -> VesselResult<()> {
        if !(self.sampling_rate.is_finite() && self.sampling_rate > 0.0) {
            return Err(VesselError::invalid_config(format!(
                "sampling rate must be positive and finite, got {}",
                self.sampling_rate
            )));
        }

        if !(self.orthonormal_tolerance.is_finite() && self.orthonormal_tolerance > 0.0) {
            return Err(VesselError::invalid_config(format!(
                "orthonormal tolerance must be positive, got {}",
                self.orthonormal_tolerance
            )));
        }

        if !(self.bounding_box_margin.is_finite() && self.bounding_box_margin >= 0.0) {
            return Err(VesselError::invalid_config(format!(
                "bounding box margin must be non-negative, got {}",
                self.bounding_box_margin
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert!((config.sampling_rate - 0.005).abs() < f64::EPSILON);
        assert_eq!(config.seed, None);
        assert_eq!(config.frame_mode, FrameMode::FixedSeed);
        assert_eq!(config.collinearity, CollinearityTest::ComponentSum);
        assert!((config.bounding_box_margin - 0.001).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = PipelineConfig::default()
            .with_sampling_rate(0.02)
            .with_seed(7)
            .with_frame_mode(FrameMode::RotationMinimizing)
            .with_collinearity(CollinearityTest::CrossNorm);

        assert_eq!(config.seed, Some(7));
        let builder = config.frame_builder();
        assert_eq!(builder.mode, FrameMode::RotationMinimizing);
        assert_eq!(builder.collinearity, CollinearityTest::CrossNorm);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(PipelineConfig::default().with_sampling_rate(0.0).validate().is_err());
        assert!(PipelineConfig::default().with_sampling_rate(f64::INFINITY).validate().is_err());
        assert!(
            PipelineConfig::default()
                .with_orthonormal_tolerance(-1.0)
                .validate()
                .is_err()
        );
        assert!(
            PipelineConfig::default()
                .with_bounding_box_margin(-0.1)
                .validate()
                .is_err()
        );
    }
}
