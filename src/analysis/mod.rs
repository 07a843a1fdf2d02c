//! Per-metric quality estimators and the thresholds they are judged against.
//!
//! Each estimator is a pure function over a read-only buffer, wrapped in a
//! small trait so the validator can have alternatives injected. None of them
//! depends on another's output, and none of them fails: numeric edge cases
//! degrade to worst-case scores.

pub mod blur;
pub mod composition;
pub mod lighting;
mod mode;
pub mod resolution;
mod threshold;

use serde::{Deserialize, Serialize};

pub use blur::{BlurEstimator, BlurMethod, BlurMetrics, BlurOptions, ConsensusBlurEstimator};
pub use composition::{CompositionEstimator, CompositionMetrics, SalienceCompositionEstimator};
pub use lighting::{
    detect_exposure_problems, ExposureReport, HistogramLightingEstimator, LightingEstimator,
    LightingMetrics, ZoneLighting,
};
pub use mode::{CaptureMode, PerMode};
pub use resolution::{
    Adequacy, PixelCountResolutionEstimator, ResolutionEstimator, ResolutionMetrics,
};
pub use threshold::{
    BlurThresholds, CategoryThresholds, CompositionThresholds, InvalidThreshold,
    LightingThresholds, ModeOverrides, QualityThresholds, ResolutionLimits, ScoreWeights,
    ThresholdsUpdate,
};

/// The four metric vectors of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Sharpness.
    pub blur: BlurMetrics,
    /// Brightness, contrast and exposure.
    pub lighting: LightingMetrics,
    /// Subject placement.
    pub composition: CompositionMetrics,
    /// Pixel-count adequacy.
    pub resolution: ResolutionMetrics,
}

impl QualityMetrics {
    /// Scores in blur, lighting, composition, resolution order.
    pub fn scores(&self) -> [f64; 4] {
        [
            self.blur.score,
            self.lighting.score,
            self.composition.score,
            self.resolution.score,
        ]
    }
}
