//! Quality thresholds.
//!
//! Boundary values for every metric, per capture mode where the metric
//! depends on the anatomical target. The validator owns one snapshot and
//! swaps it atomically when a caller merges a [`ThresholdsUpdate`].

use serde::{Deserialize, Serialize};

use super::mode::{CaptureMode, PerMode};
use crate::pixels::RelativeRoi;

/// Sharpness score cutoffs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlurThresholds {
    /// Score at or above which sharpness is excellent.
    pub excellent: f64,
    /// Score at or above which sharpness is good; below it a blur issue is raised.
    pub good: f64,
    /// Score at or above which sharpness is fair.
    pub fair: f64,
}

impl Default for BlurThresholds {
    fn default() -> Self {
        Self {
            excellent: 0.7,
            good: 0.4,
            fair: 0.2,
        }
    }
}

/// Brightness, contrast and exposure bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingThresholds {
    /// Mean luminance below which the frame is too dark.
    pub min_brightness: f64,
    /// Mean luminance above which the frame is too bright.
    pub max_brightness: f64,
    /// Lower bound of the bonus band.
    pub optimal_min_brightness: f64,
    /// Upper bound of the bonus band.
    pub optimal_max_brightness: f64,
    /// Multiplier applied inside the bonus band.
    pub optimal_bonus: f64,
    /// Normalized contrast below which the frame is flat.
    pub min_contrast: f64,
    /// Normalized contrast above which the frame is harsh.
    pub max_contrast: f64,
    /// Maximum tolerated fraction of pixels in bins 0..=50.
    pub max_dark_ratio: f64,
    /// Maximum tolerated fraction of pixels in bins 200..=255.
    pub max_bright_ratio: f64,
    /// Bright fraction that flags overexposure.
    pub overexposed_ratio: f64,
    /// Dark fraction that flags underexposure.
    pub underexposed_ratio: f64,
    /// Pure-white or pure-black fraction that flags clipping.
    pub clipping_ratio: f64,
    /// Lighting score below which a lighting issue is raised.
    pub min_score: f64,
}

impl Default for LightingThresholds {
    fn default() -> Self {
        Self {
            min_brightness: 60.0,
            max_brightness: 200.0,
            optimal_min_brightness: 80.0,
            optimal_max_brightness: 180.0,
            optimal_bonus: 1.1,
            min_contrast: 0.2,
            max_contrast: 0.8,
            max_dark_ratio: 0.3,
            max_bright_ratio: 0.1,
            overexposed_ratio: 0.05,
            underexposed_ratio: 0.10,
            clipping_ratio: 0.01,
            min_score: 0.6,
        }
    }
}

/// Framing minimums and the expected subject region per mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositionThresholds {
    /// Minimum fraction of the expected region covered by the subject.
    pub min_coverage: f64,
    /// Minimum centering score.
    pub min_centering: f64,
    /// Composition score below which a composition issue is raised.
    pub min_score: f64,
    /// Where the subject should sit, per capture mode.
    pub expected_regions: PerMode<RelativeRoi>,
}

impl Default for CompositionThresholds {
    fn default() -> Self {
        let third = 1.0 / 3.0;
        Self {
            min_coverage: 0.5,
            min_centering: 0.7,
            min_score: 0.6,
            expected_regions: PerMode {
                tongue: RelativeRoi::new(third, third, third, third),
                face: RelativeRoi::new(0.25, 0.15, 0.5, 0.6),
                body: RelativeRoi::new(0.15, 0.05, 0.7, 0.9),
                general: RelativeRoi::new(0.1, 0.1, 0.8, 0.8),
            },
        }
    }
}

/// Pixel-count limits for one capture mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionLimits {
    /// Below this the capture is insufficient.
    pub minimum_pixels: u64,
    /// At or above this the capture is optimal.
    pub optimal_pixels: u64,
}

impl ResolutionLimits {
    /// Limits from a minimum and an optimal pixel count.
    pub const fn new(minimum_pixels: u64, optimal_pixels: u64) -> Self {
        Self {
            minimum_pixels,
            optimal_pixels,
        }
    }
}

fn default_resolution_limits() -> PerMode<ResolutionLimits> {
    PerMode {
        tongue: ResolutionLimits::new(640 * 480, 1280 * 720),
        face: ResolutionLimits::new(640 * 480, 1920 * 1080),
        body: ResolutionLimits::new(800 * 600, 1920 * 1080),
        general: ResolutionLimits::new(320 * 240, 1280 * 720),
    }
}

/// Weights of the four metrics in the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    /// Weight of the blur score.
    pub blur: f64,
    /// Weight of the lighting score.
    pub lighting: f64,
    /// Weight of the composition score.
    pub composition: f64,
    /// Weight of the resolution score.
    pub resolution: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            blur: 0.35,
            lighting: 0.30,
            composition: 0.20,
            resolution: 0.15,
        }
    }
}

impl ScoreWeights {
    /// Sum of all weights.
    pub fn total(&self) -> f64 {
        self.blur + self.lighting + self.composition + self.resolution
    }
}

/// Overall-score boundaries (0–100) for each category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryThresholds {
    /// Lowest score graded excellent.
    pub excellent: f64,
    /// Lowest score graded good.
    pub good: f64,
    /// Lowest score graded fair; anything below is poor.
    pub fair: f64,
}

impl Default for CategoryThresholds {
    fn default() -> Self {
        Self {
            excellent: 85.0,
            good: 70.0,
            fair: 50.0,
        }
    }
}

/// Every boundary value the engine consults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Sharpness cutoffs.
    pub blur: BlurThresholds,
    /// Brightness and contrast bounds.
    pub lighting: LightingThresholds,
    /// Coverage and centering minimums.
    pub composition: CompositionThresholds,
    /// Pixel-count limits per mode.
    pub resolution: PerMode<ResolutionLimits>,
    /// Metric weights per mode.
    pub weights: PerMode<ScoreWeights>,
    /// Score boundaries of the verdict bands.
    pub categories: CategoryThresholds,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            blur: BlurThresholds::default(),
            lighting: LightingThresholds::default(),
            composition: CompositionThresholds::default(),
            resolution: default_resolution_limits(),
            weights: PerMode::uniform(ScoreWeights::default()),
            categories: CategoryThresholds::default(),
        }
    }
}

impl QualityThresholds {
    /// Tighter thresholds for captures that feed sensitive analysis.
    pub fn strict() -> Self {
        let mut t = Self::default();
        t.blur = BlurThresholds {
            excellent: 0.8,
            good: 0.55,
            fair: 0.3,
        };
        t.lighting.min_brightness = 70.0;
        t.lighting.max_brightness = 190.0;
        t.lighting.min_score = 0.7;
        t.composition.min_coverage = 0.6;
        t.composition.min_centering = 0.8;
        t.composition.min_score = 0.7;
        t.categories = CategoryThresholds {
            excellent: 90.0,
            good: 75.0,
            fair: 60.0,
        };
        t
    }

    /// Looser thresholds (for testing and low-end devices).
    pub fn lenient() -> Self {
        let mut t = Self::default();
        t.blur = BlurThresholds {
            excellent: 0.6,
            good: 0.25,
            fair: 0.1,
        };
        t.lighting.min_brightness = 40.0;
        t.lighting.max_brightness = 220.0;
        t.lighting.min_score = 0.4;
        t.composition.min_coverage = 0.3;
        t.composition.min_centering = 0.5;
        t.composition.min_score = 0.4;
        t.categories = CategoryThresholds {
            excellent: 80.0,
            good: 60.0,
            fair: 40.0,
        };
        t
    }

    /// Resolution limits for a mode.
    pub fn resolution_for(&self, mode: CaptureMode) -> ResolutionLimits {
        *self.resolution.get(mode)
    }

    /// Score weights for a mode.
    pub fn weights_for(&self, mode: CaptureMode) -> ScoreWeights {
        *self.weights.get(mode)
    }

    /// Expected subject region for a mode.
    pub fn expected_region(&self, mode: CaptureMode) -> RelativeRoi {
        *self.composition.expected_regions.get(mode)
    }

    /// Returns a copy with `update` applied.
    pub fn merged(&self, update: &ThresholdsUpdate) -> QualityThresholds {
        let mut next = self.clone();
        if let Some(blur) = update.blur {
            next.blur = blur;
        }
        if let Some(lighting) = update.lighting {
            next.lighting = lighting;
        }
        if let Some(composition) = update.composition {
            next.composition = composition;
        }
        if let Some(categories) = update.categories {
            next.categories = categories;
        }
        update.resolution.apply_to(&mut next.resolution);
        update.weights.apply_to(&mut next.weights);
        next
    }

    /// Checks that the boundaries are internally consistent.
    pub fn validate(&self) -> Result<(), InvalidThreshold> {
        let b = &self.blur;
        if !(in_unit(b.fair) && in_unit(b.good) && in_unit(b.excellent))
            || !(b.fair <= b.good && b.good <= b.excellent)
        {
            return Err(InvalidThreshold::Blur);
        }

        let l = &self.lighting;
        if !(l.min_brightness < l.max_brightness && l.min_contrast <= l.max_contrast)
            || !in_unit(l.min_score)
            || l.optimal_bonus < 1.0
        {
            return Err(InvalidThreshold::Lighting);
        }

        let c = &self.composition;
        if !(in_unit(c.min_coverage) && in_unit(c.min_centering) && in_unit(c.min_score)) {
            return Err(InvalidThreshold::Composition);
        }

        for mode in CaptureMode::ALL {
            let r = self.resolution_for(mode);
            if r.minimum_pixels == 0 || r.minimum_pixels > r.optimal_pixels {
                return Err(InvalidThreshold::Resolution { mode });
            }
            let w = self.weights_for(mode);
            let parts = [w.blur, w.lighting, w.composition, w.resolution];
            if parts.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(InvalidThreshold::Weights { mode });
            }
        }

        let k = &self.categories;
        if !(0.0..=100.0).contains(&k.excellent) || !(k.fair <= k.good && k.good <= k.excellent) {
            return Err(InvalidThreshold::Categories);
        }

        Ok(())
    }
}

fn in_unit(v: f64) -> bool {
    (0.0..=1.0).contains(&v)
}

/// Per-mode partial override.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModeOverrides<T> {
    /// Override for [`CaptureMode::Tongue`].
    pub tongue: Option<T>,
    /// Override for [`CaptureMode::Face`].
    pub face: Option<T>,
    /// Override for [`CaptureMode::Body`].
    pub body: Option<T>,
    /// Override for [`CaptureMode::General`].
    pub general: Option<T>,
}

impl<T> Default for ModeOverrides<T> {
    fn default() -> Self {
        Self {
            tongue: None,
            face: None,
            body: None,
            general: None,
        }
    }
}

impl<T: Copy> ModeOverrides<T> {
    /// Override a single mode.
    pub fn only(mode: CaptureMode, value: T) -> Self {
        let mut o = Self::default();
        match mode {
            CaptureMode::Tongue => o.tongue = Some(value),
            CaptureMode::Face => o.face = Some(value),
            CaptureMode::Body => o.body = Some(value),
            CaptureMode::General => o.general = Some(value),
        }
        o
    }

    fn apply_to(&self, table: &mut PerMode<T>) {
        for (mode, value) in [
            (CaptureMode::Tongue, self.tongue),
            (CaptureMode::Face, self.face),
            (CaptureMode::Body, self.body),
            (CaptureMode::General, self.general),
        ] {
            if let Some(v) = value {
                *table.get_mut(mode) = v;
            }
        }
    }

    /// True when no mode is overridden.
    pub fn is_empty(&self) -> bool {
        self.tongue.is_none() && self.face.is_none() && self.body.is_none() && self.general.is_none()
    }
}

/// A partial replacement of [`QualityThresholds`]; absent sections are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdsUpdate {
    /// Replacement blur cutoffs.
    pub blur: Option<BlurThresholds>,
    /// Replacement lighting bounds.
    pub lighting: Option<LightingThresholds>,
    /// Replacement composition minimums.
    pub composition: Option<CompositionThresholds>,
    /// Per-mode resolution limits to replace.
    pub resolution: ModeOverrides<ResolutionLimits>,
    /// Per-mode weights to replace.
    pub weights: ModeOverrides<ScoreWeights>,
    /// Replacement category boundaries.
    pub categories: Option<CategoryThresholds>,
}

impl ThresholdsUpdate {
    /// True when applying the update cannot change anything.
    pub fn is_empty(&self) -> bool {
        self.blur.is_none()
            && self.lighting.is_none()
            && self.composition.is_none()
            && self.categories.is_none()
            && self.resolution.is_empty()
            && self.weights.is_empty()
    }
}

/// Inconsistent threshold configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidThreshold {
    /// Blur cutoffs out of order or range.
    #[error("blur cutoffs must satisfy 0 <= fair <= good <= excellent <= 1")]
    Blur,
    /// Lighting bounds inverted or outside 0-255.
    #[error("lighting bounds are inverted or out of range")]
    Lighting,
    /// A composition minimum outside `[0, 1]`.
    #[error("composition minimums must lie in [0, 1]")]
    Composition,
    /// Resolution limits of one mode are zero or inverted.
    #[error("resolution limits for {mode} must satisfy 0 < minimum <= optimal")]
    Resolution {
        /// Mode whose entry is invalid.
        mode: CaptureMode,
    },
    /// Weights of one mode are negative or not finite.
    #[error("score weights for {mode} must be finite and non-negative")]
    Weights {
        /// Mode whose entry is invalid.
        mode: CaptureMode,
    },
    /// Category boundaries out of order.
    #[error("category boundaries must satisfy fair <= good <= excellent <= 100")]
    Categories,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(QualityThresholds::default().validate().is_ok());
        assert!(QualityThresholds::strict().validate().is_ok());
        assert!(QualityThresholds::lenient().validate().is_ok());
    }

    #[test]
    fn test_merge_replaces_only_given_sections() {
        let base = QualityThresholds::default();
        let update = ThresholdsUpdate {
            categories: Some(CategoryThresholds {
                excellent: 95.0,
                good: 80.0,
                fair: 60.0,
            }),
            resolution: ModeOverrides::only(CaptureMode::Tongue, ResolutionLimits::new(100, 200)),
            ..Default::default()
        };

        let merged = base.merged(&update);
        assert_eq!(merged.categories.excellent, 95.0);
        assert_eq!(merged.resolution_for(CaptureMode::Tongue), ResolutionLimits::new(100, 200));
        assert_eq!(
            merged.resolution_for(CaptureMode::Face),
            base.resolution_for(CaptureMode::Face)
        );
        assert_eq!(merged.blur, base.blur);
    }

    #[test]
    fn test_empty_update_is_identity() {
        let base = QualityThresholds::strict();
        let update = ThresholdsUpdate::default();
        assert!(update.is_empty());
        assert_eq!(base.merged(&update), base);
    }

    #[test]
    fn test_inverted_blur_cutoffs_rejected() {
        let mut t = QualityThresholds::default();
        t.blur.good = 0.9;
        assert_eq!(t.validate(), Err(InvalidThreshold::Blur));
    }

    #[test]
    fn test_inverted_resolution_rejected() {
        let mut t = QualityThresholds::default();
        *t.resolution.get_mut(CaptureMode::Body) = ResolutionLimits::new(500, 100);
        assert_eq!(
            t.validate(),
            Err(InvalidThreshold::Resolution {
                mode: CaptureMode::Body
            })
        );
    }

    #[test]
    fn test_partial_toml_update() {
        let update: ThresholdsUpdate = toml::from_str(
            r#"
            [blur]
            good = 0.5

            [resolution.face]
            minimum_pixels = 1000
            optimal_pixels = 2000
            "#,
        )
        .unwrap();

        let blur = update.blur.unwrap();
        assert_eq!(blur.good, 0.5);
        assert_eq!(blur.excellent, BlurThresholds::default().excellent);
        assert_eq!(update.resolution.face, Some(ResolutionLimits::new(1000, 2000)));
        assert!(update.lighting.is_none());
    }
}
