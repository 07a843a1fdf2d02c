//! Lighting and exposure estimation.
//!
//! The lighting score starts at 1.0 and is multiplicatively penalized for
//! brightness outside the acceptable band, flat or harsh contrast, and
//! excess dark or bright pixels. Exposure defects (clipped highlights,
//! blocked shadows) are a separate analysis with their own score.

use serde::{Deserialize, Serialize};

use super::threshold::LightingThresholds;
use crate::pixels::{GrayscaleBuffer, Histogram, NamedRegion, PixelBuffer, RelativeRoi};

/// Histogram stddev that maps to full contrast.
pub const CONTRAST_NORMALIZER: f64 = 128.0;

/// Upper bin of the "dark" band.
const DARK_MAX_BIN: u8 = 50;
/// Lower bin of the "bright" band.
const BRIGHT_MIN_BIN: u8 = 200;

const CLIPPING_WEIGHT: f64 = 5.0;
const CLIPPING_PENALTY_CAP: f64 = 0.3;
const EXPOSURE_FLAG_PENALTY_CAP: f64 = 0.2;

/// Exposure-defect analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExposureReport {
    /// Fraction of pure-white pixels.
    pub clipped_highlights: f64,
    /// Fraction of pure-black pixels.
    pub blocked_shadows: f64,
    /// Clipped highlights exceed the tolerated fraction.
    pub overexposed: bool,
    /// Blocked shadows exceed the tolerated fraction.
    pub underexposed: bool,
    /// Independent exposure score in `[0, 1]`.
    pub score: f64,
}

/// Lighting summary for a named zone of the frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneLighting {
    /// Zone label, e.g. `center` or `top`.
    pub name: String,
    /// Lighting score of the zone in `[0, 1]`.
    pub score: f64,
    /// Mean luminance of the zone.
    pub brightness: f64,
    /// Normalized contrast of the zone.
    pub contrast: f64,
    /// Advice specific to the zone.
    pub suggestions: Vec<String>,
}

/// Lighting metric vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightingMetrics {
    /// Lighting score in `[0, 1]`.
    pub score: f64,
    /// Mean luminance, 0–255.
    pub brightness: f64,
    /// Normalized contrast in `[0, 1]`.
    pub contrast: f64,
    /// Fraction of pixels in bins 0..=50.
    pub dark_ratio: f64,
    /// Fraction of pixels in bins 200..=255.
    pub bright_ratio: f64,
    /// Clipping analysis.
    pub exposure: ExposureReport,
    /// One message per violated condition.
    pub suggestions: Vec<String>,
    /// Per-zone breakdown, when requested.
    pub zones: Vec<ZoneLighting>,
}

/// Lighting estimation seam.
pub trait LightingEstimator: Send + Sync {
    /// Scores the lighting of `gray` against `thresholds`.
    fn estimate(&self, gray: &GrayscaleBuffer, thresholds: &LightingThresholds) -> LightingMetrics;
}

/// Default estimator driven by the luminance histogram.
#[derive(Debug, Clone, Copy, Default)]
pub struct HistogramLightingEstimator;

impl LightingEstimator for HistogramLightingEstimator {
    fn estimate(&self, gray: &GrayscaleBuffer, thresholds: &LightingThresholds) -> LightingMetrics {
        analyze_lighting(&Histogram::from_gray(gray), thresholds)
    }
}

/// Full lighting analysis from a luminance histogram.
pub fn analyze_lighting(hist: &Histogram, t: &LightingThresholds) -> LightingMetrics {
    let brightness = hist.mean();
    let contrast = (hist.stddev() / CONTRAST_NORMALIZER).min(1.0);
    let dark_ratio = hist.fraction_in(0, DARK_MAX_BIN);
    let bright_ratio = hist.fraction_in(BRIGHT_MIN_BIN, u8::MAX);

    let score = lighting_score(brightness, contrast, dark_ratio, bright_ratio, t);
    let exposure = detect_exposure_problems(hist, t);
    let suggestions = lighting_suggestions(brightness, contrast, dark_ratio, bright_ratio, t);

    tracing::debug!(
        score,
        brightness,
        contrast,
        dark_ratio,
        bright_ratio,
        overexposed = exposure.overexposed,
        underexposed = exposure.underexposed,
        "Lighting estimated"
    );

    LightingMetrics {
        score,
        brightness,
        contrast,
        dark_ratio,
        bright_ratio,
        exposure,
        suggestions,
        zones: Vec::new(),
    }
}

/// Multiplicative lighting score, clamped to `[0, 1]`.
pub fn lighting_score(
    brightness: f64,
    contrast: f64,
    dark_ratio: f64,
    bright_ratio: f64,
    t: &LightingThresholds,
) -> f64 {
    let mut score = 1.0;

    if brightness < t.min_brightness {
        score *= brightness / t.min_brightness;
    } else if brightness > t.max_brightness {
        score *= (255.0 - brightness) / (255.0 - t.max_brightness);
    }
    if (t.optimal_min_brightness..=t.optimal_max_brightness).contains(&brightness) {
        score *= t.optimal_bonus;
    }

    if contrast < t.min_contrast {
        score *= 1.0 - (t.min_contrast - contrast) * 0.5;
    } else if contrast > t.max_contrast {
        score *= 1.0 - (contrast - t.max_contrast) * 0.5;
    }

    if dark_ratio > t.max_dark_ratio {
        score *= (1.0 - (dark_ratio - t.max_dark_ratio)).max(0.0);
    }
    if bright_ratio > t.max_bright_ratio {
        score *= (1.0 - (bright_ratio - t.max_bright_ratio)).max(0.0);
    }

    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Detects clipped highlights and blocked shadows.
pub fn detect_exposure_problems(hist: &Histogram, t: &LightingThresholds) -> ExposureReport {
    let total = hist.total();
    if total == 0 {
        return ExposureReport {
            clipped_highlights: 0.0,
            blocked_shadows: 0.0,
            overexposed: false,
            underexposed: false,
            score: 0.0,
        };
    }

    let clipped_highlights = hist.count(255) as f64 / total as f64;
    let blocked_shadows = hist.count(0) as f64 / total as f64;
    let dark_ratio = hist.fraction_in(0, DARK_MAX_BIN);
    let bright_ratio = hist.fraction_in(BRIGHT_MIN_BIN, u8::MAX);

    let overexposed = bright_ratio > t.overexposed_ratio || clipped_highlights > t.clipping_ratio;
    let underexposed = dark_ratio > t.underexposed_ratio || blocked_shadows > t.clipping_ratio;

    let mut score = 1.0;
    score -= (clipped_highlights * CLIPPING_WEIGHT).min(CLIPPING_PENALTY_CAP);
    score -= (blocked_shadows * CLIPPING_WEIGHT).min(CLIPPING_PENALTY_CAP);
    if overexposed {
        score -= bright_ratio.min(EXPOSURE_FLAG_PENALTY_CAP);
    }
    if underexposed {
        score -= dark_ratio.min(EXPOSURE_FLAG_PENALTY_CAP);
    }

    ExposureReport {
        clipped_highlights,
        blocked_shadows,
        overexposed,
        underexposed,
        score: score.clamp(0.0, 1.0),
    }
}

/// One suggestion per violated lighting condition.
pub fn lighting_suggestions(
    brightness: f64,
    contrast: f64,
    dark_ratio: f64,
    bright_ratio: f64,
    t: &LightingThresholds,
) -> Vec<String> {
    let mut out = Vec::new();
    if brightness < t.min_brightness {
        out.push("Increase lighting or move to a brighter area".to_string());
    } else if brightness > t.max_brightness {
        out.push("Reduce lighting or move away from direct light".to_string());
    }
    if contrast < t.min_contrast {
        out.push("Improve contrast with more directional lighting".to_string());
    } else if contrast > t.max_contrast {
        out.push("Soften harsh lighting to reduce contrast".to_string());
    }
    if dark_ratio > t.max_dark_ratio {
        out.push("Add fill light to brighten dark areas".to_string());
    }
    if bright_ratio > t.max_bright_ratio {
        out.push("Avoid glare and reflections on the subject".to_string());
    }
    if out.is_empty() {
        out.push("Lighting conditions are good".to_string());
    }
    out
}

/// Default face zones for localized lighting feedback.
pub fn face_zones() -> Vec<NamedRegion> {
    vec![
        NamedRegion::new("forehead", RelativeRoi::new(0.3, 0.15, 0.4, 0.15)),
        NamedRegion::new("left cheek", RelativeRoi::new(0.25, 0.4, 0.2, 0.2)),
        NamedRegion::new("right cheek", RelativeRoi::new(0.55, 0.4, 0.2, 0.2)),
        NamedRegion::new("chin", RelativeRoi::new(0.4, 0.7, 0.2, 0.12)),
    ]
}

/// Re-applies the lighting analysis to each named zone of a buffer.
///
/// Zones that resolve to zero area score 0 rather than failing.
pub fn analyze_regions(
    buf: &PixelBuffer,
    zones: &[NamedRegion],
    t: &LightingThresholds,
) -> Vec<ZoneLighting> {
    zones
        .iter()
        .map(|zone| {
            let roi = zone.region.resolve(buf.width(), buf.height());
            let region = buf.extract_region(roi);
            let hist = Histogram::from_gray(&region.to_grayscale());
            let metrics = analyze_lighting(&hist, t);
            let score = if hist.total() == 0 { 0.0 } else { metrics.score };
            ZoneLighting {
                name: zone.name.clone(),
                score,
                brightness: metrics.brightness,
                contrast: metrics.contrast,
                suggestions: metrics.suggestions,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist_of(buf: &PixelBuffer) -> Histogram {
        Histogram::from_gray(&buf.to_grayscale())
    }

    fn uniform(v: u8) -> PixelBuffer {
        PixelBuffer::filled(64, 48, [v, v, v, 255])
    }

    #[test]
    fn test_mid_gray_brightness_and_contrast() {
        let metrics = analyze_lighting(&hist_of(&uniform(128)), &LightingThresholds::default());
        assert_eq!(metrics.brightness, 128.0);
        assert_eq!(metrics.contrast, 0.0);
        assert!(metrics.score > 0.95);
        assert!(!metrics.exposure.overexposed);
        assert!(!metrics.exposure.underexposed);
    }

    #[test]
    fn test_dark_frame() {
        let metrics = analyze_lighting(&hist_of(&uniform(30)), &LightingThresholds::default());
        assert!(metrics.score < 0.5);
        assert!(metrics.exposure.underexposed);
        assert!(!metrics.exposure.overexposed);
        assert!(metrics
            .suggestions
            .iter()
            .any(|s| s.to_lowercase().contains("increase lighting")));
    }

    #[test]
    fn test_bright_frame() {
        let metrics = analyze_lighting(&hist_of(&uniform(240)), &LightingThresholds::default());
        assert!(metrics.score < 0.5);
        assert!(metrics.exposure.overexposed);
        assert!(metrics.suggestions[0].starts_with("Reduce lighting"));
    }

    #[test]
    fn test_clipping_penalizes_exposure_score() {
        let mut buf = uniform(128);
        for x in 0..64 {
            for y in 0..10 {
                buf.set_pixel(x, y, [255, 255, 255, 255]);
            }
        }
        let report = detect_exposure_problems(&hist_of(&buf), &LightingThresholds::default());
        assert!(report.clipped_highlights > 0.2);
        assert!(report.overexposed);
        assert!(report.score < 0.6);
        assert_eq!(report.blocked_shadows, 0.0);
    }

    #[test]
    fn test_score_stays_in_unit_interval() {
        let t = LightingThresholds::default();
        for b in [0.0, 10.0, 59.0, 60.0, 128.0, 200.0, 254.0, 255.0] {
            for c in [0.0, 0.5, 1.0] {
                for r in [0.0, 0.5, 1.0] {
                    let s = lighting_score(b, c, r, r, &t);
                    assert!((0.0..=1.0).contains(&s), "score {} out of range", s);
                }
            }
        }
    }

    #[test]
    fn test_affirmative_suggestion_when_nothing_violated() {
        let s = lighting_suggestions(120.0, 0.4, 0.05, 0.02, &LightingThresholds::default());
        assert_eq!(s, vec!["Lighting conditions are good".to_string()]);
    }

    #[test]
    fn test_zone_analysis() {
        let mut buf = uniform(128);
        // Darken the left half so the left cheek zone is underlit.
        for y in 0..48 {
            for x in 0..32 {
                buf.set_pixel(x, y, [20, 20, 20, 255]);
            }
        }
        let zones = analyze_regions(&buf, &face_zones(), &LightingThresholds::default());
        assert_eq!(zones.len(), 4);
        let left = zones.iter().find(|z| z.name == "left cheek").unwrap();
        let right = zones.iter().find(|z| z.name == "right cheek").unwrap();
        assert!(left.score < right.score);
        assert_eq!(left.brightness, 20.0);
    }

    #[test]
    fn test_empty_zone_scores_zero() {
        let buf = uniform(128);
        let zones = [NamedRegion::new("nowhere", RelativeRoi::new(1.0, 1.0, 0.5, 0.5))];
        let result = analyze_regions(&buf, &zones, &LightingThresholds::default());
        assert_eq!(result[0].score, 0.0);
    }
}
