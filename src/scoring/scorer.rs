//! Aggregation of metric vectors into a verdict.

use std::collections::HashSet;

use super::issue::{Defect, QualityIssue, Severity};
use super::result::QualityCategory;
use crate::analysis::{
    Adequacy, BlurMetrics, BlurThresholds, CaptureMode, CategoryThresholds, CompositionMetrics, LightingMetrics,
    QualityMetrics, QualityThresholds, ResolutionMetrics, ScoreWeights,
};

/// Confidence attached to histogram-derived lighting issues.
const LIGHTING_CONFIDENCE: f64 = 0.9;

/// Weighted overall score in `[0, 100]`.
///
/// Weights are normalized by their sum; a zero or non-finite sum falls back
/// to equal weights.
pub fn overall_score(metrics: &QualityMetrics, weights: &ScoreWeights) -> f64 {
    let total = weights.total();
    let w = if total.is_finite() && total > 0.0 {
        [
            weights.blur / total,
            weights.lighting / total,
            weights.composition / total,
            weights.resolution / total,
        ]
    } else {
        [0.25; 4]
    };

    let sum: f64 = metrics
        .scores()
        .iter()
        .zip(w.iter())
        .map(|(s, w)| s.clamp(0.0, 1.0) * w)
        .sum();
    (sum * 100.0).clamp(0.0, 100.0)
}

/// Maps an overall score to its band.
pub fn category(score: f64, bounds: &CategoryThresholds) -> QualityCategory {
    if score >= bounds.excellent {
        QualityCategory::Excellent
    } else if score >= bounds.good {
        QualityCategory::Good
    } else if score >= bounds.fair {
        QualityCategory::Fair
    } else {
        QualityCategory::Poor
    }
}

/// At most one issue per metric, most severe first.
pub fn issues(
    metrics: &QualityMetrics,
    thresholds: &QualityThresholds,
    mode: CaptureMode,
) -> Vec<QualityIssue> {
    let mut out: Vec<QualityIssue> = [
        blur_issue(&metrics.blur, thresholds),
        lighting_issue(&metrics.lighting, thresholds),
        composition_issue(&metrics.composition, thresholds),
        resolution_issue(&metrics.resolution, mode),
    ]
    .into_iter()
    .flatten()
    .collect();

    // Stable: equal severities keep metric order.
    out.sort_by(|a, b| b.severity.cmp(&a.severity));
    out
}

/// One suggestion per issue type, in issue order.
pub fn suggestions(issues: &[QualityIssue], mode: CaptureMode) -> Vec<String> {
    if issues.is_empty() {
        return vec!["Image quality is good, no changes needed".to_string()];
    }
    let mut seen = HashSet::new();
    issues
        .iter()
        .filter(|issue| seen.insert(issue.issue_type))
        .map(|issue| suggestion(issue.defect, issue.severity, mode).to_string())
        .collect()
}

/// Relative distance below a floor, 0 when at or above it.
fn shortfall(value: f64, floor: f64) -> f64 {
    if floor <= 0.0 || value >= floor {
        0.0
    } else {
        ((floor - value) / floor).clamp(0.0, 1.0)
    }
}

/// Band a sharpness score falls in under the configured blur cutoffs.
pub fn blur_grade(score: f64, t: &BlurThresholds) -> QualityCategory {
    if score >= t.excellent {
        QualityCategory::Excellent
    } else if score >= t.good {
        QualityCategory::Good
    } else if score >= t.fair {
        QualityCategory::Fair
    } else {
        QualityCategory::Poor
    }
}

/// Fair band is low severity; below `fair` it is medium, and high once the
/// score is under half of `fair`.
fn blur_issue(blur: &BlurMetrics, t: &QualityThresholds) -> Option<QualityIssue> {
    let severity = match blur_grade(blur.score, &t.blur) {
        QualityCategory::Excellent | QualityCategory::Good => return None,
        QualityCategory::Fair => Severity::Low,
        QualityCategory::Poor if blur.score >= t.blur.fair / 2.0 => Severity::Medium,
        QualityCategory::Poor => Severity::High,
    };
    let message = format!(
        "{} (sharpness {:.2}, expected at least {:.2})",
        Defect::Blurry.description(),
        blur.score,
        t.blur.good
    );
    Some(QualityIssue::new(Defect::Blurry, severity, message, blur.confidence))
}

fn lighting_issue(lighting: &LightingMetrics, t: &QualityThresholds) -> Option<QualityIssue> {
    let l = &t.lighting;
    let low_score = lighting.score < l.min_score;
    let too_dark = lighting.brightness < l.min_brightness;
    let too_bright = lighting.brightness > l.max_brightness;
    let exposure = &lighting.exposure;
    // Contrast alone only counts through the score.
    if !low_score && !too_dark && !too_bright && !exposure.overexposed && !exposure.underexposed {
        return None;
    }

    let defect = if too_dark {
        Defect::TooDark
    } else if too_bright {
        Defect::TooBright
    } else if exposure.underexposed {
        Defect::Underexposed
    } else if exposure.overexposed {
        Defect::Overexposed
    } else if lighting.contrast < l.min_contrast {
        Defect::LowContrast
    } else if lighting.contrast > l.max_contrast {
        Defect::HarshContrast
    } else {
        Defect::UnevenLighting
    };

    let severity = if low_score {
        Severity::from_shortfall(shortfall(lighting.score, l.min_score))
    } else if too_dark {
        Severity::from_shortfall(shortfall(lighting.brightness, l.min_brightness))
    } else if too_bright {
        Severity::from_shortfall(shortfall(255.0 - lighting.brightness, 255.0 - l.max_brightness))
    } else {
        Severity::Low
    };
    let message = format!(
        "{} (brightness {:.0}, contrast {:.2})",
        defect.description(),
        lighting.brightness,
        lighting.contrast
    );
    Some(QualityIssue::new(defect, severity, message, LIGHTING_CONFIDENCE))
}

fn composition_issue(c: &CompositionMetrics, t: &QualityThresholds) -> Option<QualityIssue> {
    if !c.subject_detected {
        return Some(QualityIssue::new(
            Defect::SubjectNotFound,
            Severity::Low,
            Defect::SubjectNotFound.description().to_string(),
            c.confidence,
        ));
    }

    let ct = &t.composition;
    let coverage_gap = shortfall(c.coverage, ct.min_coverage);
    let centering_gap = shortfall(c.centering, ct.min_centering);
    let score_gap = shortfall(c.score, ct.min_score);
    if coverage_gap == 0.0 && centering_gap == 0.0 && score_gap == 0.0 {
        return None;
    }

    let defect = if coverage_gap > 0.0 || centering_gap > 0.0 {
        if coverage_gap >= centering_gap {
            Defect::SubjectTooSmall
        } else {
            Defect::OffCenter
        }
    } else if c.coverage <= c.centering {
        Defect::SubjectTooSmall
    } else {
        Defect::OffCenter
    };

    let severity = Severity::from_shortfall(coverage_gap.max(centering_gap).max(score_gap));
    let message = format!(
        "{} (coverage {:.0}%, centering {:.0}%)",
        defect.description(),
        c.coverage * 100.0,
        c.centering * 100.0
    );
    Some(QualityIssue::new(defect, severity, message, c.confidence))
}

fn resolution_issue(r: &ResolutionMetrics, mode: CaptureMode) -> Option<QualityIssue> {
    if r.adequacy != Adequacy::Insufficient {
        return None;
    }
    let severity = Severity::from_shortfall(shortfall(r.pixel_count as f64, r.minimum_pixels as f64));
    let message = format!(
        "{} for {} capture ({}x{}, at least {} pixels needed)",
        Defect::LowResolution.description(),
        mode,
        r.width,
        r.height,
        r.minimum_pixels
    );
    Some(QualityIssue::new(Defect::LowResolution, severity, message, 1.0))
}

fn suggestion(defect: Defect, severity: Severity, mode: CaptureMode) -> &'static str {
    match (defect, severity) {
        (Defect::Blurry, Severity::High) => {
            "Retake the photo: hold the camera steady and tap to focus for a sharper image"
        }
        (Defect::Blurry, _) => "Hold the camera steady and tap to focus for a sharper image",
        (Defect::TooDark, _) => "Increase lighting or move to a brighter area",
        (Defect::TooBright, _) => "Reduce lighting or move out of direct light",
        (Defect::Underexposed, _) => "Add light to lift the dark shadows",
        (Defect::Overexposed, _) => "Avoid glare and direct light to recover bright highlights",
        (Defect::LowContrast, _) => "Use more directional lighting to improve contrast",
        (Defect::HarshContrast, _) => "Use softer, diffuse lighting to reduce harsh shadows",
        (Defect::UnevenLighting, _) => "Light the subject more evenly",
        (Defect::SubjectNotFound, _) => match mode {
            CaptureMode::Tongue => "Extend your tongue fully and keep it inside the guide",
            CaptureMode::Face => "Position your face within the outline",
            CaptureMode::Body => "Make sure the body area is clearly visible in the frame",
            CaptureMode::General => "Make sure the subject is clearly visible in the frame",
        },
        (Defect::SubjectTooSmall, _) => match mode {
            CaptureMode::Tongue => "Move closer so your tongue fills the guide",
            CaptureMode::Face => "Move closer so your face fills the outline",
            CaptureMode::Body => "Move closer so the body area fills the frame",
            CaptureMode::General => "Move closer so the subject fills more of the frame",
        },
        (Defect::OffCenter, _) => match mode {
            CaptureMode::Tongue => "Center your tongue in the guide",
            CaptureMode::Face => "Center your face in the outline",
            CaptureMode::Body => "Center the body area in the frame",
            CaptureMode::General => "Center the subject in the frame",
        },
        (Defect::LowResolution, Severity::High) => {
            "Switch to the rear camera or a higher resolution setting"
        }
        (Defect::LowResolution, _) => "Use a higher camera resolution or move closer",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::resolution::analyze_resolution;
    use crate::analysis::{BlurMethod, ExposureReport, ResolutionLimits};
    use crate::scoring::IssueType;
    use crate::pixels::Roi;

    fn metrics(blur: f64, lighting: f64, composition: f64, resolution: f64) -> QualityMetrics {
        let mut m = QualityMetrics {
            blur: BlurMetrics {
                score: blur,
                variance: blur * 1000.0,
                confidence: 0.8,
                method: BlurMethod::Laplacian,
                regional: false,
                methods: None,
            },
            lighting: LightingMetrics {
                score: lighting,
                brightness: 128.0,
                contrast: 0.4,
                dark_ratio: 0.0,
                bright_ratio: 0.0,
                exposure: ExposureReport {
                    clipped_highlights: 0.0,
                    blocked_shadows: 0.0,
                    overexposed: false,
                    underexposed: false,
                    score: 1.0,
                },
                suggestions: Vec::new(),
                zones: Vec::new(),
            },
            composition: CompositionMetrics {
                score: composition,
                coverage: composition,
                centering: composition,
                confidence: 0.9,
                subject_detected: true,
                detected_region: Some(Roi::new(0, 0, 10, 10)),
                expected_region: Roi::new(0, 0, 10, 10),
            },
            resolution: analyze_resolution(1280, 720, &ResolutionLimits::new(320 * 240, 1280 * 720)),
        };
        m.resolution.score = resolution;
        m
    }

    #[test]
    fn test_overall_score_weighting() {
        let m = metrics(1.0, 0.0, 0.0, 0.0);
        let score = overall_score(&m, &ScoreWeights::default());
        assert!((score - 35.0).abs() < 1e-9);

        let all = metrics(1.0, 1.0, 1.0, 1.0);
        assert!((overall_score(&all, &ScoreWeights::default()) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_weights_fall_back_to_equal() {
        let zero = ScoreWeights {
            blur: 0.0,
            lighting: 0.0,
            composition: 0.0,
            resolution: 0.0,
        };
        let m = metrics(1.0, 0.0, 1.0, 0.0);
        assert!((overall_score(&m, &zero) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_category_bands() {
        let b = CategoryThresholds::default();
        assert_eq!(category(85.0, &b), QualityCategory::Excellent);
        assert_eq!(category(84.9, &b), QualityCategory::Good);
        assert_eq!(category(70.0, &b), QualityCategory::Good);
        assert_eq!(category(50.0, &b), QualityCategory::Fair);
        assert_eq!(category(49.9, &b), QualityCategory::Poor);

        let custom = CategoryThresholds {
            excellent: 95.0,
            good: 90.0,
            fair: 80.0,
        };
        assert_eq!(category(85.0, &custom), QualityCategory::Fair);
    }

    #[test]
    fn test_clean_metrics_have_no_issues() {
        let m = metrics(0.9, 0.9, 0.9, 1.0);
        let found = issues(&m, &QualityThresholds::default(), CaptureMode::General);
        assert!(found.is_empty());
        assert_eq!(
            suggestions(&found, CaptureMode::General),
            vec!["Image quality is good, no changes needed".to_string()]
        );
    }

    #[test]
    fn test_issues_sorted_by_severity() {
        let mut m = metrics(0.35, 0.9, 0.9, 1.0);
        m.lighting.score = 0.1;
        m.lighting.brightness = 20.0;
        let found = issues(&m, &QualityThresholds::default(), CaptureMode::General);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].defect, Defect::TooDark);
        assert_eq!(found[0].severity, Severity::High);
        assert_eq!(found[1].defect, Defect::Blurry);
        assert_eq!(found[1].severity, Severity::Low);
    }

    #[test]
    fn test_exposure_flag_alone_raises_low_issue() {
        let mut m = metrics(0.9, 0.9, 0.9, 1.0);
        m.lighting.exposure.overexposed = true;
        let found = issues(&m, &QualityThresholds::default(), CaptureMode::General);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].defect, Defect::Overexposed);
        assert_eq!(found[0].severity, Severity::Low);
    }

    #[test]
    fn test_subject_not_found() {
        let mut m = metrics(0.9, 0.9, 0.5, 1.0);
        m.composition.subject_detected = false;
        m.composition.confidence = 0.2;
        let found = issues(&m, &QualityThresholds::default(), CaptureMode::Tongue);
        assert_eq!(found[0].defect, Defect::SubjectNotFound);
        assert_eq!(found[0].confidence, 0.2);
        let s = suggestions(&found, CaptureMode::Tongue);
        assert!(s[0].contains("tongue"));
    }

    #[test]
    fn test_off_centre_composition() {
        let mut m = metrics(0.9, 0.9, 0.9, 1.0);
        m.composition.coverage = 0.8;
        m.composition.centering = 0.3;
        m.composition.score = 0.55;
        let found = issues(&m, &QualityThresholds::default(), CaptureMode::Face);
        assert_eq!(found[0].defect, Defect::OffCenter);
        assert_eq!(found[0].severity, Severity::High);
        assert_eq!(
            suggestions(&found, CaptureMode::Face),
            vec!["Center your face in the outline".to_string()]
        );
    }

    #[test]
    fn test_insufficient_resolution() {
        let mut m = metrics(0.9, 0.9, 0.9, 1.0);
        m.resolution = analyze_resolution(100, 100, &ResolutionLimits::new(640 * 480, 1920 * 1080));
        let found = issues(&m, &QualityThresholds::default(), CaptureMode::Face);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].issue_type, IssueType::Resolution);
        assert_eq!(found[0].severity, Severity::High);
    }

    #[test]
    fn test_duplicate_issue_types_collapse() {
        let a = QualityIssue::new(Defect::TooDark, Severity::High, String::new(), 1.0);
        let b = QualityIssue::new(Defect::LowContrast, Severity::Low, String::new(), 1.0);
        let s = suggestions(&[a, b], CaptureMode::General);
        assert_eq!(s, vec!["Increase lighting or move to a brighter area".to_string()]);
    }

    #[test]
    fn test_blur_severity_follows_fair_cutoff() {
        let m = metrics(0.15, 0.9, 0.9, 1.0);
        let severity_with_fair = |fair: f64| {
            let mut t = QualityThresholds::default();
            t.blur.fair = fair;
            issues(&m, &t, CaptureMode::General)[0].severity
        };
        assert_eq!(severity_with_fair(0.2), Severity::Medium);
        assert_eq!(severity_with_fair(0.39), Severity::High);
        assert_eq!(severity_with_fair(0.0), Severity::Low);
    }

    #[test]
    fn test_blur_grade_uses_every_cutoff() {
        let t = BlurThresholds::default();
        assert_eq!(blur_grade(0.7, &t), QualityCategory::Excellent);
        assert_eq!(blur_grade(0.5, &t), QualityCategory::Good);
        assert_eq!(blur_grade(0.2, &t), QualityCategory::Fair);
        assert_eq!(blur_grade(0.19, &t), QualityCategory::Poor);

        let strict = BlurThresholds {
            excellent: 0.9,
            ..t
        };
        assert_eq!(blur_grade(0.8, &strict), QualityCategory::Good);
    }

    #[test]
    fn test_dim_frame_with_passing_score_is_too_dark() {
        let mut m = metrics(0.9, 0.825, 0.9, 1.0);
        m.lighting.brightness = 55.0;
        let found = issues(&m, &QualityThresholds::default(), CaptureMode::General);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].defect, Defect::TooDark);
        assert_eq!(found[0].severity, Severity::Low);
        assert_eq!(
            suggestions(&found, CaptureMode::General),
            vec!["Increase lighting or move to a brighter area".to_string()]
        );
    }

    #[test]
    fn test_bright_frame_with_passing_score_is_too_bright() {
        let mut m = metrics(0.9, 0.7, 0.9, 1.0);
        m.lighting.brightness = 230.0;
        let found = issues(&m, &QualityThresholds::default(), CaptureMode::General);
        assert_eq!(found[0].defect, Defect::TooBright);
        assert_eq!(found[0].severity, Severity::High);
    }

    #[test]
    fn test_low_contrast_alone_is_not_an_issue() {
        let mut m = metrics(0.9, 0.9, 0.9, 1.0);
        m.lighting.contrast = 0.0;
        assert!(issues(&m, &QualityThresholds::default(), CaptureMode::General).is_empty());
    }
}
