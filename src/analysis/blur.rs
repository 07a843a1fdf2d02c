//! Blur estimation.
//!
//! Three independent sharpness measures run over the luminance plane:
//!
//! - **Laplacian**: mean squared response of the 8-neighbour Laplacian.
//!   Sharp captures typically exceed 1000, blurry ones fall under 100.
//! - **Sobel**: mean gradient magnitude of the Sobel operator.
//! - **Gradient**: mean magnitude of forward first differences.
//!
//! Each is normalized by an empirical constant and clamped to `[0, 1]`.
//! The default `Auto` method blends them `0.5/0.3/0.2` but reports the
//! Laplacian figure and method name, so downstream messages stay in Laplacian
//! terms.
//!
//! Confidence always needs all three scores, so unless
//! [`BlurOptions::compute_confidence`] is turned off a single-method request
//! costs as much as `Auto`.

use serde::{Deserialize, Serialize};

use crate::pixels::GrayscaleBuffer;

/// Laplacian mean-square response that maps to a score of 1.0.
pub const LAPLACIAN_NORMALIZER: f64 = 1000.0;
/// Sobel mean magnitude that maps to a score of 1.0.
pub const SOBEL_NORMALIZER: f64 = 100.0;
/// Forward-difference mean magnitude that maps to a score of 1.0.
pub const GRADIENT_NORMALIZER: f64 = 50.0;

const AUTO_WEIGHTS: [f64; 3] = [0.5, 0.3, 0.2];
const REGION_COUNT: usize = 5;

/// Sharpness measure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlurMethod {
    /// Variance of the 3x3 Laplacian response.
    Laplacian,
    /// Mean Sobel gradient magnitude over interior pixels.
    Sobel,
    /// Mean forward-difference gradient magnitude.
    Gradient,
    /// Weighted blend of all three methods.
    #[default]
    Auto,
}

/// Per-call blur settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlurOptions {
    /// Method whose score is reported.
    pub method: BlurMethod,
    /// Sample five fixed sub-regions instead of the whole frame for the
    /// Laplacian pass.
    pub regional_sampling: bool,
    /// Run every method to estimate confidence.
    pub compute_confidence: bool,
}

impl Default for BlurOptions {
    fn default() -> Self {
        Self {
            method: BlurMethod::Auto,
            regional_sampling: false,
            compute_confidence: true,
        }
    }
}

/// Normalized score and raw figure of one method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MethodScore {
    /// Score in `[0, 1]`.
    pub score: f64,
    /// Raw variance or mean magnitude.
    pub raw: f64,
    /// Number of samples that contributed.
    pub samples: u64,
}

impl MethodScore {
    fn from_sum(sum: f64, samples: u64, normalizer: f64) -> Self {
        if samples == 0 {
            return Self::default();
        }
        let raw = sum / samples as f64;
        Self {
            score: (raw / normalizer).min(1.0),
            raw,
            samples,
        }
    }
}

/// Scores of every method, when they were all computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MethodScores {
    /// Laplacian variance.
    pub laplacian: MethodScore,
    /// Mean Sobel magnitude.
    pub sobel: MethodScore,
    /// Mean gradient magnitude.
    pub gradient: MethodScore,
}

/// Sharpness metric vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlurMetrics {
    /// Sharpness score in `[0, 1]`; higher is sharper.
    pub score: f64,
    /// Raw figure of the reported method (Laplacian variance for `Auto`).
    pub variance: f64,
    /// Agreement-based confidence in `[0, 1]`.
    pub confidence: f64,
    /// Method reported to callers.
    pub method: BlurMethod,
    /// Whether regional sampling was used.
    pub regional: bool,
    /// Every method's score, when computed.
    pub methods: Option<MethodScores>,
}

/// Sharpness estimation seam.
pub trait BlurEstimator: Send + Sync {
    /// Measures sharpness of `gray`.
    fn estimate(&self, gray: &GrayscaleBuffer, options: &BlurOptions) -> BlurMetrics;
}

/// Default estimator: the three methods plus the `Auto` consensus blend.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsensusBlurEstimator;

impl BlurEstimator for ConsensusBlurEstimator {
    fn estimate(&self, gray: &GrayscaleBuffer, options: &BlurOptions) -> BlurMetrics {
        estimate_blur(gray, options)
    }
}

/// Runs the configured blur estimation.
pub fn estimate_blur(gray: &GrayscaleBuffer, options: &BlurOptions) -> BlurMetrics {
    let laplacian_pass = |g: &GrayscaleBuffer| {
        if options.regional_sampling {
            laplacian_regional(g)
        } else {
            laplacian(g)
        }
    };

    let run_all = options.compute_confidence || options.method == BlurMethod::Auto;

    let metrics = if run_all {
        let scores = MethodScores {
            laplacian: laplacian_pass(gray),
            sobel: sobel(gray),
            gradient: gradient(gray),
        };
        let (score, variance, method) = match options.method {
            BlurMethod::Auto => (
                AUTO_WEIGHTS[0] * scores.laplacian.score
                    + AUTO_WEIGHTS[1] * scores.sobel.score
                    + AUTO_WEIGHTS[2] * scores.gradient.score,
                scores.laplacian.raw,
                BlurMethod::Laplacian,
            ),
            BlurMethod::Laplacian => (
                scores.laplacian.score,
                scores.laplacian.raw,
                BlurMethod::Laplacian,
            ),
            BlurMethod::Sobel => (scores.sobel.score, scores.sobel.raw, BlurMethod::Sobel),
            BlurMethod::Gradient => (
                scores.gradient.score,
                scores.gradient.raw,
                BlurMethod::Gradient,
            ),
        };
        let confidence = if options.compute_confidence {
            consensus_confidence(
                [scores.laplacian.score, scores.sobel.score, scores.gradient.score],
                score,
            )
        } else {
            0.5
        };
        BlurMetrics {
            score: score.clamp(0.0, 1.0),
            variance,
            confidence,
            method,
            regional: options.regional_sampling,
            methods: Some(scores),
        }
    } else {
        let single = match options.method {
            BlurMethod::Sobel => sobel(gray),
            BlurMethod::Gradient => gradient(gray),
            BlurMethod::Laplacian | BlurMethod::Auto => laplacian_pass(gray),
        };
        BlurMetrics {
            score: single.score,
            variance: single.raw,
            confidence: 0.5,
            method: options.method,
            regional: options.regional_sampling,
            methods: None,
        }
    };

    tracing::debug!(
        score = metrics.score,
        variance = metrics.variance,
        confidence = metrics.confidence,
        method = ?metrics.method,
        regional = metrics.regional,
        "Blur estimated"
    );
    metrics
}

/// Agreement between the three method scores, weighted with how decisive
/// the primary score is.
pub fn consensus_confidence(scores: [f64; 3], primary: f64) -> f64 {
    let mean = scores.iter().sum::<f64>() / 3.0;
    let variance = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / 3.0;
    let stddev = variance.sqrt();

    let agreement = 1.0 - (stddev / 0.5).min(1.0);
    let decisiveness = (primary - 0.5).abs() * 2.0;
    (0.7 * agreement + 0.3 * decisiveness).clamp(0.0, 1.0)
}

#[inline]
fn laplacian_at(gray: &GrayscaleBuffer, x: usize, y: usize) -> f64 {
    let mut neighbours = 0.0;
    for dy in 0..3 {
        for dx in 0..3 {
            if dx == 1 && dy == 1 {
                continue;
            }
            neighbours += gray.at(x + dx - 1, y + dy - 1);
        }
    }
    8.0 * gray.at(x, y) - neighbours
}

/// Sums squared Laplacian responses over the interior of `[x0, x1) x [y0, y1)`.
fn laplacian_sum(gray: &GrayscaleBuffer, x0: usize, y0: usize, x1: usize, y1: usize) -> (f64, u64) {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    if w < 3 || h < 3 {
        return (0.0, 0);
    }
    let (x0, y0) = (x0.max(1), y0.max(1));
    let (x1, y1) = (x1.min(w - 1), y1.min(h - 1));

    let mut sum = 0.0;
    let mut count = 0u64;
    for y in y0..y1 {
        for x in x0..x1 {
            let v = laplacian_at(gray, x, y);
            sum += v * v;
            count += 1;
        }
    }
    (sum, count)
}

/// Laplacian mean-square over the whole frame.
pub fn laplacian(gray: &GrayscaleBuffer) -> MethodScore {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    let (sum, count) = laplacian_sum(gray, 0, 0, w, h);
    MethodScore::from_sum(sum, count, LAPLACIAN_NORMALIZER)
}

/// Laplacian mean-square over the centre and four corner regions, each a
/// square with side one quarter of the shorter dimension.
pub fn laplacian_regional(gray: &GrayscaleBuffer) -> MethodScore {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    let side = w.min(h) / 4;
    if side == 0 {
        return MethodScore::default();
    }

    let origins: [(usize, usize); REGION_COUNT] = [
        ((w - side) / 2, (h - side) / 2),
        (0, 0),
        (w - side, 0),
        (0, h - side),
        (w - side, h - side),
    ];

    let (sum, count) = origins
        .iter()
        .map(|&(x, y)| laplacian_sum(gray, x, y, x + side, y + side))
        .fold((0.0, 0u64), |(s, c), (rs, rc)| (s + rs, c + rc));

    MethodScore::from_sum(sum, count, LAPLACIAN_NORMALIZER)
}

/// Mean Sobel gradient magnitude.
pub fn sobel(gray: &GrayscaleBuffer) -> MethodScore {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    if w < 3 || h < 3 {
        return MethodScore::default();
    }

    let mut sum = 0.0;
    let mut count = 0u64;
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let p = |dx: usize, dy: usize| gray.at(x + dx - 1, y + dy - 1);
            let gx = (p(2, 0) + 2.0 * p(2, 1) + p(2, 2)) - (p(0, 0) + 2.0 * p(0, 1) + p(0, 2));
            let gy = (p(0, 2) + 2.0 * p(1, 2) + p(2, 2)) - (p(0, 0) + 2.0 * p(1, 0) + p(2, 0));
            sum += (gx * gx + gy * gy).sqrt();
            count += 1;
        }
    }
    MethodScore::from_sum(sum, count, SOBEL_NORMALIZER)
}

/// Mean forward-difference magnitude between adjacent pixels.
pub fn gradient(gray: &GrayscaleBuffer) -> MethodScore {
    let (w, h) = (gray.width() as usize, gray.height() as usize);
    if w < 2 || h < 2 {
        return MethodScore::default();
    }

    let mut sum = 0.0;
    let mut count = 0u64;
    for y in 0..h - 1 {
        for x in 0..w - 1 {
            let c = gray.at(x, y);
            let dx = gray.at(x + 1, y) - c;
            let dy = gray.at(x, y + 1) - c;
            sum += (dx * dx + dy * dy).sqrt();
            count += 1;
        }
    }
    MethodScore::from_sum(sum, count, GRADIENT_NORMALIZER)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixels::PixelBuffer;

    fn gray_from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> u8) -> GrayscaleBuffer {
        let mut buf = PixelBuffer::filled(width, height, [0, 0, 0, 255]);
        for y in 0..height {
            for x in 0..width {
                let v = f(x, y);
                buf.set_pixel(x, y, [v, v, v, 255]);
            }
        }
        buf.to_grayscale()
    }

    fn stripes(width: u32, height: u32) -> GrayscaleBuffer {
        gray_from_fn(width, height, |x, _| if (x / 2) % 2 == 0 { 0 } else { 255 })
    }

    #[test]
    fn test_flat_image_scores_zero() {
        let gray = gray_from_fn(64, 48, |_, _| 128);
        let metrics = estimate_blur(&gray, &BlurOptions::default());
        assert_eq!(metrics.variance, 0.0);
        assert_eq!(metrics.score, 0.0);
        assert_eq!(metrics.method, BlurMethod::Laplacian);
    }

    #[test]
    fn test_tiny_images_do_not_fault() {
        for (w, h) in [(1, 1), (2, 2), (2, 10), (10, 2)] {
            let gray = gray_from_fn(w, h, |x, y| ((x + y) * 100) as u8);
            let metrics = estimate_blur(&gray, &BlurOptions::default());
            assert!(metrics.score.is_finite());
            assert!(laplacian(&gray).score == 0.0);
            assert!(sobel(&gray).score == 0.0);
        }
    }

    #[test]
    fn test_sharp_stripes_saturate_every_method() {
        let gray = stripes(32, 32);
        assert_eq!(laplacian(&gray).score, 1.0);
        assert_eq!(sobel(&gray).score, 1.0);
        assert_eq!(gradient(&gray).score, 1.0);

        let metrics = estimate_blur(&gray, &BlurOptions::default());
        assert_eq!(metrics.score, 1.0);
        assert!(metrics.confidence >= 0.7);
    }

    #[test]
    fn test_smooth_ramp_is_blurrier_than_stripes() {
        let ramp = gray_from_fn(64, 64, |x, _| (x * 4) as u8);
        let sharp = stripes(64, 64);
        let opts = BlurOptions::default();
        assert!(estimate_blur(&ramp, &opts).score < estimate_blur(&sharp, &opts).score);
        assert!(laplacian(&ramp).score < 0.01);
    }

    #[test]
    fn test_ramp_pins_gradient_and_sobel_normalizers() {
        // Step of 10 per column.
        let ramp = gray_from_fn(8, 8, |x, _| (x * 10) as u8);

        let g = gradient(&ramp);
        assert_eq!(g.samples, 49);
        assert!((g.raw - 10.0).abs() < 1e-9);
        assert!((g.score - 10.0 / GRADIENT_NORMALIZER).abs() < 1e-9);
        assert!((g.score - 0.2).abs() < 1e-9);

        // Each Sobel column pair spans 20, weighted 1 + 2 + 1.
        let s = sobel(&ramp);
        assert_eq!(s.samples, 36);
        assert!((s.raw - 80.0).abs() < 1e-9);
        assert!((s.score - 80.0 / SOBEL_NORMALIZER).abs() < 1e-9);
        assert!((s.score - 0.8).abs() < 1e-9);

        // Same figures rotated.
        let column = gray_from_fn(8, 8, |_, y| (y * 10) as u8);
        assert!((gradient(&column).raw - 10.0).abs() < 1e-9);
        assert!((sobel(&column).raw - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_auto_reports_laplacian_variance() {
        let gray = gray_from_fn(32, 32, |x, y| ((x * 7 + y * 13) % 256) as u8);
        let metrics = estimate_blur(&gray, &BlurOptions::default());
        let lap = laplacian(&gray);
        assert_eq!(metrics.variance, lap.raw);
        assert_eq!(metrics.method, BlurMethod::Laplacian);

        let methods = metrics.methods.unwrap();
        let blended = 0.5 * methods.laplacian.score + 0.3 * methods.sobel.score + 0.2 * methods.gradient.score;
        assert!((metrics.score - blended).abs() < 1e-12);
    }

    #[test]
    fn test_single_method_without_confidence_skips_others() {
        let gray = stripes(16, 16);
        let opts = BlurOptions {
            method: BlurMethod::Sobel,
            regional_sampling: false,
            compute_confidence: false,
        };
        let metrics = estimate_blur(&gray, &opts);
        assert!(metrics.methods.is_none());
        assert_eq!(metrics.method, BlurMethod::Sobel);
        assert_eq!(metrics.confidence, 0.5);
    }

    #[test]
    fn test_regional_sampling_ignores_unsampled_detail() {
        // Detail only in a band that none of the five regions touches.
        let gray = gray_from_fn(80, 80, |x, y| {
            if (5..15).contains(&y) && (23..29).contains(&x) {
                if (x + y) % 2 == 0 {
                    255
                } else {
                    0
                }
            } else {
                100
            }
        });
        assert!(laplacian(&gray).score > 0.0);
        assert_eq!(laplacian_regional(&gray).score, 0.0);
    }

    #[test]
    fn test_regional_sampling_sees_centre() {
        let gray = gray_from_fn(80, 80, |x, y| {
            if (30..50).contains(&x) && (30..50).contains(&y) && (x / 2) % 2 == 0 {
                255
            } else {
                0
            }
        });
        assert!(laplacian_regional(&gray).score > 0.0);
    }

    #[test]
    fn test_confidence_formula() {
        assert_eq!(consensus_confidence([0.0, 0.0, 0.0], 0.0), 1.0);
        assert_eq!(consensus_confidence([0.5, 0.5, 0.5], 0.5), 0.7);
        let disagreeing = consensus_confidence([0.0, 1.0, 0.0], 0.5);
        assert!(disagreeing < 0.3);
    }
}
