//! Subject framing estimation.
//!
//! A subject region is either supplied by the caller or found by gradient
//! salience over a coarse grid. It is compared against the mode's expected
//! region for coverage and centering.

use serde::{Deserialize, Serialize};

use crate::pixels::{GrayscaleBuffer, RelativeRoi, Roi};

/// Cells per side of the salience grid.
pub const SALIENCE_GRID: u32 = 16;

/// Minimum mean gradient energy for a cell to count as salient.
pub const SALIENCE_FLOOR: f64 = 4.0;

/// Score reported when no subject can be located.
pub const UNDETECTED_SCORE: f64 = 0.5;
/// Confidence reported when no subject can be located.
pub const UNDETECTED_CONFIDENCE: f64 = 0.2;

/// Composition metric vector. Regions are in analysed-buffer pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositionMetrics {
    /// Composition score in `[0, 1]`.
    pub score: f64,
    /// Fraction of the expected region covered by the subject.
    pub coverage: f64,
    /// 1.0 when the subject centroid sits on the expected centre.
    pub centering: f64,
    /// Confidence in `[0, 1]` of the subject location.
    pub confidence: f64,
    /// Whether a salient subject was located.
    pub subject_detected: bool,
    /// Bounding box of the located subject.
    pub detected_region: Option<Roi>,
    /// Where the mode expects the subject to sit.
    pub expected_region: Roi,
}

/// Composition estimation seam.
pub trait CompositionEstimator: Send + Sync {
    /// `hint`, when given, replaces subject detection.
    fn estimate(
        &self,
        gray: &GrayscaleBuffer,
        expected: RelativeRoi,
        hint: Option<Roi>,
    ) -> CompositionMetrics;
}

/// Default estimator: grid salience or caller hint.
#[derive(Debug, Clone, Copy, Default)]
pub struct SalienceCompositionEstimator;

impl CompositionEstimator for SalienceCompositionEstimator {
    fn estimate(
        &self,
        gray: &GrayscaleBuffer,
        expected: RelativeRoi,
        hint: Option<Roi>,
    ) -> CompositionMetrics {
        analyze_composition(gray, expected, hint)
    }
}

/// Locates the subject and scores it against `expected`.
pub fn analyze_composition(
    gray: &GrayscaleBuffer,
    expected: RelativeRoi,
    hint: Option<Roi>,
) -> CompositionMetrics {
    let (w, h) = (gray.width(), gray.height());
    let expected_region = expected.resolve(w, h);

    let detection = match hint {
        Some(roi) => {
            let roi = roi.clamp_to(w, h);
            (!roi.is_empty()).then_some(Detection {
                region: roi,
                confidence: 1.0,
            })
        }
        None => detect_subject(gray),
    };

    let Some(detection) = detection else {
        tracing::warn!(
            width = w,
            height = h,
            "No subject region detected, composition degraded"
        );
        return CompositionMetrics {
            score: UNDETECTED_SCORE,
            coverage: 0.0,
            centering: 0.0,
            confidence: UNDETECTED_CONFIDENCE,
            subject_detected: false,
            detected_region: None,
            expected_region,
        };
    };

    let coverage = coverage(&detection.region, &expected_region);
    let centering = centering(&detection.region, &expected_region, w, h);
    let score = (0.5 * coverage + 0.5 * centering).clamp(0.0, 1.0);

    tracing::debug!(
        score,
        coverage,
        centering,
        confidence = detection.confidence,
        "Composition estimated"
    );

    CompositionMetrics {
        score,
        coverage,
        centering,
        confidence: detection.confidence,
        subject_detected: true,
        detected_region: Some(detection.region),
        expected_region,
    }
}

/// |detected ∩ expected| / |expected|.
pub fn coverage(detected: &Roi, expected: &Roi) -> f64 {
    let area = expected.area();
    if area == 0 {
        return 0.0;
    }
    detected.intersection(expected).area() as f64 / area as f64
}

/// 1 − centroid offset over the frame's half diagonal.
pub fn centering(detected: &Roi, expected: &Roi, width: u32, height: u32) -> f64 {
    let half_diagonal = (width as f64).hypot(height as f64) / 2.0;
    if half_diagonal == 0.0 {
        return 0.0;
    }
    let (dx, dy) = detected.center();
    let (ex, ey) = expected.center();
    1.0 - ((dx - ex).hypot(dy - ey) / half_diagonal).min(1.0)
}

struct Detection {
    region: Roi,
    confidence: f64,
}

/// Bounding box of grid cells whose gradient energy stands out.
fn detect_subject(gray: &GrayscaleBuffer) -> Option<Detection> {
    let (w, h) = (gray.width(), gray.height());
    if w < 2 || h < 2 {
        return None;
    }

    let energy = cell_energies(gray);
    let cells: Vec<(Roi, f64)> = energy.into_iter().filter(|(roi, _)| !roi.is_empty()).collect();
    if cells.is_empty() {
        return None;
    }

    let global_mean = cells.iter().map(|(_, e)| e).sum::<f64>() / cells.len() as f64;
    let cutoff = global_mean.max(SALIENCE_FLOOR);

    let (mut x0, mut y0, mut x1, mut y1) = (u32::MAX, u32::MAX, 0u32, 0u32);
    let (mut salient_sum, mut salient_n) = (0.0, 0usize);
    let (mut rest_sum, mut rest_n) = (0.0, 0usize);
    for (roi, e) in &cells {
        if *e >= cutoff {
            x0 = x0.min(roi.x);
            y0 = y0.min(roi.y);
            x1 = x1.max(roi.right());
            y1 = y1.max(roi.bottom());
            salient_sum += e;
            salient_n += 1;
        } else {
            rest_sum += e;
            rest_n += 1;
        }
    }
    if salient_n == 0 {
        return None;
    }

    let salient_mean = salient_sum / salient_n as f64;
    let rest_mean = if rest_n == 0 { salient_mean } else { rest_sum / rest_n as f64 };
    let separation = ((salient_mean - rest_mean) / salient_mean).clamp(0.0, 1.0);

    tracing::trace!(
        salient = salient_n,
        background = rest_n,
        global_mean,
        separation,
        "Salience grid evaluated"
    );

    Some(Detection {
        region: Roi::new(x0, y0, x1 - x0, y1 - y0),
        confidence: 0.4 + 0.6 * separation,
    })
}

/// Mean forward-difference gradient magnitude per grid cell.
fn cell_energies(gray: &GrayscaleBuffer) -> Vec<(Roi, f64)> {
    let (w, h) = (gray.width(), gray.height());
    let mut out = Vec::with_capacity((SALIENCE_GRID * SALIENCE_GRID) as usize);

    for gy in 0..SALIENCE_GRID {
        let cy0 = gy * h / SALIENCE_GRID;
        let cy1 = (gy + 1) * h / SALIENCE_GRID;
        for gx in 0..SALIENCE_GRID {
            let cx0 = gx * w / SALIENCE_GRID;
            let cx1 = (gx + 1) * w / SALIENCE_GRID;
            let roi = Roi::new(cx0, cy0, cx1 - cx0, cy1 - cy0);

            let mut sum = 0.0;
            let mut n = 0usize;
            for y in cy0..cy1.min(h - 1) {
                for x in cx0..cx1.min(w - 1) {
                    let (xu, yu) = (x as usize, y as usize);
                    let here = gray.at(xu, yu);
                    let dx = gray.at(xu + 1, yu) - here;
                    let dy = gray.at(xu, yu + 1) - here;
                    sum += dx.hypot(dy);
                    n += 1;
                }
            }
            let mean = if n == 0 { 0.0 } else { sum / n as f64 };
            out.push((roi, mean));
        }
    }
    out
}
