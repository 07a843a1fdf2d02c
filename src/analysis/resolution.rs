//! Resolution adequacy.

use serde::{Deserialize, Serialize};

use super::threshold::ResolutionLimits;

/// Resolution band of a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Adequacy {
    /// Below the mode's minimum.
    Insufficient,
    /// Between the minimum and the midpoint to the optimum.
    Minimal,
    /// Past the midpoint, short of the optimum.
    Adequate,
    /// At or above the mode's optimum.
    Optimal,
}

impl Adequacy {
    /// Lowercase name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Adequacy::Insufficient => "insufficient",
            Adequacy::Minimal => "minimal",
            Adequacy::Adequate => "adequate",
            Adequacy::Optimal => "optimal",
        }
    }
}

impl std::fmt::Display for Adequacy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution metric vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolutionMetrics {
    /// Resolution score in `[0, 1]`.
    pub score: f64,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// `width * height`.
    pub pixel_count: u64,
    /// Band of the pixel count.
    pub adequacy: Adequacy,
    /// Minimum the capture was judged against.
    pub minimum_pixels: u64,
    /// Optimum the capture was judged against.
    pub optimal_pixels: u64,
}

/// Resolution estimation seam.
pub trait ResolutionEstimator: Send + Sync {
    /// Grades a `width` x `height` capture against `limits`.
    fn estimate(&self, width: u32, height: u32, limits: &ResolutionLimits) -> ResolutionMetrics;
}

/// Default estimator: linear interpolation between the mode's limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct PixelCountResolutionEstimator;

impl ResolutionEstimator for PixelCountResolutionEstimator {
    fn estimate(&self, width: u32, height: u32, limits: &ResolutionLimits) -> ResolutionMetrics {
        analyze_resolution(width, height, limits)
    }
}

/// Scores `width` x `height` against `limits`.
pub fn analyze_resolution(width: u32, height: u32, limits: &ResolutionLimits) -> ResolutionMetrics {
    let pixels = width as u64 * height as u64;
    let (min, opt) = (limits.minimum_pixels, limits.optimal_pixels);

    let (score, adequacy) = if pixels < min {
        (0.5 * pixels as f64 / min as f64, Adequacy::Insufficient)
    } else if pixels >= opt {
        (1.0, Adequacy::Optimal)
    } else {
        let t = (pixels - min) as f64 / (opt - min) as f64;
        let adequacy = if t < 0.5 {
            Adequacy::Minimal
        } else {
            Adequacy::Adequate
        };
        (0.5 + 0.5 * t, adequacy)
    };

    tracing::debug!(score, pixels, adequacy = %adequacy, "Resolution estimated");

    ResolutionMetrics {
        score,
        width,
        height,
        pixel_count: pixels,
        adequacy,
        minimum_pixels: min,
        optimal_pixels: opt,
    }
}
