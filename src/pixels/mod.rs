//! Pixel access layer.
//!
//! Normalizes heterogeneous frame sources (raw buffers, live frames, decoded
//! images, encoded bytes and base64 references) into one canonical RGBA
//! [`PixelBuffer`], and provides the derivations every estimator works from:
//! grayscale conversion, histograms, region cropping, resampling and
//! aggregate statistics.

mod buffer;
mod histogram;
mod region;
mod source;

pub use buffer::{luminance, GrayscaleBuffer, PixelBuffer, PixelStatistics};
pub use histogram::{Channel, Histogram, BIN_COUNT};
pub use region::{NamedRegion, RelativeRoi, Roi};
pub use source::{acquire, FrameSource, OwnedSource, PixelFormat, SourceError};

/// Derives the luminance plane of a buffer.
pub fn to_grayscale(buf: &PixelBuffer) -> GrayscaleBuffer {
    buf.to_grayscale()
}

/// Builds a histogram over one channel of a buffer.
pub fn histogram(buf: &PixelBuffer, channel: Channel) -> Histogram {
    Histogram::from_pixels(buf, channel)
}

/// Copies a clamped region of interest out of a buffer.
pub fn extract_region(buf: &PixelBuffer, roi: Roi) -> PixelBuffer {
    buf.extract_region(roi)
}

/// Deterministically resamples a buffer.
pub fn resize(buf: &PixelBuffer, width: u32, height: u32) -> PixelBuffer {
    buf.resize(width, height)
}

/// Mean, variance, standard deviation and range over the grayscale derivation.
pub fn statistics(buf: &PixelBuffer) -> PixelStatistics {
    buf.statistics()
}
