//! 256-bin intensity histograms.

use serde::{Deserialize, Serialize};

use super::buffer::{luminance, GrayscaleBuffer, PixelBuffer};

/// Number of histogram bins (one per 8-bit intensity).
pub const BIN_COUNT: usize = 256;

/// Channel a histogram is computed over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// BT.601 luminance.
    #[default]
    Luminance,
    /// Red channel.
    Red,
    /// Green channel.
    Green,
    /// Blue channel.
    Blue,
    /// Alpha channel.
    Alpha,
}

/// Ordered 256-bin histogram. The bin total always equals the pixel count of
/// the buffer it was built from.
#[derive(Clone, PartialEq, Eq)]
pub struct Histogram {
    bins: [u64; BIN_COUNT],
    total: u64,
}

impl Histogram {
    /// Builds a histogram over one channel of an RGBA buffer.
    pub fn from_pixels(buf: &PixelBuffer, channel: Channel) -> Self {
        let mut bins = [0u64; BIN_COUNT];
        for p in buf.samples().chunks_exact(4) {
            let v = match channel {
                Channel::Luminance => luminance(p[0], p[1], p[2]),
                Channel::Red => p[0],
                Channel::Green => p[1],
                Channel::Blue => p[2],
                Channel::Alpha => p[3],
            };
            bins[v as usize] += 1;
        }
        Self::from_bins(bins)
    }

    /// Builds a histogram from an existing luminance plane.
    pub fn from_gray(gray: &GrayscaleBuffer) -> Self {
        let mut bins = [0u64; BIN_COUNT];
        for &v in gray.as_slice() {
            bins[v as usize] += 1;
        }
        Self::from_bins(bins)
    }

    fn from_bins(bins: [u64; BIN_COUNT]) -> Self {
        let total = bins.iter().sum();
        Self { bins, total }
    }

    /// All bins in intensity order.
    #[inline]
    pub fn bins(&self) -> &[u64; BIN_COUNT] {
        &self.bins
    }

    /// Count in one bin; indices past 255 read as empty.
    #[inline]
    pub fn count(&self, bin: usize) -> u64 {
        self.bins.get(bin).copied().unwrap_or(0)
    }

    /// Sum of all bins.
    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Sum of bins in the inclusive range `lo..=hi`.
    pub fn count_in(&self, lo: u8, hi: u8) -> u64 {
        if lo > hi {
            return 0;
        }
        self.bins[lo as usize..=hi as usize].iter().sum()
    }

    /// Fraction of samples in the inclusive range `lo..=hi`; 0 when empty.
    pub fn fraction_in(&self, lo: u8, hi: u8) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.count_in(lo, hi) as f64 / self.total as f64
    }

    /// Mean intensity.
    pub fn mean(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let sum: f64 = self
            .bins
            .iter()
            .enumerate()
            .map(|(v, &c)| v as f64 * c as f64)
            .sum();
        sum / self.total as f64
    }

    /// Population standard deviation of intensity.
    pub fn stddev(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let mean = self.mean();
        let var: f64 = self
            .bins
            .iter()
            .enumerate()
            .map(|(v, &c)| (v as f64 - mean).powi(2) * c as f64)
            .sum::<f64>()
            / self.total as f64;
        var.sqrt()
    }
}

impl std::fmt::Debug for Histogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Histogram")
            .field("total", &self.total)
            .field("mean", &format!("{:.2}", self.mean()))
            .field("stddev", &format!("{:.2}", self.stddev()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_buffer_single_bin() {
        let buf = PixelBuffer::filled(10, 5, [128, 128, 128, 255]);
        let hist = Histogram::from_pixels(&buf, Channel::Luminance);
        assert_eq!(hist.count(128), 50);
        assert_eq!(hist.total(), 50);
        assert_eq!(hist.mean(), 128.0);
        assert_eq!(hist.stddev(), 0.0);
    }

    #[test]
    fn test_channel_selection() {
        let buf = PixelBuffer::filled(2, 2, [10, 20, 30, 40]);
        assert_eq!(Histogram::from_pixels(&buf, Channel::Red).count(10), 4);
        assert_eq!(Histogram::from_pixels(&buf, Channel::Green).count(20), 4);
        assert_eq!(Histogram::from_pixels(&buf, Channel::Blue).count(30), 4);
        assert_eq!(Histogram::from_pixels(&buf, Channel::Alpha).count(40), 4);
    }

    #[test]
    fn test_out_of_range_bin_is_empty() {
        let buf = PixelBuffer::filled(2, 2, [0, 0, 0, 255]);
        let hist = Histogram::from_pixels(&buf, Channel::Luminance);
        assert_eq!(hist.count(256), 0);
        assert_eq!(hist.count(usize::MAX), 0);
    }

    #[test]
    fn test_fraction_in_range() {
        let mut buf = PixelBuffer::filled(4, 1, [0, 0, 0, 255]);
        buf.set_pixel(3, 0, [255, 255, 255, 255]);
        let hist = Histogram::from_pixels(&buf, Channel::Luminance);
        assert_eq!(hist.fraction_in(0, 50), 0.75);
        assert_eq!(hist.fraction_in(200, 255), 0.25);
        assert_eq!(hist.fraction_in(60, 10), 0.0);
    }

    #[test]
    fn test_gray_and_pixel_histograms_agree() {
        let mut buf = PixelBuffer::filled(3, 3, [90, 40, 200, 255]);
        buf.set_pixel(1, 1, [5, 250, 60, 255]);
        let a = Histogram::from_pixels(&buf, Channel::Luminance);
        let b = Histogram::from_gray(&buf.to_grayscale());
        assert_eq!(a, b);
    }
}
