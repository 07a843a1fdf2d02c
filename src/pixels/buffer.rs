//! Canonical RGBA pixel buffer and its grayscale derivation.

use std::borrow::Cow;

use image::{imageops, imageops::FilterType, DynamicImage, ImageBuffer, Rgba};

use super::region::Roi;
use super::source::{PixelFormat, SourceError};

/// Luminance weights (ITU-R BT.601).
const LUMA_R: f64 = 0.299;
const LUMA_G: f64 = 0.587;
const LUMA_B: f64 = 0.114;

/// Computes the BT.601 luminance of one RGB sample, rounded to a byte.
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> u8 {
    let y = LUMA_R * r as f64 + LUMA_G * g as f64 + LUMA_B * b as f64;
    y.round().clamp(0.0, 255.0) as u8
}

/// Dense row-major RGBA pixel grid shared by every estimator.
///
/// The buffer always satisfies `samples.len() == width * height * 4`.
/// Regions and resizes produce independent copies, never views.
#[derive(Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl PixelBuffer {
    /// Wraps an RGBA sample vector.
    pub fn from_rgba(width: u32, height: u32, samples: Vec<u8>) -> Result<Self, SourceError> {
        check_dimensions(width, height)?;
        let expected = pixel_count(width, height) * 4;
        if samples.len() != expected {
            return Err(SourceError::UnsupportedSource(format!(
                "RGBA buffer holds {} bytes, {}x{} requires {}",
                samples.len(),
                width,
                height,
                expected
            )));
        }
        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Copies a raw buffer in any supported layout into canonical RGBA.
    pub fn from_raw(
        pixels: &[u8],
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Result<Self, SourceError> {
        check_dimensions(width, height)?;
        let count = pixel_count(width, height);
        let channels = format.channels();
        if pixels.len() != count * channels {
            return Err(SourceError::UnsupportedSource(format!(
                "{:?} buffer holds {} bytes, {}x{} requires {}",
                format,
                pixels.len(),
                width,
                height,
                count * channels
            )));
        }

        let samples = match format {
            PixelFormat::Rgba => pixels.to_vec(),
            PixelFormat::Rgb => pixels
                .chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], u8::MAX])
                .collect(),
            PixelFormat::Gray => pixels
                .iter()
                .flat_map(|&v| [v, v, v, u8::MAX])
                .collect(),
        };

        Ok(Self {
            width,
            height,
            samples,
        })
    }

    /// Converts a decoded image of any colour type into canonical RGBA.
    pub fn from_dynamic(img: &DynamicImage) -> Result<Self, SourceError> {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            samples: rgba.into_raw(),
        })
    }

    /// Uniform buffer filled with one colour; mainly for synthetic captures.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = pixel_count(width, height);
        let mut samples = Vec::with_capacity(count * 4);
        for _ in 0..count {
            samples.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            samples,
        }
    }

    fn empty(width: u32, height: u32) -> Self {
        debug_assert!(width == 0 || height == 0);
        Self {
            width,
            height,
            samples: Vec::new(),
        }
    }

    /// Buffer width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Buffer height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `(width, height)`.
    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Total number of pixels.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        pixel_count(self.width, self.height)
    }

    /// True for zero-area buffers, which only region extraction can produce.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    /// Raw RGBA samples, row-major.
    #[inline]
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    /// RGBA value at `(x, y)`, or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        let p = &self.samples[i..i + 4];
        Some([p[0], p[1], p[2], p[3]])
    }

    /// Overwrites the pixel at `(x, y)`; out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = (y as usize * self.width as usize + x as usize) * 4;
        self.samples[i..i + 4].copy_from_slice(&rgba);
    }

    /// Derives the luminance plane.
    pub fn to_grayscale(&self) -> GrayscaleBuffer {
        GrayscaleBuffer::from_pixels(self)
    }

    /// Copies the clamped region of interest into a new buffer.
    ///
    /// Never fails: a region outside the buffer yields a zero-area buffer.
    pub fn extract_region(&self, roi: Roi) -> PixelBuffer {
        let roi = roi.clamp_to(self.width, self.height);
        if roi.is_empty() {
            return PixelBuffer::empty(roi.width, roi.height);
        }

        let stride = self.width as usize * 4;
        let row_bytes = roi.width as usize * 4;
        let mut samples = Vec::with_capacity(row_bytes * roi.height as usize);
        for y in roi.y..roi.bottom() {
            let start = y as usize * stride + roi.x as usize * 4;
            samples.extend_from_slice(&self.samples[start..start + row_bytes]);
        }

        PixelBuffer {
            width: roi.width,
            height: roi.height,
            samples,
        }
    }

    /// Resamples the buffer to `width` x `height` with a triangle filter.
    ///
    /// Deterministic for identical input. A zero target dimension yields a
    /// zero-area buffer.
    pub fn resize(&self, width: u32, height: u32) -> PixelBuffer {
        if self.is_empty() {
            return PixelBuffer::empty(0, 0);
        }
        if width == 0 || height == 0 {
            return PixelBuffer::empty(width, height);
        }
        if (width, height) == self.dimensions() {
            return self.clone();
        }

        let view: Option<ImageBuffer<Rgba<u8>, &[u8]>> =
            ImageBuffer::from_raw(self.width, self.height, self.samples.as_slice());
        match view {
            Some(view) => {
                let out = imageops::resize(&view, width, height, FilterType::Triangle);
                PixelBuffer {
                    width,
                    height,
                    samples: out.into_raw(),
                }
            }
            None => PixelBuffer::filled(width, height, [0, 0, 0, u8::MAX]),
        }
    }

    /// Downscales so the longer side is at most `max_dimension`, keeping the
    /// aspect ratio. Returns the buffer untouched when it already fits or
    /// when `max_dimension` is zero.
    pub fn downscale_to_fit(&self, max_dimension: u32) -> Cow<'_, PixelBuffer> {
        let longest = self.width.max(self.height);
        if max_dimension == 0 || longest <= max_dimension {
            return Cow::Borrowed(self);
        }
        let scale = max_dimension as f64 / longest as f64;
        let w = ((self.width as f64 * scale).round() as u32).max(1);
        let h = ((self.height as f64 * scale).round() as u32).max(1);
        tracing::trace!(
            from_width = self.width,
            from_height = self.height,
            to_width = w,
            to_height = h,
            "Downscaling buffer before analysis"
        );
        Cow::Owned(self.resize(w, h))
    }

    /// Aggregate statistics over the grayscale derivation.
    pub fn statistics(&self) -> PixelStatistics {
        PixelStatistics::of(&self.to_grayscale())
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sample_bytes", &self.samples.len())
            .finish()
    }
}

/// Per-pixel luminance plane derived from a [`PixelBuffer`].
#[derive(Clone, PartialEq, Eq)]
pub struct GrayscaleBuffer {
    width: u32,
    height: u32,
    luma: Vec<u8>,
}

impl GrayscaleBuffer {
    /// Computes `0.299R + 0.587G + 0.114B` for every pixel.
    pub fn from_pixels(buf: &PixelBuffer) -> Self {
        let luma = buf
            .samples
            .chunks_exact(4)
            .map(|p| luminance(p[0], p[1], p[2]))
            .collect();
        Self {
            width: buf.width,
            height: buf.height,
            luma,
        }
    }

    /// Plane width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Plane height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Luminance samples, row-major.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.luma
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.luma.len()
    }

    /// True for a zero-area plane.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.luma.is_empty()
    }

    /// Luminance at `(x, y)` as `f64`. Caller guarantees bounds.
    #[inline]
    pub fn at(&self, x: usize, y: usize) -> f64 {
        self.luma[y * self.width as usize + x] as f64
    }
}

impl std::fmt::Debug for GrayscaleBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrayscaleBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Mean, spread and range of luminance.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PixelStatistics {
    /// Mean luminance.
    pub mean: f64,
    /// Population variance.
    pub variance: f64,
    /// Population standard deviation.
    pub stddev: f64,
    /// Darkest sample.
    pub min: u8,
    /// Brightest sample.
    pub max: u8,
}

impl PixelStatistics {
    /// Computes statistics over a luminance plane; zero-area planes yield zeros.
    pub fn of(gray: &GrayscaleBuffer) -> Self {
        let data = gray.as_slice();
        if data.is_empty() {
            return Self::default();
        }

        let n = data.len() as f64;
        let mean = data.iter().map(|&v| v as f64).sum::<f64>() / n;
        let variance = data.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
        let min = data.iter().copied().min().unwrap_or(0);
        let max = data.iter().copied().max().unwrap_or(0);

        Self {
            mean,
            variance,
            stddev: variance.sqrt(),
            min,
            max,
        }
    }
}

fn check_dimensions(width: u32, height: u32) -> Result<(), SourceError> {
    if width == 0 || height == 0 {
        return Err(SourceError::InvalidDimensions { width, height });
    }
    Ok(())
}

#[inline]
fn pixel_count(width: u32, height: u32) -> usize {
    width as usize * height as usize
}
