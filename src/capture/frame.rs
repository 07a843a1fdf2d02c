//! Live preview frames.

use std::time::{Duration, Instant};

use crate::pixels::PixelFormat;

/// One preview frame as delivered by a [`Camera`](crate::Camera).
///
/// Samples stay in the camera's native layout; they are converted to the
/// canonical RGBA buffer only if the frame is selected for
/// [`Validator::assess_frame`](crate::Validator::assess_frame).
#[derive(Clone)]
pub struct Frame {
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    captured_at: Instant,
    /// Starts at 1 after each `open`.
    sequence: u64,
}

impl Frame {
    /// Wraps native samples; the capture instant is taken now.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, format: PixelFormat, sequence: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            format,
            captured_at: Instant::now(),
            sequence,
        }
    }

    /// Native-layout samples.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Native sample layout.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Position in the stream.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Instant the camera handed the frame over.
    #[inline]
    pub fn captured_at(&self) -> Instant {
        self.captured_at
    }

    /// Time since capture; feedback on an old frame describes a scene the
    /// user has already moved away from.
    pub fn age(&self) -> Duration {
        self.captured_at.elapsed()
    }

    /// Whether the sample count matches `width * height * channels`.
    pub fn is_valid(&self) -> bool {
        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(self.format.channels()));
        expected == Some(self.pixels.len())
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("sequence", &self.sequence)
            .field("size", &format_args!("{}x{}", self.width, self.height))
            .field("format", &self.format)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_preview_frame() {
        let frame = Frame::new(vec![0u8; 64 * 48 * 3], 64, 48, PixelFormat::Rgb, 1);
        assert_eq!((frame.width(), frame.height()), (64, 48));
        assert_eq!(frame.sequence(), 1);
        assert!(frame.is_valid());
        assert!(frame.age() < Duration::from_secs(5));
    }

    #[test]
    fn test_layout_mismatch() {
        // Gray-sized payload declared as RGBA.
        let frame = Frame::new(vec![0u8; 64 * 48], 64, 48, PixelFormat::Rgba, 1);
        assert!(!frame.is_valid());
    }
}
