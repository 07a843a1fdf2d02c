//! Frame sources and their normalization into a [`PixelBuffer`].

use base64::{engine::general_purpose, Engine as _};
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::buffer::PixelBuffer;
use crate::capture::{Camera, CameraError, Frame};

/// Errors raised while acquiring pixels. These are the only failures that
/// abort an analysis.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The source kind or URL scheme is not handled.
    #[error("unsupported source: {0}")]
    UnsupportedSource(String),
    /// A dimension is zero or the sample count does not match.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
    },
    /// Encoded bytes could not be decoded.
    #[error("failed to decode source: {0}")]
    Decode(String),
    /// A camera or other capture device failed.
    #[error("capture environment unavailable: {0}")]
    Environment(String),
}

impl From<CameraError> for SourceError {
    fn from(err: CameraError) -> Self {
        SourceError::Environment(err.to_string())
    }
}

/// Memory layout of a raw pixel buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// One luminance byte per pixel.
    Gray,
    /// Three bytes per pixel.
    Rgb,
    /// Four bytes per pixel.
    #[default]
    Rgba,
}

impl PixelFormat {
    /// Bytes per pixel.
    #[inline]
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Gray => 1,
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }

    /// Maps a channel count back to a layout.
    pub fn from_channels(channels: usize) -> Option<Self> {
        match channels {
            1 => Some(PixelFormat::Gray),
            3 => Some(PixelFormat::Rgb),
            4 => Some(PixelFormat::Rgba),
            _ => None,
        }
    }
}

/// Anything the engine can pull pixels from.
pub enum FrameSource<'a> {
    /// Caller-owned raw pixels in a known layout.
    Raw {
        /// Interleaved samples, row-major.
        pixels: &'a [u8],
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
        /// Channel layout of `pixels`.
        format: PixelFormat,
    },
    /// An already-normalized buffer.
    Canonical(&'a PixelBuffer),
    /// A frame previously captured from a live camera.
    Live(&'a Frame),
    /// A camera to capture one frame from at acquisition time.
    Camera(&'a mut dyn Camera),
    /// A decoded static image.
    Image(&'a DynamicImage),
    /// An encoded image file held in memory (PNG, JPEG, ...).
    Encoded(&'a [u8]),
    /// An encoded string reference: a `data:image/...;base64,` URL or bare
    /// base64 text.
    Reference(&'a str),
}

impl FrameSource<'_> {
    /// Short name of the source kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            FrameSource::Raw { .. } => "raw",
            FrameSource::Canonical(_) => "canonical",
            FrameSource::Live(_) => "live",
            FrameSource::Camera(_) => "camera",
            FrameSource::Image(_) => "image",
            FrameSource::Encoded(_) => "encoded",
            FrameSource::Reference(_) => "reference",
        }
    }
}

impl std::fmt::Debug for FrameSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSource")
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}

impl<'a> From<&'a PixelBuffer> for FrameSource<'a> {
    fn from(buf: &'a PixelBuffer) -> Self {
        FrameSource::Canonical(buf)
    }
}

impl<'a> From<&'a Frame> for FrameSource<'a> {
    fn from(frame: &'a Frame) -> Self {
        FrameSource::Live(frame)
    }
}

impl<'a> From<&'a DynamicImage> for FrameSource<'a> {
    fn from(img: &'a DynamicImage) -> Self {
        FrameSource::Image(img)
    }
}

/// Normalizes any supported source into a canonical RGBA buffer.
pub fn acquire(source: FrameSource<'_>) -> Result<PixelBuffer, SourceError> {
    match source {
        FrameSource::Raw {
            pixels,
            width,
            height,
            format,
        } => PixelBuffer::from_raw(pixels, width, height, format),
        FrameSource::Canonical(buf) => {
            if buf.is_empty() {
                return Err(SourceError::InvalidDimensions {
                    width: buf.width(),
                    height: buf.height(),
                });
            }
            Ok(buf.clone())
        }
        FrameSource::Live(frame) => from_frame(frame),
        FrameSource::Camera(camera) => {
            if !camera.is_open() {
                return Err(CameraError::NotInitialized.into());
            }
            let frame = camera.capture()?;
            from_frame(&frame)
        }
        FrameSource::Image(img) => PixelBuffer::from_dynamic(img),
        FrameSource::Encoded(bytes) => decode_bytes(bytes),
        FrameSource::Reference(reference) => decode_reference(reference),
    }
}

fn from_frame(frame: &Frame) -> Result<PixelBuffer, SourceError> {
    PixelBuffer::from_raw(frame.pixels(), frame.width(), frame.height(), frame.format())
}

fn decode_bytes(bytes: &[u8]) -> Result<PixelBuffer, SourceError> {
    let img = image::load_from_memory(bytes).map_err(|e| SourceError::Decode(e.to_string()))?;
    PixelBuffer::from_dynamic(&img)
}

fn decode_reference(reference: &str) -> Result<PixelBuffer, SourceError> {
    let reference = reference.trim();

    let payload = if let Some(rest) = reference.strip_prefix("data:") {
        let (header, data) = rest
            .split_once(',')
            .ok_or_else(|| SourceError::Decode("data URL has no payload".to_string()))?;
        let mut parts = header.split(';');
        let mime = parts.next().unwrap_or_default();
        if !mime.starts_with("image/") {
            return Err(SourceError::UnsupportedSource(format!(
                "data URL media type '{}'",
                mime
            )));
        }
        if !parts.any(|p| p.eq_ignore_ascii_case("base64")) {
            return Err(SourceError::UnsupportedSource(
                "data URL without base64 encoding".to_string(),
            ));
        }
        data
    } else if let Some((scheme, _)) = reference.split_once("://") {
        return Err(SourceError::UnsupportedSource(format!(
            "'{}' references must be fetched by the caller",
            scheme
        )));
    } else {
        reference
    };

    let bytes = general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| SourceError::Decode(e.to_string()))?;
    decode_bytes(&bytes)
}

/// An owned frame source, for handing work to another thread.
#[derive(Debug, Clone)]
pub enum OwnedSource {
    /// Canonical RGBA pixels.
    Buffer(PixelBuffer),
    /// A live preview frame.
    Frame(Frame),
    /// A decoded image.
    Image(DynamicImage),
    /// Encoded bytes.
    Encoded(Vec<u8>),
    /// A `data:` URL or file path.
    Reference(String),
}

impl OwnedSource {
    /// Borrows this source for acquisition.
    pub fn as_source(&self) -> FrameSource<'_> {
        match self {
            OwnedSource::Buffer(buf) => FrameSource::Canonical(buf),
            OwnedSource::Frame(frame) => FrameSource::Live(frame),
            OwnedSource::Image(img) => FrameSource::Image(img),
            OwnedSource::Encoded(bytes) => FrameSource::Encoded(bytes),
            OwnedSource::Reference(s) => FrameSource::Reference(s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureConfig, MockCamera};
    use image::{ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, image::Rgba([30, 60, 90, 255]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn test_raw_zero_width_is_invalid() {
        let err = acquire(FrameSource::Raw {
            pixels: &[],
            width: 0,
            height: 10,
            format: PixelFormat::Rgba,
        })
        .unwrap_err();
        assert_eq!(err, SourceError::InvalidDimensions { width: 0, height: 10 });
    }

    #[test]
    fn test_encoded_png_round_trip() {
        let buf = acquire(FrameSource::Encoded(&png_bytes(5, 3))).unwrap();
        assert_eq!(buf.dimensions(), (5, 3));
        assert_eq!(buf.pixel(4, 2), Some([30, 60, 90, 255]));
    }

    #[test]
    fn test_garbage_bytes_fail_to_decode() {
        let err = acquire(FrameSource::Encoded(b"definitely not an image")).unwrap_err();
        assert!(matches!(err, SourceError::Decode(_)));
    }

    #[test]
    fn test_data_url_reference() {
        let url = format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(png_bytes(4, 4))
        );
        let buf = acquire(FrameSource::Reference(&url)).unwrap();
        assert_eq!(buf.dimensions(), (4, 4));
    }

    #[test]
    fn test_bare_base64_reference() {
        let text = general_purpose::STANDARD.encode(png_bytes(2, 2));
        assert!(acquire(FrameSource::Reference(&text)).is_ok());
    }

    #[test]
    fn test_remote_reference_is_unsupported() {
        let err = acquire(FrameSource::Reference("https://example.com/tongue.jpg")).unwrap_err();
        assert!(matches!(err, SourceError::UnsupportedSource(_)));
    }

    #[test]
    fn test_non_image_data_url_is_unsupported() {
        let err = acquire(FrameSource::Reference("data:text/plain;base64,aGVsbG8=")).unwrap_err();
        assert!(matches!(err, SourceError::UnsupportedSource(_)));
    }

    #[test]
    fn test_bad_base64_is_decode_error() {
        let err = acquire(FrameSource::Reference("data:image/png;base64,@@@")).unwrap_err();
        assert!(matches!(err, SourceError::Decode(_)));
    }

    #[test]
    fn test_live_frame_gray() {
        let frame = Frame::new(vec![77u8; 12], 4, 3, PixelFormat::Gray, 1);
        let buf = acquire(FrameSource::Live(&frame)).unwrap();
        assert_eq!(buf.pixel(0, 0), Some([77, 77, 77, 255]));
    }

    #[test]
    fn test_closed_camera_is_environment_error() {
        let mut camera = MockCamera::new();
        let err = acquire(FrameSource::Camera(&mut camera)).unwrap_err();
        assert!(matches!(err, SourceError::Environment(_)));
    }

    #[test]
    fn test_open_camera_captures() {
        let mut camera = MockCamera::new();
        camera.open(&CaptureConfig::with_dimensions(32, 24)).unwrap();
        let buf = acquire(FrameSource::Camera(&mut camera)).unwrap();
        assert_eq!(buf.dimensions(), (32, 24));
    }
}
