//! Camera abstraction for live frame capture.
//!
//! Capture UIs sit behind this trait so the engine can pull frames without
//! knowing whether they come from real hardware or a synthetic source.

use super::{CaptureConfig, Frame};
use crate::pixels::PixelFormat;
use thiserror::Error;

/// Preview source failures; surfaced to callers as environment errors.
#[derive(Debug, Error)]
pub enum CameraError {
    /// The device rejected the requested configuration.
    #[error("failed to configure camera: {0}")]
    ConfigFailed(String),
    /// The device failed to deliver a frame.
    #[error("failed to capture frame: {0}")]
    CaptureFailed(String),
    /// `capture` called before `open`.
    #[error("camera not initialized")]
    NotInitialized,
}

/// A live preview source.
///
/// Implementations own the device; the validator only ever borrows one for
/// a single capture.
pub trait Camera {
    /// Starts the preview stream; sequence numbers restart at 1.
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError>;

    /// Pulls the next preview frame.
    fn capture(&mut self) -> Result<Frame, CameraError>;

    /// Whether the stream is running.
    fn is_open(&self) -> bool;

    /// Stops the stream. Idempotent.
    fn close(&mut self);
}

/// Synthetic scene rendered by [`MockCamera`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MockScene {
    /// A high-contrast textured subject centred on a mid-gray background.
    #[default]
    CenteredSubject,
    /// Flat mid-gray with no edges.
    Flat,
    /// A very dark, low-detail frame.
    Dark,
}

/// Mock camera that renders deterministic synthetic frames.
#[derive(Debug, Default)]
pub struct MockCamera {
    config: Option<CaptureConfig>,
    scene: MockScene,
    sequence: u64,
    /// Every n-th capture fails; 0 never.
    drop_every: u64,
}

impl MockCamera {
    /// A closed camera showing the default scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a camera rendering the given scene.
    pub fn with_scene(scene: MockScene) -> Self {
        Self {
            scene,
            ..Self::default()
        }
    }

    /// Makes every `n`-th capture fail, to exercise dropout handling.
    pub fn with_dropouts(mut self, n: u64) -> Self {
        self.drop_every = n;
        self
    }

    /// Device the stream was opened on, while open.
    pub fn device_id(&self) -> Option<u32> {
        self.config.as_ref().map(|c| c.device_id)
    }

    fn render(&self, config: &CaptureConfig) -> Vec<u8> {
        let (w, h) = (config.width, config.height);
        let format = config.pixel_format();
        let mut pixels = Vec::with_capacity(w as usize * h as usize * format.channels());

        // Subject box covers the central third; texture shifts with the sequence.
        let (x0, x1) = (w / 3, w - w / 3);
        let (y0, y1) = (h / 3, h - h / 3);
        let phase = (self.sequence % 4) as u32;

        for y in 0..h {
            for x in 0..w {
                let v = match self.scene {
                    MockScene::Flat => 128,
                    MockScene::Dark => 20 + ((x / 16 + y / 16) % 2) as u8 * 4,
                    MockScene::CenteredSubject => {
                        if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
                            if ((x + phase) / 4 + y / 4) % 2 == 0 {
                                230
                            } else {
                                40
                            }
                        } else {
                            128
                        }
                    }
                };
                match format {
                    PixelFormat::Gray => pixels.push(v),
                    PixelFormat::Rgb => pixels.extend_from_slice(&[v, v, v]),
                    PixelFormat::Rgba => pixels.extend_from_slice(&[v, v, v, u8::MAX]),
                }
            }
        }
        pixels
    }
}

impl Camera for MockCamera {
    fn open(&mut self, config: &CaptureConfig) -> Result<(), CameraError> {
        config
            .validate()
            .map_err(|e| CameraError::ConfigFailed(e.to_string()))?;
        self.config = Some(config.clone());
        self.sequence = 0;
        tracing::info!(
            device = config.device_id,
            scene = ?self.scene,
            "MockCamera opened at {}x{} @ {} fps",
            config.width,
            config.height,
            config.fps
        );
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, CameraError> {
        let config = self.config.as_ref().ok_or(CameraError::NotInitialized)?;
        self.sequence += 1;
        if self.drop_every > 0 && self.sequence % self.drop_every == 0 {
            return Err(CameraError::CaptureFailed(format!(
                "mock dropout at frame {}",
                self.sequence
            )));
        }
        let pixels = self.render(config);
        let frame = Frame::new(
            pixels,
            config.width,
            config.height,
            config.pixel_format(),
            self.sequence,
        );
        Ok(frame)
    }

    fn is_open(&self) -> bool {
        self.config.is_some()
    }

    fn close(&mut self) {
        self.config = None;
        tracing::info!("MockCamera closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_capture_close() {
        let mut camera = MockCamera::new();
        assert!(!camera.is_open());

        camera.open(&CaptureConfig::with_dimensions(32, 24)).unwrap();
        let first = camera.capture().unwrap();
        let second = camera.capture().unwrap();
        assert!(first.is_valid());
        assert_eq!((first.sequence(), second.sequence()), (1, 2));

        camera.close();
        camera.close();
        assert!(!camera.is_open());

        camera.open(&CaptureConfig::with_dimensions(32, 24)).unwrap();
        assert_eq!(camera.capture().unwrap().sequence(), 1);
    }

    #[test]
    fn test_capture_without_open() {
        let mut camera = MockCamera::new();
        assert!(matches!(
            camera.capture(),
            Err(CameraError::NotInitialized)
        ));
    }

    #[test]
    fn test_flat_scene_is_uniform() {
        let mut camera = MockCamera::with_scene(MockScene::Flat);
        let mut config = CaptureConfig::with_dimensions(16, 8);
        config.grayscale = true;
        camera.open(&config).unwrap();

        let frame = camera.capture().unwrap();
        assert_eq!(frame.format(), PixelFormat::Gray);
        assert!(frame.pixels().iter().all(|&v| v == 128));
    }

    #[test]
    fn test_dropouts() {
        let mut camera = MockCamera::new().with_dropouts(3);
        camera.open(&CaptureConfig::with_dimensions(8, 8)).unwrap();

        assert!(camera.capture().is_ok());
        assert!(camera.capture().is_ok());
        assert!(matches!(camera.capture(), Err(CameraError::CaptureFailed(_))));
        assert_eq!(camera.capture().unwrap().sequence(), 4);
    }

    #[test]
    fn test_device_id_tracks_open_stream() {
        let mut camera = MockCamera::new();
        assert_eq!(camera.device_id(), None);

        let config = CaptureConfig {
            device_id: 2,
            ..CaptureConfig::with_dimensions(8, 8)
        };
        camera.open(&config).unwrap();
        assert_eq!(camera.device_id(), Some(2));

        camera.close();
        assert_eq!(camera.device_id(), None);
    }
}
