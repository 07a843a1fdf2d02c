//! Live capture handles.
//!
//! A capture UI pulls frames from a [`Camera`] and hands a throttled subset
//! to the validator's live fast path. [`MockCamera`] renders deterministic
//! synthetic scenes for tests and the `watch` command.

mod camera;
mod config;
mod frame;
mod throttle;

pub use camera::{Camera, CameraError, MockCamera, MockScene};
pub use config::{CaptureConfig, ConfigError, EngineConfig, FileConfig, ThresholdPreset};
pub use frame::Frame;
pub use throttle::FrameThrottle;
