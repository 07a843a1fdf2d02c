//! Capture Quality Library
//!
//! Screens a captured photograph (tongue, face, body region or general) for
//! usability at capture time, before it is handed to a downstream
//! diagnostic pipeline. Detects blur, under/over-exposure, poor framing and
//! insufficient resolution, and returns a verdict with prioritized issues
//! and human-readable suggestions.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! source → pixels → blur ────────┐
//!                 → lighting ────┤
//!                 → composition ─┼→ scoring → QualityResult
//!                 → resolution ──┘
//! ```
//!
//! # Design Principles
//!
//! - **Only sources fail**: acquisition errors propagate; estimators clamp
//!   numeric edge cases to worst-case scores
//! - **Pure estimators**: no estimator keeps state across calls or reads
//!   another's output
//! - **Snapshot thresholds**: updates never tear a running analysis
//! - **Screening, not diagnosis**: scores are heuristics for retake prompts
//!
//! # Example
//!
//! ```no_run
//! use capture_quality::{
//!     capture::{Camera, CaptureConfig, FrameThrottle, MockCamera},
//!     AnalysisOptions, CaptureMode, FrameSource, Validator,
//! };
//!
//! let validator = Validator::default();
//!
//! // Still image
//! let bytes = std::fs::read("tongue.jpg").unwrap();
//! let result = validator
//!     .analyze_image(
//!         FrameSource::Encoded(&bytes),
//!         &AnalysisOptions::for_mode(CaptureMode::Tongue),
//!     )
//!     .unwrap();
//! println!("{} ({:.0})", result.category(), result.score());
//! for suggestion in result.suggestions() {
//!     println!("- {}", suggestion);
//! }
//!
//! // Live preview, assessed every 5th frame
//! let mut camera = MockCamera::new();
//! camera.open(&CaptureConfig::default()).unwrap();
//! let mut throttle = FrameThrottle::new(5);
//! for _ in 0..30 {
//!     let frame = camera.capture().unwrap();
//!     if throttle.should_assess(&frame) {
//!         let verdict = validator.assess_frame(&frame, CaptureMode::Face).unwrap();
//!         if verdict.needs_retake() {
//!             println!("{:?}", verdict.suggestions());
//!         }
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod analysis;
pub mod capture;
pub mod metrics;
pub mod pixels;
pub mod scoring;
pub mod validator;

// Re-export commonly used types at crate root
pub use analysis::{CaptureMode, QualityMetrics, QualityThresholds, ThresholdsUpdate};
pub use capture::{Camera, CaptureConfig, FileConfig, Frame, FrameThrottle, MockCamera};
pub use pixels::{acquire, FrameSource, OwnedSource, PixelBuffer, PixelFormat, Roi, SourceError};
pub use scoring::{IssueType, QualityCategory, QualityIssue, QualityResult, Severity};
pub use validator::{AnalysisOptions, Estimators, Validator, ValidatorConfig};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
