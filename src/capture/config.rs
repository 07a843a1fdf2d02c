//! Capture and engine configuration.
//!
//! A single TOML file drives both the live capture source and the
//! validator. Every section is optional; absent sections fall back to their
//! defaults and threshold overrides are merged onto the chosen preset.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::analysis::{CaptureMode, InvalidThreshold, QualityThresholds, ThresholdsUpdate};
use crate::pixels::PixelFormat;
use crate::validator::{AnalysisOptions, ValidatorConfig};

/// Configuration for a live capture source.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Camera device index or identifier.
    pub device_id: u32,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Target frames per second.
    pub fps: u32,
    /// Deliver single-channel frames instead of RGB.
    pub grayscale: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device_id: 0,
            width: 640,
            height: 480,
            fps: 30,
            grayscale: false,
        }
    }
}

impl CaptureConfig {
    /// Creates a new configuration with the specified dimensions.
    pub fn with_dimensions(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Pixel layout of frames produced under this configuration.
    pub fn pixel_format(&self) -> PixelFormat {
        if self.grayscale {
            PixelFormat::Gray
        } else {
            PixelFormat::Rgb
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.fps == 0 || self.fps > 120 {
            return Err(ConfigError::InvalidFrameRate);
        }
        Ok(())
    }
}

/// Named threshold table to start from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdPreset {
    /// Library defaults.
    #[default]
    Default,
    /// Tighter cutoffs for clinical capture.
    Strict,
    /// Looser cutoffs for quick previews.
    Lenient,
}

impl ThresholdPreset {
    /// Threshold table for the preset.
    pub fn thresholds(self) -> QualityThresholds {
        match self {
            ThresholdPreset::Default => QualityThresholds::default(),
            ThresholdPreset::Strict => QualityThresholds::strict(),
            ThresholdPreset::Lenient => QualityThresholds::lenient(),
        }
    }
}

/// Validator and pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capture mode used when none is given on the command line.
    pub mode: CaptureMode,
    /// Threshold table the `[thresholds]` overrides are merged onto.
    pub preset: ThresholdPreset,
    /// Use five-region Laplacian sampling for still images.
    pub regional_sampling: bool,
    /// Frames larger than this on either side are downscaled first.
    pub max_analysis_dimension: u32,
    /// Downscale target for the live fast path.
    pub live_max_dimension: u32,
    /// Result cache entries; 0 disables caching.
    pub cache_capacity: usize,
    /// Assess every N-th live frame.
    pub assess_every: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let validator = ValidatorConfig::default();
        Self {
            mode: CaptureMode::General,
            preset: ThresholdPreset::Default,
            regional_sampling: false,
            max_analysis_dimension: validator.max_analysis_dimension,
            live_max_dimension: validator.live_max_dimension,
            cache_capacity: validator.cache_capacity,
            assess_every: 5,
        }
    }
}

impl EngineConfig {
    /// Validates the engine settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_analysis_dimension == 0 || self.live_max_dimension == 0 {
            return Err(ConfigError::InvalidAnalysisDimension);
        }
        if self.assess_every == 0 {
            return Err(ConfigError::InvalidCadence);
        }
        Ok(())
    }

    /// Validator construction settings.
    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            max_analysis_dimension: self.max_analysis_dimension,
            live_max_dimension: self.live_max_dimension,
            cache_capacity: self.cache_capacity,
        }
    }

    /// Per-call options derived from the engine defaults.
    pub fn analysis_options(&self) -> AnalysisOptions {
        AnalysisOptions {
            mode: self.mode,
            regional_sampling: self.regional_sampling,
            ..AnalysisOptions::default()
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Width or height is zero.
    #[error("invalid frame dimensions")]
    InvalidDimensions,
    /// Frame rate outside 1-120 fps.
    #[error("invalid frame rate (must be 1-120 fps)")]
    InvalidFrameRate,
    /// `max_analysis_dimension` is zero.
    #[error("analysis dimensions must be non-zero")]
    InvalidAnalysisDimension,
    /// `assess_every` is zero.
    #[error("assessment cadence must be at least one frame")]
    InvalidCadence,
    /// Threshold overrides are inconsistent.
    #[error("invalid thresholds: {0}")]
    InvalidThresholds(#[from] InvalidThreshold),
    /// The file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    /// Preview device settings.
    #[serde(default)]
    pub capture: CaptureConfig,
    /// Validator engine settings.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Overrides applied on top of the preset.
    #[serde(default)]
    pub thresholds: ThresholdsUpdate,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.capture.validate()?;
        config.engine.validate()?;
        config.quality_thresholds()?;
        Ok(config)
    }

    /// The preset with `[thresholds]` merged on top.
    pub fn quality_thresholds(&self) -> Result<QualityThresholds, ConfigError> {
        let thresholds = self.engine.preset.thresholds().merged(&self.thresholds);
        thresholds.validate()?;
        Ok(thresholds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = CaptureConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pixel_format(), PixelFormat::Rgb);
    }

    #[test]
    fn test_zero_dimensions_invalid() {
        let mut config = CaptureConfig::default();
        config.width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = FileConfig::from_toml("").unwrap();
        assert_eq!(config.engine.mode, CaptureMode::General);
        assert_eq!(config.quality_thresholds().unwrap(), QualityThresholds::default());
    }

    #[test]
    fn test_full_file() {
        let config = FileConfig::from_toml(
            r#"
            [capture]
            device_id = 1
            width = 1280
            height = 720
            grayscale = true

            [engine]
            mode = "tongue"
            preset = "strict"
            cache_capacity = 0
            assess_every = 10

            [thresholds.blur]
            excellent = 0.9
            good = 0.6
            fair = 0.3

            [thresholds.weights.tongue]
            blur = 0.5
            lighting = 0.3
            composition = 0.2
            resolution = 0.0
            "#,
        )
        .unwrap();

        assert_eq!(config.capture.device_id, 1);
        assert_eq!(config.capture.pixel_format(), PixelFormat::Gray);
        assert_eq!(config.engine.mode, CaptureMode::Tongue);
        assert_eq!(config.engine.validator_config().cache_capacity, 0);

        let thresholds = config.quality_thresholds().unwrap();
        assert_eq!(thresholds.blur.good, 0.6);
        assert_eq!(thresholds.weights_for(CaptureMode::Tongue).resolution, 0.0);
        assert_eq!(
            thresholds.lighting,
            QualityThresholds::strict().lighting,
            "sections without overrides keep the preset"
        );
    }

    #[test]
    fn test_inconsistent_thresholds_rejected() {
        let result = FileConfig::from_toml(
            r#"
            [thresholds.categories]
            excellent = 50.0
            good = 70.0
            fair = 40.0
            "#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidThresholds(_))));
    }

    #[test]
    fn test_zero_cadence_rejected() {
        let result = FileConfig::from_toml("[engine]\nassess_every = 0\n");
        assert!(matches!(result, Err(ConfigError::InvalidCadence)));
    }

    #[test]
    fn test_unparseable_file() {
        assert!(matches!(
            FileConfig::from_toml("[engine\nmode = 3"),
            Err(ConfigError::ParseError(_))
        ));
    }
}
