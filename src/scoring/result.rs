//! The verdict returned to capture UIs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::issue::{QualityIssue, Severity};
use crate::analysis::{CaptureMode, QualityMetrics};

/// Overall quality band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityCategory {
    /// Retake required.
    Poor,
    /// Usable but a retake is advised.
    Fair,
    /// Usable.
    Good,
    /// Ready for downstream use.
    Excellent,
}

impl QualityCategory {
    /// Lowercase name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            QualityCategory::Excellent => "excellent",
            QualityCategory::Good => "good",
            QualityCategory::Fair => "fair",
            QualityCategory::Poor => "poor",
        }
    }
}

impl std::fmt::Display for QualityCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context of an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMetadata {
    /// Mode the capture was judged for.
    pub mode: CaptureMode,
    /// Width of the acquired buffer.
    pub source_width: u32,
    /// Height of the acquired buffer.
    pub source_height: u32,
    /// Width after pre-downscaling.
    pub analyzed_width: u32,
    /// Height after pre-downscaling.
    pub analyzed_height: u32,
    /// Wall-clock analysis time, when timing was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
    /// When the analysis ran, when timing was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzed_at: Option<DateTime<Utc>>,
}

/// Immutable result of one analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityResult {
    category: QualityCategory,
    score: f64,
    suggestions: Vec<String>,
    issues: Vec<QualityIssue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<ResultMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics: Option<QualityMetrics>,
}

impl QualityResult {
    pub(crate) fn new(
        category: QualityCategory,
        score: f64,
        issues: Vec<QualityIssue>,
        suggestions: Vec<String>,
        metadata: Option<ResultMetadata>,
        metrics: Option<QualityMetrics>,
    ) -> Self {
        Self {
            category,
            score,
            suggestions,
            issues,
            metadata,
            metrics,
        }
    }

    /// Quality band of the overall score.
    #[inline]
    pub fn category(&self) -> QualityCategory {
        self.category
    }

    /// Overall score in `[0, 100]`.
    #[inline]
    pub fn score(&self) -> f64 {
        self.score
    }

    /// Issues, most severe first.
    #[inline]
    pub fn issues(&self) -> &[QualityIssue] {
        &self.issues
    }

    /// Actionable advice, one per issue, deduplicated.
    #[inline]
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    /// Mode and dimensions, when available.
    #[inline]
    pub fn metadata(&self) -> Option<&ResultMetadata> {
        self.metadata.as_ref()
    }

    /// Per-metric detail, present when detailed output was requested.
    #[inline]
    pub fn metrics(&self) -> Option<&QualityMetrics> {
        self.metrics.as_ref()
    }

    /// Whether a capture UI should ask for a retake: a fair or poor verdict,
    /// or any high-severity issue.
    pub fn needs_retake(&self) -> bool {
        self.category <= QualityCategory::Fair
            || self.issues.iter().any(|i| i.severity == Severity::High)
    }
}
