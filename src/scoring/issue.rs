//! Quality issues.

use serde::{Deserialize, Serialize};

/// Metric an issue belongs to. Declaration order is the tie-break order
/// when issues of equal severity are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueType {
    /// Sharpness.
    Blur,
    /// Brightness, contrast and exposure.
    Lighting,
    /// Subject placement and coverage.
    Composition,
    /// Pixel count.
    Resolution,
}

impl IssueType {
    /// Lowercase name, as serialized and used in metric labels.
    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::Blur => "blur",
            IssueType::Lighting => "lighting",
            IssueType::Composition => "composition",
            IssueType::Resolution => "resolution",
        }
    }
}

impl std::fmt::Display for IssueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Specific cause of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Defect {
    /// Sharpness below the good cutoff.
    Blurry,
    /// Mean brightness below the minimum.
    TooDark,
    /// Mean brightness above the maximum.
    TooBright,
    /// Too many blocked shadows.
    Underexposed,
    /// Too many clipped highlights.
    Overexposed,
    /// Contrast below the minimum.
    LowContrast,
    /// Contrast above the maximum.
    HarshContrast,
    /// Lighting score low without a single dominant cause.
    UnevenLighting,
    /// No salient subject located.
    SubjectNotFound,
    /// Coverage of the expected region too low.
    SubjectTooSmall,
    /// Subject centroid too far from the expected centre.
    OffCenter,
    /// Pixel count below the mode's minimum.
    LowResolution,
}

impl Defect {
    /// Metric the defect is reported under.
    pub fn issue_type(self) -> IssueType {
        match self {
            Defect::Blurry => IssueType::Blur,
            Defect::TooDark
            | Defect::TooBright
            | Defect::Underexposed
            | Defect::Overexposed
            | Defect::LowContrast
            | Defect::HarshContrast
            | Defect::UnevenLighting => IssueType::Lighting,
            Defect::SubjectNotFound | Defect::SubjectTooSmall | Defect::OffCenter => {
                IssueType::Composition
            }
            Defect::LowResolution => IssueType::Resolution,
        }
    }

    /// Short description used as the issue message.
    pub fn description(self) -> &'static str {
        match self {
            Defect::Blurry => "Image is blurry",
            Defect::TooDark => "Image is too dark",
            Defect::TooBright => "Image is too bright",
            Defect::Underexposed => "Shadows are underexposed",
            Defect::Overexposed => "Highlights are overexposed",
            Defect::LowContrast => "Contrast is too low",
            Defect::HarshContrast => "Lighting is harsh",
            Defect::UnevenLighting => "Lighting is uneven",
            Defect::SubjectNotFound => "Subject could not be located",
            Defect::SubjectTooSmall => "Subject does not fill the expected area",
            Defect::OffCenter => "Subject is off-centre",
            Defect::LowResolution => "Resolution is too low",
        }
    }
}

/// How far past its threshold a metric lies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Marginal; the capture is probably usable.
    Low,
    /// Noticeable; a retake would help.
    Medium,
    /// Retake recommended.
    High,
}

impl Severity {
    /// Grades a relative shortfall: under 25% low, under 50% medium, else high.
    pub fn from_shortfall(shortfall: f64) -> Self {
        if shortfall < 0.25 {
            Severity::Low
        } else if shortfall < 0.5 {
            Severity::Medium
        } else {
            Severity::High
        }
    }

    /// Lowercase name, as serialized.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One problem found in a capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    /// Metric the issue is filed under.
    pub issue_type: IssueType,
    /// Specific cause.
    pub defect: Defect,
    /// How far past its threshold the metric lies.
    pub severity: Severity,
    /// Human-readable summary.
    pub message: String,
    /// Confidence in `[0, 1]` that the defect is real.
    pub confidence: f64,
}

impl QualityIssue {
    /// Files the issue under the defect's metric.
    pub fn new(defect: Defect, severity: Severity, message: String, confidence: f64) -> Self {
        Self {
            issue_type: defect.issue_type(),
            defect,
            severity,
            message,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}
