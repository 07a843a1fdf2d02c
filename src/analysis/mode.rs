//! Capture modes.

use serde::{Deserialize, Serialize};

/// The anatomical target of a capture. Selects thresholds and the expected
/// subject framing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Close-up of the tongue; subject centred, filling the middle of the frame.
    Tongue,
    /// Head and shoulders portrait.
    Face,
    /// A body region such as a hand or limb.
    Body,
    /// No particular subject.
    #[default]
    General,
}

impl CaptureMode {
    /// All modes in declaration order.
    pub const ALL: [CaptureMode; 4] = [
        CaptureMode::Tongue,
        CaptureMode::Face,
        CaptureMode::Body,
        CaptureMode::General,
    ];

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            CaptureMode::Tongue => "tongue",
            CaptureMode::Face => "face",
            CaptureMode::Body => "body",
            CaptureMode::General => "general",
        }
    }
}

impl std::fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "tongue" => Ok(CaptureMode::Tongue),
            "face" => Ok(CaptureMode::Face),
            "body" => Ok(CaptureMode::Body),
            "general" | "default" => Ok(CaptureMode::General),
            other => Err(format!(
                "unknown capture mode '{}', expected tongue/face/body/general",
                other
            )),
        }
    }
}

/// One value per capture mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerMode<T> {
    /// Value for [`CaptureMode::Tongue`].
    pub tongue: T,
    /// Value for [`CaptureMode::Face`].
    pub face: T,
    /// Value for [`CaptureMode::Body`].
    pub body: T,
    /// Value for [`CaptureMode::General`].
    pub general: T,
}

impl<T> PerMode<T> {
    /// Value for `mode`.
    pub fn get(&self, mode: CaptureMode) -> &T {
        match mode {
            CaptureMode::Tongue => &self.tongue,
            CaptureMode::Face => &self.face,
            CaptureMode::Body => &self.body,
            CaptureMode::General => &self.general,
        }
    }

    /// Mutable value for `mode`.
    pub fn get_mut(&mut self, mode: CaptureMode) -> &mut T {
        match mode {
            CaptureMode::Tongue => &mut self.tongue,
            CaptureMode::Face => &mut self.face,
            CaptureMode::Body => &mut self.body,
            CaptureMode::General => &mut self.general,
        }
    }
}

impl<T: Clone> PerMode<T> {
    /// The same value for every mode.
    pub fn uniform(value: T) -> Self {
        Self {
            tongue: value.clone(),
            face: value.clone(),
            body: value.clone(),
            general: value,
        }
    }
}
