//! Assessment cadence for live capture.
//!
//! Convolution passes are O(pixels), so a preview loop assesses every N-th
//! frame rather than each one.

use super::Frame;

/// Selects every `every`-th frame for assessment.
pub struct FrameThrottle {
    /// Assess one frame out of this many.
    every: u32,
    /// Frames offered since the last assessed frame.
    since_last: u32,
    /// Frames offered in total.
    offered: u64,
    /// Frames selected in total.
    selected: u64,
}

impl FrameThrottle {
    /// Creates a throttle; a cadence of 0 is treated as 1.
    pub fn new(every: u32) -> Self {
        Self {
            every: every.max(1),
            since_last: 0,
            offered: 0,
            selected: 0,
        }
    }

    /// Returns true when this frame should be assessed.
    ///
    /// The first frame offered is always selected so feedback appears
    /// immediately.
    pub fn should_assess(&mut self, frame: &Frame) -> bool {
        self.offered += 1;
        let due = self.offered == 1 || self.since_last + 1 >= self.every;
        if due {
            self.since_last = 0;
            self.selected += 1;
            tracing::trace!(sequence = frame.sequence(), "Frame selected for assessment");
        } else {
            self.since_last += 1;
        }
        due
    }

    /// Configured cadence.
    #[inline]
    pub fn every(&self) -> u32 {
        self.every
    }

    /// Frames offered so far.
    #[inline]
    pub fn offered(&self) -> u64 {
        self.offered
    }

    /// Frames selected so far.
    #[inline]
    pub fn selected(&self) -> u64 {
        self.selected
    }

    /// Forgets progress; the next frame is selected.
    pub fn reset(&mut self) {
        self.since_last = 0;
        self.offered = 0;
        self.selected = 0;
    }
}

impl Default for FrameThrottle {
    fn default() -> Self {
        Self::new(5)
    }
}
