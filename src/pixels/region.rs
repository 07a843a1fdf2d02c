//! Regions of interest in pixel and relative coordinates.

use serde::{Deserialize, Serialize};

/// A rectangular region of interest in pixel coordinates.
///
/// A `Roi` may extend past the bounds of the buffer it is applied to;
/// consumers clamp it with [`Roi::clamp_to`] rather than rejecting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Roi {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Roi {
    /// Creates a new region.
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Area in pixels.
    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns true when the region covers no pixels.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Exclusive right edge, saturating.
    #[inline]
    pub fn right(&self) -> u32 {
        self.x.saturating_add(self.width)
    }

    /// Exclusive bottom edge, saturating.
    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y.saturating_add(self.height)
    }

    /// Geometric centre of the region.
    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Clamps the region to a `width` x `height` buffer.
    ///
    /// A region lying entirely outside the buffer collapses to a zero-area
    /// region anchored at the nearest edge.
    pub fn clamp_to(&self, width: u32, height: u32) -> Roi {
        let x0 = self.x.min(width);
        let y0 = self.y.min(height);
        let x1 = self.right().min(width);
        let y1 = self.bottom().min(height);
        Roi::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Intersection of two regions; zero-area when they do not overlap.
    pub fn intersection(&self, other: &Roi) -> Roi {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        if x1 <= x0 || y1 <= y0 {
            return Roi::new(x0, y0, 0, 0);
        }
        Roi::new(x0, y0, x1 - x0, y1 - y0)
    }
}

/// A region expressed as fractions of the frame, independent of resolution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeRoi {
    /// Left edge as a fraction of frame width.
    pub x: f64,
    /// Top edge as a fraction of frame height.
    pub y: f64,
    /// Width as a fraction of frame width.
    pub width: f64,
    /// Height as a fraction of frame height.
    pub height: f64,
}

impl RelativeRoi {
    /// Creates a new relative region.
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Resolves the region against concrete frame dimensions.
    ///
    /// Fractions are clamped to `[0, 1]` so a malformed region still yields
    /// a pixel region inside the frame.
    pub fn resolve(&self, width: u32, height: u32) -> Roi {
        let fx = self.x.clamp(0.0, 1.0);
        let fy = self.y.clamp(0.0, 1.0);
        let fw = self.width.clamp(0.0, 1.0 - fx);
        let fh = self.height.clamp(0.0, 1.0 - fy);

        let x = (fx * width as f64).round() as u32;
        let y = (fy * height as f64).round() as u32;
        let w = (fw * width as f64).round() as u32;
        let h = (fh * height as f64).round() as u32;
        Roi::new(x, y, w, h).clamp_to(width, height)
    }
}

/// A relative region with a human-readable name, e.g. a face zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRegion {
    /// Zone name used in feedback messages.
    pub name: String,
    /// Zone bounds relative to the frame.
    pub region: RelativeRoi,
}

impl NamedRegion {
    /// Creates a named region.
    pub fn new(name: impl Into<String>, region: RelativeRoi) -> Self {
        Self {
            name: name.into(),
            region,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_inside_is_identity() {
        let roi = Roi::new(2, 3, 4, 5);
        assert_eq!(roi.clamp_to(100, 100), roi);
    }

    #[test]
    fn test_clamp_partially_outside() {
        let roi = Roi::new(8, 8, 10, 10);
        assert_eq!(roi.clamp_to(12, 10), Roi::new(8, 8, 4, 2));
    }

    #[test]
    fn test_clamp_fully_outside_is_empty() {
        let roi = Roi::new(50, 50, 10, 10).clamp_to(20, 20);
        assert!(roi.is_empty());
        assert_eq!(roi.area(), 0);
    }

    #[test]
    fn test_clamp_saturates_huge_extent() {
        let roi = Roi::new(u32::MAX - 1, 0, u32::MAX, 5).clamp_to(10, 10);
        assert!(roi.is_empty());
    }

    #[test]
    fn test_intersection() {
        let a = Roi::new(0, 0, 10, 10);
        let b = Roi::new(5, 5, 10, 10);
        assert_eq!(a.intersection(&b), Roi::new(5, 5, 5, 5));

        let c = Roi::new(20, 20, 2, 2);
        assert_eq!(a.intersection(&c).area(), 0);
    }

    #[test]
    fn test_relative_resolve() {
        let third = RelativeRoi::new(1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0);
        assert_eq!(third.resolve(300, 150), Roi::new(100, 50, 100, 50));
    }

    #[test]
    fn test_relative_resolve_clamps_overflowing_fractions() {
        let roi = RelativeRoi::new(0.8, -0.5, 0.5, 2.0).resolve(100, 100);
        assert_eq!(roi, Roi::new(80, 0, 20, 100));
    }
}
