//! Coordinate spaces and planar distance.
//!
//! Detections arrive in *native* space (pixel-scaled, y measured from the
//! top of the image). Matching happens in *normalized* space, where both
//! axes span `[0, 1]` and y grows upward.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A 2D point. Which space it lives in is determined by context.
pub type Point = Point2<f64>;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Reject sizes with a zero dimension.
    ///
    /// Must be called before any conversion; the conversions divide by both
    /// dimensions.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidGeometry {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn w(&self) -> f64 {
        self.width as f64
    }

    #[inline]
    pub fn h(&self) -> f64 {
        self.height as f64
    }
}

impl From<(u32, u32)> for ImageSize {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

/// Convert a native-space point to normalized space.
///
/// `x' = x / w`, `y' = (h - y) / h`. `size` must have been validated.
#[inline]
pub fn space_to_normalized(p: &Point, size: ImageSize) -> Point {
    debug_assert!(size.validate().is_ok());
    let (w, h) = (size.w(), size.h());
    Point::new(p.x / w, (h - p.y) / h)
}

/// Inverse of [`space_to_normalized`].
#[inline]
pub fn normalized_to_space(p: &Point, size: ImageSize) -> Point {
    debug_assert!(size.validate().is_ok());
    let (w, h) = (size.w(), size.h());
    Point::new(p.x * w, h - p.y * h)
}

/// Planar Euclidean distance.
#[inline]
pub fn dist(a: &Point, b: &Point) -> f64 {
    nalgebra::distance(a, b)
}
