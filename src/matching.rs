//! Marker-to-detection candidate search.
//!
//! Matching is first-fit: the first candidate (in pool order) that lies
//! strictly closer than the threshold wins, even if a later candidate is
//! nearer. Changing this to nearest-fit alters results on ambiguous frames.

use crate::geometry::{dist, Point};
use crate::{Error, Result};

/// Validate a matching threshold (finite, non-negative).
pub fn validate_threshold(max_distance: f64) -> Result<()> {
    if !max_distance.is_finite() || max_distance < 0.0 {
        return Err(Error::InvalidConfig(format!(
            "max_distance must be finite and non-negative, got {}",
            max_distance
        )));
    }
    Ok(())
}

/// Index of the first candidate strictly within `max_distance` of `origin`.
///
/// # Arguments
/// * `candidates` - Candidate points, in the same space as `origin`
/// * `origin` - Reference position
/// * `max_distance` - Exclusive distance bound
pub fn first_within(candidates: &[Point], origin: &Point, max_distance: f64) -> Option<usize> {
    candidates
        .iter()
        .position(|candidate| dist(origin, candidate) < max_distance)
}

/// Pool of unconsumed detections for one matching pass.
///
/// Keeps native-space points and their normalized counterparts side by side.
/// Removal preserves the order of the remaining candidates.
#[derive(Debug, Clone)]
pub struct CandidatePool {
    native: Vec<Point>,
    normalized: Vec<Point>,
}

impl CandidatePool {
    pub fn new(native: Vec<Point>, normalized: Vec<Point>) -> Self {
        debug_assert_eq!(native.len(), normalized.len());
        Self { native, normalized }
    }

    /// Remove and return the first candidate within range of `origin`
    /// (normalized space). Returns the native-space point.
    pub fn take_first_within(&mut self, origin: &Point, max_distance: f64) -> Option<Point> {
        let idx = first_within(&self.normalized, origin, max_distance)?;
        self.normalized.remove(idx);
        Some(self.native.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.native.len()
    }

    pub fn is_empty(&self) -> bool {
        self.native.is_empty()
    }

    /// Remaining native-space points.
    pub fn into_remaining(self) -> Vec<Point> {
        self.native
    }
}
