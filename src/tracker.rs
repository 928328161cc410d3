//! Cross-frame marker correspondence.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::geometry::{space_to_normalized, ImageSize, Point};
use crate::marker::{Marker, MarkerId, MarkerState};
use crate::matching::{validate_threshold, CandidatePool};
use crate::{Error, Result};

/// Configuration for the tracker and the session driving it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Maximum distance, in pixels of image width, a marker may move between
    /// consecutive frames.
    pub max_distance: f64,

    /// Minimum number of pixels a blob must exceed to become a detection.
    pub min_cluster_size: u32,

    /// Blobs whose center row is at or above this native y (counted from the
    /// top) are ignored, e.g. a watermark band.
    pub ignore_height: f64,

    /// Pattern box size of new markers, in pixels.
    pub pattern_size: f64,

    /// Search box size of new markers, in pixels.
    pub search_size: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_distance: 40.0,
            min_cluster_size: 25,
            ignore_height: 0.0,
            pattern_size: 11.0,
            search_size: 61.0,
        }
    }
}

impl TrackerConfig {
    /// Create a configuration with the given pixel distance and defaults elsewhere.
    pub fn new(max_distance: f64) -> Self {
        Self {
            max_distance,
            ..Self::default()
        }
    }

    /// Check every field against its allowed range.
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.max_distance)?;

        if !(1..=50).contains(&self.min_cluster_size) {
            return Err(Error::InvalidConfig(format!(
                "min_cluster_size must be in 1..=50, got {}",
                self.min_cluster_size
            )));
        }

        if !self.ignore_height.is_finite() || self.ignore_height < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "ignore_height must be finite and non-negative, got {}",
                self.ignore_height
            )));
        }

        if !(3.0..=20.0).contains(&self.pattern_size) {
            return Err(Error::InvalidConfig(format!(
                "pattern_size must be in 3..=20, got {}",
                self.pattern_size
            )));
        }

        if !(20.0..=80.0).contains(&self.search_size) {
            return Err(Error::InvalidConfig(format!(
                "search_size must be in 20..=80, got {}",
                self.search_size
            )));
        }

        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        let contents = std::fs::read_to_string(&path).map_err(|e| {
            Error::IoError(std::io::Error::new(
                e.kind(),
                format!("failed to read config file '{}': {}", path_str, e),
            ))
        })?;
        Self::from_json_str(&contents)
    }

    /// `max_distance` expressed in normalized units for an image of `size`.
    ///
    /// The pixel value is divided by the image width only. Normalized y is
    /// scaled by height, so on a non-square image the vertical allowance is
    /// `max_distance * height / width` pixels: 40 px on 1920x1080 allows
    /// 40 px horizontally but 22.5 px vertically.
    pub fn normalized_max_distance(&self, size: ImageSize) -> Result<f64> {
        size.validate()?;
        Ok(self.max_distance / size.w())
    }
}

/// Outcome of one [`Tracker::advance`] pass.
#[derive(Debug, Default)]
pub struct AdvanceReport {
    /// Frame the pass was run for.
    pub frame: i64,
    /// Active markers that found a detection.
    pub matched: Vec<MarkerId>,
    /// Active markers that found nothing and were muted at `frame`.
    pub lost: Vec<MarkerId>,
    /// Lost markers that were re-acquired.
    pub recovered: Vec<MarkerId>,
    /// Lost markers that stayed lost.
    pub still_lost: Vec<MarkerId>,
    /// Detections nobody claimed.
    pub discarded: usize,
    /// Per-marker failures. Other markers were still processed.
    pub errors: Vec<Error>,
}

impl AdvanceReport {
    fn new(frame: i64) -> Self {
        Self {
            frame,
            ..Self::default()
        }
    }

    /// True if no marker failed.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Markers that ended up matched, either directly or by recovery.
    pub fn found(&self) -> impl Iterator<Item = MarkerId> + '_ {
        self.matched.iter().chain(self.recovered.iter()).copied()
    }

    /// Ids of markers that failed with missing history.
    pub fn failed_markers(&self) -> Vec<MarkerId> {
        self.errors
            .iter()
            .filter_map(|e| match e {
                Error::MissingHistory { marker, .. } => Some(*marker),
                _ => None,
            })
            .collect()
    }
}

/// Marker correspondence tracker.
///
/// Stateless between frames: all state lives in the marker histories.
#[derive(Debug, Clone)]
pub struct Tracker {
    /// Tracker configuration.
    pub config: TrackerConfig,
}

impl Tracker {
    /// Create a new tracker with the given configuration.
    pub fn new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Move markers onto the detections of `frame`.
    ///
    /// Runs two first-fit passes over `detections` (native space):
    /// markers active before `frame` claim detections first, in marker order,
    /// then markers that were already lost try to recover from what is left.
    /// Active markers with no candidate are muted at `frame`.
    ///
    /// Consumed detections are removed from `detections`; what remains
    /// afterwards was discarded and spawns nothing.
    ///
    /// # Arguments
    /// * `markers` - Markers in enumeration order
    /// * `detections` - Detection pool for `frame`, native space
    /// * `frame` - Target frame, after every marker's previous record
    /// * `image_size` - Image dimensions, both non-zero
    /// * `max_distance` - Exclusive match bound in normalized space
    ///
    /// # Errors
    /// Fails before touching anything on a degenerate `image_size` or an
    /// invalid `max_distance`. Missing marker history is reported per marker
    /// in [`AdvanceReport::errors`].
    pub fn advance(
        &self,
        markers: &mut [Marker],
        detections: &mut Vec<Point>,
        frame: i64,
        image_size: ImageSize,
        max_distance: f64,
    ) -> Result<AdvanceReport> {
        image_size.validate()?;
        validate_threshold(max_distance)?;

        let mut report = AdvanceReport::new(frame);

        let normalized: Vec<Point> = detections
            .iter()
            .map(|p| space_to_normalized(p, image_size))
            .collect();
        let mut pool = CandidatePool::new(std::mem::take(detections), normalized);

        // Split markers by their state before this frame
        let mut lost_indices = Vec::new();

        // STAGE 1: active markers claim detections
        for (idx, marker) in markers.iter_mut().enumerate() {
            let (last_pos, was_muted) = match marker.state_before(frame) {
                Some((_, state)) => (state.position, state.muted),
                None => {
                    warn!(marker = %marker.id, frame, "no recorded state before frame");
                    report.errors.push(Error::MissingHistory {
                        marker: marker.id,
                        frame,
                    });
                    continue;
                }
            };

            if was_muted {
                lost_indices.push(idx);
                continue;
            }

            let origin = space_to_normalized(&last_pos, image_size);
            match pool.take_first_within(&origin, max_distance) {
                Some(point) => {
                    debug!(marker = %marker.id, frame, x = point.x, y = point.y, "marker matched");
                    marker.insert_frame(frame, point);
                    report.matched.push(marker.id);
                }
                None => {
                    debug!(marker = %marker.id, frame, "marker lost");
                    marker.insert_state(frame, MarkerState::lost(last_pos));
                    report.lost.push(marker.id);
                }
            }
        }

        // STAGE 2: previously lost markers try the leftovers
        for idx in lost_indices {
            let marker = &mut markers[idx];
            let last_pos = match marker.last_position_before(frame) {
                Ok(pos) => pos,
                Err(e) => {
                    report.errors.push(e);
                    continue;
                }
            };

            let origin = space_to_normalized(&last_pos, image_size);
            match pool.take_first_within(&origin, max_distance) {
                Some(point) => {
                    debug!(marker = %marker.id, frame, x = point.x, y = point.y, "marker recovered");
                    marker.insert_frame(frame, point);
                    report.recovered.push(marker.id);
                }
                None => report.still_lost.push(marker.id),
            }
        }

        report.discarded = pool.len();
        *detections = pool.into_remaining();

        Ok(report)
    }

    /// [`advance`](Self::advance) with the configured pixel distance,
    /// normalized by the image width.
    pub fn advance_configured(
        &self,
        markers: &mut [Marker],
        detections: &mut Vec<Point>,
        frame: i64,
        image_size: ImageSize,
    ) -> Result<AdvanceReport> {
        let max_distance = self.config.normalized_max_distance(image_size)?;
        self.advance(markers, detections, frame, image_size, max_distance)
    }
}
