//! Detection input: blob filtering and the detector seam.
//!
//! Connected-component labelling itself happens outside this crate. A
//! labeller reports each blob's bounding slices and pixel count; this module
//! turns qualifying blobs into detection points.

use serde::{Deserialize, Serialize};

use crate::geometry::{ImageSize, Point};
use crate::tracker::TrackerConfig;
use crate::Result;

/// A labelled blob, as half-open row/column bounds plus its pixel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub row_start: u32,
    pub row_stop: u32,
    pub col_start: u32,
    pub col_stop: u32,
    /// Number of set pixels inside the bounds that belong to this blob.
    pub pixel_count: u32,
}

impl Blob {
    /// Center of the bounding box, in native space.
    pub fn center(&self) -> Point {
        Point::new(
            (self.col_start as f64 + self.col_stop as f64) / 2.0,
            (self.row_start as f64 + self.row_stop as f64) / 2.0,
        )
    }
}

/// Selects blobs large enough and outside the ignored band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlobFilter {
    /// Blobs need strictly more pixels than this.
    pub min_cluster_size: u32,
    /// Blob centers need a y strictly greater than this.
    pub ignore_height: f64,
}

impl BlobFilter {
    pub fn new(min_cluster_size: u32, ignore_height: f64) -> Self {
        Self {
            min_cluster_size,
            ignore_height,
        }
    }

    pub fn from_config(config: &TrackerConfig) -> Self {
        Self::new(config.min_cluster_size, config.ignore_height)
    }

    /// Whether `blob` should become a detection.
    pub fn accepts(&self, blob: &Blob) -> bool {
        blob.pixel_count > self.min_cluster_size && blob.center().y > self.ignore_height
    }

    /// Centers of accepted blobs, in input order.
    pub fn points(&self, blobs: &[Blob]) -> Vec<Point> {
        blobs
            .iter()
            .filter(|b| self.accepts(b))
            .map(Blob::center)
            .collect()
    }
}

/// Produces detection points for one frame image.
///
/// Points are in native space and already filtered; order matters, since
/// matching is first-fit.
pub trait Detector<I> {
    fn detect(&mut self, image: &I, size: ImageSize) -> Result<Vec<Point>>;
}

impl<I, F> Detector<I> for F
where
    F: FnMut(&I, ImageSize) -> Result<Vec<Point>>,
{
    fn detect(&mut self, image: &I, size: ImageSize) -> Result<Vec<Point>> {
        self(image, size)
    }
}

/// External connected-component labeller for a target color.
pub trait BlobLabeler<I> {
    fn label(&mut self, image: &I) -> Result<Vec<Blob>>;
}

/// Detector built from a labeller and a [`BlobFilter`].
#[derive(Debug, Clone)]
pub struct BlobDetector<L> {
    labeler: L,
    filter: BlobFilter,
}

impl<L> BlobDetector<L> {
    pub fn new(labeler: L, filter: BlobFilter) -> Self {
        Self { labeler, filter }
    }

    pub fn filter(&self) -> &BlobFilter {
        &self.filter
    }
}

impl<I, L: BlobLabeler<I>> Detector<I> for BlobDetector<L> {
    fn detect(&mut self, image: &I, _size: ImageSize) -> Result<Vec<Point>> {
        let blobs = self.labeler.label(image)?;
        let points = self.filter.points(&blobs);
        tracing::debug!(blobs = blobs.len(), points = points.len(), "blobs filtered");
        Ok(points)
    }
}
