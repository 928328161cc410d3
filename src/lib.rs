//! # colortrack-rs - Color Marker Tracking
//!
//! Keeps a set of tracking markers in correspondence across the frames of a
//! clip, given the points where colored markers were detected in each frame.
//!
//! ## Features
//!
//! - First-fit greedy marker/detection correspondence with lost-marker recovery
//! - Sparse per-frame marker history with predecessor lookup
//! - Native/normalized coordinate conversion
//! - Blob filtering, frame driver loop and image-sequence helpers
//! - Armature bone to empty placement
//! - Optional Python bindings (`python` feature)
//!
//! ## Example
//!
//! ```rust,ignore
//! use colortrack_rs::{ImageSize, MarkerSet, Point, Tracker, TrackerConfig};
//!
//! let size = ImageSize::new(1920, 1080);
//! let mut markers = MarkerSet::new();
//! markers.add_marker(Point::new(960.0, 540.0), 0);
//!
//! let tracker = Tracker::new(TrackerConfig::default()).unwrap();
//! let mut detections = vec![Point::new(962.0, 541.0)];
//! let report = tracker
//!     .advance(markers.markers_mut(), &mut detections, 1, size, 0.02)
//!     .unwrap();
//! assert_eq!(report.matched.len(), 1);
//! ```

// Public modules
pub mod geometry;
pub mod marker;
pub mod matching;
pub mod tracker;
pub mod detection;
pub mod session;
pub mod sequence;
pub mod skeleton;

// Optional modules
#[cfg(feature = "python")]
pub mod python;

// Re-exports for convenience
pub use geometry::{ImageSize, Point, dist, normalized_to_space, space_to_normalized};
pub use marker::{Marker, MarkerId, MarkerPattern, MarkerSet, MarkerState};
pub use tracker::{AdvanceReport, Tracker, TrackerConfig};
pub use detection::{Blob, BlobFilter, Detector};
pub use session::{Frame, FrameSource, SessionSummary, TrackingSession};

// Error types
pub use crate::error::{Error, Result};

mod error {
    use thiserror::Error;

    use crate::marker::MarkerId;

    /// Errors that can occur while tracking markers
    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Invalid configuration: {0}")]
        InvalidConfig(String),

        #[error("Invalid image geometry: {width}x{height}")]
        InvalidGeometry { width: u32, height: u32 },

        #[error("Marker {marker} has no recorded state before frame {frame}")]
        MissingHistory { marker: MarkerId, frame: i64 },

        #[error("Unknown marker: {0}")]
        UnknownMarker(MarkerId),

        #[error("Frame source error: {0}")]
        Source(String),

        #[error("Detection error: {0}")]
        Detection(String),

        #[error("Config parse error: {0}")]
        ConfigParse(#[from] serde_json::Error),

        #[error("IO error: {0}")]
        IoError(#[from] std::io::Error),
    }

    /// Result type for tracking operations
    pub type Result<T> = std::result::Result<T, Error>;
}
