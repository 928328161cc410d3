//! Integration tests for colortrack-rs.
//!
//! These tests verify complete tracking workflows across multiple modules.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use colortrack_rs::detection::{BlobDetector, BlobLabeler};
use colortrack_rs::sequence::{sequence_frame_path, ConversionPlan};
use colortrack_rs::session::VecFrameSource;
use colortrack_rs::{
    space_to_normalized, Blob, BlobFilter, Frame, FrameSource, ImageSize, MarkerSet, Point,
    Result, Tracker, TrackerConfig, TrackingSession,
};

const SIZE: ImageSize = ImageSize { width: 640, height: 480 };

/// A 10x10 blob centered on (x, y) with enough pixels to pass the default filter.
fn blob_at(x: u32, y: u32) -> Blob {
    Blob {
        row_start: y - 5,
        row_stop: y + 5,
        col_start: x - 5,
        col_stop: x + 5,
        pixel_count: 60,
    }
}

/// Labeller whose "image" is already the list of blobs.
struct PassthroughLabeler;

impl BlobLabeler<Vec<Blob>> for PassthroughLabeler {
    fn label(&mut self, image: &Vec<Blob>) -> Result<Vec<Blob>> {
        Ok(image.clone())
    }
}

// =============================================================================
// Test 1: Complete Tracking Pipeline
// =============================================================================

#[test]
fn test_integration_complete_tracking_pipeline() {
    // Two markers: one static, one moving 4 px per frame along x
    let frames: Vec<Frame<Vec<Blob>>> = (0..20u32)
        .map(|f| Frame::new(vec![blob_at(100, 100), blob_at(300 + 4 * f, 200)], SIZE))
        .collect();

    let config = TrackerConfig::default();
    let detector = BlobDetector::new(PassthroughLabeler, BlobFilter::from_config(&config));
    let mut session =
        TrackingSession::new(VecFrameSource::new(0, frames), detector, config, 0).unwrap();

    let ids = session.seed().unwrap();
    assert_eq!(ids.len(), 2);

    let cancel = AtomicBool::new(false);
    let summary = session.run(19, &cancel).unwrap();
    assert_eq!(summary.frames_processed, 19);
    assert_eq!(summary.missing_history, 0);

    let markers = session.into_markers();
    let still = markers.get(ids[0]).unwrap();
    let moving = markers.get(ids[1]).unwrap();

    for frame in 0..20 {
        assert!(!still.is_lost_at(frame), "frame {}: static marker lost", frame);
        assert!(!moving.is_lost_at(frame), "frame {}: moving marker lost", frame);
        assert_eq!(still.position_at(frame), Some(Point::new(100.0, 100.0)));
        assert_eq!(
            moving.position_at(frame),
            Some(Point::new(300.0 + 4.0 * frame as f64, 200.0))
        );
    }
}

// =============================================================================
// Test 2: Occlusion and Re-acquisition
// =============================================================================

#[test]
fn test_integration_occlusion_and_recovery() {
    let mut frames = Vec::new();
    for f in 0..10u32 {
        let blobs = if (4..7).contains(&f) {
            vec![]
        } else {
            vec![blob_at(200 + f, 240)]
        };
        frames.push(Frame::new(blobs, SIZE));
    }

    let config = TrackerConfig::default();
    let detector = BlobDetector::new(PassthroughLabeler, BlobFilter::from_config(&config));
    let mut session =
        TrackingSession::new(VecFrameSource::new(0, frames), detector, config, 0).unwrap();
    let ids = session.seed().unwrap();

    let cancel = AtomicBool::new(false);
    let mut recovered_at = None;
    session
        .run_with_progress(9, &cancel, |_, report| {
            if !report.recovered.is_empty() {
                recovered_at = Some(report.frame);
            }
        })
        .unwrap();

    let marker = session.marker(ids[0]).unwrap();
    assert!(!marker.is_lost_at(3));
    assert!(marker.is_lost_at(4));
    assert!(marker.is_lost_at(6));
    assert!(!marker.is_lost_at(7));
    assert_eq!(recovered_at, Some(7));

    // Only the frame it was lost on gets a muted record
    assert!(marker.record(4).unwrap().muted);
    assert!(marker.record(5).is_none());
    assert!(marker.record(6).is_none());
}

// =============================================================================
// Test 3: Blob Filtering Feeds the Tracker
// =============================================================================

#[test]
fn test_integration_blob_filter_drops_small_and_ignored() {
    let mut config = TrackerConfig::default();
    config.ignore_height = 50.0;

    let small = Blob {
        pixel_count: 10,
        ..blob_at(400, 300)
    };
    let in_band = blob_at(100, 20);
    let frames = vec![Frame::new(vec![small, in_band, blob_at(320, 240)], SIZE)];

    let detector = BlobDetector::new(PassthroughLabeler, BlobFilter::from_config(&config));
    let mut session =
        TrackingSession::new(VecFrameSource::new(0, frames), detector, config, 0).unwrap();

    let ids = session.seed().unwrap();
    assert_eq!(ids.len(), 1);
    assert_eq!(
        session.marker(ids[0]).unwrap().position_at(0),
        Some(Point::new(320.0, 240.0))
    );
}

// =============================================================================
// Test 4: Cancellation Between Frames
// =============================================================================

#[test]
fn test_integration_cancel_mid_run() {
    let frames: Vec<_> = (0..10)
        .map(|_| Frame::new(vec![blob_at(100, 100)], SIZE))
        .collect();
    let config = TrackerConfig::default();
    let detector = BlobDetector::new(PassthroughLabeler, BlobFilter::from_config(&config));
    let mut session =
        TrackingSession::new(VecFrameSource::new(0, frames), detector, config, 0).unwrap();
    session.seed().unwrap();

    let cancel = AtomicBool::new(false);
    let summary = session
        .run_with_progress(9, &cancel, |progress, _| {
            if progress >= 0.3 {
                cancel.store(true, Ordering::Relaxed);
            }
        })
        .unwrap();

    assert!(summary.cancelled);
    assert_eq!(summary.frames_processed, 3);
    assert_eq!(session.current_frame(), 3);
}

// =============================================================================
// Test 5: Config File Loading
// =============================================================================

#[test]
fn test_integration_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{ "max_distance": 12.0, "min_cluster_size": 10 }}"#).unwrap();

    let config = TrackerConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.max_distance, 12.0);
    assert_eq!(config.min_cluster_size, 10);
    assert_eq!(config.pattern_size, 11.0);

    let tracker = Tracker::new(config).unwrap();
    assert_eq!(tracker.config.max_distance, 12.0);
}

#[test]
fn test_integration_config_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = TrackerConfig::from_json_file(dir.path().join("missing.json"));
    assert!(result.is_err());
}

// =============================================================================
// Test 6: Image Sequence Source
// =============================================================================

/// Frame source resolving image paths of a sequence, standing in for a decoder.
struct PathSource {
    clip_path: String,
}

impl FrameSource for PathSource {
    type Image = String;

    fn frame(&mut self, frame: i64) -> Result<Frame<String>> {
        Ok(Frame::new(sequence_frame_path(&self.clip_path, frame)?, SIZE))
    }
}

#[test]
fn test_integration_sequence_paths_drive_detection() {
    let mut seen = Vec::new();
    let detector = |path: &String, _size: ImageSize| -> Result<Vec<Point>> {
        seen.push(path.clone());
        Ok(vec![Point::new(50.0, 50.0)])
    };

    let source = PathSource {
        clip_path: "/renders/shot_00001.png".to_string(),
    };
    let mut session = TrackingSession::new(source, detector, TrackerConfig::default(), 1).unwrap();
    session.seed().unwrap();
    session.step().unwrap();
    session.step().unwrap();
    drop(session);

    assert_eq!(
        seen,
        vec![
            "/renders/shot_00001.png",
            "/renders/shot_00002.png",
            "/renders/shot_00003.png"
        ]
    );

    let plan = ConversionPlan::new("/renders/seq", 1, 3).unwrap();
    let last = plan.steps().last().unwrap();
    assert_eq!(last.frame, 3);
    assert!(last.path.ends_with("capture00003.png"));
}

// =============================================================================
// Test 7: Direct Tracker Use With Normalized Threshold
// =============================================================================

#[test]
fn test_integration_direct_advance_many_frames() {
    let tracker = Tracker::new(TrackerConfig::default()).unwrap();
    let mut markers = MarkerSet::new();
    let id = markers.add_marker(Point::new(10.0, 470.0), 0);

    // Diagonal motion, 3 px per frame on each axis
    for frame in 1..50 {
        let p = Point::new(10.0 + 3.0 * frame as f64, 470.0 - 3.0 * frame as f64);
        let report = tracker
            .advance(markers.markers_mut(), &mut vec![p], frame, SIZE, 0.02)
            .unwrap();
        assert_eq!(report.matched, vec![id], "frame {}", frame);
    }

    let last = markers.get(id).unwrap().position_at(49).unwrap();
    let normalized = space_to_normalized(&last, SIZE);
    assert!(normalized.x > 0.2 && normalized.y > 0.3);
}
