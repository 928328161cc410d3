//! Frame driver: seeds markers on one frame, then steps through the
//! following frames, detecting and advancing the markers on each.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::detection::Detector;
use crate::geometry::ImageSize;
use crate::marker::{Marker, MarkerId, MarkerPattern, MarkerSet};
use crate::tracker::{AdvanceReport, Tracker, TrackerConfig};
use crate::{Error, Result};

/// One materialized frame.
#[derive(Debug, Clone)]
pub struct Frame<I> {
    pub image: I,
    pub size: ImageSize,
}

impl<I> Frame<I> {
    pub fn new(image: I, size: ImageSize) -> Self {
        Self { image, size }
    }
}

/// Supplies frame images, e.g. by decoding a movie or reading an image sequence.
pub trait FrameSource {
    type Image;

    fn frame(&mut self, frame: i64) -> Result<Frame<Self::Image>>;
}

/// Summary of a [`TrackingSession::run`].
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    /// Frame the run started from.
    pub start_frame: i64,
    /// Last frame processed (equal to `start_frame` if none were).
    pub last_frame: i64,
    pub frames_processed: usize,
    pub cancelled: bool,
    /// Total per-marker missing-history reports over the run.
    pub missing_history: usize,
    pub elapsed: Duration,
}

/// Drives a [`Tracker`] over consecutive frames.
pub struct TrackingSession<S, D> {
    source: S,
    detector: D,
    tracker: Tracker,
    markers: MarkerSet,
    current: i64,
}

impl<S, D> TrackingSession<S, D>
where
    S: FrameSource,
    D: Detector<S::Image>,
{
    /// Create a session with no markers, positioned at `frame`.
    pub fn new(source: S, detector: D, config: TrackerConfig, frame: i64) -> Result<Self> {
        Ok(Self {
            source,
            detector,
            tracker: Tracker::new(config)?,
            markers: MarkerSet::new(),
            current: frame,
        })
    }

    /// Create a session over existing markers, positioned at `frame`.
    pub fn with_markers(
        source: S,
        detector: D,
        config: TrackerConfig,
        markers: MarkerSet,
        frame: i64,
    ) -> Result<Self> {
        let mut session = Self::new(source, detector, config, frame)?;
        session.markers = markers;
        Ok(session)
    }

    /// Detect on the current frame and add one marker per detection.
    ///
    /// New markers get pattern and search areas from the configuration.
    pub fn seed(&mut self) -> Result<Vec<MarkerId>> {
        let frame = self.current;
        let Frame { image, size } = self.source.frame(frame)?;
        let points = self.detector.detect(&image, size)?;
        let pattern = MarkerPattern::from_sizes(
            self.tracker.config.pattern_size,
            self.tracker.config.search_size,
            size,
        )?;

        let ids: Vec<MarkerId> = points
            .into_iter()
            .map(|point| {
                let id = self.markers.add_marker(point, frame);
                if let Some(marker) = self.markers.get_mut(id) {
                    marker.pattern = Some(pattern);
                }
                id
            })
            .collect();

        info!(frame, markers = ids.len(), "markers seeded");
        Ok(ids)
    }

    /// Move to the next frame and advance every marker onto it.
    pub fn step(&mut self) -> Result<AdvanceReport> {
        let started = Instant::now();
        let frame = self.current + 1;

        let Frame { image, size } = self.source.frame(frame)?;
        let mut points = self.detector.detect(&image, size)?;
        let report = self
            .tracker
            .advance_configured(self.markers.markers_mut(), &mut points, frame, size)?;
        self.current = frame;

        for e in &report.errors {
            warn!(frame, error = %e, "marker skipped");
        }
        debug!(
            frame,
            matched = report.matched.len(),
            lost = report.lost.len(),
            recovered = report.recovered.len(),
            discarded = report.discarded,
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "frame processed"
        );
        Ok(report)
    }

    /// Step until `end` is reached or `cancel` is set.
    pub fn run(&mut self, end: i64, cancel: &AtomicBool) -> Result<SessionSummary> {
        self.run_with_progress(end, cancel, |_, _| {})
    }

    /// Like [`run`](Self::run), calling `on_step` after each frame with the
    /// fraction of the run completed so far.
    pub fn run_with_progress<F>(
        &mut self,
        end: i64,
        cancel: &AtomicBool,
        mut on_step: F,
    ) -> Result<SessionSummary>
    where
        F: FnMut(f64, &AdvanceReport),
    {
        let started = Instant::now();
        let start_frame = self.current;
        let total = (end - start_frame).max(0) as usize;

        let mut summary = SessionSummary {
            start_frame,
            last_frame: start_frame,
            frames_processed: 0,
            cancelled: false,
            missing_history: 0,
            elapsed: Duration::ZERO,
        };

        while self.current < end {
            if cancel.load(Ordering::Relaxed) {
                summary.cancelled = true;
                break;
            }

            let report = self.step()?;
            summary.frames_processed += 1;
            summary.last_frame = self.current;
            summary.missing_history += report.failed_markers().len();

            let progress = summary.frames_processed as f64 / total as f64;
            on_step(progress, &report);
        }

        summary.elapsed = started.elapsed();
        info!(
            start = summary.start_frame,
            last = summary.last_frame,
            frames = summary.frames_processed,
            cancelled = summary.cancelled,
            "finished in {:.2} seconds",
            summary.elapsed.as_secs_f64()
        );
        Ok(summary)
    }

    pub fn current_frame(&self) -> i64 {
        self.current
    }

    pub fn markers(&self) -> &MarkerSet {
        &self.markers
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    pub fn marker(&self, id: MarkerId) -> Result<&Marker> {
        self.markers.try_get(id)
    }

    pub fn into_markers(self) -> MarkerSet {
        self.markers
    }
}

impl<S, D> std::fmt::Debug for TrackingSession<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackingSession")
            .field("tracker", &self.tracker)
            .field("markers", &self.markers.len())
            .field("current", &self.current)
            .finish()
    }
}

/// Frame source over pre-rendered frames, keyed from `first_frame`.
#[derive(Debug, Clone)]
pub struct VecFrameSource<I> {
    first_frame: i64,
    frames: Vec<Frame<I>>,
}

impl<I: Clone> VecFrameSource<I> {
    pub fn new(first_frame: i64, frames: Vec<Frame<I>>) -> Self {
        Self { first_frame, frames }
    }
}

impl<I: Clone> FrameSource for VecFrameSource<I> {
    type Image = I;

    fn frame(&mut self, frame: i64) -> Result<Frame<I>> {
        usize::try_from(frame - self.first_frame)
            .ok()
            .and_then(|idx| self.frames.get(idx))
            .cloned()
            .ok_or_else(|| Error::Source(format!("frame {} out of range", frame)))
    }
}
