//! Tracking markers and their per-frame history.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Bound;

use serde::{Deserialize, Serialize};

use crate::geometry::{ImageSize, Point};
use crate::{Error, Result};

/// Stable, opaque marker identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MarkerId(pub u32);

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Recorded state of a marker at one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerState {
    /// Position in native space.
    pub position: Point,
    /// Lost flag. A muted record still carries the last known position.
    pub muted: bool,
}

impl MarkerState {
    pub fn active(position: Point) -> Self {
        Self { position, muted: false }
    }

    pub fn lost(position: Point) -> Self {
        Self { position, muted: true }
    }
}

/// Pattern and search areas of a marker, in normalized units relative to
/// the marker position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerPattern {
    /// Corners in order (-,-), (+,-), (+,+), (-,+).
    pub pattern_corners: [Point; 4],
    pub search_min: Point,
    pub search_max: Point,
}

impl MarkerPattern {
    /// Build the pattern from pixel sizes.
    ///
    /// Pattern corners sit at `±pattern_size / w`, `±pattern_size / h`.
    /// The search box spans `search_size` pixels centered on the marker.
    pub fn from_sizes(pattern_size: f64, search_size: f64, size: ImageSize) -> Result<Self> {
        size.validate()?;
        let ratio_x = pattern_size / size.w();
        let ratio_y = pattern_size / size.h();
        const SIGNS: [(f64, f64); 4] = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
        let pattern_corners = SIGNS.map(|(sx, sy)| Point::new(ratio_x * sx, ratio_y * sy));

        let a = -search_size / 2.0 / size.w();
        let b = -search_size / 2.0 / size.h();

        Ok(Self {
            pattern_corners,
            search_min: Point::new(a, b),
            search_max: Point::new(-a, -b),
        })
    }
}

/// A tracked marker.
///
/// History is sparse: a frame without an entry inherits the state of the
/// closest earlier entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Marker {
    pub id: MarkerId,
    pub name: String,
    pub pattern: Option<MarkerPattern>,
    history: BTreeMap<i64, MarkerState>,
}

impl Marker {
    /// Create a marker with an initial active record at `frame`.
    pub fn new(id: MarkerId, name: impl Into<String>, position: Point, frame: i64) -> Self {
        let mut history = BTreeMap::new();
        history.insert(frame, MarkerState::active(position));
        Self {
            id,
            name: name.into(),
            pattern: None,
            history,
        }
    }

    /// Create a marker with no history at all.
    pub fn empty(id: MarkerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            pattern: None,
            history: BTreeMap::new(),
        }
    }

    /// Record an active position at `frame`, replacing any existing record.
    pub fn insert_frame(&mut self, frame: i64, position: Point) {
        self.history.insert(frame, MarkerState::active(position));
    }

    /// Record an explicit state at `frame`, replacing any existing record.
    pub fn insert_state(&mut self, frame: i64, state: MarkerState) {
        self.history.insert(frame, state);
    }

    /// Record the marker as lost at `frame`, carrying its last known position.
    pub fn mute_frame(&mut self, frame: i64) -> Result<()> {
        let (_, state) = self.state_at(frame).ok_or(Error::MissingHistory {
            marker: self.id,
            frame,
        })?;
        let position = state.position;
        self.history.insert(frame, MarkerState::lost(position));
        Ok(())
    }

    /// Latest record strictly before `frame`.
    pub fn state_before(&self, frame: i64) -> Option<(i64, &MarkerState)> {
        self.history
            .range((Bound::Unbounded, Bound::Excluded(frame)))
            .next_back()
            .map(|(&f, s)| (f, s))
    }

    /// Latest record at or before `frame`.
    pub fn state_at(&self, frame: i64) -> Option<(i64, &MarkerState)> {
        self.history.range(..=frame).next_back().map(|(&f, s)| (f, s))
    }

    /// Last known position before `frame`, or a missing-history error.
    pub fn last_position_before(&self, frame: i64) -> Result<Point> {
        self.state_before(frame)
            .map(|(_, s)| s.position)
            .ok_or(Error::MissingHistory {
                marker: self.id,
                frame,
            })
    }

    /// Effective position at `frame`.
    pub fn position_at(&self, frame: i64) -> Option<Point> {
        self.state_at(frame).map(|(_, s)| s.position)
    }

    /// Whether the marker is lost as of `frame`.
    ///
    /// A marker with no history at or before `frame` is not considered lost.
    pub fn is_lost_at(&self, frame: i64) -> bool {
        self.state_at(frame).map(|(_, s)| s.muted).unwrap_or(false)
    }

    /// Explicit record at exactly `frame`, if any.
    pub fn record(&self, frame: i64) -> Option<&MarkerState> {
        self.history.get(&frame)
    }

    /// Iterate explicit records in frame order.
    pub fn history(&self) -> impl Iterator<Item = (i64, &MarkerState)> {
        self.history.iter().map(|(&f, s)| (f, s))
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn first_frame(&self) -> Option<i64> {
        self.history.keys().next().copied()
    }

    pub fn last_frame(&self) -> Option<i64> {
        self.history.keys().next_back().copied()
    }
}

/// In-memory marker store.
///
/// Markers keep their creation order, which is also the order the tracker
/// visits them in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkerSet {
    markers: Vec<Marker>,
    next_id: u32,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a marker with a generated name (`Track`, `Track.001`, ...).
    pub fn add_marker(&mut self, position: Point, frame: i64) -> MarkerId {
        let name = Self::default_name(self.markers.len());
        self.add_named(name, position, frame)
    }

    /// Add a marker with an explicit name.
    pub fn add_named(&mut self, name: impl Into<String>, position: Point, frame: i64) -> MarkerId {
        let id = self.next_marker_id();
        self.markers.push(Marker::new(id, name, position, frame));
        id
    }

    /// Insert a marker built elsewhere, assigning it a fresh id.
    pub fn push(&mut self, mut marker: Marker) -> MarkerId {
        let id = self.next_marker_id();
        marker.id = id;
        self.markers.push(marker);
        id
    }

    pub fn get(&self, id: MarkerId) -> Option<&Marker> {
        self.markers.iter().find(|m| m.id == id)
    }

    pub fn get_mut(&mut self, id: MarkerId) -> Option<&mut Marker> {
        self.markers.iter_mut().find(|m| m.id == id)
    }

    /// Look up a marker, failing with [`Error::UnknownMarker`].
    pub fn try_get(&self, id: MarkerId) -> Result<&Marker> {
        self.get(id).ok_or(Error::UnknownMarker(id))
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn markers_mut(&mut self) -> &mut [Marker] {
        &mut self.markers
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Marker> {
        self.markers.iter()
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Number of markers lost as of `frame`.
    pub fn lost_count(&self, frame: i64) -> usize {
        self.markers.iter().filter(|m| m.is_lost_at(frame)).count()
    }

    fn next_marker_id(&mut self) -> MarkerId {
        let id = MarkerId(self.next_id);
        self.next_id += 1;
        id
    }

    fn default_name(index: usize) -> String {
        if index == 0 {
            "Track".to_string()
        } else {
            format!("Track.{:03}", index)
        }
    }
}

impl<'a> IntoIterator for &'a MarkerSet {
    type Item = &'a Marker;
    type IntoIter = std::slice::Iter<'a, Marker>;

    fn into_iter(self) -> Self::IntoIter {
        self.markers.iter()
    }
}
