//! Python wrapper for the marker tracker.

use numpy::PyReadonlyArray2;
use pyo3::exceptions::{PyKeyError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::geometry::{self, ImageSize, Point};
use crate::marker::{MarkerId, MarkerSet};
use crate::{Error, Tracker, TrackerConfig};

fn to_py_err(e: Error) -> PyErr {
    match e {
        Error::UnknownMarker(_) => PyKeyError::new_err(e.to_string()),
        _ => PyValueError::new_err(e.to_string()),
    }
}

fn points_from_array(points: &PyReadonlyArray2<f64>) -> PyResult<Vec<Point>> {
    let arr = points.as_array();
    if arr.nrows() > 0 && arr.ncols() != 2 {
        return Err(PyValueError::new_err(format!(
            "detections must have shape (n, 2), got ({}, {})",
            arr.nrows(),
            arr.ncols()
        )));
    }
    Ok(arr
        .rows()
        .into_iter()
        .map(|row| Point::new(row[0], row[1]))
        .collect())
}

/// Keeps color markers in correspondence across frames.
///
/// Example:
///     >>> from colortrack_rs import MarkerTracker
///     >>> import numpy as np
///     >>>
///     >>> tracker = MarkerTracker(max_distance=40.0)
///     >>> m = tracker.add_marker(960.0, 540.0, 1)
///     >>> report = tracker.advance(np.array([[962.0, 541.0]]), 2, (1920, 1080))
///     >>> report["matched"]
///     [0]
#[pyclass(name = "MarkerTracker")]
pub struct PyMarkerTracker {
    tracker: Tracker,
    markers: MarkerSet,
}

#[pymethods]
impl PyMarkerTracker {
    /// Create a new MarkerTracker.
    ///
    /// Args:
    ///     max_distance: Maximum per-frame motion in pixels of image width. Default: 40.
    ///     min_cluster_size: Minimum blob pixel count. Default: 25.
    ///     ignore_height: Ignored band height. Default: 0.
    ///     pattern_size: Marker pattern size in pixels. Default: 11.
    ///     search_size: Marker search size in pixels. Default: 61.
    #[new]
    #[pyo3(signature = (
        max_distance=40.0,
        min_cluster_size=25,
        ignore_height=0.0,
        pattern_size=11.0,
        search_size=61.0
    ))]
    fn new(
        max_distance: f64,
        min_cluster_size: u32,
        ignore_height: f64,
        pattern_size: f64,
        search_size: f64,
    ) -> PyResult<Self> {
        let config = TrackerConfig {
            max_distance,
            min_cluster_size,
            ignore_height,
            pattern_size,
            search_size,
        };
        let tracker = Tracker::new(config).map_err(to_py_err)?;
        Ok(Self {
            tracker,
            markers: MarkerSet::new(),
        })
    }

    /// Add a marker at native position (x, y) on `frame`. Returns its id.
    #[pyo3(signature = (x, y, frame, name=None))]
    fn add_marker(&mut self, x: f64, y: f64, frame: i64, name: Option<String>) -> u32 {
        let position = Point::new(x, y);
        let id = match name {
            Some(name) => self.markers.add_named(name, position, frame),
            None => self.markers.add_marker(position, frame),
        };
        id.0
    }

    /// Advance all markers onto `frame`.
    ///
    /// Args:
    ///     detections: Native-space points of shape (n, 2).
    ///     frame: Target frame.
    ///     image_size: (width, height) in pixels.
    ///     max_distance: Normalized threshold. Defaults to the configured pixel
    ///         distance divided by the image width.
    ///
    /// Returns:
    ///     Dict with "frame", "matched", "lost", "recovered", "still_lost",
    ///     "discarded" and "errors".
    #[pyo3(signature = (detections, frame, image_size, max_distance=None))]
    fn advance<'py>(
        &mut self,
        py: Python<'py>,
        detections: PyReadonlyArray2<'py, f64>,
        frame: i64,
        image_size: (u32, u32),
        max_distance: Option<f64>,
    ) -> PyResult<Bound<'py, PyDict>> {
        let size = ImageSize::from(image_size);
        let mut points = points_from_array(&detections)?;

        let report = match max_distance {
            Some(d) => self
                .tracker
                .advance(self.markers.markers_mut(), &mut points, frame, size, d),
            None => self
                .tracker
                .advance_configured(self.markers.markers_mut(), &mut points, frame, size),
        }
        .map_err(to_py_err)?;

        let ids = |v: &[MarkerId]| v.iter().map(|id| id.0).collect::<Vec<u32>>();
        let dict = PyDict::new_bound(py);
        dict.set_item("frame", report.frame)?;
        dict.set_item("matched", ids(&report.matched))?;
        dict.set_item("lost", ids(&report.lost))?;
        dict.set_item("recovered", ids(&report.recovered))?;
        dict.set_item("still_lost", ids(&report.still_lost))?;
        dict.set_item("discarded", report.discarded)?;
        dict.set_item(
            "errors",
            report.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
        )?;
        Ok(dict)
    }

    /// Native position of a marker at `frame`, or None before its first record.
    fn position(&self, marker: u32, frame: i64) -> PyResult<Option<(f64, f64)>> {
        let m = self.markers.try_get(MarkerId(marker)).map_err(to_py_err)?;
        Ok(m.position_at(frame).map(|p| (p.x, p.y)))
    }

    /// Whether a marker is lost as of `frame`.
    fn is_lost(&self, marker: u32, frame: i64) -> PyResult<bool> {
        let m = self.markers.try_get(MarkerId(marker)).map_err(to_py_err)?;
        Ok(m.is_lost_at(frame))
    }

    /// Marker name.
    fn name(&self, marker: u32) -> PyResult<String> {
        let m = self.markers.try_get(MarkerId(marker)).map_err(to_py_err)?;
        Ok(m.name.clone())
    }

    /// Ids of all markers, in creation order.
    #[getter]
    fn marker_ids(&self) -> Vec<u32> {
        self.markers.iter().map(|m| m.id.0).collect()
    }

    fn __len__(&self) -> usize {
        self.markers.len()
    }

    fn __repr__(&self) -> String {
        format!(
            "MarkerTracker(markers={}, max_distance={})",
            self.markers.len(),
            self.tracker.config.max_distance
        )
    }
}

/// Convert a native-space point to normalized space.
#[pyfunction]
pub fn space_to_normalized(x: f64, y: f64, image_size: (u32, u32)) -> PyResult<(f64, f64)> {
    let size = ImageSize::from(image_size);
    size.validate().map_err(to_py_err)?;
    let p = geometry::space_to_normalized(&Point::new(x, y), size);
    Ok((p.x, p.y))
}

/// Convert a normalized point to native space.
#[pyfunction]
pub fn normalized_to_space(x: f64, y: f64, image_size: (u32, u32)) -> PyResult<(f64, f64)> {
    let size = ImageSize::from(image_size);
    size.validate().map_err(to_py_err)?;
    let p = geometry::normalized_to_space(&Point::new(x, y), size);
    Ok((p.x, p.y))
}
