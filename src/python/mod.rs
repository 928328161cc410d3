//! Python bindings for colortrack-rs using PyO3.
//!
//! Lets a Python host (such as a content-creation add-on) hand per-frame
//! detections to the tracker and read marker positions back.

use pyo3::prelude::*;

mod tracker;

pub use tracker::PyMarkerTracker;

/// Python module for colortrack-rs.
///
/// Named `_colortrack_rs` with underscore prefix for mixed Python/Rust projects.
#[pymodule]
fn _colortrack_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyMarkerTracker>()?;

    m.add_function(wrap_pyfunction!(tracker::space_to_normalized, m)?)?;
    m.add_function(wrap_pyfunction!(tracker::normalized_to_space, m)?)?;

    m.add("__version__", env!("CARGO_PKG_VERSION"))?;

    Ok(())
}
