//! Shared arena counters as a Python dict.

use pyo3::prelude::*;
use pyo3::types::PyDict;

use fastformat_ffi::{ff_arena_stats, FfArenaStats};

use crate::error::check_status;

/// Counters of the arena that backs every image: live buffers and bytes,
/// the peak, and totals of allocations, adoptions and frees.
#[pyfunction]
pub(crate) fn arena_stats(py: Python<'_>) -> PyResult<Bound<'_, PyDict>> {
    let (status, s) = py.detach(|| {
        let mut s = FfArenaStats::default();
        let status = ff_arena_stats(&mut s);
        (status, s)
    });
    check_status(status)?;
    let d = PyDict::new(py);
    d.set_item("live_buffers", s.live_buffers)?;
    d.set_item("live_bytes", s.live_bytes)?;
    d.set_item("peak_live_bytes", s.peak_live_bytes)?;
    d.set_item("total_allocations", s.total_allocations)?;
    d.set_item("total_adoptions", s.total_adoptions)?;
    d.set_item("total_frees", s.total_frees)?;
    Ok(d)
}
