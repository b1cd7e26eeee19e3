//! Python bindings for fastformat.
//!
//! This crate provides PyO3 bindings wrapping the C FFI layer
//! (`fastformat-ffi`). The native extension is `fastformat._fastformat`;
//! the `fastformat` Python package re-exports it, so image construction,
//! conversion and the pyarrow helpers are reached as `fastformat.image`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use pyo3::prelude::*;

mod arrow;
mod error;
mod image;
mod stats;

/// The native `_fastformat` extension module.
#[pymodule]
fn _fastformat(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<arrow::RawData>()?;
    m.add_function(wrap_pyfunction!(stats::arena_stats, m)?)?;

    let image = PyModule::new(m.py(), "image")?;
    image::register(&image)?;
    m.add_submodule(&image)?;
    m.add_class::<image::Image>()?;

    Ok(())
}
