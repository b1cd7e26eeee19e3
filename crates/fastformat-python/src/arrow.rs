//! pyarrow interchange over the Arrow C data interface, and RawData.
//!
//! Records cross into Python as `pyarrow.Array` objects. Both directions
//! move the Arrow C structs, so pixel bytes are never copied: pyarrow
//! keeps the exporting image's buffer alive, and imported arrays stay
//! owned by pyarrow while fastformat reads them.

use std::ffi::c_void;

use pyo3::exceptions::PyTypeError;
use pyo3::prelude::*;

use fastformat_arrow::arrow::ffi::{FFI_ArrowArray, FFI_ArrowSchema};
use fastformat_ffi::{ff_record_destroy, ff_record_export, ff_record_import, ff_record_raw_data};

use crate::error::check_status;

/// Hand `record` to pyarrow. The record handle stays owned by the caller.
pub(crate) fn export_record<'py>(py: Python<'py>, record: u64) -> PyResult<Bound<'py, PyAny>> {
    let mut array = FFI_ArrowArray::empty();
    let mut schema = FFI_ArrowSchema::empty();
    let array_addr = &mut array as *mut FFI_ArrowArray as usize;
    let schema_addr = &mut schema as *mut FFI_ArrowSchema as usize;
    // Release GIL: ff_record_export locks RECORDS.
    let status = py.detach(|| {
        ff_record_export(
            record,
            array_addr as *mut c_void,
            schema_addr as *mut c_void,
        )
    });
    check_status(status)?;
    // pyarrow moves both structs out. If it fails, dropping them here
    // releases the export.
    py.import("pyarrow")?
        .getattr("Array")?
        .call_method1("_import_from_c", (array_addr, schema_addr))
}

/// Import a pyarrow array as a new record handle, owned by the caller.
pub(crate) fn import_array(py: Python<'_>, array: &Bound<'_, PyAny>) -> PyResult<u64> {
    if !array.hasattr("_export_to_c")? {
        return Err(PyTypeError::new_err(format!(
            "expected a pyarrow.Array, got {}",
            array.get_type().name()?
        )));
    }
    let mut c_array = FFI_ArrowArray::empty();
    let mut c_schema = FFI_ArrowSchema::empty();
    let array_addr = &mut c_array as *mut FFI_ArrowArray as usize;
    let schema_addr = &mut c_schema as *mut FFI_ArrowSchema as usize;
    array.call_method1("_export_to_c", (array_addr, schema_addr))?;
    // Release GIL: ff_record_import locks RECORDS. It moves both structs
    // out, so the locals are empty when they drop.
    let (status, record) = py.detach(|| {
        let mut record = 0u64;
        let s = ff_record_import(
            array_addr as *mut c_void,
            schema_addr as *mut c_void,
            &mut record,
        );
        (s, record)
    });
    check_status(status)?;
    Ok(record)
}

/// The pixel column of an imported array, without a copy.
///
/// Owns the imported record, so views made from it stay valid for as
/// long as they are reachable.
#[pyclass(frozen)]
pub(crate) struct RawData {
    record: u64,
    addr: usize,
    len: usize,
}

#[pymethods]
impl RawData {
    /// Address of the first pixel byte.
    fn as_ptr(&self) -> usize {
        self.addr
    }

    fn __len__(&self) -> usize {
        self.len
    }

    fn __repr__(&self) -> String {
        format!("RawData(address={:#x}, len={})", self.addr, self.len)
    }
}

impl RawData {
    /// Take ownership of `record` and locate its pixel column. The record
    /// is destroyed if it has none.
    pub(crate) fn new(py: Python<'_>, record: u64) -> PyResult<Self> {
        // Release GIL: ff_record_raw_data locks RECORDS.
        let (status, addr, len) = py.detach(|| {
            let mut ptr: *const u8 = std::ptr::null();
            let mut len = 0usize;
            let s = ff_record_raw_data(record, &mut ptr, &mut len);
            if s != 0 {
                ff_record_destroy(record);
            }
            (s, ptr as usize, len)
        });
        check_status(status)?;
        Ok(Self { record, addr, len })
    }

    pub(crate) fn record_handle(&self) -> u64 {
        self.record
    }
}

impl Drop for RawData {
    fn drop(&mut self) {
        let h = self.record;
        Python::attach(|py| {
            py.detach(|| ff_record_destroy(h));
        });
    }
}
