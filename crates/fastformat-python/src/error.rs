//! FfStatus -> Python exception mapping with recovery hints.

use pyo3::exceptions::{PyMemoryError, PyRuntimeError, PyTypeError, PyValueError};
use pyo3::PyResult;

/// Check an FFI status code. Returns `Ok(())` on success, raises a typed
/// Python exception with a recovery hint on error.
pub(crate) fn check_status(code: i32) -> PyResult<()> {
    if code == 0 {
        return Ok(());
    }
    let (msg, hint) = error_detail(code);
    let full = format!("fastformat error {code}: {msg}\n  Hint: {hint}");
    match code {
        // Caller-supplied data or arguments → ValueError
        -2 | -4 | -9 | -10 => Err(PyValueError::new_err(full)),

        // No conversion between the layouts → TypeError
        -3 => Err(PyTypeError::new_err(full)),

        // Allocation failure → MemoryError
        -8 => Err(PyMemoryError::new_err(full)),

        // Everything else → RuntimeError
        _ => Err(PyRuntimeError::new_err(full)),
    }
}

/// Returns `(message, recovery_hint)` for each FFI status code.
fn error_detail(code: i32) -> (&'static str, &'static str) {
    match code {
        -1 => (
            "invalid handle",
            "The object was never created by this library. This usually \
             means a version mismatch between the Python package and the \
             native extension.",
        ),
        -2 => (
            "buffer length does not match width * height * channels",
            "Check the data length against the color space: bgr8/rgb8 need \
             3 bytes per pixel, rgba8/bgra8 need 4 and gray8 needs 1.",
        ),
        -3 => (
            "unsupported color space conversion",
            "Only gray8 sources can target gray8. Color and alpha images \
             convert among rgb8, bgr8, rgba8 and bgra8.",
        ),
        -4 => (
            "record does not describe an image",
            "The array must be a union with width, height, encoding, name \
             and data fields, as produced by Image.into_arrow().",
        ),
        -5 => (
            "image was already consumed",
            "Conversions, into_arrow() and hand-offs consume the image. Keep \
             the returned object and stop using the original.",
        ),
        -6 => (
            "image or record was already destroyed",
            "The record behind this view is gone. Keep the RawData alive or \
             use from_raw_data() for an owned image.",
        ),
        -7 => (
            "borrowed memory cannot change owner",
            "Views do not own their pixels. Call from_raw_data() to get an \
             owned image first.",
        ),
        -8 => (
            "buffer allocation failed",
            "The process is out of memory or the arena limit was reached. \
             Release images you no longer need.",
        ),
        -9 => (
            "invalid argument",
            "An argument is null, out of range, or a name is not valid UTF-8.",
        ),
        -10 => (
            "caller-provided buffer too small",
            "Allocate at least the reported length and retry.",
        ),
        -11 => (
            "internal error",
            "A previous call panicked while holding a lock. Restart the \
             process.",
        ),
        -128 => (
            "native code panicked",
            "This is a bug in fastformat. Please report it with the inputs \
             that triggered it.",
        ),
        _ => (
            "unknown fastformat error",
            "An unrecognized error code was returned from the FFI layer. \
             This may indicate a version mismatch between the Python \
             bindings and the native library.",
        ),
    }
}
