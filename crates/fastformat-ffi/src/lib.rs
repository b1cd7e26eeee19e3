//! C FFI bindings for fastformat.
//!
//! Exposes images, interchange records and foreign hand-offs to C callers
//! through `u64` handles. Every entry point returns an [`FfStatus`] code
//! as `i32` and writes results through out-pointers. This crate is one of
//! two that may contain `unsafe` code (along with `fastformat-arena`).
//!
//! Handle tables are locked in a fixed order: images, then records, then
//! exports. No call holds a later table's lock while taking an earlier one.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

use std::ffi::{c_char, CStr};
use std::sync::{Mutex, MutexGuard};

/// Run an FFI body, turning a panic into [`FfStatus::Panicked`].
macro_rules! ffi_guard {
    ($body:block) => {
        match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| -> i32 { $body })) {
            Ok(status) => status,
            Err(_) => $crate::status::FfStatus::Panicked as i32,
        }
    };
}

/// Lock a mutex inside `ffi_guard!`, returning `InternalError` if poisoned.
macro_rules! ffi_lock {
    ($mutex:expr) => {
        match $mutex.lock() {
            Ok(guard) => guard,
            Err(_) => return $crate::status::FfStatus::InternalError as i32,
        }
    };
}

/// Unwrap a `Result` inside `ffi_guard!`, returning its error as a status.
macro_rules! ffi_try {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => return $crate::status::FfStatus::from(e) as i32,
        }
    };
}

pub mod arena;
pub mod arrow;
pub mod export;
mod handle;
pub mod handoff;
pub mod image;
pub mod status;
pub mod types;

pub use arena::{ff_arena_stats, FfArenaStats};
pub use crate::arrow::{
    ff_image_from_arrow, ff_image_view_from_raw_data, ff_record_destroy, ff_record_export,
    ff_record_import, ff_record_raw_data,
};
pub use export::{ff_export_release, ff_image_export, ff_image_hand_off};
pub use handoff::{FfExport, FfiHandle, ForeignToken};
pub use image::{
    ff_conversion_supported, ff_image_adopt, ff_image_as_ptr, ff_image_color_space,
    ff_image_convert, ff_image_destroy, ff_image_height, ff_image_into_arrow, ff_image_name,
    ff_image_new, ff_image_ownership, ff_image_read, ff_image_width, FfReleaseFn,
};
pub use status::FfStatus;
pub use types::{FfColorSpace, FfOwnership};

/// Lock a handle table outside the macros.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, FfStatus> {
    mutex.lock().map_err(|_| FfStatus::InternalError)
}

/// Read an optional image name from C.
///
/// Null means unnamed. Non-UTF-8 bytes are `InvalidArgument`.
///
/// # Safety
///
/// `name` must be null or point to a NUL-terminated string.
#[allow(unsafe_code)]
pub(crate) unsafe fn read_name(name: *const c_char) -> Result<Option<String>, FfStatus> {
    if name.is_null() {
        return Ok(None);
    }
    // SAFETY: non-null and NUL-terminated per this function's contract.
    let name = unsafe { CStr::from_ptr(name) };
    name.to_str()
        .map(|s| Some(s.to_owned()))
        .map_err(|_| FfStatus::InvalidArgument)
}

/// Borrow `len` bytes at `data`, allowing null when `len` is zero.
///
/// # Safety
///
/// Unless `len` is zero, `data` must be valid for reads of `len` bytes for
/// the returned lifetime.
#[allow(unsafe_code)]
pub(crate) unsafe fn read_bytes<'a>(data: *const u8, len: usize) -> Result<&'a [u8], FfStatus> {
    if len == 0 {
        return Ok(&[]);
    }
    if data.is_null() {
        return Err(FfStatus::InvalidArgument);
    }
    // SAFETY: non-null and valid for len bytes per this function's contract.
    Ok(unsafe { std::slice::from_raw_parts(data, len) })
}

/// Copy `bytes` into a caller buffer of `cap` bytes, reporting the needed
/// length through `len_out` even when the buffer is too small.
///
/// With `nul` set, a terminating zero byte is written and counted against
/// `cap` but not reported in `len_out`.
///
/// # Safety
///
/// `len_out` must be valid for a write. `dst` must be null or valid for
/// writes of `cap` bytes.
#[allow(unsafe_code)]
pub(crate) unsafe fn write_bytes(
    bytes: &[u8],
    dst: *mut u8,
    cap: usize,
    len_out: *mut usize,
    nul: bool,
) -> FfStatus {
    // SAFETY: len_out is valid per this function's contract.
    unsafe { *len_out = bytes.len() };
    let needed = bytes.len() + usize::from(nul);
    if cap < needed {
        return FfStatus::BufferTooSmall;
    }
    if dst.is_null() {
        return FfStatus::InvalidArgument;
    }
    // SAFETY: dst holds at least `needed` bytes and cannot overlap a Rust
    // allocation the caller does not own.
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len());
        if nul {
            *dst.add(bytes.len()) = 0;
        }
    }
    FfStatus::Ok
}
