//! Interchange record FFI: destroy, raw data access, views, decoding, and
//! the Arrow C data interface.

use std::ffi::c_void;
use std::sync::Mutex;

use fastformat_arrow::arrow::ffi::{from_ffi, to_ffi, FFI_ArrowArray, FFI_ArrowSchema};
use fastformat_arrow::{from_arrow, raw_data, ArrowRecord};
use fastformat_core::ImageError;

use crate::handle::HandleTable;
use crate::image::{images, ImageEntry};
use crate::status::FfStatus;

static RECORDS: Mutex<HandleTable<ArrowRecord>> = Mutex::new(HandleTable::new());

pub(crate) fn records() -> &'static Mutex<HandleTable<ArrowRecord>> {
    &RECORDS
}

/// Destroy a record handle.
///
/// Views created from the record report `UseAfterFree` afterwards. Images
/// decoded with [`ff_image_from_arrow`] keep the pixels alive.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_record_destroy(record: u64) -> i32 {
    ffi_guard!({
        let removed = ffi_try!(ffi_lock!(RECORDS).remove(record));
        drop(removed);
        FfStatus::Ok as i32
    })
}

/// Write the address and length of the record's pixel column.
///
/// The address is the same one the image had before
/// [`crate::image::ff_image_into_arrow`]; it stays valid while the record
/// is alive.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_record_raw_data(
    record: u64,
    ptr_out: *mut *const u8,
    len_out: *mut usize,
) -> i32 {
    ffi_guard!({
        if ptr_out.is_null() || len_out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let (ptr, len) = {
            let records = ffi_lock!(RECORDS);
            let raw = ffi_try!(raw_data(ffi_try!(records.get(record))));
            (raw.as_ptr(), raw.len())
        };
        // SAFETY: both out-pointers are non-null and valid per caller
        // contract.
        unsafe {
            *ptr_out = ptr;
            *len_out = len;
        }
        FfStatus::Ok as i32
    })
}

/// Create a borrowed image handle over a record's pixels without copying.
///
/// The view holds no reference: destroying it never frees the pixels, and
/// once the record is destroyed the view reports `UseAfterFree`. The
/// record's metadata is validated here, so a view of a malformed record is
/// never issued.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_image_view_from_raw_data(record: u64, image_out: *mut u64) -> i32 {
    ffi_guard!({
        if image_out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let mut images = ffi_lock!(images());
        {
            let records = ffi_lock!(RECORDS);
            ffi_try!(raw_data(ffi_try!(records.get(record))));
        }
        let handle = images.insert(ImageEntry::View { record });
        // SAFETY: image_out is non-null and valid per caller contract.
        unsafe { *image_out = handle };
        FfStatus::Ok as i32
    })
}

/// Decode a record into an owned image sharing the record's buffer.
///
/// The record stays valid; the image keeps the pixels alive after the
/// record is destroyed.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_image_from_arrow(record: u64, image_out: *mut u64) -> i32 {
    ffi_guard!({
        if image_out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let image = {
            let records = ffi_lock!(RECORDS);
            ffi_try!(from_arrow(ffi_try!(records.get(record))))
        };
        let handle = ffi_lock!(images()).insert(ImageEntry::Owned(image));
        // SAFETY: image_out is non-null and valid per caller contract.
        unsafe { *image_out = handle };
        FfStatus::Ok as i32
    })
}

/// Export a record through the Arrow C data interface.
///
/// `array_out` and `schema_out` point to caller storage for a
/// `struct ArrowArray` and a `struct ArrowSchema`; the caller releases both
/// through their `release` callbacks. The record is a dense union with one
/// child per column. Pixels are not copied and stay alive until the
/// exported array is released, whether or not the record handle is
/// destroyed first.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_record_export(
    record: u64,
    array_out: *mut c_void,
    schema_out: *mut c_void,
) -> i32 {
    ffi_guard!({
        if array_out.is_null() || schema_out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let data = {
            let records = ffi_lock!(RECORDS);
            ffi_try!(records.get(record)).to_data()
        };
        let (array, schema) = ffi_try!(to_ffi(&data).map_err(|_| FfStatus::InternalError));
        // SAFETY: both out-pointers are non-null and valid for writes of the
        // Arrow C structs per caller contract. Previous contents are
        // overwritten, not released.
        unsafe {
            std::ptr::write(array_out.cast::<FFI_ArrowArray>(), array);
            std::ptr::write(schema_out.cast::<FFI_ArrowSchema>(), schema);
        }
        FfStatus::Ok as i32
    })
}

/// Import an Arrow array through the C data interface as a record handle.
///
/// Takes ownership of `*array` and `*schema` and marks both released, on
/// failure too. The array must be a union whose children are the record's
/// columns; `UInt8` children are shared read-only, without copying.
/// Returns `SchemaMismatch` for anything else.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_record_import(
    array: *mut c_void,
    schema: *mut c_void,
    record_out: *mut u64,
) -> i32 {
    ffi_guard!({
        if array.is_null() || schema.is_null() || record_out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        // SAFETY: non-null and pointing to live Arrow C structs per caller
        // contract; from_raw moves them out and leaves released ones behind.
        let (array, schema) = unsafe {
            (
                FFI_ArrowArray::from_raw(array.cast()),
                FFI_ArrowSchema::from_raw(schema.cast()),
            )
        };
        // SAFETY: `array` was exported together with `schema`.
        let data = ffi_try!(unsafe { from_ffi(array, &schema) }.map_err(|e| {
            ImageError::SchemaMismatch {
                reason: e.to_string(),
            }
        }));
        let record = ffi_try!(ArrowRecord::try_from_data(data));
        let handle = ffi_lock!(RECORDS).insert(record);
        // SAFETY: record_out is non-null and valid per caller contract.
        unsafe { *record_out = handle };
        FfStatus::Ok as i32
    })
}
