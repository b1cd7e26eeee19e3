//! Image lifecycle FFI: create, adopt, inspect, convert, destroy.
//!
//! An image handle is either owned (it holds a buffer reference) or a
//! view bound to a record handle. Views hold no reference of their own;
//! every call re-resolves the record, so a view whose record was destroyed
//! reports `UseAfterFree` instead of reading freed memory.

use std::ffi::{c_char, c_void};
use std::ptr::NonNull;
use std::sync::Mutex;

use fastformat_arena::{BufferArena, ReleaseHook};
use fastformat_arrow::{into_arrow, raw_data, view_from_raw_data};
use fastformat_core::{ColorSpace, ImageSchema};
use fastformat_image::{ColorSpaceConverter, TypedImage};

use crate::arrow::records;
use crate::handle::HandleTable;
use crate::status::FfStatus;
use crate::types::{color_space_from_raw, FfOwnership};
use crate::{lock, read_bytes, read_name, write_bytes};

/// C callback that frees adopted memory: `(data, len, user_data)`.
pub type FfReleaseFn = unsafe extern "C" fn(*mut u8, usize, *mut c_void);

pub(crate) enum ImageEntry {
    Owned(TypedImage<'static>),
    View { record: u64 },
}

static IMAGES: Mutex<HandleTable<ImageEntry>> = Mutex::new(HandleTable::new());

pub(crate) fn images() -> &'static Mutex<HandleTable<ImageEntry>> {
    &IMAGES
}

/// Run `f` on the image behind `handle`, resolving views through their
/// record. Holds the image lock, then the record lock, for the call.
pub(crate) fn with_image<R>(
    handle: u64,
    f: impl FnOnce(&TypedImage<'_>) -> R,
) -> Result<R, FfStatus> {
    let images = lock(&IMAGES)?;
    match images.get(handle)? {
        ImageEntry::Owned(image) => Ok(f(image)),
        ImageEntry::View { record } => {
            let records = lock(records())?;
            let record = records.get(*record).map_err(|_| FfStatus::UseAfterFree)?;
            let raw = raw_data(record)?;
            Ok(f(&view_from_raw_data(&raw)))
        }
    }
}

/// Convert the view bound to `record`, copying out unless `dst` matches.
fn convert_view(record: u64, dst: ColorSpace) -> Result<ImageEntry, FfStatus> {
    let records = lock(records())?;
    let resolved = records.get(record).map_err(|_| FfStatus::UseAfterFree)?;
    let raw = raw_data(resolved)?;
    let view = view_from_raw_data(&raw);
    if view.color_space() == dst {
        return Ok(ImageEntry::View { record });
    }
    let converted = view
        .into_color_space(dst)
        .map_err(|e| FfStatus::from(e.error()))?;
    Ok(ImageEntry::Owned(converted.into_owned()?))
}

/// Opaque user pointer carried into a release hook.
struct UserData(*mut c_void);

// SAFETY: `ff_image_adopt` requires `user_data` to be usable from any
// thread, since the last reference may drop anywhere.
#[allow(unsafe_code)]
unsafe impl Send for UserData {}

impl UserData {
    fn get(&self) -> *mut c_void {
        self.0
    }
}

/// Create an image by copying `len` bytes from `data`.
///
/// `color_space` is an [`crate::FfColorSpace`] tag; `name` may be null.
/// On success writes the new handle to `image_out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_image_new(
    data: *const u8,
    len: usize,
    width: u32,
    height: u32,
    color_space: i32,
    name: *const c_char,
    image_out: *mut u64,
) -> i32 {
    ffi_guard!({
        if image_out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let color_space = ffi_try!(color_space_from_raw(color_space));
        // SAFETY: name is null or NUL-terminated per caller contract.
        let name = ffi_try!(unsafe { read_name(name) });
        // SAFETY: data is valid for len bytes per caller contract.
        let bytes = ffi_try!(unsafe { read_bytes(data, len) });
        let image = ffi_try!(TypedImage::from_slice_in(
            BufferArena::shared(),
            bytes,
            width,
            height,
            color_space,
            name.as_deref(),
        ));
        let handle = ffi_lock!(IMAGES).insert(ImageEntry::Owned(image));
        // SAFETY: image_out is non-null and valid per caller contract.
        unsafe { *image_out = handle };
        FfStatus::Ok as i32
    })
}

/// Create an image over caller memory without copying.
///
/// The geometry is validated before anything is adopted; on failure the
/// caller still owns `data`. On success the library owns it: `release` is
/// called once with `(data, len, user_data)` after the last reference is
/// gone, possibly from another thread. With a null `release` the memory
/// must outlive every reference and is never freed by the library.
///
/// `data` must be valid for reads and writes of `len` bytes and must not
/// be touched by the caller while the image or anything derived from it
/// is alive. Layout conversions may rewrite the bytes in place.
#[no_mangle]
#[allow(unsafe_code)]
#[allow(clippy::too_many_arguments)]
pub extern "C" fn ff_image_adopt(
    data: *mut u8,
    len: usize,
    width: u32,
    height: u32,
    color_space: i32,
    name: *const c_char,
    release: Option<FfReleaseFn>,
    user_data: *mut c_void,
    image_out: *mut u64,
) -> i32 {
    ffi_guard!({
        if image_out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let Some(ptr) = NonNull::new(data) else {
            return FfStatus::InvalidArgument as i32;
        };
        let color_space = ffi_try!(color_space_from_raw(color_space));
        // SAFETY: name is null or NUL-terminated per caller contract.
        let name = ffi_try!(unsafe { read_name(name) });
        let schema = ffi_try!(ImageSchema::new(
            width,
            height,
            color_space,
            name.as_deref()
        ));
        ffi_try!(schema.check_len(len));

        let hook = release.map(|release| {
            let user_data = UserData(user_data);
            Box::new(move |ptr: NonNull<u8>, len: usize| {
                // SAFETY: the callback and its user data come from the
                // caller, who promised they free exactly this region.
                unsafe { release(ptr.as_ptr(), len, user_data.get()) }
            }) as ReleaseHook
        });
        // SAFETY: data is valid for len bytes and not mutated while
        // referenced, per caller contract.
        let buffer = unsafe { BufferArena::shared().adopt_external(ptr, len, hook) };
        let image = ffi_try!(TypedImage::from_buffer(buffer, schema));
        let handle = ffi_lock!(IMAGES).insert(ImageEntry::Owned(image));
        // SAFETY: image_out is non-null and valid per caller contract.
        unsafe { *image_out = handle };
        FfStatus::Ok as i32
    })
}

/// Destroy an image handle, releasing its buffer reference.
///
/// Destroying a consumed handle is allowed and frees its slot. A second
/// destroy reports `UseAfterFree`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_image_destroy(image: u64) -> i32 {
    ffi_guard!({
        let removed = ffi_try!(ffi_lock!(IMAGES).remove(image));
        // Release hooks may call back in; the table lock is already gone.
        drop(removed);
        FfStatus::Ok as i32
    })
}

/// Write the image width to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_image_width(image: u64, out: *mut u32) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let width = ffi_try!(with_image(image, |image| image.width()));
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = width };
        FfStatus::Ok as i32
    })
}

/// Write the image height to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_image_height(image: u64, out: *mut u32) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let height = ffi_try!(with_image(image, |image| image.height()));
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = height };
        FfStatus::Ok as i32
    })
}

/// Write the image's [`crate::FfColorSpace`] tag to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_image_color_space(image: u64, out: *mut i32) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let color_space = ffi_try!(with_image(image, |image| image.color_space()));
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = crate::FfColorSpace::from(color_space) as i32 };
        FfStatus::Ok as i32
    })
}

/// Write the image's [`FfOwnership`] tag to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_image_ownership(image: u64, out: *mut i32) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let ownership = ffi_try!(with_image(image, |image| image.ownership()));
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = FfOwnership::from(ownership) as i32 };
        FfStatus::Ok as i32
    })
}

/// Copy the image name, NUL-terminated, into `buf` of `cap` bytes.
///
/// `len_out` always receives the name length without the terminator.
/// Returns `BufferTooSmall` if `cap` cannot hold name and terminator.
/// Unnamed images have an empty name.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_image_name(
    image: u64,
    buf: *mut c_char,
    cap: usize,
    len_out: *mut usize,
) -> i32 {
    ffi_guard!({
        if len_out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let status = ffi_try!(with_image(image, |image| {
            let name = image.name().unwrap_or("");
            // SAFETY: buf holds cap bytes and len_out is valid per caller
            // contract.
            unsafe { write_bytes(name.as_bytes(), buf.cast(), cap, len_out, true) }
        }));
        status as i32
    })
}

/// Write the address and length of the pixel bytes.
///
/// The address stays valid while the handle is alive and, for views,
/// while the record is alive. Callers must not write through it.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_image_as_ptr(
    image: u64,
    ptr_out: *mut *const u8,
    len_out: *mut usize,
) -> i32 {
    ffi_guard!({
        if ptr_out.is_null() || len_out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let (ptr, len) = ffi_try!(with_image(image, |image| (image.as_ptr(), image.len())));
        // SAFETY: both out-pointers are non-null and valid per caller
        // contract.
        unsafe {
            *ptr_out = ptr;
            *len_out = len;
        }
        FfStatus::Ok as i32
    })
}

/// Copy the pixel bytes into `dst` of `cap` bytes.
///
/// `len_out` always receives the pixel length; returns `BufferTooSmall`
/// if `cap` is short.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_image_read(
    image: u64,
    dst: *mut u8,
    cap: usize,
    len_out: *mut usize,
) -> i32 {
    ffi_guard!({
        if len_out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let status = ffi_try!(with_image(image, |image| {
            // SAFETY: dst holds cap bytes and len_out is valid per caller
            // contract.
            unsafe { write_bytes(image.pixels(), dst, cap, len_out, false) }
        }));
        status as i32
    })
}

/// Convert an image to another layout, consuming the source handle.
///
/// On success the source handle reports `UseAfterMove` and the result is
/// written to `image_out`. On failure the source handle stays usable.
/// Converting a view to its own layout yields another view of the same
/// record.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_image_convert(image: u64, color_space: i32, image_out: *mut u64) -> i32 {
    ffi_guard!({
        if image_out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let dst = ffi_try!(color_space_from_raw(color_space));
        let entry = ffi_try!(ffi_lock!(IMAGES).take(image));
        // Converting outside the lock: a dropped source buffer may run a
        // release hook that calls back in.
        let result = match entry {
            ImageEntry::Owned(source) => source.into_color_space(dst).map(ImageEntry::Owned).map_err(
                |e| {
                    let (error, source) = e.into_parts();
                    (FfStatus::from(error), ImageEntry::Owned(source))
                },
            ),
            ImageEntry::View { record } => {
                convert_view(record, dst).map_err(|status| (status, ImageEntry::View { record }))
            }
        };
        match result {
            Ok(converted) => {
                let handle = ffi_lock!(IMAGES).insert(converted);
                // SAFETY: image_out is non-null and valid per caller contract.
                unsafe { *image_out = handle };
                FfStatus::Ok as i32
            }
            Err((status, source)) => {
                ffi_try!(ffi_lock!(IMAGES).restore(image, source));
                status as i32
            }
        }
    })
}

/// Wrap an image in a record, consuming the image handle.
///
/// An owned image's buffer moves into the record without copying. A view
/// yields a record sharing its source record's buffer.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_image_into_arrow(image: u64, record_out: *mut u64) -> i32 {
    ffi_guard!({
        if record_out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let record = {
            let images = ffi_lock!(IMAGES);
            match ffi_try!(images.get(image)) {
                ImageEntry::Owned(source) => ffi_try!(into_arrow(source.clone())),
                ImageEntry::View { record } => {
                    let records = ffi_lock!(records());
                    ffi_try!(records.get(*record).map_err(|_| FfStatus::UseAfterFree)).clone()
                }
            }
        };
        let consumed = ffi_try!(ffi_lock!(IMAGES).take(image));
        drop(consumed);
        let handle = ffi_lock!(records()).insert(record);
        // SAFETY: record_out is non-null and valid per caller contract.
        unsafe { *record_out = handle };
        FfStatus::Ok as i32
    })
}

/// Write 1 to `out` if `src` converts to `dst`, else 0.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_conversion_supported(src: i32, dst: i32, out: *mut u8) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let src = ffi_try!(color_space_from_raw(src));
        let dst = ffi_try!(color_space_from_raw(dst));
        let supported = ColorSpaceConverter::is_supported(src, dst);
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = u8::from(supported) };
        FfStatus::Ok as i32
    })
}
