//! Exposing image memory to foreign code, and handing buffers off to it.

use std::sync::Mutex;

use crate::handle::HandleTable;
use crate::handoff::{FfExport, FfiHandle, ForeignToken};
use crate::image::{images, with_image, ImageEntry};
use crate::status::FfStatus;

static EXPORTS: Mutex<HandleTable<ForeignToken>> = Mutex::new(HandleTable::new());

/// Describe an image's bytes without transferring anything.
///
/// Writes a descriptor with token 0. The address is valid only while the
/// image handle (and, for views, the record) is alive.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_image_export(image: u64, out: *mut FfExport) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let descriptor = ffi_try!(with_image(image, |image| FfExport::describe(image, 0)));
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = descriptor };
        FfStatus::Ok as i32
    })
}

/// Hand an owned image's buffer to foreign code, consuming the handle.
///
/// The descriptor's token keeps the bytes alive until
/// [`ff_export_release`]. Borrowed images fail with `OwnershipViolation`
/// and stay usable.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_image_hand_off(image: u64, out: *mut FfExport) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let ownership = ffi_try!(with_image(image, |image| image.ownership()));
        if !ownership.can_hand_off() {
            return FfStatus::OwnershipViolation as i32;
        }
        let entry = ffi_try!(ffi_lock!(images()).take(image));
        let handle = match entry {
            ImageEntry::Owned(source) => FfiHandle::new(source),
            // Raced with another thread replacing the entry.
            view @ ImageEntry::View { .. } => {
                ffi_try!(ffi_lock!(images()).restore(image, view));
                return FfStatus::OwnershipViolation as i32;
            }
        };
        let template = handle.descriptor(0);
        let token = match handle.hand_off() {
            Ok(token) => token,
            Err((handle, error)) => {
                ffi_try!(ffi_lock!(images()).restore(image, ImageEntry::Owned(handle.into_image())));
                return FfStatus::from(error) as i32;
            }
        };
        let id = ffi_lock!(EXPORTS).insert(token);
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = FfExport { token: id, ..template } };
        FfStatus::Ok as i32
    })
}

/// Give back a handed-off buffer, freeing it if nothing else holds it.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_export_release(token: u64) -> i32 {
    ffi_guard!({
        let removed = ffi_try!(ffi_lock!(EXPORTS).remove(token));
        if let Some(token) = removed {
            token.release();
        }
        FfStatus::Ok as i32
    })
}
