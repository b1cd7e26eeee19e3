//! Ownership-tagged exposure of image memory to foreign code.

use fastformat_arena::BufferRef;
use fastformat_core::{ImageError, Ownership};
use fastformat_image::TypedImage;

use crate::types::FfOwnership;

/// Descriptor of memory exposed to C.
///
/// `token` is non-zero only for handed-off buffers; pass it to
/// `ff_export_release` when done.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FfExport {
    /// Address of the first byte. Read-only for the caller.
    pub data: *const u8,
    /// Length in bytes.
    pub len: usize,
    /// [`FfOwnership`] tag as `i32`.
    pub ownership: i32,
    /// Export token, or 0 if the caller owns nothing.
    pub token: u64,
}

impl FfExport {
    /// Describe `image`'s bytes under `token`.
    pub fn describe(image: &TypedImage<'_>, token: u64) -> Self {
        Self {
            data: image.as_ptr(),
            len: image.len(),
            ownership: FfOwnership::from(image.ownership()) as i32,
            token,
        }
    }
}

impl Default for FfExport {
    fn default() -> Self {
        Self {
            data: std::ptr::null(),
            len: 0,
            ownership: FfOwnership::Borrowed as i32,
            token: 0,
        }
    }
}

/// An image address plus the ownership tag that decides who frees it.
///
/// Owned handles may be converted into a [`ForeignToken`] with
/// [`hand_off`](Self::hand_off). Borrowed handles never can: their memory
/// belongs to someone else, and a foreign owner freeing it would be a
/// double free.
#[derive(Debug)]
pub struct FfiHandle<'a> {
    image: TypedImage<'a>,
}

impl<'a> FfiHandle<'a> {
    /// Wrap an image; the tag follows the image's ownership.
    pub fn new(image: TypedImage<'a>) -> Self {
        Self { image }
    }

    /// Address of the pixel bytes, for reading only.
    pub fn as_ptr(&self) -> *const u8 {
        self.image.as_ptr()
    }

    /// Length of the pixel bytes.
    pub fn len(&self) -> usize {
        self.image.len()
    }

    /// Always false: images have at least one pixel.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Owned or borrowed.
    pub fn ownership(&self) -> Ownership {
        self.image.ownership()
    }

    /// C descriptor of this handle with the given export token.
    pub fn descriptor(&self, token: u64) -> FfExport {
        FfExport::describe(&self.image, token)
    }

    /// Unwrap the image.
    pub fn into_image(self) -> TypedImage<'a> {
        self.image
    }

    /// Transfer this handle's buffer reference to a foreign owner.
    ///
    /// Fails with `OwnershipViolation` for borrowed handles, handing the
    /// handle back untouched.
    pub fn hand_off(self) -> Result<ForeignToken, (Self, ImageError)> {
        match self.image.buffer().cloned() {
            // `self` drops here, so the count is unchanged overall.
            Some(buffer) => Ok(ForeignToken { buffer }),
            None => Err((self, ImageError::OwnershipViolation)),
        }
    }
}

/// A buffer reference owned by foreign code.
///
/// The bytes stay alive until the token is released.
#[derive(Debug)]
pub struct ForeignToken {
    buffer: BufferRef,
}

impl ForeignToken {
    /// Address of the bytes.
    pub fn as_ptr(&self) -> *const u8 {
        self.buffer.as_ptr()
    }

    /// Length of the bytes.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether the buffer holds zero bytes.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Give the reference back, freeing the bytes if it was the last.
    pub fn release(self) {
        drop(self.buffer);
    }
}
