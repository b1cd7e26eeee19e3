//! C-compatible enums for color spaces and ownership tags.

use fastformat_core::{ColorSpace, Ownership};

use crate::status::FfStatus;

/// Pixel layout tag.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FfColorSpace {
    /// 3 bytes per pixel, blue first.
    Bgr8 = 0,
    /// 3 bytes per pixel, red first.
    Rgb8 = 1,
    /// 1 byte per pixel.
    Gray8 = 2,
    /// 4 bytes per pixel, red first, alpha last.
    Rgba8 = 3,
    /// 4 bytes per pixel, blue first, alpha last.
    Bgra8 = 4,
}

impl From<ColorSpace> for FfColorSpace {
    fn from(cs: ColorSpace) -> Self {
        match cs {
            ColorSpace::Bgr8 => FfColorSpace::Bgr8,
            ColorSpace::Rgb8 => FfColorSpace::Rgb8,
            ColorSpace::Gray8 => FfColorSpace::Gray8,
            ColorSpace::Rgba8 => FfColorSpace::Rgba8,
            ColorSpace::Bgra8 => FfColorSpace::Bgra8,
        }
    }
}

/// Parse a raw tag from C into a color space.
pub(crate) fn color_space_from_raw(raw: i32) -> Result<ColorSpace, FfStatus> {
    u8::try_from(raw)
        .ok()
        .and_then(ColorSpace::from_tag)
        .ok_or(FfStatus::InvalidArgument)
}

/// Whether a handle owns its memory.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FfOwnership {
    /// Releasing the handle releases a buffer reference.
    Owned = 0,
    /// Releasing the handle frees nothing.
    Borrowed = 1,
}

impl From<Ownership> for FfOwnership {
    fn from(o: Ownership) -> Self {
        match o {
            Ownership::Owned => FfOwnership::Owned,
            Ownership::Borrowed => FfOwnership::Borrowed,
        }
    }
}
