//! Image metadata shared by owned images, borrowed views and records.

use crate::color_space::ColorSpace;
use crate::error::ImageError;

/// Geometry, layout and name of an image, independent of its pixels.
///
/// An `ImageSchema` is only constructed through [`ImageSchema::new`], which
/// rejects zero-sized and overflowing geometry, so `expected_len()` is
/// always a positive byte count.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSchema {
    width: u32,
    height: u32,
    color_space: ColorSpace,
    name: Option<String>,
    expected_len: usize,
}

impl ImageSchema {
    /// Validate geometry and build a schema.
    ///
    /// An empty name is normalised to `None`; interchange records encode
    /// "unnamed" as the empty string and the two must round-trip.
    pub fn new(
        width: u32,
        height: u32,
        color_space: ColorSpace,
        name: Option<&str>,
    ) -> Result<Self, ImageError> {
        let invalid = || ImageError::InvalidBufferLength {
            width,
            height,
            color_space,
            actual: 0,
        };
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        let expected_len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(color_space.channels()))
            .ok_or_else(invalid)?;
        Ok(Self {
            width,
            height,
            color_space,
            name: name.filter(|n| !n.is_empty()).map(str::to_owned),
            expected_len,
        })
    }

    /// Check that a pixel buffer of `len` bytes fits this schema.
    pub fn check_len(&self, len: usize) -> Result<(), ImageError> {
        if len == self.expected_len {
            Ok(())
        } else {
            Err(ImageError::InvalidBufferLength {
                width: self.width,
                height: self.height,
                color_space: self.color_space,
                actual: len,
            })
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout.
    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Optional human-readable name.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Number of pixels.
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Required pixel buffer length in bytes.
    pub fn expected_len(&self) -> usize {
        self.expected_len
    }

    /// Same geometry and name under a different layout.
    ///
    /// Fails only if the new layout's byte length overflows.
    pub fn with_color_space(&self, color_space: ColorSpace) -> Result<Self, ImageError> {
        Self::new(self.width, self.height, color_space, self.name())
    }
}
