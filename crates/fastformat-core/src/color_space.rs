//! Pixel channel layouts.

use std::fmt;
use std::str::FromStr;

use crate::error::ImageError;

/// Closed set of pixel layouts supported by the interchange core.
///
/// Every variant is 8 bits per channel, row-major, channels interleaved.
/// The integer discriminant is the tag used at the C ABI and must stay
/// stable across releases.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColorSpace {
    /// Blue, green, red.
    Bgr8 = 0,
    /// Red, green, blue.
    Rgb8 = 1,
    /// Single luminance channel.
    Gray8 = 2,
    /// Red, green, blue, alpha.
    Rgba8 = 3,
    /// Blue, green, red, alpha.
    Bgra8 = 4,
}

impl ColorSpace {
    /// All variants, in tag order.
    pub const ALL: [ColorSpace; 5] = [
        ColorSpace::Bgr8,
        ColorSpace::Rgb8,
        ColorSpace::Gray8,
        ColorSpace::Rgba8,
        ColorSpace::Bgra8,
    ];

    /// Number of interleaved channels (and bytes) per pixel.
    pub const fn channels(self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Bgr8 | Self::Rgb8 => 3,
            Self::Rgba8 | Self::Bgra8 => 4,
        }
    }

    /// The string tag stored in interchange records.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bgr8 => "BGR8",
            Self::Rgb8 => "RGB8",
            Self::Gray8 => "GRAY8",
            Self::Rgba8 => "RGBA8",
            Self::Bgra8 => "BGRA8",
        }
    }

    /// The integer tag used at the C ABI.
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Inverse of [`ColorSpace::tag`].
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Bgr8),
            1 => Some(Self::Rgb8),
            2 => Some(Self::Gray8),
            3 => Some(Self::Rgba8),
            4 => Some(Self::Bgra8),
            _ => None,
        }
    }

    /// Whether the layout carries an alpha channel.
    pub const fn has_alpha(self) -> bool {
        matches!(self, Self::Rgba8 | Self::Bgra8)
    }
}

impl fmt::Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorSpace {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|cs| cs.as_str() == s)
            .ok_or_else(|| ImageError::SchemaMismatch {
                reason: format!("unknown encoding '{s}'"),
            })
    }
}
