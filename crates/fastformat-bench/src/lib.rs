//! Benchmark frame profiles for fastformat.
//!
//! - [`Resolution`]: the frame sizes every benchmark is run at
//! - [`frame`]: a deterministic owned image at a given size and layout

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use fastformat_arena::BufferArena;
use fastformat_core::{ColorSpace, ImageError};
use fastformat_image::TypedImage;
use fastformat_test_utils::random_pixels;

/// Standard camera frame sizes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// 640x480.
    Vga,
    /// 1280x720.
    Hd,
    /// 1920x1080.
    FullHd,
}

impl Resolution {
    /// All sizes, smallest first.
    pub const ALL: [Resolution; 3] = [Resolution::Vga, Resolution::Hd, Resolution::FullHd];

    /// `(width, height)` in pixels.
    pub const fn dims(self) -> (u32, u32) {
        match self {
            Resolution::Vga => (640, 480),
            Resolution::Hd => (1280, 720),
            Resolution::FullHd => (1920, 1080),
        }
    }

    /// Short label for benchmark ids.
    pub const fn label(self) -> &'static str {
        match self {
            Resolution::Vga => "vga",
            Resolution::Hd => "hd",
            Resolution::FullHd => "fhd",
        }
    }

    /// Bytes in one frame of `color_space`.
    pub const fn frame_len(self, color_space: ColorSpace) -> usize {
        let (w, h) = self.dims();
        w as usize * h as usize * color_space.channels()
    }
}

/// A frame of noise in `arena`, named after its size.
pub fn frame(
    arena: &BufferArena,
    resolution: Resolution,
    color_space: ColorSpace,
    seed: u64,
) -> Result<TypedImage<'static>, ImageError> {
    let (w, h) = resolution.dims();
    let pixels = random_pixels(seed, resolution.frame_len(color_space));
    TypedImage::new_in(arena, pixels, w, h, color_space, Some(resolution.label()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_match_their_resolution() {
        let arena = BufferArena::default();
        for r in Resolution::ALL {
            let img = frame(&arena, r, ColorSpace::Bgr8, 1).unwrap();
            assert_eq!((img.width(), img.height()), r.dims());
            assert_eq!(img.len(), r.frame_len(ColorSpace::Bgr8));
            assert_eq!(img.name(), Some(r.label()));
        }
    }
}
