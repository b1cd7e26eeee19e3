//! Pixel layout conversion.
//!
//! Every supported `(source, target)` pair maps to a [`Transform`]: for
//! each output channel, the source channel it copies or a synthesized
//! opaque alpha. Pairs missing from the table fail with
//! `UnsupportedConversion`.

use fastformat_arena::{BufferArena, BufferRef};
use fastformat_core::{ColorSpace, ImageError};
use smallvec::SmallVec;

/// Where one output channel comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    /// Copy this source channel.
    Source(u8),
    /// Write `0xFF`.
    Opaque,
}

use Channel::{Opaque as A, Source as C};

const IDENTITY: &[Channel] = &[C(0), C(1), C(2), C(3)];
const SWAP3: &[Channel] = &[C(2), C(1), C(0)];
const KEEP3: &[Channel] = &[C(0), C(1), C(2)];
const KEEP3_ADD_ALPHA: &[Channel] = &[C(0), C(1), C(2), A];
const SWAP3_ADD_ALPHA: &[Channel] = &[C(2), C(1), C(0), A];
const SWAP4: &[Channel] = &[C(2), C(1), C(0), C(3)];
const GRAY3: &[Channel] = &[C(0), C(0), C(0)];
const GRAY4: &[Channel] = &[C(0), C(0), C(0), A];

/// Per-pixel channel mapping between two layouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transform {
    src_channels: usize,
    map: &'static [Channel],
}

impl Transform {
    /// Look up the transform from `src` to `dst`, if the pair is supported.
    pub fn lookup(src: ColorSpace, dst: ColorSpace) -> Option<Self> {
        use ColorSpace::*;
        let map = match (src, dst) {
            _ if src == dst => &IDENTITY[..src.channels()],
            (Rgb8, Bgr8) | (Bgr8, Rgb8) => SWAP3,
            (Rgb8, Rgba8) | (Bgr8, Bgra8) => KEEP3_ADD_ALPHA,
            (Rgb8, Bgra8) | (Bgr8, Rgba8) => SWAP3_ADD_ALPHA,
            (Rgba8, Rgb8) | (Bgra8, Bgr8) => KEEP3,
            (Rgba8, Bgr8) | (Bgra8, Rgb8) => SWAP3,
            (Rgba8, Bgra8) | (Bgra8, Rgba8) => SWAP4,
            (Gray8, Rgb8) | (Gray8, Bgr8) => GRAY3,
            (Gray8, Rgba8) | (Gray8, Bgra8) => GRAY4,
            _ => return None,
        };
        Some(Self {
            src_channels: src.channels(),
            map,
        })
    }

    /// Bytes per source pixel.
    pub fn src_channels(&self) -> usize {
        self.src_channels
    }

    /// Bytes per output pixel.
    pub fn dst_channels(&self) -> usize {
        self.map.len()
    }

    /// Output channel sources, one entry per output channel.
    pub fn map(&self) -> &'static [Channel] {
        self.map
    }

    /// Whether output equals input.
    pub fn is_identity(&self) -> bool {
        self.src_channels == self.map.len() && self.map == &IDENTITY[..self.src_channels]
    }

    /// Whether the transform only reorders bytes within a pixel, so it can
    /// run over the source buffer in place.
    pub fn is_permutation(&self) -> bool {
        self.src_channels == self.map.len() && self.map.iter().all(|c| matches!(c, C(_)))
    }

    /// Output length for `src_len` input bytes.
    ///
    /// Fails if `src_len` is not a whole number of source pixels.
    pub fn output_len(&self, src_len: usize) -> Result<usize, ImageError> {
        if src_len % self.src_channels != 0 {
            return Err(ImageError::SchemaMismatch {
                reason: format!(
                    "{src_len} bytes is not a whole number of {}-byte pixels",
                    self.src_channels
                ),
            });
        }
        Ok(src_len / self.src_channels * self.map.len())
    }

    /// Write the converted pixels of `src` into `dst`.
    ///
    /// `dst` must be exactly `output_len(src.len())` bytes.
    pub fn apply(&self, src: &[u8], dst: &mut [u8]) {
        debug_assert_eq!(self.output_len(src.len()).ok(), Some(dst.len()));
        for (px, out) in src
            .chunks_exact(self.src_channels)
            .zip(dst.chunks_exact_mut(self.map.len()))
        {
            for (byte, channel) in out.iter_mut().zip(self.map) {
                *byte = match *channel {
                    C(i) => px[i as usize],
                    A => 0xFF,
                };
            }
        }
    }

    /// Convert `buf` in place. Only valid for permutations.
    pub fn apply_in_place(&self, buf: &mut [u8]) {
        debug_assert!(self.is_permutation());
        let mut px = [0u8; 4];
        for chunk in buf.chunks_exact_mut(self.src_channels) {
            px[..chunk.len()].copy_from_slice(chunk);
            for (byte, channel) in chunk.iter_mut().zip(self.map) {
                if let C(i) = *channel {
                    *byte = px[i as usize];
                }
            }
        }
    }
}

/// Converts pixel buffers between layouts, allocating outputs from one
/// arena.
///
/// Stateless apart from the arena; cheap to construct per call.
#[derive(Clone, Debug)]
pub struct ColorSpaceConverter {
    arena: BufferArena,
}

impl ColorSpaceConverter {
    /// Converter that allocates from `arena`.
    pub fn new(arena: BufferArena) -> Self {
        Self { arena }
    }

    /// Whether `src -> dst` is in the table.
    pub fn is_supported(src: ColorSpace, dst: ColorSpace) -> bool {
        Transform::lookup(src, dst).is_some()
    }

    /// Every layout `src` converts to, itself included, in tag order.
    pub fn targets(src: ColorSpace) -> SmallVec<[ColorSpace; 8]> {
        ColorSpace::ALL
            .iter()
            .copied()
            .filter(|&dst| Self::is_supported(src, dst))
            .collect()
    }

    fn transform(src: ColorSpace, dst: ColorSpace) -> Result<Transform, ImageError> {
        Transform::lookup(src, dst).ok_or(ImageError::UnsupportedConversion { from: src, to: dst })
    }

    /// Convert a shared buffer.
    ///
    /// Identity returns another reference to `buffer`. Anything else
    /// allocates, leaving `buffer` untouched.
    pub fn convert(
        &self,
        buffer: &BufferRef,
        src: ColorSpace,
        dst: ColorSpace,
    ) -> Result<BufferRef, ImageError> {
        let transform = Self::transform(src, dst)?;
        if transform.is_identity() {
            return Ok(buffer.clone());
        }
        self.convert_slice_with(&transform, buffer.as_slice())
    }

    /// Convert a buffer the caller gives up.
    ///
    /// Permutations on a uniquely held buffer rewrite it in place and keep
    /// its address. On failure the buffer comes back unchanged.
    pub fn convert_owned(
        &self,
        mut buffer: BufferRef,
        src: ColorSpace,
        dst: ColorSpace,
    ) -> Result<BufferRef, (BufferRef, ImageError)> {
        let transform = match Self::transform(src, dst) {
            Ok(t) => t,
            Err(e) => return Err((buffer, e)),
        };
        if transform.is_identity() {
            return Ok(buffer);
        }
        if let Err(e) = transform.output_len(buffer.len()) {
            return Err((buffer, e));
        }
        if transform.is_permutation() {
            if let Some(bytes) = buffer.get_mut() {
                transform.apply_in_place(bytes);
                return Ok(buffer);
            }
        }
        match self.convert_slice_with(&transform, buffer.as_slice()) {
            Ok(out) => Ok(out),
            Err(e) => Err((buffer, e)),
        }
    }

    /// Convert borrowed bytes into a new buffer. Identity still copies.
    pub fn convert_slice(
        &self,
        bytes: &[u8],
        src: ColorSpace,
        dst: ColorSpace,
    ) -> Result<BufferRef, ImageError> {
        let transform = Self::transform(src, dst)?;
        self.convert_slice_with(&transform, bytes)
    }

    fn convert_slice_with(
        &self,
        transform: &Transform,
        bytes: &[u8],
    ) -> Result<BufferRef, ImageError> {
        let len = transform.output_len(bytes.len())?;
        let out = self
            .arena
            .allocate_with(len, |dst| transform.apply(bytes, dst))?;
        Ok(out)
    }
}

impl Default for ColorSpaceConverter {
    fn default() -> Self {
        Self::new(BufferArena::shared().clone())
    }
}
