//! Deterministic pixel data.

use fastformat_core::ColorSpace;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Packed pixels where every byte differs from its channel neighbours.
///
/// Byte `c` of pixel `(x, y)` is `x * 7 + y * 13 + c * 50`, wrapped to
/// `u8`, so any channel permutation is visible in the output.
pub fn gradient(width: u32, height: u32, color_space: ColorSpace) -> Vec<u8> {
    let channels = color_space.channels();
    let mut out = Vec::with_capacity(width as usize * height as usize * channels);
    for y in 0..height as usize {
        for x in 0..width as usize {
            for c in 0..channels {
                out.push((x * 7 + y * 13 + c * 50) as u8);
            }
        }
    }
    out
}

/// `len` bytes from a ChaCha8 stream seeded with `seed`.
pub fn random_pixels(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut out = vec![0u8; len];
    rng.fill_bytes(&mut out);
    out
}

/// Every pixel set to `pixel`, whose length must match the layout.
pub fn solid(width: u32, height: u32, pixel: &[u8]) -> Vec<u8> {
    pixel.repeat(width as usize * height as usize)
}
