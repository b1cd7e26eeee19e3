//! Images over adopted foreign memory.

use fastformat_arena::BufferArena;
use fastformat_core::{ColorSpace, ImageSchema, Ownership};
use fastformat_image::{ColorSpaceConverter, TypedImage};
use fastformat_test_utils::{external_bytes, solid, ReleaseCounter};

fn adopted(
    arena: &BufferArena,
    pixels: Vec<u8>,
    w: u32,
    h: u32,
    cs: ColorSpace,
    counter: &ReleaseCounter,
) -> TypedImage<'static> {
    let (ptr, len, hook) = external_bytes(pixels, counter);
    // SAFETY: the hook owns the bytes until it runs.
    let buffer = unsafe { arena.adopt_external(ptr, len, Some(hook)) };
    TypedImage::from_buffer(buffer, ImageSchema::new(w, h, cs, Some("ext")).unwrap()).unwrap()
}

#[test]
fn in_place_swap_keeps_foreign_memory() {
    let arena = BufferArena::default();
    let counter = ReleaseCounter::new();
    let image = adopted(&arena, solid(3, 2, &[1, 2, 3]), 3, 2, ColorSpace::Bgr8, &counter);
    let addr = image.as_ptr();
    assert_eq!(image.ownership(), Ownership::Owned);

    let rgb = image.into_rgb8().unwrap();
    assert_eq!(rgb.as_ptr(), addr);
    assert_eq!(rgb.pixels(), &solid(3, 2, &[3, 2, 1])[..]);
    assert_eq!(counter.count(), 0);

    drop(rgb);
    assert_eq!(counter.count(), 1);
    assert_eq!(arena.stats().live_buffers, 0);
}

#[test]
fn widening_releases_source_once() {
    let arena = BufferArena::default();
    let counter = ReleaseCounter::new();
    let image = adopted(&arena, solid(2, 2, &[9]), 2, 2, ColorSpace::Gray8, &counter);

    let bgra = image.into_bgra8().unwrap();
    assert_eq!(bgra.pixels(), &solid(2, 2, &[9, 9, 9, 255])[..]);
    // The gray source had a single reference, so it went with the conversion.
    assert_eq!(counter.count(), 1);
    assert!(!bgra.buffer().unwrap().is_external());
}

#[test]
fn alpha_layouts_never_reduce_to_gray() {
    for src in ColorSpace::ALL.into_iter().filter(|cs| cs.has_alpha()) {
        assert!(!ColorSpaceConverter::is_supported(src, ColorSpace::Gray8));
        assert!(ColorSpaceConverter::targets(src).contains(&ColorSpace::Rgb8));
    }
}
