//! Images sharing one buffer across threads.

use std::thread;

use crossbeam_channel::unbounded;
use fastformat_arena::BufferArena;
use fastformat_core::ColorSpace;
use fastformat_image::TypedImage;
use fastformat_test_utils::{gradient, random_pixels};

#[test]
fn buffer_freed_once_after_all_threads_drop() {
    let arena = BufferArena::default();
    let pixels = random_pixels(7, 8 * 8 * 3);
    let image =
        TypedImage::from_slice_in(&arena, &pixels, 8, 8, ColorSpace::Rgb8, Some("shared")).unwrap();

    let (tx, rx) = unbounded();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let image = image.clone();
            let tx = tx.clone();
            thread::spawn(move || {
                // Shared, so this must copy and leave the original alone.
                let bgr = image.clone().into_bgr8().unwrap();
                tx.send((image, bgr)).unwrap();
            })
        })
        .collect();
    drop(tx);
    for h in handles {
        h.join().unwrap();
    }

    let results: Vec<_> = rx.iter().collect();
    assert_eq!(results.len(), 4);
    for (original, bgr) in &results {
        assert_eq!(original.as_ptr(), image.as_ptr());
        assert_eq!(original.pixels(), &pixels[..]);
        assert_ne!(bgr.as_ptr(), image.as_ptr());
    }

    drop(image);
    // Four originals still hold the buffer, plus four converted copies.
    assert_eq!(arena.stats().live_buffers, 5);
    drop(results);
    assert_eq!(arena.stats().live_buffers, 0);
    assert_eq!(arena.stats().total_frees, 5);
}

#[test]
fn conversion_chain_restores_pixels() {
    let original = gradient(5, 3, ColorSpace::Bgr8);
    let image = TypedImage::new_bgr8(original.clone(), 5, 3, Some("chain")).unwrap();
    let image = image
        .into_rgba8()
        .and_then(|i| i.into_bgra8())
        .and_then(|i| i.into_rgb8())
        .and_then(|i| i.into_bgr8())
        .unwrap();
    assert_eq!(image.pixels(), &original[..]);
    assert_eq!(image.name(), Some("chain"));
    assert_eq!((image.width(), image.height()), (5, 3));
}
