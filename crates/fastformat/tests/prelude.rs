//! The documented workflow through the facade alone.

use fastformat::prelude::*;
use fastformat_test_utils::gradient;

#[test]
fn new_convert_and_interchange() {
    let pixels = gradient(4, 2, ColorSpace::Bgr8);
    let image = TypedImage::new_bgr8(pixels.clone(), 4, 2, Some("cam0")).unwrap();
    let addr = image.as_ptr();

    // Unique buffer and a permutation: converted in place.
    let rgb = image.into_rgb8().unwrap();
    assert_eq!(rgb.as_ptr(), addr);

    let record = rgb.into_arrow().unwrap();
    let back = from_arrow(&record).unwrap();
    assert_eq!(back.as_ptr(), addr);
    assert_eq!(back.name(), Some("cam0"));
    assert_eq!(back.color_space(), ColorSpace::Rgb8);

    let bgr = back.into_bgr8().unwrap();
    assert_eq!(bgr.pixels(), &pixels[..]);
}

#[test]
fn bad_length_is_rejected() {
    let err = TypedImage::new_rgb8(vec![0; 5], 1, 1, None).unwrap_err();
    assert!(matches!(err, ImageError::InvalidBufferLength { .. }));
}
