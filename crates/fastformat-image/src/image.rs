//! The typed image value.

use std::error::Error;
use std::fmt;

use fastformat_arena::{BufferArena, BufferRef};
use fastformat_core::{ColorSpace, ImageError, ImageSchema, Ownership};

use crate::convert::ColorSpaceConverter;

/// Pixel storage behind a [`TypedImage`].
#[derive(Clone)]
pub enum ImageData<'a> {
    /// One counted reference to an arena buffer.
    Owned(BufferRef),
    /// A view of bytes owned elsewhere, alive for `'a`.
    Borrowed(&'a [u8]),
}

impl ImageData<'_> {
    /// The pixel bytes.
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Self::Owned(buffer) => buffer.as_slice(),
            Self::Borrowed(bytes) => bytes,
        }
    }

    /// Owned or borrowed.
    pub fn ownership(&self) -> Ownership {
        match self {
            Self::Owned(_) => Ownership::Owned,
            Self::Borrowed(_) => Ownership::Borrowed,
        }
    }
}

/// A pixel buffer with validated geometry, layout and name.
///
/// The buffer length always equals `width * height * channels`. Owned
/// images hold one reference to an arena buffer; cloning one retains the
/// buffer, dropping it releases. Borrowed images carry the lifetime of the
/// bytes they view and release nothing.
///
/// Conversions consume the image, so a converted-away handle cannot be
/// used again.
///
/// # Examples
///
/// ```
/// use fastformat_image::TypedImage;
///
/// let image = TypedImage::new_bgr8(vec![0, 0, 0], 1, 1, Some("test")).unwrap();
/// let image = image.into_rgb8().unwrap();
/// assert_eq!(image.name(), Some("test"));
/// assert_eq!(image.pixels(), &[0, 0, 0]);
/// ```
#[derive(Clone)]
pub struct TypedImage<'a> {
    schema: ImageSchema,
    data: ImageData<'a>,
}

impl TypedImage<'static> {
    /// Adopt `data` into the shared arena without copying.
    ///
    /// Fails with `InvalidBufferLength` before taking ownership of anything
    /// if `data` does not match the geometry.
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        color_space: ColorSpace,
        name: Option<&str>,
    ) -> Result<Self, ImageError> {
        Self::new_in(BufferArena::shared(), data, width, height, color_space, name)
    }

    /// Like [`new`](Self::new) with an explicit arena.
    pub fn new_in(
        arena: &BufferArena,
        data: Vec<u8>,
        width: u32,
        height: u32,
        color_space: ColorSpace,
        name: Option<&str>,
    ) -> Result<Self, ImageError> {
        let schema = ImageSchema::new(width, height, color_space, name)?;
        schema.check_len(data.len())?;
        Ok(Self {
            schema,
            data: ImageData::Owned(arena.adopt_vec(data)),
        })
    }

    /// Copy `bytes` into a new buffer from `arena`.
    pub fn from_slice_in(
        arena: &BufferArena,
        bytes: &[u8],
        width: u32,
        height: u32,
        color_space: ColorSpace,
        name: Option<&str>,
    ) -> Result<Self, ImageError> {
        let schema = ImageSchema::new(width, height, color_space, name)?;
        schema.check_len(bytes.len())?;
        Ok(Self {
            schema,
            data: ImageData::Owned(arena.copy_from_slice(bytes)?),
        })
    }

    /// Wrap an existing buffer reference.
    pub fn from_buffer(buffer: BufferRef, schema: ImageSchema) -> Result<Self, ImageError> {
        schema.check_len(buffer.len())?;
        Ok(Self {
            schema,
            data: ImageData::Owned(buffer),
        })
    }

    /// BGR8 image from packed bytes.
    pub fn new_bgr8(
        data: Vec<u8>,
        width: u32,
        height: u32,
        name: Option<&str>,
    ) -> Result<Self, ImageError> {
        Self::new(data, width, height, ColorSpace::Bgr8, name)
    }

    /// RGB8 image from packed bytes.
    pub fn new_rgb8(
        data: Vec<u8>,
        width: u32,
        height: u32,
        name: Option<&str>,
    ) -> Result<Self, ImageError> {
        Self::new(data, width, height, ColorSpace::Rgb8, name)
    }

    /// GRAY8 image from packed bytes.
    pub fn new_gray8(
        data: Vec<u8>,
        width: u32,
        height: u32,
        name: Option<&str>,
    ) -> Result<Self, ImageError> {
        Self::new(data, width, height, ColorSpace::Gray8, name)
    }

    /// RGBA8 image from packed bytes.
    pub fn new_rgba8(
        data: Vec<u8>,
        width: u32,
        height: u32,
        name: Option<&str>,
    ) -> Result<Self, ImageError> {
        Self::new(data, width, height, ColorSpace::Rgba8, name)
    }

    /// BGRA8 image from packed bytes.
    pub fn new_bgra8(
        data: Vec<u8>,
        width: u32,
        height: u32,
        name: Option<&str>,
    ) -> Result<Self, ImageError> {
        Self::new(data, width, height, ColorSpace::Bgra8, name)
    }
}

impl<'a> TypedImage<'a> {
    /// Borrowed image over caller bytes. Nothing is copied or freed.
    pub fn view(
        bytes: &'a [u8],
        width: u32,
        height: u32,
        color_space: ColorSpace,
        name: Option<&str>,
    ) -> Result<Self, ImageError> {
        Self::view_with_schema(bytes, ImageSchema::new(width, height, color_space, name)?)
    }

    /// Borrowed image over caller bytes described by `schema`.
    pub fn view_with_schema(bytes: &'a [u8], schema: ImageSchema) -> Result<Self, ImageError> {
        schema.check_len(bytes.len())?;
        Ok(Self {
            schema,
            data: ImageData::Borrowed(bytes),
        })
    }

    /// Image name, if any.
    pub fn name(&self) -> Option<&str> {
        self.schema.name()
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.schema.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.schema.height()
    }

    /// Pixel layout.
    pub fn color_space(&self) -> ColorSpace {
        self.schema.color_space()
    }

    /// Whether dropping this image releases a buffer reference.
    pub fn ownership(&self) -> Ownership {
        self.data.ownership()
    }

    /// Pixel buffer length in bytes.
    pub fn len(&self) -> usize {
        self.schema.expected_len()
    }

    /// Always false: images have at least one pixel.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The pixel bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.data.as_slice()
    }

    /// Address of the first pixel byte.
    ///
    /// Valid while this image, or any handle sharing its buffer, is alive.
    pub fn as_ptr(&self) -> *const u8 {
        self.pixels().as_ptr()
    }

    /// Geometry, layout and name.
    pub fn schema(&self) -> &ImageSchema {
        &self.schema
    }

    /// The backing buffer, for owned images.
    pub fn buffer(&self) -> Option<&BufferRef> {
        match &self.data {
            ImageData::Owned(buffer) => Some(buffer),
            ImageData::Borrowed(_) => None,
        }
    }

    /// Split into metadata and storage.
    pub fn into_parts(self) -> (ImageSchema, ImageData<'a>) {
        (self.schema, self.data)
    }

    /// Detach from borrowed bytes by copying them into the shared arena.
    /// Owned images pass through untouched.
    pub fn into_owned(self) -> Result<TypedImage<'static>, ImageError> {
        match self.data {
            ImageData::Owned(buffer) => Ok(TypedImage {
                schema: self.schema,
                data: ImageData::Owned(buffer),
            }),
            ImageData::Borrowed(bytes) => Ok(TypedImage {
                data: ImageData::Owned(BufferArena::shared().copy_from_slice(bytes)?),
                schema: self.schema,
            }),
        }
    }

    /// Convert to another layout, consuming the image.
    ///
    /// Identity returns the image unchanged. An owned image whose buffer
    /// is not shared is rewritten in place when the layouts only permute
    /// bytes; otherwise a new buffer is allocated from the source buffer's
    /// arena (the shared arena for borrowed images). Borrowed bytes are
    /// never written.
    pub fn into_color_space(self, dst: ColorSpace) -> Result<Self, ConversionError<'a>> {
        let src = self.color_space();
        if src == dst {
            return Ok(self);
        }
        if !ColorSpaceConverter::is_supported(src, dst) {
            return Err(ConversionError::new(
                ImageError::UnsupportedConversion { from: src, to: dst },
                self,
            ));
        }
        let schema = match self.schema.with_color_space(dst) {
            Ok(schema) => schema,
            Err(e) => return Err(ConversionError::new(e, self)),
        };
        match self.data {
            ImageData::Owned(buffer) => {
                let converter = ColorSpaceConverter::new(buffer.arena());
                match converter.convert_owned(buffer, src, dst) {
                    Ok(out) => Ok(Self {
                        schema,
                        data: ImageData::Owned(out),
                    }),
                    Err((buffer, e)) => Err(ConversionError::new(
                        e,
                        Self {
                            schema: self.schema,
                            data: ImageData::Owned(buffer),
                        },
                    )),
                }
            }
            ImageData::Borrowed(bytes) => {
                match ColorSpaceConverter::default().convert_slice(bytes, src, dst) {
                    Ok(out) => Ok(Self {
                        schema,
                        data: ImageData::Owned(out),
                    }),
                    Err(e) => Err(ConversionError::new(
                        e,
                        Self {
                            schema: self.schema,
                            data: ImageData::Borrowed(bytes),
                        },
                    )),
                }
            }
        }
    }

    /// Convert to RGB8.
    pub fn into_rgb8(self) -> Result<Self, ConversionError<'a>> {
        self.into_color_space(ColorSpace::Rgb8)
    }

    /// Convert to BGR8.
    pub fn into_bgr8(self) -> Result<Self, ConversionError<'a>> {
        self.into_color_space(ColorSpace::Bgr8)
    }

    /// Convert to GRAY8. Only GRAY8 sources succeed.
    pub fn into_gray8(self) -> Result<Self, ConversionError<'a>> {
        self.into_color_space(ColorSpace::Gray8)
    }

    /// Convert to RGBA8.
    pub fn into_rgba8(self) -> Result<Self, ConversionError<'a>> {
        self.into_color_space(ColorSpace::Rgba8)
    }

    /// Convert to BGRA8.
    pub fn into_bgra8(self) -> Result<Self, ConversionError<'a>> {
        self.into_color_space(ColorSpace::Bgra8)
    }
}

impl fmt::Debug for TypedImage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("color_space", &self.color_space())
            .field("name", &self.name())
            .field("ownership", &self.ownership())
            .field("ptr", &self.as_ptr())
            .finish()
    }
}

/// A failed conversion, carrying the untouched source image.
#[derive(Debug)]
pub struct ConversionError<'a> {
    error: ImageError,
    image: TypedImage<'a>,
}

impl<'a> ConversionError<'a> {
    fn new(error: ImageError, image: TypedImage<'a>) -> Self {
        Self { error, image }
    }

    /// What went wrong.
    pub fn error(&self) -> &ImageError {
        &self.error
    }

    /// Take back the source image.
    pub fn into_image(self) -> TypedImage<'a> {
        self.image
    }

    /// Split into the error and the source image.
    pub fn into_parts(self) -> (ImageError, TypedImage<'a>) {
        (self.error, self.image)
    }
}

impl fmt::Display for ConversionError<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl Error for ConversionError<'_> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.error)
    }
}

impl From<ConversionError<'_>> for ImageError {
    fn from(e: ConversionError<'_>) -> Self {
        e.error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastformat_arena::ArenaConfig;
    use fastformat_test_utils::gradient;

    #[test]
    fn construction_preserves_metadata() {
        let image = TypedImage::new_bgr8(vec![0, 0, 0], 1, 1, Some("test")).unwrap();
        assert_eq!(image.name(), Some("test"));
        assert_eq!(image.width(), 1);
        assert_eq!(image.height(), 1);
        assert_eq!(image.color_space(), ColorSpace::Bgr8);
        assert_eq!(image.ownership(), Ownership::Owned);
    }

    #[test]
    fn construction_adopts_without_copy() {
        let data = vec![1u8; 12];
        let addr = data.as_ptr();
        let image = TypedImage::new_rgb8(data, 2, 2, None).unwrap();
        assert_eq!(image.as_ptr(), addr);
    }

    #[test]
    fn wrong_length_rejected_without_allocating() {
        let arena = BufferArena::default();
        let err = TypedImage::new_in(&arena, vec![0; 5], 1, 2, ColorSpace::Rgb8, None).unwrap_err();
        assert_eq!(
            err,
            ImageError::InvalidBufferLength {
                width: 1,
                height: 2,
                color_space: ColorSpace::Rgb8,
                actual: 5
            }
        );
        assert_eq!(arena.stats().total_adoptions, 0);
        assert_eq!(arena.stats().live_buffers, 0);
    }

    #[test]
    fn bgr_to_rgb_example() {
        let image = TypedImage::new_bgr8(vec![0, 0, 0], 1, 1, Some("test")).unwrap();
        let rgb = image.into_rgb8().unwrap();
        assert_eq!(rgb.pixels(), &[0, 0, 0]);
        assert_eq!(rgb.name(), Some("test"));
        assert_eq!(rgb.color_space(), ColorSpace::Rgb8);
    }

    #[test]
    fn round_trip_restores_bytes() {
        let image = TypedImage::new_bgr8(vec![10, 20, 30], 1, 1, None).unwrap();
        let rgb = image.into_rgb8().unwrap();
        assert_eq!(rgb.pixels(), &[30, 20, 10]);
        let bgr = rgb.into_bgr8().unwrap();
        assert_eq!(bgr.pixels(), &[10, 20, 30]);
    }

    #[test]
    fn unique_conversion_keeps_address() {
        let image = TypedImage::new_rgb8(gradient(4, 4, ColorSpace::Rgb8), 4, 4, None).unwrap();
        let addr = image.as_ptr();
        let bgr = image.into_bgr8().unwrap();
        assert_eq!(bgr.as_ptr(), addr);
    }

    #[test]
    fn shared_conversion_copies_and_keeps_source() {
        let original = gradient(2, 2, ColorSpace::Rgb8);
        let image = TypedImage::new_rgb8(original.clone(), 2, 2, None).unwrap();
        let other = image.clone();
        let bgr = image.into_bgr8().unwrap();
        assert_ne!(bgr.as_ptr(), other.as_ptr());
        assert_eq!(other.pixels(), &original[..]);
    }

    #[test]
    fn channel_change_reallocates() {
        let image = TypedImage::new_gray8(vec![1, 2], 2, 1, Some("g")).unwrap();
        let rgba = image.into_rgba8().unwrap();
        assert_eq!(rgba.pixels(), &[1, 1, 1, 255, 2, 2, 2, 255]);
        assert_eq!(rgba.len(), 8);
        assert_eq!(rgba.width(), 2);
        assert_eq!(rgba.height(), 1);
    }

    #[test]
    fn unsupported_conversion_returns_image() {
        let image = TypedImage::new_rgb8(vec![1, 2, 3], 1, 1, Some("keep")).unwrap();
        let addr = image.as_ptr();
        let err = image.into_gray8().unwrap_err();
        assert!(matches!(
            err.error(),
            ImageError::UnsupportedConversion {
                from: ColorSpace::Rgb8,
                to: ColorSpace::Gray8
            }
        ));
        let back = err.into_image();
        assert_eq!(back.as_ptr(), addr);
        assert_eq!(back.name(), Some("keep"));
        assert_eq!(back.pixels(), &[1, 2, 3]);
    }

    #[test]
    fn limit_failure_returns_image() {
        let arena = BufferArena::new(ArenaConfig::with_limit(8)).unwrap();
        let image =
            TypedImage::from_slice_in(&arena, &[0; 4], 2, 2, ColorSpace::Gray8, None).unwrap();
        let before = arena.stats();
        let err = image.into_rgb8().unwrap_err();
        assert_eq!(err.error(), &ImageError::AllocationFailure { requested: 12 });
        assert_eq!(arena.stats(), before);
        assert_eq!(err.into_image().color_space(), ColorSpace::Gray8);
    }

    #[test]
    fn borrowed_view_never_written() {
        let bytes = [1u8, 2, 3, 4, 5, 6];
        let view = TypedImage::view(&bytes, 2, 1, ColorSpace::Bgr8, None).unwrap();
        assert_eq!(view.ownership(), Ownership::Borrowed);
        assert_eq!(view.as_ptr(), bytes.as_ptr());
        let rgb = view.into_rgb8().unwrap();
        assert_eq!(rgb.ownership(), Ownership::Owned);
        assert_eq!(rgb.pixels(), &[3, 2, 1, 6, 5, 4]);
        assert_eq!(bytes, [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn borrowed_identity_stays_borrowed() {
        let bytes = [9u8; 3];
        let view = TypedImage::view(&bytes, 1, 1, ColorSpace::Rgb8, None).unwrap();
        let same = view.into_rgb8().unwrap();
        assert_eq!(same.ownership(), Ownership::Borrowed);
        assert_eq!(same.as_ptr(), bytes.as_ptr());
    }

    #[test]
    fn into_owned_copies_borrowed() {
        let bytes = vec![4u8; 4];
        let owned = TypedImage::view(&bytes, 2, 2, ColorSpace::Gray8, Some("v"))
            .unwrap()
            .into_owned()
            .unwrap();
        drop(bytes);
        assert_eq!(owned.ownership(), Ownership::Owned);
        assert_eq!(owned.pixels(), &[4, 4, 4, 4]);
        assert_eq!(owned.name(), Some("v"));
    }

    #[test]
    fn clones_share_until_last_drop() {
        let arena = BufferArena::default();
        let image =
            TypedImage::from_slice_in(&arena, &[0; 3], 1, 1, ColorSpace::Rgb8, None).unwrap();
        let clones: Vec<_> = (0..5).map(|_| image.clone()).collect();
        assert_eq!(image.buffer().map(BufferRef::ref_count), Some(6));
        drop(image);
        for (i, c) in clones.into_iter().enumerate().rev() {
            assert_eq!(arena.stats().live_buffers, 1, "freed early at {i}");
            drop(c);
        }
        assert_eq!(arena.stats().live_buffers, 0);
        assert_eq!(arena.stats().total_frees, 1);
    }

    #[test]
    fn conversion_error_converts_to_image_error() {
        let image = TypedImage::new_bgra8(vec![0; 4], 1, 1, None).unwrap();
        let err: ImageError = image.into_gray8().unwrap_err().into();
        assert!(matches!(err, ImageError::UnsupportedConversion { .. }));
    }
}
