//! Moving images in and out of records without copying pixels.

use fastformat_arena::BufferArena;
use fastformat_core::{ColorSpace, ImageError, ImageSchema};
use fastformat_image::{ImageData, TypedImage};

use crate::raw::RawData;
use crate::record::ArrowRecord;

/// Column holding the image width.
pub const WIDTH: &str = "width";
/// Column holding the image height.
pub const HEIGHT: &str = "height";
/// Column holding the color space tag.
pub const ENCODING: &str = "encoding";
/// Column holding the image name, `""` when unnamed.
pub const NAME: &str = "name";
/// Column holding the pixel bytes.
pub const DATA: &str = "data";

/// Wrap an image in a record, consuming the image.
///
/// An owned image's buffer moves into the record's `data` child as is. A
/// borrowed image is copied once into the shared arena.
pub fn into_arrow(image: TypedImage<'_>) -> Result<ArrowRecord, ImageError> {
    let (schema, data) = image.into_parts();
    let buffer = match data {
        ImageData::Owned(buffer) => buffer,
        ImageData::Borrowed(bytes) => BufferArena::shared().copy_from_slice(bytes)?,
    };
    ArrowRecord::builder()
        .push_u32(WIDTH, schema.width())
        .push_u32(HEIGHT, schema.height())
        .push_utf8(ENCODING, schema.color_space().as_str())
        .push_utf8(NAME, schema.name().unwrap_or(""))
        .push_bytes(DATA, buffer)
        .finish()
}

/// Read and validate an image schema from a record's metadata columns.
pub fn read_schema(record: &ArrowRecord) -> Result<ImageSchema, ImageError> {
    let width = record.u32_scalar(WIDTH)?;
    let height = record.u32_scalar(HEIGHT)?;
    let color_space: ColorSpace = record.utf8_scalar(ENCODING)?.parse()?;
    // Records from other producers may carry a null name.
    let name = record.utf8_scalar_opt(NAME)?;
    ImageSchema::new(width, height, color_space, name).map_err(|e| {
        ImageError::SchemaMismatch {
            reason: e.to_string(),
        }
    })
}

/// Borrow a record's pixel bytes along with its schema.
///
/// Does not touch the buffer's reference count.
pub fn raw_data(record: &ArrowRecord) -> Result<RawData<'_>, ImageError> {
    let schema = read_schema(record)?;
    let buffer = record.bytes_column(DATA)?;
    let view = TypedImage::view_with_schema(buffer.as_slice(), schema).map_err(|e| {
        ImageError::SchemaMismatch {
            reason: e.to_string(),
        }
    })?;
    Ok(RawData::new(buffer, view))
}

/// Borrowed image over a record's bytes. Dropping it frees nothing.
pub fn view_from_raw_data<'r>(raw: &RawData<'r>) -> TypedImage<'r> {
    raw.view().clone()
}

/// Borrowed image over bytes that carry no metadata of their own.
pub fn view_from_bytes(bytes: &[u8], schema: ImageSchema) -> Result<TypedImage<'_>, ImageError> {
    TypedImage::view_with_schema(bytes, schema)
}

/// Owned image sharing the buffer behind `raw`, retaining it once.
pub fn from_raw_data(raw: &RawData<'_>) -> Result<TypedImage<'static>, ImageError> {
    TypedImage::from_buffer(raw.buffer().clone(), raw.schema().clone())
}

/// Owned image sharing the record's buffer.
///
/// Validates the metadata columns and the byte length first; on failure
/// the record is untouched and nothing is retained.
pub fn from_arrow(record: &ArrowRecord) -> Result<TypedImage<'static>, ImageError> {
    from_raw_data(&raw_data(record)?)
}

/// Method syntax for [`into_arrow`].
pub trait ImageArrowExt {
    /// See [`into_arrow`].
    fn into_arrow(self) -> Result<ArrowRecord, ImageError>;
}

impl ImageArrowExt for TypedImage<'_> {
    fn into_arrow(self) -> Result<ArrowRecord, ImageError> {
        into_arrow(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use arrow::array::{Array, ArrayRef, StringArray, UInt32Array, UInt8Array, UnionArray};
    use arrow::buffer::ScalarBuffer;
    use arrow::datatypes::{DataType, Field, UnionFields};
    use fastformat_arena::{BufferArena, BufferRef};
    use fastformat_core::Ownership;

    fn record_with(width: u32, encoding: &str, data: &[u8]) -> ArrowRecord {
        ArrowRecord::builder()
            .push_u32(WIDTH, width)
            .push_u32(HEIGHT, 1)
            .push_utf8(ENCODING, encoding)
            .push_utf8(NAME, "")
            .push_bytes(DATA, BufferArena::default().copy_from_slice(data).unwrap())
            .finish()
            .unwrap()
    }

    #[test]
    fn record_has_image_layout() {
        let image = TypedImage::new_bgr8(vec![0, 0, 0], 1, 1, Some("test")).unwrap();
        let record = into_arrow(image).unwrap();
        assert_eq!(
            record.schema(),
            vec![
                ("width", &DataType::UInt32),
                ("height", &DataType::UInt32),
                ("encoding", &DataType::Utf8),
                ("name", &DataType::Utf8),
                ("data", &DataType::UInt8),
            ]
        );
        assert_eq!(record.utf8_scalar(ENCODING).unwrap(), "BGR8");
        assert_eq!(record.utf8_scalar(NAME).unwrap(), "test");
    }

    #[test]
    fn round_trip_is_zero_copy() {
        let image = TypedImage::new_rgb8(vec![1, 2, 3, 4, 5, 6], 2, 1, Some("rt")).unwrap();
        let addr = image.as_ptr();
        let record = into_arrow(image).unwrap();
        let buffer = record.bytes_column(DATA).unwrap();
        assert_eq!(buffer.as_ptr(), addr);
        // One reference in the record, one owned by the Arrow child.
        assert_eq!(buffer.ref_count(), 2);

        let back = from_arrow(&record).unwrap();
        assert_eq!(back.as_ptr(), addr);
        assert_eq!(back.buffer().map(BufferRef::ref_count), Some(3));
        assert_eq!(back.name(), Some("rt"));
        assert_eq!((back.width(), back.height()), (2, 1));
        assert_eq!(back.color_space(), ColorSpace::Rgb8);
        assert_eq!(back.pixels(), &[1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn unnamed_round_trips_as_none() {
        let image = TypedImage::new_gray8(vec![1], 1, 1, None).unwrap();
        let record = into_arrow(image).unwrap();
        assert_eq!(record.utf8_scalar(NAME).unwrap(), "");
        assert_eq!(from_arrow(&record).unwrap().name(), None);
    }

    #[test]
    fn raw_view_shares_address_and_frees_nothing() {
        let arena = BufferArena::default();
        let image =
            TypedImage::from_slice_in(&arena, &[9, 8, 7], 1, 1, ColorSpace::Rgb8, None).unwrap();
        let addr = image.as_ptr();
        let record = into_arrow(image).unwrap();
        let raw = raw_data(&record).unwrap();
        assert_eq!(raw.as_ptr(), addr);
        assert_eq!(raw.len(), 3);
        let view = view_from_raw_data(&raw);
        assert_eq!(view.as_ptr(), addr);
        assert_eq!(view.ownership(), Ownership::Borrowed);
        assert_eq!(record.bytes_column(DATA).unwrap().ref_count(), 2);
        drop(view);
        drop(raw);
        assert_eq!(arena.stats().live_buffers, 1);
        assert_eq!(record.bytes_column(DATA).unwrap().as_slice(), &[9, 8, 7]);
    }

    #[test]
    fn from_raw_data_retains() {
        let record = record_with(1, "RGB8", &[1, 2, 3]);
        let raw = raw_data(&record).unwrap();
        let owned = from_raw_data(&raw).unwrap();
        assert_eq!(owned.ownership(), Ownership::Owned);
        assert_eq!(owned.as_ptr(), raw.as_ptr());
        drop(raw);
        drop(record);
        assert_eq!(owned.pixels(), &[1, 2, 3]);
    }

    #[test]
    fn borrowed_image_copied_into_record() {
        let bytes = [1u8, 2, 3];
        let view = TypedImage::view(&bytes, 1, 1, ColorSpace::Rgb8, None).unwrap();
        let record = view.into_arrow().unwrap();
        let buffer = record.bytes_column(DATA).unwrap();
        assert_ne!(buffer.as_ptr(), bytes.as_ptr());
        assert_eq!(buffer.as_slice(), &bytes);
    }

    #[test]
    fn length_mismatch_is_schema_mismatch() {
        let record = record_with(2, "RGB8", &[1, 2, 3]);
        let err = from_arrow(&record).unwrap_err();
        assert!(matches!(err, ImageError::SchemaMismatch { .. }));
        assert_eq!(record.bytes_column(DATA).unwrap().ref_count(), 2);
    }

    #[test]
    fn unknown_encoding_is_schema_mismatch() {
        let err = from_arrow(&record_with(1, "YUV420", &[0, 0, 0])).unwrap_err();
        assert_eq!(
            err,
            ImageError::SchemaMismatch {
                reason: "unknown encoding 'YUV420'".into()
            }
        );
    }

    #[test]
    fn zero_width_is_schema_mismatch() {
        let err = from_arrow(&record_with(0, "GRAY8", &[])).unwrap_err();
        assert!(matches!(err, ImageError::SchemaMismatch { .. }));
    }

    #[test]
    fn missing_data_column_is_schema_mismatch() {
        let record = ArrowRecord::builder()
            .push_u32(WIDTH, 1)
            .push_u32(HEIGHT, 1)
            .push_utf8(ENCODING, "GRAY8")
            .push_utf8(NAME, "")
            .finish()
            .unwrap();
        assert!(matches!(
            from_arrow(&record),
            Err(ImageError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn multi_value_metadata_rejected() {
        let record = ArrowRecord::builder()
            .push_column(WIDTH, Arc::new(UInt32Array::from(vec![1, 1])))
            .push_u32(HEIGHT, 1)
            .push_utf8(ENCODING, "GRAY8")
            .push_utf8(NAME, "")
            .finish()
            .unwrap();
        let err = read_schema(&record).unwrap_err();
        assert!(err.to_string().contains("has 2 values"));
    }

    /// A union assembled directly with arrow, as another producer would,
    /// with a null name.
    fn foreign_union(data: Vec<u8>) -> arrow::array::ArrayData {
        let children: Vec<ArrayRef> = vec![
            Arc::new(UInt32Array::from(vec![1])),
            Arc::new(UInt32Array::from(vec![1])),
            Arc::new(StringArray::from(vec!["BGR8"])),
            Arc::new(StringArray::from(vec![None::<&str>])),
            Arc::new(UInt8Array::from(data)),
        ];
        let fields: UnionFields = [WIDTH, HEIGHT, ENCODING, NAME, DATA]
            .into_iter()
            .zip(&children)
            .enumerate()
            .map(|(i, (name, child))| {
                let field = Field::new(name, child.data_type().clone(), true);
                (i as i8, Arc::new(field))
            })
            .collect();
        UnionArray::try_new(
            fields,
            ScalarBuffer::from(Vec::<i8>::new()),
            Some(ScalarBuffer::from(Vec::<i32>::new())),
            children,
        )
        .unwrap()
        .into_data()
    }

    #[test]
    fn decodes_union_from_another_producer() {
        let record = ArrowRecord::try_from(foreign_union(vec![10, 20, 30])).unwrap();
        let image = from_arrow(&record).unwrap();
        assert_eq!(image.name(), None);
        assert_eq!(image.color_space(), ColorSpace::Bgr8);
        assert_eq!(image.pixels(), &[10, 20, 30]);
        assert!(image.buffer().is_some_and(BufferRef::is_read_only));
    }

    #[test]
    fn exported_data_keeps_pixel_address() {
        let image = TypedImage::new_bgr8(vec![1, 2, 3], 1, 1, Some("x")).unwrap();
        let addr = image.as_ptr();
        let data = into_arrow(image).unwrap().to_data();
        let record = ArrowRecord::try_from(data).unwrap();
        let back = from_arrow(&record).unwrap();
        assert_eq!(back.as_ptr(), addr);
        assert_eq!(back.name(), Some("x"));
    }

    #[test]
    fn converting_imported_pixels_never_writes_to_them() {
        let record = ArrowRecord::try_from(foreign_union(vec![1, 2, 3])).unwrap();
        let image = from_arrow(&record).unwrap();
        let addr = image.as_ptr();
        let data = record.to_data();
        drop(record);
        // The image holds the only arena reference, yet the bytes are still
        // shared with `data`, so the swap must copy.
        let rgb = image.into_color_space(ColorSpace::Rgb8).unwrap();
        assert_ne!(rgb.as_ptr(), addr);
        assert_eq!(rgb.pixels(), &[3, 2, 1]);
        let pixels = UnionArray::from(data).child(4).to_data();
        assert_eq!(pixels.buffers()[0].as_slice(), &[1, 2, 3]);
    }

    #[test]
    fn wrong_data_type_is_schema_mismatch() {
        let record = ArrowRecord::builder()
            .push_u32(WIDTH, 1)
            .push_u32(HEIGHT, 1)
            .push_utf8(ENCODING, "GRAY8")
            .push_utf8(NAME, "")
            .push_u32(DATA, 0)
            .finish()
            .unwrap();
        let err = from_arrow(&record).unwrap_err();
        assert!(err.to_string().contains("is UInt32, expected UInt8"));
    }

    #[test]
    fn view_from_bytes_validates() {
        let schema = ImageSchema::new(2, 1, ColorSpace::Gray8, None).unwrap();
        assert!(view_from_bytes(&[1, 2], schema.clone()).is_ok());
        assert!(view_from_bytes(&[1, 2, 3], schema).is_err());
    }
}
