//! Zero-copy interchange between typed images and Arrow records.
//!
//! An image record is an Arrow dense `UnionArray` with one field per
//! column, readable by any Arrow consumer (arrow-rs, pyarrow, dora):
//!
//! | column     | type   | contents                      |
//! |------------|--------|-------------------------------|
//! | `width`    | UInt32 | one value                     |
//! | `height`   | UInt32 | one value                     |
//! | `encoding` | Utf8   | color space tag, e.g. `RGB8`  |
//! | `name`     | Utf8   | image name, `""` when unnamed |
//! | `data`     | UInt8  | the image's pixel buffer      |
//!
//! [`into_arrow`] moves the image's buffer into the `data` child and
//! [`from_arrow`] hands it back with one more reference, so a round trip
//! keeps the pixel address. [`raw_data`] borrows the bytes without
//! touching the count. Records arriving as [`arrow::array::ArrayData`]
//! from elsewhere go through [`ArrowRecord::try_from_data`], which shares
//! their memory read-only.
//!
//! # Examples
//!
//! ```
//! use fastformat_arrow::{from_arrow, ImageArrowExt};
//! use fastformat_image::TypedImage;
//!
//! let image = TypedImage::new_rgb8(vec![1, 2, 3], 1, 1, Some("px")).unwrap();
//! let addr = image.as_ptr();
//! let record = image.into_arrow().unwrap();
//! let back = from_arrow(&record).unwrap();
//! assert_eq!(back.as_ptr(), addr);
//! assert_eq!(back.name(), Some("px"));
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod bridge;
pub mod builder;
pub mod raw;
pub mod record;

pub use bridge::{
    from_arrow, from_raw_data, into_arrow, raw_data, read_schema, view_from_bytes,
    view_from_raw_data, ImageArrowExt,
};
pub use builder::RecordBuilder;
pub use raw::RawData;
pub use record::ArrowRecord;

pub use arrow;
