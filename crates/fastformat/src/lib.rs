//! fastformat: typed image buffers with explicit ownership and zero-copy
//! interchange.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the fastformat sub-crates. For most users, adding `fastformat` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use fastformat::prelude::*;
//!
//! let image = TypedImage::new_bgr8(vec![10, 20, 30], 1, 1, Some("test")).unwrap();
//! let rgb = image.into_rgb8().unwrap();
//! assert_eq!(rgb.pixels(), &[30, 20, 10]);
//! assert_eq!(rgb.name(), Some("test"));
//!
//! // Hand the pixels to a record and back without copying.
//! let addr = rgb.as_ptr();
//! let record = rgb.into_arrow().unwrap();
//! let raw = raw_data(&record).unwrap();
//! let view = view_from_raw_data(&raw);
//! assert_eq!(view.as_ptr(), addr);
//! assert_eq!(view.ownership(), Ownership::Borrowed);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `fastformat-core` | Color spaces, schemas, ownership tags, errors |
//! | [`arena`] | `fastformat-arena` | Reference-counted buffers and their arena |
//! | [`image`] | `fastformat-image` | Typed images and layout conversion |
//! | [`arrow`] | `fastformat-arrow` | Columnar records and zero-copy views |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Color spaces, image schemas and errors (`fastformat-core`).
pub use fastformat_core as types;

/// Buffer storage (`fastformat-arena`).
///
/// [`arena::BufferArena`] hands out [`arena::BufferRef`]s and keeps the
/// live-byte counters reported by [`arena::ArenaStats`].
pub use fastformat_arena as arena;

/// Typed images and color layout conversion (`fastformat-image`).
pub use fastformat_image as image;

/// Columnar interchange records (`fastformat-arrow`).
///
/// [`arrow::into_arrow`] and [`arrow::from_arrow`] move an image's buffer
/// in and out of an [`arrow::ArrowRecord`] without copying.
pub use fastformat_arrow as arrow;

/// Common imports for typical fastformat usage.
///
/// ```rust
/// use fastformat::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use fastformat_core::{ColorSpace, ImageError, ImageSchema, Ownership};

    // Buffers
    pub use fastformat_arena::{ArenaConfig, BufferArena, BufferRef};

    // Images
    pub use fastformat_image::{ColorSpaceConverter, ConversionError, TypedImage};

    // Interchange
    pub use fastformat_arrow::{
        from_arrow, from_raw_data, raw_data, view_from_raw_data, ArrowRecord, ImageArrowExt,
        RawData,
    };
}
