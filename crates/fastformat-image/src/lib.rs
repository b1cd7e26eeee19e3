//! Typed images over fastformat buffers.
//!
//! [`TypedImage`] pairs a buffer with validated geometry, pixel layout and
//! an optional name. [`ColorSpaceConverter`] moves pixels between layouts
//! using a fixed per-pixel transform table.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod convert;
pub mod image;

pub use convert::{Channel, ColorSpaceConverter, Transform};
pub use image::{ConversionError, ImageData, TypedImage};
