//! Core types for the fastformat typed-buffer interchange framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines the
//! vocabulary shared by every other crate in the workspace: pixel layouts,
//! image metadata, ownership tags and the error type.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod color_space;
pub mod error;
pub mod ownership;
pub mod schema;

pub use color_space::ColorSpace;
pub use error::ImageError;
pub use ownership::Ownership;
pub use schema::ImageSchema;
