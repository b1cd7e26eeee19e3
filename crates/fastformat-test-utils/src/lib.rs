//! Test fixtures for fastformat development.
//!
//! Deterministic pixel generators ([`gradient`], [`random_pixels`]) and a
//! [`ReleaseCounter`] for observing when adopted memory is handed back.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod release;

pub use fixtures::{gradient, random_pixels, solid};
pub use release::{external_bytes, ReleaseCounter};
