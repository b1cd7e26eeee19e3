//! Reference-counted byte buffers for fastformat images.
//!
//! A [`BufferArena`] hands out [`BufferRef`]s: counted references to one
//! contiguous, immovable byte range. Buffers come from three places:
//!
//! ```text
//! BufferArena
//! ├── allocate / copy_from_slice   aligned heap memory, zero-filled
//! ├── adopt_vec                    an existing Vec<u8>, no copy
//! ├── adopt_external               foreign memory + optional release hook
//! └── adopt_shared                 bytes kept alive by another owner, read-only
//! ```
//!
//! Every buffer is freed (or handed back through its hook) exactly once,
//! when the last reference drops. Counters in [`ArenaStats`] track live
//! buffers and bytes.
//!
//! This crate is one of two that may contain `unsafe` code (along with
//! `fastformat-ffi`); all of it is confined to the private `raw` module.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod arena;
pub mod buffer;
pub mod config;
pub mod error;
mod raw;
pub mod stats;

pub use arena::BufferArena;
pub use buffer::BufferRef;
pub use config::{ArenaConfig, ConfigError};
pub use error::ArenaError;
pub use raw::ReleaseHook;
pub use stats::ArenaStats;
