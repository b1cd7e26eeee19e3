//! Low-level primitives for buffer memory.
//!
//! Every `unsafe` block in this crate lives here. A [`RawRegion`] owns one
//! contiguous byte range and knows how to give it back to whoever produced
//! it: the global allocator, a `Vec<u8>`, a foreign release hook, or a
//! shared owner that is simply dropped.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::ops::Deref;
use std::ptr::NonNull;

use crate::error::ArenaError;

/// Callback that returns adopted memory to its foreign owner.
///
/// Invoked exactly once, with the adopted pointer and length, when the
/// last reference to the buffer is released.
pub type ReleaseHook = Box<dyn FnOnce(NonNull<u8>, usize) + Send>;

/// Owner of bytes that other holders may also be reading.
pub(crate) type SharedOwner = Box<dyn Deref<Target = [u8]> + Send + Sync>;

enum Origin {
    /// From `alloc_zeroed` with this layout.
    Heap { layout: Layout },
    /// A leaked `Vec<u8>` with this capacity.
    Vec { capacity: usize },
    /// Caller memory; freed by the hook if present.
    External { release: Option<ReleaseHook> },
    /// Bytes kept alive by `owner`; never written.
    Shared { owner: SharedOwner },
    /// Zero-length buffer with a dangling pointer.
    Empty,
}

/// An owned, immutable-by-default byte range.
pub(crate) struct RawRegion {
    ptr: NonNull<u8>,
    len: usize,
    origin: Origin,
}

// SAFETY: RawRegion uniquely owns its bytes. The release hook is `Send` and
// is only touched from `Drop`, which has exclusive access, so sharing
// `&RawRegion` across threads exposes nothing but the byte slice.
unsafe impl Send for RawRegion {}
// SAFETY: see above; shared access is read-only.
unsafe impl Sync for RawRegion {}

impl RawRegion {
    /// Allocate `len` zeroed bytes with the given alignment.
    pub(crate) fn allocate_zeroed(len: usize, align: usize) -> Result<Self, ArenaError> {
        if len == 0 {
            return Ok(Self::empty());
        }
        let layout = Layout::from_size_align(len, align)
            .map_err(|_| ArenaError::OutOfMemory { requested: len })?;
        // SAFETY: layout has non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or(ArenaError::OutOfMemory { requested: len })?;
        Ok(Self {
            ptr,
            len,
            origin: Origin::Heap { layout },
        })
    }

    /// Take ownership of a vector's allocation without copying.
    pub(crate) fn from_vec(data: Vec<u8>) -> Self {
        let mut data = std::mem::ManuallyDrop::new(data);
        let len = data.len();
        let capacity = data.capacity();
        // Vec's pointer is never null, dangling when capacity is zero.
        let ptr = NonNull::new(data.as_mut_ptr()).unwrap_or(NonNull::dangling());
        Self {
            ptr,
            len,
            origin: Origin::Vec { capacity },
        }
    }

    /// Wrap caller-provided memory.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `len` bytes until the
    /// region is dropped, and nothing else may write through it meanwhile.
    pub(crate) unsafe fn from_external(
        ptr: NonNull<u8>,
        len: usize,
        release: Option<ReleaseHook>,
    ) -> Self {
        Self {
            ptr,
            len,
            origin: Origin::External { release },
        }
    }

    /// Borrow the bytes behind `owner` for as long as the region lives.
    pub(crate) fn from_shared(owner: SharedOwner) -> Self {
        let bytes: &[u8] = &**owner;
        let len = bytes.len();
        let ptr = NonNull::new(bytes.as_ptr().cast_mut()).unwrap_or(NonNull::dangling());
        Self {
            ptr,
            len,
            origin: Origin::Shared { owner },
        }
    }

    fn empty() -> Self {
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            origin: Origin::Empty,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    pub(crate) fn is_external(&self) -> bool {
        matches!(self.origin, Origin::External { .. })
    }

    /// Whether the bytes may be handed out mutably.
    pub(crate) fn is_writable(&self) -> bool {
        !matches!(self.origin, Origin::Shared { .. })
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        // SAFETY: ptr is valid for len bytes for the region's lifetime
        // (allocated, adopted from a Vec, or guaranteed by from_external's
        // contract), and a dangling pointer is valid for a zero-length slice.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub(crate) fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        if !self.is_writable() {
            return None;
        }
        // SAFETY: as for as_slice; &mut self guarantees exclusivity, and
        // shared-owner bytes were excluded above.
        Some(unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) })
    }
}

impl Drop for RawRegion {
    fn drop(&mut self) {
        match std::mem::replace(&mut self.origin, Origin::Empty) {
            Origin::Heap { layout } => {
                // SAFETY: ptr came from alloc_zeroed with exactly this layout.
                unsafe { alloc::dealloc(self.ptr.as_ptr(), layout) }
            }
            Origin::Vec { capacity } => {
                // SAFETY: ptr, len and capacity are the parts of the Vec
                // leaked in from_vec, reassembled once.
                drop(unsafe { Vec::from_raw_parts(self.ptr.as_ptr(), self.len, capacity) });
            }
            Origin::External {
                release: Some(release),
            } => release(self.ptr, self.len),
            Origin::External { release: None } => {
                #[cfg(debug_assertions)]
                eprintln!(
                    "fastformat: adopted buffer {:p} ({} bytes) dropped without a release hook; \
                     its owner must free it",
                    self.ptr, self.len
                );
            }
            Origin::Shared { owner } => drop(owner),
            Origin::Empty => {}
        }
    }
}
