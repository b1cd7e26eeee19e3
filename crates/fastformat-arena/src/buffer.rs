//! Shared references to arena buffers.

use std::fmt;
use std::sync::Arc;

use crate::arena::{ArenaShared, BufferArena};
use crate::raw::RawRegion;

struct BufferInner {
    region: RawRegion,
    arena: Arc<ArenaShared>,
}

impl Drop for BufferInner {
    fn drop(&mut self) {
        self.arena.stats.on_freed(self.region.len());
        // `region` drops after this, returning the memory.
    }
}

/// One counted reference to an arena buffer.
///
/// Cloning retains the buffer, dropping releases it; the bytes are freed
/// when the last `BufferRef` goes away. The buffer's address and length
/// never change while any reference is alive, so pointers handed out by
/// [`as_ptr`](Self::as_ptr) stay valid for as long as the caller keeps a
/// reference.
///
/// Contents are read-only while shared. [`get_mut`](Self::get_mut) hands
/// out a mutable slice only to a sole holder.
#[derive(Clone)]
pub struct BufferRef {
    inner: Arc<BufferInner>,
}

impl BufferRef {
    pub(crate) fn new(region: RawRegion, arena: Arc<ArenaShared>) -> Self {
        Self {
            inner: Arc::new(BufferInner { region, arena }),
        }
    }

    /// Start address of the bytes.
    pub fn as_ptr(&self) -> *const u8 {
        self.inner.region.as_ptr()
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.inner.region.len()
    }

    /// Whether the buffer holds zero bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        self.inner.region.as_slice()
    }

    /// Mutable contents, if this is the only reference.
    pub fn get_mut(&mut self) -> Option<&mut [u8]> {
        Arc::get_mut(&mut self.inner).and_then(|inner| inner.region.as_mut_slice())
    }

    /// Number of live references, this one included.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Whether this is the only reference.
    pub fn is_unique(&self) -> bool {
        self.ref_count() == 1
    }

    /// Whether the buffer wraps memory adopted through
    /// [`BufferArena::adopt_external`].
    pub fn is_external(&self) -> bool {
        self.inner.region.is_external()
    }

    /// Whether the bytes are shared with an owner outside the arena and
    /// therefore never handed out mutably.
    pub fn is_read_only(&self) -> bool {
        !self.inner.region.is_writable()
    }

    /// Whether two references point at the same buffer.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }

    /// The arena that accounts for this buffer.
    pub fn arena(&self) -> BufferArena {
        BufferArena::from_shared(Arc::clone(&self.inner.arena))
    }
}

impl AsRef<[u8]> for BufferRef {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl fmt::Debug for BufferRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferRef")
            .field("ptr", &self.as_ptr())
            .field("len", &self.len())
            .field("refs", &self.ref_count())
            .finish()
    }
}
