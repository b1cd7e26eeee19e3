//! Live-buffer accounting.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Point-in-time snapshot of an arena's counters.
///
/// Counters are sampled independently, so a snapshot taken while other
/// threads allocate or free may mix values from slightly different instants.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Buffers currently referenced by at least one holder.
    pub live_buffers: usize,
    /// Bytes held by live buffers, adopted memory included.
    pub live_bytes: usize,
    /// High-water mark of `live_bytes`.
    pub peak_live_bytes: usize,
    /// Buffers allocated by the arena since creation.
    pub total_allocations: u64,
    /// Buffers adopted from caller memory since creation.
    pub total_adoptions: u64,
    /// Buffers whose last reference has been released.
    pub total_frees: u64,
}

/// Shared atomic counters behind [`ArenaStats`].
#[derive(Debug, Default)]
pub(crate) struct StatsCells {
    live_buffers: AtomicUsize,
    live_bytes: AtomicUsize,
    peak_live_bytes: AtomicUsize,
    total_allocations: AtomicU64,
    total_adoptions: AtomicU64,
    total_frees: AtomicU64,
}

impl StatsCells {
    /// Reserve `len` bytes against an optional cap.
    ///
    /// On failure returns the live byte count observed at the time.
    pub(crate) fn reserve(&self, len: usize, limit: Option<usize>) -> Result<(), usize> {
        let reserved = match limit {
            None => self.live_bytes.fetch_add(len, Ordering::AcqRel) + len,
            Some(limit) => {
                let prev = self.live_bytes.fetch_update(
                    Ordering::AcqRel,
                    Ordering::Acquire,
                    |live| live.checked_add(len).filter(|&total| total <= limit),
                )?;
                prev + len
            }
        };
        self.peak_live_bytes.fetch_max(reserved, Ordering::AcqRel);
        Ok(())
    }

    /// Undo a reservation whose allocation then failed.
    pub(crate) fn unreserve(&self, len: usize) {
        self.live_bytes.fetch_sub(len, Ordering::AcqRel);
    }

    pub(crate) fn on_allocated(&self) {
        self.live_buffers.fetch_add(1, Ordering::AcqRel);
        self.total_allocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an adoption. Adopted bytes bypass the cap.
    pub(crate) fn on_adopted(&self, len: usize) {
        let live = self.live_bytes.fetch_add(len, Ordering::AcqRel) + len;
        self.peak_live_bytes.fetch_max(live, Ordering::AcqRel);
        self.live_buffers.fetch_add(1, Ordering::AcqRel);
        self.total_adoptions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn on_freed(&self, len: usize) {
        self.live_bytes.fetch_sub(len, Ordering::AcqRel);
        self.live_buffers.fetch_sub(1, Ordering::AcqRel);
        self.total_frees.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ArenaStats {
        ArenaStats {
            live_buffers: self.live_buffers.load(Ordering::Acquire),
            live_bytes: self.live_bytes.load(Ordering::Acquire),
            peak_live_bytes: self.peak_live_bytes.load(Ordering::Acquire),
            total_allocations: self.total_allocations.load(Ordering::Relaxed),
            total_adoptions: self.total_adoptions.load(Ordering::Relaxed),
            total_frees: self.total_frees.load(Ordering::Relaxed),
        }
    }
}
