//! The buffer arena: creation, adoption and accounting of byte buffers.

use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::{Arc, OnceLock};

use crate::buffer::BufferRef;
use crate::config::{ArenaConfig, ConfigError};
use crate::error::ArenaError;
use crate::raw::{RawRegion, ReleaseHook};
use crate::stats::{ArenaStats, StatsCells};

#[derive(Debug)]
pub(crate) struct ArenaShared {
    config: ArenaConfig,
    pub(crate) stats: StatsCells,
}

/// Source of reference-counted byte buffers.
///
/// Cheap to clone; clones share configuration and counters. Buffers keep
/// their arena's bookkeeping alive, so an arena may be dropped while its
/// buffers are still in use.
///
/// # Examples
///
/// ```
/// use fastformat_arena::BufferArena;
///
/// let arena = BufferArena::default();
/// let buf = arena.copy_from_slice(&[1, 2, 3]).unwrap();
/// let view = arena.retain(&buf);
/// assert_eq!(view.as_ptr(), buf.as_ptr());
/// arena.release(view);
/// assert_eq!(arena.stats().live_buffers, 1);
/// ```
#[derive(Clone, Debug)]
pub struct BufferArena {
    shared: Arc<ArenaShared>,
}

impl BufferArena {
    /// Create an arena after validating `config`.
    pub fn new(config: ArenaConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(ArenaShared {
                config,
                stats: StatsCells::default(),
            }),
        })
    }

    /// Process-wide arena with default configuration.
    ///
    /// Used by image constructors that are not given an explicit arena.
    pub fn shared() -> &'static BufferArena {
        static SHARED: OnceLock<BufferArena> = OnceLock::new();
        SHARED.get_or_init(BufferArena::default)
    }

    pub(crate) fn from_shared(shared: Arc<ArenaShared>) -> Self {
        Self { shared }
    }

    /// The configuration this arena was built with.
    pub fn config(&self) -> &ArenaConfig {
        &self.shared.config
    }

    /// Allocate `len` zeroed bytes. The caller holds the only reference.
    pub fn allocate(&self, len: usize) -> Result<BufferRef, ArenaError> {
        self.allocate_with(len, |_| {})
    }

    /// Allocate `len` zeroed bytes and let `fill` initialise them before
    /// the buffer is shared.
    pub fn allocate_with<F>(&self, len: usize, fill: F) -> Result<BufferRef, ArenaError>
    where
        F: FnOnce(&mut [u8]),
    {
        let stats = &self.shared.stats;
        let limit = self.shared.config.max_live_bytes;
        stats
            .reserve(len, limit)
            .map_err(|live| ArenaError::LimitExceeded {
                requested: len,
                live,
                limit: limit.unwrap_or(usize::MAX),
            })?;
        let region = match RawRegion::allocate_zeroed(len, self.shared.config.alignment) {
            Ok(region) => region,
            Err(e) => {
                stats.unreserve(len);
                return Err(e);
            }
        };
        stats.on_allocated();
        let mut buffer = BufferRef::new(region, Arc::clone(&self.shared));
        // A fresh buffer is always unique.
        if let Some(bytes) = buffer.get_mut() {
            fill(bytes);
        }
        Ok(buffer)
    }

    /// Allocate a buffer holding a copy of `bytes`.
    pub fn copy_from_slice(&self, bytes: &[u8]) -> Result<BufferRef, ArenaError> {
        self.allocate_with(bytes.len(), |dst| dst.copy_from_slice(bytes))
    }

    /// Take ownership of `data` without copying.
    ///
    /// The buffer's address is `data.as_ptr()`. Adoption never fails and
    /// is not subject to `max_live_bytes`.
    pub fn adopt_vec(&self, data: Vec<u8>) -> BufferRef {
        let region = RawRegion::from_vec(data);
        self.shared.stats.on_adopted(region.len());
        BufferRef::new(region, Arc::clone(&self.shared))
    }

    /// Wrap `len` bytes of caller memory at `ptr` without copying.
    ///
    /// When the last reference is released, `release` is called with
    /// `(ptr, len)`. With no hook the memory is left for its owner to
    /// reclaim.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `len` bytes until the
    /// last reference is released, and no other code may mutate it while
    /// any reference is alive.
    #[allow(unsafe_code)]
    pub unsafe fn adopt_external(
        &self,
        ptr: NonNull<u8>,
        len: usize,
        release: Option<ReleaseHook>,
    ) -> BufferRef {
        // SAFETY: forwarded from this function's contract.
        let region = unsafe { RawRegion::from_external(ptr, len, release) };
        self.shared.stats.on_adopted(len);
        BufferRef::new(region, Arc::clone(&self.shared))
    }

    /// Wrap bytes kept alive by `owner` without copying.
    ///
    /// The buffer's address is the owner's slice address. `owner` is dropped
    /// when the last reference is released. Other holders of the same bytes
    /// may still be reading them, so the buffer is read-only: `get_mut`
    /// always returns `None` and conversions never run in place.
    pub fn adopt_shared<T>(&self, owner: T) -> BufferRef
    where
        T: Deref<Target = [u8]> + Send + Sync + 'static,
    {
        let region = RawRegion::from_shared(Box::new(owner));
        self.shared.stats.on_adopted(region.len());
        BufferRef::new(region, Arc::clone(&self.shared))
    }

    /// Take another reference to `buffer`.
    pub fn retain(&self, buffer: &BufferRef) -> BufferRef {
        buffer.clone()
    }

    /// Give up one reference; frees the bytes if it was the last.
    pub fn release(&self, buffer: BufferRef) {
        drop(buffer);
    }

    /// Whether `buffer` is accounted to this arena.
    pub fn owns(&self, buffer: &BufferRef) -> bool {
        Arc::ptr_eq(&self.shared, &buffer.arena().shared)
    }

    /// Snapshot of the arena's counters.
    pub fn stats(&self) -> ArenaStats {
        self.shared.stats.snapshot()
    }
}

impl Default for BufferArena {
    fn default() -> Self {
        Self {
            shared: Arc::new(ArenaShared {
                config: ArenaConfig::default(),
                stats: StatsCells::default(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn allocate_tracks_stats() {
        let arena = BufferArena::default();
        let a = arena.allocate(100).unwrap();
        let b = arena.allocate(28).unwrap();
        let stats = arena.stats();
        assert_eq!(stats.live_buffers, 2);
        assert_eq!(stats.live_bytes, 128);
        assert_eq!(stats.total_allocations, 2);
        drop(a);
        drop(b);
        let stats = arena.stats();
        assert_eq!(stats.live_buffers, 0);
        assert_eq!(stats.live_bytes, 0);
        assert_eq!(stats.total_frees, 2);
        assert_eq!(stats.peak_live_bytes, 128);
    }

    #[test]
    fn allocation_honours_alignment() {
        let arena = BufferArena::new(ArenaConfig {
            alignment: 256,
            max_live_bytes: None,
        })
        .unwrap();
        let buf = arena.allocate(10).unwrap();
        assert_eq!(buf.as_ptr() as usize % 256, 0);
    }

    #[test]
    fn invalid_config_rejected() {
        let err = BufferArena::new(ArenaConfig {
            alignment: 3,
            max_live_bytes: None,
        })
        .unwrap_err();
        assert_eq!(err, ConfigError::InvalidAlignment { alignment: 3 });
    }

    #[test]
    fn limit_refuses_then_recovers() {
        let arena = BufferArena::new(ArenaConfig::with_limit(100)).unwrap();
        let a = arena.allocate(80).unwrap();
        let err = arena.allocate(30).unwrap_err();
        assert_eq!(
            err,
            ArenaError::LimitExceeded {
                requested: 30,
                live: 80,
                limit: 100
            }
        );
        assert_eq!(arena.stats().live_buffers, 1);
        drop(a);
        assert!(arena.allocate(100).is_ok());
    }

    #[test]
    fn retain_release_frees_on_last() {
        let arena = BufferArena::default();
        let a = arena.allocate(8).unwrap();
        let b = arena.retain(&a);
        assert_eq!(a.ref_count(), 2);
        arena.release(a);
        assert_eq!(arena.stats().live_buffers, 1);
        assert_eq!(b.ref_count(), 1);
        arena.release(b);
        assert_eq!(arena.stats().live_buffers, 0);
    }

    #[test]
    fn adopt_vec_keeps_address() {
        let arena = BufferArena::new(ArenaConfig::with_limit(4)).unwrap();
        let data = vec![7u8; 32];
        let addr = data.as_ptr();
        let buf = arena.adopt_vec(data);
        assert_eq!(buf.as_ptr(), addr);
        assert_eq!(arena.stats().total_adoptions, 1);
        assert_eq!(arena.stats().live_bytes, 32);
    }

    #[test]
    #[allow(unsafe_code)]
    fn adopt_external_calls_hook_on_last_release() {
        let arena = BufferArena::default();
        let mut backing = vec![1u8, 2, 3];
        let ptr = NonNull::new(backing.as_mut_ptr()).unwrap();
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);
        let buf = unsafe {
            arena.adopt_external(
                ptr,
                3,
                Some(Box::new(move |_, len| {
                    counter.fetch_add(len, Ordering::SeqCst);
                })),
            )
        };
        assert!(buf.is_external());
        assert_eq!(buf.as_ptr(), backing.as_ptr());
        let extra = buf.clone();
        drop(buf);
        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(extra);
        assert_eq!(released.load(Ordering::SeqCst), 3);
        assert_eq!(arena.stats().live_buffers, 0);
    }

    #[test]
    fn adopt_shared_is_zero_copy_and_read_only() {
        let arena = BufferArena::default();
        let owner = Arc::new([7u8, 8, 9]);
        let addr = owner.as_ptr();

        struct Holder(Arc<[u8; 3]>);
        impl Deref for Holder {
            type Target = [u8];
            fn deref(&self) -> &[u8] {
                &self.0[..]
            }
        }

        let mut buf = arena.adopt_shared(Holder(Arc::clone(&owner)));
        assert_eq!(buf.as_ptr(), addr);
        assert!(buf.is_unique());
        assert!(buf.is_read_only());
        assert!(buf.get_mut().is_none());
        assert_eq!(Arc::strong_count(&owner), 2);
        drop(buf);
        assert_eq!(Arc::strong_count(&owner), 1);
        assert_eq!(arena.stats().total_adoptions, 1);
        assert_eq!(arena.stats().live_buffers, 0);
    }

    #[test]
    fn buffers_outlive_arena_handle() {
        let arena = BufferArena::default();
        let buf = arena.copy_from_slice(&[4, 5]).unwrap();
        drop(arena);
        assert_eq!(buf.as_slice(), &[4, 5]);
        assert_eq!(buf.arena().stats().live_buffers, 1);
    }

    #[test]
    fn shared_arena_is_singleton() {
        assert!(std::ptr::eq(BufferArena::shared(), BufferArena::shared()));
    }

    proptest! {
        #[test]
        fn live_bytes_match_held_buffers(lens in prop::collection::vec(0usize..512, 0..20)) {
            let arena = BufferArena::default();
            let held: Vec<_> = lens.iter().map(|&n| arena.allocate(n).unwrap()).collect();
            let stats = arena.stats();
            prop_assert_eq!(stats.live_buffers, lens.len());
            prop_assert_eq!(stats.live_bytes, lens.iter().sum::<usize>());
            drop(held);
            prop_assert_eq!(arena.stats().live_bytes, 0);
        }

        #[test]
        fn copy_preserves_contents(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
            let arena = BufferArena::default();
            let buf = arena.copy_from_slice(&bytes).unwrap();
            prop_assert_eq!(buf.as_slice(), &bytes[..]);
        }
    }
}
