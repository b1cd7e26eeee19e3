//! Observing release hooks on adopted memory.

use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fastformat_arena::ReleaseHook;

/// Shared counter bumped by each hook it hands out.
#[derive(Clone, Debug, Default)]
pub struct ReleaseCounter {
    calls: Arc<AtomicUsize>,
}

impl ReleaseCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hook that only counts.
    pub fn hook(&self) -> ReleaseHook {
        let calls = Arc::clone(&self.calls);
        Box::new(move |_, _| {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    }

    /// Number of hooks that have run.
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Hand `data` to foreign-style ownership.
///
/// Returns the address and length to adopt, plus a hook that frees the
/// bytes and bumps `counter`. The bytes stay valid until the hook runs.
pub fn external_bytes(
    mut data: Vec<u8>,
    counter: &ReleaseCounter,
) -> (NonNull<u8>, usize, ReleaseHook) {
    let len = data.len();
    let ptr = NonNull::new(data.as_mut_ptr()).unwrap_or(NonNull::dangling());
    let calls = Arc::clone(&counter.calls);
    let hook: ReleaseHook = Box::new(move |_, _| {
        drop(data);
        calls.fetch_add(1, Ordering::SeqCst);
    });
    (ptr, len, hook)
}
