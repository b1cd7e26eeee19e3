//! Arena counters for C callers.

use fastformat_arena::{ArenaStats, BufferArena};

use crate::status::FfStatus;

/// C mirror of the shared arena's counters.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FfArenaStats {
    /// Buffers currently alive.
    pub live_buffers: u64,
    /// Bytes held by live buffers.
    pub live_bytes: u64,
    /// Highest `live_bytes` observed.
    pub peak_live_bytes: u64,
    /// Buffers allocated by the library.
    pub total_allocations: u64,
    /// Buffers adopted from callers without copying.
    pub total_adoptions: u64,
    /// Buffers freed.
    pub total_frees: u64,
}

impl From<ArenaStats> for FfArenaStats {
    fn from(s: ArenaStats) -> Self {
        Self {
            live_buffers: s.live_buffers as u64,
            live_bytes: s.live_bytes as u64,
            peak_live_bytes: s.peak_live_bytes as u64,
            total_allocations: s.total_allocations,
            total_adoptions: s.total_adoptions,
            total_frees: s.total_frees,
        }
    }
}

/// Write the shared arena's counters to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn ff_arena_stats(out: *mut FfArenaStats) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return FfStatus::InvalidArgument as i32;
        }
        let stats = FfArenaStats::from(BufferArena::shared().stats());
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = stats };
        FfStatus::Ok as i32
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::ff_image_destroy;
    use crate::image::tests::new_image;
    use crate::types::FfColorSpace;

    #[test]
    fn stats_count_ffi_allocations() {
        let before = {
            let mut s = FfArenaStats::default();
            assert_eq!(ff_arena_stats(&mut s), FfStatus::Ok as i32);
            s
        };
        let image = new_image(&[0; 12], 2, 2, FfColorSpace::Rgb8);
        let mut after = FfArenaStats::default();
        ff_arena_stats(&mut after);
        // Other tests share the arena, so only monotonic counters are exact.
        assert!(after.total_allocations > before.total_allocations);
        assert!(after.peak_live_bytes >= 12);
        ff_image_destroy(image);
        assert_eq!(ff_arena_stats(std::ptr::null_mut()), FfStatus::InvalidArgument as i32);
    }
}
