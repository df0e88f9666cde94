//! Allocation ledger: a process-wide table of live native allocations.
//!
//! Present in debug builds (and in any build with the `ledger` feature). Every
//! native allocation records its address here and every free removes it, so a
//! double free, or a free of memory that did not come from
//! [`NativeAllocation`](crate::NativeAllocation), panics before the allocator
//! is touched. The live count backs leak tests.
//!
//! Frees may happen on a different thread than the matching allocation, so
//! the table is shared and lock-protected. Per-thread counters let tests
//! observe their own activity while other tests run in parallel.

use std::cell::Cell;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use ahash::AHashMap;

/// Allocation activity observed on one thread.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerStats {
    /// Number of native allocations recorded.
    pub allocated: u64,
    /// Number of native allocations released.
    pub released: u64,
}

impl LedgerStats {
    /// Returns the activity that happened between `earlier` and `self`.
    pub fn since(&self, earlier: LedgerStats) -> LedgerStats {
        LedgerStats {
            allocated: self.allocated - earlier.allocated,
            released: self.released - earlier.released,
        }
    }
}

thread_local! {
    static THREAD_STATS: Cell<LedgerStats> = const {
        Cell::new(LedgerStats {
            allocated: 0,
            released: 0,
        })
    };
}

fn live_table() -> MutexGuard<'static, AHashMap<usize, usize>> {
    static LIVE: OnceLock<Mutex<AHashMap<usize, usize>>> = OnceLock::new();
    LIVE.get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

/// Records a new live allocation of `bytes` bytes at `addr`.
///
/// # Panics
///
/// Panics if `addr` is already live.
pub fn record(addr: usize, bytes: usize) {
    let previous = live_table().insert(addr, bytes);
    assert!(
        previous.is_none(),
        "address {addr:#x} was allocated while still live"
    );
    THREAD_STATS.with(|s| {
        let mut stats = s.get();
        stats.allocated += 1;
        s.set(stats);
    });
}

/// Removes the allocation at `addr` and returns its recorded size in bytes.
///
/// # Panics
///
/// Panics if `addr` is not a live allocation: it was freed already, or it was
/// never obtained from the native allocation path.
pub fn release(addr: usize) -> usize {
    let removed = live_table().remove(&addr);
    let Some(bytes) = removed else {
        panic!("address {addr:#x} is not a live native allocation (double free?)");
    };
    THREAD_STATS.with(|s| {
        let mut stats = s.get();
        stats.released += 1;
        s.set(stats);
    });
    bytes
}

/// Returns `true` if `addr` is currently a live native allocation.
pub fn is_live(addr: usize) -> bool {
    live_table().contains_key(&addr)
}

/// Returns the recorded size of the live allocation at `addr`.
pub fn live_size(addr: usize) -> Option<usize> {
    live_table().get(&addr).copied()
}

/// Number of native allocations alive in the whole process.
pub fn live_allocations() -> usize {
    live_table().len()
}

/// Allocation activity recorded by the calling thread so far.
pub fn thread_stats() -> LedgerStats {
    THREAD_STATS.with(Cell::get)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_release() {
        // Stack addresses never collide with heap allocations made by other tests.
        let slot = 0u64;
        let addr = &slot as *const u64 as usize;

        let before = thread_stats();
        record(addr, 8);
        assert!(is_live(addr));
        assert_eq!(live_size(addr), Some(8));
        assert!(live_allocations() >= 1);
        assert_eq!(release(addr), 8);
        assert!(!is_live(addr));

        let delta = thread_stats().since(before);
        assert_eq!(
            delta,
            LedgerStats {
                allocated: 1,
                released: 1
            }
        );
    }

    #[test]
    #[should_panic(expected = "not a live native allocation")]
    fn test_double_release_panics() {
        let slot = 0u64;
        let addr = &slot as *const u64 as usize;
        record(addr, 8);
        release(addr);
        release(addr);
    }

    #[test]
    #[should_panic(expected = "still live")]
    fn test_double_record_panics() {
        let slot = 0u64;
        let addr = &slot as *const u64 as usize;
        record(addr, 8);
        // Leave the table consistent for other tests once the panic is caught.
        struct Cleanup(usize);
        impl Drop for Cleanup {
            fn drop(&mut self) {
                live_table().remove(&self.0);
            }
        }
        let _cleanup = Cleanup(addr);
        record(addr, 8);
    }
}
