//! Typed raw memory outside of Rust containers: windows, native heap blocks,
//! aligned pinned arrays, and a reuse-or-allocate hybrid.
//!
//! # Overview
//!
//! - [`Window`]: a non-owning `(pointer, length)` view with slicing, casting
//!   and iteration. The common currency of the crate.
//! - [`NativeAllocation`]: memory taken straight from the process heap,
//!   optionally zeroed and aligned, freed exactly once on drop.
//! - [`PinnedArrayAllocation`]: an over-allocated array whose address never
//!   moves, exposing an aligned sub-window. Freed on drop like any value.
//! - [`HybridAllocation`]: reuses a caller's buffer when it is long enough,
//!   otherwise falls back to a new [`NativeAllocation`]; frees only what it
//!   allocated.
//!
//! All three allocation types implement [`WindowOwner`], so consumers can be
//! written against the window alone.
//!
//! # Contract violations
//!
//! Out-of-range slices, misaligned casts, double frees and reuse of
//! misaligned buffers are programmer errors, not recoverable conditions. They
//! are caught by assertions in debug builds. In optimized builds most of these
//! checks are compiled out for speed and the resulting behavior is undefined.
//!
//! In debug builds (or with the `ledger` feature) every native allocation is
//! tracked by the process-wide [`ledger`], which panics on double frees and
//! on frees of memory that was never allocated here.
//!
//! # Threading
//!
//! Nothing in this crate synchronizes. Distinct allocations never share state
//! and can be used from different threads; sharing one allocation across
//! threads is up to the caller.

pub mod hybrid;
#[cfg(any(debug_assertions, feature = "ledger"))]
pub mod ledger;
pub mod native;
pub mod owner;
pub mod pinned;
pub mod window;

#[cfg_attr(unix, path = "heap_unix.rs")]
#[cfg_attr(not(unix), path = "heap_fallback.rs")]
pub mod heap;

#[cfg(test)]
mod tests;

pub use hybrid::HybridAllocation;
pub use native::NativeAllocation;
pub use owner::WindowOwner;
pub use pinned::PinnedArrayAllocation;
pub use window::Window;

pub use nativemem_common::{Result, error::Error, error::ErrorKind};
