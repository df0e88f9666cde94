//! Process heap access through the Rust global allocator, for targets without
//! a C allocator binding.

use std::alloc::{Layout, alloc, alloc_zeroed, dealloc};
use std::ffi::c_void;

const NATURAL_ALIGNMENT: usize = 16;

/// Returns the alignment every block from [`allocate`] and [`allocate_zeroed`]
/// is guaranteed to have.
pub fn natural_alignment() -> usize {
    NATURAL_ALIGNMENT
}

/// Allocates `size` bytes of uninitialized memory at the natural alignment.
pub fn allocate(size: usize) -> std::io::Result<*mut c_void> {
    let layout = make_layout(size, 0)?;
    check_allocated(unsafe { alloc(layout) })
}

/// Allocates `size` bytes of zeroed memory at the natural alignment.
pub fn allocate_zeroed(size: usize) -> std::io::Result<*mut c_void> {
    let layout = make_layout(size, 0)?;
    check_allocated(unsafe { alloc_zeroed(layout) })
}

/// Allocates `size` bytes of uninitialized memory whose address is a multiple
/// of `alignment`.
pub fn allocate_aligned(size: usize, alignment: usize) -> std::io::Result<*mut c_void> {
    assert!(alignment.is_power_of_two());
    let layout = make_layout(size, alignment)?;
    check_allocated(unsafe { alloc(layout) })
}

/// Returns a block to the global allocator.
///
/// # Safety
///
/// `ptr` must come from one of the allocation functions of this module, called
/// with the same `size` and `alignment` (0 for the natural alignment), and
/// must not have been freed already.
pub unsafe fn free(ptr: *mut c_void, size: usize, alignment: usize) {
    let layout = make_layout(size, alignment).expect("layout was valid at allocation");
    unsafe { dealloc(ptr as *mut u8, layout) }
}

fn make_layout(size: usize, alignment: usize) -> std::io::Result<Layout> {
    let alignment = if alignment == 0 {
        NATURAL_ALIGNMENT
    } else {
        alignment
    };
    Layout::from_size_align(size.max(1), alignment)
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "Invalid layout"))
}

fn check_allocated(ptr: *mut u8) -> std::io::Result<*mut c_void> {
    if ptr.is_null() {
        Err(std::io::Error::new(
            std::io::ErrorKind::OutOfMemory,
            "Failed to allocate memory",
        ))
    } else {
        Ok(ptr as *mut c_void)
    }
}
