//! Process heap access through the C allocator (`malloc`, `calloc`,
//! `posix_memalign`, `free`).

use std::ffi::c_void;

/// Returns the alignment every block from [`allocate`] and [`allocate_zeroed`]
/// is guaranteed to have.
pub fn natural_alignment() -> usize {
    std::mem::align_of::<libc::max_align_t>()
}

/// Allocates `size` bytes of uninitialized memory at the natural alignment.
///
/// A zero `size` is rounded up to one byte so the returned address is unique.
pub fn allocate(size: usize) -> std::io::Result<*mut c_void> {
    let ptr = unsafe { libc::malloc(size.max(1)) };
    check_allocated(ptr)
}

/// Allocates `size` bytes of zeroed memory at the natural alignment.
pub fn allocate_zeroed(size: usize) -> std::io::Result<*mut c_void> {
    let ptr = unsafe { libc::calloc(1, size.max(1)) };
    check_allocated(ptr)
}

/// Allocates `size` bytes of uninitialized memory whose address is a multiple
/// of `alignment`.
///
/// `alignment` must be a power of two. Values below the pointer size are
/// raised to it, as `posix_memalign` requires.
pub fn allocate_aligned(size: usize, alignment: usize) -> std::io::Result<*mut c_void> {
    assert!(alignment.is_power_of_two());
    let alignment = alignment.max(std::mem::size_of::<*mut c_void>());
    let mut ptr = std::ptr::null_mut();
    let res = unsafe { libc::posix_memalign(&mut ptr, alignment, size.max(1)) };
    if res != 0 {
        return Err(std::io::Error::from_raw_os_error(res));
    }
    check_allocated(ptr)
}

/// Returns a block to the C allocator.
///
/// # Safety
///
/// `ptr` must come from one of the allocation functions of this module and
/// must not have been freed already. `size` and `alignment` are accepted for
/// parity with other backends and are not used.
pub unsafe fn free(ptr: *mut c_void, _size: usize, _alignment: usize) {
    unsafe { libc::free(ptr) }
}

fn check_allocated(ptr: *mut c_void) -> std::io::Result<*mut c_void> {
    if ptr.is_null() {
        Err(std::io::Error::from(std::io::ErrorKind::OutOfMemory))
    } else {
        Ok(ptr)
    }
}
