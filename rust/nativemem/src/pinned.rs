//! `PinnedArrayAllocation<T>`: an aligned window into an over-allocated array.
//!
//! The backing array is a `Vec` that is never resized, so its heap address is
//! fixed for as long as the allocation is alive, and moving the allocation
//! value does not move the elements. Native code can keep using the window
//! without any extra pinning step. Memory is reclaimed when the value is
//! dropped.

use std::mem::MaybeUninit;
use std::pin::Pin;

use nativemem_align::{align_up, checked_byte_len, padding_elements};
use nativemem_common::{Result, error::Error, result::verify_alignment};

use crate::{owner::WindowOwner, window::Window};

/// An array of `T` with a sub-range of `length` elements whose base address
/// satisfies the requested alignment.
///
/// `array_length() >= aligned_length() == length`. The padding elements
/// before and after the aligned range are never exposed.
pub struct PinnedArrayAllocation<T: bytemuck::Pod> {
    /// Backing storage; never resized after construction.
    array: Vec<MaybeUninit<T>>,
    window: Window<T>,
    /// Byte offset of the window from the start of the array.
    offset: usize,
    initialized: bool,
}

impl<T: bytemuck::Pod> PinnedArrayAllocation<T> {
    /// Allocates an array with room for `length` elements at `alignment`.
    ///
    /// # Arguments
    ///
    /// * `length` - Number of usable elements.
    /// * `zeroed` - Whether the array is zero-filled. Leaving it uninitialized
    ///   skips the fill.
    /// * `alignment` - Required byte alignment of the window, or 0 for the
    ///   natural alignment of `T`. Must be a power of two and a multiple of
    ///   `size_of::<T>()`.
    ///
    /// # Errors
    ///
    /// - `InvalidAlignment` if `alignment` breaks the rules above; reported
    ///   before anything is allocated.
    /// - `CapacityOverflow` if the padded array does not fit in `isize` bytes.
    /// - `AllocationFailed` if the array cannot be allocated.
    pub fn new(length: usize, zeroed: bool, alignment: usize) -> Result<PinnedArrayAllocation<T>> {
        let element_size = std::mem::size_of::<T>();
        verify_alignment(alignment, element_size)?;
        if alignment != 0 && (element_size == 0 || alignment % element_size != 0) {
            return Err(Error::invalid_alignment(
                alignment,
                element_size,
                "alignment must be a multiple of the element size",
            ));
        }

        let extra = padding_elements(alignment, element_size);
        let array_length = length
            .checked_add(extra)
            .filter(|&n| checked_byte_len(n, element_size).is_some())
            .ok_or_else(|| Error::capacity_overflow(length, element_size))?;

        let mut array = Vec::<MaybeUninit<T>>::new();
        array.try_reserve_exact(array_length).map_err(|e| {
            Error::allocation_failed(
                array_length * element_size,
                alignment,
                std::io::Error::new(std::io::ErrorKind::OutOfMemory, e),
            )
        })?;
        unsafe {
            if zeroed {
                array.as_mut_ptr().write_bytes(0, array_length);
            }
            // `MaybeUninit` elements need no initialization.
            array.set_len(array_length);
        }

        let base = array.as_ptr() as usize;
        let offset = if alignment == 0 {
            0
        } else {
            align_up(base, alignment) - base
        };
        assert!(
            offset + length * element_size <= array_length * element_size,
            "failed to align the pinned array: offset {offset}, length {length}, array length {array_length}"
        );

        let ptr = unsafe { array.as_mut_ptr().byte_add(offset) }.cast::<T>();
        if extra != 0 {
            log::debug!(
                "pinned array {:p}: {extra} padding elements, window at byte offset {offset}",
                array.as_ptr()
            );
        }

        Ok(PinnedArrayAllocation {
            array,
            window: Window::new(ptr, length),
            offset,
            initialized: zeroed || length == 0,
        })
    }

    /// Allocates `length` zeroed elements at the natural alignment of `T`.
    pub fn zeroed(length: usize) -> Result<PinnedArrayAllocation<T>> {
        Self::new(length, true, 0)
    }

    /// The window over the aligned elements.
    #[inline]
    pub fn window(&self) -> Window<T> {
        self.window
    }

    /// Length of the full backing array, padding included.
    #[inline]
    pub fn array_length(&self) -> usize {
        self.array.len()
    }

    /// Number of usable (aligned) elements; equal to the requested length.
    #[inline]
    pub fn aligned_length(&self) -> usize {
        self.window.len()
    }

    /// Byte offset of the aligned window from the start of the array.
    #[inline]
    pub fn array_offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns the aligned elements as a slice.
    ///
    /// # Panics
    ///
    /// Panics if the contents have not been initialized.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        assert!(self.initialized, "pinned array is not initialized");
        unsafe { self.window.as_slice() }
    }

    /// Returns the aligned elements as a mutable slice.
    ///
    /// # Panics
    ///
    /// Panics if the contents have not been initialized.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        assert!(self.initialized, "pinned array is not initialized");
        unsafe { self.window.as_mut_slice() }
    }

    /// Returns the aligned elements as possibly-uninitialized storage.
    #[inline]
    pub fn as_uninit_slice_mut(&mut self) -> &mut [MaybeUninit<T>] {
        unsafe { self.window.as_uninit().as_mut_slice() }
    }

    /// Exposes exactly the aligned sub-range for native consumption.
    ///
    /// The storage never moves while `self` is alive, so the returned view
    /// can be handed to native code as-is.
    #[inline]
    pub fn as_pinned_slice(&self) -> Pin<&[T]>
    where
        T: Unpin,
    {
        Pin::new(self.as_slice())
    }

    /// Mutable counterpart of [`as_pinned_slice`](Self::as_pinned_slice).
    #[inline]
    pub fn as_pinned_mut_slice(&mut self) -> Pin<&mut [T]>
    where
        T: Unpin,
    {
        Pin::new(self.as_mut_slice())
    }

    /// Sets every aligned element to `value` and marks the contents initialized.
    pub fn fill(&mut self, value: T) {
        for slot in self.as_uninit_slice_mut() {
            slot.write(value);
        }
        self.initialized = true;
    }

    /// Marks the contents initialized.
    ///
    /// # Safety
    ///
    /// Every element of the aligned window must have been written.
    #[inline]
    pub unsafe fn assume_init(&mut self) {
        self.initialized = true;
    }
}

impl<T: bytemuck::Pod> WindowOwner<T> for PinnedArrayAllocation<T> {
    #[inline]
    fn window(&self) -> Window<T> {
        self.window
    }
}

impl<T: bytemuck::Pod> std::ops::Deref for PinnedArrayAllocation<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: bytemuck::Pod> std::ops::DerefMut for PinnedArrayAllocation<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: bytemuck::Pod> std::fmt::Debug for PinnedArrayAllocation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinnedArrayAllocation")
            .field("ptr", &self.window.as_ptr())
            .field("len", &self.window.len())
            .field("array_length", &self.array.len())
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

// SAFETY: the window points into `array`, which this value owns exclusively.
unsafe impl<T: bytemuck::Pod + Send> Send for PinnedArrayAllocation<T> {}

// SAFETY: shared access only hands out `&[T]`.
unsafe impl<T: bytemuck::Pod + Sync> Sync for PinnedArrayAllocation<T> {}
