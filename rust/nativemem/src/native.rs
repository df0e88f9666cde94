//! `NativeAllocation<T>`: typed memory taken directly from the process heap.

use std::ffi::c_void;
use std::mem::{ManuallyDrop, MaybeUninit};

use nativemem_align::checked_byte_len;
use nativemem_common::{Result, error::Error, result::verify_alignment};

use crate::{heap, owner::WindowOwner, window::Window};

/// A block of `len` elements of `T` allocated from the process heap, outside
/// of any Rust container.
///
/// The allocation owns its memory and frees it exactly once, on drop. The
/// exposed [`Window`] never changes address or length; windows handed out to
/// other code do not carry the obligation to free.
///
/// Contents are either zeroed at allocation time or left uninitialized. The
/// safe slice accessors require initialized contents: request `zeroed`, call
/// [`fill`](Self::fill), write through
/// [`as_uninit_slice_mut`](Self::as_uninit_slice_mut) and then
/// [`assume_init`](Self::assume_init).
pub struct NativeAllocation<T: bytemuck::Pod> {
    window: Window<T>,
    /// Alignment passed to the heap backend, 0 for the natural alignment.
    alignment: usize,
    initialized: bool,
}

impl<T: bytemuck::Pod> NativeAllocation<T> {
    /// Allocates room for `length` elements.
    ///
    /// # Arguments
    ///
    /// * `length` - Number of elements. Zero is allowed; the block still gets
    ///   a unique address.
    /// * `zeroed` - Whether the memory is zero-filled.
    /// * `alignment` - Required byte alignment of the base address, or 0 for
    ///   the allocator's natural alignment. The alignment of `T` is always
    ///   honored on top of it.
    ///
    /// # Errors
    ///
    /// - `InvalidAlignment` if `alignment` is neither 0 nor a power of two.
    ///   Nothing is allocated in this case.
    /// - `CapacityOverflow` if the byte size does not fit in `isize`.
    /// - `AllocationFailed` if the heap cannot satisfy the request.
    pub fn new(length: usize, zeroed: bool, alignment: usize) -> Result<NativeAllocation<T>> {
        let element_size = std::mem::size_of::<T>();
        verify_alignment(alignment, element_size)?;
        let bytes = checked_byte_len(length, element_size)
            .ok_or_else(|| Error::capacity_overflow(length, element_size))?;

        let type_alignment = std::mem::align_of::<T>();
        let alignment = if alignment == 0 && type_alignment <= heap::natural_alignment() {
            0
        } else {
            alignment.max(type_alignment)
        };

        let allocated = if alignment != 0 {
            heap::allocate_aligned(bytes, alignment).inspect(|&ptr| {
                if zeroed {
                    unsafe { (ptr as *mut u8).write_bytes(0, bytes) };
                }
            })
        } else if zeroed {
            heap::allocate_zeroed(bytes)
        } else {
            heap::allocate(bytes)
        };
        let ptr = allocated.map_err(|e| Error::allocation_failed(bytes, alignment, e))?;

        #[cfg(any(debug_assertions, feature = "ledger"))]
        crate::ledger::record(ptr as usize, bytes);

        log::trace!("native alloc {ptr:p}: {bytes} bytes, alignment {alignment}, zeroed {zeroed}");

        Ok(NativeAllocation {
            window: Window::new(ptr as *mut T, length),
            alignment,
            initialized: zeroed || length == 0,
        })
    }

    /// Allocates `length` zeroed elements at the natural alignment.
    pub fn zeroed(length: usize) -> Result<NativeAllocation<T>> {
        Self::new(length, true, 0)
    }

    /// Allocates `length` elements and sets each of them to `value`.
    pub fn from_value(length: usize, value: T, alignment: usize) -> Result<NativeAllocation<T>> {
        let mut alloc = Self::new(length, false, alignment)?;
        alloc.fill(value);
        Ok(alloc)
    }

    /// Allocates a copy of `data`.
    pub fn copy_from_slice(data: &[T], alignment: usize) -> Result<NativeAllocation<T>> {
        let mut alloc = Self::new(data.len(), false, alignment)?;
        for (dst, src) in alloc.as_uninit_slice_mut().iter_mut().zip(data) {
            dst.write(*src);
        }
        alloc.initialized = true;
        Ok(alloc)
    }

    /// The window over the allocated elements.
    #[inline]
    pub fn window(&self) -> Window<T> {
        self.window
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Alignment the block was requested with from the heap, or 0 when the
    /// natural alignment was sufficient.
    #[inline]
    pub fn alignment(&self) -> usize {
        self.alignment
    }

    #[inline]
    pub fn as_ptr(&self) -> *const T {
        self.window.as_ptr()
    }

    #[inline]
    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.window.as_mut_ptr()
    }

    /// Returns `true` if every element holds a defined value.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns the elements as a slice.
    ///
    /// # Panics
    ///
    /// Panics if the contents have not been initialized.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        assert!(self.initialized, "native allocation is not initialized");
        unsafe { self.window.as_slice() }
    }

    /// Returns the elements as a mutable slice.
    ///
    /// # Panics
    ///
    /// Panics if the contents have not been initialized.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        assert!(self.initialized, "native allocation is not initialized");
        unsafe { self.window.as_mut_slice() }
    }

    /// Returns the elements as possibly-uninitialized storage.
    #[inline]
    pub fn as_uninit_slice_mut(&mut self) -> &mut [MaybeUninit<T>] {
        unsafe { self.window.as_uninit().as_mut_slice() }
    }

    /// Sets every element to `value` and marks the contents initialized.
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
    /// Every element must have been written (for example through
    /// [`as_uninit_slice_mut`](Self::as_uninit_slice_mut) or a raw pointer).
    #[inline]
    pub unsafe fn assume_init(&mut self) {
        self.initialized = true;
    }

    /// Gives up ownership of the memory, returning its window and the
    /// alignment needed to free it later with [`from_raw_parts`](Self::from_raw_parts).
    ///
    /// The memory is leaked unless it is re-adopted.
    pub fn into_raw_parts(self) -> (Window<T>, usize) {
        let this = ManuallyDrop::new(self);
        (this.window, this.alignment)
    }

    /// Re-adopts memory released by [`into_raw_parts`](Self::into_raw_parts).
    /// The returned allocation frees it on drop. Contents are treated as
    /// uninitialized.
    ///
    /// # Safety
    ///
    /// `window` and `alignment` must be exactly the values returned by
    /// `into_raw_parts`, and the memory must not be owned by anything else.
    /// Re-adopting the same memory twice leads to a double free, which the
    /// allocation ledger turns into a panic in debug builds.
    pub unsafe fn from_raw_parts(window: Window<T>, alignment: usize) -> NativeAllocation<T> {
        NativeAllocation {
            window,
            alignment,
            initialized: false,
        }
    }
}

impl<T: bytemuck::Pod> Drop for NativeAllocation<T> {
    fn drop(&mut self) {
        let ptr = self.window.as_mut_ptr() as *mut c_void;
        let bytes = self.window.byte_len();

        #[cfg(any(debug_assertions, feature = "ledger"))]
        crate::ledger::release(ptr as usize);

        log::trace!("native free {ptr:p}: {bytes} bytes");
        unsafe { heap::free(ptr, bytes, self.alignment) };
    }
}

impl<T: bytemuck::Pod> WindowOwner<T> for NativeAllocation<T> {
    #[inline]
    fn window(&self) -> Window<T> {
        self.window
    }
}

impl<T: bytemuck::Pod> std::ops::Deref for NativeAllocation<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: bytemuck::Pod> std::ops::DerefMut for NativeAllocation<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: bytemuck::Pod> PartialEq for NativeAllocation<T> {
    /// Two allocations are equal if they cover the same memory extent.
    fn eq(&self, other: &Self) -> bool {
        self.window == other.window
    }
}

impl<T: bytemuck::Pod> Eq for NativeAllocation<T> {}

impl<T: bytemuck::Pod> std::hash::Hash for NativeAllocation<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.window.hash(state);
    }
}

impl<T: bytemuck::Pod> std::fmt::Debug for NativeAllocation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeAllocation")
            .field("ptr", &self.window.as_ptr())
            .field("len", &self.window.len())
            .field("alignment", &self.alignment)
            .field("initialized", &self.initialized)
            .finish()
    }
}

// SAFETY: the allocation exclusively owns its block, like a `Box<[T]>`.
unsafe impl<T: bytemuck::Pod + Send> Send for NativeAllocation<T> {}

// SAFETY: shared access only hands out `&[T]`.
unsafe impl<T: bytemuck::Pod + Sync> Sync for NativeAllocation<T> {}
