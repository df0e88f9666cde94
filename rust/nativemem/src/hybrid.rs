//! `HybridAllocation`: reuse a caller's buffer when it is large enough,
//! otherwise allocate fresh native memory.

use std::marker::PhantomData;

use nativemem_common::{Result, result::verify_alignment};

use crate::{native::NativeAllocation, owner::WindowOwner, window::Window};

/// Where the memory of a [`HybridAllocation`] comes from.
enum HybridStorage<T: bytemuck::Pod> {
    /// The caller's window, used verbatim. Never freed by the hybrid.
    Borrowed(Window<T>),
    /// Memory allocated by the hybrid itself. Freed on drop.
    Owned(NativeAllocation<T>),
}

/// A window of at least `required_length` elements that is either borrowed
/// from an existing buffer or freshly allocated.
///
/// The branch is decided once, at construction. On drop, only memory the
/// hybrid allocated itself is freed; a reused buffer stays with its owner.
///
/// # Alignment of reused buffers
///
/// When the existing buffer is reused, it is *not* checked to meet the
/// requested alignment in optimized builds (debug builds assert it). Callers
/// that pass an `alignment` must supply buffers that are already aligned.
pub struct HybridAllocation<'a, T: bytemuck::Pod> {
    storage: HybridStorage<T>,
    _borrow: PhantomData<&'a mut [T]>,
}

impl<'a, T: bytemuck::Pod> HybridAllocation<'a, T> {
    /// Reuses `existing` if it holds at least `required_length` elements,
    /// otherwise allocates `required_length` elements with the given zeroing
    /// and alignment.
    ///
    /// A reused buffer keeps its contents and its full length; `zeroed`
    /// applies to new allocations only.
    ///
    /// # Errors
    ///
    /// - `InvalidAlignment` if `alignment` is neither 0 nor a power of two.
    /// - Any error of [`NativeAllocation::new`] when a new allocation is needed.
    pub fn new_in(
        existing: &'a mut [T],
        required_length: usize,
        zeroed: bool,
        alignment: usize,
    ) -> Result<HybridAllocation<'a, T>> {
        let storage = Self::choose(
            Window::from_mut_slice(existing),
            required_length,
            zeroed,
            alignment,
        )?;
        Ok(HybridAllocation {
            storage,
            _borrow: PhantomData,
        })
    }

    fn choose(
        existing: Window<T>,
        required_length: usize,
        zeroed: bool,
        alignment: usize,
    ) -> Result<HybridStorage<T>> {
        verify_alignment(alignment, std::mem::size_of::<T>())?;

        if existing.len() >= required_length {
            debug_assert!(
                alignment == 0 || existing.is_aligned_to(alignment),
                "existing window at {:#x} does not meet the required alignment {alignment}",
                existing.addr()
            );
            log::debug!(
                "hybrid: reusing existing window of {} elements for {required_length}",
                existing.len()
            );
            Ok(HybridStorage::Borrowed(existing))
        } else {
            log::debug!(
                "hybrid: existing window of {} elements is too small for {required_length}, allocating",
                existing.len()
            );
            let alloc = NativeAllocation::new(required_length, zeroed, alignment)?;
            Ok(HybridStorage::Owned(alloc))
        }
    }

    /// Returns `true` if the hybrid allocated (and will free) its own memory.
    #[inline]
    pub fn owns_allocation(&self) -> bool {
        matches!(self.storage, HybridStorage::Owned(_))
    }

    /// The window in use: the existing one on reuse, the new allocation's
    /// otherwise.
    #[inline]
    pub fn window(&self) -> Window<T> {
        match &self.storage {
            HybridStorage::Borrowed(window) => *window,
            HybridStorage::Owned(alloc) => alloc.window(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.window().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.window().is_empty()
    }

    /// Returns `true` if every element holds a defined value. A reused buffer
    /// is always initialized.
    #[inline]
    pub fn is_initialized(&self) -> bool {
        match &self.storage {
            HybridStorage::Borrowed(_) => true,
            HybridStorage::Owned(alloc) => alloc.is_initialized(),
        }
    }

    /// Returns the elements as a slice.
    ///
    /// # Panics
    ///
    /// Panics if a new, non-zeroed allocation has not been initialized.
    pub fn as_slice(&self) -> &[T] {
        match &self.storage {
            HybridStorage::Borrowed(window) => unsafe { window.as_slice() },
            HybridStorage::Owned(alloc) => alloc.as_slice(),
        }
    }

    /// Returns the elements as a mutable slice.
    ///
    /// # Panics
    ///
    /// Panics if a new, non-zeroed allocation has not been initialized.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        match &mut self.storage {
            HybridStorage::Borrowed(window) => unsafe { window.as_mut_slice() },
            HybridStorage::Owned(alloc) => alloc.as_mut_slice(),
        }
    }

    /// Sets every element to `value`.
    pub fn fill(&mut self, value: T) {
        match &mut self.storage {
            HybridStorage::Borrowed(window) => unsafe { window.as_mut_slice() }.fill(value),
            HybridStorage::Owned(alloc) => alloc.fill(value),
        }
    }
}

impl<T: bytemuck::Pod> HybridAllocation<'static, T> {
    /// Like [`new_in`](HybridAllocation::new_in), for an existing buffer known
    /// only by its window.
    ///
    /// # Safety
    ///
    /// The memory behind `existing` must be initialized, stay live, and not be
    /// accessed through any other path for as long as the returned hybrid is
    /// alive.
    pub unsafe fn from_window(
        existing: Window<T>,
        required_length: usize,
        zeroed: bool,
        alignment: usize,
    ) -> Result<HybridAllocation<'static, T>> {
        let storage = Self::choose(existing, required_length, zeroed, alignment)?;
        Ok(HybridAllocation {
            storage,
            _borrow: PhantomData,
        })
    }
}

impl<T: bytemuck::Pod> WindowOwner<T> for HybridAllocation<'_, T> {
    #[inline]
    fn window(&self) -> Window<T> {
        HybridAllocation::window(self)
    }
}

impl<T: bytemuck::Pod> std::ops::Deref for HybridAllocation<'_, T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: bytemuck::Pod> std::ops::DerefMut for HybridAllocation<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: bytemuck::Pod> std::fmt::Debug for HybridAllocation<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridAllocation")
            .field("window", &self.window())
            .field("owns_allocation", &self.owns_allocation())
            .finish()
    }
}

// SAFETY: a hybrid acts like `&mut [T]` (borrowed) or `Box<[T]>` (owned).
unsafe impl<T: bytemuck::Pod + Send> Send for HybridAllocation<'_, T> {}
