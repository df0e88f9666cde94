//! `Window<T>`: a non-owning view over a contiguous run of `T` values.
//!
//! A window is nothing more than a base pointer and an element count. It never
//! allocates, never frees, and copying it never copies the memory it covers.
//! Whoever produced the window (an allocation, a borrowed slice, a foreign
//! buffer) is responsible for keeping the memory alive while the window is in
//! use, which is why every accessor that dereferences the pointer is `unsafe`.
//!
//! # Contract checks
//!
//! Slicing and casting validate their preconditions with `debug_assert!`. In
//! optimized builds these checks are compiled out and violating them is
//! undefined behavior.

use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;
use std::marker::PhantomData;
use std::mem::MaybeUninit;

use nativemem_align::{cast_len_of, is_aligned, is_valid_alignment};

/// A non-owning reference to `len` consecutive `T` values starting at `ptr`.
///
/// The pointer is either null (with `len == 0`) or valid for reads and writes
/// of `len` elements for as long as the owner of the memory guarantees.
///
/// Two windows are equal if and only if they cover the same extent: same base
/// address and same length. The contents are never compared.
pub struct Window<T> {
    ptr: *mut T,
    len: usize,
}

impl<T> Window<T> {
    /// Creates a window over `len` elements at `ptr`.
    ///
    /// Constructing a window is always safe; dereferencing it is not. See the
    /// `unsafe` accessors for the requirements placed on `ptr`.
    #[inline]
    pub const fn new(ptr: *mut T, len: usize) -> Window<T> {
        Window { ptr, len }
    }

    /// Returns the empty window (null pointer, zero length).
    #[inline]
    pub const fn empty() -> Window<T> {
        Window {
            ptr: std::ptr::null_mut(),
            len: 0,
        }
    }

    /// Creates a window covering the given slice.
    ///
    /// The window does not borrow the slice: the caller must keep the slice's
    /// storage alive and unaliased for every later access through the window.
    #[inline]
    pub fn from_mut_slice(slice: &mut [T]) -> Window<T> {
        Window::new(slice.as_mut_ptr(), slice.len())
    }

    /// Number of elements covered by the window.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the covered range in bytes.
    #[inline]
    pub const fn byte_len(&self) -> usize {
        self.len * std::mem::size_of::<T>()
    }

    #[inline]
    pub const fn as_ptr(&self) -> *const T {
        self.ptr
    }

    #[inline]
    pub const fn as_mut_ptr(&self) -> *mut T {
        self.ptr
    }

    /// Returns the base address as an integer.
    #[inline]
    pub fn addr(&self) -> usize {
        self.ptr as usize
    }

    /// Returns `true` if the base address is a multiple of `alignment`.
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is not a non-zero power of two.
    #[inline]
    pub fn is_aligned_to(&self, alignment: usize) -> bool {
        assert!(
            is_valid_alignment(alignment),
            "alignment {alignment} is not a power of two"
        );
        is_aligned(self.addr(), alignment)
    }

    /// Returns `true` if `[start, start + len)` is a valid sub-range of this
    /// window. `start` must be strictly inside the window.
    #[inline]
    pub const fn is_in_range(&self, start: usize, len: usize) -> bool {
        start < self.len && len <= self.len - start
    }

    /// Returns the sub-window of `len` elements starting at `start`.
    ///
    /// Requires `start < self.len()` and `len <= self.len() - start`; checked
    /// in debug builds only.
    #[inline]
    pub fn slice(&self, start: usize, len: usize) -> Window<T> {
        debug_assert!(
            self.is_in_range(start, len),
            "start {start} and len {len} are out of range for a window of len {}",
            self.len
        );
        Window::new(self.ptr.wrapping_add(start), len)
    }

    /// Returns the sub-window from `start` to the end of this window.
    ///
    /// Requires `start < self.len()`; checked in debug builds only.
    #[inline]
    pub fn slice_from(&self, start: usize) -> Window<T> {
        let len = self.len.wrapping_sub(start);
        debug_assert!(
            self.is_in_range(start, len),
            "start {start} is out of range for a window of len {}",
            self.len
        );
        Window::new(self.ptr.wrapping_add(start), len)
    }

    /// Returns the first `len` elements of this window.
    ///
    /// Requires `len <= self.len()`; checked in debug builds only. `slice_to(0)`
    /// is valid on any window, including the empty one.
    #[inline]
    pub fn slice_to(&self, len: usize) -> Window<T> {
        debug_assert!(
            len <= self.len,
            "len {len} is out of range for a window of len {}",
            self.len
        );
        Window::new(self.ptr, len)
    }

    /// Reinterprets the window as a window of `U`.
    ///
    /// The new length is `floor(len * size_of::<T>() / size_of::<U>())`: the
    /// covered byte range is preserved except for a partial trailing `U`, whose
    /// bytes become unreachable through the returned window.
    ///
    /// The base address must be suitably aligned for `U` (checked in debug
    /// builds only).
    ///
    /// # Panics
    ///
    /// Panics if `U` is zero-sized.
    #[inline]
    pub fn cast<U>(&self) -> Window<U> {
        debug_assert!(
            self.ptr.is_null() || is_aligned(self.addr(), std::mem::align_of::<U>()),
            "address {:#x} is not aligned for a {}-byte aligned element type",
            self.addr(),
            std::mem::align_of::<U>()
        );
        Window::new(self.ptr.cast::<U>(), cast_len_of::<T, U>(self.len))
    }

    /// Views the window as possibly-uninitialized storage.
    #[inline]
    pub fn as_uninit(&self) -> Window<MaybeUninit<T>> {
        Window::new(self.ptr.cast::<MaybeUninit<T>>(), self.len)
    }

    /// Returns the covered elements as a shared slice.
    ///
    /// # Safety
    ///
    /// For the whole lifetime `'a`, the window's memory must be live,
    /// initialized, and not mutated through any other path.
    #[inline]
    pub unsafe fn as_slice<'a>(&self) -> &'a [T] {
        if self.len == 0 {
            return &[];
        }
        unsafe { std::slice::from_raw_parts(self.ptr, self.len) }
    }

    /// Returns the covered elements as a mutable slice.
    ///
    /// # Safety
    ///
    /// For the whole lifetime `'a`, the window's memory must be live,
    /// initialized, and not accessed through any other path.
    #[inline]
    pub unsafe fn as_mut_slice<'a>(&self) -> &'a mut [T] {
        if self.len == 0 {
            return &mut [];
        }
        unsafe { std::slice::from_raw_parts_mut(self.ptr, self.len) }
    }

    /// Returns an iterator over shared references to the covered elements, in
    /// address order.
    ///
    /// Since `Window` is `Copy`, iteration can be restarted at any time by
    /// calling `iter` again.
    ///
    /// # Safety
    ///
    /// Same requirements as [`Window::as_slice`].
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    #[inline]
    pub unsafe fn iter<'a>(&self) -> Iter<'a, T> {
        Iter::new(self.ptr, self.len)
    }

    /// Returns an iterator over mutable references to the covered elements.
    ///
    /// # Safety
    ///
    /// Same requirements as [`Window::as_mut_slice`].
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    #[inline]
    pub unsafe fn iter_mut<'a>(&self) -> IterMut<'a, T> {
        IterMut {
            inner: Iter::new(self.ptr, self.len),
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for Window<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Window<T> {}

impl<T> Default for Window<T> {
    fn default() -> Self {
        Window::empty()
    }
}

impl<T> PartialEq for Window<T> {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.ptr, other.ptr) && self.len == other.len
    }
}

impl<T> Eq for Window<T> {}

impl<T> Hash for Window<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
        self.len.hash(state);
    }
}

impl<T> std::fmt::Debug for Window<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

/// Iterator over the elements of a [`Window`].
///
/// Walks a cursor from the base address up to a one-past-the-end sentinel.
pub struct Iter<'a, T> {
    cur: *const T,
    end: *const T,
    _marker: PhantomData<&'a T>,
}

impl<T> Iter<'_, T> {
    #[inline]
    fn new(ptr: *const T, len: usize) -> Self {
        assert_ne!(
            std::mem::size_of::<T>(),
            0,
            "cannot iterate a window of zero-sized elements"
        );
        Iter {
            cur: ptr,
            end: ptr.wrapping_add(len),
            _marker: PhantomData,
        }
    }

    #[inline]
    fn remaining(&self) -> usize {
        (self.end as usize - self.cur as usize) / std::mem::size_of::<T>()
    }

    #[inline]
    fn advance(&mut self) -> Option<*const T> {
        if self.cur == self.end {
            return None;
        }
        let item = self.cur;
        self.cur = self.cur.wrapping_add(1);
        Some(item)
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    #[inline]
    fn next(&mut self) -> Option<&'a T> {
        self.advance().map(|p| unsafe { &*p })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (n, Some(n))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// Mutable iterator over the elements of a [`Window`].
pub struct IterMut<'a, T> {
    inner: Iter<'a, T>,
    _marker: PhantomData<&'a mut T>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    #[inline]
    fn next(&mut self) -> Option<&'a mut T> {
        self.inner.advance().map(|p| unsafe { &mut *(p as *mut T) })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for IterMut<'_, T> {}

impl<T> FusedIterator for IterMut<'_, T> {}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_empty_window() {
        let w = Window::<u32>::empty();
        assert!(w.is_empty());
        assert!(w.as_ptr().is_null());
        assert_eq!(w.byte_len(), 0);
        assert_eq!(unsafe { w.as_slice() }, &[] as &[u32]);
        assert_eq!(unsafe { w.iter() }.count(), 0);
        assert_eq!(w.slice_to(0), w);
        assert_eq!(w.cast::<u8>().len(), 0);
    }

    #[test]
    fn test_slice_addresses() {
        let mut data = [0u32; 16];
        let w = Window::from_mut_slice(&mut data);
        let s = w.slice(3, 5);
        assert_eq!(s.len(), 5);
        assert_eq!(s.addr(), w.addr() + 3 * 4);

        let tail = w.slice_from(10);
        assert_eq!(tail.len(), 6);
        assert_eq!(tail.addr(), w.addr() + 40);

        let head = w.slice_to(4);
        assert_eq!(head.len(), 4);
        assert_eq!(head.addr(), w.addr());

        assert_eq!(w.slice_to(0).len(), 0);
        assert_eq!(w.slice(15, 1).len(), 1);
    }

    #[test]
    fn test_slice_views_same_memory() {
        let mut data: Vec<u64> = (0..8).collect();
        let w = Window::from_mut_slice(&mut data);
        unsafe {
            w.slice(2, 3).as_mut_slice().fill(42);
            assert_eq!(w.as_slice(), &[0, 1, 42, 42, 42, 5, 6, 7]);
        }
    }

    #[test]
    fn test_is_in_range() {
        let mut data = [0u8; 4];
        let w = Window::from_mut_slice(&mut data);
        assert!(w.is_in_range(0, 4));
        assert!(w.is_in_range(3, 1));
        assert!(w.is_in_range(3, 0));
        assert!(!w.is_in_range(4, 0));
        assert!(!w.is_in_range(2, 3));
        assert!(!Window::<u8>::empty().is_in_range(0, 0));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "out of range")]
    fn test_slice_out_of_range_asserts() {
        let mut data = [0u8; 4];
        let w = Window::from_mut_slice(&mut data);
        let _ = w.slice(2, 3);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "out of range")]
    fn test_slice_from_end_asserts() {
        let mut data = [0u8; 4];
        let w = Window::from_mut_slice(&mut data);
        let _ = w.slice_from(4);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "out of range")]
    fn test_slice_to_past_end_asserts() {
        let mut data = [0u8; 4];
        let w = Window::from_mut_slice(&mut data);
        let _ = w.slice_to(5);
    }

    #[test]
    fn test_cast_preserves_byte_range() {
        let mut data = [0u32; 10];
        let w = Window::from_mut_slice(&mut data);

        let bytes = w.cast::<u8>();
        assert_eq!(bytes.len(), 40);
        assert_eq!(bytes.addr(), w.addr());

        let halves = w.cast::<u16>();
        assert_eq!(halves.len(), 20);

        let back = bytes.cast::<u32>();
        assert_eq!(back, w);
    }

    #[test]
    fn test_cast_discards_partial_trailing_element() {
        let mut data = [0u64; 2];
        let w = Window::from_mut_slice(&mut data).cast::<u32>().slice_to(3);
        assert_eq!(w.len(), 3);
        let wide = w.cast::<u64>();
        assert_eq!(wide.len(), 1);
        assert!(wide.cast::<u32>().len() <= w.len());
    }

    #[test]
    fn test_cast_reads_through() {
        let mut data = [0x0102_0304u32, 0x0506_0708];
        let w = Window::from_mut_slice(&mut data);
        let bytes = unsafe { w.cast::<u8>().as_slice() };
        assert_eq!(bytes, bytemuck::cast_slice::<u32, u8>(&data));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "not aligned")]
    fn test_misaligned_cast_asserts() {
        let mut data = [0u64; 4];
        let w = Window::from_mut_slice(&mut data).cast::<u8>().slice_from(1);
        let _ = w.cast::<u32>();
    }

    #[test]
    fn test_iteration_is_restartable() {
        let mut data = [1i32, 2, 3, 4];
        let w = Window::from_mut_slice(&mut data);
        let first: Vec<i32> = unsafe { w.iter() }.copied().collect();
        let second: Vec<i32> = unsafe { w.iter() }.copied().collect();
        assert_eq!(first, vec![1, 2, 3, 4]);
        assert_eq!(first, second);

        let mut it = unsafe { w.iter() };
        assert_eq!(it.len(), 4);
        it.next();
        assert_eq!(it.len(), 3);
        assert_eq!(it.by_ref().count(), 3);
        assert!(it.next().is_none());
    }

    #[test]
    fn test_iter_mut_writes() {
        let mut data = [0u16; 5];
        let w = Window::from_mut_slice(&mut data);
        for (i, x) in unsafe { w.iter_mut() }.enumerate() {
            *x = i as u16 * 10;
        }
        assert_eq!(data, [0, 10, 20, 30, 40]);
    }

    #[test]
    fn test_equality_is_extent() {
        let mut a = [7u8; 8];
        let mut b = [7u8; 8];
        let wa = Window::from_mut_slice(&mut a);
        let wb = Window::from_mut_slice(&mut b);
        assert_ne!(wa, wb, "same contents, different memory");
        assert_eq!(wa, wa.slice(0, 8));
        assert_ne!(wa, wa.slice_to(7));

        let set: HashSet<Window<u8>> = [wa, wa, wb, wa.slice_to(4)].into_iter().collect();
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_is_aligned_to() {
        #[repr(align(64))]
        struct Block([u8; 64]);
        let mut block = Block([0; 64]);
        let w = Window::from_mut_slice(&mut block.0);
        assert!(w.is_aligned_to(64));
        assert!(!w.slice_from(1).is_aligned_to(2));
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn slice_base_is_offset_by_start(
                len in 1usize..256,
                start_frac in 0.0f64..1.0,
                len_frac in 0.0f64..=1.0,
            ) {
                let mut data = vec![0u32; len];
                let w = Window::from_mut_slice(&mut data);
                let start = ((len as f64) * start_frac) as usize;
                let start = start.min(len - 1);
                let sub_len = (((len - start) as f64) * len_frac) as usize;
                let s = w.slice(start, sub_len);
                prop_assert_eq!(s.addr(), w.addr() + start * 4);
                prop_assert_eq!(s.len(), sub_len);
            }

            #[test]
            fn cast_len_rounds_down(len in 0usize..512) {
                let mut data = vec![0u16; len];
                let w = Window::from_mut_slice(&mut data);
                prop_assert_eq!(w.cast::<u8>().len(), len * 2);
                let wide = w.cast::<[u16; 3]>();
                prop_assert_eq!(wide.len(), len / 3);
                prop_assert!(wide.cast::<u16>().len() <= len);
            }
        }
    }
}
