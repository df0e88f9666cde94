//! Alignment and element-cast arithmetic shared by the nativemem allocation types.
//!
//! All functions here are pure and operate on addresses, byte counts and element
//! counts expressed as `usize`.

/// Aligns a number up to the next multiple of the specified alignment.
///
/// # Examples
///
/// ```
/// use nativemem_align::align_up;
///
/// assert_eq!(align_up(0, 8), 0);
/// assert_eq!(align_up(1, 8), 8);
/// assert_eq!(align_up(8, 8), 8);
/// assert_eq!(align_up(9, 8), 16);
/// ```
///
/// # Panics
///
/// Panics in debug builds if `alignment` is 0 or not a power of 2.
#[inline]
pub fn align_up(n: usize, alignment: usize) -> usize {
    debug_assert!(is_valid_alignment(alignment));
    (n + alignment - 1) & !(alignment - 1)
}

/// Aligns a number down to the previous multiple of the specified alignment.
///
/// # Examples
///
/// ```
/// use nativemem_align::align_down;
///
/// assert_eq!(align_down(0, 8), 0);
/// assert_eq!(align_down(7, 8), 0);
/// assert_eq!(align_down(15, 8), 8);
/// assert_eq!(align_down(16, 8), 16);
/// ```
///
/// # Panics
///
/// Panics in debug builds if `alignment` is 0 or not a power of 2.
#[inline]
pub fn align_down(n: usize, alignment: usize) -> usize {
    debug_assert!(is_valid_alignment(alignment));
    n & !(alignment - 1)
}

/// Checks if a number (typically an address) lies on an alignment boundary.
///
/// # Examples
///
/// ```
/// use nativemem_align::is_aligned;
///
/// assert!(is_aligned(0, 64));
/// assert!(is_aligned(128, 64));
/// assert!(!is_aligned(65, 64));
/// ```
///
/// # Panics
///
/// Panics in debug builds if `alignment` is 0 or not a power of 2.
#[inline]
pub fn is_aligned(n: usize, alignment: usize) -> bool {
    debug_assert!(is_valid_alignment(alignment));
    (n & (alignment - 1)) == 0
}

/// Returns `true` if `alignment` is a non-zero power of two.
#[inline]
pub fn is_valid_alignment(alignment: usize) -> bool {
    alignment.is_power_of_two()
}

/// Returns the worst-case number of extra elements that must be allocated
/// past the requested length so that some element boundary inside the array
/// falls on an `alignment`-byte address.
///
/// An `alignment` of 0 means "no explicit alignment" and requires no padding.
///
/// # Examples
///
/// ```
/// use nativemem_align::padding_elements;
///
/// assert_eq!(padding_elements(0, 4), 0);
/// assert_eq!(padding_elements(64, 4), 16);
/// assert_eq!(padding_elements(64, 8), 8);
/// assert_eq!(padding_elements(8, 16), 1);
/// ```
///
/// # Panics
///
/// Panics if `element_size` is 0 and `alignment` is not.
#[inline]
pub fn padding_elements(alignment: usize, element_size: usize) -> usize {
    if alignment == 0 {
        return 0;
    }
    assert_ne!(element_size, 0, "zero-sized elements cannot be aligned");
    alignment.div_ceil(element_size)
}

/// Returns how many elements of `to_size` bytes fit into `len` elements of
/// `from_size` bytes. A partial trailing element is discarded.
///
/// # Examples
///
/// ```
/// use nativemem_align::cast_len;
///
/// assert_eq!(cast_len(10, 4, 1), 40);
/// assert_eq!(cast_len(10, 4, 8), 5);
/// assert_eq!(cast_len(3, 4, 8), 1);
/// assert_eq!(cast_len(1, 1, 4), 0);
/// ```
///
/// # Panics
///
/// Panics if `to_size` is 0.
#[inline]
pub fn cast_len(len: usize, from_size: usize, to_size: usize) -> usize {
    assert_ne!(to_size, 0, "cannot cast to a zero-sized element type");
    if from_size == to_size {
        return len;
    }
    // The byte range of a live window always fits in `isize`, so this only
    // overflows for windows that could not exist.
    (len * from_size) / to_size
}

/// Typed variant of [`cast_len`].
#[inline]
pub fn cast_len_of<T, U>(len: usize) -> usize {
    cast_len(len, std::mem::size_of::<T>(), std::mem::size_of::<U>())
}

/// Returns `len * element_size`, or `None` if the byte count overflows `isize`
/// (the largest size any Rust allocation may have).
#[inline]
pub fn checked_byte_len(len: usize, element_size: usize) -> Option<usize> {
    len.checked_mul(element_size)
        .filter(|&bytes| bytes <= isize::MAX as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padding_elements_covers_alignment() {
        // 64-byte alignment of 4-byte elements needs up to 15 extra slots.
        assert!(padding_elements(64, 4) >= 15);
        assert_eq!(padding_elements(4, 4), 1);
        assert_eq!(padding_elements(16, 12), 2);
    }

    #[test]
    #[should_panic(expected = "zero-sized")]
    fn test_padding_elements_zero_size() {
        padding_elements(16, 0);
    }

    #[test]
    fn test_cast_len_identity() {
        assert_eq!(cast_len(7, 8, 8), 7);
        assert_eq!(cast_len_of::<u32, f32>(11), 11);
    }

    #[test]
    fn test_cast_len_rounds_down() {
        assert_eq!(cast_len_of::<u8, u32>(7), 1);
        assert_eq!(cast_len_of::<u16, u64>(5), 1);
        assert_eq!(cast_len_of::<[u8; 3], u16>(3), 4);
    }

    #[test]
    #[should_panic(expected = "zero-sized")]
    fn test_cast_len_to_zst() {
        cast_len_of::<u32, ()>(4);
    }

    #[test]
    fn test_checked_byte_len() {
        assert_eq!(checked_byte_len(10, 4), Some(40));
        assert_eq!(checked_byte_len(0, 4), Some(0));
        assert_eq!(checked_byte_len(usize::MAX, 2), None);
        assert_eq!(checked_byte_len(isize::MAX as usize, 2), None);
    }

    #[test]
    fn test_is_valid_alignment() {
        assert!(!is_valid_alignment(0));
        assert!(is_valid_alignment(1));
        assert!(is_valid_alignment(64));
        assert!(!is_valid_alignment(48));
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn align_up_is_smallest_aligned_upper_bound(
                n in 0usize..1 << 40,
                shift in 0u32..16,
            ) {
                let alignment = 1usize << shift;
                let up = align_up(n, alignment);
                prop_assert!(is_aligned(up, alignment));
                prop_assert!(up >= n);
                prop_assert!(up - n < alignment);
                prop_assert!(align_down(n, alignment) <= n);
            }

            #[test]
            fn cast_back_never_exceeds_original(
                len in 0usize..1 << 20,
                from in 1usize..64,
                to in 1usize..64,
            ) {
                let cast = cast_len(len, from, to);
                prop_assert!(cast * to <= len * from);
                prop_assert!((cast + 1) * to > len * from);
                prop_assert!(cast_len(cast, to, from) <= len);
            }

            #[test]
            fn padding_reaches_an_aligned_slot(
                shift in 0u32..12,
                element_shift in 0u32..4,
                base_slot in 0usize..4096,
            ) {
                let alignment = 1usize << shift;
                let element_size = 1usize << element_shift;
                let base = base_slot * element_size;
                let extra = padding_elements(alignment, element_size);
                let aligned = align_up(base, alignment);
                prop_assert!(aligned - base <= extra * element_size);
            }
        }
    }
}
