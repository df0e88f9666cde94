//! `WindowOwner`: a trait for types that expose their memory as a [`Window`].

use crate::window::Window;

/// A type that holds (or borrows) a block of memory and exposes it as a
/// [`Window`].
///
/// Implemented by every allocation strategy in this crate, so code that only
/// consumes memory can be written once regardless of where the memory came
/// from.
///
/// The returned window stays valid for as long as the owner is alive and
/// never changes address or length. Handing the window to other code does not
/// hand over the responsibility to free it.
pub trait WindowOwner<T> {
    /// Returns the window over the owned memory.
    fn window(&self) -> Window<T>;

    /// Number of elements in the window.
    fn window_len(&self) -> usize {
        self.window().len()
    }

    /// Returns `true` if the window starts at a multiple of `alignment`.
    fn is_aligned_to(&self, alignment: usize) -> bool {
        self.window().is_aligned_to(alignment)
    }
}
