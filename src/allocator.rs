//! Raw allocator interface used for all bucket and entry storage.
//!
//! Four operations, mirroring the classic malloc/calloc/realloc/free set.
//! A `None` return is an allocation failure; the table turns it into
//! `TableError::AllocFailed` and leaves its observable state untouched.

use core::alloc::Layout;
use core::ptr::NonNull;

/// Allocator backing a [`Table`](crate::Table).
///
/// # Safety
///
/// Implementations must return blocks that satisfy the requested layout
/// and must accept back, in `reallocate`/`deallocate`, any block they
/// handed out together with the layout it was requested with. Callers
/// never request zero-sized layouts.
pub unsafe trait RawAlloc {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Like `allocate`, but the returned block is filled with zero bytes.
    fn allocate_zeroed(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Resize `ptr` from `old` to `new_size` bytes, keeping the alignment.
    /// On failure the original block is left allocated and unchanged.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator with layout `old`.
    unsafe fn reallocate(&self, ptr: NonNull<u8>, old: Layout, new_size: usize)
        -> Option<NonNull<u8>>;

    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator with `layout` and
    /// must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The platform allocator (`std::alloc`).
#[derive(Copy, Clone, Debug, Default)]
pub struct Global;

unsafe impl RawAlloc for Global {
    #[inline]
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        debug_assert!(layout.size() != 0);
        NonNull::new(unsafe { std::alloc::alloc(layout) })
    }

    #[inline]
    fn allocate_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        debug_assert!(layout.size() != 0);
        NonNull::new(unsafe { std::alloc::alloc_zeroed(layout) })
    }

    #[inline]
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        NonNull::new(std::alloc::realloc(ptr.as_ptr(), old, new_size))
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        std::alloc::dealloc(ptr.as_ptr(), layout)
    }
}

unsafe impl<A: RawAlloc + ?Sized> RawAlloc for &A {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        (**self).allocate(layout)
    }
    fn allocate_zeroed(&self, layout: Layout) -> Option<NonNull<u8>> {
        (**self).allocate_zeroed(layout)
    }
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        (**self).reallocate(ptr, old, new_size)
    }
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        (**self).deallocate(ptr, layout)
    }
}
