//! Allocator hooks.
//!
//! Containers never touch the global heap directly; every buffer goes
//! through a `RawAllocator`. The default is [`Global`]. [`Bounded`] caps the
//! number of live bytes, which makes allocation failure observable (and
//! testable) without exhausting the process.

use core::alloc::Layout;
use core::cell::Cell;
use core::ptr::NonNull;
use std::rc::Rc;

/// Byte-level allocation hooks: allocate, reallocate, deallocate.
///
/// # Safety
///
/// Implementors must return blocks that are valid for reads and writes of
/// `layout.size()` bytes and aligned to `layout.align()`, and must keep a
/// block valid until it is passed to `deallocate` or `reallocate`.
/// Returning `None` signals failure and must leave any input block intact.
pub unsafe trait RawAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Resizes `ptr` from `old` to `new`. Both layouts share one alignment.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator with layout `old`.
    unsafe fn reallocate(&self, ptr: NonNull<u8>, old: Layout, new: Layout)
        -> Option<NonNull<u8>>;

    /// # Safety
    ///
    /// `ptr` must have been returned by this allocator with `layout`.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The process-wide allocator (`std::alloc`).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Global;

unsafe impl RawAllocator for Global {
    #[inline]
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        debug_assert!(layout.size() > 0);
        NonNull::new(unsafe { std::alloc::alloc(layout) })
    }

    #[inline]
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old: Layout,
        new: Layout,
    ) -> Option<NonNull<u8>> {
        debug_assert_eq!(old.align(), new.align());
        NonNull::new(std::alloc::realloc(ptr.as_ptr(), old, new.size()))
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        std::alloc::dealloc(ptr.as_ptr(), layout)
    }
}

#[derive(Debug)]
struct Budget {
    limit: Cell<usize>,
    in_use: Cell<usize>,
}

/// Allocator wrapper that refuses to hold more than `limit` bytes at once.
///
/// Clones share one budget, so several containers can draw from the same
/// pool. Single-threaded (`!Send`), like the containers themselves.
#[derive(Clone, Debug)]
pub struct Bounded<A = Global> {
    inner: A,
    budget: Rc<Budget>,
}

impl Bounded<Global> {
    pub fn new(limit: usize) -> Self {
        Self::with_inner(Global, limit)
    }
}

impl<A> Bounded<A> {
    pub fn with_inner(inner: A, limit: usize) -> Self {
        Self {
            inner,
            budget: Rc::new(Budget {
                limit: Cell::new(limit),
                in_use: Cell::new(0),
            }),
        }
    }

    /// Bytes currently handed out.
    pub fn in_use(&self) -> usize {
        self.budget.in_use.get()
    }

    pub fn limit(&self) -> usize {
        self.budget.limit.get()
    }

    /// Changes the cap; blocks already handed out are unaffected.
    pub fn set_limit(&self, limit: usize) {
        self.budget.limit.set(limit);
    }

    fn admits(&self, released: usize, requested: usize) -> bool {
        let after = self.in_use() - released;
        after
            .checked_add(requested)
            .map_or(false, |total| total <= self.limit())
    }
}

unsafe impl<A: RawAllocator> RawAllocator for Bounded<A> {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if !self.admits(0, layout.size()) {
            return None;
        }
        let ptr = self.inner.allocate(layout)?;
        self.budget.in_use.set(self.in_use() + layout.size());
        Some(ptr)
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old: Layout,
        new: Layout,
    ) -> Option<NonNull<u8>> {
        if !self.admits(old.size(), new.size()) {
            return None;
        }
        let ptr = self.inner.reallocate(ptr, old, new)?;
        self.budget
            .in_use
            .set(self.in_use() - old.size() + new.size());
        Some(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        self.inner.deallocate(ptr, layout);
        self.budget.in_use.set(self.in_use() - layout.size());
    }
}
