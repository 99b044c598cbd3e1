//! DynArray: growable contiguous storage for `Copy` elements.
//!
//! Slots `[0, len)` are live, `[len, capacity)` are scratch. Growth rounds
//! the required length up to the next power of two; explicit `reserve`
//! allocates exactly what is asked. A failed allocation leaves the array as
//! it was and reports `OutOfMemory`.

use crate::alloc::{Global, RawAllocator};
use crate::cursor::{Cursor, Traverse};
use crate::error::{Result, StashError};
use core::alloc::Layout;
use core::fmt;
use core::marker::PhantomData;
use core::ops::{Index, IndexMut};
use core::ptr::{self, NonNull};
use tracing::{debug, trace};

pub struct DynArray<T, A: RawAllocator = Global> {
    // Dangling iff `cap == 0`.
    ptr: NonNull<T>,
    len: usize,
    cap: usize,
    alloc: A,
    _owns: PhantomData<T>,
}

unsafe impl<T: Send, A: RawAllocator + Send> Send for DynArray<T, A> {}
unsafe impl<T: Sync, A: RawAllocator + Sync> Sync for DynArray<T, A> {}

impl<T: Copy> DynArray<T> {
    pub fn new() -> Self {
        Self::new_in(Global)
    }

    /// Allocates room for `capacity` elements. Zero capacity, or a failed
    /// allocation, yields an empty record for which `is_valid()` is false.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }
}

impl<T: Copy> Default for DynArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A: RawAllocator> DynArray<T, A> {
    fn layout(capacity: usize) -> Result<Layout> {
        Layout::array::<T>(capacity).map_err(|_| StashError::OutOfMemory)
    }

    /// Replaces the buffer with one of exactly `new_cap` slots, keeping the
    /// first `len` elements.
    fn reallocate(&mut self, new_cap: usize) -> Result<()> {
        debug_assert!(new_cap > 0 && new_cap >= self.len);
        let new_layout = Self::layout(new_cap)?;
        let raw = if self.cap == 0 {
            self.alloc.allocate(new_layout)
        } else {
            let old_layout = Self::layout(self.cap)?;
            // SAFETY: `ptr` came from this allocator with `old_layout`.
            unsafe {
                self.alloc
                    .reallocate(self.ptr.cast(), old_layout, new_layout)
            }
        };
        match raw {
            Some(p) => {
                trace!(from = self.cap, to = new_cap, "dyn array reallocated");
                self.ptr = p.cast();
                self.cap = new_cap;
                Ok(())
            }
            None => {
                debug!(capacity = self.cap, requested = new_cap, "dyn array allocation failed");
                Err(StashError::OutOfMemory)
            }
        }
    }

    fn release(&mut self) {
        if self.cap > 0 {
            if let Ok(layout) = Self::layout(self.cap) {
                // SAFETY: the buffer is live and was allocated with `layout`.
                unsafe { self.alloc.deallocate(self.ptr.cast(), layout) };
            }
        }
        self.ptr = NonNull::dangling();
        self.cap = 0;
        self.len = 0;
    }

    /// Pointer to slot `i`; `i` must be at most `cap`.
    #[inline]
    fn slot(&self, i: usize) -> *mut T {
        debug_assert!(i <= self.cap);
        // SAFETY: in bounds of the allocation (or zero offset on dangling).
        unsafe { self.ptr.as_ptr().add(i) }
    }
}

impl<T: Copy, A: RawAllocator> DynArray<T, A> {
    const ELEM_SIZE: usize = {
        assert!(
            core::mem::size_of::<T>() > 0,
            "zero-sized element types are not supported"
        );
        core::mem::size_of::<T>()
    };

    pub fn new_in(alloc: A) -> Self {
        let _ = Self::ELEM_SIZE;
        Self {
            ptr: NonNull::dangling(),
            len: 0,
            cap: 0,
            alloc,
            _owns: PhantomData,
        }
    }

    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        let mut array = Self::new_in(alloc);
        if capacity > 0 {
            let _ = array.reallocate(capacity);
        }
        array
    }

    /// Byte width of one element.
    pub fn elem_size(&self) -> usize {
        Self::ELEM_SIZE
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn capacity(&self) -> usize {
        self.cap
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once storage is allocated.
    pub fn is_valid(&self) -> bool {
        self.cap > 0
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    /// Releases the buffer. The record stays usable and grows again on demand.
    pub fn destroy(&mut self) {
        self.release();
    }

    fn grow_for(&mut self, required: usize) -> Result<()> {
        if required <= self.cap {
            return Ok(());
        }
        let target = required
            .checked_next_power_of_two()
            .ok_or(StashError::OutOfMemory)?;
        self.reallocate(target)
    }

    /// Ensures room for at least `capacity` elements. Never shrinks.
    pub fn reserve(&mut self, capacity: usize) -> Result<()> {
        if self.cap >= capacity {
            return Ok(());
        }
        self.reallocate(capacity)
    }

    /// Reallocates to exactly `len` slots. `Empty` when already tight or
    /// when there is nothing to keep.
    pub fn shrink_to_fit(&mut self) -> Result<()> {
        if self.len == self.cap || self.len == 0 {
            return Err(StashError::Empty);
        }
        self.reallocate(self.len)
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Truncates to `len`, or grows to `len` writing `value` into new slots.
    pub fn resize(&mut self, len: usize, value: T) -> Result<()> {
        if len <= self.len {
            self.len = len;
            return Ok(());
        }
        self.reserve(len)?;
        for i in self.len..len {
            // SAFETY: `i < cap` after the reserve.
            unsafe { self.slot(i).write(value) };
        }
        self.len = len;
        Ok(())
    }

    pub fn resize_default(&mut self, len: usize) -> Result<()>
    where
        T: Default,
    {
        self.resize(len, T::default())
    }

    /// Writes `value` into every slot up to capacity; `len` becomes `capacity`.
    pub fn fill(&mut self, value: T) {
        for i in 0..self.cap {
            // SAFETY: `i < cap`.
            unsafe { self.slot(i).write(value) };
        }
        self.len = self.cap;
    }

    fn insert_one(&mut self, index: usize, value: T) -> Result<()> {
        debug_assert!(index <= self.len);
        self.grow_for(self.len + 1)?;
        // SAFETY: `len + 1 <= cap`; source and destination stay in bounds.
        unsafe {
            ptr::copy(self.slot(index), self.slot(index + 1), self.len - index);
            self.slot(index).write(value);
        }
        self.len += 1;
        Ok(())
    }

    pub fn push_back(&mut self, value: T) -> Result<()> {
        self.insert_one(self.len, value)
    }

    pub fn push_back_default(&mut self) -> Result<()>
    where
        T: Default,
    {
        self.push_back(T::default())
    }

    /// O(len): shifts every element right by one.
    pub fn push_front(&mut self, value: T) -> Result<()> {
        self.insert_one(0, value)
    }

    pub fn push_front_default(&mut self) -> Result<()>
    where
        T: Default,
    {
        self.push_front(T::default())
    }

    /// Inserts before the element at `index`. Requires `index < len`; use
    /// `push_back` to append.
    pub fn push_at(&mut self, index: usize, value: T) -> Result<()> {
        if index >= self.len {
            return Err(StashError::OutOfBounds);
        }
        self.insert_one(index, value)
    }

    pub fn push_at_default(&mut self, index: usize) -> Result<()>
    where
        T: Default,
    {
        self.push_at(index, T::default())
    }

    /// Inserts `values` at `index`, shifting the tail right. `index == len`
    /// appends.
    pub fn insert(&mut self, index: usize, values: &[T]) -> Result<()> {
        if index > self.len {
            return Err(StashError::OutOfBounds);
        }
        let n = values.len();
        if n == 0 {
            return Ok(());
        }
        let required = self.len.checked_add(n).ok_or(StashError::OutOfMemory)?;
        self.grow_for(required)?;
        // SAFETY: `len + n <= cap`; `values` cannot alias `self`.
        unsafe {
            ptr::copy(self.slot(index), self.slot(index + n), self.len - index);
            ptr::copy_nonoverlapping(values.as_ptr(), self.slot(index), n);
        }
        self.len += n;
        Ok(())
    }

    pub fn pop_back(&mut self) -> Result<T> {
        if self.len == 0 {
            return Err(StashError::Empty);
        }
        self.len -= 1;
        // SAFETY: slot `len` was live.
        Ok(unsafe { *self.slot(self.len) })
    }

    pub fn pop_front(&mut self) -> Result<T> {
        if self.len == 0 {
            return Err(StashError::Empty);
        }
        self.pop_at(0)
    }

    pub fn pop_at(&mut self, index: usize) -> Result<T> {
        if index >= self.len {
            return Err(StashError::OutOfBounds);
        }
        // SAFETY: `index < len`; the shifted range stays within `[0, len)`.
        let value = unsafe {
            let value = *self.slot(index);
            ptr::copy(self.slot(index + 1), self.slot(index), self.len - index - 1);
            value
        };
        self.len -= 1;
        Ok(value)
    }

    /// Tight copy: `len == capacity == self.len()`.
    pub fn copy(&self) -> Result<Self>
    where
        A: Clone,
    {
        let mut out = Self::new_in(self.alloc.clone());
        if self.len == 0 {
            return Ok(out);
        }
        out.reallocate(self.len)?;
        // SAFETY: both buffers hold at least `len` slots and are distinct.
        unsafe { ptr::copy_nonoverlapping(self.slot(0), out.slot(0), self.len) };
        out.len = self.len;
        Ok(out)
    }

    /// Same length and equal elements.
    pub fn compare<B: RawAllocator>(&self, other: &DynArray<T, B>) -> bool
    where
        T: PartialEq,
    {
        self.as_slice() == other.as_slice()
    }

    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `[0, len)` is initialized; `ptr` is non-null and aligned.
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        // SAFETY: as above, and `&mut self` guarantees exclusivity.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.as_slice().get(index)
    }

    /// Alias of [`get`](Self::get).
    pub fn at(&self, index: usize) -> Option<&T> {
        self.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.as_mut_slice().get_mut(index)
    }

    pub fn front(&self) -> Option<&T> {
        self.as_slice().first()
    }

    pub fn back(&self) -> Option<&T> {
        self.as_slice().last()
    }

    pub fn iter(&self) -> core::slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    pub fn iter_mut(&mut self) -> core::slice::IterMut<'_, T> {
        self.as_mut_slice().iter_mut()
    }

    pub fn begin(&self) -> Cursor<'_, Self> {
        Cursor::begin(self)
    }

    pub fn end(&self) -> Cursor<'_, Self> {
        Cursor::end(self)
    }
}

impl<T, A: RawAllocator> Drop for DynArray<T, A> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: Copy, A: RawAllocator> Traverse for DynArray<T, A> {
    type Key = usize;
    type Item = T;

    fn first(&self) -> Option<usize> {
        (self.len > 0).then_some(0)
    }

    fn last(&self) -> Option<usize> {
        self.len.checked_sub(1)
    }

    fn after(&self, pos: usize) -> Option<usize> {
        let next = pos + 1;
        (next < self.len).then_some(next)
    }

    fn before(&self, pos: usize) -> Option<usize> {
        pos.checked_sub(1).filter(|&p| p < self.len)
    }

    fn key_at(&self, pos: usize) -> Option<usize> {
        (pos < self.len).then_some(pos)
    }

    fn item_at(&self, pos: usize) -> Option<&T> {
        self.get(pos)
    }
}

impl<T: Copy, A: RawAllocator> Index<usize> for DynArray<T, A> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.as_slice()[index]
    }
}

impl<T: Copy, A: RawAllocator> IndexMut<usize> for DynArray<T, A> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.as_mut_slice()[index]
    }
}

impl<T, A, B> PartialEq<DynArray<T, B>> for DynArray<T, A>
where
    T: Copy + PartialEq,
    A: RawAllocator,
    B: RawAllocator,
{
    fn eq(&self, other: &DynArray<T, B>) -> bool {
        self.compare(other)
    }
}

impl<T: Copy + Eq, A: RawAllocator> Eq for DynArray<T, A> {}

impl<T: Copy + fmt::Debug, A: RawAllocator> fmt::Debug for DynArray<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<'a, T: Copy, A: RawAllocator> IntoIterator for &'a DynArray<T, A> {
    type Item = &'a T;
    type IntoIter = core::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, T: Copy, A: RawAllocator> IntoIterator for &'a mut DynArray<T, A> {
    type Item = &'a mut T;
    type IntoIter = core::slice::IterMut<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
