//! SlotRegistry: stable `u32` ids over contiguous storage.
//!
//! Id `n` lives in slot `n - 1`; `0` is never issued. A per-slot validity
//! flag is the only authority on liveness: retiring an id flips the flag and
//! pushes the id onto a LIFO stack, leaving the slot bytes alone. The next
//! `push` reissues the most recently retired id before minting a new one.

use crate::alloc::{Global, RawAllocator};
use crate::cursor::{Cursor, Traverse};
use crate::dyn_array::DynArray;
use crate::error::{Result, StashError};
use core::fmt;
use core::iter::{Enumerate, FusedIterator, Zip};
use tracing::{debug, trace};

/// The reserved id; never handed out by [`SlotRegistry::push`].
pub const NULL_ID: u32 = 0;

pub struct SlotRegistry<T, A: RawAllocator + Clone = Global> {
    elements: DynArray<T, A>,
    valid: DynArray<bool, A>,
    // Capacity is kept >= elements.len(), so retiring never allocates.
    free_ids: DynArray<u32, A>,
    next_id: u32,
    live: usize,
}

impl<T: Copy> SlotRegistry<T> {
    pub fn new() -> Self {
        Self::new_in(Global)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_in(capacity, Global)
    }
}

impl<T: Copy> Default for SlotRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy, A: RawAllocator + Clone> SlotRegistry<T, A> {
    pub fn new_in(alloc: A) -> Self {
        Self::with_capacity_in(0, alloc)
    }

    /// Pre-sizes all three backing arrays. Zero capacity is allowed; the
    /// registry is then invalid until the first `push`.
    pub fn with_capacity_in(capacity: usize, alloc: A) -> Self {
        Self {
            elements: DynArray::with_capacity_in(capacity, alloc.clone()),
            valid: DynArray::with_capacity_in(capacity, alloc.clone()),
            free_ids: DynArray::with_capacity_in(capacity, alloc),
            next_id: 1,
            live: 0,
        }
    }

    /// True when all backing storage is allocated.
    pub fn is_valid(&self) -> bool {
        self.elements.is_valid() && self.valid.is_valid() && self.free_ids.is_valid()
    }

    /// Number of live ids.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Slots ever allocated, live or retired.
    pub fn alloc_count(&self) -> u32 {
        self.elements.len() as u32
    }

    /// The id the next fresh slot would receive.
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    pub fn exists(&self, id: u32) -> bool {
        id != NULL_ID
            && id < self.next_id
            && self.valid.get(id as usize - 1).copied().unwrap_or(false)
    }

    /// Stores `value` and returns its id, reusing the last retired id if any.
    pub fn push(&mut self, value: T) -> Result<u32> {
        if let Ok(id) = self.free_ids.pop_back() {
            trace!(id, "reissuing retired id");
            let slot = id as usize - 1;
            self.elements[slot] = value;
            self.valid[slot] = true;
            self.live += 1;
            return Ok(id);
        }

        if self.next_id == u32::MAX {
            return Err(StashError::OutOfMemory);
        }
        self.elements.push_back(value)?;
        if let Err(e) = self.valid.push_back(true) {
            let _ = self.elements.pop_back();
            return Err(e);
        }
        if let Err(e) = self.free_ids.reserve(self.elements.capacity()) {
            let _ = self.elements.pop_back();
            let _ = self.valid.pop_back();
            return Err(e);
        }
        let id = self.next_id;
        self.next_id += 1;
        self.live += 1;
        Ok(id)
    }

    pub fn push_default(&mut self) -> Result<u32>
    where
        T: Default,
    {
        self.push(T::default())
    }

    /// Retires `id` and returns a copy of its element. `None` if `id` is not live.
    pub fn pop(&mut self, id: u32) -> Option<T> {
        if !self.exists(id) {
            return None;
        }
        let slot = id as usize - 1;
        // Cannot grow: capacity covers every allocated slot.
        debug_assert!(self.free_ids.capacity() > self.free_ids.len());
        if let Err(e) = self.free_ids.push_back(id) {
            debug!(id, error = %e, "retired-id stack could not take id");
            return None;
        }
        self.valid[slot] = false;
        self.live -= 1;
        Some(self.elements[slot])
    }

    pub fn get(&self, id: u32) -> Option<&T> {
        if !self.exists(id) {
            return None;
        }
        self.elements.get(id as usize - 1)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut T> {
        if !self.exists(id) {
            return None;
        }
        self.elements.get_mut(id as usize - 1)
    }

    /// Releases all storage and forgets every id.
    pub fn destroy(&mut self) {
        self.elements.destroy();
        self.valid.destroy();
        self.free_ids.destroy();
        self.next_id = 1;
        self.live = 0;
    }

    /// Live `(id, element)` pairs in ascending id order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            slots: self.elements.iter().zip(self.valid.iter()).enumerate(),
            remaining: self.live,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            remaining: self.live,
            slots: self.elements.iter_mut().zip(self.valid.iter()).enumerate(),
        }
    }

    pub fn ids(&self) -> impl DoubleEndedIterator<Item = u32> + '_ {
        self.iter().map(|(id, _)| id)
    }

    pub fn begin(&self) -> Cursor<'_, Self> {
        Cursor::begin(self)
    }

    pub fn end(&self) -> Cursor<'_, Self> {
        Cursor::end(self)
    }

    #[cfg(test)]
    pub(crate) fn free_ids(&self) -> &[u32] {
        self.free_ids.as_slice()
    }

    #[cfg(test)]
    pub(crate) fn flags(&self) -> &[bool] {
        self.valid.as_slice()
    }
}

impl<T: Copy, A: RawAllocator + Clone> Traverse for SlotRegistry<T, A> {
    type Key = u32;
    type Item = T;

    fn first(&self) -> Option<usize> {
        self.valid.iter().position(|&v| v).map(|slot| slot + 1)
    }

    fn last(&self) -> Option<usize> {
        self.valid.iter().rposition(|&v| v).map(|slot| slot + 1)
    }

    fn after(&self, id: usize) -> Option<usize> {
        let flags = self.valid.as_slice();
        (id..flags.len()).find(|&slot| flags[slot]).map(|slot| slot + 1)
    }

    fn before(&self, id: usize) -> Option<usize> {
        let flags = self.valid.as_slice();
        let end = id.saturating_sub(1).min(flags.len());
        (0..end).rev().find(|&slot| flags[slot]).map(|slot| slot + 1)
    }

    fn key_at(&self, id: usize) -> Option<u32> {
        let id = u32::try_from(id).ok()?;
        self.exists(id).then_some(id)
    }

    fn item_at(&self, id: usize) -> Option<&T> {
        self.get(u32::try_from(id).ok()?)
    }
}

impl<T: Copy + fmt::Debug, A: RawAllocator + Clone> fmt::Debug for SlotRegistry<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

type Slots<'a, T> = Enumerate<Zip<core::slice::Iter<'a, T>, core::slice::Iter<'a, bool>>>;
type SlotsMut<'a, T> = Enumerate<Zip<core::slice::IterMut<'a, T>, core::slice::Iter<'a, bool>>>;

/// Live entries in ascending id order.
pub struct Iter<'a, T> {
    slots: Slots<'a, T>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = (u32, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        for (slot, (value, &live)) in self.slots.by_ref() {
            if live {
                self.remaining -= 1;
                return Some((slot as u32 + 1, value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for Iter<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        while let Some((slot, (value, &live))) = self.slots.next_back() {
            if live {
                self.remaining -= 1;
                return Some((slot as u32 + 1, value));
            }
        }
        None
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}
impl<'a, T> FusedIterator for Iter<'a, T> {}

/// Live entries in ascending id order, elements mutable.
pub struct IterMut<'a, T> {
    slots: SlotsMut<'a, T>,
    remaining: usize,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = (u32, &'a mut T);

    fn next(&mut self) -> Option<Self::Item> {
        for (slot, (value, &live)) in self.slots.by_ref() {
            if live {
                self.remaining -= 1;
                return Some((slot as u32 + 1, value));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> DoubleEndedIterator for IterMut<'a, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        while let Some((slot, (value, &live))) = self.slots.next_back() {
            if live {
                self.remaining -= 1;
                return Some((slot as u32 + 1, value));
            }
        }
        None
    }
}

impl<'a, T> ExactSizeIterator for IterMut<'a, T> {}
impl<'a, T> FusedIterator for IterMut<'a, T> {}

impl<'a, T: Copy, A: RawAllocator + Clone> IntoIterator for &'a SlotRegistry<T, A> {
    type Item = (u32, &'a T);
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alloc::Bounded;

    /// Invariant: ids start at 1 and retired ids are reissued LIFO.
    #[test]
    fn ids_are_reused_lifo() {
        let mut r: SlotRegistry<u32> = SlotRegistry::new();
        let a = r.push(10).unwrap();
        let b = r.push(20).unwrap();
        let c = r.push(30).unwrap();
        assert_eq!((a, b, c), (1, 2, 3));
        assert_eq!(r.pop(a), Some(10));
        assert_eq!(r.pop(c), Some(30));
        assert_eq!(r.push(40).unwrap(), c);
        assert_eq!(r.push(50).unwrap(), a);
        assert_eq!(r.push(60).unwrap(), 4);
        assert_eq!(r.alloc_count(), 4);
        assert_eq!(r.len(), 4);
    }

    /// Invariant: popping a retired, null or never-issued id fails without side effects.
    #[test]
    fn pop_rejects_dead_ids() {
        let mut r: SlotRegistry<i8> = SlotRegistry::with_capacity(4);
        let a = r.push(1).unwrap();
        assert_eq!(r.pop(NULL_ID), None);
        assert_eq!(r.pop(a + 1), None);
        assert_eq!(r.pop(a), Some(1));
        assert_eq!(r.pop(a), None, "double pop");
        assert_eq!(r.free_ids(), &[a]);
        assert!(!r.exists(a));
        assert_eq!(r.get(a), None);
    }

    /// Invariant: retiring ids never allocates, so it succeeds even with the
    /// allocator's budget fully spent.
    #[test]
    fn retiring_needs_no_allocation() {
        let alloc = Bounded::new(usize::MAX);
        let mut r: SlotRegistry<u32, _> = SlotRegistry::new_in(alloc.clone());
        let ids: Vec<u32> = (0..13).map(|v| r.push(v).unwrap()).collect();
        alloc.set_limit(alloc.in_use());

        for (v, &id) in ids.iter().enumerate().rev() {
            assert_eq!(r.pop(id), Some(v as u32));
        }
        assert!(r.is_empty());
        assert_eq!(r.free_ids().len(), ids.len());
        assert_eq!(r.push(99), Ok(ids[0]));
    }

    /// Invariant: a live id keeps addressing the same element across unrelated churn.
    #[test]
    fn handles_are_stable() {
        let mut r: SlotRegistry<u64> = SlotRegistry::new();
        let keep = r.push(7).unwrap();
        for i in 0..50 {
            let t = r.push(i).unwrap();
            assert_ne!(t, keep);
            assert_eq!(r.pop(t), Some(i));
        }
        assert_eq!(r.get(keep), Some(&7));
        *r.get_mut(keep).unwrap() = 8;
        assert_eq!(r.get(keep), Some(&8));
    }

    /// Invariant: iteration skips retired slots in both directions.
    #[test]
    fn iteration_skips_holes() {
        let mut r: SlotRegistry<char> = SlotRegistry::new();
        for ch in ['a', 'b', 'c', 'd', 'e'] {
            r.push(ch).unwrap();
        }
        r.pop(2);
        r.pop(4);
        let fwd: Vec<_> = r.iter().map(|(id, v)| (id, *v)).collect();
        assert_eq!(fwd, vec![(1, 'a'), (3, 'c'), (5, 'e')]);
        let back: Vec<u32> = r.ids().rev().collect();
        assert_eq!(back, vec![5, 3, 1]);
        assert_eq!(r.iter().len(), 3);

        for (_, v) in r.iter_mut() {
            *v = v.to_ascii_uppercase();
        }
        assert_eq!(r.get(3), Some(&'C'));
    }

    /// Invariant: the cursor carries the id and jumps over retired slots.
    #[test]
    fn cursor_jumps_holes() {
        let mut r: SlotRegistry<i32> = SlotRegistry::new();
        for v in [10, 20, 30, 40] {
            r.push(v).unwrap();
        }
        r.pop(1);
        r.pop(3);
        let mut c = r.begin();
        assert_eq!(c.key(), Some(2));
        assert_eq!(c.peek_prev(), None);
        assert_eq!(c.peek_next(), Some(&40));
        c.move_next();
        assert_eq!(c, r.end());
        assert_eq!(c.peek_prev(), Some(&20));
        c.move_prev();
        c.move_prev();
        assert!(c.is_before_begin());
        assert_eq!(c.peek_next(), Some(&20));
    }

    /// Invariant: allocation failure during `push` leaves the registry unchanged.
    #[test]
    fn push_failure_rolls_back() {
        let alloc = Bounded::new(0);
        let mut r: SlotRegistry<u64, _> = SlotRegistry::new_in(alloc.clone());
        assert_eq!(r.push(1), Err(StashError::OutOfMemory));
        assert_eq!(r.alloc_count(), 0);
        assert_eq!(r.next_id(), 1);

        // Room for the element and flag arrays but not the free-id stack.
        alloc.set_limit(core::mem::size_of::<u64>() + core::mem::size_of::<bool>());
        assert_eq!(r.push(1), Err(StashError::OutOfMemory));
        assert_eq!(r.alloc_count(), 0);
        assert_eq!(r.flags().len(), 0);
        assert!(r.is_empty());

        alloc.set_limit(usize::MAX);
        assert_eq!(r.push(1), Ok(1));
        assert!(r.is_valid());
    }

    /// Invariant: `destroy` frees everything and the registry restarts at id 1.
    #[test]
    fn destroy_resets() {
        let alloc = Bounded::new(4096);
        let mut r: SlotRegistry<u16, _> = SlotRegistry::with_capacity_in(8, alloc.clone());
        assert!(r.is_valid());
        r.push(1).unwrap();
        r.destroy();
        assert_eq!(alloc.in_use(), 0);
        assert!(!r.is_valid());
        assert!(!r.exists(1));
        assert_eq!(r.push(2), Ok(1));
    }
}
