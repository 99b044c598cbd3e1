//! IntMap: open-addressed hash table keyed by `u32`.
//!
//! Buckets live inline in one `DynArray`; a bucket is occupied iff it holds a
//! value. Collisions are resolved by linear probing from the home bucket
//! `hash_u32(key) & (bucket_count - 1)`. The bucket count is always a power
//! of two and doubles (with a full rehash) before the load factor would
//! exceed 7/10. Removal shifts the following cluster back, so every key stays
//! reachable from its home bucket without crossing a free bucket.

use crate::alloc::{Global, RawAllocator};
use crate::cursor::{Cursor, Traverse};
use crate::dyn_array::DynArray;
use crate::error::{Result, StashError};
use core::fmt;
use core::iter::FusedIterator;
use tracing::debug;

/// The murmur3 32-bit finalizer.
#[inline]
pub const fn hash_u32(mut key: u32) -> u32 {
    key ^= key >> 16;
    key = key.wrapping_mul(0x85eb_ca6b);
    key ^= key >> 13;
    key = key.wrapping_mul(0xc2b2_ae35);
    key ^= key >> 16;
    key
}

const MAX_LOAD_NUM: usize = 7;
const MAX_LOAD_DEN: usize = 10;

#[derive(Copy, Clone, Debug)]
struct Bucket<V> {
    key: u32,
    value: Option<V>,
}

impl<V> Bucket<V> {
    const FREE: Self = Bucket {
        key: 0,
        value: None,
    };

    #[inline]
    fn is_occupied(&self) -> bool {
        self.value.is_some()
    }
}

enum Probe {
    Found(usize),
    Vacant(usize),
    Full,
}

pub struct IntMap<V, A: RawAllocator + Clone = Global> {
    buckets: DynArray<Bucket<V>, A>,
    len: usize,
}

impl<V: Copy> IntMap<V> {
    pub fn new() -> Self {
        Self::new_in(Global)
    }

    /// `bucket_count` is rounded up to a power of two; zero picks
    /// [`DEFAULT_BUCKETS`](Self::DEFAULT_BUCKETS).
    pub fn with_capacity(bucket_count: usize) -> Self {
        Self::with_capacity_in(bucket_count, Global)
    }
}

impl<V: Copy> Default for IntMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V: Copy, A: RawAllocator + Clone> IntMap<V, A> {
    pub const DEFAULT_BUCKETS: usize = 16;

    pub fn new_in(alloc: A) -> Self {
        Self::with_capacity_in(0, alloc)
    }

    /// A failed allocation yields a map for which `is_valid()` is false; it
    /// rejects inserts with `OutOfMemory` and misses every lookup.
    pub fn with_capacity_in(bucket_count: usize, alloc: A) -> Self {
        let count = match bucket_count {
            0 => Self::DEFAULT_BUCKETS,
            n => n.checked_next_power_of_two().unwrap_or(0),
        };
        Self {
            buckets: Self::alloc_buckets(count, alloc.clone())
                .unwrap_or_else(|_| DynArray::new_in(alloc)),
            len: 0,
        }
    }

    fn alloc_buckets(count: usize, alloc: A) -> Result<DynArray<Bucket<V>, A>> {
        let mut buckets = DynArray::with_capacity_in(count, alloc);
        buckets.resize(count, Bucket::FREE)?;
        Ok(buckets)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    /// Alias of [`len`](Self::len).
    pub fn count(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_valid(&self) -> bool {
        self.buckets.is_valid() && !self.buckets.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn load_factor(&self) -> f64 {
        match self.bucket_count() {
            0 => 0.0,
            n => self.len as f64 / n as f64,
        }
    }

    #[inline]
    fn home(&self, key: u32) -> usize {
        hash_u32(key) as usize & (self.bucket_count() - 1)
    }

    fn probe(&self, key: u32) -> Probe {
        let n = self.bucket_count();
        if n == 0 {
            return Probe::Full;
        }
        let slots = self.buckets.as_slice();
        let mut i = self.home(key);
        for _ in 0..n {
            let b = &slots[i];
            if !b.is_occupied() {
                return Probe::Vacant(i);
            }
            if b.key == key {
                return Probe::Found(i);
            }
            i = (i + 1) & (n - 1);
        }
        Probe::Full
    }

    fn find(&self, key: u32) -> Option<usize> {
        match self.probe(key) {
            Probe::Found(i) => Some(i),
            _ => None,
        }
    }

    fn exceeds_load(entries: usize, bucket_count: usize) -> bool {
        // Widened so huge requests compare instead of overflowing.
        entries as u128 * MAX_LOAD_DEN as u128 > bucket_count as u128 * MAX_LOAD_NUM as u128
    }

    /// Moves every entry into a fresh table of `new_count` buckets.
    fn rehash(&mut self, new_count: usize) -> Result<()> {
        debug_assert!(new_count.is_power_of_two() && new_count > self.len);
        let mut fresh = Self::alloc_buckets(new_count, self.buckets.allocator().clone())?;
        let mask = new_count - 1;
        for b in self.buckets.iter().filter(|b| b.is_occupied()) {
            let mut i = hash_u32(b.key) as usize & mask;
            while fresh[i].is_occupied() {
                i = (i + 1) & mask;
            }
            fresh[i] = *b;
        }
        debug!(
            from = self.bucket_count(),
            to = new_count,
            entries = self.len,
            "int map rehashed"
        );
        self.buckets = fresh;
        Ok(())
    }

    /// Grows the table so `entries` fit under the load factor. Never shrinks.
    ///
    /// An invalid map stays invalid and reports `OutOfMemory`; a request
    /// too large to allocate reports `OutOfMemory` and leaves the map as is.
    pub fn reserve(&mut self, entries: usize) -> Result<()> {
        if !self.is_valid() {
            return Err(StashError::OutOfMemory);
        }
        let mut target = self.bucket_count();
        while Self::exceeds_load(entries, target) {
            target = target.checked_mul(2).ok_or(StashError::OutOfMemory)?;
        }
        if target == self.bucket_count() {
            return Ok(());
        }
        self.rehash(target)
    }

    /// Inserts a new key. `KeyExists` leaves the stored value untouched.
    pub fn insert(&mut self, key: u32, value: V) -> Result<()> {
        if !self.is_valid() {
            return Err(StashError::OutOfMemory);
        }
        if let Probe::Found(_) = self.probe(key) {
            return Err(StashError::KeyExists);
        }
        if Self::exceeds_load(self.len + 1, self.bucket_count()) {
            let doubled = self
                .bucket_count()
                .checked_mul(2)
                .ok_or(StashError::OutOfMemory)?;
            self.rehash(doubled)?;
        }
        match self.probe(key) {
            Probe::Vacant(i) => {
                self.buckets[i] = Bucket {
                    key,
                    value: Some(value),
                };
                self.len += 1;
                Ok(())
            }
            Probe::Found(_) => Err(StashError::KeyExists),
            Probe::Full => Err(StashError::OutOfMemory),
        }
    }

    /// Removes `key` and returns its value.
    pub fn remove(&mut self, key: u32) -> Result<V> {
        let mut hole = self.find(key).ok_or(StashError::KeyNotFound)?;
        let value = self.buckets[hole].value.take().ok_or(StashError::KeyNotFound)?;
        self.len -= 1;

        // Backward-shift the rest of the cluster into the hole.
        let mask = self.bucket_count() - 1;
        let mut j = hole;
        loop {
            j = (j + 1) & mask;
            let b = self.buckets[j];
            if !b.is_occupied() {
                break;
            }
            let home = self.home(b.key);
            let displacement = j.wrapping_sub(home) & mask;
            let gap = j.wrapping_sub(hole) & mask;
            if displacement >= gap {
                self.buckets[hole] = b;
                self.buckets[j] = Bucket::FREE;
                hole = j;
            }
        }
        Ok(value)
    }

    pub fn get(&self, key: u32) -> Result<&V> {
        self.find(key)
            .and_then(|i| self.buckets[i].value.as_ref())
            .ok_or(StashError::KeyNotFound)
    }

    pub fn get_mut(&mut self, key: u32) -> Option<&mut V> {
        let i = self.find(key)?;
        self.buckets[i].value.as_mut()
    }

    pub fn contains_key(&self, key: u32) -> bool {
        self.find(key).is_some()
    }

    /// Frees every entry; the bucket count is kept.
    pub fn clear(&mut self) {
        for b in self.buckets.iter_mut() {
            *b = Bucket::FREE;
        }
        self.len = 0;
    }

    /// Releases the bucket array. The map stays safe to call but is invalid.
    pub fn destroy(&mut self) {
        self.buckets.destroy();
        self.len = 0;
    }

    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            buckets: self.buckets.iter(),
            remaining: self.len,
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, V> {
        IterMut {
            remaining: self.len,
            buckets: self.buckets.iter_mut(),
        }
    }

    pub fn keys(&self) -> impl DoubleEndedIterator<Item = u32> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn begin(&self) -> Cursor<'_, Self> {
        Cursor::begin(self)
    }

    pub fn end(&self) -> Cursor<'_, Self> {
        Cursor::end(self)
    }

    #[cfg(test)]
    pub(crate) fn bucket_keys(&self) -> Vec<Option<u32>> {
        self.buckets
            .iter()
            .map(|b| b.is_occupied().then_some(b.key))
            .collect()
    }
}

impl<V: Copy, A: RawAllocator + Clone> Traverse for IntMap<V, A> {
    type Key = u32;
    type Item = V;

    fn first(&self) -> Option<usize> {
        self.buckets.iter().position(Bucket::is_occupied)
    }

    fn last(&self) -> Option<usize> {
        self.buckets.iter().rposition(Bucket::is_occupied)
    }

    fn after(&self, pos: usize) -> Option<usize> {
        let slots = self.buckets.as_slice();
        (pos + 1..slots.len()).find(|&i| slots[i].is_occupied())
    }

    fn before(&self, pos: usize) -> Option<usize> {
        let slots = self.buckets.as_slice();
        (0..pos.min(slots.len()))
            .rev()
            .find(|&i| slots[i].is_occupied())
    }

    fn key_at(&self, pos: usize) -> Option<u32> {
        self.buckets
            .get(pos)
            .filter(|b| b.is_occupied())
            .map(|b| b.key)
    }

    fn item_at(&self, pos: usize) -> Option<&V> {
        self.buckets.get(pos)?.value.as_ref()
    }
}

impl<V: Copy + fmt::Debug, A: RawAllocator + Clone> fmt::Debug for IntMap<V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Occupied entries in bucket order.
pub struct Iter<'a, V> {
    buckets: core::slice::Iter<'a, Bucket<V>>,
    remaining: usize,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (u32, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        for b in self.buckets.by_ref() {
            if let Some(v) = &b.value {
                self.remaining -= 1;
                return Some((b.key, v));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, V> DoubleEndedIterator for Iter<'a, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        while let Some(b) = self.buckets.next_back() {
            if let Some(v) = &b.value {
                self.remaining -= 1;
                return Some((b.key, v));
            }
        }
        None
    }
}

impl<'a, V> ExactSizeIterator for Iter<'a, V> {}
impl<'a, V> FusedIterator for Iter<'a, V> {}

/// Occupied entries in bucket order, values mutable.
pub struct IterMut<'a, V> {
    buckets: core::slice::IterMut<'a, Bucket<V>>,
    remaining: usize,
}

impl<'a, V> Iterator for IterMut<'a, V> {
    type Item = (u32, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        for b in self.buckets.by_ref() {
            if let Some(v) = &mut b.value {
                self.remaining -= 1;
                return Some((b.key, v));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, V> DoubleEndedIterator for IterMut<'a, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        while let Some(b) = self.buckets.next_back() {
            if let Some(v) = &mut b.value {
                self.remaining -= 1;
                return Some((b.key, v));
            }
        }
        None
    }
}

impl<'a, V> ExactSizeIterator for IterMut<'a, V> {}
impl<'a, V> FusedIterator for IterMut<'a, V> {}

impl<'a, V: Copy, A: RawAllocator + Clone> IntoIterator for &'a IntMap<V, A> {
    type Item = (u32, &'a V);
    type IntoIter = Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
