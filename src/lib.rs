//! stash: three value-owning containers over predictable, contiguous storage.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: small containers whose memory behavior is easy to reason about,
//!   each built from the one below it.
//! - Layers:
//!   - DynArray<T, A>: growable contiguous buffer of `Copy` elements. Growth
//!     rounds up to a power of two; every allocation goes through a
//!     `RawAllocator`.
//!   - IntMap<V, A>: open-addressed table keyed by `u32` on top of one
//!     DynArray of inline buckets. Linear probing, power-of-two bucket
//!     count, rehash before the load factor passes 0.7.
//!   - SlotRegistry<T, A>: stable `u32` ids on top of three DynArrays
//!     (elements, validity flags, retired-id stack). Retired ids are
//!     reissued LIFO.
//!   - Cursor<'a, C>: one bidirectional cursor for all three, driven by the
//!     `Traverse` trait.
//!
//! Constraints
//! - Single-threaded: no atomics, no locks. Containers are `Send`/`Sync`
//!   only as far as their allocator and elements are.
//! - Elements are `Copy`: copy-in, copy-out, no destructors to run.
//! - Zero-sized element types are rejected at compile time.
//! - No panics on misuse: fallible operations return `StashError`; lookups
//!   return `Option`. Only `Index`/`IndexMut` panic, like slices.
//!
//! Failure model
//! - Allocation failure is reported as `StashError::OutOfMemory` and leaves
//!   the container exactly as it was. This includes IntMap growth.
//! - A container whose initial allocation failed (or was never made) is an
//!   "invalid" record: `is_valid()` is false, every operation is still safe.
//!   DynArray and SlotRegistry grow out of that state on the next push.
//!
//! Identifier semantics (SlotRegistry)
//! - `0` is the null id. Id `n` maps to slot `n - 1`.
//! - The validity flag is the only authority on liveness; retiring an id
//!   does not touch the slot bytes.
//! - A reissued id addresses the new element only; the old value is gone.
//!
//! Iteration
//! - Each container offers a std iterator (`iter`, double-ended) and a
//!   `Cursor` (`begin`/`end`). Cursors walk off either end onto a sentinel
//!   from which the opposite move re-enters.
//! - IntMap iterates in bucket order, which changes on rehash.
//!
//! Notes and non-goals
//! - No persistence, serialization, shrink-on-remove or thread-safety.
//! - Diagnostics go through `tracing` at trace/debug level only.

mod alloc;
mod cursor;
mod dyn_array;
mod error;
mod int_map;
mod slot_registry;

mod dyn_array_proptest;
mod int_map_proptest;
mod slot_registry_proptest;

// Public surface
pub use crate::alloc::{Bounded, Global, RawAllocator};
pub use cursor::{Cursor, Traverse};
pub use dyn_array::DynArray;
pub use error::{status, Result, StashError, SUCCESS};
pub use int_map::{hash_u32, IntMap};
pub use slot_registry::{SlotRegistry, NULL_ID};

pub mod iter {
    //! Iterator types returned by the containers.
    pub use crate::int_map::{Iter as IntMapIter, IterMut as IntMapIterMut};
    pub use crate::slot_registry::{Iter as RegistryIter, IterMut as RegistryIterMut};
}
