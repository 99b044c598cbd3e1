//! Bidirectional cursors shared by every container.
//!
//! A `Cursor` is a small `Copy` value: a borrowed container plus a position.
//! Besides the element it points at, it can report its neighbours without
//! moving. Walking off either end parks the cursor on a sentinel:
//!
//! - *before-begin*: `current()` is `None`, `peek_next()` is the first element;
//!   `move_next` re-enters at the first element, `move_prev` stays put.
//! - *after-end*: `current()` is `None`, `peek_prev()` is the last element;
//!   `move_prev` re-enters at the last element, `move_next` stays put.
//!
//! The cursor borrows its container, so mutation while a cursor is alive is a
//! compile error rather than a stale pointer.

use core::fmt;

/// Positional walk over a container's live elements.
///
/// Positions are container-specific `usize`s: an array index, a bucket
/// index, or a registry id. Only positions of live elements are ever
/// returned.
pub trait Traverse {
    /// What the cursor reports as the element's identity.
    type Key: Copy;
    type Item;

    fn first(&self) -> Option<usize>;
    fn last(&self) -> Option<usize>;
    /// Next live position strictly after `pos`.
    fn after(&self, pos: usize) -> Option<usize>;
    /// Previous live position strictly before `pos`.
    fn before(&self, pos: usize) -> Option<usize>;
    fn key_at(&self, pos: usize) -> Option<Self::Key>;
    fn item_at(&self, pos: usize) -> Option<&Self::Item>;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Position {
    BeforeBegin,
    At(usize),
    AfterEnd,
}

impl Position {
    fn at_or(pos: Option<usize>, sentinel: Position) -> Position {
        pos.map_or(sentinel, Position::At)
    }
}

pub struct Cursor<'a, C> {
    source: &'a C,
    pos: Position,
}

impl<'a, C> Clone for Cursor<'a, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, C> Copy for Cursor<'a, C> {}

impl<'a, C> Cursor<'a, C>
where
    C: Traverse + 'a,
{
    /// Cursor on the first live element; the after-end sentinel when empty.
    pub fn begin(source: &'a C) -> Self {
        Self {
            source,
            pos: Position::at_or(source.first(), Position::AfterEnd),
        }
    }

    /// Cursor on the last live element; the after-end sentinel when empty.
    pub fn end(source: &'a C) -> Self {
        Self {
            source,
            pos: Position::at_or(source.last(), Position::AfterEnd),
        }
    }

    pub fn current(&self) -> Option<&'a C::Item> {
        match self.pos {
            Position::At(p) => self.source.item_at(p),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<C::Key> {
        match self.pos {
            Position::At(p) => self.source.key_at(p),
            _ => None,
        }
    }

    /// Raw position of the current element (index, bucket, or id).
    pub fn position(&self) -> Option<usize> {
        match self.pos {
            Position::At(p) => Some(p),
            _ => None,
        }
    }

    pub fn peek_next(&self) -> Option<&'a C::Item> {
        let next = match self.pos {
            Position::BeforeBegin => self.source.first(),
            Position::At(p) => self.source.after(p),
            Position::AfterEnd => None,
        };
        next.and_then(|p| self.source.item_at(p))
    }

    pub fn peek_prev(&self) -> Option<&'a C::Item> {
        let prev = match self.pos {
            Position::BeforeBegin => None,
            Position::At(p) => self.source.before(p),
            Position::AfterEnd => self.source.last(),
        };
        prev.and_then(|p| self.source.item_at(p))
    }

    pub fn move_next(&mut self) {
        self.pos = match self.pos {
            Position::BeforeBegin => Position::at_or(self.source.first(), Position::BeforeBegin),
            Position::At(p) => Position::at_or(self.source.after(p), Position::AfterEnd),
            Position::AfterEnd => Position::AfterEnd,
        };
    }

    pub fn move_prev(&mut self) {
        self.pos = match self.pos {
            Position::BeforeBegin => Position::BeforeBegin,
            Position::At(p) => Position::at_or(self.source.before(p), Position::BeforeBegin),
            Position::AfterEnd => Position::at_or(self.source.last(), Position::AfterEnd),
        };
    }

    pub fn is_before_begin(&self) -> bool {
        self.pos == Position::BeforeBegin
    }

    pub fn is_after_end(&self) -> bool {
        self.pos == Position::AfterEnd
    }
}

impl<'a, C> PartialEq for Cursor<'a, C> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.source, other.source) && self.pos == other.pos
    }
}

impl<'a, C> Eq for Cursor<'a, C> {}

impl<'a, C> fmt::Debug for Cursor<'a, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor").field("pos", &self.pos).finish()
    }
}
