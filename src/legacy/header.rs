//! Bit-packed object header for the legacy mark-sweep variant: a single
//! word carries the tiny/non-tiny size-class bit, the "was this ever
//! live" bit, the mark bit, and the alloc-kind — all in one place, so a
//! free cell's granule count can share the same word with no separate
//! mark table.
//!
//! Bit layout: bit 0 is the size-class flag (0 = a one-granule "tiny"
//! cell, 1 = everything else); bit 1 is set on every object `allocate`
//! ever handed out and stays set even once the object is freed (the
//! sweeper uses its absence to mean "already dead, not merely unmarked");
//! bit 2 is the mark bit, set by tracing and cleared by the sweeper;
//! bits 3..=10 hold the alloc-kind for live objects. A free non-tiny
//! cell instead reuses bits 2.. as a granule count, giving the sweeper
//! the cell's size without reading anything else.

use crate::object_model::AllocKind;
use crate::util::Address;
use std::sync::atomic::{AtomicUsize, Ordering};

const KIND_BIT: usize = 1;
const LIVE_BIT: usize = 1 << 1;
const MARK_BIT: usize = 1 << 2;
const ALLOC_KIND_SHIFT: u32 = 3;
const ALLOC_KIND_MASK: usize = 0xff;
const FREE_GRANULES_SHIFT: u32 = 2;

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum ObjKind {
    Tiny,
    Normal,
}

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Tag(usize);

impl Tag {
    /// The tag for a one-granule free cell: all bits zero, which doubles
    /// as a valid next-pointer-or-null sentinel for the tiny free list.
    pub const FREE_TINY: Tag = Tag(0);

    #[inline]
    pub fn kind(self) -> ObjKind {
        if self.0 & KIND_BIT == 0 {
            ObjKind::Tiny
        } else {
            ObjKind::Normal
        }
    }

    #[inline]
    pub fn is_maybe_live(self) -> bool {
        self.0 & LIVE_BIT != 0
    }

    #[inline]
    pub fn is_marked(self) -> bool {
        self.0 & MARK_BIT != 0
    }

    #[inline]
    pub fn live<K: AllocKind>(tiny: bool, kind: K) -> Tag {
        let kind_bit = if tiny { 0 } else { KIND_BIT };
        Tag(kind_bit | LIVE_BIT | ((kind.to_u8() as usize) << ALLOC_KIND_SHIFT))
    }

    #[inline]
    pub fn free(granules: usize) -> Tag {
        Tag(KIND_BIT | (granules << FREE_GRANULES_SHIFT))
    }

    #[inline]
    pub fn free_granules(self) -> usize {
        self.0 >> FREE_GRANULES_SHIFT
    }

    #[inline]
    pub fn alloc_kind<K: AllocKind>(self) -> Option<K> {
        K::from_u8(((self.0 >> ALLOC_KIND_SHIFT) & ALLOC_KIND_MASK) as u8)
    }

    /// # Safety
    /// `obj` must point at a mapped, word-aligned heap cell.
    #[inline]
    pub unsafe fn read(obj: Address) -> Tag {
        Tag(obj.load_usize())
    }

    /// # Safety
    /// `obj` must point at a mapped, word-aligned heap cell.
    #[inline]
    pub unsafe fn write(self, obj: Address) {
        obj.store_usize(self.0)
    }

    /// Clear the mark bit without disturbing anything else in the word.
    /// Not atomic: only called by the sweeper, which never runs
    /// concurrently with tracing.
    ///
    /// # Safety
    /// `obj` must point at a mapped, word-aligned live object.
    #[inline]
    pub unsafe fn clear_marked(obj: Address) {
        let tag = obj.load_usize();
        obj.store_usize(tag & !MARK_BIT);
    }
}

/// Attempt to set the mark bit of the tag word at `obj`. Returns `true`
/// exactly once across however many callers race to mark the same
/// object, matching the winner-takes-it contract the tracer relies on.
///
/// # Safety
/// `obj` must point at a mapped, word-aligned live object whose tag word
/// no other code concurrently mutates outside this bit.
#[inline]
pub unsafe fn try_set_marked(obj: Address) -> bool {
    let cell: &AtomicUsize = obj.as_atomic_usize();
    let mut cur = cell.load(Ordering::Acquire);
    loop {
        if cur & MARK_BIT != 0 {
            return false;
        }
        match cell.compare_exchange_weak(cur, cur | MARK_BIT, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => return true,
            Err(observed) => cur = observed,
        }
    }
}
