//! Object header encoding for the mark-byte mark-sweep variant.
//!
//! The header is one word at the start of every heap cell. For a live
//! object its low byte holds the `alloc_kind`; the mark bit itself lives
//! in the external mark-byte table (`crate::marksweep::space`), not in
//! this word. A free cell's first word instead holds the intrusive
//! free-list `next` pointer (`crate::freelist`); the two interpretations
//! never collide in practice because live `alloc_kind` values are tiny
//! integers and free-list pointers are heap addresses, but the collector
//! never reads a cell as one or the other without first consulting the
//! mark byte to know which interpretation applies.

use crate::object_model::AllocKind;
use crate::util::Address;

/// The tag word of a live object.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Tag(usize);

impl Tag {
    /// Build the tag for a freshly allocated live object of the given
    /// kind.
    #[inline]
    pub fn live<K: AllocKind>(kind: K) -> Tag {
        Tag(kind.to_u8() as usize)
    }

    /// Recover the `alloc_kind` of a live object's tag. Returns `None` if
    /// the byte does not correspond to any kind the client registered —
    /// callers treat that as heap corruption.
    #[inline]
    pub fn alloc_kind<K: AllocKind>(self) -> Option<K> {
        K::from_u8(self.0 as u8)
    }

    /// Read the tag word at `obj`. Caller must ensure `obj` is known
    /// (via the mark byte) to currently hold a live object.
    ///
    /// # Safety
    /// `obj` must point at a mapped, word-aligned heap cell.
    #[inline]
    pub unsafe fn read(obj: Address) -> Tag {
        Tag(obj.load_usize())
    }

    /// Write this tag at `obj`.
    ///
    /// # Safety
    /// `obj` must point at a mapped, word-aligned heap cell.
    #[inline]
    pub unsafe fn write(self, obj: Address) {
        obj.store_usize(self.0)
    }
}
