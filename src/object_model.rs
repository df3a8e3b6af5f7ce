//! The client-side contract: the collector core is generic over a client
//! type system. For each `alloc_kind` the client provides a size function
//! and a field-visitor function, dispatched through a trait rather than
//! the switch-on-tag macro a C heap would use.

use crate::util::{Address, ObjectReference};

/// The per-object-kind tag a client's type system assigns to its heap
/// kinds. Kept as a small, round-trippable `u8` so it fits the header
/// encodings in `crate::header` and `crate::legacy::header`.
pub trait AllocKind: Copy + Eq + std::fmt::Debug + 'static {
    /// Encode this kind as a byte for storage in an object header.
    fn to_u8(self) -> u8;

    /// Decode a kind previously produced by `to_u8`. Returns `None` for a
    /// byte that does not correspond to any known kind — the collector
    /// treats that as heap corruption and aborts.
    fn from_u8(byte: u8) -> Option<Self>
    where
        Self: Sized;

    /// Whether objects of this kind are guaranteed to contain no outgoing
    /// references. `allocate_pointerless` uses this to mark objects for a
    /// future pointer-free sub-heap; the core still traces them (their
    /// `visit_fields` is simply a no-op).
    fn is_pointerless(self) -> bool {
        false
    }
}

/// The client's type system, at the interface the collector core needs.
pub trait ObjectModel: 'static + Sync {
    type Kind: AllocKind;

    /// The byte size of `object`, given its kind. Used by the sweeper to
    /// advance past a live object and by the copier to advance the scan
    /// pointer.
    fn size(kind: Self::Kind, object: ObjectReference) -> usize;

    /// Call `visitor` once per tracer slot in `object`. A tracer slot is
    /// the address *of* a reference-typed field, not the reference
    /// itself — the marker or copier may rewrite `*slot` in place
    /// (mark-and-enqueue, or forwarding). Must not call `visitor` on
    /// non-pointer fields. `visitor` must tolerate a slot whose current
    /// value is the null address.
    fn visit_fields<F: FnMut(Address)>(kind: Self::Kind, object: ObjectReference, visitor: &mut F);
}
