//! The legacy sweeper. Unlike the mark-byte design's external mark table,
//! every cell's own tag word says whether it is live, dead-but-not-yet-
//! reclaimed, or already free — so the sweeper reads tags directly as it
//! walks the heap, and merges any run of consecutive non-live cells into
//! a single reclaimed region even when that run crosses size-class
//! boundaries. This loses the "reclaimed in class c" accounting the
//! mark-byte design keeps, in exchange for not needing a mark table at
//! all.

use crate::legacy::allocator;
use crate::legacy::header::{ObjKind, Tag};
use crate::legacy::space::LegacySpace;
use crate::object_model::ObjectModel;
use crate::util::constants::{GRANULE_SIZE, SWEEP_RECLAIM_GRANULES};
use crate::util::conversions::size_to_granules;
use crate::util::ObjectReference;

/// The granule footprint of the cell at `obj` given its tag, whether the
/// cell is a live object (marked or not) or an already-free cell.
fn object_granules<OM: ObjectModel>(tag: Tag, obj: ObjectReference) -> usize {
    match tag.kind() {
        ObjKind::Tiny => 1,
        ObjKind::Normal => {
            if tag.is_maybe_live() {
                let kind = tag
                    .alloc_kind::<OM::Kind>()
                    .unwrap_or_else(|| panic!("malformed object tag at {:?}", obj.to_address()));
                size_to_granules(OM::size(kind, obj))
            } else {
                tag.free_granules()
            }
        }
    }
}

/// Advance the sweep cursor, coalescing consecutive unmarked cells into
/// single reclaimed regions, until either the per-call budget (128
/// granules reclaimed) is spent or the end of the heap is reached. A
/// coalesced run has no size cap of its own — to avoid fragmentation, the
/// only thing that bounds it is running into a live marked cell or the
/// end of the heap.
///
/// Returns `0` if the cursor reached the end of the heap (the caller
/// should trigger a collection), `1` if heap remains to scan later.
pub fn sweep<OM: ObjectModel>(space: &mut LegacySpace<OM>) -> u8 {
    let mut to_reclaim: isize = SWEEP_RECLAIM_GRANULES;
    let heap_end = space.heap_end();

    while to_reclaim > 0 {
        if space.sweep >= heap_end {
            return 0;
        }

        let tag = unsafe { Tag::read(space.sweep) };

        if tag.is_maybe_live() && tag.is_marked() {
            let obj = ObjectReference::from_address(space.sweep);
            let granules = object_granules::<OM>(tag, obj);
            unsafe {
                Tag::clear_marked(space.sweep);
            }
            space.sweep += granules * GRANULE_SIZE;
            continue;
        }

        let run_start = space.sweep;
        let mut run_granules = 0usize;
        while space.sweep < heap_end {
            let t = unsafe { Tag::read(space.sweep) };
            if t.is_maybe_live() && t.is_marked() {
                break;
            }
            let obj = ObjectReference::from_address(space.sweep);
            let granules = object_granules::<OM>(t, obj);
            run_granules += granules;
            space.sweep += granules * GRANULE_SIZE;
        }

        unsafe {
            run_start.zero(run_granules * GRANULE_SIZE);
            allocator::reclaim(space, run_start, run_granules);
        }
        to_reclaim -= run_granules as isize;
    }
    1
}
