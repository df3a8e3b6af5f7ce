//! Allocation paths for the legacy variant. Unlike the mark-byte design,
//! the legacy heap keeps a single set of free lists directly on the
//! space — there is no per-mutator local copy to refill, since the
//! original this is grounded on never had a multi-mutator split either.
//! A mutator still gets its own root chain and mark buffer, both shared
//! types with the mark-byte design.

use crate::handle::{MarkBuffer, RootChain};
use crate::legacy::freelist;
use crate::legacy::header::Tag;
use crate::legacy::space::{
    granules_to_small_class, LegacySpace, LARGE_OBJECT_GRANULE_THRESHOLD, NUM_SMALL_OBJECT_CLASSES,
    SMALL_OBJECT_GRANULES,
};
use crate::legacy::sweep;
use crate::object_model::{AllocKind, ObjectModel};
use crate::util::conversions::{granules_to_bytes, size_to_granules};
use crate::util::{Address, ObjectReference};

pub struct MutatorState {
    pub roots: RootChain,
    pub mark_buffer: MarkBuffer,
}

impl MutatorState {
    pub fn new() -> MutatorState {
        MutatorState {
            roots: RootChain::default(),
            mark_buffer: MarkBuffer::new(),
        }
    }
}

impl Default for MutatorState {
    fn default() -> Self {
        Self::new()
    }
}

fn stamp<K: AllocKind>(tiny: bool, kind: K, cell: Address) -> ObjectReference {
    unsafe {
        Tag::live(tiny, kind).write(cell);
    }
    ObjectReference::from_address(cell)
}

/// Push a `region_granules`-granule free region onto the small-class
/// array, descending from `class` and peeling whole cells, same as the
/// mark-byte design's `push_small` — except the bottom class here is 2
/// granules, so a final 1-granule remainder (which can happen whenever
/// `region_granules` is odd) goes to the tiny list instead.
///
/// # Safety
/// `region` must be `region_granules` granules of free, mapped, aligned
/// memory.
pub unsafe fn push_small(
    tiny: &mut Option<Address>,
    small: &mut [Option<Address>; NUM_SMALL_OBJECT_CLASSES],
    region: Address,
    class: usize,
    region_granules: usize,
) {
    let mut addr = region;
    let mut remaining = region_granules;
    let mut class = class;
    loop {
        if remaining == 1 {
            freelist::push_tiny(tiny, addr);
            return;
        }
        if remaining == 0 {
            return;
        }
        let granules = SMALL_OBJECT_GRANULES[class] as usize;
        while granules <= remaining {
            freelist::push(&mut small[class], addr, granules);
            remaining -= granules;
            addr += granules_to_bytes(granules);
        }
        if remaining == 0 {
            return;
        }
        debug_assert!(class > 0, "the smallest class plus tiny must absorb any remainder");
        class -= 1;
    }
}

/// Reclaim a free region of `granules` granules, choosing tiny, small, or
/// large by size exactly like the mark-byte design's `reclaim`.
///
/// # Safety
/// `region` must be `granules` granules of free, mapped, aligned memory.
pub unsafe fn reclaim<OM: ObjectModel>(space: &mut LegacySpace<OM>, region: Address, granules: usize) {
    if granules == 1 {
        freelist::push_tiny(&mut space.tiny_objects, region);
    } else if granules <= LARGE_OBJECT_GRANULE_THRESHOLD {
        push_small(
            &mut space.tiny_objects,
            &mut space.small_objects,
            region,
            NUM_SMALL_OBJECT_CLASSES - 1,
            granules,
        );
    } else {
        freelist::push(&mut space.large_objects, region, granules);
    }
}

pub fn allocate<OM: ObjectModel>(
    space: &mut LegacySpace<OM>,
    mutator: &mut MutatorState,
    kind: OM::Kind,
    size: usize,
) -> ObjectReference {
    let granules = size_to_granules(size).max(1);
    if granules == 1 {
        allocate_tiny(space, mutator, kind)
    } else if granules <= LARGE_OBJECT_GRANULE_THRESHOLD {
        allocate_small(space, mutator, kind, granules)
    } else {
        allocate_large(space, mutator, kind, granules)
    }
}

fn allocate_tiny<OM: ObjectModel>(
    space: &mut LegacySpace<OM>,
    mutator: &mut MutatorState,
    kind: OM::Kind,
) -> ObjectReference {
    loop {
        if let Some(cell) = unsafe { freelist::pop_tiny(&mut space.tiny_objects) } {
            return stamp(true, kind, cell);
        }
        fill_small(space, mutator, 1);
    }
}

fn allocate_small<OM: ObjectModel>(
    space: &mut LegacySpace<OM>,
    mutator: &mut MutatorState,
    kind: OM::Kind,
    granules: usize,
) -> ObjectReference {
    let class = granules_to_small_class(granules);
    loop {
        if let Some(cell) = unsafe { freelist::pop(&mut space.small_objects[class]) } {
            return stamp(false, kind, cell);
        }
        fill_small(space, mutator, granules);
    }
}

/// Refill whichever list `granules` maps to (tiny, or a small class) by
/// splitting a larger small class, then a large cell, then sweeping, and
/// finally collecting if a full sweep still found nothing.
fn fill_small<OM: ObjectModel>(space: &mut LegacySpace<OM>, mutator: &mut MutatorState, granules: usize) {
    let start_class = if granules == 1 { 0 } else { granules_to_small_class(granules) };
    for c in start_class..NUM_SMALL_OBJECT_CLASSES {
        if let Some(cell) = unsafe { freelist::pop(&mut space.small_objects[c]) } {
            unsafe {
                push_small(
                    &mut space.tiny_objects,
                    &mut space.small_objects,
                    cell,
                    c,
                    SMALL_OBJECT_GRANULES[c] as usize,
                );
            }
            return;
        }
    }

    let mut collected_once = false;
    loop {
        if let Some(cell) = unsafe { freelist::pop(&mut space.large_objects) } {
            let found_granules = unsafe { freelist::granules_at(cell) };
            unsafe {
                push_small(
                    &mut space.tiny_objects,
                    &mut space.small_objects,
                    cell,
                    NUM_SMALL_OBJECT_CLASSES - 1,
                    found_granules,
                );
            }
            return;
        }
        if sweep::sweep(space) == 0 {
            if collected_once {
                panic!("ran out of space, heap size {}", space.heap_size());
            }
            space.collect(mutator);
            collected_once = true;
        } else {
            return;
        }
    }
}

fn allocate_large<OM: ObjectModel>(
    space: &mut LegacySpace<OM>,
    mutator: &mut MutatorState,
    kind: OM::Kind,
    granules: usize,
) -> ObjectReference {
    let mut collected_once = false;
    loop {
        if let Some((cell, found_granules)) = unsafe { freelist::take_first_fit(&mut space.large_objects, granules) } {
            let remainder = found_granules - granules;
            if remainder > 0 {
                let tail = cell + granules_to_bytes(granules);
                unsafe {
                    reclaim(space, tail, remainder);
                }
            }
            return stamp(false, kind, cell);
        }

        if sweep::sweep(space) == 1 {
            continue;
        }
        if collected_once {
            panic!("ran out of space, heap size {}", space.heap_size());
        }
        space.collect(mutator);
        collected_once = true;
    }
}
