//! Mutator-local allocation state and the small/large allocation paths.
//!
//! A mutator owns a local copy of the small-object free-lists (so the
//! hot path never touches a shared structure), a root chain, and a mark
//! buffer. Refilling a local list walks outward: split a larger local
//! class, then the equivalent space-global step, then a large cell, then
//! a bounded sweep, triggering a full collection only once that sweep
//! reports the heap exhausted.

use crate::freelist::{self, SmallFreeLists};
use crate::handle::{MarkBuffer, RootChain};
use crate::header::Tag;
use crate::marksweep::space::MarkSweepSpace;
use crate::marksweep::sweep;
use crate::object_model::{AllocKind, ObjectModel};
use crate::size_class::{self, SizeClass, NUM_SMALL_OBJECT_SIZES};
use crate::util::constants::LARGE_OBJECT_GRANULE_THRESHOLD;
use crate::util::conversions::{granules_to_bytes, size_to_granules};
use crate::util::{Address, ObjectReference};

pub struct MutatorState {
    pub small_objects: SmallFreeLists,
    pub roots: RootChain,
    pub mark_buffer: MarkBuffer,
}

impl MutatorState {
    pub fn new() -> MutatorState {
        MutatorState {
            small_objects: SmallFreeLists::new(),
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

fn stamp<K: AllocKind>(kind: K, cell: Address) -> ObjectReference {
    unsafe {
        Tag::live(kind).write(cell);
    }
    ObjectReference::from_address(cell)
}

pub fn allocate<OM: ObjectModel>(
    space: &mut MarkSweepSpace<OM>,
    mutator: &mut MutatorState,
    kind: OM::Kind,
    size: usize,
) -> ObjectReference {
    let granules = size_to_granules(size);
    if granules <= LARGE_OBJECT_GRANULE_THRESHOLD {
        let class = size_class::granules_to_small_object_size(granules);
        allocate_small(space, mutator, kind, class)
    } else {
        allocate_large(space, mutator, kind, granules)
    }
}

fn allocate_small<OM: ObjectModel>(
    space: &mut MarkSweepSpace<OM>,
    mutator: &mut MutatorState,
    kind: OM::Kind,
    class: SizeClass,
) -> ObjectReference {
    loop {
        if let Some(cell) = unsafe { mutator.small_objects.get_mut(class).pop() } {
            return stamp(kind, cell);
        }
        fill_small(space, mutator, class);
    }
}

fn fill_small<OM: ObjectModel>(space: &mut MarkSweepSpace<OM>, mutator: &mut MutatorState, class: SizeClass) {
    for c in (class + 1)..NUM_SMALL_OBJECT_SIZES {
        if let Some(cell) = unsafe { mutator.small_objects.get_mut(c).pop() } {
            unsafe {
                freelist::push_small(&mut mutator.small_objects, cell, class, size_class::size_class_granules(c));
            }
            return;
        }
    }
    fill_small_from_global(space, mutator, class);
}

fn fill_small_from_global<OM: ObjectModel>(
    space: &mut MarkSweepSpace<OM>,
    mutator: &mut MutatorState,
    class: SizeClass,
) {
    let mut collected_once = false;
    loop {
        if space.small_objects.get(class).is_empty() {
            for c in (class + 1)..NUM_SMALL_OBJECT_SIZES {
                if let Some(cell) = unsafe { space.small_objects.get_mut(c).pop() } {
                    unsafe {
                        freelist::push_small(&mut space.small_objects, cell, class, size_class::size_class_granules(c));
                    }
                    break;
                }
            }
        }
        if !space.small_objects.get(class).is_empty() {
            *mutator.small_objects.get_mut(class) = space.small_objects.get_mut(class).take();
            return;
        }

        if let Some((cell, granules)) =
            unsafe { space.large_objects.take_first_fit(LARGE_OBJECT_GRANULE_THRESHOLD, None) }
        {
            unsafe {
                freelist::push_small(&mut mutator.small_objects, cell, class, LARGE_OBJECT_GRANULE_THRESHOLD);
                let remainder_granules = granules - LARGE_OBJECT_GRANULE_THRESHOLD;
                if remainder_granules > 0 {
                    let remainder = cell + granules_to_bytes(LARGE_OBJECT_GRANULE_THRESHOLD);
                    freelist::reclaim(&mut space.small_objects, &mut space.large_objects, remainder, remainder_granules);
                }
            }
            return;
        }

        if sweep::sweep(space, LARGE_OBJECT_GRANULE_THRESHOLD) == 0 {
            if collected_once {
                panic!("ran out of space, heap size {}", space.heap_size());
            }
            space.collect(mutator);
            collected_once = true;
        }
    }
}

fn allocate_large<OM: ObjectModel>(
    space: &mut MarkSweepSpace<OM>,
    mutator: &mut MutatorState,
    kind: OM::Kind,
    granules: usize,
) -> ObjectReference {
    let mut already_scanned: Option<Address> = None;
    let mut collected_once = false;
    loop {
        if let Some((cell, found_granules)) = unsafe { space.large_objects.take_first_fit(granules, already_scanned) } {
            let remainder = found_granules - granules;
            if remainder > 0 {
                let tail = cell + granules_to_bytes(granules);
                unsafe {
                    freelist::reclaim(&mut space.small_objects, &mut space.large_objects, tail, remainder);
                }
            }
            return stamp(kind, cell);
        }
        already_scanned = space.large_objects.head();
        if sweep::sweep(space, granules) == 1 {
            continue;
        }
        if collected_once {
            panic!("ran out of space, heap size {}", space.heap_size());
        }
        space.collect(mutator);
        collected_once = true;
        already_scanned = None;
    }
}

