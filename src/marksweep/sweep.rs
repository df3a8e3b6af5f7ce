//! The sweeper: scans mark bytes from the cursor forward, reclaiming
//! unmarked runs and clearing the mark of each live object it steps over.
//! Bounded to a fixed granule budget per call so a single allocation
//! request cannot be starved behind an unbounded scan of the whole heap.

use crate::freelist;
use crate::marksweep::space::MarkSweepSpace;
use crate::object_model::ObjectModel;
use crate::size_class;
use crate::util::constants::{GRANULE_SIZE, LARGE_OBJECT_GRANULE_THRESHOLD, SWEEP_RECLAIM_GRANULES};
use crate::util::conversions::size_to_granules;
use crate::util::{Address, ObjectReference};

const WORD_SIZE: usize = std::mem::size_of::<usize>();

/// Length of the run of zero mark bytes starting at `mark`, capped at
/// `limit` granules. The hot loop widens from byte to word to 4-word
/// chunks once aligned, and narrows back down at the tail.
///
/// # Safety
/// `mark..mark+limit` must be mapped, readable memory.
unsafe fn next_mark(mark: Address, limit: usize) -> usize {
    let mut count = 0;
    let mut p = mark;
    while count < limit && p.as_usize() % WORD_SIZE != 0 {
        if p.load_u8() != 0 {
            return count;
        }
        count += 1;
        p += 1;
    }
    while count + 4 * WORD_SIZE <= limit {
        let w0 = p.load_usize();
        let w1 = (p + WORD_SIZE).load_usize();
        let w2 = (p + 2 * WORD_SIZE).load_usize();
        let w3 = (p + 3 * WORD_SIZE).load_usize();
        if w0 | w1 | w2 | w3 != 0 {
            break;
        }
        count += 4 * WORD_SIZE;
        p += 4 * WORD_SIZE;
    }
    while count + WORD_SIZE <= limit {
        if p.load_usize() != 0 {
            break;
        }
        count += WORD_SIZE;
        p += WORD_SIZE;
    }
    while count < limit {
        if p.load_u8() != 0 {
            break;
        }
        count += 1;
        p += 1;
    }
    count
}

/// Advance the sweep cursor, reclaiming free runs into `space`'s global
/// free-lists, until either the per-call budget (128 granules reclaimed)
/// is spent or the end of the heap is reached.
///
/// Returns `0` if the cursor reached the end of the heap (the caller
/// should trigger a collection), `1` if heap remains to scan later.
pub fn sweep<OM: ObjectModel>(space: &mut MarkSweepSpace<OM>, for_granules: usize) -> u8 {
    let mut to_reclaim: isize = SWEEP_RECLAIM_GRANULES;
    let heap_end = space.heap_end();
    while to_reclaim > 0 {
        if space.sweep >= heap_end {
            return 0;
        }
        let granules_remaining = ((heap_end - space.sweep) as usize) / GRANULE_SIZE;
        let scan_limit = granules_remaining.min(for_granules.max(1));
        let mark = space.mark_byte_address(space.sweep);
        let free_granules = unsafe { next_mark(mark, scan_limit) };

        if free_granules > 0 {
            let free_bytes = free_granules * GRANULE_SIZE;
            unsafe {
                space.sweep.zero(GRANULE_SIZE);
                if free_bytes > GRANULE_SIZE {
                    (space.sweep + GRANULE_SIZE).zero(free_bytes - GRANULE_SIZE);
                }
                freelist::reclaim(&mut space.small_objects, &mut space.large_objects, space.sweep, free_granules);
            }
            space.sweep += free_bytes;
            to_reclaim -= free_granules as isize;
        } else {
            let obj = ObjectReference::from_address(space.sweep);
            let kind = space.kind_of_tag(obj);
            let size = OM::size(kind, obj);
            let mut granules = size_to_granules(size);
            if granules <= LARGE_OBJECT_GRANULE_THRESHOLD {
                granules = size_class::size_class_granules(size_class::granules_to_small_object_size(granules));
            }
            unsafe {
                space.clear_mark(obj);
            }
            space.sweep += granules * GRANULE_SIZE;
        }
    }
    1
}
