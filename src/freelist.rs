//! Free-list store: per-size-class singly-linked free lists, a
//! large-object list, and the fragmentation-avoidance primitives that
//! split a large free region down into smaller classes (`push_small`) and
//! choose small-vs-large on reclaim (`reclaim`).
//!
//! The payload of every cell on a free list is zero beyond its header
//! words; `push`/`push_small`/`reclaim` never re-zero a cell themselves —
//! the sweeper is responsible for that — they only write the header words
//! needed for list linkage.

use crate::size_class::{self, SizeClass, NUM_SMALL_OBJECT_SIZES};
use crate::util::address::Address;
use crate::util::constants::{GRANULE_SIZE, LARGE_OBJECT_GRANULE_THRESHOLD};
use crate::util::conversions::granules_to_bytes;

/// An intrusive singly-linked free list for one small-object size class.
#[derive(Default)]
pub struct SmallFreeList {
    head: Option<Address>,
}

impl SmallFreeList {
    pub const fn new() -> Self {
        SmallFreeList { head: None }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// # Safety
    /// `cell` must be free, mapped, word-aligned memory.
    pub unsafe fn push(&mut self, cell: Address) {
        let next = self.head.map_or(0, Address::as_usize);
        cell.store_usize(next);
        self.head = Some(cell);
    }

    /// # Safety
    /// The list must only contain free, mapped, word-aligned cells.
    pub unsafe fn pop(&mut self) -> Option<Address> {
        let cell = self.head?;
        let next = cell.load_usize();
        self.head = (next != 0).then(|| Address::from_usize(next));
        Some(cell)
    }

    /// Detach the whole list, leaving `self` empty. Used to hand a
    /// space-global free list to a mutator's local copy in one shot.
    pub fn take(&mut self) -> SmallFreeList {
        SmallFreeList {
            head: self.head.take(),
        }
    }
}

/// The segregated small-object free lists for one heap or mutator.
pub struct SmallFreeLists {
    classes: [SmallFreeList; NUM_SMALL_OBJECT_SIZES],
}

impl SmallFreeLists {
    pub fn new() -> Self {
        SmallFreeLists {
            classes: Default::default(),
        }
    }

    pub fn get(&self, class: SizeClass) -> &SmallFreeList {
        &self.classes[class]
    }

    pub fn get_mut(&mut self, class: SizeClass) -> &mut SmallFreeList {
        &mut self.classes[class]
    }

    pub fn clear(&mut self) {
        self.classes = Default::default();
    }
}

impl Default for SmallFreeLists {
    fn default() -> Self {
        Self::new()
    }
}

/// The unordered large-object free list. Each cell is two words:
/// `{next, granules}`.
#[derive(Default)]
pub struct LargeFreeList {
    head: Option<Address>,
}

impl LargeFreeList {
    pub const fn new() -> Self {
        LargeFreeList { head: None }
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    pub fn head(&self) -> Option<Address> {
        self.head
    }

    /// # Safety
    /// `cell` must be `granules`-sized free, mapped, word-aligned memory.
    pub unsafe fn push(&mut self, cell: Address, granules: usize) {
        debug_assert!(granules > LARGE_OBJECT_GRANULE_THRESHOLD);
        let next = self.head.map_or(0, Address::as_usize);
        cell.store_usize(next);
        (cell + GRANULE_SIZE).store_usize(granules);
        self.head = Some(cell);
    }

    /// # Safety
    /// `cell` must currently be linked on some large free list with this
    /// two-word layout.
    pub unsafe fn granules_at(cell: Address) -> usize {
        (cell + GRANULE_SIZE).load_usize()
    }

    /// Unlink the first cell (scanning from the head, stopping before
    /// `stop_before` if given) whose granule count is at least `needed`.
    /// Returns the cell and its granule count.
    ///
    /// # Safety
    /// The list must only contain valid two-word free cells.
    pub unsafe fn take_first_fit(
        &mut self,
        needed: usize,
        stop_before: Option<Address>,
    ) -> Option<(Address, usize)> {
        let mut prev: Option<Address> = None;
        let mut cur = self.head;
        while let Some(cell) = cur {
            if Some(cell) == stop_before {
                break;
            }
            let next_raw = cell.load_usize();
            let next = (next_raw != 0).then(|| Address::from_usize(next_raw));
            let granules = Self::granules_at(cell);
            if granules >= needed {
                match prev {
                    Some(p) => p.store_usize(next.map_or(0, Address::as_usize)),
                    None => self.head = next,
                }
                return Some((cell, granules));
            }
            prev = Some(cell);
            cur = next;
        }
        None
    }
}

/// `push_small`: the fragmentation-avoidance primitive. Starting at
/// `class`, peel as many whole cells of that class as fit into `region`
/// (`region_granules` granules), then step down a class for the
/// remainder. Terminates because the smallest class is 1 granule, which
/// always absorbs the rest exactly.
///
/// # Safety
/// `region` must be `region_granules` granules of free, mapped, aligned,
/// zeroed memory.
pub unsafe fn push_small(
    lists: &mut SmallFreeLists,
    region: Address,
    class: SizeClass,
    region_granules: usize,
) {
    let mut addr = region;
    let mut remaining = region_granules;
    let mut class = class;
    while remaining > 0 {
        let granules = size_class::size_class_granules(class);
        while granules <= remaining {
            lists.get_mut(class).push(addr);
            remaining -= granules;
            addr += granules_to_bytes(granules);
        }
        if remaining == 0 {
            break;
        }
        debug_assert!(class > 0, "the 1-granule class must absorb any remainder");
        class -= 1;
    }
}

/// `reclaim`: picks small vs large by comparing `granules` against the
/// large-object threshold and dispatches to `push_small` or
/// `LargeFreeList::push`.
///
/// # Safety
/// `region` must be `granules` granules of free, mapped, aligned, zeroed
/// memory.
pub unsafe fn reclaim(
    small: &mut SmallFreeLists,
    large: &mut LargeFreeList,
    region: Address,
    granules: usize,
) {
    if granules <= LARGE_OBJECT_GRANULE_THRESHOLD {
        push_small(small, region, NUM_SMALL_OBJECT_SIZES - 1, granules);
    } else {
        large.push(region, granules);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::memory;

    unsafe fn region(granules: usize) -> Address {
        let bytes = granules_to_bytes(granules).max(memory::page_size());
        memory::mmap_anon(bytes).unwrap()
    }

    #[test]
    fn push_small_splits_down_to_smaller_classes() {
        unsafe {
            let mut lists = SmallFreeLists::new();
            let base = region(64);
            // 7 granules doesn't divide evenly into class 6 (granules=6);
            // expect one 6-granule cell and one 1-granule cell.
            push_small(&mut lists, base, NUM_SMALL_OBJECT_SIZES - 1, 7);
            assert!(!lists.get(5).is_empty()); // class index 5 -> 6 granules
            assert!(!lists.get(0).is_empty()); // class index 0 -> 1 granule
        }
    }

    #[test]
    fn reclaim_routes_by_threshold() {
        unsafe {
            let mut small = SmallFreeLists::new();
            let mut large = LargeFreeList::new();
            let base = region(40);
            reclaim(&mut small, &mut large, base, 33);
            assert!(!large.is_empty());
            assert!(LargeFreeList::granules_at(large.head().unwrap()) == 33);
        }
    }

    #[test]
    fn large_list_first_fit_unlinks_matching_cell() {
        unsafe {
            let mut large = LargeFreeList::new();
            let a = region(40);
            let b = region(50);
            large.push(a, 40);
            large.push(b, 50);
            let (cell, granules) = large.take_first_fit(45, None).unwrap();
            assert_eq!(cell, b);
            assert_eq!(granules, 50);
            assert!(!large.is_empty());
            let (cell2, granules2) = large.take_first_fit(45, None).unwrap();
            assert_eq!(cell2, a);
            assert_eq!(granules2, 40);
            assert!(large.is_empty());
        }
    }
}
