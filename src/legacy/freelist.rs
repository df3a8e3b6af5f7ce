//! Free-list cells for the legacy variant. A one-granule "tiny" cell is
//! just a next-pointer (its tag word doubles as the link, since the free
//! tiny tag is all zero and a next-pointer is always at least 8-byte
//! aligned). Every larger free cell stores its own granule count in its
//! tag word plus a next-pointer, so a single push/pop pair serves both
//! the nine small-object classes and the large-object list.

use crate::legacy::header::Tag;
use crate::util::constants::GRANULE_SIZE;
use crate::util::Address;

/// Push a one-granule cell onto a tiny free list.
///
/// # Safety
/// `cell` must be one free, mapped, aligned granule.
pub unsafe fn push_tiny(head: &mut Option<Address>, cell: Address) {
    cell.store_usize(head.map_or(0, Address::as_usize));
    *head = Some(cell);
}

/// # Safety
/// The list must only contain cells pushed by `push_tiny`.
pub unsafe fn pop_tiny(head: &mut Option<Address>) -> Option<Address> {
    let cell = (*head)?;
    let next = cell.load_usize();
    *head = (next != 0).then(|| Address::from_usize(next));
    Some(cell)
}

/// Push a `granules`-sized free cell (2 granules or more) onto a
/// small-class or large-object list.
///
/// # Safety
/// `cell` must be `granules` granules of free, mapped, aligned memory.
pub unsafe fn push(head: &mut Option<Address>, cell: Address, granules: usize) {
    Tag::free(granules).write(cell);
    (cell + GRANULE_SIZE).store_usize(head.map_or(0, Address::as_usize));
    *head = Some(cell);
}

/// # Safety
/// The list must only contain cells pushed by `push`.
pub unsafe fn pop(head: &mut Option<Address>) -> Option<Address> {
    let cell = (*head)?;
    let next = (cell + GRANULE_SIZE).load_usize();
    *head = (next != 0).then(|| Address::from_usize(next));
    Some(cell)
}

/// The granule count stored in a cell previously pushed by `push`.
///
/// # Safety
/// `cell` must currently be linked by `push`'s two-word layout.
pub unsafe fn granules_at(cell: Address) -> usize {
    Tag::read(cell).free_granules()
}

/// Unlink the first cell on a `push`-linked list with at least `needed`
/// granules. Returns the cell and its granule count.
///
/// # Safety
/// The list must only contain valid two-word cells pushed by `push`.
pub unsafe fn take_first_fit(head: &mut Option<Address>, needed: usize) -> Option<(Address, usize)> {
    let mut prev: Option<Address> = None;
    let mut cur = *head;
    while let Some(cell) = cur {
        let next_raw = (cell + GRANULE_SIZE).load_usize();
        let next = (next_raw != 0).then(|| Address::from_usize(next_raw));
        let granules = granules_at(cell);
        if granules >= needed {
            match prev {
                Some(p) => (p + GRANULE_SIZE).store_usize(next.map_or(0, Address::as_usize)),
                None => *head = next,
            }
            return Some((cell, granules));
        }
        prev = Some(cell);
        cur = next;
    }
    None
}
