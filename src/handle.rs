//! Root set / handles: the mutator's stack-resident chain of live
//! references, and the per-mutator mark buffer that collects the objects
//! seen reachable from that chain during a cycle.
//!
//! The handle chain mirrors a `struct handle { struct handle *next; void
//! *v; }` root stack: a mutator prepends a handle on scope entry and
//! unlinks it on exit. Rust expresses "prepend on entry, unlink on exit"
//! as a scope callback rather than a `Drop` guard, because the chain is
//! self-referential (each handle points at the previous head) and a
//! callback keeps the whole chain provably stack-disciplined without
//! `unsafe` pointer bookkeeping leaking into callers.

use crate::util::memory;
use crate::util::{Address, ObjectReference};

/// One entry in a mutator's root chain.
pub struct Handle {
    next: *mut Handle,
    v: Address,
}

impl Handle {
    /// An unlinked handle holding `v`. Not yet part of any chain until
    /// `RootChain::link` splices it in.
    pub(crate) fn new(v: Address) -> Handle {
        Handle {
            next: std::ptr::null_mut(),
            v,
        }
    }

    /// The value currently held live by this handle, or the null address
    /// if it was never initialized or was explicitly cleared.
    pub fn get(&self) -> Address {
        self.v
    }

    pub fn set(&mut self, v: Address) {
        self.v = v;
    }
}

/// The head of a mutator's handle chain.
pub struct RootChain {
    head: *mut Handle,
}

impl Default for RootChain {
    fn default() -> Self {
        RootChain {
            head: std::ptr::null_mut(),
        }
    }
}

impl RootChain {
    /// Push a new handle holding `v` onto the chain, run `f` with it
    /// live, then pop it back off. This is the Rust equivalent of
    /// entering and leaving the handle's C scope.
    pub fn with_handle<R>(&mut self, v: Address, f: impl FnOnce(&mut Self, &mut Handle) -> R) -> R {
        let mut handle = Handle {
            next: self.head,
            v,
        };
        self.head = &mut handle as *mut Handle;
        let result = f(self, &mut handle);
        self.head = handle.next;
        result
    }

    /// Splice `handle` onto the front of the chain in place, recording
    /// the chain's previous head in `handle.next` so `unlink` can restore
    /// it. Unlike `with_handle`, this does not hold any borrow of `self`
    /// across the scope `handle` is meant to stay live for — callers that
    /// also need a separate mutable borrow of whatever owns this chain
    /// during that scope (see `crate::api::with_handle`) call this,
    /// release the borrow of `self`, do their work, then reborrow `self`
    /// for `unlink`.
    pub(crate) fn link(&mut self, handle: &mut Handle) {
        handle.next = self.head;
        self.head = handle as *mut Handle;
    }

    /// Undo `link`, restoring the chain's head to what it was before
    /// `handle` was spliced in.
    pub(crate) fn unlink(&mut self, handle: &Handle) {
        self.head = handle.next;
    }

    /// Walk the chain, calling `visit` with each live handle's current
    /// value. Used by `mark_mutator_roots`.
    pub fn for_each(&self, mut visit: impl FnMut(Address)) {
        let mut cur = self.head;
        while let Some(h) = unsafe { cur.as_ref() } {
            if !h.v.is_zero() {
                visit(h.v);
            }
            cur = h.next;
        }
    }

    /// Rewrite every live handle's value in place. Used by the
    /// semi-space collector to forward roots.
    pub fn for_each_mut(&mut self, mut visit: impl FnMut(&mut Address)) {
        let mut cur = self.head;
        while let Some(h) = unsafe { cur.as_mut() } {
            if !h.v.is_zero() {
                visit(&mut h.v);
            }
            cur = h.next;
        }
    }
}

/// A mutator's local mark buffer: the set of objects this mutator
/// observed reachable from its own root chain during the current cycle.
/// Backed by its own anonymous mapping rather than the general-purpose
/// allocator, doubling on overflow and releasing via `MADV_DONTNEED` so
/// repeated cycles can reuse the pages.
pub struct MarkBuffer {
    mem: Address,
    capacity: usize, // in words
    len: usize,
}

const WORD_SIZE: usize = std::mem::size_of::<usize>();

impl MarkBuffer {
    pub fn new() -> MarkBuffer {
        let page = memory::page_size();
        let mem = memory::mmap_anon(page).expect("allocating mutator mark buffer failed");
        MarkBuffer {
            mem,
            capacity: page / WORD_SIZE,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn push(&mut self, obj: ObjectReference) {
        if self.len == self.capacity {
            self.grow();
        }
        unsafe {
            (self.mem + self.len * WORD_SIZE).store_usize(obj.to_address().as_usize());
        }
        self.len += 1;
    }

    fn grow(&mut self) {
        let new_capacity = self.capacity * 2;
        let new_mem =
            memory::mmap_anon(new_capacity * WORD_SIZE).expect("allocating mutator mark buffer failed");
        unsafe {
            self.mem.copy_to(new_mem, self.len * WORD_SIZE);
        }
        let _ = memory::munmap(self.mem, self.capacity * WORD_SIZE);
        self.mem = new_mem;
        self.capacity = new_capacity;
    }

    pub fn as_slice(&self) -> &[ObjectReference] {
        unsafe { std::slice::from_raw_parts(self.mem.to_ptr(), self.len) }
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Return the mapping's pages to the OS without unmapping, so the
    /// buffer can be reused next cycle at the cost of the kernel
    /// re-zeroing on next touch.
    pub fn release(&mut self) {
        let _ = memory::madvise_dont_need(self.mem, self.capacity * WORD_SIZE);
        self.len = 0;
    }
}

impl Default for MarkBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MarkBuffer {
    fn drop(&mut self) {
        let _ = memory::munmap(self.mem, self.capacity * WORD_SIZE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_pushes_and_pops_in_scope() {
        let mut chain = RootChain::default();
        let a = Address::from_usize(0x1000);
        chain.with_handle(a, |chain, _h| {
            let mut seen = vec![];
            chain.for_each(|v| seen.push(v));
            assert_eq!(seen, vec![a]);
        });
        let mut seen = vec![];
        chain.for_each(|v| seen.push(v));
        assert!(seen.is_empty());
    }

    #[test]
    fn nested_handles_form_a_chain() {
        let mut chain = RootChain::default();
        let a = Address::from_usize(0x1000);
        let b = Address::from_usize(0x2000);
        chain.with_handle(a, |chain, _| {
            chain.with_handle(b, |chain, _| {
                let mut seen = vec![];
                chain.for_each(|v| seen.push(v));
                assert_eq!(seen, vec![b, a]);
            });
        });
    }

    #[test]
    fn mark_buffer_grows_past_one_page() {
        let mut buf = MarkBuffer::new();
        let n = buf.capacity * 3 + 1;
        for i in 0..n {
            buf.push(ObjectReference::from_address(Address::from_usize(
                0x10000 + i * 8,
            )));
        }
        assert_eq!(buf.len(), n);
        assert_eq!(buf.as_slice().len(), n);
    }
}
