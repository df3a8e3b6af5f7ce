//! Cheney-style semi-space collector: the heap is split into two equal
//! halves, and a collection flips which half is live, copies everything
//! reachable from the roots into the new half, then scans the copied
//! region breadth-first — the scan cursor trailing the allocation
//! pointer is itself the worklist, so no separate mark stack exists.
//!
//! An object's first word doubles as its tag: while the object lives in
//! from-space the word holds its `alloc_kind` (a small integer); once
//! copied, the from-space copy's first word is overwritten with the
//! to-space address, so the same word also serves as the forwarding
//! pointer. The two interpretations never collide because every
//! `alloc_kind` fits in a byte and the smallest mapped heap address is
//! always larger than that.

use crate::error::GcInitError;
use crate::handle::RootChain;
use crate::object_model::{AllocKind, ObjectModel};
use crate::util::conversions::align_up;
use crate::util::{memory, Address, ObjectReference};
use std::marker::PhantomData;

const ALIGNMENT: usize = 8;
/// Header words below this value are an `alloc_kind`, not an address: no
/// heap this collector manages is ever mapped into the first page of the
/// address space, so a forwarding pointer is always larger.
const KIND_TAG_LIMIT: usize = 256;

pub struct SemiSpace<OM: ObjectModel> {
    hp: Address,
    limit: Address,
    base: Address,
    size: usize,
    count: i64,
    _kind: PhantomData<OM>,
}

impl<OM: ObjectModel> SemiSpace<OM> {
    pub fn new(requested_heap_size: usize) -> Result<SemiSpace<OM>, GcInitError> {
        let page = memory::page_size();
        let size = align_up(requested_heap_size, page);
        let base = memory::mmap_anon(size)?;
        log::debug!("reserved semi-space heap: {size} bytes");
        let mut space = SemiSpace {
            hp: base,
            limit: base,
            base,
            size,
            count: -1,
            _kind: PhantomData,
        };
        space.flip();
        Ok(space)
    }

    pub fn heap_base(&self) -> Address {
        self.base
    }

    pub fn heap_size(&self) -> usize {
        self.size
    }

    pub fn collection_count(&self) -> u64 {
        self.count.max(0) as u64
    }

    fn flip(&mut self) {
        let split = self.base + (self.size >> 1);
        if self.hp <= split {
            self.hp = split;
            self.limit = self.base + self.size;
        } else {
            self.hp = self.base;
            self.limit = split;
        }
        self.count += 1;
    }

    fn copy(&mut self, kind: OM::Kind, obj: Address) -> Address {
        let object = ObjectReference::from_address(obj);
        let size = OM::size(kind, object);
        let new_obj = self.hp;
        unsafe {
            obj.copy_to(new_obj, size);
            obj.store_usize(new_obj.as_usize());
        }
        self.hp += align_up(size, ALIGNMENT);
        new_obj
    }

    fn forward(&mut self, obj: Address) -> Address {
        let word = unsafe { obj.load_usize() };
        if word < KIND_TAG_LIMIT {
            let kind = OM::Kind::from_u8(word as u8).unwrap_or_else(|| panic!("malformed object tag at {obj:?}"));
            self.copy(kind, obj)
        } else {
            Address::from_usize(word)
        }
    }

    fn process(&mut self, slot: Address) {
        let raw = unsafe { slot.load_usize() };
        if raw != 0 {
            let new_addr = self.forward(Address::from_usize(raw));
            unsafe {
                slot.store_usize(new_addr.as_usize());
            }
        }
    }

    fn scan(&mut self, grey: Address) -> Address {
        let obj = ObjectReference::from_address(grey);
        let word = unsafe { grey.load_usize() };
        let kind = OM::Kind::from_u8(word as u8).unwrap_or_else(|| panic!("malformed object tag at {grey:?}"));
        let size = OM::size(kind, obj);
        let mut fields = Vec::new();
        OM::visit_fields(kind, obj, &mut |slot: Address| fields.push(slot));
        for slot in fields {
            self.process(slot);
        }
        grey + align_up(size, ALIGNMENT)
    }

    /// Flip, forward every root, then scan the freshly copied region
    /// until the scan cursor catches up with the allocation pointer.
    /// Panics if the flipped half still can't satisfy `bytes` once
    /// everything live has been copied.
    pub fn collect(&mut self, roots: &mut RootChain, bytes: usize) {
        log::debug!("semi-space collection #{} starting", self.count + 1);
        self.flip();
        let mut grey = self.hp;
        roots.for_each_mut(|addr| {
            if !addr.is_zero() {
                *addr = self.forward(*addr);
            }
        });
        while grey < self.hp {
            grey = self.scan(grey);
        }
        if ((self.limit - self.hp) as usize) < bytes {
            panic!("ran out of space, heap size {}", self.size);
        }
        log::debug!("semi-space collection #{} complete", self.count);
    }

    pub fn allocate(&mut self, roots: &mut RootChain, kind: OM::Kind, size: usize) -> ObjectReference {
        loop {
            let addr = self.hp;
            let new_hp = Address::from_usize(align_up(addr.as_usize() + size, ALIGNMENT));
            if self.limit < new_hp {
                self.collect(roots, size);
                continue;
            }
            self.hp = new_hp;
            let header = std::mem::size_of::<usize>();
            unsafe {
                addr.store_usize(kind.to_u8() as usize);
                if !kind.is_pointerless() && size > header {
                    (addr + header).zero(size - header);
                }
            }
            return ObjectReference::from_address(addr);
        }
    }
}

impl<OM: ObjectModel> Drop for SemiSpace<OM> {
    fn drop(&mut self) {
        let _ = memory::munmap(self.base, self.size);
    }
}
