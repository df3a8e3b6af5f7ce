//! The mark-byte mark-sweep heap: one mmap region holding an external
//! mark-byte table followed by the object-bearing heap, plus the
//! space-global free-lists, sweep cursor and marker.

use crate::error::GcInitError;
use crate::freelist::{LargeFreeList, SmallFreeLists};
use crate::header::Tag;
use crate::marker::{Marker, MarkerMode, Traceable};
use crate::marksweep::allocator::MutatorState;
use crate::object_model::ObjectModel;
use crate::util::constants::GRANULE_SIZE;
use crate::util::conversions::align_up;
use crate::util::{memory, Address, ObjectReference};
use std::marker::PhantomData;
use std::sync::atomic::Ordering;

/// One mark byte per granule, followed by the heap: mark table of `n`
/// bytes and a heap of `8n` bytes share a mapping of `9n` bytes, so the
/// table is sized as `ceil(mem_size / 9)`.
fn layout(mem_size: usize) -> (usize, usize) {
    let mark_bytes_size = (mem_size + GRANULE_SIZE) / (GRANULE_SIZE + 1);
    let heap_base_offset = align_up(mark_bytes_size, GRANULE_SIZE);
    (mark_bytes_size, heap_base_offset)
}

pub struct MarkSweepSpace<OM: ObjectModel> {
    mem: Address,
    mem_size: usize,
    mark_bytes: Address,
    heap_base: Address,
    heap_size: usize,
    pub(crate) sweep: Address,
    pub(crate) small_objects: SmallFreeLists,
    pub(crate) large_objects: LargeFreeList,
    count: u64,
    marker: Option<Marker>,
    _kind: PhantomData<OM>,
}

impl<OM: ObjectModel> MarkSweepSpace<OM> {
    /// Reserve a mapping large enough to give at least `requested_heap_size`
    /// bytes of usable (post mark-table) heap, rounded to whole pages.
    pub fn new(requested_heap_size: usize, marker_mode: MarkerMode) -> Result<MarkSweepSpace<OM>, GcInitError> {
        let page = memory::page_size();
        let mut mem_size = align_up(requested_heap_size + requested_heap_size / 8 + page, page);
        loop {
            let (_, heap_base_offset) = layout(mem_size);
            if mem_size - heap_base_offset >= requested_heap_size {
                break;
            }
            mem_size = align_up(mem_size + mem_size / 4 + page, page);
        }
        let mem = memory::mmap_anon(mem_size)?;
        let (mark_bytes_size, heap_base_offset) = layout(mem_size);
        let heap_base = mem + heap_base_offset;
        let heap_size = mem_size - heap_base_offset;
        log::debug!(
            "reserved mark-sweep heap: {mem_size} bytes mapped, {mark_bytes_size} mark-byte, {heap_size} usable"
        );
        Ok(MarkSweepSpace {
            mem,
            mem_size,
            mark_bytes: mem,
            heap_base,
            heap_size,
            sweep: heap_base,
            small_objects: SmallFreeLists::new(),
            large_objects: LargeFreeList::new(),
            count: 0,
            marker: Some(Marker::new(marker_mode)),
            _kind: PhantomData,
        })
    }

    pub fn heap_base(&self) -> Address {
        self.heap_base
    }

    pub fn heap_size(&self) -> usize {
        self.heap_size
    }

    pub fn heap_end(&self) -> Address {
        self.heap_base + self.heap_size
    }

    pub fn collection_count(&self) -> u64 {
        self.count
    }

    pub(crate) fn mark_byte_address(&self, addr: Address) -> Address {
        let offset = addr - self.heap_base;
        debug_assert!(offset >= 0);
        self.mark_bytes + (offset as usize / GRANULE_SIZE)
    }

    /// Clear a live object's mark byte as the sweeper passes over it. Not
    /// atomic: sweeping only ever runs with the mutator stopped and no
    /// tracing in progress.
    pub(crate) unsafe fn clear_mark(&self, obj: ObjectReference) {
        self.mark_byte_address(obj.to_address()).store_u8(0);
    }

    pub(crate) unsafe fn mark_byte_at(&self, addr: Address) -> &std::sync::atomic::AtomicU8 {
        self.mark_byte_address(addr).as_atomic_u8()
    }

    pub(crate) fn kind_of_tag(&self, obj: ObjectReference) -> OM::Kind {
        let tag = unsafe { Tag::read(obj.to_address()) };
        tag.alloc_kind::<OM::Kind>()
            .unwrap_or_else(|| panic!("malformed object tag at {:?}", obj.to_address()))
    }

    /// Run a full collection cycle: trace from `mutator`'s roots, then
    /// reset the sweeper and free-lists so the next allocation walks an
    /// unswept heap.
    pub fn collect(&mut self, mutator: &mut MutatorState) {
        self.count += 1;
        log::debug!("mark-sweep collection #{} starting", self.count);

        let mut marker = self.marker.take().expect("marker missing during collection");
        marker.prepare();
        mutator.mark_buffer.clear();
        mutator.roots.for_each(|addr| {
            if !addr.is_zero() {
                let obj = ObjectReference::from_address(addr);
                if self.try_mark(obj) {
                    mutator.mark_buffer.push(obj);
                }
            }
        });
        marker.enqueue_roots(mutator.mark_buffer.as_slice());
        marker.trace::<OM, Self>(self);
        self.marker = Some(marker);

        mutator.mark_buffer.release();
        self.small_objects.clear();
        self.large_objects = LargeFreeList::new();
        self.sweep = self.heap_base;
        mutator.small_objects.clear();
        log::debug!("mark-sweep collection #{} complete", self.count);
    }
}

impl<OM: ObjectModel> Traceable<OM> for MarkSweepSpace<OM> {
    fn try_mark(&self, obj: ObjectReference) -> bool {
        let byte = unsafe { self.mark_byte_at(obj.to_address()) };
        byte.compare_exchange(0, 1, Ordering::AcqRel, Ordering::Relaxed).is_ok()
    }

    fn kind_of(&self, obj: ObjectReference) -> OM::Kind {
        self.kind_of_tag(obj)
    }
}

impl<OM: ObjectModel> Drop for MarkSweepSpace<OM> {
    fn drop(&mut self) {
        let _ = memory::munmap(self.mem, self.mem_size);
    }
}
