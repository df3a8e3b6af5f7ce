//! The legacy heap: a single mmap region with no external mark table —
//! every mark lives in its object's own tag word — a tiny-object list, a
//! 9-way segregated small-object array, and an unordered large list.

use crate::error::GcInitError;
use crate::legacy::allocator::MutatorState;
use crate::legacy::header::Tag;
use crate::marker::{Marker, MarkerMode, Traceable};
use crate::object_model::ObjectModel;
use crate::util::conversions::{align_up, size_to_granules};
use crate::util::{memory, Address, ObjectReference};

/// The small-object size classes the legacy design recognises, distinct
/// from the mark-byte design's table: it excludes the 1-granule class
/// (handled separately as "tiny") and otherwise matches.
pub const SMALL_OBJECT_GRANULES: [u8; 9] = [2, 3, 4, 5, 6, 8, 10, 16, 32];
pub const NUM_SMALL_OBJECT_CLASSES: usize = SMALL_OBJECT_GRANULES.len();
pub const LARGE_OBJECT_GRANULE_THRESHOLD: usize = 32;

/// Round a granule count of 2..=32 up to its class index. Panics outside
/// that range; callers dispatch tiny (`<=1`) and large (`>32`) requests
/// before reaching this table.
pub fn granules_to_small_class(granules: usize) -> usize {
    SMALL_OBJECT_GRANULES
        .iter()
        .position(|&g| g as usize >= granules)
        .unwrap_or_else(|| panic!("granule count {granules} has no legacy small class"))
}

pub struct LegacySpace<OM: ObjectModel> {
    mem: Address,
    mem_size: usize,
    heap_base: Address,
    heap_size: usize,
    pub(crate) sweep: Address,
    pub(crate) tiny_objects: Option<Address>,
    pub(crate) small_objects: [Option<Address>; NUM_SMALL_OBJECT_CLASSES],
    pub(crate) large_objects: Option<Address>,
    count: u64,
    marker: Option<Marker>,
    _kind: std::marker::PhantomData<OM>,
}

impl<OM: ObjectModel> LegacySpace<OM> {
    pub fn new(requested_heap_size: usize, marker_mode: MarkerMode) -> Result<LegacySpace<OM>, GcInitError> {
        let page = memory::page_size();
        let mem_size = align_up(requested_heap_size, page);
        let mem = memory::mmap_anon(mem_size)?;
        log::debug!("reserved legacy mark-sweep heap: {mem_size} bytes");
        let mut space = LegacySpace {
            mem,
            mem_size,
            heap_base: mem,
            heap_size: mem_size,
            sweep: mem + mem_size,
            tiny_objects: None,
            small_objects: [None; NUM_SMALL_OBJECT_CLASSES],
            large_objects: None,
            count: 0,
            marker: Some(Marker::new(marker_mode)),
            _kind: std::marker::PhantomData,
        };
        unsafe {
            crate::legacy::allocator::reclaim(&mut space, mem, size_to_granules(mem_size));
        }
        Ok(space)
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

    pub(crate) fn kind_of_tag(&self, obj: ObjectReference) -> OM::Kind {
        let tag = unsafe { Tag::read(obj.to_address()) };
        tag.alloc_kind::<OM::Kind>()
            .unwrap_or_else(|| panic!("malformed object tag at {:?}", obj.to_address()))
    }

    fn clear_freelists(&mut self) {
        self.tiny_objects = None;
        self.small_objects = [None; NUM_SMALL_OBJECT_CLASSES];
        self.large_objects = None;
    }

    /// Mark from `mutator`'s roots, reset the sweep cursor to the start
    /// of the heap, and drop every free-list: the legacy sweeper rebuilds
    /// them from scratch as it walks the (now entirely unswept) heap.
    pub fn collect(&mut self, mutator: &mut MutatorState) {
        self.count += 1;
        log::debug!("legacy mark-sweep collection #{} starting", self.count);

        let mut marker = self.marker.take().expect("marker missing during collection");
        marker.prepare();
        let mut roots = Vec::new();
        mutator.roots.for_each(|addr| {
            if !addr.is_zero() {
                let obj = ObjectReference::from_address(addr);
                if self.try_mark(obj) {
                    roots.push(obj);
                }
            }
        });
        marker.enqueue_roots(&roots);
        marker.trace::<OM, Self>(self);
        self.marker = Some(marker);

        self.sweep = self.heap_base;
        self.clear_freelists();
        log::debug!("legacy mark-sweep collection #{} complete", self.count);
    }
}

impl<OM: ObjectModel> Traceable<OM> for LegacySpace<OM> {
    fn try_mark(&self, obj: ObjectReference) -> bool {
        unsafe { crate::legacy::header::try_set_marked(obj.to_address()) }
    }

    fn kind_of(&self, obj: ObjectReference) -> OM::Kind {
        self.kind_of_tag(obj)
    }
}

impl<OM: ObjectModel> Drop for LegacySpace<OM> {
    fn drop(&mut self) {
        let _ = memory::munmap(self.mem, self.mem_size);
    }
}
