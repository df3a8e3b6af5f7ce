//! The legacy mark-sweep collector: bit-packed headers with no external
//! mark table, a tiny-object list standing in for the smallest size
//! class, and a sweeper that coalesces adjacent free cells across class
//! boundaries rather than keeping per-class reclaim accounting.

pub mod allocator;
pub mod freelist;
pub mod header;
pub mod space;
pub mod sweep;

use crate::error::GcInitError;
use crate::handle::RootChain;
use crate::marker::MarkerMode;
use crate::object_model::ObjectModel;
use crate::util::ObjectReference;
use allocator::MutatorState;
use space::LegacySpace;

/// A self-contained legacy heap with its single mutator's local state.
pub struct LegacyHeap<OM: ObjectModel> {
    space: LegacySpace<OM>,
    mutator: MutatorState,
}

impl<OM: ObjectModel> LegacyHeap<OM> {
    pub fn new(heap_size: usize, marker_mode: MarkerMode) -> Result<LegacyHeap<OM>, GcInitError> {
        Ok(LegacyHeap {
            space: LegacySpace::new(heap_size, marker_mode)?,
            mutator: MutatorState::new(),
        })
    }

    pub fn allocate(&mut self, kind: OM::Kind, size: usize) -> ObjectReference {
        allocator::allocate(&mut self.space, &mut self.mutator, kind, size)
    }

    pub(crate) fn roots_mut(&mut self) -> &mut RootChain {
        &mut self.mutator.roots
    }

    pub fn force_collect(&mut self) {
        self.space.collect(&mut self.mutator);
    }

    pub fn collection_count(&self) -> u64 {
        self.space.collection_count()
    }

    pub fn heap_size(&self) -> usize {
        self.space.heap_size()
    }
}
