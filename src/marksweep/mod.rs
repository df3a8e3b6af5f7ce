//! The mark-byte mark-sweep collector: segregated free-lists for small
//! objects, an unordered list for large ones, and a mark-byte table
//! external to the object headers.

pub mod allocator;
pub mod space;
pub mod sweep;

use crate::error::GcInitError;
use crate::handle::RootChain;
use crate::marker::MarkerMode;
use crate::object_model::ObjectModel;
use crate::util::ObjectReference;
use allocator::MutatorState;
use space::MarkSweepSpace;

/// A self-contained mark-sweep heap with its single mutator's local
/// state. Multiple mutator threads are out of scope for this core; see
/// `initialize_gc_for_thread` in `crate::api`.
pub struct MarkSweepHeap<OM: ObjectModel> {
    space: MarkSweepSpace<OM>,
    mutator: MutatorState,
}

impl<OM: ObjectModel> MarkSweepHeap<OM> {
    pub fn new(heap_size: usize, marker_mode: MarkerMode) -> Result<MarkSweepHeap<OM>, GcInitError> {
        Ok(MarkSweepHeap {
            space: MarkSweepSpace::new(heap_size, marker_mode)?,
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
