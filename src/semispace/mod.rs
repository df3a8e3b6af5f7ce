//! The semi-space copying collector: a bump-pointer nursery that flips
//! between two halves of one mapping, with no free-list or sweep phase
//! at all.

pub mod space;

use crate::error::GcInitError;
use crate::handle::RootChain;
use crate::object_model::ObjectModel;
use crate::util::ObjectReference;
use space::SemiSpace;

/// A self-contained semi-space heap with its single mutator's root
/// chain. There is no separate mutator-local allocation state to speak
/// of: every allocation is a bump of `hp`, so there is nothing to
/// refill.
pub struct SemiSpaceHeap<OM: ObjectModel> {
    space: SemiSpace<OM>,
    roots: RootChain,
}

impl<OM: ObjectModel> SemiSpaceHeap<OM> {
    pub fn new(heap_size: usize) -> Result<SemiSpaceHeap<OM>, GcInitError> {
        Ok(SemiSpaceHeap {
            space: SemiSpace::new(heap_size)?,
            roots: RootChain::default(),
        })
    }

    pub fn allocate(&mut self, kind: OM::Kind, size: usize) -> ObjectReference {
        self.space.allocate(&mut self.roots, kind, size)
    }

    pub(crate) fn roots_mut(&mut self) -> &mut RootChain {
        &mut self.roots
    }

    pub fn force_collect(&mut self, bytes: usize) {
        self.space.collect(&mut self.roots, bytes);
    }

    pub fn collection_count(&self) -> u64 {
        self.space.collection_count()
    }

    pub fn heap_size(&self) -> usize {
        self.space.heap_size()
    }
}
