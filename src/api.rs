//! The mutator-facing API, the one surface shared by all three collector
//! variants. A host picks a variant once at `initialize_gc` time; every
//! other call is identical regardless of which backend ends up behind
//! it.

use crate::error::GcInitError;
use crate::handle::Handle;
use crate::legacy::LegacyHeap;
use crate::marker::MarkerMode;
use crate::marksweep::MarkSweepHeap;
use crate::object_model::{AllocKind, ObjectModel};
use crate::semispace::SemiSpaceHeap;
use crate::util::Address;
use crate::util::ObjectReference;

/// Which collector algorithm backs a heap. Chosen once at
/// `initialize_gc` and fixed for the heap's lifetime.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Variant {
    /// Segregated free-lists, external mark-byte table, serial or
    /// parallel worklist tracing.
    MarkSweep { marker_mode: MarkerMode },
    /// Bit-packed tag-word headers, a dedicated tiny-object list, a
    /// sweeper that coalesces free runs across class boundaries.
    Legacy { marker_mode: MarkerMode },
    /// Cheney-style two-space copying collector.
    SemiSpace,
}

impl Variant {
    /// A mark-sweep variant tracing with one worker per available core.
    pub fn mark_sweep_parallel() -> Variant {
        Variant::MarkSweep {
            marker_mode: MarkerMode::Parallel(num_cpus::get()),
        }
    }

    /// A legacy variant tracing with one worker per available core.
    pub fn legacy_parallel() -> Variant {
        Variant::Legacy {
            marker_mode: MarkerMode::Parallel(num_cpus::get()),
        }
    }
}

/// A garbage-collected heap, generic over the client's type system and
/// backed by whichever collector `Variant` it was created with.
pub enum GcHeap<OM: ObjectModel> {
    MarkSweep(MarkSweepHeap<OM>),
    Legacy(LegacyHeap<OM>),
    SemiSpace(SemiSpaceHeap<OM>),
}

/// Reserve a heap of at least `heap_size` bytes and initialize logging.
/// The only fallible step is reserving the backing mapping; everything
/// else the core can fail at past this point is a programming error and
/// aborts instead.
pub fn initialize_gc<OM: ObjectModel>(variant: Variant, heap_size: usize) -> Result<GcHeap<OM>, GcInitError> {
    crate::util::logger::try_init();
    log::info!("initializing gc heap: {heap_size} bytes, variant {variant:?}");
    Ok(match variant {
        Variant::MarkSweep { marker_mode } => GcHeap::MarkSweep(MarkSweepHeap::new(heap_size, marker_mode)?),
        Variant::Legacy { marker_mode } => GcHeap::Legacy(LegacyHeap::new(heap_size, marker_mode)?),
        Variant::SemiSpace => GcHeap::SemiSpace(SemiSpaceHeap::new(heap_size)?),
    })
}

/// A second mutator thread for the same heap. Not supported: every
/// variant here assumes a single mutator driving allocation and
/// supplying roots.
pub fn initialize_gc_for_thread<OM: ObjectModel>(_heap: &GcHeap<OM>) {
    panic!("Multiple mutator threads not yet implemented");
}

/// The mirror image of `initialize_gc_for_thread`; a no-op until that
/// call does something besides panic.
pub fn finish_gc_for_thread<OM: ObjectModel>(_heap: &GcHeap<OM>) {}

pub fn allocate<OM: ObjectModel>(heap: &mut GcHeap<OM>, kind: OM::Kind, size: usize) -> ObjectReference {
    match heap {
        GcHeap::MarkSweep(h) => h.allocate(kind, size),
        GcHeap::Legacy(h) => h.allocate(kind, size),
        GcHeap::SemiSpace(h) => h.allocate(kind, size),
    }
}

/// Allocate an object of a kind the client has declared pointer-free.
/// Behaviorally identical to `allocate` today — every variant still
/// traces a pointer-free object, just doing no work in `visit_fields` —
/// but kept as its own entry point so a future pointer-free sub-heap can
/// hang off this call without changing callers.
pub fn allocate_pointerless<OM: ObjectModel>(heap: &mut GcHeap<OM>, kind: OM::Kind, size: usize) -> ObjectReference {
    debug_assert!(kind.is_pointerless(), "allocate_pointerless called with a kind that holds references");
    allocate(heap, kind, size)
}

/// Push a handle holding `v` onto the heap's root chain, run `f` with it
/// live (so further allocation inside `f` still sees `v` as a root), then
/// pop it back off.
///
/// The link and unlink each take their own short-lived borrow of the
/// heap's root chain; neither is held across the call to `f`, so `f` gets
/// `heap` back with no outstanding borrow and the chain it sees mid-`f`
/// is the real one, not a detached copy. This matters: a collection
/// triggered by an allocation inside `f` has to trace `v` (and every
/// handle still open in an enclosing `with_handle`), not an empty chain.
pub fn with_handle<OM: ObjectModel, R>(
    heap: &mut GcHeap<OM>,
    v: Address,
    f: impl FnOnce(&mut GcHeap<OM>, &mut Handle) -> R,
) -> R {
    let mut handle = Handle::new(v);
    match heap {
        GcHeap::MarkSweep(h) => h.roots_mut().link(&mut handle),
        GcHeap::Legacy(h) => h.roots_mut().link(&mut handle),
        GcHeap::SemiSpace(h) => h.roots_mut().link(&mut handle),
    }
    let result = f(heap, &mut handle);
    match heap {
        GcHeap::MarkSweep(h) => h.roots_mut().unlink(&handle),
        GcHeap::Legacy(h) => h.roots_mut().unlink(&handle),
        GcHeap::SemiSpace(h) => h.roots_mut().unlink(&handle),
    }
    result
}

/// Write a reference-typed field for the first time (no old value to
/// retire). Identical to `set_field` here since none of these variants
/// use a write barrier.
///
/// # Safety
/// `slot` must be a mapped, word-aligned field inside a live object.
pub unsafe fn init_field(slot: Address, val: Address) {
    slot.store_usize(val.as_usize());
}

/// # Safety
/// `slot` must be a mapped, word-aligned field inside a live object.
pub unsafe fn set_field(slot: Address, val: Address) {
    slot.store_usize(val.as_usize());
}

/// # Safety
/// `slot` must be a mapped, word-aligned field inside a live object.
pub unsafe fn get_field(slot: Address) -> Address {
    Address::from_usize(slot.load_usize())
}

pub fn print_start_gc_stats<OM: ObjectModel>(_heap: &GcHeap<OM>) {}

pub fn print_end_gc_stats<OM: ObjectModel>(heap: &GcHeap<OM>) {
    let (collections, heap_size, with_overhead) = match heap {
        GcHeap::MarkSweep(h) => (h.collection_count(), h.heap_size(), true),
        GcHeap::Legacy(h) => (h.collection_count(), h.heap_size(), true),
        GcHeap::SemiSpace(h) => (h.collection_count(), h.heap_size(), false),
    };
    log::info!("completed {collections} collections, heap size {heap_size}");
    println!("Completed {collections} collections");
    if with_overhead {
        println!("Heap size with overhead is {heap_size}");
    } else {
        println!("Heap size is {heap_size}");
    }
}
