//! A family of pluggable tracing garbage collectors behind one
//! mutator-facing API: a mark-byte mark-sweep design, an earlier
//! bit-packed-header mark-sweep design kept for comparison, and a
//! Cheney-style semi-space copying collector. A client supplies its own
//! type system through the [`object_model`] hooks and picks a collector
//! `Variant` at [`api::initialize_gc`] time.

pub mod api;
pub mod error;
pub mod freelist;
pub mod handle;
pub mod header;
pub mod legacy;
pub mod marker;
pub mod marksweep;
pub mod object_model;
pub mod semispace;
pub mod size_class;
pub mod util;

pub use api::{
    allocate, allocate_pointerless, finish_gc_for_thread, get_field, init_field, initialize_gc,
    initialize_gc_for_thread, print_end_gc_stats, print_start_gc_stats, set_field, with_handle, GcHeap, Variant,
};
pub use error::GcInitError;
pub use handle::Handle;
pub use marker::MarkerMode;
pub use object_model::{AllocKind, ObjectModel};
pub use util::{Address, ObjectReference};
