//! Shared test fixture: a tiny two-kind object model used by every
//! scenario test. `Node` is a two-field cons cell; `DoubleArray` is a
//! variable-length, pointer-free vector of `f64`s with its length
//! stored inline.

use granule_gc::{Address, AllocKind, ObjectModel, ObjectReference};

#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum Kind {
    Node,
    DoubleArray,
    /// A single tag word and nothing else — the smallest object this
    /// model can describe, used to land in a one-granule cell.
    Unit,
}

impl AllocKind for Kind {
    fn to_u8(self) -> u8 {
        match self {
            Kind::Node => 0,
            Kind::DoubleArray => 1,
            Kind::Unit => 2,
        }
    }

    fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(Kind::Node),
            1 => Some(Kind::DoubleArray),
            2 => Some(Kind::Unit),
            _ => None,
        }
    }

    fn is_pointerless(self) -> bool {
        matches!(self, Kind::DoubleArray | Kind::Unit)
    }
}

pub struct TestOM;

pub const NODE_SIZE: usize = 24; // tag + car + cdr
pub const UNIT_SIZE: usize = 8; // tag only

pub fn array_size(len: usize) -> usize {
    16 + len * 8 // tag + len + len*f64
}

pub fn car_slot(obj: ObjectReference) -> Address {
    obj.to_address() + 8
}

pub fn cdr_slot(obj: ObjectReference) -> Address {
    obj.to_address() + 16
}

fn array_len_slot(obj: ObjectReference) -> Address {
    obj.to_address() + 8
}

fn array_data_slot(obj: ObjectReference, i: usize) -> Address {
    obj.to_address() + 16 + i * 8
}

/// # Safety
/// `slot` must be a freshly allocated non-reference field that no tracer
/// will interpret as a pointer.
pub unsafe fn write_len(obj: ObjectReference, len: usize) {
    array_len_slot(obj).store_usize(len);
}

pub unsafe fn read_len(obj: ObjectReference) -> usize {
    array_len_slot(obj).load_usize()
}

pub unsafe fn write_double(obj: ObjectReference, i: usize, v: f64) {
    array_data_slot(obj, i).store_usize(v.to_bits() as usize);
}

pub unsafe fn read_double(obj: ObjectReference, i: usize) -> f64 {
    f64::from_bits(array_data_slot(obj, i).load_usize() as u64)
}

impl ObjectModel for TestOM {
    type Kind = Kind;

    fn size(kind: Kind, object: ObjectReference) -> usize {
        match kind {
            Kind::Node => NODE_SIZE,
            Kind::DoubleArray => array_size(unsafe { read_len(object) }),
            Kind::Unit => UNIT_SIZE,
        }
    }

    fn visit_fields<F: FnMut(Address)>(kind: Kind, object: ObjectReference, visitor: &mut F) {
        if let Kind::Node = kind {
            visitor(car_slot(object));
            visitor(cdr_slot(object));
        }
    }
}
