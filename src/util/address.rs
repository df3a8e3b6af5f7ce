//! A thin, zero-overhead wrapper around a raw address, used instead of bare
//! pointers so that allocator and sweeper code reads as arithmetic on
//! offsets rather than pointer casts.

use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};

/// An address inside (or one-past-the-end of) a heap region. `Address`
/// intentionally does not implement `Deref`; all reads/writes of heap
/// memory go through the explicit `load`/`store` helpers below, which are
/// `unsafe` because the heap is untyped raw memory.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, Hash, PartialOrd, Ord, PartialEq, Default)]
pub struct Address(usize);

impl Address {
    pub const ZERO: Address = Address(0);

    #[inline(always)]
    pub const fn from_usize(v: usize) -> Address {
        Address(v)
    }

    #[inline(always)]
    pub fn from_ptr<T>(ptr: *const T) -> Address {
        Address(ptr as usize)
    }

    #[inline(always)]
    pub fn from_mut_ptr<T>(ptr: *mut T) -> Address {
        Address(ptr as usize)
    }

    #[inline(always)]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    #[inline(always)]
    pub fn to_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    #[inline(always)]
    pub fn to_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }

    #[inline(always)]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline(always)]
    pub fn align_up(self, align: usize) -> Address {
        Address(super::conversions::align_up(self.0, align))
    }

    /// Read a `usize` at this address. The caller must ensure the address
    /// is within a mapped region and properly aligned.
    #[inline(always)]
    pub unsafe fn load_usize(self) -> usize {
        (self.0 as *const usize).read()
    }

    /// Store a `usize` at this address. See `load_usize` for safety.
    #[inline(always)]
    pub unsafe fn store_usize(self, v: usize) {
        (self.0 as *mut usize).write(v)
    }

    /// Read a single byte at this address. See `load_usize` for safety.
    #[inline(always)]
    pub unsafe fn load_u8(self) -> u8 {
        (self.0 as *const u8).read()
    }

    /// Store a single byte at this address. See `load_usize` for safety.
    #[inline(always)]
    pub unsafe fn store_u8(self, v: u8) {
        (self.0 as *mut u8).write(v)
    }

    /// View this address as an atomic byte cell, for winner-takes-it mark
    /// bits shared between tracing threads.
    ///
    /// # Safety
    /// Same requirements as `load_usize`, plus: every concurrent access to
    /// this byte for the lifetime `'a` must go through the returned
    /// reference (or another `AtomicU8` view of the same address).
    #[inline(always)]
    pub unsafe fn as_atomic_u8<'a>(self) -> &'a std::sync::atomic::AtomicU8 {
        &*(self.0 as *const std::sync::atomic::AtomicU8)
    }

    /// View this address as an atomic word, for header encodings that pack
    /// their mark bit into the tag word itself.
    ///
    /// # Safety
    /// Same requirements as `as_atomic_u8`.
    #[inline(always)]
    pub unsafe fn as_atomic_usize<'a>(self) -> &'a std::sync::atomic::AtomicUsize {
        &*(self.0 as *const std::sync::atomic::AtomicUsize)
    }

    /// Zero `len` bytes starting at this address. See `load_usize` for
    /// safety.
    #[inline(always)]
    pub unsafe fn zero(self, len: usize) {
        std::ptr::write_bytes(self.to_mut_ptr::<u8>(), 0, len);
    }

    /// Copy `len` bytes from `self` to `dst`. Regions must not overlap.
    /// See `load_usize` for safety.
    #[inline(always)]
    pub unsafe fn copy_to(self, dst: Address, len: usize) {
        std::ptr::copy_nonoverlapping(self.to_ptr::<u8>(), dst.to_mut_ptr::<u8>(), len);
    }
}

impl Add<usize> for Address {
    type Output = Address;
    #[inline(always)]
    fn add(self, rhs: usize) -> Address {
        Address(self.0 + rhs)
    }
}

impl AddAssign<usize> for Address {
    #[inline(always)]
    fn add_assign(&mut self, rhs: usize) {
        self.0 += rhs;
    }
}

impl Sub<usize> for Address {
    type Output = Address;
    #[inline(always)]
    fn sub(self, rhs: usize) -> Address {
        Address(self.0 - rhs)
    }
}

impl SubAssign<usize> for Address {
    #[inline(always)]
    fn sub_assign(&mut self, rhs: usize) {
        self.0 -= rhs;
    }
}

/// Address - Address = byte distance between the two (may be negative).
impl Sub<Address> for Address {
    type Output = isize;
    #[inline(always)]
    fn sub(self, rhs: Address) -> isize {
        self.0 as isize - rhs.0 as isize
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// An `Address` known to hold a live, tagged heap object. A thin marker
/// type so that signatures distinguish "some address" from "the start of
/// an object" without adding runtime cost.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, Hash, PartialOrd, Ord, PartialEq, Debug)]
pub struct ObjectReference(Address);

impl ObjectReference {
    #[inline(always)]
    pub fn from_address(addr: Address) -> ObjectReference {
        debug_assert!(!addr.is_zero());
        ObjectReference(addr)
    }

    #[inline(always)]
    pub fn to_address(self) -> Address {
        self.0
    }
}
