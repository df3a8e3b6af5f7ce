//! Size constants shared by all collector variants.

/// log2 of the number of bytes in a granule.
pub const LOG_BYTES_IN_GRANULE: u8 = 3;
/// A granule is the unit of allocation: all requests are rounded up to a
/// whole number of granules. 8 bytes matches a machine word on 64-bit.
pub const GRANULE_SIZE: usize = 1 << LOG_BYTES_IN_GRANULE;

/// Objects whose rounded size is at most this many granules are "small";
/// above it they are "large" and live on the unordered large-object list.
pub const LARGE_OBJECT_GRANULE_THRESHOLD: usize = 32;
/// `LARGE_OBJECT_GRANULE_THRESHOLD` expressed in bytes.
pub const LARGE_OBJECT_THRESHOLD: usize = LARGE_OBJECT_GRANULE_THRESHOLD * GRANULE_SIZE;

static_assertions::const_assert_eq!(GRANULE_SIZE, 1 << LOG_BYTES_IN_GRANULE);
static_assertions::const_assert_eq!(
    LARGE_OBJECT_THRESHOLD,
    LARGE_OBJECT_GRANULE_THRESHOLD * GRANULE_SIZE
);

/// The canonical small-object size classes, in granules. Index into this
/// table is a `SizeClass`; see `crate::size_class`.
pub const SMALL_OBJECT_GRANULE_SIZES: [u8; 10] = [1, 2, 3, 4, 5, 6, 8, 10, 16, 32];

/// Sweep/allocation budget: a single `sweep()` call reclaims at most this
/// many granules (~1 KiB of mark bytes) before returning control to its
/// caller.
pub const SWEEP_RECLAIM_GRANULES: isize = 128;
