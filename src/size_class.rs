//! Size classes & granule math.

use crate::util::constants::{LARGE_OBJECT_GRANULE_THRESHOLD, SMALL_OBJECT_GRANULE_SIZES};

/// Number of small-object size classes: `{1, 2, 3, 4, 5, 6, 8, 10, 16, 32}`.
pub const NUM_SMALL_OBJECT_SIZES: usize = SMALL_OBJECT_GRANULE_SIZES.len();

/// Sentinel meaning "not a small object; use the large-object path".
pub const NOT_SMALL_OBJECT: usize = NUM_SMALL_OBJECT_SIZES;

/// A small-object size class: an index into `SMALL_OBJECT_GRANULE_SIZES`,
/// or `NOT_SMALL_OBJECT`.
pub type SizeClass = usize;

const fn build_table() -> [u8; LARGE_OBJECT_GRANULE_THRESHOLD + 1] {
    let mut table = [NOT_SMALL_OBJECT as u8; LARGE_OBJECT_GRANULE_THRESHOLD + 1];
    let mut g = 0usize;
    while g <= LARGE_OBJECT_GRANULE_THRESHOLD {
        let mut c = 0usize;
        while c < SMALL_OBJECT_GRANULE_SIZES.len() {
            if SMALL_OBJECT_GRANULE_SIZES[c] as usize >= g {
                table[g] = c as u8;
                break;
            }
            c += 1;
        }
        g += 1;
    }
    table
}

/// `granules_to_small_object_size[0..=32]`: rounds any granule count up to
/// its size class.
static GRANULES_TO_SMALL_OBJECT_SIZE: [u8; LARGE_OBJECT_GRANULE_THRESHOLD + 1] = build_table();

/// Map a granule count to its small-object size class. Panics if
/// `granules > LARGE_OBJECT_GRANULE_THRESHOLD`; callers must route larger
/// requests to the large-object path instead.
#[inline]
pub fn granules_to_small_object_size(granules: usize) -> SizeClass {
    assert!(
        granules <= LARGE_OBJECT_GRANULE_THRESHOLD,
        "granule count {granules} exceeds the large-object threshold"
    );
    GRANULES_TO_SMALL_OBJECT_SIZE[granules] as usize
}

/// The granule size of a size class (e.g. class 0 -> 1 granule, class 9 ->
/// 32 granules).
#[inline]
pub fn size_class_granules(class: SizeClass) -> usize {
    SMALL_OBJECT_GRANULE_SIZES[class] as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_class_closure() {
        // For every g in [1..32], granules_to_small_object_size(g)
        // returns a class c with small_object_granule_sizes[c] >= g, and
        // no smaller class does.
        for g in 1..=LARGE_OBJECT_GRANULE_THRESHOLD {
            let c = granules_to_small_object_size(g);
            assert!(size_class_granules(c) >= g);
            if c > 0 {
                assert!(size_class_granules(c - 1) < g);
            }
        }
    }

    #[test]
    fn exact_class_sizes_map_to_themselves() {
        for (i, &sz) in SMALL_OBJECT_GRANULE_SIZES.iter().enumerate() {
            assert_eq!(granules_to_small_object_size(sz as usize), i);
        }
    }

    #[test]
    #[should_panic]
    fn rejects_granule_counts_above_threshold() {
        granules_to_small_object_size(LARGE_OBJECT_GRANULE_THRESHOLD + 1);
    }
}
