//! A seeded-random scenario: allocation sizes and churn amounts vary from
//! run to run (deterministically, given the seed) instead of the fixed
//! patterns the other scenario tests use, to shake out size combinations
//! a hand-picked sequence would never hit.

mod common;

use common::{array_size, car_slot, cdr_slot, read_double, write_double, write_len, Kind, TestOM, NODE_SIZE};
use granule_gc::{
    allocate, allocate_pointerless, get_field, init_field, initialize_gc, with_handle, Address, GcHeap, MarkerMode,
    ObjectReference, Variant,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn run_random_chain(variant: Variant, seed: u64, len: usize) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut heap: GcHeap<TestOM> = initialize_gc(variant, 128 * 1024).expect("heap reservation failed");

    with_handle(&mut heap, Address::ZERO, |heap, head| {
        let mut expected = Vec::with_capacity(len);
        for _ in 0..len {
            // Unrooted churn of random shape and size between each real
            // link, so a collection can land at any point during the
            // build, not just at the fixed cadence the other tests use.
            for _ in 0..rng.random_range(0..6) {
                if rng.random_bool(0.5) {
                    allocate(heap, Kind::Node, NODE_SIZE);
                } else {
                    let junk_len: usize = rng.random_range(1..24);
                    allocate_pointerless(heap, Kind::DoubleArray, array_size(junk_len));
                }
            }

            let value = rng.random_range(-10_000..10_000) as f64;
            let arr = allocate_pointerless(heap, Kind::DoubleArray, array_size(1));
            unsafe {
                write_len(arr, 1);
                write_double(arr, 0, value);
            }
            with_handle(heap, arr.to_address(), |heap, arr_handle| {
                let node = allocate(heap, Kind::Node, NODE_SIZE);
                unsafe {
                    init_field(car_slot(node), arr_handle.get());
                    init_field(cdr_slot(node), head.get());
                }
                head.set(node.to_address());
            });
            expected.push(value);
        }

        // The chain holds most-recently-linked first; `expected` was
        // appended in link order, so reverse the walk to compare.
        let mut cur = head.get();
        let mut seen = Vec::with_capacity(len);
        while !cur.is_zero() {
            let node = ObjectReference::from_address(cur);
            let arr = ObjectReference::from_address(unsafe { get_field(car_slot(node)) });
            seen.push(unsafe { read_double(arr, 0) });
            cur = unsafe { get_field(cdr_slot(node)) };
        }
        seen.reverse();
        assert_eq!(seen, expected);
    });
}

#[test]
fn random_chains_survive_across_every_variant() {
    let variants = [
        Variant::MarkSweep { marker_mode: MarkerMode::Serial },
        Variant::mark_sweep_parallel(),
        Variant::Legacy { marker_mode: MarkerMode::Serial },
        Variant::legacy_parallel(),
        Variant::SemiSpace,
    ];
    for (i, variant) in variants.into_iter().enumerate() {
        run_random_chain(variant, 0xC0FFEE + i as u64, 150);
    }
}
