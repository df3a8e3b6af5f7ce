//! Scenario tests for the legacy bit-packed-header mark-sweep variant.

mod common;

use common::{array_size, car_slot, cdr_slot, write_double, write_len, Kind, TestOM, NODE_SIZE, UNIT_SIZE};
use granule_gc::{
    allocate, allocate_pointerless, get_field, init_field, initialize_gc, with_handle, Address, GcHeap, MarkerMode,
    ObjectReference, Variant,
};

fn legacy(marker_mode: MarkerMode) -> Variant {
    Variant::Legacy { marker_mode }
}

#[test]
fn tiny_object_churn_does_not_corrupt_the_heap() {
    let mut heap: GcHeap<TestOM> = initialize_gc(legacy(MarkerMode::Serial), 16 * 1024).expect("reservation failed");

    with_handle(&mut heap, Address::ZERO, |heap, head| {
        for _ in 0..2000 {
            // Pure one-granule churn: nothing but tiny cells flowing
            // through the tiny free list and back.
            allocate_pointerless(heap, Kind::Unit, UNIT_SIZE);
        }
        // One surviving tiny object, rooted the whole time.
        let unit = allocate_pointerless(heap, Kind::Unit, UNIT_SIZE);
        head.set(unit.to_address());
        for _ in 0..2000 {
            allocate_pointerless(heap, Kind::Unit, UNIT_SIZE);
        }
        assert_eq!(head.get(), unit.to_address());
    });
}

#[test]
fn linked_list_survives_collection_serial_and_parallel() {
    for mode in [MarkerMode::Serial, MarkerMode::Parallel(3)] {
        let mut heap: GcHeap<TestOM> = initialize_gc(legacy(mode), 64 * 1024).expect("reservation failed");

        with_handle(&mut heap, Address::ZERO, |heap, head| {
            for i in 0..500 {
                for _ in 0..10 {
                    allocate(heap, Kind::Node, NODE_SIZE);
                }
                let arr = allocate_pointerless(heap, Kind::DoubleArray, array_size(1));
                unsafe {
                    write_len(arr, 1);
                    write_double(arr, 0, i as f64);
                }
                with_handle(heap, arr.to_address(), |heap, arr_handle| {
                    let node = allocate(heap, Kind::Node, NODE_SIZE);
                    unsafe {
                        init_field(car_slot(node), arr_handle.get());
                        init_field(cdr_slot(node), head.get());
                    }
                    head.set(node.to_address());
                });
            }

            let mut cur = head.get();
            let mut count = 0;
            while !cur.is_zero() {
                let node = ObjectReference::from_address(cur);
                count += 1;
                cur = unsafe { get_field(cdr_slot(node)) };
            }
            assert_eq!(count, 500);
        });
    }
}

/// Alternately allocate and drop large objects to force the coalescing
/// sweeper to merge freed runs back together rather than fragmenting
/// into permanently-too-small holes.
#[test]
fn fragmentation_recovers_across_a_sawtooth_of_large_allocations() {
    let mut heap: GcHeap<TestOM> = initialize_gc(legacy(MarkerMode::Serial), 128 * 1024).expect("reservation failed");

    for round in 0..40 {
        let len = 400 + (round % 5) * 50;
        let arr = allocate_pointerless(&mut heap, Kind::DoubleArray, array_size(len));
        unsafe {
            write_len(arr, len);
            write_double(arr, 0, round as f64);
        }
        // Immediately unrooted: next round's allocation must be able to
        // reclaim this space, possibly only after a collection.
    }

    match &mut heap {
        GcHeap::Legacy(h) => h.force_collect(),
        _ => unreachable!(),
    }

    // The heap must still be able to satisfy one more large request
    // after the sweep has coalesced the rounds above.
    let arr = allocate_pointerless(&mut heap, Kind::DoubleArray, array_size(600));
    unsafe { write_len(arr, 600) };
}
