//! Scenario tests for the mark-byte mark-sweep variant, exercised
//! entirely through the shared mutator API in `granule_gc::api`.

mod common;

use common::{array_size, car_slot, cdr_slot, read_double, write_double, write_len, Kind, TestOM, NODE_SIZE};
use granule_gc::{
    allocate, allocate_pointerless, get_field, init_field, initialize_gc, with_handle, Address, GcHeap, MarkerMode,
    Variant,
};

fn build_and_verify_chain(variant: Variant, heap_bytes: usize, len: usize, churn_per_link: usize) {
    let mut heap: GcHeap<TestOM> = initialize_gc(variant, heap_bytes).expect("heap reservation failed");

    with_handle(&mut heap, Address::ZERO, |heap, head| {
        for i in 0..len {
            // Throwaway garbage between real links so the heap churns
            // through several collections before the chain is complete.
            for _ in 0..churn_per_link {
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

        // Walk the finished chain back to front, checking every value
        // survived whatever collections the churn triggered.
        let mut cur = head.get();
        let mut seen = Vec::with_capacity(len);
        while !cur.is_zero() {
            let node = granule_gc::ObjectReference::from_address(cur);
            let arr = unsafe { get_field(car_slot(node)) };
            let arr_obj = granule_gc::ObjectReference::from_address(arr);
            seen.push(unsafe { read_double(arr_obj, 0) });
            cur = unsafe { get_field(cdr_slot(node)) };
        }
        seen.reverse();
        let expected: Vec<f64> = (0..len).map(|i| i as f64).collect();
        assert_eq!(seen, expected);
    });
}

#[test]
fn chain_survives_churn_serial() {
    build_and_verify_chain(Variant::MarkSweep { marker_mode: MarkerMode::Serial }, 64 * 1024, 400, 20);
}

#[test]
fn chain_survives_churn_parallel() {
    build_and_verify_chain(Variant::MarkSweep { marker_mode: MarkerMode::Parallel(4) }, 64 * 1024, 400, 20);
}

#[test]
fn forced_collection_reclaims_unrooted_garbage() {
    let variant = Variant::MarkSweep { marker_mode: MarkerMode::Serial };
    let mut heap: GcHeap<TestOM> = initialize_gc(variant, 32 * 1024).expect("heap reservation failed");

    for _ in 0..50 {
        allocate(&mut heap, Kind::Node, NODE_SIZE);
    }
    let before = match &heap {
        GcHeap::MarkSweep(h) => h.collection_count(),
        _ => unreachable!(),
    };
    match &mut heap {
        GcHeap::MarkSweep(h) => h.force_collect(),
        _ => unreachable!(),
    }
    let after = match &heap {
        GcHeap::MarkSweep(h) => h.collection_count(),
        _ => unreachable!(),
    };
    assert_eq!(after, before + 1);

    // The heap should still be usable for a good number of further
    // allocations now that the garbage above is reclaimed.
    for _ in 0..50 {
        allocate(&mut heap, Kind::Node, NODE_SIZE);
    }
}

#[test]
fn large_and_small_interleave_in_a_bounded_heap() {
    let variant = Variant::MarkSweep { marker_mode: MarkerMode::Serial };
    let mut heap: GcHeap<TestOM> = initialize_gc(variant, 256 * 1024).expect("heap reservation failed");

    with_handle(&mut heap, Address::ZERO, |heap, head| {
        for i in 0..200 {
            let len = if i % 5 == 0 { 300 } else { 1 };
            let arr = allocate_pointerless(heap, Kind::DoubleArray, array_size(len));
            unsafe {
                write_len(arr, len);
                for j in 0..len {
                    write_double(arr, j, (i * 1000 + j) as f64);
                }
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
            let node = granule_gc::ObjectReference::from_address(cur);
            let arr = unsafe { get_field(car_slot(node)) };
            let arr_obj = granule_gc::ObjectReference::from_address(arr);
            let len = unsafe { common::read_len(arr_obj) };
            assert!(len == 1 || len == 300);
            count += 1;
            cur = unsafe { get_field(cdr_slot(node)) };
        }
        assert_eq!(count, 200);
    });
}
