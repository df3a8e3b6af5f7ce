//! Scenario tests for the Cheney-style semi-space copying collector.

mod common;

use common::{array_size, car_slot, cdr_slot, read_double, write_double, write_len, Kind, TestOM, NODE_SIZE};
use granule_gc::{
    allocate, allocate_pointerless, get_field, init_field, initialize_gc, with_handle, Address, GcHeap,
    ObjectReference, Variant,
};

fn force_collect(heap: &mut GcHeap<TestOM>, bytes: usize) {
    match heap {
        GcHeap::SemiSpace(h) => h.force_collect(bytes),
        _ => unreachable!(),
    }
}

fn collections(heap: &GcHeap<TestOM>) -> u64 {
    match heap {
        GcHeap::SemiSpace(h) => h.collection_count(),
        _ => unreachable!(),
    }
}

#[test]
fn flip_preserves_a_reachable_chain_and_drops_garbage() {
    let mut heap: GcHeap<TestOM> = initialize_gc(Variant::SemiSpace, 64 * 1024).expect("reservation failed");

    with_handle(&mut heap, Address::ZERO, |heap, head| {
        for i in 0..300 {
            // Garbage that the next flip must not copy forward.
            allocate(heap, Kind::Node, NODE_SIZE);

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

        let before = collections(heap);
        force_collect(heap, 0);
        assert!(collections(heap) > before);

        let mut cur = head.get();
        let mut seen = Vec::new();
        while !cur.is_zero() {
            let node = ObjectReference::from_address(cur);
            let arr = ObjectReference::from_address(unsafe { get_field(car_slot(node)) });
            seen.push(unsafe { read_double(arr, 0) });
            cur = unsafe { get_field(cdr_slot(node)) };
        }
        seen.reverse();
        let expected: Vec<f64> = (0..300).map(|i| i as f64).collect();
        assert_eq!(seen, expected);
    });
}

#[test]
fn pointerless_array_survives_several_flips() {
    let mut heap: GcHeap<TestOM> = initialize_gc(Variant::SemiSpace, 32 * 1024).expect("reservation failed");

    with_handle(&mut heap, Address::ZERO, |heap, root| {
        let len = 64;
        let arr = allocate_pointerless(heap, Kind::DoubleArray, array_size(len));
        unsafe {
            write_len(arr, len);
            for i in 0..len {
                write_double(arr, i, i as f64 * 0.5);
            }
        }
        root.set(arr.to_address());

        for _ in 0..5 {
            force_collect(heap, 0);
            let arr = ObjectReference::from_address(root.get());
            for i in 0..len {
                assert_eq!(unsafe { read_double(arr, i) }, i as f64 * 0.5);
            }
        }
    });
}

#[test]
fn allocation_keeps_working_across_many_organic_flips() {
    let mut heap: GcHeap<TestOM> = initialize_gc(Variant::SemiSpace, 16 * 1024).expect("reservation failed");
    for i in 0..5000 {
        let arr = allocate_pointerless(&mut heap, Kind::DoubleArray, array_size(1));
        unsafe {
            write_len(arr, 1);
            write_double(arr, 0, i as f64);
        }
    }
}
