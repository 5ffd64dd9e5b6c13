//! End-to-end behaviour of a page-backed heap: the documented allocation
//! scenarios plus randomized allocate/release sequences checked against the
//! arena invariants.

use std::ptr::NonNull;

use nextfit::{AllocError, Arena, BlockInfo, Config, Heap, ReleaseError, region::PAGE_SIZE};
use proptest::prelude::*;

fn heap(region_size: usize) -> Heap {
    let mut heap = Heap::with_config(Config::default());
    heap.init(region_size).unwrap();
    heap
}

fn rows(heap: &Heap) -> Vec<BlockInfo> {
    heap.dump().unwrap().blocks().collect()
}

fn arena(heap: &Heap) -> &Arena {
    heap.arena().unwrap()
}

// ---------------------------------------------------------------------------
// Scenario A: one page, one allocation
// ---------------------------------------------------------------------------

#[test_log::test]
fn first_allocation_splits_the_page() {
    let mut heap = heap(4096);
    let span = *PAGE_SIZE - 8;
    assert_eq!(rows(&heap).len(), 1);
    assert_eq!(rows(&heap)[0].size, span);

    let ptr = heap.allocate(100).unwrap();
    let start = arena(&heap).start().addr();
    assert_eq!(ptr.as_ptr().addr(), start + 4);

    let rows = rows(&heap);
    assert_eq!(rows.len(), 2);
    assert_eq!((rows[0].allocated, rows[0].size), (true, 104));
    assert_eq!((rows[1].allocated, rows[1].size), (false, span - 104));
    assert!(rows[1].prev_allocated);
}

// ---------------------------------------------------------------------------
// Scenario B: exhausting the arena
// ---------------------------------------------------------------------------

#[test_log::test]
fn full_arena_rejects_one_more_byte() {
    let mut heap = heap(4096);
    let span = arena(&heap).span();

    let whole = heap.allocate(span - 4).unwrap();
    let before = rows(&heap);
    assert_eq!(before.len(), 1);
    assert!(before[0].allocated);

    assert_eq!(heap.allocate(1), None);
    assert_eq!(arena(&heap).summary().free, 0);
    assert_eq!(rows(&heap), before);

    // The arena can be drained and filled again.
    unsafe { heap.release(whole.as_ptr()).unwrap() };
    assert_eq!(arena(&heap).summary().free, span);
    assert_eq!(heap.allocate(span - 4), Some(whole));
}

#[test_log::test]
fn capacity_bound() {
    let mut heap = heap(4096);
    let span = arena(&heap).span();
    assert_eq!(heap.allocate(0), None);
    assert_eq!(heap.allocate(span - 3), None);
    assert_eq!(heap.allocate(usize::MAX), None);
    assert_eq!(rows(&heap).len(), 1);
}

// ---------------------------------------------------------------------------
// Scenario C: releasing the middle, then the sides
// ---------------------------------------------------------------------------

#[test_log::test]
fn middle_then_sides_coalesce() {
    let mut heap = heap(4096);
    let a = heap.allocate(40).unwrap().as_ptr();
    let b = heap.allocate(40).unwrap().as_ptr();
    let c = heap.allocate(40).unwrap().as_ptr();
    let tail = heap.allocate(40).unwrap().as_ptr();

    unsafe { heap.release(b).unwrap() };
    let view = rows(&heap);
    assert_eq!(
        view.iter().map(|r| r.allocated).collect::<Vec<_>>(),
        [true, false, true, true, false]
    );
    assert_eq!(view[1].size, 48);

    unsafe { heap.release(a).unwrap() };
    let view = rows(&heap);
    assert_eq!(
        view.iter().map(|r| r.allocated).collect::<Vec<_>>(),
        [false, true, true, false]
    );
    assert_eq!(view[0].size, 96);

    unsafe { heap.release(c).unwrap() };
    let view = rows(&heap);
    assert_eq!(
        view.iter().map(|r| r.allocated).collect::<Vec<_>>(),
        [false, true, false]
    );
    assert_eq!(view[0].size, 144);
    assert_eq!(view[1].begin, tail.addr() - 4);
    assert!(!view[1].prev_allocated);
    assert_eq!(arena(&heap).check(), Ok(()));
}

// ---------------------------------------------------------------------------
// Scenario D: next-fit resumes where the last allocation landed
// ---------------------------------------------------------------------------

#[test_log::test]
fn search_resumes_after_last_fit() {
    let mut heap = heap(4096);
    let ptrs: Vec<_> = (0..6).map(|_| heap.allocate(28).unwrap()).collect();
    // Open holes at positions 1 and 4, then land in position 4.
    unsafe {
        heap.release(ptrs[1].as_ptr()).unwrap();
        heap.release(ptrs[4].as_ptr()).unwrap();
    }
    let later = rows(&heap)[4].begin;
    unsafe { heap.release(ptrs[5].as_ptr()).unwrap() };

    // Position 5 merged into the hole at 4 and the tail, taking the cursor
    // with it. The next requests land there, never in the hole at 1.
    let next = heap.allocate(28).unwrap();
    assert_eq!(next.as_ptr().addr() - 4, later);
    let again = heap.allocate(28).unwrap();
    assert!(again > next);
}

#[test_log::test]
fn search_wraps_to_earlier_holes() {
    let mut heap = heap(4096);
    let span = arena(&heap).span();
    let first = heap.allocate(60).unwrap();
    let _rest = heap.allocate(span - 64 - 4).unwrap();
    unsafe { heap.release(first.as_ptr()).unwrap() };

    assert_eq!(heap.allocate(60), Some(first));
    assert_eq!(heap.allocate(1), None);
}

// ---------------------------------------------------------------------------
// Release validation
// ---------------------------------------------------------------------------

#[test_log::test]
fn double_free_leaves_arena_alone() {
    let mut heap = heap(4096);
    let a = heap.allocate(10).unwrap().as_ptr();
    let _b = heap.allocate(10).unwrap();

    unsafe { heap.release(a).unwrap() };
    let before = rows(&heap);
    assert_eq!(unsafe { heap.release(a) }, Err(ReleaseError::DoubleFree));
    assert_eq!(rows(&heap), before);
}

#[test_log::test]
fn foreign_pointers_are_rejected() {
    let mut heap = heap(4096);
    let a = heap.allocate(10).unwrap().as_ptr();
    let mut outside = 0u64;
    unsafe {
        assert_eq!(heap.release(std::ptr::null_mut()), Err(ReleaseError::Null));
        assert_eq!(heap.release(a.add(1)), Err(ReleaseError::Misaligned));
        assert_eq!(
            heap.release((&raw mut outside).cast()),
            Err(ReleaseError::OutOfRange)
        );
    }
    assert_eq!(arena(&heap).check(), Ok(()));
}

#[test_log::test]
fn arena_over_caller_memory() {
    let mut buf = vec![0u64; 64];
    let base = NonNull::new(buf.as_mut_ptr().cast::<u8>()).unwrap();
    let mut arena = unsafe { Arena::from_raw_parts(base, 512).unwrap() };
    assert_eq!(arena.span(), 504);
    assert_eq!(arena.try_allocate(600), Err(AllocError::InvalidSize));
    let p = arena.allocate(200).unwrap();
    unsafe { arena.release(p.as_ptr()).unwrap() };
    assert_eq!(arena.summary().free, 504);
}

// ---------------------------------------------------------------------------
// Randomized sequences
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Op {
    Allocate(usize),
    /// Release the live allocation at this index, modulo the live count.
    Release(usize),
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (1usize..600).prop_map(Op::Allocate),
        2 => any::<usize>().prop_map(Op::Release),
    ]
}

proptest! {
    #[test]
    fn invariants_hold(ops in prop::collection::vec(arb_op(), 1..200)) {
        let mut heap = heap(8192);
        let span = arena(&heap).span();
        let mut live: Vec<NonNull<u8>> = Vec::new();

        for op in ops {
            match op {
                Op::Allocate(size) => {
                    let free_before = arena(&heap).summary().free;
                    if let Some(ptr) = heap.allocate(size) {
                        prop_assert_eq!(ptr.as_ptr().addr() % 8, 0);
                        let a = arena(&heap);
                        prop_assert!(a.start().addr() < ptr.as_ptr().addr());
                        prop_assert!(ptr.as_ptr().addr() + size <= a.start().addr() + span);
                        unsafe { ptr.as_ptr().write_bytes(0x5A, size) };
                        live.push(ptr);
                    } else {
                        prop_assert_eq!(arena(&heap).summary().free, free_before);
                    }
                }
                Op::Release(i) if !live.is_empty() => {
                    let ptr = live.swap_remove(i % live.len());
                    prop_assert_eq!(unsafe { heap.release(ptr.as_ptr()) }, Ok(()));
                    let view = rows(&heap);
                    for pair in view.windows(2) {
                        prop_assert!(pair[0].allocated || pair[1].allocated);
                    }
                }
                Op::Release(_) => {}
            }

            let a = arena(&heap);
            prop_assert_eq!(a.check(), Ok(()));
            let view = rows(&heap);
            let mut expected = a.start().addr();
            for row in &view {
                prop_assert_eq!(row.begin, expected);
                expected = row.end + 1;
            }
            prop_assert_eq!(expected, a.start().addr() + span);
            prop_assert_eq!(a.summary().total(), span);
        }

        for ptr in live.drain(..) {
            prop_assert_eq!(unsafe { heap.release(ptr.as_ptr()) }, Ok(()));
        }
        prop_assert_eq!(rows(&heap).len(), 1);
        prop_assert_eq!(arena(&heap).summary().free, span);
    }

    #[test]
    fn allocate_then_release_restores_free_bytes(
        sizes in prop::collection::vec(1usize..300, 0..10),
        probe in 1usize..1000,
    ) {
        let mut heap = heap(8192);
        for size in sizes {
            heap.allocate(size);
        }
        let free = arena(&heap).summary().free;
        if let Some(ptr) = heap.allocate(probe) {
            prop_assert!(arena(&heap).summary().free < free);
            prop_assert_eq!(unsafe { heap.release(ptr.as_ptr()) }, Ok(()));
        }
        prop_assert_eq!(arena(&heap).summary().free, free);
    }
}
