use super::*;

// D=6 -> stripe_size Z=24 (matches the block_size=4 worked example), 4 stripes.
fn alloc() -> Allocator {
    Allocator::new(4, 24)
}

#[test]
fn fresh_allocator_reports_full_capacity() {
    let a = alloc();
    assert_eq!(a.left_size(), 96);
    for s in 0..4 {
        assert!(a.is_stripe_entirely_free(s));
    }
}

#[test]
fn full_stripe_allocation_consumes_one_stripe_entirely() {
    let mut a = alloc();
    let placements = a.allocate_new("f1", 24).unwrap();
    assert_eq!(placements.len(), 1);
    let (stripe, ranges) = &placements[0];
    assert_eq!(ranges, &vec![(0u64, 24u64)]);
    assert!(!a.is_stripe_entirely_free(*stripe));
    assert_eq!(a.left_size(), 72);
}

#[test]
fn partial_allocation_leaves_a_free_remainder() {
    let mut a = alloc();
    a.allocate_new("f1", 24).unwrap();
    let placements = a.allocate_new("f2", 10).unwrap();
    assert_eq!(placements.len(), 1);
    let (_stripe, ranges) = &placements[0];
    assert_eq!(ranges, &vec![(0u64, 10u64)]);
}

#[test]
fn allocation_spanning_more_than_one_stripe() {
    let mut a = alloc();
    let placements = a.allocate_new("big", 24 + 5).unwrap();
    assert_eq!(placements.len(), 2);
    let total: u64 = placements.iter().flat_map(|(_, r)| r.iter().map(|&(_, l)| l)).sum();
    assert_eq!(total, 29);
}

#[test]
fn allocation_exceeding_capacity_fails_with_no_space() {
    let mut a = alloc();
    let err = a.allocate_new("huge", 97).unwrap_err();
    assert!(matches!(err, RaidError::NoSpace { .. }));
}

#[test]
fn deallocate_then_reallocate_reuses_space() {
    let mut a = alloc();
    a.allocate_new("f1", 24).unwrap();
    a.deallocate("f1").unwrap();
    assert_eq!(a.left_size(), 96);
    assert!((0..4).any(|s| a.is_stripe_entirely_free(s)));

    let placements = a.allocate_new("f2", 24).unwrap();
    assert_eq!(placements.len(), 1);
}

#[test]
fn deallocate_unknown_file_is_an_error() {
    let mut a = alloc();
    let err = a.deallocate("nope").unwrap_err();
    assert!(matches!(err, RaidError::UnknownFile(_)));
}

#[test]
fn coalescing_merges_neighbor_free_entries() {
    let mut a = alloc();
    // three files sharing one stripe, middle one deleted first then an
    // adjacent one, exercising both predecessor and successor merges.
    a.allocate_new("a", 8).unwrap();
    a.allocate_new("b", 8).unwrap();
    a.allocate_new("c", 8).unwrap();

    a.deallocate("b").unwrap();
    a.deallocate("a").unwrap();
    a.deallocate("c").unwrap();

    assert!(a.is_stripe_entirely_free(0));
    assert_eq!(a.left_size(), 96);
}

#[test]
fn shrink_frees_the_tail_and_reports_touched_stripes() {
    let mut a = alloc();
    a.allocate_new("f1", 24 + 6).unwrap();
    let touched = a.shrink("f1", 10).unwrap();
    assert!(!touched.is_empty());

    let placements = a.placements("f1").unwrap();
    let total: u64 = placements.iter().flat_map(|(_, r)| r.iter().map(|&(_, l)| l)).sum();
    assert_eq!(total, 10);
    assert_eq!(a.left_size(), 96 - 10);
}

#[test]
fn shrink_to_zero_frees_everything() {
    let mut a = alloc();
    a.allocate_new("f1", 24).unwrap();
    let touched = a.shrink("f1", 0).unwrap();
    assert_eq!(touched, vec![0]);
    assert!(a.is_stripe_entirely_free(0));
    assert_eq!(a.left_size(), 96);
}

#[test]
fn failed_multi_chunk_allocation_does_not_corrupt_status_for_earlier_chunks() {
    let mut a = alloc();
    // Three stripes end up with 8 free bytes each, one stripe (3) stays
    // fully free (24 bytes) -> left_size = 8*3 + 24 = 48.
    a.allocate_new("x0", 16).unwrap();
    a.allocate_new("x1", 16).unwrap();
    a.allocate_new("x2", 16).unwrap();
    assert_eq!(a.left_size(), 48);

    // A 48-byte request splits into two full-stripe (24-byte) chunks. The
    // first chunk claims the one fully-free stripe; the second can't find
    // another fully-free stripe (only 8-byte remainders are left) and must
    // fail. The first chunk's claim must not stick.
    let err = a.allocate_new("big", 48).unwrap_err();
    assert!(matches!(err, RaidError::FragmentationUnhandled { .. }));
    assert_eq!(a.left_size(), 48, "a failed allocation must not change left_size");

    // The stripe the first chunk provisionally claimed must still be
    // reported as fully free and allocatable as a whole stripe.
    let placements = a.allocate_new("justfits", 24).unwrap();
    assert_eq!(placements.len(), 1);
    assert_eq!(placements[0].1, vec![(0u64, 24u64)]);
    assert_eq!(a.left_size(), 24);
}

#[test]
fn full_stripe_chunk_reports_fragmentation_when_none_fully_free() {
    let mut a = alloc();
    // Leave two stripes with 15 free bytes each (30 total, enough for a
    // 24-byte request) and two stripes fully used, so no single stripe
    // has a full Z=24 bytes free even though the total would suffice.
    a.allocate_new("f0", 24).unwrap();
    a.shrink("f0", 9).unwrap();
    a.allocate_new("f1", 24).unwrap();
    a.shrink("f1", 9).unwrap();
    a.allocate_new("f2", 24).unwrap();
    a.allocate_new("f3", 24).unwrap();

    assert_eq!(a.left_size(), 30);
    let err = a.allocate_new("needs-whole-stripe", 24).unwrap_err();
    assert!(matches!(err, RaidError::FragmentationUnhandled { .. }));
}
