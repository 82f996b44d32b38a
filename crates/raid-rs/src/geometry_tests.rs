use super::*;

// D=6, P=2, W=8, B=4 -> matches the spec's worked example.
fn geom() -> Geometry {
    Geometry::new(6, 4)
}

#[test]
fn stripe_size_is_data_disks_times_block_size() {
    assert_eq!(geom().stripe_size(), 24);
}

#[test]
fn stripe_zero_parity_at_tail_columns() {
    let g = geom();
    assert_eq!(g.parity_columns(0), (6, 7));
}

#[test]
fn parity_rotates_and_wraps() {
    let g = geom();
    assert_eq!(g.parity_columns(1), (7, 0));
    assert_eq!(g.parity_columns(2), (0, 1));
    // s = W - D wraps P from the top disks back to disk 0/1.
    assert_eq!(g.parity_columns(8 - 6), (0, 1));
}

#[test]
fn data_columns_exclude_parity_and_stay_sorted() {
    let g = geom();
    for s in 0..8 {
        let (p, q) = g.parity_columns(s);
        let cols = g.data_columns(s);
        assert_eq!(cols.len(), 6);
        assert!(cols.windows(2).all(|w| w[0] < w[1]));
        assert!(!cols.contains(&p));
        assert!(!cols.contains(&q));
    }
}

#[test]
fn locate_maps_offset_to_column_and_byte() {
    let g = geom();
    let loc = g.locate(0, 0).unwrap();
    assert_eq!(loc.disk, 0);
    assert_eq!(loc.byte_offset, 0);

    let loc = g.locate(0, 5).unwrap();
    assert_eq!(loc.disk, 1);
    assert_eq!(loc.byte_offset, 1);

    let loc = g.locate(2, 20).unwrap();
    // stripe 2: data columns are [2,3,4,5,6,7], offset 20 -> column 5 -> disk 7
    assert_eq!(loc.disk, 7);
    assert_eq!(loc.byte_offset, 2 * 4 + 0);
}

#[test]
fn locate_rejects_out_of_range_offset() {
    let g = geom();
    assert!(g.locate(0, 24).is_err());
}

#[test]
fn decompose_single_block_range() {
    let g = geom();
    let segs = g.decompose(0, 0, 4).unwrap();
    assert_eq!(segs.len(), 1);
    assert_eq!(segs[0].disk, 0);
    assert_eq!(segs[0].disk_offset, 0);
    assert_eq!(segs[0].len, 4);
}

#[test]
fn decompose_spans_multiple_columns() {
    let g = geom();
    let segs = g.decompose(0, 2, 6).unwrap();
    // bytes [2,8) span column 0 (bytes 2,3) and column 1 (bytes 4..8)
    assert_eq!(segs.len(), 2);
    assert_eq!(segs[0].disk, 0);
    assert_eq!(segs[0].len, 2);
    assert_eq!(segs[0].logical_offset, 0);
    assert_eq!(segs[1].disk, 1);
    assert_eq!(segs[1].len, 4);
    assert_eq!(segs[1].logical_offset, 2);
}

#[test]
fn decompose_full_stripe_has_one_segment_per_data_column() {
    let g = geom();
    let segs = g.decompose(1, 0, g.stripe_size()).unwrap();
    assert_eq!(segs.len(), 6);
    assert_eq!(segs.iter().map(|s| s.len).sum::<u64>(), 24);
}

#[test]
fn decompose_rejects_overrun() {
    let g = geom();
    assert!(g.decompose(0, 20, 8).is_err());
}

#[test]
fn decompose_zero_length_is_empty() {
    let g = geom();
    assert!(g.decompose(0, 10, 0).unwrap().is_empty());
}
