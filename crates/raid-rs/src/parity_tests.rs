use super::*;

fn sample_blocks() -> Vec<Vec<u8>> {
    vec![
        vec![0x41, 0x42, 0x43, 0x44],
        vec![0x10, 0x20, 0x30, 0x40],
        vec![0xFF, 0x00, 0x7F, 0x01],
        vec![0x05, 0x05, 0x05, 0x05],
    ]
}

#[test]
fn p_is_xor_of_all_blocks() {
    let blocks = sample_blocks();
    let refs: Vec<&[u8]> = blocks.iter().map(Vec::as_slice).collect();
    let p = p_of(&refs);
    for k in 0..4 {
        let expected = blocks.iter().fold(0u8, |acc, b| acc ^ b[k]);
        assert_eq!(p[k], expected);
    }
}

#[test]
fn q_matches_manual_weighted_sum() {
    let blocks = sample_blocks();
    let refs: Vec<&[u8]> = blocks.iter().map(Vec::as_slice).collect();
    let cols: Vec<usize> = (0..blocks.len()).collect();
    let q = q_of(&refs, &cols);
    for k in 0..4 {
        let mut expected = 0u8;
        for (j, block) in blocks.iter().enumerate() {
            expected = gf::add(expected, gf::mul(gf::pow_alpha(j), block[k]));
        }
        assert_eq!(q[k], expected);
    }
}

#[test]
fn p_and_q_matches_individual_kernels() {
    let blocks = sample_blocks();
    let refs: Vec<&[u8]> = blocks.iter().map(Vec::as_slice).collect();
    let cols: Vec<usize> = (0..blocks.len()).collect();
    let (p, q) = p_and_q(&refs);
    assert_eq!(p, p_of(&refs));
    assert_eq!(q, q_of(&refs, &cols));
}

#[test]
fn recover_from_p_restores_missing_block() {
    let blocks = sample_blocks();
    let refs: Vec<&[u8]> = blocks.iter().map(Vec::as_slice).collect();
    let p = p_of(&refs);

    for missing in 0..blocks.len() {
        let survivors: Vec<&[u8]> = refs
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != missing)
            .map(|(_, b)| *b)
            .collect();
        let recovered = recover_from_p(&p, &survivors);
        assert_eq!(recovered, blocks[missing]);
    }
}

#[test]
fn recover_from_q_restores_missing_block() {
    let blocks = sample_blocks();
    let refs: Vec<&[u8]> = blocks.iter().map(Vec::as_slice).collect();
    let cols: Vec<usize> = (0..blocks.len()).collect();
    let q = q_of(&refs, &cols);

    for missing in 0..blocks.len() {
        let survivors: Vec<&[u8]> = refs
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != missing)
            .map(|(_, b)| *b)
            .collect();
        let survivor_cols: Vec<usize> = cols.iter().copied().filter(|&j| j != missing).collect();
        let recovered = recover_from_q(&q, &survivors, &survivor_cols, missing);
        assert_eq!(recovered, blocks[missing]);
    }
}

#[test]
fn recover_two_restores_both_missing_blocks() {
    let blocks = sample_blocks();
    let refs: Vec<&[u8]> = blocks.iter().map(Vec::as_slice).collect();
    let cols: Vec<usize> = (0..blocks.len()).collect();
    let (p, q) = p_and_q(&refs);

    for x in 0..blocks.len() {
        for y in (x + 1)..blocks.len() {
            let survivors: Vec<&[u8]> = refs
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != x && *i != y)
                .map(|(_, b)| *b)
                .collect();
            let survivor_cols: Vec<usize> =
                cols.iter().copied().filter(|&j| j != x && j != y).collect();
            let (dx, dy) = recover_two(&p, &q, &survivors, &survivor_cols, x, y);
            assert_eq!(dx, blocks[x]);
            assert_eq!(dy, blocks[y]);
        }
    }
}

#[test]
#[should_panic]
fn recover_two_rejects_equal_columns() {
    let blocks = sample_blocks();
    let refs: Vec<&[u8]> = blocks.iter().map(Vec::as_slice).collect();
    let (p, q) = p_and_q(&refs);
    let _ = recover_two(&p, &q, &[], &[], 1, 1);
}

#[test]
fn single_block_stripe_is_its_own_parity() {
    let block: Vec<u8> = vec![9, 8, 7, 6];
    let refs: Vec<&[u8]> = vec![block.as_slice()];
    let (p, q) = p_and_q(&refs);
    assert_eq!(p, block);
    // weight for column 0 is alpha^0 == 1, so Q equals the block too.
    assert_eq!(q, block);
}
