//! P/Q parity kernels and the single/double data-recovery recipes built on
//! top of them.
//!
//! Every function here is byte-wise over equal-length blocks; the "weight"
//! of a data column `j` is always `alpha^j` (see [`crate::gf::pow_alpha`]).
//! Column index is distinct from a block's position in a `blocks` slice:
//! during recovery some columns are absent, so callers pass the column
//! index alongside each surviving block explicitly.

#[cfg(test)]
mod parity_tests;

use crate::gf;

/// XORs `src` into `dst` one byte at a time. `dst` and `src` must be the
/// same length; this is the shared inner loop for P and for combining
/// per-column contributions into Q.
fn xor_into(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= s;
    }
}

/// Scales `src` by `weight` in GF(2^8) and XORs the result into `dst`, one
/// contiguous pass over the whole block per call rather than one field
/// multiply per (column, byte) pair reshuffled across columns.
fn mul_into(dst: &mut [u8], src: &[u8], weight: u8) {
    if weight == 0 {
        return;
    }
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= gf::mul(weight, *s);
    }
}

/// `P = XOR of all present data blocks`.
///
/// # Panics
/// Panics if `blocks` is empty or the blocks have unequal lengths.
#[must_use]
pub fn p_of(blocks: &[&[u8]]) -> Vec<u8> {
    assert!(!blocks.is_empty(), "p_of requires at least one block");
    let block_size = blocks[0].len();
    let mut p = vec![0u8; block_size];
    for block in blocks {
        assert_eq!(block.len(), block_size, "p_of: mismatched block lengths");
        xor_into(&mut p, block);
    }
    p
}

/// `Q = XOR over j of mul(alpha^j, d_j)`, where `columns[i]` is the data
/// column index of `blocks[i]`.
///
/// # Panics
/// Panics if `blocks` is empty, lengths differ, or `blocks.len() !=
/// columns.len()`.
#[must_use]
pub fn q_of(blocks: &[&[u8]], columns: &[usize]) -> Vec<u8> {
    assert!(!blocks.is_empty(), "q_of requires at least one block");
    assert_eq!(blocks.len(), columns.len(), "q_of: columns must pair with blocks");
    let block_size = blocks[0].len();
    let mut q = vec![0u8; block_size];
    for (block, &j) in blocks.iter().zip(columns) {
        assert_eq!(block.len(), block_size, "q_of: mismatched block lengths");
        mul_into(&mut q, block, gf::pow_alpha(j));
    }
    q
}

/// Recomputes P and Q together over a full stripe's data columns, in
/// column order `0..data_disks`. This is the hot path `save`/recovery
/// parity refreshes call; `blocks[j]` must be the data block of column
/// `j`.
#[must_use]
pub fn p_and_q(blocks: &[&[u8]]) -> (Vec<u8>, Vec<u8>) {
    assert!(!blocks.is_empty(), "p_and_q requires at least one block");
    let block_size = blocks[0].len();
    let mut p = vec![0u8; block_size];
    let mut q = vec![0u8; block_size];
    for (j, block) in blocks.iter().enumerate() {
        assert_eq!(block.len(), block_size, "p_and_q: mismatched block lengths");
        xor_into(&mut p, block);
        mul_into(&mut q, block, gf::pow_alpha(j));
    }
    (p, q)
}

/// Recovers a single missing data block from P and the surviving data
/// blocks (column index of the missing block is irrelevant to this
/// recipe: `P` is column-blind).
#[must_use]
pub fn recover_from_p(p: &[u8], survivors: &[&[u8]]) -> Vec<u8> {
    let mut result = p.to_vec();
    for block in survivors {
        xor_into(&mut result, block);
    }
    result
}

/// Recovers the single data block missing at column index `missing_col`
/// from Q and the surviving data blocks (each paired with its column
/// index).
///
/// # Panics
/// Panics if `survivors.len() != survivor_cols.len()`.
#[must_use]
pub fn recover_from_q(
    q: &[u8],
    survivors: &[&[u8]],
    survivor_cols: &[usize],
    missing_col: usize,
) -> Vec<u8> {
    assert_eq!(survivors.len(), survivor_cols.len());
    let mut q_prime = q.to_vec();
    for (block, &j) in survivors.iter().zip(survivor_cols) {
        mul_into(&mut q_prime, block, gf::pow_alpha(j));
    }
    let inv_weight = gf::inv(gf::pow_alpha(missing_col));
    for byte in &mut q_prime {
        *byte = gf::mul(inv_weight, *byte);
    }
    q_prime
}

/// Recovers two data blocks missing at column indices `x` and `y` (`x !=
/// y`) from P, Q and the other surviving data blocks.
///
/// # Panics
/// Panics if `x == y`, or if `survivors.len() != survivor_cols.len()`.
#[must_use]
pub fn recover_two(
    p: &[u8],
    q: &[u8],
    survivors: &[&[u8]],
    survivor_cols: &[usize],
    x: usize,
    y: usize,
) -> (Vec<u8>, Vec<u8>) {
    assert_ne!(x, y, "recover_two requires two distinct column indices");
    assert_eq!(survivors.len(), survivor_cols.len());

    let block_size = p.len();
    let mut pxy = p.to_vec();
    let mut qxy = q.to_vec();
    for (block, &j) in survivors.iter().zip(survivor_cols) {
        xor_into(&mut pxy, block);
        mul_into(&mut qxy, block, gf::pow_alpha(j));
    }

    let gx = gf::pow_alpha(x);
    let gy = gf::pow_alpha(y);
    let gxy = gf::add(gx, gy);
    let inv_gxy = gf::inv(gxy);
    let a = gf::mul(gy, inv_gxy);

    let mut dx = vec![0u8; block_size];
    let mut dy = vec![0u8; block_size];
    for k in 0..block_size {
        let lhs = gf::mul(a, pxy[k]);
        let rhs = gf::mul(inv_gxy, qxy[k]);
        dx[k] = gf::add(lhs, rhs);
        dy[k] = gf::add(pxy[k], dx[k]);
    }
    (dx, dy)
}
