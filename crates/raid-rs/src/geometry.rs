//! Stripe geometry: the rotating placement of P and Q columns per stripe,
//! and the mapping between a logical offset inside a stripe's data-space
//! and a concrete (disk, byte offset) pair.
//!
//! Geometry is a pure function of the stripe index and the array's fixed
//! dimensions; nothing here is stored per-stripe.

#[cfg(test)]
mod geometry_tests;

use crate::error::{RaidError, RaidResult};

/// A physical location: a disk column index and a byte offset within that
/// disk.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DiskOffset {
    pub disk: usize,
    pub byte_offset: u64,
}

/// One contiguous run of a decomposed stripe-range operation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    pub disk: usize,
    pub disk_offset: u64,
    /// Offset into the caller's logical byte range where this run starts.
    pub logical_offset: u64,
    pub len: u64,
}

/// Fixed dimensions of the disk array, from which all per-stripe placement
/// is derived.
#[derive(Copy, Clone, Debug)]
pub struct Geometry {
    data_disks: usize,
    stripe_width: usize,
    block_size: u64,
}

impl Geometry {
    #[must_use]
    pub const fn new(data_disks: usize, block_size: u64) -> Self {
        Self {
            data_disks,
            stripe_width: data_disks + 2,
            block_size,
        }
    }

    #[must_use]
    pub const fn data_disks(&self) -> usize {
        self.data_disks
    }

    #[must_use]
    pub const fn stripe_width(&self) -> usize {
        self.stripe_width
    }

    #[must_use]
    pub const fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Usable data bytes per stripe (`Z = D * B`).
    #[must_use]
    pub const fn stripe_size(&self) -> u64 {
        self.data_disks as u64 * self.block_size
    }

    /// `(p(s), q(s))`: `p(s) = (D + s) mod W`, `q(s) = (D + s + 1) mod W`.
    #[must_use]
    pub const fn parity_columns(&self, stripe: usize) -> (usize, usize) {
        let base = self.data_disks + stripe;
        let p = base % self.stripe_width;
        let q = (base + 1) % self.stripe_width;
        (p, q)
    }

    /// The `D` data-column disk indices of `stripe`, in increasing order —
    /// column `j` (0 ≤ j < D) is `data_columns(stripe)[j]`.
    #[must_use]
    pub fn data_columns(&self, stripe: usize) -> Vec<usize> {
        let (p, q) = self.parity_columns(stripe);
        (0..self.stripe_width).filter(|&i| i != p && i != q).collect()
    }

    /// Every disk index (`p`, `q`, and all data columns) of `stripe`, for
    /// callers that need the full column set rather than just data order.
    #[must_use]
    pub fn parity_indices(&self, stripe: usize) -> (usize, usize, Vec<usize>) {
        let (p, q) = self.parity_columns(stripe);
        (p, q, self.data_columns(stripe))
    }

    /// Maps a logical offset `o` within `[0, Z)` of `stripe` to a physical
    /// `(disk, byte_offset)`.
    ///
    /// # Errors
    /// Returns `RaidError::BoundsError` if `o >= stripe_size()`.
    pub fn locate(&self, stripe: usize, offset: u64) -> RaidResult<DiskOffset> {
        let stripe_size = self.stripe_size();
        if offset >= stripe_size {
            return Err(RaidError::BoundsError(format!(
                "offset {offset} is outside stripe data-space of size {stripe_size}"
            )));
        }
        let column = (offset / self.block_size) as usize;
        let data_cols = self.data_columns(stripe);
        Ok(DiskOffset {
            disk: data_cols[column],
            byte_offset: stripe as u64 * self.block_size + offset % self.block_size,
        })
    }

    /// Decomposes the logical range `[offset, offset+len)` of `stripe`
    /// into an ordered sequence of per-disk contiguous segments, by
    /// stepping column boundaries.
    ///
    /// # Errors
    /// Returns `RaidError::BoundsError` if the range runs past the
    /// stripe's data-space.
    pub fn decompose(&self, stripe: usize, offset: u64, len: u64) -> RaidResult<Vec<Segment>> {
        if len == 0 {
            return Ok(Vec::new());
        }
        let stripe_size = self.stripe_size();
        let end = offset
            .checked_add(len)
            .ok_or_else(|| RaidError::BoundsError("offset + len overflows".to_string()))?;
        if end > stripe_size {
            return Err(RaidError::BoundsError(format!(
                "range [{offset}, {end}) exceeds stripe data-space of size {stripe_size}"
            )));
        }

        let data_cols = self.data_columns(stripe);
        let mut segments = Vec::new();
        let mut cursor = offset;
        while cursor < end {
            let column = (cursor / self.block_size) as usize;
            let column_end = ((column as u64) + 1) * self.block_size;
            let run_end = column_end.min(end);
            let run_len = run_end - cursor;
            segments.push(Segment {
                disk: data_cols[column],
                disk_offset: stripe as u64 * self.block_size + cursor % self.block_size,
                logical_offset: cursor - offset,
                len: run_len,
            });
            cursor = run_end;
        }
        Ok(segments)
    }
}
