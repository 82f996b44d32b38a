//! The RAID controller: orchestrates save/load/delete/modify over the
//! disk array, using the allocator for placement, geometry for physical
//! addressing, and the parity kernels whenever data changes or must be
//! reconstructed.


use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::config::RaidConfig;
use crate::error::{RaidError, RaidResult};
use crate::geometry::Geometry;
use crate::parity;
use crate::retention::allocator::Allocator;
use crate::retention::array::DiskArray;

/// Outcome of a verified read's parity check.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Verification {
    Accurate,
    Wrong,
}

/// Which recovery recipe a stripe needed, per the §4.5 case table.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RecoveryCase {
    Good,
    POnly,
    QOnly,
    Pq,
    DOnly,
    DP,
    DQ,
    Dd,
}

/// Result of recovering a single stripe.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RecoveryOutcome {
    pub stripe: usize,
    pub case: RecoveryCase,
}

#[derive(Copy, Clone, Debug)]
enum Parity {
    P,
    Q,
}

/// Top-level RAID-6 storage engine: file-granular save/load/delete/modify
/// over a fixed array of simulated disks.
pub struct RaidArray {
    config: RaidConfig,
    geometry: Geometry,
    array: DiskArray,
    allocator: Allocator,
    /// `column_stale[disk][stripe]`: true while a rebuilt disk still holds
    /// stale (zero) bytes for that stripe, awaiting [`Self::recover_disks`].
    column_stale: Vec<Vec<bool>>,
}

impl RaidArray {
    /// Opens (creating if missing) the disk array described by `config`
    /// and an empty in-memory allocator over it.
    ///
    /// # Errors
    /// Returns `RaidError::ConfigInvalid` if the config fails validation,
    /// or `RaidError::IoError` if the backing disks cannot be opened.
    pub fn open(config: RaidConfig) -> RaidResult<Self> {
        config.validate()?;
        let geometry = Geometry::new(config.data_disks, config.block_size);
        let width = config.stripe_width();
        let array = DiskArray::open(&config.data_path, width, config.disk_size)?;
        let stripe_count = usize::try_from(config.stripe_count())
            .map_err(|_| RaidError::ConfigInvalid("stripe_count overflows usize".to_string()))?;
        let allocator = Allocator::new(stripe_count, geometry.stripe_size());
        let column_stale = vec![vec![false; stripe_count]; width];
        Ok(Self { config, geometry, array, allocator, column_stale })
    }

    #[must_use]
    pub const fn config(&self) -> &RaidConfig {
        &self.config
    }

    #[must_use]
    pub const fn left_size(&self) -> u64 {
        self.allocator.left_size()
    }

    #[must_use]
    pub fn disk_status_string(&self) -> String {
        self.array.status_string()
    }

    /// Hot-removes disk `i`, simulating a failure for demos and tests.
    /// No recovery is attempted; call [`Self::check_disks_status`] (to
    /// probe and auto-replace) or [`Self::replace_disk`] (to replace it
    /// directly), then [`Self::recover_disks`] to restore its content.
    ///
    /// # Errors
    /// `RaidError::IoError` if `i` is out of range or the image cannot be
    /// renamed aside.
    pub fn fail_disk(&mut self, i: usize) -> RaidResult<()> {
        warn!(disk = i, "fail_disk: simulating failure");
        self.array.fail(i)?;
        for stale in &mut self.column_stale[i] {
            *stale = true;
        }
        Ok(())
    }

    /// Rebuilds a fresh, zero-filled backing store for disk `i`,
    /// independent of a probe. The disk's stripes still need
    /// [`Self::recover_disks`] to restore their content.
    ///
    /// # Errors
    /// `RaidError::IoError` if `i` is out of range or the replacement
    /// cannot be created.
    pub fn replace_disk(&mut self, i: usize) -> RaidResult<()> {
        info!(disk = i, "replace_disk: rebuilding");
        self.array.replace(i, &self.config.data_path)?;
        for stale in &mut self.column_stale[i] {
            *stale = true;
        }
        Ok(())
    }

    /// Saves `data` under `name`, allocating placement and refreshing
    /// parity on every touched stripe.
    ///
    /// # Errors
    /// `RaidError::NoSpace` / `FragmentationUnhandled` from the allocator,
    /// or `RaidError::IoError` if a disk write fails.
    pub fn save(&mut self, name: &str, data: &[u8]) -> RaidResult<()> {
        info!(file = name, bytes = data.len(), "save: begin");
        let len = u64::try_from(data.len())
            .map_err(|_| RaidError::BoundsError("file too large for u64".to_string()))?;
        let placements = self.allocator.allocate_new(name, len)?;

        let mut consumed = 0usize;
        for (stripe, ranges) in &placements {
            debug!(file = name, stripe, ranges = ranges.len(), "save: distribute_stripe");
            for &(offset, length) in ranges {
                let length = length as usize;
                self.write_stripe_range(*stripe, offset, &data[consumed..consumed + length])?;
                consumed += length;
            }
            self.refresh_parity(*stripe)?;
        }
        info!(file = name, stripes = placements.len(), "save: done");
        Ok(())
    }

    /// Loads `name`'s bytes back in placement order. When `verify` is set,
    /// every touched stripe is parity-checked before its bytes are read.
    ///
    /// # Errors
    /// `RaidError::UnknownFile` if `name` has no placement,
    /// `RaidError::ParityMismatch` if `verify` is set and a stripe fails
    /// verification, or `RaidError::IoError` on a disk read failure.
    pub fn load(&self, name: &str, verify: bool) -> RaidResult<Vec<u8>> {
        info!(file = name, verify, "load: begin");
        let placements = self
            .allocator
            .placements(name)
            .ok_or_else(|| RaidError::UnknownFile(name.to_string()))?
            .to_vec();

        let mut out = Vec::new();
        for (stripe, ranges) in &placements {
            if verify && self.verify_stripe(*stripe)? == Verification::Wrong {
                warn!(file = name, stripe, "load: parity mismatch");
                return Err(RaidError::ParityMismatch { stripe: *stripe });
            }
            for &(offset, length) in ranges {
                out.extend(self.read_stripe_range(*stripe, offset, length)?);
            }
        }
        info!(file = name, bytes = out.len(), "load: done");
        Ok(out)
    }

    /// Deletes `name`, reclaiming its placement. Parity is left untouched:
    /// the orphaned bytes' parity is still consistent with them.
    ///
    /// # Errors
    /// `RaidError::UnknownFile` if `name` has no placement.
    pub fn delete(&mut self, name: &str) -> RaidResult<()> {
        info!(file = name, "delete");
        self.allocator.deallocate(name)
    }

    /// Overwrites `name` with `new_data`: in-place over the existing
    /// reservation as far as it reaches, truncating on shrink or
    /// allocating-and-appending on growth. Parity is refreshed on every
    /// stripe the write touched.
    ///
    /// # Errors
    /// `RaidError::UnknownFile` if `name` has no placement, allocator
    /// errors on growth, or `RaidError::IoError` on a disk write failure.
    pub fn modify(&mut self, name: &str, new_data: &[u8]) -> RaidResult<()> {
        info!(file = name, bytes = new_data.len(), "modify: begin");
        let existing = self
            .allocator
            .placements(name)
            .ok_or_else(|| RaidError::UnknownFile(name.to_string()))?
            .to_vec();
        let existing_total: u64 =
            existing.iter().flat_map(|(_, ranges)| ranges.iter().map(|&(_, l)| l)).sum();
        let new_len = u64::try_from(new_data.len())
            .map_err(|_| RaidError::BoundsError("file too large for u64".to_string()))?;
        let overlap = existing_total.min(new_len);

        let mut touched = BTreeSet::new();
        let mut consumed = 0u64;
        'overlap: for (stripe, ranges) in &existing {
            for &(offset, length) in ranges {
                if consumed >= overlap {
                    break 'overlap;
                }
                let take = length.min(overlap - consumed);
                let start = consumed as usize;
                self.write_stripe_range(*stripe, offset, &new_data[start..start + take as usize])?;
                touched.insert(*stripe);
                consumed += take;
            }
        }

        if new_len < existing_total {
            touched.extend(self.allocator.shrink(name, new_len)?);
        } else if new_len > existing_total {
            let appended = self.allocator.allocate_append(name, new_len - existing_total)?;
            let tail = &new_data[existing_total as usize..];
            let mut consumed_tail = 0usize;
            for (stripe, ranges) in &appended {
                for &(offset, length) in ranges {
                    let length = length as usize;
                    self.write_stripe_range(
                        *stripe,
                        offset,
                        &tail[consumed_tail..consumed_tail + length],
                    )?;
                    touched.insert(*stripe);
                    consumed_tail += length;
                }
            }
        }

        for stripe in &touched {
            self.refresh_parity(*stripe)?;
        }
        info!(file = name, stripes_touched = touched.len(), "modify: done");
        Ok(())
    }

    /// Recomputes P and Q over `stripe`'s data columns and compares them
    /// against what is stored. Cannot identify which disk disagrees.
    ///
    /// # Errors
    /// `RaidError::IoError` if any of the stripe's blocks cannot be read.
    pub fn verify_stripe(&self, stripe: usize) -> RaidResult<Verification> {
        let blocks = self.read_all_data_blocks(stripe)?;
        let refs: Vec<&[u8]> = blocks.iter().map(Vec::as_slice).collect();
        let (p, q) = parity::p_and_q(&refs);
        let stored_p = self.read_parity_block(stripe, Parity::P)?;
        let stored_q = self.read_parity_block(stripe, Parity::Q)?;
        Ok(if p == stored_p && q == stored_q { Verification::Accurate } else { Verification::Wrong })
    }

    /// Probes every disk's liveness and immediately rebuilds (zero-fills)
    /// any that failed. Newly-rebuilt disks are marked stale on every
    /// stripe until [`Self::recover_disks`] restores their content.
    ///
    /// # Errors
    /// `RaidError::IoError` if a replacement backing store cannot be
    /// created.
    pub fn check_disks_status(&mut self) -> RaidResult<Vec<bool>> {
        let liveness = self.array.probe_and_replace(&self.config.data_path)?;
        for (i, &alive) in liveness.iter().enumerate() {
            if alive {
                debug!(disk = i, "probe: ok");
            } else {
                warn!(disk = i, "probe: failed, replacement rebuilt");
                self.column_stale[i].iter_mut().for_each(|stale| *stale = true);
            }
        }
        Ok(liveness)
    }

    /// Walks every stripe that is not entirely free, classifies its
    /// failure pattern, and applies the matching recovery recipe.
    ///
    /// # Errors
    /// `RaidError::Unrecoverable` the first time a stripe has three or
    /// more failed columns; `RaidError::IoError` on a disk I/O failure.
    /// Stripes processed before the failing one keep their repairs.
    pub fn recover_disks(&mut self) -> RaidResult<Vec<RecoveryOutcome>> {
        info!("recover_disks: begin");
        let stripe_count = self.allocator.stripe_count();
        let mut outcomes = Vec::new();
        for s in 0..stripe_count {
            if self.allocator.is_stripe_entirely_free(s) {
                continue;
            }
            let outcome = self.recover_stripe(s)?;
            debug!(stripe = s, case = ?outcome.case, "recover_disks: stripe classified");
            outcomes.push(outcome);
        }
        for i in 0..self.array.width() {
            if self.column_stale[i].iter().all(|&stale| !stale) {
                self.array.clear_needs_rebuild(i);
            }
        }
        info!(stripes_touched = outcomes.len(), "recover_disks: done");
        Ok(outcomes)
    }

    fn recover_stripe(&mut self, stripe: usize) -> RaidResult<RecoveryOutcome> {
        let (p_disk, q_disk, data_cols) = self.geometry.parity_indices(stripe);
        let failed_cols: Vec<usize> = (0..data_cols.len())
            .filter(|&j| self.array.is_missing(data_cols[j]) || self.column_stale[data_cols[j]][stripe])
            .collect();
        let p_failed = self.array.is_missing(p_disk) || self.column_stale[p_disk][stripe];
        let q_failed = self.array.is_missing(q_disk) || self.column_stale[q_disk][stripe];

        if failed_cols.len() + usize::from(p_failed) + usize::from(q_failed) >= 3 {
            warn!(stripe, failed = failed_cols.len() + usize::from(p_failed) + usize::from(q_failed), "recover_disks: unrecoverable");
            return Err(RaidError::Unrecoverable { stripe });
        }

        let case = match (failed_cols.len(), p_failed, q_failed) {
            (0, false, false) => RecoveryCase::Good,
            (0, true, false) => {
                self.rewrite_parity(stripe, Parity::P)?;
                RecoveryCase::POnly
            }
            (0, false, true) => {
                self.rewrite_parity(stripe, Parity::Q)?;
                RecoveryCase::QOnly
            }
            (0, true, true) => {
                self.refresh_parity(stripe)?;
                RecoveryCase::Pq
            }
            (1, false, false) => {
                self.recover_single_from_p(stripe, failed_cols[0])?;
                RecoveryCase::DOnly
            }
            (1, true, false) => {
                self.recover_single_from_q(stripe, failed_cols[0])?;
                self.rewrite_parity(stripe, Parity::P)?;
                RecoveryCase::DP
            }
            (1, false, true) => {
                self.recover_single_from_p(stripe, failed_cols[0])?;
                self.rewrite_parity(stripe, Parity::Q)?;
                RecoveryCase::DQ
            }
            (2, false, false) => {
                self.recover_double(stripe, failed_cols[0], failed_cols[1])?;
                RecoveryCase::Dd
            }
            _ => unreachable!("failure counts >= 3 are rejected above"),
        };

        for &j in &failed_cols {
            self.column_stale[data_cols[j]][stripe] = false;
        }
        if p_failed {
            self.column_stale[p_disk][stripe] = false;
        }
        if q_failed {
            self.column_stale[q_disk][stripe] = false;
        }
        Ok(RecoveryOutcome { stripe, case })
    }

    fn recover_single_from_p(&mut self, stripe: usize, missing_col: usize) -> RaidResult<()> {
        let (survivors, _) = self.read_survivor_data(stripe, &[missing_col])?;
        let refs: Vec<&[u8]> = survivors.iter().map(Vec::as_slice).collect();
        let p = self.read_parity_block(stripe, Parity::P)?;
        let recovered = parity::recover_from_p(&p, &refs);
        self.write_data_block(stripe, missing_col, &recovered)
    }

    fn recover_single_from_q(&mut self, stripe: usize, missing_col: usize) -> RaidResult<()> {
        let (survivors, survivor_cols) = self.read_survivor_data(stripe, &[missing_col])?;
        let refs: Vec<&[u8]> = survivors.iter().map(Vec::as_slice).collect();
        let q = self.read_parity_block(stripe, Parity::Q)?;
        let recovered = parity::recover_from_q(&q, &refs, &survivor_cols, missing_col);
        self.write_data_block(stripe, missing_col, &recovered)
    }

    fn recover_double(&mut self, stripe: usize, x: usize, y: usize) -> RaidResult<()> {
        let (survivors, survivor_cols) = self.read_survivor_data(stripe, &[x, y])?;
        let refs: Vec<&[u8]> = survivors.iter().map(Vec::as_slice).collect();
        let p = self.read_parity_block(stripe, Parity::P)?;
        let q = self.read_parity_block(stripe, Parity::Q)?;
        let (dx, dy) = parity::recover_two(&p, &q, &refs, &survivor_cols, x, y);
        self.write_data_block(stripe, x, &dx)?;
        self.write_data_block(stripe, y, &dy)
    }

    fn rewrite_parity(&mut self, stripe: usize, which: Parity) -> RaidResult<()> {
        let blocks = self.read_all_data_blocks(stripe)?;
        let refs: Vec<&[u8]> = blocks.iter().map(Vec::as_slice).collect();
        let value = match which {
            Parity::P => parity::p_of(&refs),
            Parity::Q => parity::q_of(&refs, &(0..refs.len()).collect::<Vec<_>>()),
        };
        self.write_parity_block(stripe, which, &value)
    }

    fn refresh_parity(&mut self, stripe: usize) -> RaidResult<()> {
        let blocks = self.read_all_data_blocks(stripe)?;
        let refs: Vec<&[u8]> = blocks.iter().map(Vec::as_slice).collect();
        let (p, q) = parity::p_and_q(&refs);
        self.write_parity_block(stripe, Parity::P, &p)?;
        self.write_parity_block(stripe, Parity::Q, &q)
    }

    fn read_all_data_blocks(&self, stripe: usize) -> RaidResult<Vec<Vec<u8>>> {
        (0..self.config.data_disks).map(|j| self.read_data_block(stripe, j)).collect()
    }

    /// Reads every data block of `stripe` except the columns in
    /// `excluding`, returning the blocks alongside their column indices in
    /// ascending order.
    fn read_survivor_data(
        &self,
        stripe: usize,
        excluding: &[usize],
    ) -> RaidResult<(Vec<Vec<u8>>, Vec<usize>)> {
        let mut blocks = Vec::new();
        let mut cols = Vec::new();
        for j in 0..self.config.data_disks {
            if excluding.contains(&j) {
                continue;
            }
            blocks.push(self.read_data_block(stripe, j)?);
            cols.push(j);
        }
        Ok((blocks, cols))
    }

    fn read_data_block(&self, stripe: usize, col: usize) -> RaidResult<Vec<u8>> {
        let disk = self.geometry.data_columns(stripe)[col];
        let byte_offset = stripe as u64 * self.config.block_size;
        self.array
            .read_at(disk, byte_offset, self.config.block_size as usize)
            .ok_or_else(|| RaidError::IoError(format!("read failed: disk {disk} stripe {stripe}")))
    }

    fn write_data_block(&mut self, stripe: usize, col: usize, bytes: &[u8]) -> RaidResult<()> {
        let disk = self.geometry.data_columns(stripe)[col];
        let byte_offset = stripe as u64 * self.config.block_size;
        if self.array.write_at(disk, byte_offset, bytes) {
            Ok(())
        } else {
            Err(RaidError::IoError(format!("write failed: disk {disk} stripe {stripe}")))
        }
    }

    fn read_parity_block(&self, stripe: usize, which: Parity) -> RaidResult<Vec<u8>> {
        let (p_disk, q_disk) = self.geometry.parity_columns(stripe);
        let disk = match which {
            Parity::P => p_disk,
            Parity::Q => q_disk,
        };
        let byte_offset = stripe as u64 * self.config.block_size;
        self.array
            .read_at(disk, byte_offset, self.config.block_size as usize)
            .ok_or_else(|| RaidError::IoError(format!("read failed: disk {disk} stripe {stripe}")))
    }

    fn write_parity_block(&mut self, stripe: usize, which: Parity, bytes: &[u8]) -> RaidResult<()> {
        let (p_disk, q_disk) = self.geometry.parity_columns(stripe);
        let disk = match which {
            Parity::P => p_disk,
            Parity::Q => q_disk,
        };
        let byte_offset = stripe as u64 * self.config.block_size;
        if self.array.write_at(disk, byte_offset, bytes) {
            Ok(())
        } else {
            Err(RaidError::IoError(format!("write failed: disk {disk} stripe {stripe}")))
        }
    }

    fn write_stripe_range(&mut self, stripe: usize, offset: u64, data: &[u8]) -> RaidResult<()> {
        let len = u64::try_from(data.len())
            .map_err(|_| RaidError::BoundsError("range too large for u64".to_string()))?;
        for seg in self.geometry.decompose(stripe, offset, len)? {
            let start = seg.logical_offset as usize;
            let end = start + seg.len as usize;
            if !self.array.write_at(seg.disk, seg.disk_offset, &data[start..end]) {
                return Err(RaidError::IoError(format!(
                    "write failed: disk {} stripe {stripe}",
                    seg.disk
                )));
            }
        }
        Ok(())
    }

    fn read_stripe_range(&self, stripe: usize, offset: u64, len: u64) -> RaidResult<Vec<u8>> {
        let mut out = vec![0u8; len as usize];
        for seg in self.geometry.decompose(stripe, offset, len)? {
            let bytes = self.array.read_at(seg.disk, seg.disk_offset, seg.len as usize).ok_or_else(|| {
                RaidError::IoError(format!("read failed: disk {} stripe {stripe}", seg.disk))
            })?;
            let start = seg.logical_offset as usize;
            out[start..start + seg.len as usize].copy_from_slice(&bytes);
        }
        Ok(out)
    }
}
