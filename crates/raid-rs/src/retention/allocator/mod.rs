//! The fragment-aware free-space allocator: a free-size-ordered index over
//! stripes, a per-stripe free-range list, and the file-to-placement map.

#[cfg(test)]
mod allocator_tests;

use std::collections::{BTreeMap, BTreeSet};
use std::collections::HashMap;
use std::ops::Bound;

use crate::error::{RaidError, RaidResult};

/// One entry of a stripe's free-list: `owner = None` means free.
#[derive(Clone, Debug, PartialEq, Eq)]
struct FreeEntry {
    owner: Option<String>,
    length: u64,
}

/// A file's placement within one stripe: the reserved `(offset, length)`
/// ranges, in the order their bytes were written.
pub type Placement = (usize, Vec<(u64, u64)>);

pub struct Allocator {
    /// `free_lists[s]`: offset -> entry, partitioning `[0, stripe_size)`.
    free_lists: Vec<BTreeMap<u64, FreeEntry>>,
    /// Ascending `(remaining_free_bytes, stripe_index)`.
    status: BTreeSet<(u64, usize)>,
    file2stripe: HashMap<String, Vec<Placement>>,
    stripe_size: u64,
    left_size: u64,
}

impl Allocator {
    #[must_use]
    pub fn new(stripe_count: usize, stripe_size: u64) -> Self {
        let mut free_lists = Vec::with_capacity(stripe_count);
        let mut status = BTreeSet::new();
        for s in 0..stripe_count {
            let mut list = BTreeMap::new();
            list.insert(0, FreeEntry { owner: None, length: stripe_size });
            free_lists.push(list);
            status.insert((stripe_size, s));
        }
        Self {
            free_lists,
            status,
            file2stripe: HashMap::new(),
            stripe_size,
            left_size: stripe_count as u64 * stripe_size,
        }
    }

    #[must_use]
    pub const fn stripe_size(&self) -> u64 {
        self.stripe_size
    }

    #[must_use]
    pub const fn left_size(&self) -> u64 {
        self.left_size
    }

    #[must_use]
    pub fn stripe_count(&self) -> usize {
        self.free_lists.len()
    }

    #[must_use]
    pub fn placements(&self, name: &str) -> Option<&[Placement]> {
        self.file2stripe.get(name).map(Vec::as_slice)
    }

    /// Whether a stripe's free-list is a single all-free entry (i.e. no
    /// file has ever touched it, or everything saved into it was deleted
    /// and fully coalesced).
    #[must_use]
    pub fn is_stripe_entirely_free(&self, stripe: usize) -> bool {
        let list = &self.free_lists[stripe];
        list.len() == 1 && list.values().next().is_some_and(|e| e.owner.is_none())
    }

    /// Picks placement stripes for `len` bytes and reserves them under
    /// `name`, replacing any prior placement for that name.
    ///
    /// # Errors
    /// `RaidError::NoSpace` if `len > left_size`. `RaidError::FragmentationUnhandled`
    /// if a chunk cannot fit any single stripe's remaining free space.
    pub fn allocate_new(&mut self, name: &str, len: u64) -> RaidResult<Vec<Placement>> {
        let placements = self.select_and_reserve(name, len)?;
        self.file2stripe.insert(name.to_string(), placements.clone());
        Ok(placements)
    }

    /// Like [`Self::allocate_new`] but appends to an existing file's
    /// placement list instead of replacing it (used by `modify`'s growth
    /// path).
    ///
    /// # Errors
    /// Same as [`Self::allocate_new`].
    pub fn allocate_append(&mut self, name: &str, len: u64) -> RaidResult<Vec<Placement>> {
        let placements = self.select_and_reserve(name, len)?;
        self.file2stripe
            .entry(name.to_string())
            .or_default()
            .extend(placements.clone());
        Ok(placements)
    }

    fn select_and_reserve(&mut self, name: &str, len: u64) -> RaidResult<Vec<Placement>> {
        if len > self.left_size {
            return Err(RaidError::NoSpace { requested: len, available: self.left_size });
        }
        let z = self.stripe_size;
        let full_chunks = (len / z) as usize;
        let remainder = len % z;

        let mut chunk_sizes = vec![z; full_chunks];
        if remainder > 0 {
            chunk_sizes.push(remainder);
        }

        // Select every chunk's stripe on a scratch copy of the status index
        // first; only once the whole request is known to be placeable do we
        // commit those picks to `self.status`. Otherwise a later chunk's
        // `FragmentationUnhandled` would leave earlier chunks' stripes
        // marked full in `status` while their free-lists (never touched
        // below) still hold the bytes, breaking the `sum(remaining) ==
        // left_size` invariant.
        let mut working = self.status.clone();
        let mut stripe2size: Vec<(usize, u64)> = Vec::with_capacity(chunk_sizes.len());
        for size in chunk_sizes {
            if size == z {
                let (remaining, stripe) =
                    working.pop_last().expect("stripe_status must have an entry per stripe");
                if remaining < z {
                    return Err(RaidError::FragmentationUnhandled {
                        chunk_size: size,
                        largest_free: remaining,
                    });
                }
                working.insert((0, stripe));
                stripe2size.push((stripe, size));
            } else {
                let found =
                    working.range((Bound::Included((size, 0usize)), Bound::Unbounded)).next().copied();
                let Some((remaining, stripe)) = found else {
                    let largest_free = working.iter().next_back().map_or(0, |&(r, _)| r);
                    return Err(RaidError::FragmentationUnhandled { chunk_size: size, largest_free });
                };
                working.remove(&(remaining, stripe));
                working.insert((remaining - size, stripe));
                stripe2size.push((stripe, size));
            }
        }
        self.status = working;

        let mut placements = Vec::with_capacity(stripe2size.len());
        for (stripe, size) in stripe2size {
            let ranges = self.reserve(stripe, name, size);
            placements.push((stripe, ranges));
        }
        self.left_size -= len;
        Ok(placements)
    }

    /// Consumes `need` bytes from `stripe`'s free-list in entry order,
    /// splitting the final entry touched if it is larger than needed.
    fn reserve(&mut self, stripe: usize, name: &str, mut need: u64) -> Vec<(u64, u64)> {
        let mut ranges = Vec::new();
        let list = &mut self.free_lists[stripe];
        let free_offsets: Vec<u64> = list
            .iter()
            .filter(|(_, e)| e.owner.is_none())
            .map(|(&o, _)| o)
            .collect();

        for offset in free_offsets {
            if need == 0 {
                break;
            }
            let Some(entry) = list.get(&offset) else { continue };
            if entry.owner.is_some() {
                continue;
            }
            let entry_len = entry.length;

            if entry_len > need {
                list.insert(offset, FreeEntry { owner: Some(name.to_string()), length: need });
                list.insert(offset + need, FreeEntry { owner: None, length: entry_len - need });
                ranges.push((offset, need));
                need = 0;
            } else {
                list.insert(offset, FreeEntry { owner: Some(name.to_string()), length: entry_len });
                ranges.push((offset, entry_len));
                need -= entry_len;
            }
        }
        ranges
    }

    /// Frees `[offset, offset+length)` in `stripe`'s free-list, coalescing
    /// with adjacent free entries, and reflects the reclaimed bytes in
    /// `stripe_status` and `left_size`.
    pub fn free_range(&mut self, stripe: usize, offset: u64, length: u64) {
        if length == 0 {
            return;
        }
        let list = &mut self.free_lists[stripe];
        list.insert(offset, FreeEntry { owner: None, length });

        let mut merged_offset = offset;
        let mut merged_length = length;

        if let Some((&prev_offset, prev_entry)) = list.range(..merged_offset).next_back() {
            let prev_is_free = prev_entry.owner.is_none();
            let prev_length = prev_entry.length;
            if prev_is_free && prev_offset + prev_length == merged_offset {
                list.remove(&merged_offset);
                merged_offset = prev_offset;
                merged_length += prev_length;
                list.insert(merged_offset, FreeEntry { owner: None, length: merged_length });
            }
        }

        let succ_offset = merged_offset + merged_length;
        if let Some(succ_entry) = list.get(&succ_offset) {
            if succ_entry.owner.is_none() {
                let succ_length = succ_entry.length;
                list.remove(&succ_offset);
                merged_length += succ_length;
                list.insert(merged_offset, FreeEntry { owner: None, length: merged_length });
            }
        }

        self.bump_stripe_status(stripe, length);
        self.left_size += length;
    }

    fn bump_stripe_status(&mut self, stripe: usize, freed: u64) {
        if let Some(&(remaining, _)) = self.status.iter().find(|&&(_, s)| s == stripe) {
            self.status.remove(&(remaining, stripe));
            self.status.insert((remaining + freed, stripe));
        }
    }

    /// Releases every byte range held by `name`, coalescing as it goes.
    ///
    /// # Errors
    /// `RaidError::UnknownFile` if `name` has no placement.
    pub fn deallocate(&mut self, name: &str) -> RaidResult<()> {
        let placements = self
            .file2stripe
            .remove(name)
            .ok_or_else(|| RaidError::UnknownFile(name.to_string()))?;

        for (stripe, ranges) in &placements {
            for &(offset, length) in ranges {
                self.free_range(*stripe, offset, length);
            }
        }
        Ok(())
    }

    /// Resizes an already-reserved free-list entry owned by some file
    /// (used when shrinking: the tail past `new_length` is freed
    /// separately via [`Self::free_range`]).
    fn truncate_owned_entry(&mut self, stripe: usize, offset: u64, new_length: u64) {
        if let Some(entry) = self.free_lists[stripe].get_mut(&offset) {
            entry.length = new_length;
        }
    }

    /// Truncates `name`'s placement down to `new_len` total bytes,
    /// freeing (and coalescing) everything beyond that point. Returns the
    /// set of stripes whose free-list changed, so the caller can refresh
    /// parity for them.
    ///
    /// # Errors
    /// `RaidError::UnknownFile` if `name` has no placement.
    pub fn shrink(&mut self, name: &str, new_len: u64) -> RaidResult<Vec<usize>> {
        let mut placements = self
            .file2stripe
            .get(name)
            .cloned()
            .ok_or_else(|| RaidError::UnknownFile(name.to_string()))?;

        let mut touched = Vec::new();
        let mut consumed = 0u64;
        let mut to_free: Vec<(usize, u64, u64)> = Vec::new();
        let mut to_truncate: Vec<(usize, u64, u64)> = Vec::new();

        for (stripe, ranges) in placements.iter_mut() {
            let mut kept = Vec::new();
            let mut stripe_touched = false;
            for &(offset, length) in ranges.iter() {
                if consumed >= new_len {
                    to_free.push((*stripe, offset, length));
                    stripe_touched = true;
                    continue;
                }
                let remaining_allowance = new_len - consumed;
                if length <= remaining_allowance {
                    kept.push((offset, length));
                    consumed += length;
                } else {
                    kept.push((offset, remaining_allowance));
                    to_truncate.push((*stripe, offset, remaining_allowance));
                    to_free.push((*stripe, offset + remaining_allowance, length - remaining_allowance));
                    consumed += remaining_allowance;
                    stripe_touched = true;
                }
            }
            if stripe_touched {
                touched.push(*stripe);
            }
            *ranges = kept;
        }
        placements.retain(|(_, ranges)| !ranges.is_empty());

        for (stripe, offset, new_length) in to_truncate {
            self.truncate_owned_entry(stripe, offset, new_length);
        }
        for (stripe, offset, length) in to_free {
            self.free_range(stripe, offset, length);
        }

        self.file2stripe.insert(name.to_string(), placements);
        touched.sort_unstable();
        touched.dedup();
        Ok(touched)
    }
}
