//! RAID array configuration and its validation.

#[cfg(test)]
mod config_tests;

use crate::error::{RaidError, RaidResult};

/// Fixed, immutable-after-construction configuration for a `RaidArray`.
#[derive(Clone, Debug)]
pub struct RaidConfig {
    pub data_path: String,
    pub data_disks: usize,
    pub parity_disks: usize,
    pub block_size: u64,
    pub disk_size: u64,
}

impl RaidConfig {
    /// Builds a config with `parity_disks` fixed at 2, validating it.
    ///
    /// # Errors
    /// Returns `RaidError::ConfigInvalid` if `disk_size` is not a multiple
    /// of `block_size`, or if `data_disks < 2`.
    pub fn new(
        data_path: impl Into<String>,
        data_disks: usize,
        block_size: u64,
        disk_size: u64,
    ) -> RaidResult<Self> {
        let config = Self {
            data_path: data_path.into(),
            data_disks,
            parity_disks: 2,
            block_size,
            disk_size,
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns `RaidError::ConfigInvalid` on any invariant violation.
    pub fn validate(&self) -> RaidResult<()> {
        if self.parity_disks != 2 {
            return Err(RaidError::ConfigInvalid(format!(
                "parity_disks must be 2, got {}",
                self.parity_disks
            )));
        }
        if self.data_disks < 2 {
            return Err(RaidError::ConfigInvalid(format!(
                "data_disks must be at least 2, got {}",
                self.data_disks
            )));
        }
        if self.block_size == 0 {
            return Err(RaidError::ConfigInvalid("block_size must be nonzero".to_string()));
        }
        if self.disk_size % self.block_size != 0 {
            return Err(RaidError::ConfigInvalid(format!(
                "disk_size {} is not a multiple of block_size {}",
                self.disk_size, self.block_size
            )));
        }
        Ok(())
    }

    #[must_use]
    pub const fn stripe_width(&self) -> usize {
        self.data_disks + self.parity_disks
    }

    #[must_use]
    pub const fn stripe_count(&self) -> u64 {
        self.disk_size / self.block_size
    }

    #[must_use]
    pub const fn stripe_size(&self) -> u64 {
        self.data_disks as u64 * self.block_size
    }
}
