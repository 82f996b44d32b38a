//! Error kinds surfaced by the RAID-6 engine.
//!
//! Modeled on the retained `FsError`/`FsResult` split: a small, closed
//! enum that callers can match on, rather than threading `anyhow`
//! context through every layer. Disk-facade I/O still reports through
//! `anyhow::Result` (see `retention::disk`); the engine wraps those at
//! its own boundary as `RaidError::IoError`.

use std::fmt;

/// Classifies why a `RaidArray` operation failed.
#[derive(Debug)]
pub enum RaidError {
    /// `parity_disks != 2` or `disk_size` is not a multiple of `block_size`.
    ConfigInvalid(String),
    /// An offset/length pair fell outside a disk or a stripe's data-space.
    BoundsError(String),
    /// The requested allocation exceeds `left_size`.
    NoSpace { requested: u64, available: u64 },
    /// A full-stripe chunk did not fit the largest available remaining
    /// stripe, and the allocator has no fragmentation-splitting policy.
    FragmentationUnhandled { chunk_size: u64, largest_free: u64 },
    /// `load`/`delete`/`modify` referenced a name with no placement.
    UnknownFile(String),
    /// A verified load found P and/or Q did not match recomputed values.
    ParityMismatch { stripe: usize },
    /// Three or more columns of one stripe are failed; no recipe applies.
    Unrecoverable { stripe: usize },
    /// Propagated from the disk facade; the offending disk is now failed.
    IoError(String),
}

impl fmt::Display for RaidError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigInvalid(msg) => write!(f, "invalid configuration: {msg}"),
            Self::BoundsError(msg) => write!(f, "out of bounds: {msg}"),
            Self::NoSpace {
                requested,
                available,
            } => write!(
                f,
                "not enough space: requested {requested} bytes, {available} available"
            ),
            Self::FragmentationUnhandled {
                chunk_size,
                largest_free,
            } => write!(
                f,
                "fragmentation: need a {chunk_size}-byte free stripe, largest available is {largest_free}"
            ),
            Self::UnknownFile(name) => write!(f, "unknown file: {name}"),
            Self::ParityMismatch { stripe } => write!(f, "parity mismatch on stripe {stripe}"),
            Self::Unrecoverable { stripe } => {
                write!(f, "stripe {stripe} has too many failed columns to recover")
            }
            Self::IoError(msg) => write!(f, "disk i/o error: {msg}"),
        }
    }
}

impl std::error::Error for RaidError {}

impl From<anyhow::Error> for RaidError {
    fn from(err: anyhow::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

/// Result alias used throughout the engine's public surface.
pub type RaidResult<T> = Result<T, RaidError>;
