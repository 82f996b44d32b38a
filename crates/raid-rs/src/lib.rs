//! RAID-6 parity mathematics, stripe geometry, allocation and recovery
//! for a single-node simulated disk array.
//!
//! See [`RaidArray`] for the top-level save/load/delete/modify surface.

pub mod config;
pub mod error;
pub mod geometry;
pub mod gf;
pub mod metrics;
pub mod parity;
pub mod retention;

pub use config::RaidConfig;
pub use error::{RaidError, RaidResult};
pub use retention::volume::{RaidArray, RecoveryOutcome, Verification};
