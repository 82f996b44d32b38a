//! Command-line argument definitions for the RAID-6 storage engine CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Cli defines the root command for the RAID-6 engine binary.
#[derive(Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub array: ArrayArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// `ArrayArgs` configures the simulated disk array every subcommand opens.
#[derive(Args, Debug, Clone)]
pub struct ArrayArgs {
    /// Directory holding the `disk<i>` backing files.
    #[arg(long, env = "RAID_DATA_PATH", default_value = "./raid-data")]
    pub data_path: String,

    /// Number of data disks (`D`); `parity_disks` is fixed at 2.
    #[arg(long, env = "RAID_DATA_DISKS", default_value_t = 6)]
    pub data_disks: usize,

    /// Block size in bytes (`B`): bytes of one disk within one stripe.
    #[arg(long, env = "RAID_BLOCK_SIZE", default_value_t = 4096)]
    pub block_size: u64,

    /// Per-disk size in bytes (`S`); must be a multiple of `block_size`.
    #[arg(long, env = "RAID_DISK_SIZE", default_value_t = 4096 * 1024)]
    pub disk_size: u64,
}

/// `Command` enumerates the supported CLI subcommands, one per user
/// surface operation from the engine plus the `fail`/`replace` pair used
/// to exercise disk failure in demos.
#[derive(Subcommand)]
pub enum Command {
    /// Save a local file's bytes under a name in the array.
    Save(SaveArgs),
    /// Load a named file's bytes back out to a local path.
    Load(LoadArgs),
    /// Delete a named file, reclaiming its stripe space.
    Delete(DeleteArgs),
    /// Overwrite a named file's bytes with a local file's contents.
    Modify(ModifyArgs),
    /// Probe every disk's liveness, auto-replacing any that failed.
    Status,
    /// Classify and repair every non-empty stripe's failed columns.
    Recover,
    /// Simulate a disk failure (hot-remove) for demos and testing.
    Fail(DiskArgs),
    /// Rebuild a fresh, zero-filled backing store for a disk.
    Replace(DiskArgs),
}

#[derive(Args)]
pub struct SaveArgs {
    /// Local path to read bytes from.
    pub file: PathBuf,
    /// Name to save the file under in the array.
    pub name: String,
}

#[derive(Args)]
pub struct LoadArgs {
    /// Name of the file to load from the array.
    pub name: String,
    /// Local path to write the loaded bytes to.
    pub out: PathBuf,
    /// Verify parity on every touched stripe before reading it.
    #[arg(long, default_value_t = false)]
    pub verify: bool,
}

#[derive(Args)]
pub struct DeleteArgs {
    /// Name of the file to delete.
    pub name: String,
}

#[derive(Args)]
pub struct ModifyArgs {
    /// Name of the file to overwrite.
    pub name: String,
    /// Local path to read the new bytes from.
    pub file: PathBuf,
}

#[derive(Args)]
pub struct DiskArgs {
    /// Column index of the disk to act on.
    pub disk: usize,
}
