use anyhow::{Context, Result};
use clap::Parser;

mod cli;

use cli::{ArrayArgs, Cli, Command};
use raid_rs::{RaidArray, RaidConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut array = open_array(&cli.array)?;

    match cli.command {
        Command::Save(args) => {
            let data = std::fs::read(&args.file)
                .with_context(|| format!("reading {}", args.file.display()))?;
            array
                .save(&args.name, &data)
                .with_context(|| format!("saving {}", args.name))?;
            info!("saved {} ({} bytes)", args.name, data.len());
        }
        Command::Load(args) => {
            let data = array
                .load(&args.name, args.verify)
                .with_context(|| format!("loading {}", args.name))?;
            std::fs::write(&args.out, &data)
                .with_context(|| format!("writing {}", args.out.display()))?;
            info!("loaded {} ({} bytes) -> {}", args.name, data.len(), args.out.display());
        }
        Command::Delete(args) => {
            array.delete(&args.name).with_context(|| format!("deleting {}", args.name))?;
            info!("deleted {}", args.name);
        }
        Command::Modify(args) => {
            let data = std::fs::read(&args.file)
                .with_context(|| format!("reading {}", args.file.display()))?;
            array
                .modify(&args.name, &data)
                .with_context(|| format!("modifying {}", args.name))?;
            info!("modified {} ({} bytes)", args.name, data.len());
        }
        Command::Status => {
            let liveness = array.check_disks_status().context("probing disks")?;
            for (i, alive) in liveness.iter().enumerate() {
                println!("disk {i}: {}", if *alive { "OK" } else { "FAILED (replaced)" });
            }
        }
        Command::Recover => {
            let outcomes = array.recover_disks().context("recovering disks")?;
            for outcome in &outcomes {
                println!("stripe {}: {:?}", outcome.stripe, outcome.case);
            }
            info!("recovered {} non-empty stripes", outcomes.len());
        }
        Command::Fail(args) => {
            array.fail_disk(args.disk).with_context(|| format!("failing disk {}", args.disk))?;
            warn!("disk {} failed (simulated)", args.disk);
        }
        Command::Replace(args) => {
            array
                .replace_disk(args.disk)
                .with_context(|| format!("replacing disk {}", args.disk))?;
            info!("disk {} replaced", args.disk);
        }
    }

    Ok(())
}

fn open_array(args: &ArrayArgs) -> Result<RaidArray> {
    let config = RaidConfig::new(args.data_path.clone(), args.data_disks, args.block_size, args.disk_size)
        .context("validating RAID configuration")?;
    RaidArray::open(config).context("opening disk array")
}

fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();
}
