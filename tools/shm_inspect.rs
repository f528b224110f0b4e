// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Shared Memory Region Inspector

Prints the header of named regions (element type, shape, size, generation) or
removes regions left behind by a crashed producer.

Usage:
  shm_inspect --list
  shm_inspect <name> [--dir D] [--json]
  shm_inspect <name> --unlink
*/

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::info;
use vtils::config::load_config_or_default;
use vtils::observability::{init_logging, parse_debug_flags};
use vtils::shm::{inspect_in, unlink_in, RegionDir, RegionInfo};

#[derive(Parser, Debug)]
#[command(name = "shm_inspect", version, about = "Inspect or remove named shared memory regions")]
struct Args {
    /// Region names
    names: Vec<String>,

    /// Region directory (defaults to the configured or platform directory)
    #[arg(long)]
    dir: Option<PathBuf>,

    /// List every region in the directory
    #[arg(long)]
    list: bool,

    /// Remove the named regions instead of printing them
    #[arg(long)]
    unlink: bool,

    /// Print headers as JSON
    #[arg(long)]
    json: bool,
}

fn print_info(info: &RegionInfo, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(info)?);
    } else {
        println!(
            "{:<40} {:>4} {:<16} {:>12} bytes  gen {}",
            info.name,
            info.dtype.name(),
            format!("{:?}", info.shape),
            info.byte_size,
            info.generation
        );
    }
    Ok(())
}

fn main() -> Result<()> {
    let debug_flags = parse_debug_flags();
    let args = Args::parse_from(std::env::args().filter(|a| !a.starts_with("--debug-")));
    let config = load_config_or_default(None, None).context("Failed to load configuration")?;
    let _logging = init_logging(&debug_flags, "warn", None)?;

    let dir = match &args.dir {
        Some(dir) => RegionDir::new(dir),
        None => RegionDir::from_config(&config.shm),
    };

    let names = if args.list {
        dir.list()
            .with_context(|| format!("Failed to list {}", dir.root().display()))?
    } else {
        args.names.clone()
    };
    if names.is_empty() && !args.list {
        bail!("no region names given (use --list to show all)");
    }

    let mut failures = 0;
    for name in &names {
        let outcome = (|| -> Result<()> {
            if args.unlink {
                unlink_in(&dir, name)?;
                info!("Removed '{}'", name);
                println!("removed {}", name);
            } else {
                print_info(&inspect_in(&dir, name)?, args.json)?;
            }
            Ok(())
        })();
        if let Err(e) = outcome {
            eprintln!("{}: {}", name, e);
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{} of {} regions failed", failures, names.len());
    }
    Ok(())
}
