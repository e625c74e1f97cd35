//! `mkfs`: formats a SOFS volume on an existing backing file (spec.md §6).

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::info;

use sofs::consts::DEFAULT_VOLUME_NAME;
use sofs::format::{format_volume, FormatOptions};

/// Format a SOFS volume on an existing, pre-sized backing file.
#[derive(Parser)]
#[command(name = "mkfs", version, about)]
struct Args {
    /// Volume name stamped into the superblock (default: "SOFS14").
    #[arg(short = 'n', long = "name")]
    name: Option<String>,

    /// Inode count (default: blockCount / 8). Negative values are rejected.
    #[arg(short = 'i', long = "inodes", allow_hyphen_values = true)]
    inodes: Option<i64>,

    /// Zero every free cluster's body, not just its header.
    #[arg(short = 'z', long = "zero")]
    zero: bool,

    /// Suppress the informational banner on success.
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Backing file to format. Its length must already be a positive
    /// multiple of the block size.
    support_file: PathBuf,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    if let Some(n) = args.inodes {
        if n < 0 {
            return fail(sofs::SofsError::InvalidArgument);
        }
    }

    let opts = FormatOptions {
        volume_name: args.name.unwrap_or_else(|| DEFAULT_VOLUME_NAME.to_string()),
        inode_count: args.inodes.map(|n| n as u32),
        zero_mode: args.zero,
    };

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0);

    if !args.quiet {
        info!("formatting {:?}", args.support_file);
    }

    // Non-goal (spec.md §1): no real multi-user identity plumbing; the
    // formatter stamps the invoking process as uid/gid 0, matching the
    // root bypass in access.rs.
    match format_volume(&args.support_file, &opts, 0, 0, now) {
        Ok(()) => {
            if !args.quiet {
                println!("mkfs: {:?} formatted", args.support_file);
            }
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn fail(e: sofs::SofsError) -> ExitCode {
    eprintln!("mkfs: error #{} - {}", e.code(), e);
    ExitCode::FAILURE
}
