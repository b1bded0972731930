//! FileFerry CLI - Batch File Transfer Utility
//!
//! Copies or moves every matching file of a source directory into a target
//! directory, across local disk, FTP and SFTP backends.

use anyhow::Context;
use clap::Parser;
use fileferry::config::{CliArgs, Commands, OperationArg, TransferOptions};
use fileferry::core::TransferEngine;
use mimalloc::MiMalloc;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    // Parse CLI arguments
    let args = CliArgs::parse();

    // Handle result
    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: CliArgs) -> anyhow::Result<()> {
    let (options, operation) = match args.command {
        Commands::Copy(ref transfer) => (TransferOptions::from_cli(transfer), OperationArg::Copy),
        Commands::Move(ref transfer) => (TransferOptions::from_cli(transfer), OperationArg::Move),
        Commands::Job { ref path, operation } => (load_job(path)?, operation),
    };

    let engine = TransferEngine::new(options)?;
    let processed = match operation {
        OperationArg::Copy => engine.copy_files().context("copy failed")?,
        OperationArg::Move => engine.move_files().context("move failed")?,
    };

    match operation {
        OperationArg::Copy => println!("{} file(s) copied", processed),
        OperationArg::Move => println!("{} file(s) moved", processed),
    }

    Ok(())
}

/// Load an options snapshot from a JSON job file
fn load_job(path: &Path) -> anyhow::Result<TransferOptions> {
    let file =
        File::open(path).with_context(|| format!("cannot open job file {}", path.display()))?;
    let options = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("invalid job file {}", path.display()))?;
    Ok(options)
}
