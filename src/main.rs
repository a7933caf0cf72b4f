//! mirrorfleet CLI
//!
//! Usage: mirrorfleet <COMMAND>
//!
//! Commands:
//!   run     Bootstrap every node and mirror local changes until Ctrl+C
//!   config  Print the effective configuration

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            nodes,
            dry_run,
            json,
        } => commands::run::cmd_run(config.as_deref(), nodes, dry_run, json),
        Commands::Config { config, json } => commands::config::cmd_config(config.as_deref(), json),
    }
}

/// RUST_LOG wins; otherwise `-v` picks the level for this crate.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mirrorfleet={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
