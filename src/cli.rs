use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mirrorfleet::NodeSpec;

/// mirrorfleet - keep remote machines mirroring a local directory.
#[derive(Parser, Debug)]
#[command(name = "mirrorfleet")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv); RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bootstrap every node, then mirror local changes until Ctrl+C.
    Run {
        /// Configuration file (default: ./mirrorfleet.toml, then the user config dir).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Extra node as user@host[:port]:/remote/root (repeatable).
        #[arg(long = "node", value_name = "SPEC")]
        nodes: Vec<NodeSpec>,

        /// Simulate the remote side in memory and log every remote call.
        #[arg(long)]
        dry_run: bool,

        /// Print fleet status as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print the effective configuration.
    Config {
        /// Configuration file (default: ./mirrorfleet.toml, then the user config dir).
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print as JSON instead of TOML.
        #[arg(long)]
        json: bool,
    },
}
