//! CLI definitions for Minion.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Minion CLI.
#[derive(Parser)]
#[command(name = "minion")]
#[command(about = "Run a worker as a supervised background daemon")]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the example worker
    Run(RunArgs),

    /// Show whether the daemon owning a lock file is alive
    Status {
        /// Lock file written by `run --pid`
        #[arg(long)]
        pid: PathBuf,
    },

    /// Stop the daemon owning a lock file
    Stop {
        /// Lock file written by `run --pid`
        #[arg(long)]
        pid: PathBuf,

        /// Send SIGKILL instead of SIGTERM
        #[arg(long)]
        force: bool,
    },
}

/// Options for `minion run`. Flags override the config file.
#[derive(Args, Debug, Default)]
pub(crate) struct RunArgs {
    /// TOML configuration file
    #[arg(short, long, env = "MINION_CONFIG")]
    pub config: Option<PathBuf>,

    /// Worker name used in log output
    #[arg(long)]
    pub name: Option<String>,

    /// Fork into the background
    #[arg(long)]
    pub fork: bool,

    /// PID lock file
    #[arg(long)]
    pub pid: Option<PathBuf>,

    /// Pause between iterations in milliseconds
    #[arg(long)]
    pub sleep_ms: Option<u64>,

    /// Completed iterations between maintenance runs
    #[arg(long)]
    pub cleanup_every: Option<u32>,

    /// Keep running after a failed iteration
    #[arg(long)]
    pub continue_on_error: bool,

    /// Directory for the persistent log file
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Stop after this many iterations
    #[arg(long)]
    pub max_iterations: Option<i64>,
}
