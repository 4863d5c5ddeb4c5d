//! Minion - supervised worker daemons
//!
//! Main entry point for the Minion CLI.

mod cli;
mod cmd_daemon;
mod paths;
mod worker;

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::util::SubscriberInitExt;

use minion_daemon::{LogHandle, DETACHED_ENV};

use crate::cli::{Cli, Commands};

/// Set up the log handle and install it as the global subscriber.
///
/// A process re-launched as a detached child starts without a console sink.
fn init_tracing() -> LogHandle {
    let log = LogHandle::new();
    if std::env::var_os(DETACHED_ENV).is_none() {
        log.attach_console();
    }

    let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    log.subscriber(&directives).init();
    log
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let log = init_tracing();

    let result = match cli.command {
        Commands::Run(args) => cmd_daemon::run(args, &log),
        Commands::Status { pid } => cmd_daemon::status(&pid),
        Commands::Stop { pid, force } => cmd_daemon::stop(&pid, force),
    };

    let code = match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    };

    if let Err(e) = log.flush() {
        eprintln!("Failed to flush logs: {}", e);
    }
    code
}
