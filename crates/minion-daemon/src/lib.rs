//! # Minion Daemon
//!
//! Turns a unit of work into a supervised, long-running background process.
//!
//! ## Features
//!
//! - Optional fork into the background (the parent returns immediately)
//! - PID lock file preventing duplicate instances
//! - Graceful shutdown on SIGINT/SIGTERM/SIGQUIT; the current iteration always completes
//! - Configurable exception policy (break or continue on a failed iteration)
//! - Periodic maintenance: log flush and memory report every N iterations
//! - Lifecycle hooks: `before`, `heartbeat`, `maintenance`, `after`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use minion_daemon::{Daemon, DaemonConfig, LogHandle, Worker, WorkerContext, WorkResult};
//!
//! struct Tick;
//!
//! #[async_trait::async_trait]
//! impl Worker for Tick {
//!     async fn run_once(&mut self, _ctx: &WorkerContext<'_>) -> WorkResult {
//!         tracing::info!("tick");
//!         Ok(().into())
//!     }
//! }
//!
//! let config = DaemonConfig::named("tick").with_pid("/tmp/minion/tick.pid");
//! let mut daemon = Daemon::new(config, Tick, LogHandle::new())?;
//! daemon.execute()?;
//! ```

pub mod config;
pub mod daemon;
pub mod error;
pub mod fork;
pub mod logging;
pub mod maintenance;
pub mod pid;
pub mod policy;
pub mod signal;
pub mod status;
pub mod worker;

// Re-exports
pub use config::DaemonConfig;
pub use daemon::{Daemon, LifecyclePhase, RunOutcome, RunReport, StopReason};
pub use error::DaemonError;
pub use fork::{ForkOutcome, Forker, SystemForker, DETACHED_ENV};
pub use logging::{LogHandle, SinkKind};
pub use maintenance::Maintenance;
pub use pid::PidLock;
pub use policy::{ExceptionPolicy, PolicyDecision};
pub use signal::{send_stop_signal, ShutdownFlag, Signal, SignalBridge};
pub use status::{DaemonStatus, LockState};
pub use worker::{WorkOutcome, WorkResult, Worker, WorkerContext};
