//! Worker capability interface.
//!
//! A worker supplies the unit of work and, optionally, lifecycle hooks.
//! The controller owns the worker and calls the hooks in a fixed order:
//! `before` once, then per iteration `heartbeat` and `run_once`,
//! `maintenance` every `cleanup_every` completed iterations, and `after`
//! once at the end.

use async_trait::async_trait;

use crate::config::DaemonConfig;
use crate::signal::ShutdownFlag;

/// What the controller should do after a work unit returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    /// Keep looping.
    Continue,
    /// Finish this iteration and shut down.
    Stop,
}

impl From<bool> for WorkOutcome {
    fn from(keep_going: bool) -> Self {
        if keep_going {
            WorkOutcome::Continue
        } else {
            WorkOutcome::Stop
        }
    }
}

impl From<()> for WorkOutcome {
    fn from(_: ()) -> Self {
        WorkOutcome::Continue
    }
}

/// Result of one work unit.
pub type WorkResult = anyhow::Result<WorkOutcome>;

/// View of the run handed to every hook.
#[derive(Debug)]
pub struct WorkerContext<'a> {
    config: &'a DaemonConfig,
    shutdown: &'a ShutdownFlag,
    iteration: u64,
}

impl<'a> WorkerContext<'a> {
    pub(crate) fn new(config: &'a DaemonConfig, shutdown: &'a ShutdownFlag, iteration: u64) -> Self {
        Self {
            config,
            shutdown,
            iteration,
        }
    }

    /// The immutable run configuration.
    pub fn config(&self) -> &'a DaemonConfig {
        self.config
    }

    /// Zero-based index of the current work-unit invocation.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Stop the daemon once the current hook returns.
    pub fn request_shutdown(&self) {
        self.shutdown.request();
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.is_requested()
    }
}

/// A long-running background worker.
#[async_trait]
pub trait Worker: Send {
    /// Runs once before the first iteration.
    async fn before(&mut self, _ctx: &WorkerContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs at the start of every iteration, including the last one.
    async fn heartbeat(&mut self, _ctx: &WorkerContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// The unit of work.
    ///
    /// Return [`WorkOutcome::Stop`] or call
    /// [`WorkerContext::request_shutdown`] to end the loop.
    async fn run_once(&mut self, ctx: &WorkerContext<'_>) -> WorkResult;

    /// Periodic housekeeping: drop cached filesystem metadata and other
    /// state that goes stale in a long-running process.
    async fn maintenance(&mut self, _ctx: &WorkerContext<'_>) {}

    /// Runs once after the last iteration, however the loop ended.
    async fn after(&mut self, _ctx: &WorkerContext<'_>) -> anyhow::Result<()> {
        Ok(())
    }
}
