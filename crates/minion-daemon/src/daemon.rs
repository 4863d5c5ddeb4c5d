//! Lifecycle controller.
//!
//! Drives a [`Worker`] through
//! `Init → ForkDecision → Locking → Setup → Running → Teardown → Exit`.
//! Fork failures and lock contention jump straight to `Aborted` without
//! touching the worker.

use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::DaemonConfig;
use crate::error::DaemonError;
use crate::fork::{ForkOutcome, Forker, SystemForker};
use crate::logging::LogHandle;
use crate::maintenance::Maintenance;
use crate::pid::PidLock;
use crate::policy::{ExceptionPolicy, PolicyDecision};
use crate::signal::{ShutdownFlag, SignalBridge};
use crate::worker::{WorkOutcome, Worker, WorkerContext};

/// Controller lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Init,
    ForkDecision,
    Locking,
    Setup,
    Running,
    Teardown,
    Exit,
    Aborted,
}

impl std::fmt::Display for LifecyclePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecyclePhase::Init => write!(f, "init"),
            LifecyclePhase::ForkDecision => write!(f, "fork_decision"),
            LifecyclePhase::Locking => write!(f, "locking"),
            LifecyclePhase::Setup => write!(f, "setup"),
            LifecyclePhase::Running => write!(f, "running"),
            LifecyclePhase::Teardown => write!(f, "teardown"),
            LifecyclePhase::Exit => write!(f, "exit"),
            LifecyclePhase::Aborted => write!(f, "aborted"),
        }
    }
}

/// Why the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown flag was set, by a signal or by the worker.
    ShutdownRequested,
    /// The work unit returned [`WorkOutcome::Stop`].
    WorkerStop,
    /// A failure and `break_on_exception`.
    ExceptionPolicy,
    /// `before` failed; the loop never ran.
    SetupFailed,
}

/// Counters for a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Loop passes that completed and went on to sleep.
    pub iterations: u64,
    /// Work-unit invocations, including the final one.
    pub work_units: u64,
    pub heartbeats: u64,
    pub maintenance_runs: u64,
    pub sleeps: u64,
    /// Failed heartbeats and work units.
    pub failures: u64,
    pub stop_reason: StopReason,
}

impl RunReport {
    fn new() -> Self {
        Self {
            iterations: 0,
            work_units: 0,
            heartbeats: 0,
            maintenance_runs: 0,
            sleeps: 0,
            failures: 0,
            stop_reason: StopReason::ShutdownRequested,
        }
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} iterations, {} work units, {} failures, {} maintenance runs ({:?})",
            self.iterations, self.work_units, self.failures, self.maintenance_runs, self.stop_reason
        )
    }
}

/// Result of [`Daemon::execute`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// This process forked and is the parent; the loop runs in `child_pid`.
    Parent { child_pid: u32 },
    /// The loop ran in this process and has finished.
    Completed(RunReport),
}

impl RunOutcome {
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            RunOutcome::Completed(report) => Some(report),
            RunOutcome::Parent { .. } => None,
        }
    }
}

/// Supervises a single worker.
pub struct Daemon<W: Worker> {
    config: DaemonConfig,
    worker: W,
    log: LogHandle,
    forker: Box<dyn Forker>,
    shutdown: ShutdownFlag,
    os_signals: bool,
    phase: LifecyclePhase,
}

impl<W: Worker> Daemon<W> {
    /// Create a controller for `worker`.
    pub fn new(config: DaemonConfig, worker: W, log: LogHandle) -> Result<Self, DaemonError> {
        config.validate().map_err(DaemonError::Config)?;

        Ok(Self {
            config,
            worker,
            log,
            forker: Box::new(SystemForker),
            shutdown: ShutdownFlag::new(),
            os_signals: true,
            phase: LifecyclePhase::Init,
        })
    }

    /// Replace the OS forker.
    pub fn with_forker(mut self, forker: impl Forker + 'static) -> Self {
        self.forker = Box::new(forker);
        self
    }

    /// Do not install OS signal handlers. The shutdown flag and
    /// [`signal_bridge`](Self::signal_bridge) still work.
    ///
    /// Use this when embedding the daemon in a process that outlives
    /// [`execute`](Self::execute) and handles its own signals.
    pub fn without_os_signals(mut self) -> Self {
        self.os_signals = false;
        self
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.phase
    }

    pub fn worker(&self) -> &W {
        &self.worker
    }

    pub fn worker_mut(&mut self) -> &mut W {
        &mut self.worker
    }

    pub fn into_worker(self) -> W {
        self.worker
    }

    /// The flag that stops the loop.
    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    /// A bridge that delivers signals into this daemon.
    pub fn signal_bridge(&self) -> SignalBridge {
        SignalBridge::new(self.shutdown.clone())
    }

    fn transition(&mut self, to: LifecyclePhase) {
        debug!("Lifecycle {} -> {}", self.phase, to);
        self.phase = to;
    }

    /// Run the daemon to completion.
    ///
    /// Blocks the calling thread. With `fork` enabled the parent returns
    /// [`RunOutcome::Parent`] immediately; the child runs the loop. Errors are
    /// only returned for failures outside the loop.
    ///
    /// Unless [`without_os_signals`](Self::without_os_signals) was used, the
    /// handlers for SIGINT, SIGTERM, SIGQUIT, SIGHUP, SIGUSR1 and SIGUSR2 stay
    /// installed after this returns. Those signals no longer terminate the
    /// process by default.
    pub fn execute(&mut self) -> Result<RunOutcome, DaemonError> {
        let span = info_span!("daemon", worker = %self.config.name);

        if let Some(child_pid) = span.in_scope(|| self.fork_decision())? {
            return Ok(RunOutcome::Parent { child_pid });
        }

        // Built after the fork so the child owns the only runtime thread.
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                let err = DaemonError::Runtime(e.to_string());
                span.in_scope(|| error!("{}", err));
                self.transition(LifecyclePhase::Aborted);
                err
            })?;

        runtime.block_on(self.run_detached().instrument(span))
    }

    /// Returns the child's PID when this process is the parent.
    fn fork_decision(&mut self) -> Result<Option<u32>, DaemonError> {
        self.transition(LifecyclePhase::ForkDecision);

        if !self.config.fork {
            return Ok(None);
        }

        // Both processes would otherwise write out the same buffered lines
        if let Err(e) = self.log.flush() {
            warn!("Failed to flush log sinks before fork: {}", e);
        }

        match self.forker.fork() {
            Ok(ForkOutcome::Parent { child_pid }) => {
                info!(notice = true, child_pid, "Process forked with a PID of {}", child_pid);
                self.transition(LifecyclePhase::Exit);
                Ok(Some(child_pid))
            }
            Ok(ForkOutcome::Child) => {
                // No controlling terminal from here on
                let detached = self.log.detach_interactive();
                debug!(detached, "Detached interactive log sinks");
                Ok(None)
            }
            Err(e) => {
                error!("Failed to fork process. Exiting. {}", e);
                self.transition(LifecyclePhase::Aborted);
                Err(e)
            }
        }
    }

    async fn run_detached(&mut self) -> Result<RunOutcome, DaemonError> {
        self.transition(LifecyclePhase::Locking);

        if self.os_signals {
            let bridge = self.signal_bridge();
            if let Err(e) = bridge.setup_os_signals() {
                error!("{}", e);
                self.transition(LifecyclePhase::Aborted);
                return Err(e);
            }
        }

        let mut lock = PidLock::new(self.config.pid.clone());
        if let Err(e) = lock.acquire() {
            error!("{}", e);
            self.transition(LifecyclePhase::Aborted);
            return Err(e);
        }

        self.transition(LifecyclePhase::Setup);
        let setup = {
            let ctx = WorkerContext::new(&self.config, &self.shutdown, 0);
            self.worker.before(&ctx).await
        };

        let (report, setup_error) = match setup {
            Ok(()) => {
                self.transition(LifecyclePhase::Running);
                (self.run_loop().await, None)
            }
            Err(e) => {
                error!("Setup failed: {:#}", e);
                let mut report = RunReport::new();
                report.stop_reason = StopReason::SetupFailed;
                report.failures += 1;
                (report, Some(e))
            }
        };

        self.transition(LifecyclePhase::Teardown);
        let teardown = {
            let ctx = WorkerContext::new(&self.config, &self.shutdown, report.work_units);
            self.worker.after(&ctx).await
        };
        if let Err(e) = &teardown {
            error!("Teardown failed: {:#}", e);
        }

        lock.release();
        self.transition(LifecyclePhase::Exit);
        info!("Daemon stopped: {}", report);

        if let Some(source) = setup_error {
            return Err(DaemonError::Hook {
                hook: "before",
                source,
            });
        }
        teardown.map_err(|source| DaemonError::Hook {
            hook: "after",
            source,
        })?;

        Ok(RunOutcome::Completed(report))
    }

    /// The `Running` phase. Never fails; errors go through the policy.
    async fn run_loop(&mut self) -> RunReport {
        let policy = ExceptionPolicy::from_config(&self.config);
        let mut maintenance = Maintenance::new(self.log.clone());
        let sleep = self.config.sleep_interval();
        let mut report = RunReport::new();
        let mut since_maintenance: u32 = 0;

        loop {
            if self.shutdown.is_requested() {
                report.stop_reason = StopReason::ShutdownRequested;
                break;
            }

            let ctx = WorkerContext::new(&self.config, &self.shutdown, report.work_units);

            report.heartbeats += 1;
            if let Err(e) = self.worker.heartbeat(&ctx).await {
                report.failures += 1;
                if policy.on_iteration_error(&e, ctx.iteration(), "heartbeat") == PolicyDecision::Stop {
                    report.stop_reason = StopReason::ExceptionPolicy;
                    break;
                }
            }

            report.work_units += 1;
            // A failure that the policy lets through counts as Continue;
            // an explicit Stop is only honoured from a successful return.
            let outcome = match self.worker.run_once(&ctx).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    report.failures += 1;
                    match policy.on_iteration_error(&e, ctx.iteration(), "work unit") {
                        PolicyDecision::Stop => {
                            report.stop_reason = StopReason::ExceptionPolicy;
                            break;
                        }
                        PolicyDecision::Continue => WorkOutcome::Continue,
                    }
                }
            };

            if self.shutdown.is_requested() {
                report.stop_reason = StopReason::ShutdownRequested;
                break;
            }
            if outcome == WorkOutcome::Stop {
                report.stop_reason = StopReason::WorkerStop;
                break;
            }

            report.iterations += 1;
            since_maintenance += 1;
            if since_maintenance >= self.config.cleanup_every {
                self.worker.maintenance(&ctx).await;
                maintenance.run();
                report.maintenance_runs += 1;
                since_maintenance = 0;
            }

            report.sleeps += 1;
            tokio::time::sleep(sleep).await;
        }

        report
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
