//! Process forking.
//!
//! Detachment is single-level: the parent returns to its caller, the child
//! carries on into the loop. There is no second fork or `setsid`.

use crate::error::DaemonError;

/// Environment variable marking a process that was started as the detached
/// child of a re-launch (platforms without `fork`).
pub const DETACHED_ENV: &str = "MINION_DETACHED";

/// Which side of a fork the caller is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForkOutcome {
    /// The original process. It must not enter the loop.
    Parent { child_pid: u32 },
    /// The detached process that runs the loop.
    Child,
}

/// Splits the current process in two.
pub trait Forker {
    fn fork(&self) -> Result<ForkOutcome, DaemonError>;
}

/// Forker backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemForker;

#[cfg(unix)]
impl Forker for SystemForker {
    fn fork(&self) -> Result<ForkOutcome, DaemonError> {
        use nix::unistd::{fork, ForkResult};

        // SAFETY: the controller forks before it builds its runtime, so the
        // process is still single-threaded here.
        match unsafe { fork() } {
            Ok(ForkResult::Parent { child }) => Ok(ForkOutcome::Parent {
                child_pid: child.as_raw() as u32,
            }),
            Ok(ForkResult::Child) => Ok(ForkOutcome::Child),
            Err(e) => Err(DaemonError::ForkFailed(e.to_string())),
        }
    }
}

#[cfg(not(unix))]
impl Forker for SystemForker {
    fn fork(&self) -> Result<ForkOutcome, DaemonError> {
        use std::process::{Command, Stdio};

        if std::env::var_os(DETACHED_ENV).is_some() {
            return Ok(ForkOutcome::Child);
        }

        let exe = std::env::current_exe()
            .map_err(|e| DaemonError::ForkFailed(format!("current executable: {}", e)))?;

        let child = Command::new(exe)
            .args(std::env::args_os().skip(1))
            .env(DETACHED_ENV, "1")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| DaemonError::ForkFailed(e.to_string()))?;

        Ok(ForkOutcome::Parent {
            child_pid: child.id(),
        })
    }
}
