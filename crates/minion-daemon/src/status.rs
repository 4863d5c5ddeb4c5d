//! Lock-file status for an out-of-process daemon.

use std::path::{Path, PathBuf};

use crate::error::DaemonError;
use crate::pid::PidLock;

/// What a lock file says about its daemon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    /// No lock file.
    Stopped,
    /// Lock file names a live process.
    Running(u32),
    /// Lock file names a process that no longer exists.
    Stale(u32),
    /// Lock file does not hold a single positive PID.
    Unreadable(String),
}

/// Daemon status information.
#[derive(Debug, Clone)]
pub struct DaemonStatus {
    pub path: PathBuf,
    pub state: LockState,
}

impl DaemonStatus {
    /// Inspect the lock file at `path`.
    pub fn inspect(path: &Path) -> Result<Self, DaemonError> {
        let state = match PidLock::read_pid(path)? {
            None => LockState::Stopped,
            Some(raw) => match PidLock::parse_pid(&raw) {
                Some(pid) if PidLock::is_process_running(pid) => LockState::Running(pid),
                Some(pid) => LockState::Stale(pid),
                None => LockState::Unreadable(raw),
            },
        };

        Ok(Self {
            path: path.to_path_buf(),
            state,
        })
    }

    /// PID of the live daemon, if any.
    pub fn running_pid(&self) -> Option<u32> {
        match self.state {
            LockState::Running(pid) => Some(pid),
            _ => None,
        }
    }
}

impl std::fmt::Display for DaemonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            LockState::Stopped => write!(f, "State: stopped"),
            LockState::Running(pid) => write!(f, "State: running, PID: {}", pid),
            LockState::Stale(pid) => write!(f, "State: stale lock, PID: {} (not running)", pid),
            LockState::Unreadable(raw) => write!(f, "State: unknown, lock holds {:?}", raw),
        }?;
        write!(f, ", Lock: {}", self.path.display())
    }
}
