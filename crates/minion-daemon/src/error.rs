//! Daemon-related errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a daemon run.
///
/// Everything here is raised before the loop starts or while tearing it
/// down. Failures inside an iteration never surface as a `DaemonError`;
/// they go through the exception policy and the log instead.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Another instance holds the lock file.
    #[error("Daemon already running with a PID of {pid} (lock file: {path})")]
    AlreadyRunning { path: PathBuf, pid: String },

    /// Lock path contains characters outside `[\w/.]`.
    #[error("Invalid pidfile name: {0}")]
    InvalidLockPath(PathBuf),

    /// Failed to create the lock file or its directory.
    #[error("Failed to create PID file at {path}: {reason}")]
    LockCreation { path: PathBuf, reason: String },

    /// Process fork failed.
    #[error("Failed to fork process: {0}")]
    ForkFailed(String),

    /// Failed to set up signal handlers.
    #[error("Failed to set up signal handlers: {0}")]
    SignalSetup(String),

    /// Failed to deliver a signal to another process.
    #[error("Failed to signal PID {pid}: {reason}")]
    SignalSend { pid: u32, reason: String },

    /// Failed to build the async runtime that drives the loop.
    #[error("Failed to start runtime: {0}")]
    Runtime(String),

    /// A setup or teardown hook failed.
    #[error("Worker hook '{hook}' failed: {source:#}")]
    Hook {
        hook: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_running_error() {
        let err = DaemonError::AlreadyRunning {
            path: PathBuf::from("/tmp/test.pid"),
            pid: "12345".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("already running with a PID of 12345"));
        assert!(msg.contains("/tmp/test.pid"));
    }

    #[test]
    fn test_invalid_lock_path_error() {
        let err = DaemonError::InvalidLockPath(PathBuf::from("/tmp/bad name.pid"));
        assert!(err.to_string().contains("Invalid pidfile name"));
    }

    #[test]
    fn test_fork_failed_error() {
        let err = DaemonError::ForkFailed("EAGAIN".to_string());
        assert!(err.to_string().contains("fork"));
        assert!(err.to_string().contains("EAGAIN"));
    }

    #[test]
    fn test_hook_error_includes_cause_chain() {
        let source = anyhow::anyhow!("disk full").context("opening queue");
        let err = DaemonError::Hook {
            hook: "before",
            source,
        };
        let msg = err.to_string();
        assert!(msg.contains("before"));
        assert!(msg.contains("opening queue"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let daemon_err: DaemonError = io_err.into();
        assert!(daemon_err.to_string().contains("file not found"));
    }
}
