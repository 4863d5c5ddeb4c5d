//! PID file management for daemon processes.
//!
//! The lock is advisory: it is enforced by the existence of the file, not by
//! OS-level file locking. A daemon that dies without cleaning up leaves the
//! file behind, and later instances are refused until it is removed.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, info, warn};

use crate::error::DaemonError;

/// Mode for a lock directory created on demand (setgid, world-writable).
#[cfg(unix)]
const LOCK_DIR_MODE: u32 = 0o2777;

/// Mode for the lock file itself.
#[cfg(unix)]
const LOCK_FILE_MODE: u32 = 0o666;

/// Single-instance lock backed by a PID file.
#[derive(Debug)]
pub struct PidLock {
    path: Option<PathBuf>,
    held: bool,
}

impl PidLock {
    /// Create a lock for `path`. `None` makes every operation a no-op.
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path, held: false }
    }

    /// Get the configured lock path.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Check if we hold the lock.
    pub fn is_held(&self) -> bool {
        self.held
    }

    /// Reject paths outside the `[\w/.]` character set.
    pub fn validate(path: &Path) -> Result<(), DaemonError> {
        static PATH_RE: OnceLock<Regex> = OnceLock::new();
        let re = PATH_RE
            .get_or_init(|| Regex::new(r"^[\w/.]+$").expect("lock path pattern is a valid regex"));

        match path.to_str() {
            Some(s) if re.is_match(s) => Ok(()),
            _ => Err(DaemonError::InvalidLockPath(path.to_path_buf())),
        }
    }

    /// Read the PID recorded in a lock file.
    ///
    /// Returns the raw trimmed contents, since a foreign file may not hold a
    /// number at all.
    pub fn read_pid(path: &Path) -> Result<Option<String>, DaemonError> {
        match fs::read_to_string(path) {
            Ok(contents) => Ok(Some(contents.trim().to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Try to acquire the lock.
    ///
    /// Writes the current PID to the file. Fails with
    /// [`DaemonError::AlreadyRunning`] if the file already exists.
    pub fn acquire(&mut self) -> Result<(), DaemonError> {
        let Some(path) = self.path.clone() else {
            debug!("No PID file configured, skipping instance lock");
            return Ok(());
        };

        Self::validate(&path)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                create_lock_dir(parent).map_err(|e| DaemonError::LockCreation {
                    path: path.clone(),
                    reason: format!("Failed to create parent directory: {}", e),
                })?;
            }
        }

        let mut options = OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(LOCK_FILE_MODE);
        }

        let mut file = match options.open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                let pid = Self::read_pid(&path)?.unwrap_or_default();
                return Err(DaemonError::AlreadyRunning { path, pid });
            }
            Err(e) => {
                return Err(DaemonError::LockCreation {
                    path,
                    reason: e.to_string(),
                });
            }
        };

        // From here on the file exists and is ours; clean it up on any failure.
        self.held = true;

        let pid = std::process::id();
        write!(file, "{}", pid).map_err(|e| DaemonError::LockCreation {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // The open mode is filtered through the umask
            fs::set_permissions(&path, fs::Permissions::from_mode(LOCK_FILE_MODE)).map_err(
                |e| DaemonError::LockCreation {
                    path: path.clone(),
                    reason: e.to_string(),
                },
            )?;
        }

        info!("PID file created: {} (PID: {})", path.display(), pid);
        Ok(())
    }

    /// Remove the lock file if we hold it.
    ///
    /// Failure is logged and otherwise ignored.
    pub fn release(&mut self) {
        if !self.held {
            return;
        }
        self.held = false;

        let Some(path) = self.path.as_deref() else {
            return;
        };

        match fs::remove_file(path) {
            Ok(()) => info!("PID file removed: {}", path.display()),
            Err(e) => warn!("Failed to remove PID file {}: {}", path.display(), e),
        }
    }

    /// Parse lock file contents as a PID that can be signalled on its own.
    ///
    /// `kill` treats `0` and negative values as process groups, so only
    /// `1..=i32::MAX` is accepted.
    pub fn parse_pid(raw: &str) -> Option<u32> {
        raw.trim()
            .parse::<i32>()
            .ok()
            .filter(|pid| *pid > 0)
            .map(|pid| pid as u32)
    }

    /// Check if a process with the given PID is running.
    ///
    /// A process owned by another user still counts as running. PIDs outside
    /// [`parse_pid`](Self::parse_pid)'s range never do.
    #[cfg(unix)]
    pub fn is_process_running(pid: u32) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};

        let Some(target) = signal_target(pid) else {
            return false;
        };

        // Signal 0 only checks for existence
        matches!(kill(target, None::<Signal>), Ok(()) | Err(Errno::EPERM))
    }

    #[cfg(not(unix))]
    pub fn is_process_running(pid: u32) -> bool {
        // On non-Unix systems, assume process is running if we can't check
        i32::try_from(pid).is_ok_and(|pid| pid > 0)
    }
}

/// A single process to signal, or `None` when `kill` would read `pid` as a
/// process group.
#[cfg(unix)]
pub(crate) fn signal_target(pid: u32) -> Option<nix::unistd::Pid> {
    i32::try_from(pid)
        .ok()
        .filter(|pid| *pid > 0)
        .map(nix::unistd::Pid::from_raw)
}

impl Drop for PidLock {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(unix)]
fn create_lock_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::{DirBuilderExt, PermissionsExt};

    fs::DirBuilder::new()
        .recursive(true)
        .mode(LOCK_DIR_MODE)
        .create(dir)?;

    // Re-apply the mode, the umask has already been subtracted
    if let Err(e) = fs::set_permissions(dir, fs::Permissions::from_mode(LOCK_DIR_MODE)) {
        warn!("Could not set permissions on {}: {}", dir.display(), e);
    }
    Ok(())
}

#[cfg(not(unix))]
fn create_lock_dir(dir: &Path) -> std::io::Result<()> {
    fs::create_dir_all(dir)
}

#[cfg(test)]
#[path = "pid_tests.rs"]
mod tests;
