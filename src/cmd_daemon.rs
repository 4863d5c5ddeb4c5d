//! Subcommand handlers for Minion.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use minion_config::ConfigLoader;
use minion_daemon::{
    send_stop_signal, Daemon, DaemonConfig, DaemonStatus, LockState, LogHandle, PidLock,
    RunOutcome,
};

use crate::cli::RunArgs;
use crate::paths;
use crate::worker::ExampleWorker;

/// Build the run configuration: file values first, then flags.
pub(crate) fn build_config(args: &RunArgs) -> anyhow::Result<DaemonConfig> {
    let mut config = match &args.config {
        Some(path) => ConfigLoader::load::<DaemonConfig>(&paths::expand(path))
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DaemonConfig::default(),
    };

    if let Some(name) = &args.name {
        config.name = name.clone();
    }
    if args.fork {
        config.fork = true;
    }
    if let Some(pid) = &args.pid {
        config.pid = Some(pid.clone());
    }
    if let Some(sleep_ms) = args.sleep_ms {
        config.sleep_ms = sleep_ms;
    }
    if let Some(cleanup_every) = args.cleanup_every {
        config.cleanup_every = cleanup_every;
    }
    if args.continue_on_error {
        config.break_on_exception = false;
    }
    if let Some(log_dir) = &args.log_dir {
        config.log_dir = Some(log_dir.clone());
    }
    if let Some(max) = args.max_iterations {
        config = config.with_field("max_iterations", max);
    }

    config.pid = config.pid.as_deref().map(paths::expand);
    config.log_dir = config.log_dir.as_deref().map(paths::expand);

    // A forked child has no console
    if config.fork && config.log_dir.is_none() {
        config.log_dir = Some(paths::default_log_dir());
    }

    Ok(config)
}

/// Run the example worker.
pub(crate) fn run(args: RunArgs, log: &LogHandle) -> anyhow::Result<()> {
    let config = build_config(&args)?;

    if let Some(dir) = &config.log_dir {
        log.attach_file(dir, &config.name)?;
    }

    let mut daemon = Daemon::new(config, ExampleWorker::default(), log.clone())?;
    match daemon.execute()? {
        RunOutcome::Parent { .. } => {}
        RunOutcome::Completed(report) => {
            info!("Finished after {} executions", daemon.worker().executed());
            if report.failures > 0 {
                warn!("{} iterations failed", report.failures);
            }
        }
    }

    Ok(())
}

/// Report the state of the daemon owning `pid`.
pub(crate) fn status(pid: &Path) -> anyhow::Result<()> {
    let status = DaemonStatus::inspect(&paths::expand(pid))?;
    info!("{}", status);
    Ok(())
}

/// Signal the daemon owning `pid` and wait for it to exit.
pub(crate) fn stop(pid: &Path, force: bool) -> anyhow::Result<()> {
    let pid_path = paths::expand(pid);
    let status = DaemonStatus::inspect(&pid_path)?;

    let running = match status.state {
        LockState::Running(running) => running,
        LockState::Stale(dead) => {
            warn!("Daemon (PID: {}) is not running; lock file is stale", dead);
            return Ok(());
        }
        LockState::Unreadable(raw) => {
            warn!("Lock file {} does not name a single process: {:?}", pid_path.display(), raw);
            return Ok(());
        }
        LockState::Stopped => {
            info!("Daemon is not running");
            return Ok(());
        }
    };

    info!("Stopping daemon (PID: {})...", running);
    send_stop_signal(running, force)?;

    // Wait for process to exit
    for _ in 0..30 {
        std::thread::sleep(Duration::from_millis(100));
        if !PidLock::is_process_running(running) {
            info!("Daemon stopped");
            // SIGKILL leaves the lock behind
            if pid_path.exists() {
                std::fs::remove_file(&pid_path)
                    .with_context(|| format!("Failed to remove {}", pid_path.display()))?;
            }
            return Ok(());
        }
    }

    if force {
        anyhow::bail!("Daemon (PID: {}) did not stop in time", running);
    }
    warn!("Daemon did not stop gracefully, try --force");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let config = build_config(&RunArgs::default()).unwrap();
        assert_eq!(config, DaemonConfig::default());
    }

    #[test]
    fn test_flags_override_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("minion.toml");
        std::fs::write(
            &file,
            r#"
name = "from-file"
sleep_ms = 250
cleanup_every = 7
queue = "emails"
"#,
        )
        .unwrap();

        let args = RunArgs {
            config: Some(file),
            name: Some("from-flag".to_string()),
            continue_on_error: true,
            max_iterations: Some(4),
            ..Default::default()
        };
        let config = build_config(&args).unwrap();

        assert_eq!(config.name, "from-flag");
        assert_eq!(config.sleep_ms, 250);
        assert_eq!(config.cleanup_every, 7);
        assert!(!config.break_on_exception);
        assert_eq!(config.str_field("queue"), Some("emails"));
        assert_eq!(config.int_field("max_iterations"), Some(4));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let args = RunArgs {
            config: Some(PathBuf::from("/nonexistent/minion.toml")),
            ..Default::default()
        };
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_fork_gets_a_log_dir() {
        let args = RunArgs {
            fork: true,
            ..Default::default()
        };
        let config = build_config(&args).unwrap();
        assert_eq!(config.log_dir, Some(paths::default_log_dir()));
    }

    #[test]
    fn test_run_with_lock() {
        let dir = TempDir::new().unwrap();
        let pid = dir.path().join("example.pid");
        let args = RunArgs {
            pid: Some(pid.clone()),
            sleep_ms: Some(0),
            max_iterations: Some(2),
            ..Default::default()
        };

        run(args, &LogHandle::new()).unwrap();
        assert!(!pid.exists());
    }

    /// Spawn `sleep 30`, reaped in the background once it dies.
    #[cfg(unix)]
    fn spawn_sleeper() -> (u32, std::thread::JoinHandle<()>) {
        let mut child = std::process::Command::new("sleep").arg("30").spawn().unwrap();
        let pid = child.id();
        let reaper = std::thread::spawn(move || {
            let _ = child.wait();
        });
        (pid, reaper)
    }

    #[cfg(unix)]
    #[test]
    fn test_stop_terminates_live_process() {
        for force in [false, true] {
            let (pid, reaper) = spawn_sleeper();
            let dir = TempDir::new().unwrap();
            let lock = dir.path().join("sleeper.pid");
            std::fs::write(&lock, pid.to_string()).unwrap();

            stop(&lock, force).unwrap();
            reaper.join().unwrap();

            assert!(!PidLock::is_process_running(pid), "force={}", force);
            // sleep never cleans up after itself
            assert!(!lock.exists(), "force={}", force);
        }
    }

    #[test]
    fn test_stop_ignores_group_ids() {
        let dir = TempDir::new().unwrap();
        let lock = dir.path().join("group.pid");

        for raw in ["0", "-1", "4294967295"] {
            std::fs::write(&lock, raw).unwrap();
            stop(&lock, true).unwrap();
            // Left for the operator to inspect
            assert_eq!(std::fs::read_to_string(&lock).unwrap(), raw);
        }
    }

    #[test]
    fn test_stop_without_daemon_is_ok() {
        let dir = TempDir::new().unwrap();
        stop(&dir.path().join("none.pid"), false).unwrap();
        status(&dir.path().join("none.pid")).unwrap();
    }
}
