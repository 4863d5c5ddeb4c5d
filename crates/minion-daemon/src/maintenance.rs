//! Periodic maintenance between iterations.

use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::{info, warn};

use crate::logging::LogHandle;

/// Controller-side housekeeping.
///
/// The worker's own `maintenance` hook runs first and drops whatever state
/// it caches; [`run`](Maintenance::run) then flushes the log sinks and
/// reports memory usage. Rust has no collector to trigger, so there is no
/// collection step.
pub struct Maintenance {
    log: LogHandle,
    system: System,
    pid: Pid,
    runs: u64,
}

impl Maintenance {
    pub fn new(log: LogHandle) -> Self {
        Self {
            log,
            system: System::new(),
            pid: Pid::from_u32(std::process::id()),
            runs: 0,
        }
    }

    /// Number of completed maintenance runs.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Resident memory of this process in bytes, if the OS reports it.
    pub fn memory_usage(&mut self) -> Option<u64> {
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]));
        self.system.process(self.pid).map(|p| p.memory())
    }

    /// Flush logs and report memory usage.
    pub fn run(&mut self) {
        self.runs += 1;

        // Buffered sinks otherwise grow for as long as the process lives
        if let Err(e) = self.log.flush() {
            warn!("Failed to flush log sinks: {}", e);
        }

        match self.memory_usage() {
            Some(bytes) => info!(
                memory_bytes = bytes,
                "Running maintenance. Current memory usage: {} bytes.", bytes
            ),
            None => info!("Running maintenance. Current memory usage: unknown."),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::SinkKind;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct FlushCounter(Arc<AtomicUsize>);

    impl Write for FlushCounter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_run_flushes_logs_and_counts() {
        let log = LogHandle::new();
        let counter = FlushCounter::default();
        log.attach(SinkKind::Persistent, "counter", counter.clone());

        let mut maintenance = Maintenance::new(log);
        maintenance.run();
        maintenance.run();

        assert_eq!(maintenance.runs(), 2);
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    #[test]
    fn test_memory_usage_of_current_process() {
        let mut maintenance = Maintenance::new(LogHandle::new());
        let bytes = maintenance.memory_usage().expect("current process is visible");
        assert!(bytes > 0);
    }
}
