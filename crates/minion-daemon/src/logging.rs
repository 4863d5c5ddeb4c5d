//! Log sink handle.
//!
//! A [`LogHandle`] owns the set of output targets a daemon writes to. It is
//! created by the caller, handed to the controller, and plugged into a
//! `tracing_subscriber` fmt layer as its writer. The controller detaches
//! interactive sinks after forking into the background and flushes
//! persistent sinks during maintenance.

use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter};

use crate::error::DaemonError;

/// Buffer size for persistent sinks before they spill to disk on their own.
const FILE_BUFFER_BYTES: usize = 64 * 1024;

/// Number of rotated log files to keep.
const MAX_LOG_FILES: usize = 30;

/// Kind of output target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    /// Attached to a terminal. Dropped when the daemon detaches.
    Interactive,
    /// Survives detachment (files, journald, ...).
    Persistent,
}

struct Sink {
    kind: SinkKind,
    label: String,
    writer: Box<dyn Write + Send>,
}

/// Shared, cloneable set of log sinks.
#[derive(Clone, Default)]
pub struct LogHandle {
    sinks: Arc<Mutex<Vec<Sink>>>,
}

impl std::fmt::Debug for LogHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sinks = self.sinks.lock();
        f.debug_list()
            .entries(sinks.iter().map(|s| (&s.label, s.kind)))
            .finish()
    }
}

impl LogHandle {
    /// Create a handle with no sinks attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an arbitrary writer.
    pub fn attach(&self, kind: SinkKind, label: impl Into<String>, writer: impl Write + Send + 'static) {
        self.sinks.lock().push(Sink {
            kind,
            label: label.into(),
            writer: Box::new(writer),
        });
    }

    /// Attach standard output as an interactive sink.
    pub fn attach_console(&self) {
        self.attach(SinkKind::Interactive, "stdout", io::stdout());
    }

    /// Attach a daily-rotated log file in `dir` as a persistent sink.
    ///
    /// Output is buffered; it reaches disk on [`flush`](Self::flush) or when
    /// the buffer fills.
    pub fn attach_file(&self, dir: &Path, prefix: &str) -> Result<(), DaemonError> {
        std::fs::create_dir_all(dir)?;

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(prefix)
            .filename_suffix("log")
            .max_log_files(MAX_LOG_FILES)
            .build(dir)
            .map_err(|e| DaemonError::Config(format!("log file in {}: {}", dir.display(), e)))?;

        self.attach(
            SinkKind::Persistent,
            format!("file:{}", dir.display()),
            BufWriter::with_capacity(FILE_BUFFER_BYTES, appender),
        );
        Ok(())
    }

    /// Detach every interactive sink, returning how many were removed.
    ///
    /// Interactive sinks are flushed before they are dropped.
    pub fn detach_interactive(&self) -> usize {
        let mut sinks = self.sinks.lock();
        let before = sinks.len();
        sinks.retain_mut(|sink| {
            if sink.kind == SinkKind::Interactive {
                let _ = sink.writer.flush();
                false
            } else {
                true
            }
        });
        before - sinks.len()
    }

    /// Flush every sink. All sinks are attempted; the first error is returned.
    pub fn flush(&self) -> io::Result<()> {
        let mut sinks = self.sinks.lock();
        let mut first_err = None;
        for sink in sinks.iter_mut() {
            if let Err(e) = sink.writer.flush() {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.lock().len()
    }

    pub fn has_interactive(&self) -> bool {
        self.sinks
            .lock()
            .iter()
            .any(|s| s.kind == SinkKind::Interactive)
    }

    /// Build a subscriber that formats events into this handle.
    ///
    /// `directives` uses `EnvFilter` syntax (e.g. `"info"`,
    /// `"minion_daemon=debug"`).
    pub fn subscriber(&self, directives: &str) -> impl tracing::Subscriber + Send + Sync + 'static {
        tracing_subscriber::registry()
            .with(EnvFilter::new(directives))
            .with(
                fmt::layer()
                    .with_writer(self.clone())
                    .with_target(false)
                    .with_ansi(false),
            )
    }
}

/// Writer handed out to the fmt layer for a single event.
pub struct LogWriter {
    sinks: Arc<Mutex<Vec<Sink>>>,
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut sinks = self.sinks.lock();
        for sink in sinks.iter_mut() {
            // A broken sink must not silence the others.
            if sink.writer.write_all(buf).is_ok() && sink.kind == SinkKind::Interactive {
                let _ = sink.writer.flush();
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogHandle {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LogWriter {
            sinks: self.sinks.clone(),
        }
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
