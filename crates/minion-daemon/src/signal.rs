//! Signal handling for daemon processes.
//!
//! OS signals are bridged onto a single [`ShutdownFlag`]. The controller
//! only reads the flag at the top of each iteration and after each work
//! unit, so a signal never interrupts a work unit that is already running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, Instrument, Span};

use crate::error::DaemonError;

/// Signals the bridge knows how to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// SIGINT / Ctrl-C.
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// SIGQUIT.
    Quit,
    /// Any other caught signal, by number.
    Other(i32),
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Interrupt => write!(f, "SIGINT"),
            Signal::Terminate => write!(f, "SIGTERM"),
            Signal::Quit => write!(f, "SIGQUIT"),
            Signal::Other(number) => {
                #[cfg(unix)]
                {
                    if let Ok(sig) = nix::sys::signal::Signal::try_from(*number) {
                        return write!(f, "{}", sig.as_str());
                    }
                }
                write!(f, "signal {}", number)
            }
        }
    }
}

/// Shared termination flag.
///
/// Set by the signal bridge or by a worker; once set it is never cleared
/// for the remainder of the run.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the controller to stop before the next iteration.
    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bridges OS signal delivery onto a [`ShutdownFlag`].
#[derive(Debug, Clone)]
pub struct SignalBridge {
    flag: ShutdownFlag,
}

impl SignalBridge {
    /// Create a bridge that sets `flag`.
    pub fn new(flag: ShutdownFlag) -> Self {
        Self { flag }
    }

    /// The flag this bridge sets.
    pub fn flag(&self) -> &ShutdownFlag {
        &self.flag
    }

    /// React to a delivered signal.
    ///
    /// Unknown signals are logged as errors and still terminate the daemon.
    pub fn deliver(&self, signal: Signal) {
        info!("Received signal '{}'", signal);

        match signal {
            Signal::Interrupt | Signal::Terminate | Signal::Quit => {}
            Signal::Other(_) => {
                error!("signal {} is unhandled. Terminating", signal);
            }
        }

        self.flag.request();
    }

    /// Set up OS signal handlers (Unix only).
    ///
    /// Must be called from inside the runtime that drives the loop. Listener
    /// tasks only run while the controller is suspended.
    ///
    /// The process-wide handlers are never uninstalled, even after the
    /// runtime is dropped. From then on these signals are swallowed instead
    /// of taking their default action.
    #[cfg(unix)]
    pub fn setup_os_signals(&self) -> Result<(), DaemonError> {
        use tokio::signal::unix::SignalKind;

        self.listen(SignalKind::interrupt(), Signal::Interrupt)?;
        self.listen(SignalKind::terminate(), Signal::Terminate)?;
        self.listen(SignalKind::quit(), Signal::Quit)?;
        for kind in [
            SignalKind::hangup(),
            SignalKind::user_defined1(),
            SignalKind::user_defined2(),
        ] {
            self.listen(kind, Signal::Other(kind.as_raw_value()))?;
        }

        info!("OS signal handlers installed (SIGINT, SIGTERM, SIGQUIT, SIGHUP, SIGUSR1, SIGUSR2)");
        Ok(())
    }

    #[cfg(unix)]
    fn listen(
        &self,
        kind: tokio::signal::unix::SignalKind,
        signal: Signal,
    ) -> Result<(), DaemonError> {
        let mut stream = tokio::signal::unix::signal(kind)
            .map_err(|e| DaemonError::SignalSetup(format!("{}: {}", signal, e)))?;

        let bridge = self.clone();
        tokio::spawn(
            async move {
                while stream.recv().await.is_some() {
                    bridge.deliver(signal);
                }
            }
            .instrument(Span::current()),
        );
        Ok(())
    }

    /// Set up OS signal handlers (non-Unix fallback).
    #[cfg(not(unix))]
    pub fn setup_os_signals(&self) -> Result<(), DaemonError> {
        let bridge = self.clone();

        // Only Ctrl+C is available on non-Unix
        tokio::spawn(
            async move {
                while tokio::signal::ctrl_c().await.is_ok() {
                    bridge.deliver(Signal::Interrupt);
                }
            }
            .instrument(Span::current()),
        );

        info!("OS signal handlers installed (Ctrl+C only)");
        Ok(())
    }
}

/// Ask a running daemon to stop.
///
/// Sends SIGTERM, or SIGKILL when `force` is set. Refuses `0` and PIDs above
/// `i32::MAX`, which `kill` would apply to a whole process group.
#[cfg(unix)]
pub fn send_stop_signal(pid: u32, force: bool) -> Result<(), DaemonError> {
    use nix::sys::signal::{kill, Signal as NixSignal};

    let target = crate::pid::signal_target(pid).ok_or_else(|| DaemonError::SignalSend {
        pid,
        reason: "not a single process id".to_string(),
    })?;

    let nix_signal = if force {
        NixSignal::SIGKILL
    } else {
        NixSignal::SIGTERM
    };

    kill(target, nix_signal).map_err(|e| DaemonError::SignalSend {
        pid,
        reason: format!("{}: {}", nix_signal.as_str(), e),
    })?;

    info!("Sent {} to PID {}", nix_signal.as_str(), pid);
    Ok(())
}

#[cfg(not(unix))]
pub fn send_stop_signal(pid: u32, _force: bool) -> Result<(), DaemonError> {
    Err(DaemonError::SignalSend {
        pid,
        reason: "signal sending not supported on this platform".to_string(),
    })
}

#[cfg(test)]
#[path = "signal_tests.rs"]
mod tests;
