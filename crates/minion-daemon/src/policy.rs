//! Exception policy for failed iterations.

use tracing::error;

use crate::config::DaemonConfig;

/// What to do after a failed iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    Continue,
    Stop,
}

/// Decides whether one failed iteration ends the daemon.
///
/// Never retries. Workers that want backoff implement it inside their work
/// unit and request shutdown themselves.
#[derive(Debug, Clone, Copy)]
pub struct ExceptionPolicy {
    break_on_exception: bool,
}

impl ExceptionPolicy {
    pub fn new(break_on_exception: bool) -> Self {
        Self { break_on_exception }
    }

    pub fn from_config(config: &DaemonConfig) -> Self {
        Self::new(config.break_on_exception)
    }

    /// Log a failed hook or work unit and decide whether to keep going.
    pub fn on_iteration_error(
        &self,
        err: &anyhow::Error,
        iteration: u64,
        stage: &'static str,
    ) -> PolicyDecision {
        error!(iteration, stage, "Exception in {} (iteration {}): {:#}", stage, iteration, err);

        if self.break_on_exception {
            PolicyDecision::Stop
        } else {
            PolicyDecision::Continue
        }
    }
}

impl Default for ExceptionPolicy {
    fn default() -> Self {
        Self::new(true)
    }
}
