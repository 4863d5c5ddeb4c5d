//! Daemon configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for one daemon run.
///
/// Constructed once per invocation and handed read-only to every worker
/// hook. Keys the controller does not know about land in [`extra`] and are
/// passed through untouched.
///
/// [`extra`]: DaemonConfig::extra
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Worker identity, used to tag every log event.
    #[serde(default = "default_name")]
    pub name: String,

    /// Whether to fork into the background before running.
    #[serde(default)]
    pub fork: bool,

    /// Path to the PID (instance lock) file. `None` disables locking.
    #[serde(default)]
    pub pid: Option<PathBuf>,

    /// Pause between iterations (in milliseconds).
    #[serde(default = "default_sleep_ms")]
    pub sleep_ms: u64,

    /// Number of completed iterations between maintenance runs.
    #[serde(default = "default_cleanup_every")]
    pub cleanup_every: u32,

    /// Stop the daemon when a work unit fails.
    #[serde(default = "default_break_on_exception")]
    pub break_on_exception: bool,

    /// Directory for the persistent log file. `None` keeps logging on the console only.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Caller-defined fields.
    #[serde(flatten)]
    pub extra: toml::Table,
}

fn default_name() -> String {
    "worker".to_string()
}

fn default_sleep_ms() -> u64 {
    1000
}

fn default_cleanup_every() -> u32 {
    100
}

fn default_break_on_exception() -> bool {
    true
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            fork: false,
            pid: None,
            sleep_ms: default_sleep_ms(),
            cleanup_every: default_cleanup_every(),
            break_on_exception: default_break_on_exception(),
            log_dir: None,
            extra: toml::Table::new(),
        }
    }
}

impl DaemonConfig {
    /// Create a config for the named worker with all defaults.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set the PID file path.
    pub fn with_pid(mut self, pid: impl Into<PathBuf>) -> Self {
        self.pid = Some(pid.into());
        self
    }

    /// Set a caller-defined field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Look up a caller-defined field.
    pub fn field(&self, key: &str) -> Option<&toml::Value> {
        self.extra.get(key)
    }

    /// Look up a caller-defined integer field.
    pub fn int_field(&self, key: &str) -> Option<i64> {
        self.extra.get(key).and_then(toml::Value::as_integer)
    }

    /// Look up a caller-defined string field.
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(toml::Value::as_str)
    }

    /// Get the sleep interval as a Duration.
    pub fn sleep_interval(&self) -> Duration {
        Duration::from_millis(self.sleep_ms)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.cleanup_every == 0 {
            return Err("cleanup_every must be > 0".to_string());
        }

        if self.name.trim().is_empty() {
            return Err("name must not be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
