//! Configuration errors.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A `${VAR}` reference with no value in the environment.
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_not_found_names_path() {
        let err = ConfigError::NotFound(PathBuf::from("/etc/minion/mailer.toml"));
        assert_eq!(err.to_string(), "Config file not found: /etc/minion/mailer.toml");
    }

    #[test]
    fn test_read_error_keeps_cause() {
        let err = ConfigError::Read {
            path: PathBuf::from("mailer.toml"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().starts_with("Failed to read config mailer.toml"));
        assert!(err.source().is_some_and(|cause| cause.to_string() == "denied"));
    }

    #[test]
    fn test_env_var_not_set_error() {
        let err = ConfigError::EnvVarNotSet("MINION_PID".to_string());
        assert!(err.to_string().contains("MINION_PID"));
    }
}
