//! Default locations.

use std::path::{Path, PathBuf};

use minion_config::ConfigLoader;

/// Get the .minion directory path.
pub(crate) fn minion_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".minion"))
        .unwrap_or_else(|| PathBuf::from(".minion"))
}

/// Log directory used when a forked daemon has none configured.
pub(crate) fn default_log_dir() -> PathBuf {
    minion_dir().join("logs")
}

/// Expand a leading `~` in a configured path.
pub(crate) fn expand(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => PathBuf::from(ConfigLoader::expand_path(s)),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_dir_under_minion_dir() {
        assert!(default_log_dir().starts_with(minion_dir()));
    }

    #[test]
    fn test_expand_leaves_absolute_paths() {
        assert_eq!(expand(Path::new("/var/run/x.pid")), PathBuf::from("/var/run/x.pid"));
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand(Path::new("~/x.pid")), home.join("x.pid"));
        }
    }
}
