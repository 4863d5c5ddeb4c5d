//! # Minion Config
//!
//! Loads TOML configuration files for minion daemons. The loader is generic
//! over the target type so each binary decides its own file layout.

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::ConfigLoader;
