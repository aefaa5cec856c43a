//! Configuration: fleet manifest and CLI config.

pub mod manifest;
pub mod settings;

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

pub use manifest::{Manifest, TwinConfig};
pub use settings::{CliConfig, RegistryEntry};

/// Expands a leading `~/` against the user's home directory.
///
/// # Errors
///
/// Returns [`ConfigError::NoHome`] when `HOME` is unset and the path
/// needs expansion.
pub fn expand_tilde(path: &str) -> Result<PathBuf, ConfigError> {
    if let Some(rest) = path.strip_prefix("~/") {
        let home = std::env::var_os("HOME").ok_or(ConfigError::NoHome)?;
        Ok(PathBuf::from(home).join(rest))
    } else {
        Ok(PathBuf::from(path))
    }
}

/// Resolves `path` against `base` unless it is already absolute.
/// `~/` is expanded first.
///
/// # Errors
///
/// Returns [`ConfigError::NoHome`] when tilde expansion fails.
pub fn resolve_path(base: &Path, path: &str) -> Result<PathBuf, ConfigError> {
    let expanded = expand_tilde(path)?;
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        Ok(base.join(expanded))
    }
}
