//! Fleet manifest: the declared set of twins and their settings.
//!
//! Loaded from `wondertwin.json` or `wondertwin.yaml` (JSON preferred when
//! both exist). Twin enumeration is sorted by name so every command
//! produces deterministic output.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{expand_tilde, resolve_path};
use crate::error::ConfigError;

/// Default manifest file name.
pub const DEFAULT_MANIFEST: &str = "wondertwin.yaml";

/// One twin declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct TwinConfig {
    /// Binary path, relative to the manifest or absolute; `~/` expanded.
    pub binary: Option<String>,

    /// Version spec: `latest` or an exact version.
    pub version: Option<String>,

    /// Registry the version resolves against.
    #[serde(default = "default_registry")]
    pub registry: String,

    /// Service port.
    pub port: u16,

    /// Admin port; defaults to the service port (same listener).
    pub admin_port: Option<u16>,

    /// Seed file POSTed to `/admin/state` after start.
    pub seed: Option<String>,

    /// Environment overrides merged over the current environment.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_registry() -> String {
    "public".to_string()
}

impl Default for TwinConfig {
    fn default() -> Self {
        Self {
            binary: None,
            version: None,
            registry: default_registry(),
            port: 0,
            admin_port: None,
            seed: None,
            env: BTreeMap::new(),
        }
    }
}

impl TwinConfig {
    /// The admin port (same listener as the service port by default).
    #[must_use]
    pub fn admin_port(&self) -> u16 {
        self.admin_port.unwrap_or(self.port)
    }
}

/// Fleet-wide settings block.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    /// Where installed binaries live. Default `~/.wondertwin/bin`.
    pub binary_dir: Option<String>,

    /// Where twin logs are written. Default `.wt/logs`.
    pub log_dir: Option<String>,

    /// Pass `--verbose` to twins on start.
    #[serde(default)]
    pub verbose: bool,
}

#[derive(Debug, Deserialize)]
struct ManifestFile {
    twins: BTreeMap<String, TwinConfig>,
    #[serde(default)]
    settings: Settings,
}

/// Parsed and validated fleet manifest.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Twin declarations, sorted by name.
    pub twins: BTreeMap<String, TwinConfig>,
    /// Settings block.
    pub settings: Settings,
    /// Directory the manifest was loaded from; relative paths resolve
    /// against it.
    pub dir: PathBuf,
}

impl Manifest {
    /// Resolves the manifest path: the explicit argument (the `-c` flag,
    /// which clap also feeds from `WT_CONFIG`) or the default name. A
    /// default-named YAML path with a sibling `wondertwin.json` resolves
    /// to the JSON.
    #[must_use]
    pub fn resolve_manifest_path(explicit: Option<&Path>) -> PathBuf {
        let path = explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MANIFEST));

        if path.file_name().is_some_and(|n| n == DEFAULT_MANIFEST) {
            let sibling = path.with_file_name("wondertwin.json");
            if sibling.exists() {
                return sibling;
            }
        }
        path
    }

    /// Loads and validates a manifest.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file is missing, unparseable, or
    /// a twin declares neither binary nor version.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ManifestNotFound {
                path: path.to_path_buf(),
            });
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let file: ManifestFile = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };

        if file.twins.is_empty() {
            return Err(ConfigError::InvalidManifest {
                path: path.to_path_buf(),
                message: "no twins declared".to_string(),
            });
        }
        for (name, twin) in &file.twins {
            if twin.binary.is_none() && twin.version.is_none() {
                return Err(ConfigError::InvalidManifest {
                    path: path.to_path_buf(),
                    message: format!("twin {name} declares neither binary nor version"),
                });
            }
            if twin.port == 0 {
                return Err(ConfigError::InvalidManifest {
                    path: path.to_path_buf(),
                    message: format!("twin {name} has no port"),
                });
            }
        }

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

        Ok(Self {
            twins: file.twins,
            settings: file.settings,
            dir,
        })
    }

    /// Looks up a twin by name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownTwin`] when absent.
    pub fn twin(&self, name: &str) -> Result<&TwinConfig, ConfigError> {
        self.twins
            .get(name)
            .ok_or_else(|| ConfigError::UnknownTwin(name.to_string()))
    }

    /// Binary directory for installed twins (default `~/.wondertwin/bin`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHome`] when tilde expansion fails.
    pub fn binary_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.settings.binary_dir {
            Some(dir) => resolve_path(&self.dir, dir),
            None => expand_tilde("~/.wondertwin/bin"),
        }
    }

    /// Log directory (default `.wt/logs` next to the manifest).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHome`] when tilde expansion fails.
    pub fn log_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.settings.log_dir {
            Some(dir) => resolve_path(&self.dir, dir),
            None => Ok(self.dir.join(".wt/logs")),
        }
    }

    /// PID file path (`.wt/pids.json` next to the manifest).
    #[must_use]
    pub fn pid_file(&self) -> PathBuf {
        self.dir.join(".wt/pids.json")
    }

    /// Lock file path (`wondertwin.lock` next to the manifest).
    #[must_use]
    pub fn lock_file(&self) -> PathBuf {
        self.dir.join("wondertwin.lock")
    }

    /// Resolves a twin's binary path: the explicit binary when declared,
    /// otherwise `binary_dir/twin-<name>` derived from the version.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when path expansion fails.
    pub fn resolved_binary(&self, name: &str, twin: &TwinConfig) -> Result<PathBuf, ConfigError> {
        match &twin.binary {
            Some(binary) => resolve_path(&self.dir, binary),
            None => Ok(self.binary_dir()?.join(format!("twin-{name}"))),
        }
    }

    /// Seed file path resolved against the manifest directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when path expansion fails.
    pub fn resolved_seed(&self, twin: &TwinConfig) -> Result<Option<PathBuf>, ConfigError> {
        twin.seed
            .as_deref()
            .map(|s| resolve_path(&self.dir, s))
            .transpose()
    }
}
