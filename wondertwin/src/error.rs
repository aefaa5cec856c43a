//! Error types for the fleet controller.
//!
//! Every failure is a value carrying a kind and message; callers route
//! them to user output and the exit-code mapping. Nothing here is a
//! control-flow exception across component boundaries.

use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for `wt` CLI operations.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;

    /// General error (scenario failure, conformance failure, install failure).
    pub const ERROR: i32 = 1;

    /// Configuration error (manifest, scenario file, CLI config).
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error.
    pub const IO_ERROR: i32 = 3;

    /// Network error (catalog fetch, admin call, download).
    pub const NETWORK_ERROR: i32 = 4;

    /// Registry error (unknown twin/version, checksum mismatch, tier lock).
    pub const REGISTRY_ERROR: i32 = 5;

    /// Usage error.
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT.
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM.
    pub const TERMINATED: i32 = 143;
}

/// Top-level error aggregating all domain failures.
#[derive(Debug, Error)]
pub enum WonderTwinError {
    /// Manifest or CLI config error.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Registry, resolver, or installer error.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Supervisor error.
    #[error(transparent)]
    Supervisor(#[from] SupervisorError),

    /// Scenario engine error.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    /// Command failures that were already reported per-item.
    #[error("{0}")]
    Failed(String),

    /// Outbound HTTP failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl WonderTwinError {
    /// Maps each variant to its exit code.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Json(_) | Self::Yaml(_) | Self::Scenario(_) => {
                ExitCode::CONFIG_ERROR
            }
            Self::Registry(_) => ExitCode::REGISTRY_ERROR,
            Self::Http(_) => ExitCode::NETWORK_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
            Self::Supervisor(_) | Self::Failed(_) => ExitCode::ERROR,
        }
    }
}

/// Manifest and CLI-config failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Manifest file not found.
    #[error("manifest not found: {path}")]
    ManifestNotFound {
        /// Attempted path.
        path: PathBuf,
    },

    /// Manifest parsed but is invalid.
    #[error("invalid manifest {path}: {message}")]
    InvalidManifest {
        /// Manifest path.
        path: PathBuf,
        /// What was wrong.
        message: String,
    },

    /// Manifest could not be parsed.
    #[error("parse error in {path}: {message}")]
    Parse {
        /// Offending file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// Unknown twin referenced on the command line or in a scenario.
    #[error("unknown twin: {0}")]
    UnknownTwin(String),

    /// Unknown registry name.
    #[error("unknown registry: {0}")]
    UnknownRegistry(String),

    /// The built-in `public` registry cannot be removed or shadowed.
    #[error("the public registry is built in and cannot be {0}")]
    PublicRegistryImmutable(&'static str),

    /// No home directory available for `~/` expansion.
    #[error("cannot determine home directory")]
    NoHome,
}

/// Registry, resolver, installer, and license failures.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Catalog fetch or decode failed.
    #[error("catalog fetch failed from {url}: {message}")]
    CatalogFetch {
        /// Catalog URL.
        url: String,
        /// Failure detail.
        message: String,
    },

    /// Catalog is structurally invalid.
    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),

    /// Twin not present in the catalog.
    #[error("twin not found in catalog: {0}")]
    TwinNotFound(String),

    /// Version not present for the twin.
    #[error("version {version} not found for twin {twin}")]
    VersionNotFound {
        /// Twin name.
        twin: String,
        /// Requested version.
        version: String,
    },

    /// No binary advertised for the host platform.
    #[error("twin {twin}@{version} does not support platform {platform}")]
    UnsupportedPlatform {
        /// Twin name.
        twin: String,
        /// Resolved version.
        version: String,
        /// Host platform tag.
        platform: String,
    },

    /// Download returned a non-200 or failed mid-stream.
    #[error("download failed from {url}: {message}")]
    Download {
        /// Binary URL.
        url: String,
        /// Failure detail.
        message: String,
    },

    /// Downloaded bytes do not hash to the advertised checksum.
    #[error("checksum mismatch for {twin}@{version}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Twin name.
        twin: String,
        /// Resolved version.
        version: String,
        /// Catalog checksum.
        expected: String,
        /// Computed checksum.
        actual: String,
    },

    /// A non-free tier requires a configured license.
    #[error(
        "twin {twin}@{version} requires a {tier} license; run `wt auth login <key>` to authenticate"
    )]
    TierLocked {
        /// Twin name.
        twin: String,
        /// Resolved version.
        version: String,
        /// Required tier.
        tier: String,
    },

    /// License key failed validation.
    #[error("invalid license key: {0}")]
    InvalidLicense(String),
}

/// Process supervisor failures.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Binary missing or not a file.
    #[error("binary not found for twin {twin}: {path}")]
    BinaryNotFound {
        /// Twin name.
        twin: String,
        /// Resolved binary path.
        path: PathBuf,
    },

    /// Spawn failed.
    #[error("failed to start twin {twin}: {message}")]
    SpawnFailed {
        /// Twin name.
        twin: String,
        /// OS error detail.
        message: String,
    },

    /// PID file could not be read or written.
    #[error("pid file error at {path}: {message}")]
    PidFile {
        /// PID file path.
        path: PathBuf,
        /// Failure detail.
        message: String,
    },
}

/// Scenario engine failures.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// Scenario file rejected at load time.
    #[error("invalid scenario {path}: {message}")]
    Invalid {
        /// Scenario file path.
        path: PathBuf,
        /// What was wrong.
        message: String,
    },

    /// Template expansion failed.
    #[error("template error in step {step:?}: {message}")]
    Template {
        /// Step name, when known.
        step: Option<String>,
        /// What was wrong.
        message: String,
    },

    /// Fleet setup (reset/seed) failed before any step ran.
    #[error("scenario setup failed: {0}")]
    Setup(String),
}

/// Result alias for fleet controller operations.
pub type Result<T> = std::result::Result<T, WonderTwinError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(ExitCode::SUCCESS, 0);
        assert_eq!(ExitCode::ERROR, 1);
        assert_eq!(ExitCode::CONFIG_ERROR, 2);
        assert_eq!(ExitCode::IO_ERROR, 3);
        assert_eq!(ExitCode::NETWORK_ERROR, 4);
        assert_eq!(ExitCode::REGISTRY_ERROR, 5);
        assert_eq!(ExitCode::USAGE_ERROR, 64);
    }

    #[test]
    fn registry_errors_map_to_registry_exit_code() {
        let err: WonderTwinError = RegistryError::TwinNotFound("stripe".to_string()).into();
        assert_eq!(err.exit_code(), ExitCode::REGISTRY_ERROR);
    }

    #[test]
    fn scenario_errors_map_to_config_exit_code() {
        let err: WonderTwinError = ScenarioError::Setup("reset failed".to_string()).into();
        assert_eq!(err.exit_code(), ExitCode::CONFIG_ERROR);
    }

    #[test]
    fn tier_locked_message_mentions_auth() {
        let err = RegistryError::TierLocked {
            twin: "stripe".to_string(),
            version: "0.2.0".to_string(),
            tier: "com".to_string(),
        };
        assert!(err.to_string().contains("wt auth login"));
    }

    #[test]
    fn io_maps_to_io_exit_code() {
        let err: WonderTwinError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(err.exit_code(), ExitCode::IO_ERROR);
    }
}
