//! The `wondertwin.lock` file written by `wt install`.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One locked twin. Unset optional fields are omitted on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    /// Resolved version.
    pub version: String,
    /// Version the manifest asked for (`latest` or exact).
    pub resolved_from: String,
    /// SDK package the version was built with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_package: Option<String>,
    /// SDK version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sdk_version: Option<String>,
    /// Checksum for the platform that was installed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    /// Binary URL for the platform that was installed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_url: Option<String>,
}

/// Full lock file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockFile {
    /// When the lock file was written.
    pub generated_at: DateTime<Utc>,
    /// When the catalog was fetched.
    pub registry_fetched_at: DateTime<Utc>,
    /// Twin name -> locked version.
    pub twins: BTreeMap<String, LockEntry>,
}

impl LockFile {
    /// New lock file stamped now.
    #[must_use]
    pub fn new(registry_fetched_at: DateTime<Utc>) -> Self {
        Self {
            generated_at: Utc::now(),
            registry_fetched_at,
            twins: BTreeMap::new(),
        }
    }

    /// Reads a lock file.
    ///
    /// # Errors
    ///
    /// I/O or JSON failure.
    pub fn load(path: &Path) -> Result<Self, crate::error::WonderTwinError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Writes the lock file as pretty JSON.
    ///
    /// # Errors
    ///
    /// I/O or JSON failure.
    pub fn save(&self, path: &Path) -> Result<(), crate::error::WonderTwinError> {
        let raw = serde_json::to_string_pretty(self)?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}
