//! CLI configuration: license key and named registries.
//!
//! Persisted at `~/.wondertwin/config.yaml` (a pre-existing
//! `config.json` is honored). The built-in `public` registry is always
//! present and can be neither removed nor shadowed.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::expand_tilde;
use crate::error::ConfigError;

/// Built-in registry name.
pub const PUBLIC_REGISTRY: &str = "public";

/// Default catalog URL for the public registry.
pub const PUBLIC_REGISTRY_URL: &str = "https://registry.wondertwin.dev/catalog.json";

/// Environment variable overriding the public registry URL.
pub const REGISTRY_URL_ENV: &str = "WT_REGISTRY_URL";

/// One named registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Catalog URL.
    pub url: String,
    /// Bearer token for private registries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Persisted CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// License key set via `wt auth login`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license_key: Option<String>,

    /// User-added registries (the public one is injected, not stored).
    #[serde(default)]
    pub registries: BTreeMap<String, RegistryEntry>,
}

impl CliConfig {
    /// Config directory (`~/.wondertwin`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoHome`] when `HOME` is unset.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        expand_tilde("~/.wondertwin")
    }

    /// Loads the config, preferring `config.yaml`, falling back to
    /// `config.json`, then to defaults when neither exists.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when a present file is unreadable.
    pub fn load() -> Result<Self, ConfigError> {
        let dir = Self::config_dir()?;
        let yaml = dir.join("config.yaml");
        let json = dir.join("config.json");

        if yaml.exists() {
            let raw = std::fs::read_to_string(&yaml).map_err(|e| ConfigError::Parse {
                path: yaml.clone(),
                message: e.to_string(),
            })?;
            serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: yaml,
                message: e.to_string(),
            })
        } else if json.exists() {
            let raw = std::fs::read_to_string(&json).map_err(|e| ConfigError::Parse {
                path: json.clone(),
                message: e.to_string(),
            })?;
            serde_json::from_str(&raw).map_err(|e| ConfigError::Parse {
                path: json,
                message: e.to_string(),
            })
        } else {
            Ok(Self::default())
        }
    }

    /// Writes the config back as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the directory cannot be created
    /// or the file cannot be written.
    pub fn save(&self) -> Result<(), ConfigError> {
        let dir = Self::config_dir()?;
        let path = dir.join("config.yaml");
        std::fs::create_dir_all(&dir).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        let raw = serde_yaml::to_string(self).map_err(|e| ConfigError::Parse {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, raw).map_err(|e| ConfigError::Parse {
            path,
            message: e.to_string(),
        })
    }

    /// Resolves a registry by name. `public` is built in; its URL honors
    /// the `WT_REGISTRY_URL` override.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownRegistry`] for unknown names.
    pub fn registry(&self, name: &str) -> Result<RegistryEntry, ConfigError> {
        if name == PUBLIC_REGISTRY {
            let url = std::env::var(REGISTRY_URL_ENV)
                .unwrap_or_else(|_| PUBLIC_REGISTRY_URL.to_string());
            return Ok(RegistryEntry { url, token: None });
        }
        self.registries
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownRegistry(name.to_string()))
    }

    /// Adds a named registry.
    ///
    /// # Errors
    ///
    /// Refuses to shadow the built-in `public` registry.
    pub fn add_registry(
        &mut self,
        name: &str,
        url: String,
        token: Option<String>,
    ) -> Result<(), ConfigError> {
        if name == PUBLIC_REGISTRY {
            return Err(ConfigError::PublicRegistryImmutable("shadowed"));
        }
        self.registries
            .insert(name.to_string(), RegistryEntry { url, token });
        Ok(())
    }

    /// Removes a named registry.
    ///
    /// # Errors
    ///
    /// Refuses to remove `public`; unknown names error.
    pub fn remove_registry(&mut self, name: &str) -> Result<(), ConfigError> {
        if name == PUBLIC_REGISTRY {
            return Err(ConfigError::PublicRegistryImmutable("removed"));
        }
        if self.registries.remove(name).is_none() {
            return Err(ConfigError::UnknownRegistry(name.to_string()));
        }
        Ok(())
    }

    /// All registries for display: `public` first, then user entries
    /// sorted by name.
    #[must_use]
    pub fn list_registries(&self) -> Vec<(String, RegistryEntry)> {
        let mut out = vec![(
            PUBLIC_REGISTRY.to_string(),
            RegistryEntry {
                url: std::env::var(REGISTRY_URL_ENV)
                    .unwrap_or_else(|_| PUBLIC_REGISTRY_URL.to_string()),
                token: None,
            },
        )];
        for (name, entry) in &self.registries {
            out.push((name.clone(), entry.clone()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_registry_always_resolves() {
        let config = CliConfig::default();
        let entry = config.registry(PUBLIC_REGISTRY).unwrap();
        assert!(entry.url.starts_with("http"));
    }

    #[test]
    fn public_registry_cannot_be_shadowed() {
        let mut config = CliConfig::default();
        assert!(
            config
                .add_registry(PUBLIC_REGISTRY, "http://evil".to_string(), None)
                .is_err()
        );
    }

    #[test]
    fn public_registry_cannot_be_removed() {
        let mut config = CliConfig::default();
        assert!(config.remove_registry(PUBLIC_REGISTRY).is_err());
    }

    #[test]
    fn add_and_remove_named_registry() {
        let mut config = CliConfig::default();
        config
            .add_registry("corp", "https://corp.example/catalog.json".to_string(), None)
            .unwrap();
        assert_eq!(
            config.registry("corp").unwrap().url,
            "https://corp.example/catalog.json"
        );
        config.remove_registry("corp").unwrap();
        assert!(config.registry("corp").is_err());
    }

    #[test]
    fn remove_unknown_registry_errors() {
        let mut config = CliConfig::default();
        assert!(matches!(
            config.remove_registry("ghost"),
            Err(ConfigError::UnknownRegistry(_))
        ));
    }

    #[test]
    fn list_puts_public_first() {
        let mut config = CliConfig::default();
        config
            .add_registry("alpha", "https://a.example".to_string(), None)
            .unwrap();
        let list = config.list_registries();
        assert_eq!(list[0].0, PUBLIC_REGISTRY);
        assert_eq!(list[1].0, "alpha");
    }

    #[test]
    fn config_round_trips_through_yaml() {
        let mut config = CliConfig::default();
        config.license_key = Some("wt_com_acme_abc123_aa".to_string());
        config
            .add_registry(
                "corp",
                "https://corp.example/catalog.json".to_string(),
                Some("tok".to_string()),
            )
            .unwrap();
        let raw = serde_yaml::to_string(&config).unwrap();
        let back: CliConfig = serde_yaml::from_str(&raw).unwrap();
        assert_eq!(back.license_key, config.license_key);
        assert_eq!(back.registries["corp"].token.as_deref(), Some("tok"));
    }
}
