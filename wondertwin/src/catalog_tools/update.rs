//! Catalog updater: upserts one released version into a catalog file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::{RegistryError, Result, WonderTwinError};
use crate::registry::catalog::{Catalog, CatalogEntry, Tier, VersionRecord};

/// Inputs of one update run.
#[derive(Debug, Clone)]
pub struct UpdateArgs {
    /// Twin name.
    pub name: String,
    /// Version being released.
    pub version: String,
    /// Path to the release checksum file.
    pub checksums: PathBuf,
    /// Catalog file to upsert into (created when absent).
    pub catalog: PathBuf,
    /// `owner/repo` the release binaries were published under.
    pub repo: String,
    /// Do not move `latest` for an existing entry.
    pub prerelease: bool,
    /// Directory holding `twin-<name>/twin-manifest.json`.
    pub manifest_dir: PathBuf,
}

/// The per-twin manifest a twin repository ships for release metadata.
#[derive(Debug, Clone, Default, Deserialize)]
struct TwinManifest {
    #[serde(default)]
    description: String,
    #[serde(default)]
    repository: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    author: String,
    #[serde(default)]
    sdk_package: String,
    #[serde(default)]
    sdk_version: String,
    #[serde(default)]
    api_version: Option<String>,
    #[serde(default)]
    tier: Tier,
}

/// Parses a checksum file into `platform -> (checksum, filename)`.
///
/// Lines are `<64 hex>  <filename>` (two spaces, single-space
/// fallback). Filenames not prefixed `twin-<name>-` are skipped; the
/// remainder of the filename is the platform tag.
fn parse_checksums(
    raw: &str,
    name: &str,
) -> BTreeMap<String, (String, String)> {
    let prefix = format!("twin-{name}-");
    let mut out = BTreeMap::new();
    for line in raw.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let (hash, file) = match line.split_once("  ") {
            Some(pair) => pair,
            None => match line.split_once(' ') {
                Some(pair) => pair,
                None => continue,
            },
        };
        let file = file.trim();
        if hash.len() != 64 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            continue;
        }
        let Some(platform) = file.strip_prefix(&prefix) else {
            continue;
        };
        out.insert(
            platform.to_string(),
            (format!("sha256:{}", hash.to_lowercase()), file.to_string()),
        );
    }
    out
}

fn binary_url(repo: &str, name: &str, version: &str, file: &str) -> String {
    format!("https://github.com/{repo}/releases/download/{name}-v{version}/{file}")
}

/// Runs the updater.
///
/// # Errors
///
/// Fails on unreadable inputs, an empty checksum file, or a catalog
/// that cannot be parsed or written.
pub fn update_catalog(args: &UpdateArgs) -> Result<()> {
    let manifest_path = args
        .manifest_dir
        .join(format!("twin-{}", args.name))
        .join("twin-manifest.json");
    let manifest: TwinManifest = match std::fs::read_to_string(&manifest_path) {
        Ok(raw) => serde_json::from_str(&raw)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => TwinManifest::default(),
        Err(e) => return Err(e.into()),
    };

    let raw = std::fs::read_to_string(&args.checksums)?;
    let checksums = parse_checksums(&raw, &args.name);
    if checksums.is_empty() {
        return Err(RegistryError::InvalidCatalog(format!(
            "no twin-{} checksums in {}",
            args.name,
            args.checksums.display()
        ))
        .into());
    }

    let mut catalog: Catalog = match std::fs::read_to_string(&args.catalog) {
        Ok(raw) => serde_json::from_str(&raw)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Catalog {
            schema_version: 1,
            twins: BTreeMap::new(),
        },
        Err(e) => return Err(e.into()),
    };

    let mut checksum_map = BTreeMap::new();
    let mut binary_map = BTreeMap::new();
    for (platform, (checksum, file)) in &checksums {
        checksum_map.insert(platform.clone(), checksum.clone());
        binary_map.insert(
            platform.clone(),
            binary_url(&args.repo, &args.name, &args.version, file),
        );
    }

    let record = VersionRecord {
        released: chrono::Utc::now().format("%Y-%m-%d").to_string(),
        sdk_package: manifest.sdk_package.clone(),
        sdk_version: manifest.sdk_version.clone(),
        api_version: manifest.api_version.clone(),
        tier: manifest.tier,
        checksums: checksum_map,
        binaries: binary_map,
    };

    let is_new_entry = !catalog.twins.contains_key(&args.name);
    let entry = catalog
        .twins
        .entry(args.name.clone())
        .or_insert_with(|| CatalogEntry {
            description: String::new(),
            repository: String::new(),
            category: String::new(),
            author: String::new(),
            latest: args.version.clone(),
            versions: BTreeMap::new(),
        });

    if !manifest.description.is_empty() {
        entry.description = manifest.description;
    }
    if !manifest.repository.is_empty() {
        entry.repository = manifest.repository;
    }
    if !manifest.category.is_empty() {
        entry.category = manifest.category;
    }
    if !manifest.author.is_empty() {
        entry.author = manifest.author;
    }
    entry.versions.insert(args.version.clone(), record);

    // A first release always becomes latest; afterwards a prerelease
    // leaves the existing pointer alone.
    if is_new_entry || !args.prerelease {
        entry.latest = args.version.clone();
    }

    write_catalog(&args.catalog, &catalog)?;
    info!(
        twin = %args.name,
        version = %args.version,
        latest = %catalog.twins[&args.name].latest,
        "catalog updated"
    );
    Ok(())
}

fn write_catalog(path: &Path, catalog: &Catalog) -> Result<()> {
    let raw = serde_json::to_string_pretty(catalog).map_err(WonderTwinError::Json)?;
    std::fs::write(path, raw)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEX: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";

    fn args(dir: &Path, version: &str, prerelease: bool) -> UpdateArgs {
        UpdateArgs {
            name: "payish".to_string(),
            version: version.to_string(),
            checksums: dir.join("checksums.txt"),
            catalog: dir.join("catalog.json"),
            repo: "acme/twins".to_string(),
            prerelease,
            manifest_dir: dir.to_path_buf(),
        }
    }

    fn write_checksums(dir: &Path) {
        let lines = [
            format!("{HEX}  twin-payish-linux-amd64"),
            format!("{HEX}  twin-payish-darwin-arm64"),
            format!("{HEX} twin-payish-linux-arm64"),
            format!("{HEX}  twin-otherthing-linux-amd64"),
            "garbage line".to_string(),
        ];
        std::fs::write(dir.join("checksums.txt"), lines.join("\n")).unwrap();
    }

    #[test]
    fn checksum_parsing_skips_foreign_and_garbage_lines() {
        let raw = format!(
            "{HEX}  twin-payish-linux-amd64\n{HEX}  twin-other-linux-amd64\nnope\n"
        );
        let parsed = parse_checksums(&raw, "payish");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed["linux-amd64"].0, format!("sha256:{HEX}"));
    }

    #[test]
    fn single_space_fallback_is_accepted() {
        let raw = format!("{HEX} twin-payish-darwin-amd64\n");
        let parsed = parse_checksums(&raw, "payish");
        assert!(parsed.contains_key("darwin-amd64"));
    }

    #[test]
    fn first_release_creates_entry_and_sets_latest() {
        let dir = tempfile::tempdir().unwrap();
        write_checksums(dir.path());
        update_catalog(&args(dir.path(), "1.0.0", true)).unwrap();

        let catalog: Catalog =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("catalog.json")).unwrap())
                .unwrap();
        let entry = &catalog.twins["payish"];
        assert_eq!(entry.latest, "1.0.0");
        let record = &entry.versions["1.0.0"];
        assert_eq!(record.checksums.len(), 3);
        assert_eq!(
            record.binaries["linux-amd64"],
            "https://github.com/acme/twins/releases/download/payish-v1.0.0/twin-payish-linux-amd64"
        );
    }

    #[test]
    fn prerelease_preserves_existing_latest() {
        let dir = tempfile::tempdir().unwrap();
        write_checksums(dir.path());
        update_catalog(&args(dir.path(), "1.0.0", false)).unwrap();
        update_catalog(&args(dir.path(), "1.1.0-rc.1", true)).unwrap();

        let catalog: Catalog =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("catalog.json")).unwrap())
                .unwrap();
        let entry = &catalog.twins["payish"];
        assert_eq!(entry.latest, "1.0.0");
        assert!(entry.versions.contains_key("1.1.0-rc.1"));
    }

    #[test]
    fn stable_release_moves_latest() {
        let dir = tempfile::tempdir().unwrap();
        write_checksums(dir.path());
        update_catalog(&args(dir.path(), "1.0.0", false)).unwrap();
        update_catalog(&args(dir.path(), "1.1.0", false)).unwrap();

        let catalog: Catalog =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("catalog.json")).unwrap())
                .unwrap();
        assert_eq!(catalog.twins["payish"].latest, "1.1.0");
    }

    #[test]
    fn twin_manifest_enriches_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        write_checksums(dir.path());
        let manifest_dir = dir.path().join("twin-payish");
        std::fs::create_dir_all(&manifest_dir).unwrap();
        std::fs::write(
            manifest_dir.join("twin-manifest.json"),
            r#"{"description":"payments twin","category":"payments","tier":"com"}"#,
        )
        .unwrap();

        update_catalog(&args(dir.path(), "1.0.0", false)).unwrap();
        let catalog: Catalog =
            serde_json::from_str(&std::fs::read_to_string(dir.path().join("catalog.json")).unwrap())
                .unwrap();
        let entry = &catalog.twins["payish"];
        assert_eq!(entry.description, "payments twin");
        assert_eq!(entry.versions["1.0.0"].tier, Tier::Com);
    }

    #[test]
    fn empty_checksum_set_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("checksums.txt"), "nothing relevant\n").unwrap();
        assert!(update_catalog(&args(dir.path(), "1.0.0", false)).is_err());
    }
}
