//! `wt install`: resolve and install twin binaries.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::debug;

use crate::config::{expand_tilde, CliConfig, Manifest};
use crate::error::{Result, WonderTwinError};
use crate::registry::catalog::Catalog;
use crate::registry::installer::{self, host_platform, InstallOutcome};
use crate::registry::license::License;
use crate::registry::lockfile::{LockEntry, LockFile};
use crate::registry::resolver::{fetch_catalog, resolve};

/// Runs the install command.
///
/// With a `twin` or `twin@version` spec, resolves against the public
/// registry. Without one, installs every manifest twin that declares a
/// version, fetching each named registry at most once, and writes
/// `wondertwin.lock`.
///
/// # Errors
///
/// A single-spec failure is fatal; in manifest mode failures are
/// collected per twin and reported together.
pub async fn run(config: Option<&Path>, spec: Option<&str>) -> Result<()> {
    let cli_config = CliConfig::load()?;
    let license = cli_config
        .license_key
        .as_deref()
        .and_then(|key| License::validate(key).ok());

    match spec {
        Some(spec) => install_one(config, &cli_config, license.as_ref(), spec).await,
        None => install_manifest(config, &cli_config, license.as_ref()).await,
    }
}

/// Binary directory: the manifest's when one loads, the default
/// otherwise (explicit installs should not require a manifest).
fn binary_dir(config: Option<&Path>) -> Result<PathBuf> {
    let path = Manifest::resolve_manifest_path(config);
    if path.exists() {
        let manifest = Manifest::load(&path)?;
        return Ok(manifest.binary_dir()?);
    }
    Ok(expand_tilde("~/.wondertwin/bin")?)
}

async fn install_one(
    config: Option<&Path>,
    cli_config: &CliConfig,
    license: Option<&License>,
    spec: &str,
) -> Result<()> {
    let (twin, version_spec) = match spec.split_once('@') {
        Some((twin, version)) => (twin, version),
        None => (spec, "latest"),
    };
    let registry = cli_config.registry("public")?;
    let catalog = fetch_catalog(&registry.url, registry.token.as_deref()).await?;
    let (version, record) = resolve(&catalog, twin, version_spec)?;

    let dir = binary_dir(config)?;
    match installer::install(&dir, twin, &version, record, license).await? {
        InstallOutcome::Installed(path) => {
            println!("{twin}@{version}  installed  {}", path.display());
        }
        InstallOutcome::AlreadyInstalled(path) => {
            println!("{twin}@{version}  already installed  {}", path.display());
        }
    }
    Ok(())
}

async fn install_manifest(
    config: Option<&Path>,
    cli_config: &CliConfig,
    license: Option<&License>,
) -> Result<()> {
    let path = Manifest::resolve_manifest_path(config);
    let manifest = Manifest::load(&path)?;
    let dir = manifest.binary_dir()?;
    let platform = host_platform();

    // Each named registry is fetched at most once per run.
    let mut catalogs: BTreeMap<String, Catalog> = BTreeMap::new();
    let mut lock = LockFile::new(Utc::now());
    let mut failures = Vec::new();
    let mut installed = 0usize;

    for (name, twin) in &manifest.twins {
        let Some(version_spec) = &twin.version else {
            debug!(twin = %name, "no version declared, skipping");
            continue;
        };

        let outcome = async {
            if !catalogs.contains_key(&twin.registry) {
                let registry = cli_config.registry(&twin.registry)?;
                let catalog = fetch_catalog(&registry.url, registry.token.as_deref()).await?;
                catalogs.insert(twin.registry.clone(), catalog);
            }
            let catalog = &catalogs[&twin.registry];
            let (version, record) = resolve(catalog, name, version_spec)?;
            let outcome = installer::install(&dir, name, &version, record, license).await?;
            lock.twins.insert(
                name.clone(),
                LockEntry {
                    version: version.clone(),
                    resolved_from: version_spec.clone(),
                    sdk_package: non_empty(&record.sdk_package),
                    sdk_version: non_empty(&record.sdk_version),
                    checksum: record.checksums.get(&platform).cloned(),
                    binary_url: record.binaries.get(&platform).cloned(),
                },
            );
            Ok::<_, WonderTwinError>((version, outcome))
        }
        .await;

        match outcome {
            Ok((version, InstallOutcome::Installed(_))) => {
                installed += 1;
                println!("{name}@{version}  installed");
            }
            Ok((version, InstallOutcome::AlreadyInstalled(_))) => {
                println!("{name}@{version}  already installed");
            }
            Err(e) => {
                println!("{name}  FAILED  {e}");
                failures.push(name.clone());
            }
        }
    }

    lock.save(&manifest.lock_file())?;
    debug!(installed, failed = failures.len(), "install finished");

    if failures.is_empty() {
        Ok(())
    } else {
        Err(WonderTwinError::Failed(format!(
            "install failed for: {}",
            failures.join(", ")
        )))
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
