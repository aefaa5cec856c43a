//! Binary installer: download, verify, write.

use std::path::{Path, PathBuf};
use std::time::Duration;

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::catalog::{Tier, VersionRecord};
use super::license::License;
use crate::error::RegistryError;

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(300);

/// What the installer did for one twin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// Binary written at the given path.
    Installed(PathBuf),
    /// Binary and matching version sidecar already present.
    AlreadyInstalled(PathBuf),
}

/// Host platform as a catalog tag (`linux-amd64`, `darwin-arm64`, ...).
#[must_use]
pub fn host_platform() -> String {
    let os = match std::env::consts::OS {
        "macos" => "darwin",
        other => other,
    };
    let arch = match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        other => other,
    };
    format!("{os}-{arch}")
}

/// Path the installer writes a twin's binary to.
#[must_use]
pub fn binary_path(dir: &Path, twin: &str) -> PathBuf {
    dir.join(format!("twin-{twin}"))
}

/// Returns true when the binary and its version sidecar already match
/// `version`.
#[must_use]
pub fn is_installed(dir: &Path, twin: &str, version: &str) -> bool {
    let binary = binary_path(dir, twin);
    if !binary.is_file() {
        return false;
    }
    let sidecar = binary.with_extension("version");
    match std::fs::read_to_string(&sidecar) {
        Ok(contents) => contents.trim() == version,
        Err(_) => false,
    }
}

/// Enforces the tier gate for a resolved version.
///
/// # Errors
///
/// Returns [`RegistryError::TierLocked`] when the version requires a
/// license and none valid is configured.
pub fn check_tier(
    twin: &str,
    version: &str,
    record: &VersionRecord,
    license: Option<&License>,
) -> Result<(), RegistryError> {
    if record.tier == Tier::Free {
        return Ok(());
    }
    if license.is_some() {
        return Ok(());
    }
    Err(RegistryError::TierLocked {
        twin: twin.to_string(),
        version: version.to_string(),
        tier: record.tier.as_str().to_string(),
    })
}

/// Downloads, verifies, and writes a twin binary.
///
/// Skips the download entirely when the binary is already installed at
/// the resolved version.
///
/// # Errors
///
/// Fails on tier lock, an unsupported host platform, a failed download,
/// a checksum mismatch, or filesystem errors writing the binary.
pub async fn install(
    dir: &Path,
    twin: &str,
    version: &str,
    record: &VersionRecord,
    license: Option<&License>,
) -> Result<InstallOutcome, RegistryError> {
    check_tier(twin, version, record, license)?;

    if is_installed(dir, twin, version) {
        debug!(twin, version, "already installed");
        return Ok(InstallOutcome::AlreadyInstalled(binary_path(dir, twin)));
    }

    let platform = host_platform();
    let url = record.binaries.get(&platform).ok_or_else(|| {
        RegistryError::UnsupportedPlatform {
            twin: twin.to_string(),
            version: version.to_string(),
            platform: platform.clone(),
        }
    })?;
    let expected = record.checksums.get(&platform).ok_or_else(|| {
        RegistryError::UnsupportedPlatform {
            twin: twin.to_string(),
            version: version.to_string(),
            platform: platform.clone(),
        }
    })?;

    info!(twin, version, url, "downloading twin binary");
    let bytes = download(url).await?;

    let actual = format!("sha256:{}", hex::encode(Sha256::digest(&bytes)));
    if actual != *expected {
        return Err(RegistryError::ChecksumMismatch {
            twin: twin.to_string(),
            version: version.to_string(),
            expected: expected.clone(),
            actual,
        });
    }

    write_binary(dir, twin, version, &bytes).map_err(|e| RegistryError::Download {
        url: url.clone(),
        message: format!("write failed: {e}"),
    })?;

    Ok(InstallOutcome::Installed(binary_path(dir, twin)))
}

async fn download(url: &str) -> Result<Vec<u8>, RegistryError> {
    let client = reqwest::Client::builder()
        .timeout(DOWNLOAD_TIMEOUT)
        .build()
        .map_err(|e| download_err(url, &e.to_string()))?;
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| download_err(url, &e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(download_err(url, &format!("server returned {status}")));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| download_err(url, &e.to_string()))?;
    Ok(bytes.to_vec())
}

fn download_err(url: &str, message: &str) -> RegistryError {
    RegistryError::Download {
        url: url.to_string(),
        message: message.to_string(),
    }
}

fn write_binary(dir: &Path, twin: &str, version: &str, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let binary = binary_path(dir, twin);
    std::fs::write(&binary, bytes)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755))?;
    }
    std::fs::write(binary.with_extension("version"), version)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn record(tier: Tier) -> VersionRecord {
        VersionRecord {
            released: "2026-01-01".to_string(),
            sdk_package: String::new(),
            sdk_version: String::new(),
            api_version: None,
            tier,
            checksums: BTreeMap::new(),
            binaries: BTreeMap::new(),
        }
    }

    #[test]
    fn host_platform_is_a_catalog_tag() {
        let platform = host_platform();
        let (os, arch) = platform.split_once('-').unwrap();
        assert!(!os.is_empty());
        assert!(!arch.is_empty());
        assert_ne!(os, "macos");
        assert_ne!(arch, "x86_64");
    }

    #[test]
    fn free_tier_needs_no_license() {
        assert!(check_tier("t", "1.0.0", &record(Tier::Free), None).is_ok());
    }

    #[test]
    fn paid_tier_without_license_is_locked() {
        let err = check_tier("t", "1.0.0", &record(Tier::Ent), None).unwrap_err();
        assert!(err.to_string().contains("wt auth login"));
    }

    #[test]
    fn paid_tier_with_license_passes() {
        let body = "wt_com_acme_secret1";
        let sum: u8 = body.bytes().fold(0u8, u8::wrapping_add);
        let license = License::validate(&format!("{body}_{sum:02x}")).unwrap();
        assert!(check_tier("t", "1.0.0", &record(Tier::Com), Some(&license)).is_ok());
    }

    #[test]
    fn installed_check_requires_matching_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!is_installed(dir.path(), "demo", "1.0.0"));

        write_binary(dir.path(), "demo", "1.0.0", b"#!/bin/sh\n").unwrap();
        assert!(is_installed(dir.path(), "demo", "1.0.0"));
        assert!(!is_installed(dir.path(), "demo", "1.1.0"));
    }

    #[tokio::test]
    async fn already_installed_skips_download() {
        let dir = tempfile::tempdir().unwrap();
        write_binary(dir.path(), "demo", "1.0.0", b"bin").unwrap();
        // No binaries/checksums in the record: install would fail with
        // UnsupportedPlatform if it got past the installed check.
        let outcome = install(dir.path(), "demo", "1.0.0", &record(Tier::Free), None)
            .await
            .unwrap();
        assert!(matches!(outcome, InstallOutcome::AlreadyInstalled(_)));
    }
}
