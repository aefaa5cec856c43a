//! Catalog verifier: structural checks plus binary-URL reachability.

use std::time::Duration;

use reqwest::StatusCode;
use tracing::debug;

use crate::error::Result;
use crate::registry::catalog::{is_valid_checksum, Catalog, REQUIRED_PLATFORMS};
use crate::registry::resolver::fetch_catalog;

const HEAD_TIMEOUT: Duration = Duration::from_secs(15);

/// One verification line.
#[derive(Debug, Clone)]
pub struct VerifyOutcome {
    /// What was checked.
    pub check: String,
    /// Verdict.
    pub passed: bool,
}

impl VerifyOutcome {
    fn new(check: String, passed: bool) -> Self {
        debug!(%check, passed, "verify");
        Self { check, passed }
    }
}

/// Fetches `url` and verifies the catalog it serves. Returns every
/// check outcome; the caller derives the exit code from failures.
///
/// # Errors
///
/// Only the initial fetch/parse is fatal; individual checks never
/// abort the run.
pub async fn verify_catalog(url: &str, token: Option<&str>) -> Result<Vec<VerifyOutcome>> {
    let catalog = fetch_catalog(url, token).await?;
    let mut out = Vec::new();

    out.push(VerifyOutcome::new(
        format!("schema_version {} >= 1", catalog.schema_version),
        catalog.schema_version >= 1,
    ));
    out.push(VerifyOutcome::new(
        format!("catalog has {} twin(s)", catalog.twins.len()),
        !catalog.twins.is_empty(),
    ));

    let client = reqwest::Client::builder()
        .timeout(HEAD_TIMEOUT)
        .build()
        .unwrap_or_default();

    for (name, entry) in &catalog.twins {
        out.push(VerifyOutcome::new(
            format!("{name}: latest {} exists", entry.latest),
            entry.versions.contains_key(&entry.latest),
        ));

        for (version, record) in &entry.versions {
            for platform in REQUIRED_PLATFORMS {
                out.push(VerifyOutcome::new(
                    format!("{name}@{version}: checksum for {platform}"),
                    record
                        .checksums
                        .get(platform)
                        .is_some_and(|c| is_valid_checksum(c)),
                ));
                out.push(VerifyOutcome::new(
                    format!("{name}@{version}: binary URL for {platform}"),
                    record.binaries.contains_key(platform),
                ));
            }
            for (platform, binary_url) in &record.binaries {
                let reachable = url_reachable(&client, binary_url).await;
                out.push(VerifyOutcome::new(
                    format!("{name}@{version}: {platform} binary reachable"),
                    reachable,
                ));
            }
        }
    }

    Ok(out)
}

/// HEAD probe; a 403 or 405 (common on release CDNs) retries with a
/// one-byte ranged GET and accepts 200 or 206.
async fn url_reachable(client: &reqwest::Client, url: &str) -> bool {
    match client.head(url).send().await {
        Ok(response) if response.status().is_success() => true,
        Ok(response)
            if response.status() == StatusCode::FORBIDDEN
                || response.status() == StatusCode::METHOD_NOT_ALLOWED =>
        {
            match client.get(url).header("Range", "bytes=0-0").send().await {
                Ok(ranged) => {
                    ranged.status() == StatusCode::OK
                        || ranged.status() == StatusCode::PARTIAL_CONTENT
                }
                Err(_) => false,
            }
        }
        _ => false,
    }
}
