//! Catalog fetch and version resolution.

use std::time::Duration;

use tracing::debug;

use super::catalog::{Catalog, CatalogEntry, VersionRecord};
use crate::error::RegistryError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetches and decodes a catalog. An optional bearer token is sent for
/// private registries.
///
/// # Errors
///
/// Returns [`RegistryError::CatalogFetch`] on transport failure,
/// non-200 status, or a body that does not decode.
pub async fn fetch_catalog(url: &str, token: Option<&str>) -> Result<Catalog, RegistryError> {
    debug!(url, "fetching catalog");
    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .build()
        .map_err(|e| fetch_err(url, &e.to_string()))?;
    let mut request = client.get(url);
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }
    let response = request
        .send()
        .await
        .map_err(|e| fetch_err(url, &e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(fetch_err(url, &format!("server returned {status}")));
    }
    response
        .json::<Catalog>()
        .await
        .map_err(|e| fetch_err(url, &format!("invalid catalog body: {e}")))
}

fn fetch_err(url: &str, message: &str) -> RegistryError {
    RegistryError::CatalogFetch {
        url: url.to_string(),
        message: message.to_string(),
    }
}

/// Resolves `(twin, spec)` against a catalog. An empty or `latest` spec
/// dereferences the entry's `latest` pointer.
///
/// # Errors
///
/// Returns [`RegistryError::TwinNotFound`] or
/// [`RegistryError::VersionNotFound`].
pub fn resolve<'a>(
    catalog: &'a Catalog,
    twin: &str,
    spec: &str,
) -> Result<(String, &'a VersionRecord), RegistryError> {
    let entry: &CatalogEntry = catalog
        .twins
        .get(twin)
        .ok_or_else(|| RegistryError::TwinNotFound(twin.to_string()))?;

    let version = if spec.is_empty() || spec == "latest" {
        entry.latest.as_str()
    } else {
        spec
    };

    let record = entry
        .versions
        .get(version)
        .ok_or_else(|| RegistryError::VersionNotFound {
            twin: twin.to_string(),
            version: version.to_string(),
        })?;

    Ok((version.to_string(), record))
}
