//! Catalog schema: the JSON document a registry serves.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Platforms every released version must cover.
pub const REQUIRED_PLATFORMS: [&str; 4] = [
    "darwin-amd64",
    "darwin-arm64",
    "linux-amd64",
    "linux-arm64",
];

/// `sha256:` followed by 64 lowercase hex digits.
static CHECKSUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^sha256:[0-9a-f]{64}$").expect("checksum regex is valid"));

/// Returns whether `value` is a well-formed catalog checksum.
#[must_use]
pub fn is_valid_checksum(value: &str) -> bool {
    CHECKSUM_RE.is_match(value)
}

/// License tier required to install a version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// No license required.
    #[default]
    Free,
    /// Commercial license.
    Com,
    /// Enterprise license.
    Ent,
}

impl Tier {
    /// Lowercase tag as it appears in catalogs and license keys.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Com => "com",
            Self::Ent => "ent",
        }
    }
}

/// One released version of a twin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionRecord {
    /// ISO-8601 release date.
    pub released: String,

    /// SDK package the twin was built against.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sdk_package: String,

    /// SDK version.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sdk_version: String,

    /// Upstream API version the twin mirrors, when meaningful.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,

    /// Required license tier; absent means free.
    #[serde(default)]
    pub tier: Tier,

    /// `platform -> sha256:<hex>`.
    #[serde(default)]
    pub checksums: BTreeMap<String, String>,

    /// `platform -> download URL`.
    #[serde(default)]
    pub binaries: BTreeMap<String, String>,
}

/// One twin in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Human description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Source repository URL.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repository: String,

    /// Category tag (payments, messaging, ...).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,

    /// Author or publishing org.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,

    /// Version `latest` dereferences to.
    pub latest: String,

    /// All released versions.
    #[serde(default)]
    pub versions: BTreeMap<String, VersionRecord>,
}

/// Full catalog document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    /// Schema version, currently 1.
    pub schema_version: u32,

    /// Twin name -> entry.
    #[serde(default)]
    pub twins: BTreeMap<String, CatalogEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_format_is_strict() {
        let hex = "a".repeat(64);
        assert!(is_valid_checksum(&format!("sha256:{hex}")));
        assert!(!is_valid_checksum(&hex));
        assert!(!is_valid_checksum("sha256:abc"));
        assert!(!is_valid_checksum(&format!("sha256:{}", "A".repeat(64))));
        assert!(!is_valid_checksum(&format!("md5:{hex}")));
    }

    #[test]
    fn tier_defaults_to_free() {
        let record: VersionRecord = serde_json::from_value(serde_json::json!({
            "released": "2026-01-15"
        }))
        .unwrap();
        assert_eq!(record.tier, Tier::Free);
    }

    #[test]
    fn catalog_round_trips() {
        let raw = serde_json::json!({
            "schema_version": 1,
            "twins": {
                "stripeish": {
                    "description": "payments twin",
                    "latest": "1.2.0",
                    "versions": {
                        "1.2.0": {
                            "released": "2026-02-01",
                            "sdk_package": "wondertwin-kit",
                            "sdk_version": "0.4.0",
                            "tier": "com",
                            "checksums": { "linux-amd64": format!("sha256:{}", "0".repeat(64)) },
                            "binaries": { "linux-amd64": "https://dl.example/twin" }
                        }
                    }
                }
            }
        });
        let catalog: Catalog = serde_json::from_value(raw).unwrap();
        assert_eq!(catalog.twins["stripeish"].latest, "1.2.0");
        assert_eq!(
            catalog.twins["stripeish"].versions["1.2.0"].tier,
            Tier::Com
        );
    }
}
