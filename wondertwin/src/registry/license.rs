//! License key parsing and validation.
//!
//! Keys look like `wt_{tier}_{org}_{random}_{check}` where `check` is
//! the lowercase hex of the 8-bit sum of the bytes of everything before
//! it. The org `ind` denotes an individual license.

use super::catalog::Tier;
use crate::error::RegistryError;

const MIN_RANDOM_LEN: usize = 6;

/// A parsed, checksum-verified license key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct License {
    /// Tier the key grants.
    pub tier: Tier,
    /// Organization slug (`ind` for individuals).
    pub org: String,
}

impl License {
    /// Parses and validates a key.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidLicense`] for any structural or
    /// checksum deviation.
    pub fn validate(key: &str) -> Result<Self, RegistryError> {
        let parts: Vec<&str> = key.split('_').collect();
        if parts.len() != 5 || parts[0] != "wt" {
            return Err(invalid("expected wt_{tier}_{org}_{random}_{check}"));
        }
        let tier = match parts[1] {
            "com" => Tier::Com,
            "ent" => Tier::Ent,
            other => return Err(invalid(&format!("unknown tier {other:?}"))),
        };
        let org = parts[2];
        if org.is_empty() {
            return Err(invalid("empty org"));
        }
        let random = parts[3];
        if random.len() < MIN_RANDOM_LEN {
            return Err(invalid("random segment too short"));
        }
        let body = format!("wt_{}_{org}_{random}", parts[1]);
        let sum: u8 = body.bytes().fold(0u8, u8::wrapping_add);
        let expected = format!("{sum:02x}");
        if parts[4] != expected {
            return Err(invalid("checksum mismatch"));
        }
        Ok(Self {
            tier,
            org: org.to_string(),
        })
    }
}

fn invalid(message: &str) -> RegistryError {
    RegistryError::InvalidLicense(message.to_string())
}
