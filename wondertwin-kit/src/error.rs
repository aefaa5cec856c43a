//! Error types for the twin runtime kit.

use thiserror::Error;

/// Errors surfaced by a twin's state contract.
///
/// Admin handlers map these onto HTTP status codes: parse failures
/// become 400, everything else 500.
#[derive(Debug, Error)]
pub enum StateError {
    /// The snapshot body could not be parsed.
    #[error("state parse error: {0}")]
    Parse(String),

    /// The snapshot parsed but could not be applied.
    #[error("state load error: {0}")]
    Load(String),
}

impl From<serde_json::Error> for StateError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
