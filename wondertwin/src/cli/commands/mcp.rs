//! `wt mcp`: serve the agent bridge over stdin/stdout.

use std::path::Path;

use crate::bridge;
use crate::error::Result;
use crate::fleet::Fleet;

/// Loads the fleet and serves the bridge until stdin closes.
///
/// # Errors
///
/// Manifest load failure or a stdio I/O failure.
pub async fn run(config: Option<&Path>) -> Result<()> {
    let fleet = Fleet::load(config)?;
    bridge::serve(&fleet).await
}
