//! `wt registry`: named registry management.

use crate::config::CliConfig;
use crate::error::Result;

/// Adds or updates a named registry.
///
/// # Errors
///
/// `public` cannot be shadowed; config save failures propagate.
pub fn add(name: &str, url: String, token: Option<String>) -> Result<()> {
    let mut config = CliConfig::load()?;
    config.add_registry(name, url, token)?;
    config.save()?;
    println!("registry {name} saved");
    Ok(())
}

/// Removes a named registry.
///
/// # Errors
///
/// `public` cannot be removed; unknown names error.
pub fn remove(name: &str) -> Result<()> {
    let mut config = CliConfig::load()?;
    config.remove_registry(name)?;
    config.save()?;
    println!("registry {name} removed");
    Ok(())
}

/// Lists configured registries, `public` first.
///
/// # Errors
///
/// Config load failure.
pub fn list() -> Result<()> {
    let config = CliConfig::load()?;
    for (name, entry) in config.list_registries() {
        let token = if entry.token.is_some() { " (token)" } else { "" };
        println!("{name:<16} {}{token}", entry.url);
    }
    Ok(())
}
