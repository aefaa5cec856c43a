//! `wt auth`: license key management.

use crate::config::CliConfig;
use crate::error::Result;
use crate::registry::license::License;

/// Validates and stores a license key.
///
/// # Errors
///
/// Invalid keys are rejected without touching the stored config.
pub fn login(key: &str) -> Result<()> {
    let license = License::validate(key)?;
    let mut config = CliConfig::load()?;
    config.license_key = Some(key.to_string());
    config.save()?;
    println!(
        "logged in: {} tier, org {}",
        license.tier.as_str(),
        license.org
    );
    Ok(())
}

/// Shows the stored license, if any.
///
/// # Errors
///
/// Config load failure.
pub fn status() -> Result<()> {
    let config = CliConfig::load()?;
    match config.license_key.as_deref() {
        None => println!("not logged in"),
        Some(key) => match License::validate(key) {
            Ok(license) => println!(
                "logged in: {} tier, org {}",
                license.tier.as_str(),
                license.org
            ),
            Err(_) => println!("stored license key is invalid; run `wt auth login <key>`"),
        },
    }
    Ok(())
}

/// Forgets the stored license.
///
/// # Errors
///
/// Config load or save failure.
pub fn logout() -> Result<()> {
    let mut config = CliConfig::load()?;
    if config.license_key.take().is_none() {
        println!("not logged in");
    } else {
        config.save()?;
        println!("logged out");
    }
    Ok(())
}
