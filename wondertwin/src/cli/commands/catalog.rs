//! `wt catalog`: registry CI tools.

use crate::catalog_tools::{update_catalog, verify_catalog, UpdateArgs};
use crate::cli::args::{CatalogUpdateArgs, CatalogVerifyArgs};
use crate::config::CliConfig;
use crate::error::{Result, WonderTwinError};

/// `wt catalog update`.
///
/// # Errors
///
/// Unreadable inputs or a catalog that cannot be written.
pub fn update(args: &CatalogUpdateArgs) -> Result<()> {
    update_catalog(&UpdateArgs {
        name: args.name.clone(),
        version: args.version.clone(),
        checksums: args.checksums.clone(),
        catalog: args.catalog.clone(),
        repo: args.repo.clone(),
        prerelease: args.prerelease,
        manifest_dir: args.manifest_dir.clone(),
    })?;
    println!("{}@{} upserted into {}", args.name, args.version, args.catalog.display());
    Ok(())
}

/// `wt catalog verify`.
///
/// # Errors
///
/// Fetch failures are fatal; failed checks roll up to a non-zero exit.
pub async fn verify(args: &CatalogVerifyArgs) -> Result<()> {
    let (url, token) = match &args.url {
        Some(url) => (url.clone(), None),
        None => {
            let registry = CliConfig::load()?.registry("public")?;
            (registry.url, registry.token)
        }
    };

    let outcomes = verify_catalog(&url, token.as_deref()).await?;
    let mut failed = 0usize;
    for outcome in &outcomes {
        let verdict = if outcome.passed {
            "PASS"
        } else {
            failed += 1;
            "FAIL"
        };
        println!("{verdict}  {}", outcome.check);
    }
    println!("\n{} checks, {failed} failed", outcomes.len());
    if failed == 0 {
        Ok(())
    } else {
        Err(WonderTwinError::Failed(format!(
            "catalog verification failed ({failed} check(s))"
        )))
    }
}
