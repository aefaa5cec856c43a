//! `wt conformance`: run the admin-contract check suite.

use crate::cli::args::ConformanceArgs;
use crate::conformance;
use crate::error::{Result, WonderTwinError};

/// Runs the harness and prints the report.
///
/// # Errors
///
/// Spawn failures are fatal; failed checks roll up to a non-zero exit.
pub async fn run(args: &ConformanceArgs) -> Result<()> {
    let report = conformance::run(&args.binary, args.port).await?;
    for check in &report.checks {
        let verdict = if check.passed { "PASS" } else { "FAIL" };
        println!("{verdict}  {:<16} {}", check.name, check.detail);
    }
    let (passed, failed) = report.counts();
    println!("\n{passed} passed, {failed} failed");
    if report.passed() {
        Ok(())
    } else {
        Err(WonderTwinError::Failed(format!(
            "{failed} conformance check(s) failed"
        )))
    }
}
