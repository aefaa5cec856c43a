//! `wt test`: run scenario files against the fleet.

use std::path::Path;

use crate::error::{Result, WonderTwinError};
use crate::fleet::Fleet;
use crate::scenario::{load_path, run_scenario, StepStatus};

/// Runs every scenario under `path` (default `scenarios/`).
///
/// # Errors
///
/// Load or setup failures are fatal; step failures are reported and
/// rolled up into a non-zero exit.
pub async fn run(config: Option<&Path>, path: Option<&Path>) -> Result<()> {
    let fleet = Fleet::load(config)?;
    let path = path.unwrap_or_else(|| Path::new("scenarios"));
    let scenarios = load_path(path)?;
    if scenarios.is_empty() {
        return Err(WonderTwinError::Failed(format!(
            "no scenarios found under {}",
            path.display()
        )));
    }

    let mut total = (0usize, 0usize, 0usize);
    let mut failed_scenarios = 0usize;
    for (file, scenario) in &scenarios {
        println!("=== {} ({})", scenario.name, file.display());
        let report = run_scenario(&fleet.manifest, scenario).await?;
        for step in &report.steps {
            match &step.status {
                StepStatus::Passed => println!("  PASS  {}", step.name),
                StepStatus::Failed(reasons) => {
                    println!("  FAIL  {}", step.name);
                    for reason in reasons {
                        println!("        {reason}");
                    }
                }
                StepStatus::Skipped(reason) => println!("  SKIP  {}  ({reason})", step.name),
            }
        }
        let (passed, failed, skipped) = report.counts();
        total.0 += passed;
        total.1 += failed;
        total.2 += skipped;
        if !report.passed() {
            failed_scenarios += 1;
        }
    }

    println!(
        "\n{} scenario(s): {} passed, {} failed, {} skipped",
        scenarios.len(),
        total.0,
        total.1,
        total.2
    );
    if failed_scenarios > 0 {
        return Err(WonderTwinError::Failed(format!(
            "{failed_scenarios} scenario(s) failed"
        )));
    }
    Ok(())
}
