//! Scenario loading: one scenario per file, JSON or legacy YAML.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::schema::Scenario;
use crate::error::ScenarioError;

/// Loads one scenario file. The extension selects the parser:
/// `.json` is the v2 format, `.yaml`/`.yml` the legacy v1 format
/// (same schema).
///
/// # Errors
///
/// Returns [`ScenarioError::Invalid`] for unreadable files, parse
/// failures, a missing name, or an empty step list.
pub fn load_file(path: &Path) -> Result<Scenario, ScenarioError> {
    let raw = std::fs::read_to_string(path).map_err(|e| invalid(path, &e.to_string()))?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let scenario: Scenario = match ext {
        "yaml" | "yml" => serde_yaml::from_str(&raw).map_err(|e| invalid(path, &e.to_string()))?,
        _ => serde_json::from_str(&raw).map_err(|e| invalid(path, &e.to_string()))?,
    };
    validate(path, &scenario)?;
    debug!(path = %path.display(), name = %scenario.name, "loaded scenario");
    Ok(scenario)
}

/// Loads scenarios from a path. A file loads alone; a directory loads
/// every direct `*.json` child in name order, skipping subdirectories.
///
/// # Errors
///
/// Any individual load failure, or an unreadable directory.
pub fn load_path(path: &Path) -> Result<Vec<(PathBuf, Scenario)>, ScenarioError> {
    if path.is_dir() {
        let mut files: Vec<PathBuf> = std::fs::read_dir(path)
            .map_err(|e| invalid(path, &e.to_string()))?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == "json"))
            .collect();
        files.sort();
        let mut out = Vec::with_capacity(files.len());
        for file in files {
            let scenario = load_file(&file)?;
            out.push((file, scenario));
        }
        Ok(out)
    } else {
        let scenario = load_file(path)?;
        Ok(vec![(path.to_path_buf(), scenario)])
    }
}

fn validate(path: &Path, scenario: &Scenario) -> Result<(), ScenarioError> {
    if scenario.name.is_empty() {
        return Err(invalid(path, "scenario has no name"));
    }
    if scenario.steps.is_empty() {
        return Err(invalid(path, "scenario has no steps"));
    }
    Ok(())
}

fn invalid(path: &Path, message: &str) -> ScenarioError {
    ScenarioError::Invalid {
        path: path.to_path_buf(),
        message: message.to_string(),
    }
}
