//! Scenario execution.

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use super::assert::{check, stringify};
use super::jsonpath;
use super::schema::{Scenario, Step};
use super::template::TemplateContext;
use crate::admin_client::AdminClient;
use crate::config::Manifest;
use crate::error::ScenarioError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_BODY: usize = 10 * 1024 * 1024;

/// How one step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// All assertions held.
    Passed,
    /// Request, capture, or assertion failures.
    Failed(Vec<String>),
    /// Not executed.
    Skipped(String),
}

/// One step's report line.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// Step name.
    pub name: String,
    /// Result.
    pub status: StepStatus,
}

/// Full run report for one scenario.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Scenario name.
    pub scenario: String,
    /// Per-step outcomes, in order.
    pub steps: Vec<StepOutcome>,
}

impl RunReport {
    /// True when every executed step passed and none were skipped.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.steps
            .iter()
            .all(|s| matches!(s.status, StepStatus::Passed))
    }

    /// `(passed, failed, skipped)` counts.
    #[must_use]
    pub fn counts(&self) -> (usize, usize, usize) {
        let mut counts = (0, 0, 0);
        for step in &self.steps {
            match step.status {
                StepStatus::Passed => counts.0 += 1,
                StepStatus::Failed(_) => counts.1 += 1,
                StepStatus::Skipped(_) => counts.2 += 1,
            }
        }
        counts
    }
}

/// Runs one scenario against the fleet described by `manifest`.
///
/// Each run gets a fresh variable scope seeded from the scenario's
/// initial variables. A setup failure aborts before any step; a step
/// failure only halts the run when that step carried a capture clause
/// (later steps cannot reference what was never captured).
///
/// # Errors
///
/// Returns [`ScenarioError::Setup`] when a reset or seed call fails.
pub async fn run_scenario(
    manifest: &Manifest,
    scenario: &Scenario,
) -> Result<RunReport, ScenarioError> {
    info!(scenario = %scenario.name, "running scenario");
    let mut ctx = TemplateContext::new(manifest, scenario.variables.clone());

    if let Some(setup) = &scenario.setup {
        run_setup(manifest, setup).await?;
    }

    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ScenarioError::Setup(e.to_string()))?;

    let mut steps = Vec::with_capacity(scenario.steps.len());
    let mut halted = false;
    for step in &scenario.steps {
        if halted {
            steps.push(StepOutcome {
                name: step.name.clone(),
                status: StepStatus::Skipped("skipped: previous step failed".to_string()),
            });
            continue;
        }
        let status = run_step(&client, &mut ctx, step).await;
        if matches!(status, StepStatus::Failed(_)) && !step.capture.is_empty() {
            halted = true;
        }
        steps.push(StepOutcome {
            name: step.name.clone(),
            status,
        });
    }

    Ok(RunReport {
        scenario: scenario.name.clone(),
        steps,
    })
}

async fn run_setup(
    manifest: &Manifest,
    setup: &super::schema::SetupSpec,
) -> Result<(), ScenarioError> {
    for name in &setup.reset {
        let twin = manifest
            .twin(name)
            .map_err(|e| ScenarioError::Setup(e.to_string()))?;
        AdminClient::new(twin.admin_port())
            .reset()
            .await
            .map_err(|e| ScenarioError::Setup(format!("reset {name}: {e}")))?;
    }
    for (name, path) in &setup.seed {
        let twin = manifest
            .twin(name)
            .map_err(|e| ScenarioError::Setup(e.to_string()))?;
        let seed = manifest
            .dir
            .join(path);
        let bytes = std::fs::read(&seed)
            .map_err(|e| ScenarioError::Setup(format!("seed {}: {e}", seed.display())))?;
        AdminClient::new(twin.admin_port())
            .seed(bytes)
            .await
            .map_err(|e| ScenarioError::Setup(format!("seed {name}: {e}")))?;
    }
    Ok(())
}

async fn run_step(
    client: &reqwest::Client,
    ctx: &mut TemplateContext<'_>,
    step: &Step,
) -> StepStatus {
    match execute_step(client, ctx, step).await {
        Ok(failures) if failures.is_empty() => StepStatus::Passed,
        Ok(failures) => StepStatus::Failed(failures),
        Err(message) => StepStatus::Failed(vec![message]),
    }
}

/// Issues the request and evaluates captures then assertions. A
/// `Err` is a hard failure (expansion, transport); the `Ok` vector
/// holds capture and assertion failures.
async fn execute_step(
    client: &reqwest::Client,
    ctx: &mut TemplateContext<'_>,
    step: &Step,
) -> Result<Vec<String>, String> {
    let spec = &step.request;
    let url = ctx.expand(&spec.url).map_err(|e| e.to_string())?;
    let method = reqwest::Method::from_bytes(spec.method.to_uppercase().as_bytes())
        .map_err(|_| format!("bad method {:?}", spec.method))?;

    let body = match &spec.body {
        None => None,
        Some(Value::String(s)) => Some(ctx.expand(s).map_err(|e| e.to_string())?),
        Some(other) => {
            // Marshal first so templated scalars inside JSON strings
            // resolve after one expansion pass.
            let raw = serde_json::to_string(other).map_err(|e| e.to_string())?;
            Some(ctx.expand(&raw).map_err(|e| e.to_string())?)
        }
    };

    let mut request = client.request(method, &url);
    let mut has_content_type = false;
    for (name, value) in &spec.headers {
        let value = ctx.expand(value).map_err(|e| e.to_string())?;
        if name.eq_ignore_ascii_case("content-type") {
            has_content_type = true;
        }
        request = request.header(name, value);
    }
    if let Some(body) = body {
        if !has_content_type {
            request = request.header("content-type", "application/json");
        }
        request = request.body(body);
    }

    debug!(step = %step.name, %url, "issuing request");
    let response = request.send().await.map_err(|e| format!("request: {e}"))?;
    let status = response.status().as_u16();
    let headers = response.headers().clone();
    let mut bytes = response
        .bytes()
        .await
        .map_err(|e| format!("read body: {e}"))?
        .to_vec();
    bytes.truncate(MAX_BODY);
    let body_text = String::from_utf8_lossy(&bytes).into_owned();
    let body_json: Option<Value> = serde_json::from_str(&body_text).ok();

    let mut failures = Vec::new();

    // Captures run before assertions so later steps can use the
    // variables even when this step's assertions fail.
    for (var, path) in &step.capture {
        match body_json.as_ref().and_then(|doc| jsonpath::extract(doc, path)) {
            Some(value) => {
                ctx.vars.insert(var.clone(), stringify(value));
            }
            None => failures.push(format!("capture {var}: no match for {path}")),
        }
    }

    let Some(assertions) = &step.assertions else {
        return Ok(failures);
    };

    if let Some(expected) = assertions.status {
        if status != expected {
            failures.push(format!("status: expected {expected}, got {status}"));
        }
    }
    if let Some(needle) = &assertions.body_contains {
        let needle = ctx.expand(needle).map_err(|e| e.to_string())?;
        if !body_text.contains(&needle) {
            failures.push(format!("body does not contain {needle:?}"));
        }
    }
    for (name, expected) in &assertions.headers {
        let expected = ctx.expand(expected).map_err(|e| e.to_string())?;
        let actual = headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if actual != expected {
            failures.push(format!(
                "header {name}: expected {expected:?}, got {actual:?}"
            ));
        }
    }
    for (path, expected) in &assertions.body {
        let expected = expand_expected(ctx, expected)?;
        let actual = body_json.as_ref().and_then(|doc| jsonpath::extract(doc, path));
        if let Err(message) = check(path, actual, &expected) {
            failures.push(message);
        }
    }

    Ok(failures)
}

/// Expands template expressions inside expected values, including
/// strings nested in operator objects like `{"eq": "{{var}}"}`.
fn expand_expected(ctx: &TemplateContext<'_>, expected: &Value) -> Result<Value, String> {
    match expected {
        Value::String(s) => Ok(Value::String(ctx.expand(s).map_err(|e| e.to_string())?)),
        Value::Object(map) => {
            let mut out = serde_json::Map::with_capacity(map.len());
            for (key, value) in map {
                out.insert(key.clone(), expand_expected(ctx, value)?);
            }
            Ok(Value::Object(out))
        }
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|item| expand_expected(ctx, item))
                .collect::<Result<_, _>>()?,
        )),
        other => Ok(other.clone()),
    }
}
