//! Scenario file schema, shared by the JSON (v2) and YAML (v1) loaders.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// A full scenario.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    /// Scenario name; must be non-empty.
    #[serde(default)]
    pub name: String,

    /// Human description.
    #[serde(default)]
    pub description: String,

    /// Initial captured-variable map.
    #[serde(default)]
    pub variables: BTreeMap<String, String>,

    /// Pre-run fleet preparation.
    #[serde(default)]
    pub setup: Option<SetupSpec>,

    /// Ordered steps; must be non-empty.
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Fleet preparation before the first step.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SetupSpec {
    /// Twins to `/admin/reset`.
    #[serde(default)]
    pub reset: Vec<String>,

    /// Twin -> seed file POSTed to `/admin/state`.
    #[serde(default)]
    pub seed: BTreeMap<String, String>,
}

/// One scenario step.
#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    /// Step name for the report.
    #[serde(default)]
    pub name: String,

    /// The HTTP request to issue.
    pub request: RequestSpec,

    /// Variable name -> JSONPath extracted from the response body.
    #[serde(default)]
    pub capture: BTreeMap<String, String>,

    /// Assertions applied after captures.
    #[serde(default, rename = "assert")]
    pub assertions: Option<AssertSpec>,
}

/// The request half of a step.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestSpec {
    /// HTTP method.
    pub method: String,

    /// URL, template-expanded.
    pub url: String,

    /// Header map; values are template-expanded.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Body: a string (expanded directly) or any JSON value
    /// (marshaled first, then expanded).
    #[serde(default)]
    pub body: Option<Value>,
}

/// The assertion half of a step.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssertSpec {
    /// Exact status code.
    #[serde(default)]
    pub status: Option<u16>,

    /// Substring of the body (template-expanded before matching).
    #[serde(default)]
    pub body_contains: Option<String>,

    /// Header name -> exact expected value.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// JSONPath -> literal or operator object.
    #[serde(default)]
    pub body: BTreeMap<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_scenario_parses() {
        let raw = serde_json::json!({
            "name": "smoke",
            "steps": [
                { "name": "health", "request": { "method": "GET", "url": "http://x/health" } }
            ]
        });
        let scenario: Scenario = serde_json::from_value(raw).unwrap();
        assert_eq!(scenario.name, "smoke");
        assert_eq!(scenario.steps.len(), 1);
        assert!(scenario.steps[0].capture.is_empty());
    }

    #[test]
    fn full_step_parses() {
        let raw = serde_json::json!({
            "name": "create",
            "request": {
                "method": "POST",
                "url": "http://x/v1/customers",
                "headers": { "Authorization": "Bearer {{env.KEY}}" },
                "body": { "email": "a@b.c" }
            },
            "capture": { "customer_id": "$.id" },
            "assert": {
                "status": 200,
                "body": { "$.email": "a@b.c", "$.balance": { "gte": 0 } }
            }
        });
        let step: Step = serde_json::from_value(raw).unwrap();
        assert_eq!(step.capture["customer_id"], "$.id");
        let assertions = step.assertions.unwrap();
        assert_eq!(assertions.status, Some(200));
        assert_eq!(assertions.body.len(), 2);
    }
}
