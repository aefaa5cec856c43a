//! `{{ expr }}` template expansion for scenario strings.
//!
//! Expressions: `twins.<name>.port`, `twins.<name>.admin_port`,
//! `env.<VAR>` (empty string when unset), and bare identifiers for
//! captured variables. Substituted text is never re-scanned, so a
//! value that expands to literal braces stays literal.

use std::collections::BTreeMap;

use crate::config::Manifest;
use crate::error::ScenarioError;

/// Everything an expansion can reference.
pub struct TemplateContext<'a> {
    manifest: &'a Manifest,
    /// Captured variables, scoped to one scenario run.
    pub vars: BTreeMap<String, String>,
}

impl<'a> TemplateContext<'a> {
    /// Context seeded from a scenario's initial variables.
    #[must_use]
    pub fn new(manifest: &'a Manifest, initial: BTreeMap<String, String>) -> Self {
        Self {
            manifest,
            vars: initial,
        }
    }

    /// Expands every `{{ expr }}` occurrence in `input`.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Template`] for an unterminated `{{`,
    /// an unknown twin, a twin field other than `port`/`admin_port`,
    /// or an unknown variable.
    pub fn expand(&self, input: &str) -> Result<String, ScenarioError> {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("}}") else {
                return Err(template_err(format!(
                    "unterminated {{{{ in {input:?}"
                )));
            };
            let expr = after[..end].trim();
            out.push_str(&self.resolve(expr)?);
            rest = &after[end + 2..];
        }
        out.push_str(rest);
        Ok(out)
    }

    fn resolve(&self, expr: &str) -> Result<String, ScenarioError> {
        if let Some(rest) = expr.strip_prefix("twins.") {
            let Some((twin, field)) = rest.split_once('.') else {
                return Err(template_err(format!(
                    "twin reference {expr:?} needs a field"
                )));
            };
            let config = self
                .manifest
                .twin(twin)
                .map_err(|e| template_err(e.to_string()))?;
            return match field {
                "port" => Ok(config.port.to_string()),
                "admin_port" => Ok(config.admin_port().to_string()),
                other => Err(template_err(format!(
                    "unknown twin field {other:?} in {expr:?}"
                ))),
            };
        }
        if let Some(var) = expr.strip_prefix("env.") {
            return Ok(std::env::var(var).unwrap_or_default());
        }
        self.vars
            .get(expr)
            .cloned()
            .ok_or_else(|| template_err(format!("unknown variable {expr:?}")))
    }
}

fn template_err(message: String) -> ScenarioError {
    ScenarioError::Template {
        step: None,
        message,
    }
}
