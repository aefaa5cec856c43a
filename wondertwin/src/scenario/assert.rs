//! Body assertion evaluation.

use regex::Regex;
use serde_json::Value;

/// Stringifies a JSON value the way captures and `contains` see it:
/// strings lose their quotes, everything else is compact JSON.
#[must_use]
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    value.as_f64()
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    if let (Some(a), Some(e)) = (as_f64(actual), as_f64(expected)) {
        return (a - e).abs() < f64::EPSILON;
    }
    stringify(actual) == stringify(expected)
}

/// Evaluates one body assertion: `expected` is either a literal or an
/// operator object (`exists`, `eq`, `gte`, `lte`, `contains`, `regex`,
/// all of which must pass).
///
/// # Errors
///
/// Returns a human-readable failure description.
pub fn check(path: &str, actual: Option<&Value>, expected: &Value) -> Result<(), String> {
    let Value::Object(ops) = expected else {
        // Literal match.
        let Some(actual) = actual else {
            return Err(format!("{path}: no match in body"));
        };
        if values_equal(actual, expected) {
            return Ok(());
        }
        return Err(format!(
            "{path}: expected {}, got {}",
            stringify(expected),
            stringify(actual)
        ));
    };

    for (op, arg) in ops {
        match op.as_str() {
            "exists" => {
                let want = arg.as_bool().unwrap_or(true);
                if actual.is_some() != want {
                    return Err(format!(
                        "{path}: exists is {}, expected {want}",
                        actual.is_some()
                    ));
                }
            }
            "eq" => {
                let Some(actual) = actual else {
                    return Err(format!("{path}: no match in body"));
                };
                if !values_equal(actual, arg) {
                    return Err(format!(
                        "{path}: expected {}, got {}",
                        stringify(arg),
                        stringify(actual)
                    ));
                }
            }
            "gte" | "lte" => {
                let Some(actual) = actual else {
                    return Err(format!("{path}: no match in body"));
                };
                let (Some(a), Some(e)) = (as_f64(actual), as_f64(arg)) else {
                    return Err(format!("{path}: {op} requires numeric values"));
                };
                let pass = if op == "gte" { a >= e } else { a <= e };
                if !pass {
                    return Err(format!("{path}: {a} is not {op} {e}"));
                }
            }
            "contains" => {
                let Some(actual) = actual else {
                    return Err(format!("{path}: no match in body"));
                };
                if !stringify(actual).contains(&stringify(arg)) {
                    return Err(format!(
                        "{path}: {} does not contain {}",
                        stringify(actual),
                        stringify(arg)
                    ));
                }
            }
            "regex" => {
                let Some(actual) = actual else {
                    return Err(format!("{path}: no match in body"));
                };
                let pattern = stringify(arg);
                let re = Regex::new(&pattern)
                    .map_err(|e| format!("{path}: bad regex {pattern:?}: {e}"))?;
                if !re.is_match(&stringify(actual)) {
                    return Err(format!(
                        "{path}: {} does not match {pattern:?}",
                        stringify(actual)
                    ));
                }
            }
            unknown => return Err(format!("{path}: unknown operator {unknown:?}")),
        }
    }
    Ok(())
}
