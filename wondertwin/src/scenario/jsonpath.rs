//! Minimal JSONPath: `$`, `.field`, `[i]`.

use serde_json::Value;

/// Extracts the value at `path`, or `None` when any segment misses.
/// A path not starting with `$` never matches.
#[must_use]
pub fn extract<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let rest = path.strip_prefix('$')?;
    let mut current = document;
    for segment in segments(rest) {
        if let Some(index) = segment.strip_prefix('[') {
            let index: usize = index.strip_suffix(']')?.parse().ok()?;
            current = current.as_array()?.get(index)?;
        } else {
            current = current.as_object()?.get(segment)?;
        }
    }
    Some(current)
}

/// Splits `.a.b[0].c` into `["a", "b", "[0]", "c"]`, respecting
/// bracket depth.
fn segments(path: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut depth = 0usize;
    let bytes = path.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'[' => {
                if depth == 0 && start < i {
                    out.push(&path[start..i]);
                    start = i;
                }
                depth += 1;
            }
            b']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    out.push(&path[start..=i]);
                    start = i + 1;
                }
            }
            b'.' if depth == 0 => {
                if start < i {
                    out.push(&path[start..i]);
                }
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < path.len() {
        out.push(&path[start..]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn root_returns_document() {
        let doc = json!({"a": 1});
        assert_eq!(extract(&doc, "$"), Some(&doc));
    }

    #[test]
    fn nested_fields_navigate() {
        let doc = json!({"customer": {"email": "a@b.c"}});
        assert_eq!(
            extract(&doc, "$.customer.email"),
            Some(&json!("a@b.c"))
        );
    }

    #[test]
    fn array_indexing() {
        let doc = json!({"data": [{"id": "x"}, {"id": "y"}]});
        assert_eq!(extract(&doc, "$.data[1].id"), Some(&json!("y")));
        assert_eq!(extract(&doc, "$.data[9].id"), None);
    }

    #[test]
    fn missing_field_is_no_match() {
        let doc = json!({"a": 1});
        assert_eq!(extract(&doc, "$.b.c"), None);
    }

    #[test]
    fn non_dollar_path_never_matches() {
        let doc = json!({"a": 1});
        assert_eq!(extract(&doc, "a"), None);
    }

    #[test]
    fn indexing_a_non_array_is_no_match() {
        let doc = json!({"a": {"b": 1}});
        assert_eq!(extract(&doc, "$.a[0]"), None);
    }
}
