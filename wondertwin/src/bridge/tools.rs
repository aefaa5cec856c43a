//! The bridge's tool catalog and dispatch.
//!
//! Every tool delegates to the same [`Fleet`] operations the CLI uses,
//! and wraps its output in the `{content:[{type:"text",text}]}` shape
//! agents expect.

use serde_json::{json, Value};

use super::jsonrpc::error_codes;
use crate::fleet::{pretty_body, Fleet, UpAction};

/// A tool-call failure: JSON-RPC error code plus message.
pub type ToolError = (i64, String);

/// The `tools/list` catalog.
#[must_use]
pub fn catalog() -> Value {
    let twin_only = json!({
        "type": "object",
        "properties": { "twin": { "type": "string" } },
        "required": ["twin"]
    });
    json!({ "tools": [
        {
            "name": "wt_up",
            "description": "Start every twin in the manifest and report health",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "wt_down",
            "description": "Stop the running fleet",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "wt_status",
            "description": "Tabulate pid, port, and health for every twin",
            "inputSchema": { "type": "object", "properties": {} }
        },
        {
            "name": "wt_reset",
            "description": "Reset one twin, or every running twin",
            "inputSchema": {
                "type": "object",
                "properties": { "twin": { "type": "string" } }
            }
        },
        {
            "name": "wt_seed",
            "description": "POST a seed file to a twin's admin state",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "twin": { "type": "string" },
                    "file": { "type": "string" }
                },
                "required": ["twin", "file"]
            }
        },
        {
            "name": "wt_inspect",
            "description": "Fetch a twin's admin state",
            "inputSchema": twin_only,
        },
        {
            "name": "wt_config",
            "description": "Show a twin's configuration, or push runtime config updates",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "twin": { "type": "string" },
                    "updates": { "type": "object" }
                },
                "required": ["twin"]
            }
        },
        {
            "name": "wt_quirks",
            "description": "List a twin's behavior quirks, or enable/disable one",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "twin": { "type": "string" },
                    "action": { "type": "string", "enum": ["enable", "disable"] },
                    "quirk_id": { "type": "string" }
                },
                "required": ["twin"]
            }
        }
    ]})
}

/// Dispatches one `tools/call` by name.
///
/// # Errors
///
/// Unknown names return `-32601`; bad arguments `-32602`; operational
/// failures `-32603`.
pub async fn call(fleet: &Fleet, name: &str, args: &Value) -> Result<Value, ToolError> {
    let text = match name {
        "wt_up" => up(fleet).await?,
        "wt_down" => down(fleet).await?,
        "wt_status" => status(fleet).await?,
        "wt_reset" => reset(fleet, args).await?,
        "wt_seed" => seed(fleet, args).await?,
        "wt_inspect" => inspect(fleet, args).await?,
        "wt_config" => config(fleet, args).await?,
        "wt_quirks" => quirks(fleet, args).await?,
        other => {
            return Err((
                error_codes::METHOD_NOT_FOUND,
                format!("unknown tool: {other}"),
            ))
        }
    };
    Ok(json!({ "content": [{ "type": "text", "text": text }] }))
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| (error_codes::INVALID_PARAMS, format!("missing {key:?}")))
}

fn internal(e: impl std::fmt::Display) -> ToolError {
    (error_codes::INTERNAL_ERROR, e.to_string())
}

async fn up(fleet: &Fleet) -> Result<String, ToolError> {
    let results = fleet.up().await.map_err(internal)?;
    let mut lines = Vec::new();
    for result in results {
        let line = match &result.action {
            UpAction::Started(pid) => {
                let health = match result.healthy {
                    Some(true) => "healthy",
                    Some(false) => "not responding",
                    None => "unknown",
                };
                format!("{}: started (pid {pid}, port {}, {health})", result.name, result.port)
            }
            UpAction::AlreadyRunning(pid) => {
                format!("{}: already running (pid {pid})", result.name)
            }
            UpAction::Failed(message) => format!("{}: failed: {message}", result.name),
        };
        lines.push(line);
    }
    Ok(lines.join("\n"))
}

async fn down(fleet: &Fleet) -> Result<String, ToolError> {
    let stopped = fleet.down().await.map_err(internal)?;
    if stopped.is_empty() {
        Ok("no twins were running".to_string())
    } else {
        Ok(format!("stopped: {}", stopped.join(", ")))
    }
}

async fn status(fleet: &Fleet) -> Result<String, ToolError> {
    let rows = fleet.status().await.map_err(internal)?;
    let lines: Vec<String> = rows
        .iter()
        .map(|row| {
            let pid = row
                .pid
                .map_or_else(|| "-".to_string(), |pid| pid.to_string());
            format!("{}\tpid={pid}\tport={}\t{}\t{}", row.name, row.port, row.health, row.url)
        })
        .collect();
    Ok(lines.join("\n"))
}

async fn reset(fleet: &Fleet, args: &Value) -> Result<String, ToolError> {
    let twin = args.get("twin").and_then(Value::as_str);
    let results = fleet.reset(twin).await.map_err(internal)?;
    let lines: Vec<String> = results
        .iter()
        .map(|(name, reset)| {
            if *reset {
                format!("{name}: reset")
            } else {
                format!("{name}: skipped (not running)")
            }
        })
        .collect();
    Ok(lines.join("\n"))
}

async fn seed(fleet: &Fleet, args: &Value) -> Result<String, ToolError> {
    let twin = required_str(args, "twin")?;
    let file = required_str(args, "file")?;
    fleet
        .seed(twin, std::path::Path::new(file))
        .await
        .map_err(internal)?;
    Ok(format!("{twin}: seeded from {file}"))
}

async fn inspect(fleet: &Fleet, args: &Value) -> Result<String, ToolError> {
    let twin = required_str(args, "twin")?;
    let body = fleet.inspect(twin, "state").await.map_err(internal)?;
    Ok(pretty_body(&body))
}

async fn config(fleet: &Fleet, args: &Value) -> Result<String, ToolError> {
    let twin = required_str(args, "twin")?;
    if let Some(updates) = args.get("updates") {
        let body = fleet
            .admin_post(twin, "config", updates)
            .await
            .map_err(internal)?;
        return Ok(pretty_body(&body));
    }
    let config = fleet
        .manifest
        .twin(twin)
        .map_err(|e| (error_codes::INVALID_PARAMS, e.to_string()))?;
    let value = json!({
        "binary": config.binary,
        "version": config.version,
        "registry": config.registry,
        "port": config.port,
        "admin_port": config.admin_port(),
        "seed": config.seed,
        "env": config.env,
    });
    serde_json::to_string_pretty(&value).map_err(internal)
}

async fn quirks(fleet: &Fleet, args: &Value) -> Result<String, ToolError> {
    let twin = required_str(args, "twin")?;
    match args.get("action").and_then(Value::as_str) {
        None => {
            let body = fleet.inspect(twin, "quirks").await.map_err(internal)?;
            Ok(pretty_body(&body))
        }
        Some(action @ ("enable" | "disable")) => {
            let quirk = required_str(args, "quirk_id")?;
            let body = fleet
                .admin_post(twin, &format!("quirks/{quirk}/{action}"), &json!({}))
                .await
                .map_err(internal)?;
            Ok(pretty_body(&body))
        }
        Some(other) => Err((
            error_codes::INVALID_PARAMS,
            format!("action must be enable or disable, got {other:?}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_every_tool() {
        let catalog = catalog();
        let names: Vec<&str> = catalog["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            [
                "wt_up",
                "wt_down",
                "wt_status",
                "wt_reset",
                "wt_seed",
                "wt_inspect",
                "wt_config",
                "wt_quirks"
            ]
        );
    }

    #[test]
    fn missing_required_arg_is_invalid_params() {
        let err = required_str(&json!({}), "twin").unwrap_err();
        assert_eq!(err.0, error_codes::INVALID_PARAMS);
    }
}
