//! Agent bridge: a JSON-RPC 2.0 server over stdin/stdout.
//!
//! One message per line in, one response per line out. Lines longer
//! than 1 MiB are answered with a parse error; empty lines are skipped.

pub mod jsonrpc;
pub mod tools;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::error::Result;
use crate::fleet::Fleet;
use jsonrpc::{error_codes, Message, Request, Response};

/// Protocol version advertised by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Maximum accepted line length.
const MAX_LINE: usize = 1024 * 1024;

/// Serves the bridge until stdin closes.
///
/// # Errors
///
/// Only I/O failures on stdin/stdout are fatal; per-message problems
/// become JSON-RPC error responses.
pub async fn serve(fleet: &Fleet) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    serve_streams(fleet, stdin, &mut stdout).await
}

async fn serve_streams<R, W>(fleet: &Fleet, mut reader: BufReader<R>, writer: &mut W) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    loop {
        buf.clear();
        // The capped read bounds allocation: an oversize line is
        // rejected after MAX_LINE + 1 bytes, not buffered whole.
        let n = (&mut reader)
            .take(MAX_LINE as u64 + 1)
            .read_until(b'\n', &mut buf)
            .await?;
        if n == 0 {
            return Ok(());
        }
        if buf.len() > MAX_LINE && buf.last() != Some(&b'\n') {
            discard_rest_of_line(&mut reader).await?;
            write_response(
                writer,
                &Response::error(Value::Null, error_codes::PARSE_ERROR, "line exceeds 1 MiB"),
            )
            .await?;
            continue;
        }
        let line = String::from_utf8_lossy(&buf);
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some(response) = handle_line(fleet, line).await else {
            continue;
        };
        write_response(writer, &response).await?;
    }
}

/// Consumes input up to and including the next newline in small
/// chunks, so skipping an oversize line never buffers it.
async fn discard_rest_of_line<R: AsyncRead + Unpin>(
    reader: &mut BufReader<R>,
) -> std::io::Result<()> {
    let mut scratch = Vec::with_capacity(8 * 1024);
    loop {
        scratch.clear();
        let n = (&mut *reader)
            .take(8 * 1024)
            .read_until(b'\n', &mut scratch)
            .await?;
        if n == 0 || scratch.last() == Some(&b'\n') {
            return Ok(());
        }
    }
}

/// Processes one input line; `None` means no response is written
/// (notifications and stray responses).
async fn handle_line(fleet: &Fleet, line: &str) -> Option<Response> {
    let message: Message = match serde_json::from_str(line) {
        Ok(message) => message,
        Err(e) => {
            return Some(Response::error(
                Value::Null,
                error_codes::PARSE_ERROR,
                e.to_string(),
            ))
        }
    };
    match message {
        Message::Request(request) => Some(handle_request(fleet, request).await),
        Message::Notification(notification) => {
            debug!(method = %notification.method, "notification ignored");
            None
        }
        Message::Response(_) => {
            warn!("ignoring unexpected response message on stdin");
            None
        }
    }
}

async fn handle_request(fleet: &Fleet, request: Request) -> Response {
    match request.method.as_str() {
        "initialize" => Response::success(
            request.id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": {
                    "name": "wondertwin",
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }),
        ),
        "tools/list" => Response::success(request.id, tools::catalog()),
        "tools/call" => {
            let params = request.params.unwrap_or(Value::Null);
            let Some(name) = params.get("name").and_then(Value::as_str) else {
                return Response::error(
                    request.id,
                    error_codes::INVALID_PARAMS,
                    "tools/call requires a tool name",
                );
            };
            let args = params
                .get("arguments")
                .cloned()
                .unwrap_or_else(|| json!({}));
            match tools::call(fleet, name, &args).await {
                Ok(result) => Response::success(request.id, result),
                Err((code, message)) => Response::error(request.id, code, message),
            }
        }
        other => Response::error(
            request.id,
            error_codes::METHOD_NOT_FOUND,
            format!("unknown method: {other}"),
        ),
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &Response,
) -> Result<()> {
    // A marshal failure must never kill the loop silently; fall back to
    // a well-formed hard-coded error line.
    let line = serde_json::to_string(response).unwrap_or_else(|_| {
        r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"response marshal failed"},"id":null}"#
            .to_string()
    });
    writer.write_all(line.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    use crate::config::manifest::Settings;
    use crate::config::{Manifest, TwinConfig};

    fn fleet() -> Fleet {
        let mut twins = BTreeMap::new();
        twins.insert(
            "pay".to_string(),
            TwinConfig {
                binary: Some("bin".to_string()),
                port: 4010,
                ..TwinConfig::default()
            },
        );
        Fleet {
            manifest: Manifest {
                twins,
                settings: Settings::default(),
                dir: PathBuf::from("."),
            },
        }
    }

    async fn roundtrip(input: &str) -> Vec<Value> {
        let fleet = fleet();
        let reader = BufReader::new(input.as_bytes());
        let mut out = Vec::new();
        serve_streams(&fleet, reader, &mut out).await.unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn initialize_advertises_protocol() {
        let out =
            roundtrip(r#"{"jsonrpc":"2.0","method":"initialize","id":1}"#.trim()).await;
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(out[0]["id"], 1);
    }

    #[tokio::test]
    async fn tools_list_returns_catalog() {
        let out = roundtrip(r#"{"jsonrpc":"2.0","method":"tools/list","id":2}"#).await;
        assert!(out[0]["result"]["tools"].as_array().unwrap().len() >= 8);
    }

    #[tokio::test]
    async fn unknown_method_with_id_is_method_not_found() {
        let out = roundtrip(r#"{"jsonrpc":"2.0","method":"resources/list","id":3}"#).await;
        assert_eq!(out[0]["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn unknown_notification_is_silently_ignored() {
        let out = roundtrip(r#"{"jsonrpc":"2.0","method":"notifications/whatever"}"#).await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn empty_lines_are_skipped() {
        let out = roundtrip("\n\n").await;
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn oversize_line_is_rejected_and_loop_continues() {
        let mut input = "a".repeat(MAX_LINE + 100);
        input.push('\n');
        input.push_str(r#"{"jsonrpc":"2.0","method":"initialize","id":9}"#);
        input.push('\n');
        let out = roundtrip(&input).await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0]["error"]["code"], -32700);
        assert_eq!(out[0]["id"], Value::Null);
        assert_eq!(out[1]["id"], 9);
    }

    #[tokio::test]
    async fn line_of_exactly_the_limit_is_parsed() {
        // Pad a valid request with trailing spaces out to MAX_LINE.
        let request = r#"{"jsonrpc":"2.0","method":"tools/list","id":6}"#;
        let mut input = request.to_string();
        input.push_str(&" ".repeat(MAX_LINE - request.len()));
        input.push('\n');
        let out = roundtrip(&input).await;
        assert_eq!(out[0]["id"], 6);
        assert!(out[0]["result"]["tools"].is_array());
    }

    #[tokio::test]
    async fn parse_error_gets_null_id() {
        let out = roundtrip("{ not json").await;
        assert_eq!(out[0]["error"]["code"], -32700);
        assert_eq!(out[0]["id"], Value::Null);
    }

    #[tokio::test]
    async fn unknown_tool_is_method_not_found() {
        let out = roundtrip(
            r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"wt_teleport"},"id":4}"#,
        )
        .await;
        assert_eq!(out[0]["error"]["code"], -32601);
    }

    #[tokio::test]
    async fn tool_call_without_name_is_invalid_params() {
        let out =
            roundtrip(r#"{"jsonrpc":"2.0","method":"tools/call","params":{},"id":5}"#).await;
        assert_eq!(out[0]["error"]["code"], -32602);
    }
}
