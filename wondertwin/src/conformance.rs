//! Conformance harness: proves a candidate twin binary speaks the
//! admin control plane.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde_json::json;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Result, SupervisorError};

const HEALTH_POLL: Duration = Duration::from_millis(200);
const HEALTH_DEADLINE: Duration = Duration::from_secs(5);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// One check's verdict.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Check name.
    pub name: &'static str,
    /// Verdict.
    pub passed: bool,
    /// Human detail.
    pub detail: String,
}

/// Full conformance report.
#[derive(Debug, Clone, Default)]
pub struct Report {
    /// Ordered check results.
    pub checks: Vec<CheckResult>,
}

impl Report {
    fn record(&mut self, name: &'static str, result: std::result::Result<String, String>) -> bool {
        let (passed, detail) = match result {
            Ok(detail) => (true, detail),
            Err(detail) => (false, detail),
        };
        debug!(check = name, passed, %detail);
        self.checks.push(CheckResult {
            name,
            passed,
            detail,
        });
        passed
    }

    /// True when every check passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.passed)
    }

    /// `(passed, failed)` counts.
    #[must_use]
    pub fn counts(&self) -> (usize, usize) {
        let passed = self.checks.iter().filter(|c| c.passed).count();
        (passed, self.checks.len() - passed)
    }
}

/// Launches `binary --port <port>` and runs the check suite against it.
///
/// The candidate runs in its own process group and is always torn down
/// by the final clean-shutdown check (SIGTERM, 5 s grace, SIGKILL on
/// timeout, which fails the check). When the initial health probe fails
/// every other check is abandoned except that shutdown.
///
/// # Errors
///
/// Fails only when the candidate cannot be spawned at all.
pub async fn run(binary: &Path, port: u16) -> Result<Report> {
    if !binary.is_file() {
        return Err(SupervisorError::BinaryNotFound {
            twin: "candidate".to_string(),
            path: binary.to_path_buf(),
        }
        .into());
    }

    let mut cmd = Command::new(binary);
    cmd.arg("--port")
        .arg(port.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    #[cfg(unix)]
    cmd.process_group(0);
    let mut child = cmd.spawn().map_err(|e| SupervisorError::SpawnFailed {
        twin: "candidate".to_string(),
        message: e.to_string(),
    })?;
    let pid = child.id().unwrap_or_default();
    info!(binary = %binary.display(), pid, port, "candidate started");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap_or_default();
    let base = format!("http://127.0.0.1:{port}/admin");

    let mut report = Report::default();
    let healthy = report.record("health probe", health_probe(&client, &base).await);

    if healthy {
        report.record(
            "reset",
            expect_ok(post(&client, &format!("{base}/reset"), None).await),
        );
        report.record(
            "state load",
            expect_ok(post(&client, &format!("{base}/state"), Some(json!({"test": true}))).await),
        );
        report.record("state snapshot", state_parses(&client, &base).await);
        report.record("reset round trip", reset_round_trip(&client, &base).await);
        report.record(
            "fault injection",
            expect_ok(
                post(
                    &client,
                    &format!("{base}/fault/test-endpoint"),
                    Some(json!({"status": 500, "message": "test fault"})),
                )
                .await,
            ),
        );
        report.record(
            "time advance",
            expect_ok(
                post(
                    &client,
                    &format!("{base}/time/advance"),
                    Some(json!({"seconds": 3600})),
                )
                .await,
            ),
        );
    }

    report.record("clean shutdown", shutdown(&mut child, pid).await);
    Ok(report)
}

async fn health_probe(
    client: &reqwest::Client,
    base: &str,
) -> std::result::Result<String, String> {
    let deadline = tokio::time::Instant::now() + HEALTH_DEADLINE;
    while tokio::time::Instant::now() < deadline {
        if let Ok(response) = client.get(format!("{base}/health")).send().await {
            if response.status().is_success() {
                return Ok("200 within deadline".to_string());
            }
        }
        tokio::time::sleep(HEALTH_POLL).await;
    }
    Err("no 200 from /admin/health within 5s".to_string())
}

async fn post(
    client: &reqwest::Client,
    url: &str,
    body: Option<serde_json::Value>,
) -> std::result::Result<u16, String> {
    let mut request = client.post(url);
    if let Some(body) = body {
        request = request.json(&body);
    }
    request
        .send()
        .await
        .map(|r| r.status().as_u16())
        .map_err(|e| e.to_string())
}

fn expect_ok(result: std::result::Result<u16, String>) -> std::result::Result<String, String> {
    match result {
        Ok(200) => Ok("200".to_string()),
        Ok(status) => Err(format!("expected 200, got {status}")),
        Err(e) => Err(e),
    }
}

async fn state_parses(
    client: &reqwest::Client,
    base: &str,
) -> std::result::Result<String, String> {
    let response = client
        .get(format!("{base}/state"))
        .send()
        .await
        .map_err(|e| e.to_string())?;
    let status = response.status().as_u16();
    if status != 200 {
        return Err(format!("expected 200, got {status}"));
    }
    let text = response.text().await.map_err(|e| e.to_string())?;
    serde_json::from_str::<serde_json::Value>(&text)
        .map(|_| "body parses as JSON".to_string())
        .map_err(|e| format!("body is not JSON: {e}"))
}

async fn reset_round_trip(
    client: &reqwest::Client,
    base: &str,
) -> std::result::Result<String, String> {
    let reset = expect_ok(post(client, &format!("{base}/reset"), None).await)?;
    let status = client
        .get(format!("{base}/state"))
        .send()
        .await
        .map_err(|e| e.to_string())?
        .status()
        .as_u16();
    if status == 200 {
        Ok(format!("reset {reset}, state 200"))
    } else {
        Err(format!("state after reset returned {status}"))
    }
}

async fn shutdown(
    child: &mut tokio::process::Child,
    pid: u32,
) -> std::result::Result<String, String> {
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        #[allow(clippy::cast_possible_wrap)]
        let pgid = Pid::from_raw(pid as i32);
        let _ = killpg(pgid, Signal::SIGTERM);

        match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
            Ok(Ok(status)) => Ok(format!("exited with {status} after SIGTERM")),
            Ok(Err(e)) => Err(format!("wait failed: {e}")),
            Err(_) => {
                let _ = killpg(pgid, Signal::SIGKILL);
                let _ = child.wait().await;
                Err("did not exit within 5s of SIGTERM".to_string())
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.kill().await;
        Err("clean shutdown unsupported on this platform".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_counts() {
        let mut report = Report::default();
        report.record("a", Ok(String::new()));
        report.record("b", Err("nope".to_string()));
        assert!(!report.passed());
        assert_eq!(report.counts(), (1, 1));
    }

    #[test]
    fn expect_ok_maps_statuses() {
        assert!(expect_ok(Ok(200)).is_ok());
        assert!(expect_ok(Ok(500)).is_err());
        assert!(expect_ok(Err("boom".to_string())).is_err());
    }

    #[tokio::test]
    async fn missing_binary_is_rejected() {
        let err = run(Path::new("/definitely/not/here"), 4999)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("binary not found"));
    }
}
