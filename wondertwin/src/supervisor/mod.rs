//! Process supervisor: spawns twins into their own process groups,
//! tracks their PIDs in `.wt/pids.json`, and stops them with a
//! SIGTERM-then-SIGKILL ladder.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::TwinConfig;
use crate::error::SupervisorError;

const STOP_GRACE: Duration = Duration::from_secs(5);
const STOP_POLL: Duration = Duration::from_millis(100);

/// One running twin, as persisted in the PID file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PidRecord {
    /// Child process id.
    pub pid: u32,
    /// Service port.
    pub port: u16,
    /// Binary that was started.
    pub binary: PathBuf,
}

/// Reads the PID file. Absence means an empty fleet.
///
/// # Errors
///
/// Returns [`SupervisorError::PidFile`] when a present file cannot be
/// read or decoded.
pub fn load_pids(path: &Path) -> Result<BTreeMap<String, PidRecord>, SupervisorError> {
    match std::fs::read_to_string(path) {
        Ok(raw) => serde_json::from_str(&raw).map_err(|e| SupervisorError::PidFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(e) => Err(SupervisorError::PidFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}

/// Writes the PID file atomically (temp file then rename).
///
/// # Errors
///
/// Returns [`SupervisorError::PidFile`] on any filesystem failure.
pub fn save_pids(
    path: &Path,
    pids: &BTreeMap<String, PidRecord>,
) -> Result<(), SupervisorError> {
    let write = || -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(pids)
            .map_err(|e| std::io::Error::other(e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    };
    write().map_err(|e| SupervisorError::PidFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Starts a twin and returns its PID.
///
/// The child gets `--port <port>` plus `--verbose` and
/// `--seed-file <path>` when configured, the twin's env merged over the
/// current one, and stdout/stderr redirected to `<log_dir>/<name>.log`
/// (truncated). On Unix the child is placed in its own process group so
/// `stop` can signal the whole tree.
///
/// # Errors
///
/// Fails when the binary is missing or is a directory, when the log
/// file cannot be opened, or when the spawn itself fails.
pub async fn start(
    name: &str,
    twin: &TwinConfig,
    binary: &Path,
    seed: Option<&Path>,
    log_dir: &Path,
    verbose: bool,
) -> Result<u32, SupervisorError> {
    if !binary.is_file() {
        return Err(SupervisorError::BinaryNotFound {
            twin: name.to_string(),
            path: binary.to_path_buf(),
        });
    }

    std::fs::create_dir_all(log_dir).map_err(|e| spawn_err(name, &e.to_string()))?;
    let log_path = log_dir.join(format!("{name}.log"));
    let log_file = std::fs::File::create(&log_path)
        .map_err(|e| spawn_err(name, &format!("cannot open {}: {e}", log_path.display())))?;
    let log_err = log_file
        .try_clone()
        .map_err(|e| spawn_err(name, &e.to_string()))?;

    let mut cmd = Command::new(binary);
    cmd.arg("--port").arg(twin.port.to_string());
    if verbose {
        cmd.arg("--verbose");
    }
    if let Some(seed) = seed {
        cmd.arg("--seed-file").arg(seed);
    }
    for (key, value) in &twin.env {
        cmd.env(key, value);
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::from(log_file))
        .stderr(Stdio::from(log_err));
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|e| spawn_err(name, &e.to_string()))?;
    let pid = child
        .id()
        .ok_or_else(|| spawn_err(name, "child exited before pid was read"))?;
    info!(twin = name, pid, port = twin.port, "started");

    // Reap the child so it never lingers as a zombie of this process.
    let waiter_name = name.to_string();
    tokio::spawn(async move {
        match child.wait().await {
            Ok(status) => debug!(twin = %waiter_name, %status, "twin exited"),
            Err(e) => warn!(twin = %waiter_name, error = %e, "wait failed"),
        }
    });

    Ok(pid)
}

fn spawn_err(name: &str, message: &str) -> SupervisorError {
    SupervisorError::SpawnFailed {
        twin: name.to_string(),
        message: message.to_string(),
    }
}

/// Returns whether `pid` is alive (signal 0 probe).
#[must_use]
pub fn is_running(pid: u32) -> bool {
    #[cfg(unix)]
    {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;
        #[allow(clippy::cast_possible_wrap)]
        kill(Pid::from_raw(pid as i32), None).is_ok()
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

/// Stops a twin's process group: SIGTERM, up to 5 s of polling, then
/// SIGKILL. A dead PID is a no-op.
pub async fn stop(name: &str, record: &PidRecord) {
    if !is_running(record.pid) {
        debug!(twin = name, pid = record.pid, "already stopped");
        return;
    }
    #[cfg(unix)]
    {
        use nix::sys::signal::{killpg, Signal};
        use nix::unistd::Pid;

        #[allow(clippy::cast_possible_wrap)]
        let pgid = Pid::from_raw(record.pid as i32);
        let _ = killpg(pgid, Signal::SIGTERM);

        let deadline = tokio::time::Instant::now() + STOP_GRACE;
        while tokio::time::Instant::now() < deadline {
            if !is_running(record.pid) {
                info!(twin = name, pid = record.pid, "stopped");
                return;
            }
            tokio::time::sleep(STOP_POLL).await;
        }
        warn!(twin = name, pid = record.pid, "did not exit in time, killing");
        let _ = killpg(pgid, Signal::SIGKILL);
    }
}
