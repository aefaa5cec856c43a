//! Fleet lifecycle commands: up, down, status, reset, seed, logs,
//! inspect.

use std::path::Path;

use crate::cli::args::InspectArgs;
use crate::error::{Result, WonderTwinError};
use crate::fleet::{pretty_body, Fleet, UpAction};

/// `wt up`.
///
/// # Errors
///
/// Exits non-zero only when at least one twin failed to spawn; a twin
/// that started but is not yet answering health probes is reported but
/// not fatal.
pub async fn up(config: Option<&Path>) -> Result<()> {
    let fleet = Fleet::load(config)?;
    let results = fleet.up().await?;

    let mut spawn_failures = 0usize;
    for result in &results {
        match &result.action {
            UpAction::Started(pid) => {
                let health = match result.healthy {
                    Some(true) => "healthy",
                    Some(false) => "not responding",
                    None => "unknown",
                };
                println!(
                    "{}  started  pid={pid}  port={}  {health}",
                    result.name, result.port
                );
            }
            UpAction::AlreadyRunning(pid) => {
                println!("{}  already running  pid={pid}", result.name);
            }
            UpAction::Failed(message) => {
                spawn_failures += 1;
                println!("{}  FAILED  {message}", result.name);
            }
        }
    }

    if spawn_failures > 0 {
        return Err(WonderTwinError::Failed(format!(
            "{spawn_failures} twin(s) failed to start"
        )));
    }
    Ok(())
}

/// `wt down`.
///
/// # Errors
///
/// PID-file failures.
pub async fn down(config: Option<&Path>) -> Result<()> {
    let fleet = Fleet::load(config)?;
    let stopped = fleet.down().await?;
    if stopped.is_empty() {
        println!("no twins were running");
    } else {
        for name in stopped {
            println!("{name}  stopped");
        }
    }
    Ok(())
}

/// `wt status`.
///
/// # Errors
///
/// PID-file failures.
pub async fn status(config: Option<&Path>) -> Result<()> {
    let fleet = Fleet::load(config)?;
    let rows = fleet.status().await?;
    println!("{:<16} {:>8} {:>6}  {:<10} URL", "TWIN", "PID", "PORT", "HEALTH");
    for row in rows {
        let pid = row.pid.map_or_else(|| "-".to_string(), |pid| pid.to_string());
        println!(
            "{:<16} {:>8} {:>6}  {:<10} {}",
            row.name, pid, row.port, row.health, row.url
        );
    }
    Ok(())
}

/// `wt reset [twin]`.
///
/// # Errors
///
/// Unknown twin or a failed admin call.
pub async fn reset(config: Option<&Path>, twin: Option<&str>) -> Result<()> {
    let fleet = Fleet::load(config)?;
    for (name, was_reset) in fleet.reset(twin).await? {
        if was_reset {
            println!("{name}  reset");
        } else {
            println!("{name}  skipped (not running)");
        }
    }
    Ok(())
}

/// `wt seed <twin> <file>`.
///
/// # Errors
///
/// Unknown twin, unreadable file, or a failed admin call.
pub async fn seed(config: Option<&Path>, twin: &str, file: &Path) -> Result<()> {
    let fleet = Fleet::load(config)?;
    fleet.seed(twin, file).await?;
    println!("{twin}  seeded from {}", file.display());
    Ok(())
}

/// `wt inspect <twin> [resource]`.
///
/// # Errors
///
/// Unknown twin or a failed admin call.
pub async fn inspect(config: Option<&Path>, args: &InspectArgs) -> Result<()> {
    let fleet = Fleet::load(config)?;
    let body = fleet.inspect(&args.twin, args.resource.as_str()).await?;
    println!("{}", pretty_body(&body));
    Ok(())
}

/// `wt logs <twin>`: tail-follows the twin's log file until Ctrl-C,
/// which is forwarded to the tail child so it exits cleanly.
///
/// # Errors
///
/// Unknown twin or a missing log file.
pub async fn logs(config: Option<&Path>, twin: &str) -> Result<()> {
    let fleet = Fleet::load(config)?;
    fleet.manifest.twin(twin)?;
    let log_path = fleet.manifest.log_dir()?.join(format!("{twin}.log"));
    if !log_path.is_file() {
        return Err(WonderTwinError::Failed(format!(
            "no log file at {} (has the twin been started?)",
            log_path.display()
        )));
    }

    let mut child = tokio::process::Command::new("tail")
        .arg("-f")
        .arg(&log_path)
        .spawn()?;

    tokio::select! {
        status = child.wait() => {
            status?;
        }
        _ = tokio::signal::ctrl_c() => {
            #[cfg(unix)]
            if let Some(pid) = child.id() {
                use nix::sys::signal::{kill, Signal};
                use nix::unistd::Pid;
                #[allow(clippy::cast_possible_wrap)]
                let _ = kill(Pid::from_raw(pid as i32), Signal::SIGINT);
            }
            let _ = child.wait().await;
        }
    }
    Ok(())
}
