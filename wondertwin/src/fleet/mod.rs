//! Fleet operations shared by the CLI commands and the agent bridge.
//!
//! Each operation loads its inputs from the manifest and the PID file,
//! talks to twins through the supervisor and the admin client, and
//! returns plain data for the caller to render.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use crate::admin_client::AdminClient;
use crate::config::{Manifest, TwinConfig};
use crate::error::{Result, WonderTwinError};
use crate::supervisor::{self, PidRecord};

/// How long `up` waits before health-probing freshly started twins.
const STARTUP_SETTLE: Duration = Duration::from_millis(1500);

/// What `up` did for one twin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpAction {
    /// Freshly spawned.
    Started(u32),
    /// A live PID was already recorded.
    AlreadyRunning(u32),
    /// Spawn failed.
    Failed(String),
}

/// Per-twin result of `up`.
#[derive(Debug, Clone)]
pub struct UpResult {
    /// Twin name.
    pub name: String,
    /// Service port.
    pub port: u16,
    /// What happened.
    pub action: UpAction,
    /// Post-settle health probe; `None` when spawn failed.
    pub healthy: Option<bool>,
}

/// Per-twin row of `status`.
#[derive(Debug, Clone)]
pub struct StatusRow {
    /// Twin name.
    pub name: String,
    /// Recorded PID, when the twin has a live entry.
    pub pid: Option<u32>,
    /// Service port.
    pub port: u16,
    /// `healthy`, `unhealthy`, or `stopped`.
    pub health: &'static str,
    /// Base URL.
    pub url: String,
}

/// A fleet bound to one manifest.
#[derive(Debug)]
pub struct Fleet {
    /// Loaded manifest.
    pub manifest: Manifest,
}

impl Fleet {
    /// Loads the fleet from the resolved manifest path.
    ///
    /// # Errors
    ///
    /// Manifest resolution or parse failure.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = Manifest::resolve_manifest_path(explicit);
        let manifest = Manifest::load(&path)?;
        Ok(Self { manifest })
    }

    fn twin(&self, name: &str) -> Result<&TwinConfig> {
        Ok(self.manifest.twin(name)?)
    }

    fn admin(&self, twin: &TwinConfig) -> AdminClient {
        AdminClient::new(twin.admin_port())
    }

    /// Starts every manifest twin that is not already running, persists
    /// PIDs, then health-probes the fleet.
    ///
    /// Spawn failures are recorded per twin rather than aborting; the
    /// caller decides the exit code from [`UpAction::Failed`] entries.
    ///
    /// # Errors
    ///
    /// Only PID-file failures abort the whole operation.
    pub async fn up(&self) -> Result<Vec<UpResult>> {
        let pid_path = self.manifest.pid_file();
        let mut pids = supervisor::load_pids(&pid_path)?;
        let log_dir = self.manifest.log_dir()?;
        let verbose = self.manifest.settings.verbose;

        let mut results = Vec::new();
        for (name, twin) in &self.manifest.twins {
            if let Some(record) = pids.get(name) {
                if supervisor::is_running(record.pid) {
                    results.push(UpResult {
                        name: name.clone(),
                        port: twin.port,
                        action: UpAction::AlreadyRunning(record.pid),
                        healthy: None,
                    });
                    continue;
                }
            }

            let action = match self.start_twin(name, twin, &log_dir, verbose).await {
                Ok(pid) => {
                    pids.insert(
                        name.clone(),
                        PidRecord {
                            pid,
                            port: twin.port,
                            binary: self.manifest.resolved_binary(name, twin)?,
                        },
                    );
                    UpAction::Started(pid)
                }
                Err(e) => {
                    warn!(twin = %name, error = %e, "start failed");
                    UpAction::Failed(e.to_string())
                }
            };
            results.push(UpResult {
                name: name.clone(),
                port: twin.port,
                action,
                healthy: None,
            });
        }

        supervisor::save_pids(&pid_path, &pids)?;

        tokio::time::sleep(STARTUP_SETTLE).await;
        for result in &mut results {
            if matches!(result.action, UpAction::Failed(_)) {
                continue;
            }
            let twin = self.twin(&result.name)?;
            result.healthy = Some(self.admin(twin).health().await);
        }

        Ok(results)
    }

    async fn start_twin(
        &self,
        name: &str,
        twin: &TwinConfig,
        log_dir: &Path,
        verbose: bool,
    ) -> Result<u32> {
        let binary = self.manifest.resolved_binary(name, twin)?;
        let seed = self.manifest.resolved_seed(twin)?;
        let pid =
            supervisor::start(name, twin, &binary, seed.as_deref(), log_dir, verbose).await?;
        Ok(pid)
    }

    /// Stops every live entry and removes the PID file. Returns the
    /// names that were stopped.
    ///
    /// # Errors
    ///
    /// PID-file read failure.
    pub async fn down(&self) -> Result<Vec<String>> {
        let pid_path = self.manifest.pid_file();
        let pids = supervisor::load_pids(&pid_path)?;
        let mut stopped = Vec::new();
        for (name, record) in &pids {
            if supervisor::is_running(record.pid) {
                supervisor::stop(name, record).await;
                stopped.push(name.clone());
            }
        }
        if pid_path.exists() {
            std::fs::remove_file(&pid_path)
                .map_err(|e| WonderTwinError::Failed(format!("cannot remove pid file: {e}")))?;
        }
        info!(count = stopped.len(), "fleet stopped");
        Ok(stopped)
    }

    /// Tabulates every manifest twin.
    ///
    /// # Errors
    ///
    /// PID-file read failure.
    pub async fn status(&self) -> Result<Vec<StatusRow>> {
        let pids = supervisor::load_pids(&self.manifest.pid_file())?;
        let mut rows = Vec::new();
        for (name, twin) in &self.manifest.twins {
            let live = pids
                .get(name)
                .filter(|record| supervisor::is_running(record.pid));
            let health = match live {
                None => "stopped",
                Some(_) => {
                    if self.admin(twin).health().await {
                        "healthy"
                    } else {
                        "unhealthy"
                    }
                }
            };
            rows.push(StatusRow {
                name: name.clone(),
                pid: live.map(|record| record.pid),
                port: twin.port,
                health,
                url: format!("http://127.0.0.1:{}", twin.port),
            });
        }
        Ok(rows)
    }

    /// Resets one twin, or every running twin when `twin` is `None`.
    /// Returns `(name, was_reset)` pairs; a stopped twin is skipped.
    ///
    /// # Errors
    ///
    /// Unknown twin name, PID-file failure, or a failed reset call.
    pub async fn reset(&self, twin: Option<&str>) -> Result<Vec<(String, bool)>> {
        let pids = supervisor::load_pids(&self.manifest.pid_file())?;
        let targets: Vec<&str> = match twin {
            Some(name) => {
                self.twin(name)?;
                vec![name]
            }
            None => self.manifest.twins.keys().map(String::as_str).collect(),
        };

        let mut results = Vec::new();
        for name in targets {
            let config = self.twin(name)?;
            let running = pids
                .get(name)
                .is_some_and(|record| supervisor::is_running(record.pid));
            if running {
                self.admin(config).reset().await?;
                results.push((name.to_string(), true));
            } else {
                results.push((name.to_string(), false));
            }
        }
        Ok(results)
    }

    /// POSTs a seed file's bytes to a twin's `/admin/state`.
    ///
    /// # Errors
    ///
    /// Unknown twin, unreadable file, or a failed admin call.
    pub async fn seed(&self, twin: &str, file: &Path) -> Result<()> {
        let config = self.twin(twin)?;
        let bytes = std::fs::read(file)?;
        self.admin(config).seed(bytes).await
    }

    /// Fetches an admin resource (`state`, `requests`, `faults`, `time`)
    /// as raw body text.
    ///
    /// # Errors
    ///
    /// Unknown twin or a failed admin call.
    pub async fn inspect(&self, twin: &str, resource: &str) -> Result<String> {
        let config = self.twin(twin)?;
        self.admin(config).get(resource).await
    }

    /// POSTs a JSON body to an arbitrary admin resource on a twin.
    ///
    /// # Errors
    ///
    /// Unknown twin or a failed admin call.
    pub async fn admin_post(
        &self,
        twin: &str,
        resource: &str,
        body: &serde_json::Value,
    ) -> Result<String> {
        let config = self.twin(twin)?;
        self.admin(config).post(resource, body).await
    }

    /// Live PID records keyed by twin name.
    ///
    /// # Errors
    ///
    /// PID-file read failure.
    pub fn running(&self) -> Result<BTreeMap<String, PidRecord>> {
        let mut pids = supervisor::load_pids(&self.manifest.pid_file())?;
        pids.retain(|_, record| supervisor::is_running(record.pid));
        Ok(pids)
    }
}

/// Pretty-prints a body when it parses as JSON, otherwise returns it
/// unchanged.
#[must_use]
pub fn pretty_body(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => serde_json::to_string_pretty(&value).unwrap_or_else(|_| body.to_string()),
        Err(_) => body.to_string(),
    }
}
