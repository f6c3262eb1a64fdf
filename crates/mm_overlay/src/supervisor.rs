//! Overlay Supervisor (component I).
//!
//! Owns the overlay daemon's lifecycle: prerequisite checks, elevated
//! spawn, periodic status polling, and a clean stop. Status polling runs
//! as a `tokio::task` the supervisor owns outright, and every state
//! transition funnels through one `Mutex`-guarded machine instead of
//! relying on ad hoc flags scattered across the call sites.

use std::{sync::Arc, time::Duration};

use mm_core::{IntoIoError, err, paths, pt, process::ForeignProcess};
use tokio::sync::{Mutex, broadcast};

use crate::{
    config, rooms,
    error::SupervisorError,
    types::{ConnectionInfo, OverlayEvent, OverlayState, PeerInfo, RoomConfig},
};

const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(5);
const CLI_TIMEOUT: Duration = Duration::from_secs(5);
const STOP_GRACE: Duration = Duration::from_secs(1);
const STARTUP_WARMUP: Duration = Duration::from_millis(500);

struct Inner {
    state: OverlayState,
    poll_task: Option<tokio::task::JoinHandle<()>>,
}

/// The overlay daemon's supervisor: one per process, shared via `Arc`
/// by whatever owns the CLI/app loop.
pub struct OverlaySupervisor {
    inner: Mutex<Inner>,
    events: broadcast::Sender<OverlayEvent>,
    daemon: ForeignProcess,
}

impl Default for OverlaySupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlaySupervisor {
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(32);
        Self {
            inner: Mutex::new(Inner {
                state: OverlayState::Stopped,
                poll_task: None,
            }),
            events,
            daemon: ForeignProcess::by_name(paths::OVERLAY_DAEMON_EXE_NAME),
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<OverlayEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> OverlayState {
        self.inner.lock().await.state
    }

    /// Starts the daemon for `room`. Rejected if already `running` or
    /// `starting`.
    ///
    /// # Errors
    /// If a prerequisite is missing, the config is invalid, or
    /// elevation fails.
    pub async fn start(self: &Arc<Self>, room: &RoomConfig) -> Result<(), SupervisorError> {
        {
            let mut guard = self.inner.lock().await;
            match guard.state {
                OverlayState::Running => return Err(SupervisorError::AlreadyInState("running")),
                OverlayState::Starting => return Err(SupervisorError::AlreadyInState("starting")),
                OverlayState::Stopped => guard.state = OverlayState::Starting,
            }
        }

        if let Err(e) = self.start_inner(room).await {
            self.inner.lock().await.state = OverlayState::Stopped;
            return Err(e);
        }

        Ok(())
    }

    async fn start_inner(self: &Arc<Self>, room: &RoomConfig) -> Result<(), SupervisorError> {
        let daemon_exe = paths::overlay_daemon_exe_path();
        if !daemon_exe.exists() {
            return Err(SupervisorError::DaemonMissing(daemon_exe));
        }
        let cli_exe = paths::overlay_cli_exe_path();
        if !cli_exe.exists() {
            return Err(SupervisorError::CliMissing(cli_exe));
        }
        let driver = paths::overlay_driver_path();
        if !driver.exists() {
            return Err(SupervisorError::DriverMissing(driver));
        }

        let generated = config::generate(room)?;
        let config_path = paths::overlay_daemon_config_path();
        if let Some(parent) = config_path.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        tokio::fs::write(&config_path, &generated.toml)
            .await
            .path(&config_path)
            .map_err(SupervisorError::Io)?;

        let log_dir = paths::overlay_log_dir();
        tokio::fs::create_dir_all(&log_dir).await.ok();
        let args = config::daemon_args(&config_path, &log_dir);

        mm_core::process::spawn_elevated(&daemon_exe, &args, None, Duration::from_secs(15)).await?;

        tokio::time::sleep(STARTUP_WARMUP).await;
        if !self.daemon.is_running() {
            return Err(SupervisorError::PollTimeout);
        }

        self.inner.lock().await.state = OverlayState::Running;
        let _ = self.events.send(OverlayEvent::NetworkStatusChanged(true));
        rooms::mark_active_room(&paths::overlay_user_config_path(), &room.network_name).await;

        self.spawn_poll_task(cli_exe).await;
        Ok(())
    }

    async fn spawn_poll_task(self: &Arc<Self>, cli_exe: std::path::PathBuf) {
        let this = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(STATUS_POLL_INTERVAL);
            loop {
                interval.tick().await;
                if !this.daemon.is_running() {
                    let mut guard = this.inner.lock().await;
                    if guard.state == OverlayState::Running {
                        guard.state = OverlayState::Stopped;
                        let _ = this.events.send(OverlayEvent::Failed("overlay daemon process exited".to_string()));
                        let _ = this.events.send(OverlayEvent::NetworkStatusChanged(false));
                        rooms::clear_active_room(&paths::overlay_user_config_path()).await;
                    }
                    return;
                }

                if let Some(info) = poll_connection_info(&cli_exe).await {
                    let _ = this.events.send(OverlayEvent::ConnectionInfoUpdated(info));
                }
                if let Some(peers) = poll_peer_list(&cli_exe).await {
                    let _ = this.events.send(OverlayEvent::PeerListUpdated(peers));
                }
            }
        });
        self.inner.lock().await.poll_task = Some(handle);
    }

    /// Stops the daemon: terminate with a 1s grace, then kill. Aborts
    /// the poll task, then asynchronously sweeps any remaining processes
    /// by name.
    pub async fn stop(&self) {
        {
            let mut guard = self.inner.lock().await;
            if let Some(task) = guard.poll_task.take() {
                task.abort();
            }
            guard.state = OverlayState::Stopped;
        }
        self.daemon.terminate_then_kill(STOP_GRACE).await;
        let _ = self.events.send(OverlayEvent::NetworkStatusChanged(false));
        rooms::clear_active_room(&paths::overlay_user_config_path()).await;

        let daemon = ForeignProcess::by_name(paths::OVERLAY_DAEMON_EXE_NAME);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            if daemon.is_running() {
                pt!("residual overlay daemon process found on delayed sweep, killing");
                daemon.kill();
            }
        });
    }
}

async fn poll_connection_info(cli_exe: &std::path::Path) -> Option<ConnectionInfo> {
    let output = tokio::time::timeout(
        CLI_TIMEOUT,
        tokio::process::Command::new(cli_exe).args(["-o", "json", "node", "info"]).output(),
    )
    .await
    .ok()?
    .ok()?;
    if !output.status.success() {
        return None;
    }
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).ok()?;
    Some(ConnectionInfo {
        ipv4: value.get("ipv4").and_then(|v| v.as_str()).map(str::to_string),
        hostname: value.get("hostname").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
    })
}

async fn poll_peer_list(cli_exe: &std::path::Path) -> Option<Vec<PeerInfo>> {
    let output = tokio::time::timeout(
        CLI_TIMEOUT,
        tokio::process::Command::new(cli_exe).args(["-o", "json", "peer", "list"]).output(),
    )
    .await
    .ok()?
    .ok()?;
    if !output.status.success() {
        err!("peer list query failed");
        return None;
    }
    let raw: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).ok()?;
    Some(project_peers(&raw))
}

/// Projects raw daemon peer entries, filtering the local node and
/// public-server relays.
fn project_peers(raw: &[serde_json::Value]) -> Vec<PeerInfo> {
    raw.iter()
        .filter(|p| p.get("cost").and_then(|v| v.as_str()) != Some("Local"))
        .filter(|p| !p.get("hostname").and_then(|v| v.as_str()).unwrap_or_default().starts_with("PublicServer"))
        .filter(|p| !p.get("ipv4").and_then(|v| v.as_str()).unwrap_or_default().is_empty())
        .map(|p| PeerInfo {
            ip: p.get("ipv4").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            hostname: p.get("hostname").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            latency_ms: p.get("lat_ms").and_then(serde_json::Value::as_f64).unwrap_or_default(),
            cost: p.get("cost").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            loss_rate: p.get("loss_rate").and_then(serde_json::Value::as_f64).unwrap_or_default(),
            rx_bytes: p.get("rx_bytes").and_then(serde_json::Value::as_u64).unwrap_or_default(),
            tx_bytes: p.get("tx_bytes").and_then(serde_json::Value::as_u64).unwrap_or_default(),
            tunnel_proto: p.get("tunnel_proto").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            nat_type: p.get("nat_type").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            version: p.get("version").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            id: p.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_peers_drops_local_and_public_server_entries() {
        let raw = serde_json::json!([
            { "ipv4": "10.0.0.1", "hostname": "me", "cost": "Local" },
            { "ipv4": "10.0.0.2", "hostname": "PublicServer-1", "cost": "p2p" },
            { "ipv4": "10.0.0.3", "hostname": "friend", "cost": "p2p", "lat_ms": 12.5 },
            { "ipv4": "", "hostname": "no-ip", "cost": "p2p" },
        ]);
        let peers = project_peers(raw.as_array().unwrap());
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].hostname, "friend");
        assert_eq!(peers[0].latency_ms, 12.5);
    }
}
