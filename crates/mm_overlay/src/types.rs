//! Shared overlay-network data types: the user-facing room document and
//! the daemon-facing structured config it's translated into, as plain
//! `serde` structs the way `mm_mods::types` keeps the in-memory model
//! separate from its writer.

use serde::{Deserialize, Serialize};

/// The optimizer toggles nested inside a room.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkOptimization {
    #[serde(default)]
    pub lan_broadcast_helper: bool,
    #[serde(default)]
    pub nic_metric_auto: bool,
}

impl Default for NetworkOptimization {
    fn default() -> Self {
        Self {
            lan_broadcast_helper: true,
            nic_metric_auto: true,
        }
    }
}

/// Creator/joiner provenance and timestamps recorded alongside a room.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RoomMeta {
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub joiner: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// A persisted overlay-network configuration: everything needed to
/// regenerate the daemon's own config file plus the app's own toggles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    pub network_name: String,
    pub network_secret: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub dhcp: bool,
    #[serde(default)]
    pub ipv4: Option<String>,
    #[serde(default)]
    pub peers: Vec<String>,

    #[serde(default = "default_true")]
    pub enable_encryption: bool,
    #[serde(default = "default_true")]
    pub enable_ipv6: bool,
    #[serde(default = "default_true")]
    pub latency_first: bool,
    #[serde(default = "default_true")]
    pub multi_thread: bool,
    #[serde(default = "default_true")]
    pub enable_kcp_proxy: bool,
    #[serde(default = "default_true")]
    pub enable_quic_proxy: bool,
    #[serde(default)]
    pub use_smoltcp: bool,
    #[serde(default)]
    pub compression: bool,
    #[serde(default)]
    pub tcp_listen: bool,

    #[serde(default)]
    pub network_optimization: NetworkOptimization,

    #[serde(default, rename = "_room_meta")]
    pub meta: RoomMeta,
}

fn default_true() -> bool {
    true
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            network_name: String::new(),
            network_secret: String::new(),
            hostname: String::new(),
            dhcp: true,
            ipv4: None,
            peers: Vec::new(),
            enable_encryption: true,
            enable_ipv6: true,
            latency_first: true,
            multi_thread: true,
            enable_kcp_proxy: true,
            enable_quic_proxy: true,
            use_smoltcp: false,
            compression: false,
            tcp_listen: false,
            network_optimization: NetworkOptimization::default(),
            meta: RoomMeta::default(),
        }
    }
}

/// A projected peer entry, as emitted by the status poller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeerInfo {
    pub ip: String,
    pub hostname: String,
    pub latency_ms: f64,
    pub cost: String,
    pub loss_rate: f64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub tunnel_proto: String,
    pub nat_type: String,
    pub version: String,
    pub id: String,
}

/// Supervisor state machine positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    Stopped,
    Starting,
    Running,
}

/// Events the supervisor broadcasts on state and status change.
#[derive(Debug, Clone)]
pub enum OverlayEvent {
    NetworkStatusChanged(bool),
    PeerListUpdated(Vec<PeerInfo>),
    ConnectionInfoUpdated(ConnectionInfo),
    Failed(String),
}

/// Local node info as reported by the daemon CLI's `node info`.
#[derive(Debug, Clone, Default)]
pub struct ConnectionInfo {
    pub ipv4: Option<String>,
    pub hostname: String,
}
