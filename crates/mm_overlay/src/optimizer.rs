//! Network Optimizer (component J).
//!
//! Two independent, toggleable optimizations: a bundled LAN-broadcast
//! helper process, and an IPv4 interface-metric adjuster.

use std::{collections::HashMap, path::Path, sync::Mutex, time::Duration};

use mm_core::process::ForeignProcess;

const WINIPBROADCAST_EXE: &str = "WinIPBroadcast.exe";
const HELPER_STOP_GRACE: Duration = Duration::from_secs(2);
const TARGET_METRIC: i64 = 1;

const EASYTIER_KEYWORDS: &[&str] = &["easytier", "tap", "tun", "et_", "虚拟", "virtual", "vpn"];
const CONNECTED_STATES: &[&str] = &["已连接", "connected", "up", "启用", "enabled"];

/// Rollup for [`OptimizerStatus`] and the per-adapter detailed view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    Healthy,
    Degraded,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterStatus {
    Optimized,
    Degraded,
    Missing,
}

#[derive(Debug, Clone)]
pub struct AdapterDetail {
    pub name: String,
    pub original_metric: i64,
    pub current_metric: i64,
    pub target_metric: i64,
    pub status: AdapterStatus,
}

/// The user-visible boolean pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizerStatus {
    pub lan_broadcast_helper_running: bool,
    pub nic_metric_optimized: bool,
}

/// Detailed status including per-adapter outcomes and a rolled-up
/// health.
#[derive(Debug, Clone)]
pub struct DetailedOptimizerStatus {
    pub summary: OptimizerStatus,
    pub adapters: Vec<AdapterDetail>,
    pub health: Health,
}

/// One parsed row of `netsh interface ipv4 show interfaces` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    pub index: u32,
    pub metric: i64,
    pub mtu: u32,
    pub state: String,
    pub name: String,
}

/// Owns the LAN-broadcast helper tracker and the record of metrics
/// changed this run, for rollback.
pub struct NetworkOptimizer {
    helper: ForeignProcess,
    original_metrics: Mutex<HashMap<String, i64>>,
}

impl Default for NetworkOptimizer {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkOptimizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            helper: ForeignProcess::by_name(WINIPBROADCAST_EXE),
            original_metrics: Mutex::new(HashMap::new()),
        }
    }

    /// Launches the LAN-broadcast helper elevated, if not already
    /// running. Idempotent.
    ///
    /// # Errors
    /// If elevation is denied or the process never appears.
    pub async fn start_lan_broadcast_helper(&self, exe_path: &Path) -> Result<(), mm_core::process::ElevationError> {
        if self.helper.is_running() {
            return Ok(());
        }
        let args = vec!["run".to_string()];
        mm_core::process::spawn_elevated(exe_path, &args, None, Duration::from_secs(10)).await?;
        Ok(())
    }

    /// Two-phase stop: politely terminate, then kill; falls back to a
    /// system `taskkill` only if `force_kill_via_os_tool` is available.
    pub async fn stop_lan_broadcast_helper(&self) {
        self.helper.terminate_then_kill(HELPER_STOP_GRACE).await;
        if self.helper.is_running() {
            self.helper.force_kill_via_os_tool().await;
        }
    }

    #[must_use]
    pub fn lan_broadcast_helper_running(&self) -> bool {
        self.helper.is_running()
    }

    /// Reads and parses the OS's IPv4 interface table. Tries several
    /// text codecs against the raw bytes, since `netsh` output encoding
    /// is locale-dependent; returns an empty list if none decode
    /// successfully or the command fails.
    pub async fn read_interfaces(&self) -> Vec<Interface> {
        let Ok(output) = tokio::process::Command::new("netsh")
            .args(["interface", "ipv4", "show", "interfaces"])
            .output()
            .await
        else {
            return Vec::new();
        };
        if !output.status.success() {
            return Vec::new();
        }
        let text = decode_tolerant(&output.stdout);
        parse_interfaces(&text)
    }

    /// Locates the overlay adapter by keyword score and connected-state
    /// match, sets its metric to [`TARGET_METRIC`], verifies by
    /// re-reading up to 3 times with increasing delay, and rolls back on
    /// failure.
    ///
    /// Returns the resulting detail, `None` if no adapter could be
    /// found.
    pub async fn optimize_nic_metric(&self) -> Option<AdapterDetail> {
        let interfaces = self.read_interfaces().await;
        let target = find_easytier_interface(&interfaces)?;

        self.original_metrics
            .lock()
            .unwrap()
            .entry(target.name.clone())
            .or_insert(target.metric);

        set_interface_metric(&target.name, TARGET_METRIC).await;

        if self.verify_metric(&target.name, TARGET_METRIC, 3).await {
            return Some(AdapterDetail {
                name: target.name,
                original_metric: *self.original_metrics.lock().unwrap().get(&target.name)?,
                current_metric: TARGET_METRIC,
                target_metric: TARGET_METRIC,
                status: AdapterStatus::Optimized,
            });
        }

        let original = *self.original_metrics.lock().unwrap().get(&target.name)?;
        set_interface_metric(&target.name, original).await;
        let rolled_back = self.verify_metric(&target.name, original, 2).await;
        self.original_metrics.lock().unwrap().remove(&target.name);

        Some(AdapterDetail {
            name: target.name,
            original_metric: original,
            current_metric: if rolled_back { original } else { TARGET_METRIC },
            target_metric: TARGET_METRIC,
            status: AdapterStatus::Degraded,
        })
    }

    async fn verify_metric(&self, name: &str, expect: i64, attempts: u32) -> bool {
        let mut delay = Duration::from_millis(300);
        for _ in 0..attempts {
            tokio::time::sleep(delay).await;
            let interfaces = self.read_interfaces().await;
            if interfaces.iter().any(|i| i.name == name && i.metric == expect) {
                return true;
            }
            delay *= 2;
        }
        false
    }

    /// Restores every recorded (adapter, original-metric) pair and
    /// clears the record on success.
    pub async fn rollback_all(&self) -> Vec<AdapterDetail> {
        let recorded: Vec<(String, i64)> = self.original_metrics.lock().unwrap().iter().map(|(k, v)| (k.clone(), *v)).collect();
        let mut out = Vec::new();
        for (name, original) in recorded {
            set_interface_metric(&name, original).await;
            let ok = self.verify_metric(&name, original, 2).await;
            if ok {
                self.original_metrics.lock().unwrap().remove(&name);
            }
            out.push(AdapterDetail {
                name,
                original_metric: original,
                current_metric: original,
                target_metric: TARGET_METRIC,
                status: if ok { AdapterStatus::Optimized } else { AdapterStatus::Degraded },
            });
        }
        out
    }
}

fn decode_tolerant(bytes: &[u8]) -> String {
    for encoding in [encoding_rs::UTF_8, encoding_rs::GBK, encoding_rs::WINDOWS_1252] {
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return text.into_owned();
        }
    }
    String::from_utf8_lossy(bytes).into_owned()
}

fn parse_interfaces(text: &str) -> Vec<Interface> {
    let lines: Vec<&str> = text.lines().collect();
    let header_idx = lines.iter().position(|l| l.contains("Idx") && l.contains("Met") && l.contains("MTU"));
    let start = header_idx.map_or(3, |i| i + 2);

    let row = regex::Regex::new(r"^\s*(\d+)\s+(\d+)\s+(\d+)\s+(\S+)\s+(.+)$").unwrap();
    lines
        .iter()
        .skip(start)
        .filter(|l| !l.trim().is_empty() && !l.trim_start().starts_with('-'))
        .filter_map(|line| {
            let caps = row.captures(line.trim())?;
            Some(Interface {
                index: caps[1].parse().ok()?,
                metric: caps[2].parse().ok()?,
                mtu: caps[3].parse().ok()?,
                state: caps[4].to_string(),
                name: caps[5].trim().to_string(),
            })
        })
        .collect()
}

fn find_easytier_interface(interfaces: &[Interface]) -> Option<Interface> {
    for keyword in EASYTIER_KEYWORDS {
        for iface in interfaces {
            let name_lower = iface.name.to_lowercase();
            if !name_lower.contains(keyword) {
                continue;
            }
            let state_lower = iface.state.to_lowercase();
            if CONNECTED_STATES.iter().any(|s| state_lower.contains(&s.to_lowercase())) {
                return Some(iface.clone());
            }
        }
    }
    None
}

async fn set_interface_metric(name: &str, metric: i64) {
    let _ = tokio::process::Command::new("netsh")
        .args(["interface", "ipv4", "set", "interface", name, &format!("metric={metric}")])
        .output()
        .await;
}
