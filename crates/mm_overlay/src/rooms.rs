//! Room Registry & Share Codec (component K).
//!
//! Rooms are one-JSON-file-per-network-name, loaded/saved via
//! `mm_core::fsutil`'s tolerant-read / full-rewrite helpers, the same
//! pattern the external-mod registry (`mm_mods::registry`) uses.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use mm_core::{IntoIoError, fsutil, pt};
use serde::{Deserialize, Serialize};

use crate::{
    error::{RoomError, ShareCodeError},
    types::RoomConfig,
};

const SHARE_CODE_SCHEME: &str = "ESR";

/// Characters the OS forbids in a filename, rejected at room-create
/// time.
const RESERVED_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Curated public "charity" peer endpoints, keyed by city display name
///. Distinct from the always-included default public peer.
pub const CHARITY_PEERS: &[(&str, &str)] = &[
    ("Guangzhou", "tcp://gz.minebg.top:11010"),
    ("Shenzhen", "tcp://119.23.65.180:11010"),
    ("Hefei", "tcp://ah.nkbpal.cn:11010"),
    ("Chengdu", "tcp://turn.sc.629957.xyz:11010"),
    ("Wuhan", "tcp://8.148.29.206:11010"),
    ("Suqian", "tcp://turn.js.629957.xyz:11012"),
    ("Shanghai", "tcp://sh.993555.xyz:11010"),
    ("Hong Kong", "tcp://et-hk.clickor.click:11010"),
];

fn peer_uri_for_city(city: &str) -> Option<&'static str> {
    CHARITY_PEERS.iter().find(|(name, _)| *name == city).map(|(_, uri)| *uri)
}

fn city_for_peer_uri(uri: &str) -> Option<&'static str> {
    CHARITY_PEERS.iter().find(|(_, peer_uri)| *peer_uri == uri).map(|(name, _)| *name)
}

/// Per-10-second timeout on each individual peer probe.
const PEER_PING_TIMEOUT: Duration = Duration::from_secs(10);

/// One charity peer's reachability result. `latency` is `None` when the
/// probe timed out or the connection was refused — a ping failure never
/// aborts the batch.
#[derive(Debug, Clone)]
pub struct PeerPing {
    pub index: usize,
    pub city: &'static str,
    pub uri: &'static str,
    pub latency: Option<Duration>,
}

/// Probes every curated charity peer with a bounded-concurrency TCP
/// connect (a practical stand-in for ICMP, which needs raw-socket
/// privileges this CLI doesn't assume it has), returning one
/// [`PeerPing`] per entry in [`CHARITY_PEERS`] order regardless of which
/// finished first. Grounded on `mm_core::jobs::do_jobs_with_limit`'s
/// fan-out, used here with one task per peer.
pub async fn ping_charity_peers() -> Vec<PeerPing> {
    let jobs = CHARITY_PEERS.iter().enumerate().map(|(index, (city, uri))| async move {
        let latency = probe_peer(uri).await;
        Ok::<_, std::convert::Infallible>(PeerPing { index, city, uri, latency })
    });
    let mut results = mm_core::jobs::do_jobs_with_limit(jobs, CHARITY_PEERS.len().max(1))
        .await
        .unwrap_or_default();
    results.sort_by_key(|p| p.index);
    results
}

/// The lowest-latency reachable peer among a batch of pings, or `None`
/// if every probe failed. Helper for a "join the fastest public peer"
/// UI flow built on top of [`ping_charity_peers`].
#[must_use]
pub fn fastest(pings: &[PeerPing]) -> Option<&PeerPing> {
    pings.iter().filter(|p| p.latency.is_some()).min_by_key(|p| p.latency)
}

async fn probe_peer(uri: &str) -> Option<Duration> {
    let host_port = uri.splitn(2, "://").nth(1).unwrap_or(uri);
    let started = std::time::Instant::now();
    let connect = tokio::net::TcpStream::connect(host_port);
    match tokio::time::timeout(PEER_PING_TIMEOUT, connect).await {
        Ok(Ok(_stream)) => Some(started.elapsed()),
        _ => None,
    }
}

/// Lists every room under `rooms_dir`, sorted by filename stem.
/// Malformed files are skipped with a log line, not fatal.
pub async fn list_rooms(rooms_dir: &Path) -> Vec<(String, RoomConfig)> {
    let names = fsutil::read_dir_names(rooms_dir).await.unwrap_or_default();
    let mut out = Vec::new();
    let mut stems: Vec<&String> = names.iter().filter(|n| n.ends_with(".json")).collect();
    stems.sort();
    for name in stems {
        let path = rooms_dir.join(name);
        match fsutil::read_json_tolerant::<RoomConfig>(&path).await {
            Some(room) => {
                let stem = name.trim_end_matches(".json").to_string();
                out.push((stem, room));
            }
            None => pt!("skipping malformed room file: {name}"),
        }
    }
    out
}

/// Writes `room` to `<rooms_dir>/<network_name>.json`, rejecting names
/// with OS-reserved characters.
///
/// # Errors
/// If the network name contains a reserved character or the file can't
/// be written.
pub async fn save_room(rooms_dir: &Path, room: &RoomConfig) -> Result<(), RoomError> {
    if let Some(bad) = room.network_name.chars().find(|c| RESERVED_CHARS.contains(c)) {
        return Err(RoomError::ReservedCharacter(bad));
    }
    let path = room_path(rooms_dir, &room.network_name);
    fsutil::write_json_pretty(&path, room).await?;
    Ok(())
}

/// Deletes the named room. Refused while the overlay is running for
/// that same room.
///
/// # Errors
/// [`RoomError::DeleteRefusedWhileRunning`] if `is_active_and_running`
/// is `true`; otherwise an I/O error.
pub async fn delete_room(rooms_dir: &Path, network_name: &str, is_active_and_running: bool) -> Result<(), RoomError> {
    if is_active_and_running {
        return Err(RoomError::DeleteRefusedWhileRunning);
    }
    let path = room_path(rooms_dir, network_name);
    match tokio::fs::remove_file(&path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(RoomError::Io(e.path(path))),
    }
}

/// Picks the room to auto-load after a delete, when the overlay is
/// stopped: the first remaining room sorted by filename stem, or `None`
/// if the store is now empty.
pub async fn first_remaining_room(rooms_dir: &Path) -> Option<(String, RoomConfig)> {
    list_rooms(rooms_dir).await.into_iter().next()
}

fn room_path(rooms_dir: &Path, network_name: &str) -> PathBuf {
    rooms_dir.join(format!("{network_name}.json"))
}

/// The app-side marker recording which room the overlay is currently
/// running for (`ESR/easytier_config.json`). Since the overlay daemon
/// outlives any single app/CLI invocation,
/// "is this room the active one" has to survive across processes too —
/// this is the only piece of overlay state that does.
#[derive(Debug, Serialize, Deserialize)]
struct ActiveRoomMarker {
    active_room: String,
}

/// Records `network_name` as the room the overlay was just started for.
pub async fn mark_active_room(user_config_path: &Path, network_name: &str) {
    let marker = ActiveRoomMarker { active_room: network_name.to_string() };
    let _ = fsutil::write_json_pretty(user_config_path, &marker).await;
}

/// Clears the active-room marker, best-effort.
pub async fn clear_active_room(user_config_path: &Path) {
    let _ = tokio::fs::remove_file(user_config_path).await;
}

/// `true` iff `network_name` is the room the marker names AND the
/// overlay daemon process is actually still running. Checked
/// against the live process rather than trusting the marker alone, since
/// a crashed daemon leaves a stale marker behind.
pub async fn is_room_active_and_running(user_config_path: &Path, network_name: &str, daemon_running: bool) -> bool {
    if !daemon_running {
        return false;
    }
    fsutil::read_json_tolerant::<ActiveRoomMarker>(user_config_path)
        .await
        .is_some_and(|m| m.active_room == network_name)
}

/// The minimal field set a share code carries.
#[derive(Debug, Serialize, Deserialize, Default)]
struct ShareCodePayload {
    n: String,
    s: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    i: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    d: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    c: Vec<String>,
}

/// Encodes a room into its minimal share-code form.
#[must_use]
pub fn encode_share_code(room: &RoomConfig) -> String {
    let cities: Vec<String> = room.peers.iter().filter_map(|uri| city_for_peer_uri(uri)).map(str::to_string).collect();
    let payload = ShareCodePayload {
        n: room.network_name.clone(),
        s: room.network_secret.clone(),
        i: if room.dhcp { None } else { room.ipv4.clone() },
        d: if !room.dhcp && room.ipv4.is_none() { Some(false) } else { None },
        c: cities,
    };
    let json = serde_json::to_string(&payload).unwrap_or_default();
    format!("{SHARE_CODE_SCHEME}://{}", BASE64.encode(json))
}

/// Decodes a share code into a full room, expanding the alias fields
/// and defaulting every unspecified advanced flag to enabled.
///
/// # Errors
/// If the scheme prefix is missing, the payload isn't valid base64/JSON,
/// or a required field is absent.
pub fn decode_share_code(code: &str) -> Result<RoomConfig, ShareCodeError> {
    let prefix = format!("{SHARE_CODE_SCHEME}://");
    let Some(rest) = code.strip_prefix(&prefix) else {
        return Err(ShareCodeError::BadPrefix("ESR://"));
    };
    let bytes = BASE64.decode(rest)?;
    let payload: ShareCodePayload = serde_json::from_slice(&bytes)?;

    if payload.n.is_empty() {
        return Err(ShareCodeError::MissingField("n"));
    }
    if payload.s.is_empty() {
        return Err(ShareCodeError::MissingField("s"));
    }

    // Three-case IP/DHCP derivation rule: `i` present -> static
    // IP; `d=false` present but no `i` -> non-DHCP no-IP; neither ->
    // DHCP on.
    let (dhcp, ipv4) = match (&payload.i, payload.d) {
        (Some(ip), _) => (false, Some(ip.clone())),
        (None, Some(false)) => (false, None),
        _ => (true, None),
    };

    let mut peers: Vec<String> = payload.c.iter().filter_map(|city| peer_uri_for_city(city)).map(str::to_string).collect();
    peers.push("tcp://public.easytier.top:11010".to_string());

    Ok(RoomConfig {
        network_name: payload.n,
        network_secret: payload.s,
        dhcp,
        ipv4,
        peers,
        // Share-code expansion fills every advanced flag to enabled
        // except TCP-listen and compression; `use_smoltcp` defaults to
        // off on a freshly-created room but on here.
        use_smoltcp: true,
        ..RoomConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_then_decode_preserves_static_ip_and_secret() {
        let room = RoomConfig {
            network_name: "lan1".to_string(),
            network_secret: "sec".to_string(),
            dhcp: false,
            ipv4: Some("10.126.126.5".to_string()),
            ..RoomConfig::default()
        };
        let code = encode_share_code(&room);
        assert!(code.starts_with("ESR://"));

        let decoded = decode_share_code(&code).unwrap();
        assert_eq!(decoded.network_name, "lan1");
        assert_eq!(decoded.network_secret, "sec");
        assert!(!decoded.dhcp);
        assert_eq!(decoded.ipv4.as_deref(), Some("10.126.126.5"));
        assert!(decoded.enable_encryption);
        assert!(decoded.enable_ipv6);
        assert!(decoded.use_smoltcp);
        assert!(!decoded.compression);
        assert!(!decoded.tcp_listen);
    }

    #[test]
    fn encode_reverse_maps_a_selected_charity_peer_to_its_city() {
        let room = RoomConfig {
            network_name: "lan1".to_string(),
            network_secret: "sec".to_string(),
            dhcp: false,
            ipv4: Some("10.126.126.5".to_string()),
            peers: vec!["tcp://sh.993555.xyz:11010".to_string()],
            ..RoomConfig::default()
        };
        let code = encode_share_code(&room);
        let rest = code.strip_prefix("ESR://").unwrap();
        let payload: serde_json::Value = serde_json::from_slice(&BASE64.decode(rest).unwrap()).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({ "n": "lan1", "s": "sec", "i": "10.126.126.5", "c": ["Shanghai"] })
        );

        let decoded = decode_share_code(&code).unwrap();
        assert!(decoded.peers.contains(&"tcp://sh.993555.xyz:11010".to_string()));
        assert!(decoded.peers.contains(&"tcp://public.easytier.top:11010".to_string()));
    }

    #[test]
    fn decode_expands_a_curated_city_to_its_peer_uri() {
        let raw = serde_json::json!({ "n": "lan1", "s": "sec", "i": "10.126.126.5", "c": ["Shanghai"] });
        let code = format!("ESR://{}", BASE64.encode(raw.to_string()));
        let decoded = decode_share_code(&code).unwrap();
        assert!(decoded.peers.contains(&"tcp://sh.993555.xyz:11010".to_string()));
        assert!(decoded.peers.contains(&"tcp://public.easytier.top:11010".to_string()));
    }

    #[test]
    fn decode_rejects_a_wrong_scheme() {
        let code = format!("not-esr://{}", BASE64.encode("{}"));
        assert!(matches!(decode_share_code(&code), Err(ShareCodeError::BadPrefix(_))));
    }

    #[test]
    fn decode_defaults_to_dhcp_when_neither_ip_nor_flag_present() {
        let raw = serde_json::json!({ "n": "lan1", "s": "sec" });
        let code = format!("ESR://{}", BASE64.encode(raw.to_string()));
        let decoded = decode_share_code(&code).unwrap();
        assert!(decoded.dhcp);
        assert!(decoded.ipv4.is_none());
    }

    #[tokio::test]
    async fn save_room_rejects_a_reserved_character_in_the_network_name() {
        let base = std::env::temp_dir().join(format!("mm_rooms_test_{}", std::process::id()));
        tokio::fs::create_dir_all(&base).await.unwrap();
        let room = RoomConfig {
            network_name: "bad/name".to_string(),
            network_secret: "sec".to_string(),
            ..RoomConfig::default()
        };
        let result = save_room(&base, &room).await;
        assert!(matches!(result, Err(RoomError::ReservedCharacter('/'))));
        tokio::fs::remove_dir_all(&base).await.ok();
    }

    #[tokio::test]
    async fn list_rooms_skips_malformed_files_and_sorts_by_stem() {
        let base = std::env::temp_dir().join(format!("mm_rooms_test_list_{}", std::process::id()));
        tokio::fs::create_dir_all(&base).await.unwrap();

        tokio::fs::write(base.join("not json at all"), "{{{{").await.ok();
        let room_b = RoomConfig { network_name: "b".to_string(), network_secret: "x".to_string(), ..RoomConfig::default() };
        let room_a = RoomConfig { network_name: "a".to_string(), network_secret: "y".to_string(), ..RoomConfig::default() };
        save_room(&base, &room_b).await.unwrap();
        save_room(&base, &room_a).await.unwrap();
        tokio::fs::write(base.join("broken.json"), "{not valid json").await.unwrap();

        let rooms = list_rooms(&base).await;
        let names: Vec<&str> = rooms.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);

        tokio::fs::remove_dir_all(&base).await.ok();
    }

    #[tokio::test]
    async fn active_room_check_requires_both_a_matching_marker_and_a_live_daemon() {
        let marker_path = std::env::temp_dir().join(format!("mm_rooms_test_marker_{}.json", std::process::id()));
        tokio::fs::remove_file(&marker_path).await.ok();

        assert!(!is_room_active_and_running(&marker_path, "lan1", true).await, "no marker yet");

        mark_active_room(&marker_path, "lan1").await;
        assert!(is_room_active_and_running(&marker_path, "lan1", true).await);
        assert!(!is_room_active_and_running(&marker_path, "lan1", false).await, "daemon not running");
        assert!(!is_room_active_and_running(&marker_path, "other", true).await, "different room");

        clear_active_room(&marker_path).await;
        assert!(!is_room_active_and_running(&marker_path, "lan1", true).await, "marker cleared");

        tokio::fs::remove_file(&marker_path).await.ok();
    }

    #[test]
    fn fastest_ignores_failed_probes_and_picks_the_lowest_latency() {
        let pings = vec![
            PeerPing { index: 0, city: "Guangzhou", uri: "x", latency: None },
            PeerPing { index: 1, city: "Shenzhen", uri: "y", latency: Some(Duration::from_millis(80)) },
            PeerPing { index: 2, city: "Hefei", uri: "z", latency: Some(Duration::from_millis(30)) },
        ];
        let best = fastest(&pings).unwrap();
        assert_eq!(best.city, "Hefei");
    }

    #[test]
    fn fastest_is_none_when_every_probe_failed() {
        let pings = vec![PeerPing { index: 0, city: "Guangzhou", uri: "x", latency: None }];
        assert!(fastest(&pings).is_none());
    }
}
