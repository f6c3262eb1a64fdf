//! Overlay Config Generator (component H).
//!
//! Translates a [`RoomConfig`] into the daemon's own TOML-shaped
//! structured config and a ready-to-use command line.

use uuid::Uuid;

use crate::{error::ConfigError, types::RoomConfig};

const DEFAULT_PEER: &str = "tcp://public.easytier.top:11010";
const DEFAULT_LISTENER: &str = "udp://0.0.0.0:11010";
const DEFAULT_TCP_LISTENER: &str = "tcp://0.0.0.0:11010";

/// The generated daemon config together with the instance id it was
/// stamped with (callers need the id to derive the default hostname and
/// to correlate later status events).
pub struct GeneratedConfig {
    pub instance_id: String,
    pub toml: String,
}

/// Produces the daemon's TOML config from a room, generating a fresh
/// `instance_id` every call.
///
/// # Errors
/// If `room` is missing a hostname derivation input, an instance name,
/// or a non-empty network identity.
pub fn generate(room: &RoomConfig) -> Result<GeneratedConfig, ConfigError> {
    if room.network_name.is_empty() {
        return Err(ConfigError::MissingField("instance_name"));
    }
    if room.network_secret.is_empty() {
        return Err(ConfigError::MissingField("network_secret"));
    }
    // The generated config carries exactly one of `dhcp = true` or
    // `ipv4 = "<addr>"`, never neither. A room with
    // DHCP off and no static IP (reachable via the share-code "d=false,
    // no i" case) has nothing to resolve an address from, so it's
    // rejected here rather than silently emitted as neither form.
    if !room.dhcp && room.ipv4.is_none() {
        return Err(ConfigError::MissingField("ipv4"));
    }

    let instance_id = Uuid::new_v4().to_string();
    let hostname = if room.hostname.is_empty() {
        format!("Player_{}", &instance_id[..8])
    } else {
        room.hostname.clone()
    };
    if hostname.is_empty() {
        return Err(ConfigError::MissingField("hostname"));
    }

    let mut peers = room.peers.clone();
    if peers.is_empty() {
        peers.push(DEFAULT_PEER.to_string());
    }

    let mut listeners = vec![DEFAULT_LISTENER.to_string()];
    if room.tcp_listen && !listeners.iter().any(|l| l == DEFAULT_TCP_LISTENER) {
        listeners.push(DEFAULT_TCP_LISTENER.to_string());
    }

    let mut out = String::new();
    out.push_str(&format!("hostname = {:?}\n", hostname));
    out.push_str(&format!("instance_name = {:?}\n", room.network_name));
    out.push_str(&format!("instance_id = {:?}\n", instance_id));
    out.push_str(&format!("dhcp = {}\n", room.dhcp));
    if let Some(ipv4) = &room.ipv4 {
        if !room.dhcp {
            out.push_str(&format!("ipv4 = {ipv4:?}\n"));
        }
    }
    out.push_str("listeners = [\n");
    for listener in &listeners {
        out.push_str(&format!("    {listener:?},\n"));
    }
    out.push_str("]\n");
    out.push_str("rpc_portal = \"0.0.0.0:0\"\n\n");

    out.push_str("[network_identity]\n");
    out.push_str(&format!("network_name = {:?}\n", room.network_name));
    out.push_str(&format!("network_secret = {:?}\n\n", room.network_secret));

    for peer in &peers {
        out.push_str("[[peer]]\n");
        out.push_str(&format!("uri = {peer:?}\n\n"));
    }

    out.push_str("[flags]\n");
    out.push_str(&format!("enable_encryption = {}\n", room.enable_encryption));
    out.push_str(&format!("enable_ipv6 = {}\n", room.enable_ipv6));
    out.push_str(&format!("latency_first = {}\n", room.latency_first));
    out.push_str(&format!("multi_thread = {}\n", room.multi_thread));
    out.push_str(&format!("enable_kcp_proxy = {}\n", room.enable_kcp_proxy));
    out.push_str(&format!("enable_quic_proxy = {}\n", room.enable_quic_proxy));
    out.push_str(&format!("use_smoltcp = {}\n", room.use_smoltcp));
    if room.compression {
        out.push_str("data_compress_algo = 2\n");
    }

    Ok(GeneratedConfig { instance_id, toml: out })
}

/// Builds the daemon's command-line tail, excluding the executable
/// itself.
#[must_use]
pub fn daemon_args(config_path: &std::path::Path, log_dir: &std::path::Path) -> Vec<String> {
    vec![
        "--config-file".to_string(),
        config_path.to_string_lossy().into_owned(),
        "--file-log-dir".to_string(),
        log_dir.to_string_lossy().into_owned(),
        "--file-log-level".to_string(),
        "info".to_string(),
        "--console-log-level".to_string(),
        "warn".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_room() -> RoomConfig {
        RoomConfig {
            network_name: "lan1".to_string(),
            network_secret: "sec".to_string(),
            ..RoomConfig::default()
        }
    }

    #[test]
    fn rejects_a_room_missing_network_name() {
        let room = RoomConfig {
            network_name: String::new(),
            ..sample_room()
        };
        assert!(matches!(generate(&room), Err(ConfigError::MissingField("instance_name"))));
    }

    #[test]
    fn defaults_hostname_from_the_instance_id_prefix() {
        let generated = generate(&sample_room()).unwrap();
        assert!(generated.toml.contains(&format!("hostname = \"Player_{}\"", &generated.instance_id[..8])));
    }

    #[test]
    fn falls_back_to_the_default_peer_and_listener() {
        let generated = generate(&sample_room()).unwrap();
        assert!(generated.toml.contains(DEFAULT_PEER));
        assert!(generated.toml.contains(DEFAULT_LISTENER));
        assert!(!generated.toml.contains("data_compress_algo"));
    }

    #[test]
    fn compression_key_is_absent_unless_enabled() {
        let mut room = sample_room();
        room.compression = true;
        let generated = generate(&room).unwrap();
        assert!(generated.toml.contains("data_compress_algo = 2"));
    }

    #[test]
    fn rejects_non_dhcp_room_with_no_static_ip() {
        let room = RoomConfig {
            dhcp: false,
            ipv4: None,
            ..sample_room()
        };
        assert!(matches!(generate(&room), Err(ConfigError::MissingField("ipv4"))));
    }

    #[test]
    fn tcp_listener_is_appended_only_once_when_requested() {
        let mut room = sample_room();
        room.tcp_listen = true;
        let generated = generate(&room).unwrap();
        assert_eq!(generated.toml.matches(DEFAULT_TCP_LISTENER).count(), 1);
    }
}
