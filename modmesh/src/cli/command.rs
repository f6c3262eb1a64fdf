use owo_colors::OwoColorize;

use mm_core::{err, info, paths};
use mm_mods::{
    model::ModConfigModel,
    preset::{self, PresetMetadata},
    registry::ExternalModRegistry,
    writer::{parse_profile, write_profile},
};
use mm_overlay::{rooms, OverlaySupervisor, RoomConfig};

use super::{ModsCmd, OptimizerCmd, OverlayCmd, PresetsCmd, RegistryCmd, RoomsCmd};

type CliResult = Result<(), Box<dyn std::error::Error>>;

async fn load_model() -> ModConfigModel {
    let path = paths::current_profile_path();
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => parse_profile(&text).unwrap_or_default(),
        Err(_) => ModConfigModel::default(),
    }
}

async fn save_model(model: &ModConfigModel) -> CliResult {
    let path = paths::current_profile_path();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }
    tokio::fs::write(&path, write_profile(model)).await?;
    Ok(())
}

pub(super) async fn mods(cmd: ModsCmd) -> CliResult {
    match cmd {
        ModsCmd::Scan => {
            let registry = ExternalModRegistry::load(&paths::external_mods_registry_path()).await;
            let result = mm_mods::classify::scan_mod_directory(&paths::mods_dir(), &registry).await;
            for entry in &result.entries {
                println!("{:<8} {}", format!("{:?}", entry.kind).cyan(), entry.name);
            }
            for native in &result.natives {
                println!("{:<8} {}", "native".cyan(), native);
            }
            for name in &result.external_packages {
                println!("{:<8} {} (external)", "package".cyan(), name);
            }
            for name in &result.external_natives {
                println!("{:<8} {} (external)", "native".cyan(), name);
            }
        }
        ModsCmd::List => {
            let model = load_model().await;
            for pkg in &model.packages {
                let mark = if pkg.enabled { "x".green().to_string() } else { " ".to_string() };
                println!("[{mark}] {}", pkg.display_id().bold());
            }
            for native in &model.natives {
                let mark = if native.enabled { "x".green().to_string() } else { " ".to_string() };
                println!("[{mark}] {}", native.display_path().bold());
            }
        }
        ModsCmd::Enable { id } => {
            let mut model = load_model().await;
            if !model.toggle_package(&id) && !model.toggle_native(&id) {
                err!("no package or native matching {id:?} was found");
                return Ok(());
            }
            save_model(&model).await?;
            info!("enabled {id}");
        }
        ModsCmd::Disable { id } => {
            let mut model = load_model().await;
            if !model.toggle_package(&id) && !model.toggle_native(&id) {
                err!("no package or native matching {id:?} was found");
                return Ok(());
            }
            save_model(&model).await?;
            info!("disabled {id}");
        }
        ModsCmd::ForceLast { id } => {
            let mut model = load_model().await;
            if model.set_force_load_last(&id) {
                save_model(&model).await?;
                info!("{id} will now load after every other enabled package");
            } else {
                err!("no package matching {id:?} was found");
            }
        }
        ModsCmd::ForceFirst { path } => {
            let mut model = load_model().await;
            if model.set_force_load_first(&path) {
                save_model(&model).await?;
                info!("{path} will now load before every other enabled native");
            } else {
                err!("no native matching {path:?} was found");
            }
        }
        ModsCmd::Preload { path, off } => {
            let mut model = load_model().await;
            if model.set_nrsc_preload(&path, !off) {
                save_model(&model).await?;
                info!("preload hint for {path} set to {}", !off);
            } else {
                err!("{path:?} does not resolve to nrsc.dll");
            }
        }
    }
    Ok(())
}

pub(super) async fn registry(cmd: RegistryCmd) -> CliResult {
    let registry_path = paths::external_mods_registry_path();
    let mut reg = ExternalModRegistry::load(&registry_path).await;
    let mods_dir = paths::mods_dir();

    match cmd {
        RegistryCmd::AddPackage { path } => {
            if let Err(reason) = reg.add_package(std::path::Path::new(&path), &mods_dir) {
                err!("{reason}");
                return Ok(());
            }
            reg.save(&registry_path).await?;
            info!("registered external package at {path}");
        }
        RegistryCmd::AddNative { path } => {
            let registry_clone = ExternalModRegistry::load(&registry_path).await;
            let scan = mm_mods::classify::scan_mod_directory(&mods_dir, &registry_clone).await;
            let mut existing: std::collections::HashSet<String> = scan.natives.into_iter().collect();
            existing.extend(scan.external_natives);
            if let Err(reason) = reg.add_native(std::path::Path::new(&path), &mods_dir, &existing) {
                err!("{reason}");
                return Ok(());
            }
            reg.save(&registry_path).await?;
            info!("registered external native at {path}");
        }
        RegistryCmd::RemovePackage { name } => {
            if reg.remove_package(&name) {
                reg.save(&registry_path).await?;
                info!("removed external package {name}");
            } else {
                err!("no external package named {name:?}");
            }
        }
        RegistryCmd::RemoveNative { name } => {
            if reg.remove_native(&name) {
                reg.save(&registry_path).await?;
                info!("removed external native {name}");
            } else {
                err!("no external native named {name:?}");
            }
        }
        RegistryCmd::Missing => {
            let (packages, natives) = reg.missing();
            for name in packages {
                println!("{} package: {name}", "missing".red());
            }
            for name in natives {
                println!("{} native: {name}", "missing".red());
            }
        }
        RegistryCmd::Cleanup => {
            let (packages, natives) = reg.cleanup_missing();
            reg.save(&registry_path).await?;
            info!("removed {} missing package(s), {} missing native(s)", packages.len(), natives.len());
        }
    }
    Ok(())
}

pub(super) async fn presets(cmd: PresetsCmd) -> CliResult {
    let presets_dir = paths::presets_dir();
    match cmd {
        PresetsCmd::List => {
            let infos = preset::scan_presets(&presets_dir).await;
            for info in infos {
                let availability = if info.available { "ok".green().to_string() } else { "missing deps".red().to_string() };
                println!("{} {} [{availability}]", info.icon, info.name.bold());
                for missing in &info.missing {
                    println!("    {} {missing}", "-".bright_black());
                }
            }
        }
        PresetsCmd::Generate { name, description } => {
            let model = load_model().await;
            let metadata = PresetMetadata { name: name.clone(), description, icon: "🎮".to_string() };
            let text = preset::generate_preset(&model, &metadata);
            tokio::fs::create_dir_all(&presets_dir).await.ok();
            let path = presets_dir.join(format!("{name}.me3"));
            tokio::fs::write(&path, text).await?;
            info!("generated preset {name} at {path:?}");
        }
        PresetsCmd::Launch { name, game_exe } => {
            let path = presets_dir.join(format!("{name}.me3"));
            let params = mm_launch::LaunchParams::load(&paths::launch_params_path()).await;
            let pid = mm_launch::quick_launch(std::path::Path::new(&game_exe), &path, &params).await?;
            info!("launched preset {name} (pid {pid})");
        }
    }
    Ok(())
}

pub(super) async fn launch(game_exe: String) -> CliResult {
    let model = load_model().await;
    let params = mm_launch::LaunchParams::load(&paths::launch_params_path()).await;
    let pid = mm_launch::launch(std::path::Path::new(&game_exe), &model, &params).await?;
    info!("launched the game (pid {pid})");
    Ok(())
}

pub(super) async fn overlay(cmd: OverlayCmd) -> CliResult {
    match cmd {
        OverlayCmd::Start { room } => {
            let rooms_dir = paths::rooms_dir();
            let Some(room_config) = rooms::list_rooms(&rooms_dir).await.into_iter().find(|(n, _)| n == &room).map(|(_, c)| c) else {
                err!("no saved room named {room:?}");
                return Ok(());
            };
            let supervisor = std::sync::Arc::new(OverlaySupervisor::new());
            supervisor.start(&room_config).await?;
            info!("overlay started for room {room}");
        }
        OverlayCmd::Stop => {
            let supervisor = std::sync::Arc::new(OverlaySupervisor::new());
            supervisor.stop().await;
            info!("overlay stopped");
        }
        OverlayCmd::Status => {
            let supervisor = std::sync::Arc::new(OverlaySupervisor::new());
            println!("overlay state: {:?}", supervisor.state().await);
        }
    }
    Ok(())
}

pub(super) async fn rooms(cmd: RoomsCmd) -> CliResult {
    let rooms_dir = paths::rooms_dir();
    match cmd {
        RoomsCmd::List => {
            for (name, room) in rooms::list_rooms(&rooms_dir).await {
                let addressing = room.ipv4.clone().unwrap_or_else(|| "dhcp".to_string());
                println!("{} ({addressing})", name.bold());
            }
        }
        RoomsCmd::Save { network_name, network_secret, ipv4 } => {
            let room = RoomConfig {
                network_name: network_name.clone(),
                network_secret,
                dhcp: ipv4.is_none(),
                ipv4,
                ..RoomConfig::default()
            };
            rooms::save_room(&rooms_dir, &room).await?;
            info!("saved room {network_name}");
        }
        RoomsCmd::Delete { network_name } => {
            let daemon_running = mm_core::process::ForeignProcess::by_name(paths::OVERLAY_DAEMON_EXE_NAME).is_running();
            let active_and_running =
                rooms::is_room_active_and_running(&paths::overlay_user_config_path(), &network_name, daemon_running).await;
            rooms::delete_room(&rooms_dir, &network_name, active_and_running).await?;
            info!("deleted room {network_name}");
        }
        RoomsCmd::ShareEncode { network_name } => {
            let Some((_, room)) = rooms::list_rooms(&rooms_dir).await.into_iter().find(|(n, _)| n == &network_name) else {
                err!("no saved room named {network_name:?}");
                return Ok(());
            };
            println!("{}", rooms::encode_share_code(&room));
        }
        RoomsCmd::ShareDecode { code } => {
            let room = rooms::decode_share_code(&code)?;
            println!("network_name: {}", room.network_name);
            println!("network_secret: {}", room.network_secret);
            println!("dhcp: {}", room.dhcp);
            if let Some(ip) = &room.ipv4 {
                println!("ipv4: {ip}");
            }
            for peer in &room.peers {
                println!("peer: {peer}");
            }
        }
        RoomsCmd::Ping => {
            let pings = rooms::ping_charity_peers().await;
            for ping in &pings {
                match ping.latency {
                    Some(d) => println!("{:<12} {:>6.0} ms", ping.city.bold(), d.as_secs_f64() * 1000.0),
                    None => println!("{:<12} {}", ping.city.bold(), "unreachable".red()),
                }
            }
            if let Some(best) = rooms::fastest(&pings) {
                info!("fastest: {} ({})", best.city, best.uri);
            }
        }
    }
    Ok(())
}

pub(super) async fn optimizer(cmd: OptimizerCmd) -> CliResult {
    let optimizer = mm_overlay::optimizer::NetworkOptimizer::new();
    match cmd {
        OptimizerCmd::Status => {
            for iface in optimizer.read_interfaces().await {
                println!("{:<4} metric={:<6} mtu={:<6} {} {}", iface.index, iface.metric, iface.mtu, iface.state, iface.name.bold());
            }
        }
        OptimizerCmd::Optimize => match optimizer.optimize_nic_metric().await {
            Some(detail) => println!(
                "{} {}: metric {} -> {}",
                detail.status.describe(),
                detail.name.bold(),
                detail.original_metric,
                detail.current_metric
            ),
            None => err!("no overlay adapter was found"),
        },
        OptimizerCmd::Rollback => {
            let restored = optimizer.rollback_all().await;
            info!("restored {} adapter metric(s)", restored.len());
        }
    }
    Ok(())
}

pub(super) async fn tools() -> CliResult {
    let provisioner = mm_overlay::tool_provisioner::ToolProvisioner::new();
    provisioner.ensure_available().await?;
    info!("auxiliary overlay tools are present and verified");
    Ok(())
}

trait DescribeStatus {
    fn describe(&self) -> String;
}

impl DescribeStatus for mm_overlay::optimizer::AdapterStatus {
    fn describe(&self) -> String {
        match self {
            Self::Optimized => "optimized".green().to_string(),
            Self::Degraded => "degraded".yellow().to_string(),
            Self::Missing => "missing".red().to_string(),
        }
    }
}
