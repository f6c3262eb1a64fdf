//! Game Launcher (component G).
//!
//! Composes the final loader invocation and gets the game running,
//! then gets out of the way: verify inputs, persist whatever
//! configuration the loader reads back, build an argument list, spawn.

use std::{path::Path, time::Duration};

use mm_core::{
    paths,
    process::ForeignProcess,
};
use mm_mods::{model::ModConfigModel, writer::write_profile};

use crate::{detach::spawn_detached, error::LaunchError, params::LaunchParams};

/// How long to give the game/loader/helper to exit politely before the
/// cleanup sweep force-kills what's left.
const CLEANUP_GRACE: Duration = Duration::from_secs(2);

/// Launches the game using the currently configured mod set.
///
/// # Errors
/// If the game or loader executables are missing or misnamed, or the
/// profile can't be written. Spawn failures are also reported; cleanup
/// failures are not, by design.
pub async fn launch(game_exe: &Path, model: &ModConfigModel, params: &LaunchParams) -> Result<u32, LaunchError> {
    verify_game_exe(game_exe)?;
    let loader_exe = paths::loader_exe_path();
    if !tokio::fs::try_exists(&loader_exe).await.unwrap_or(false) {
        return Err(LaunchError::LoaderNotFound(loader_exe));
    }

    let profile_path = paths::current_profile_path();
    persist_profile(&profile_path, model).await?;

    let game_dir = game_exe.parent().unwrap_or_else(|| Path::new("."));
    let args = compose_args(game_exe, &profile_path, params);

    cleanup_conflicting_processes().await;

    spawn_detached(&loader_exe, &args, game_dir).map_err(LaunchError::Spawn)
}

/// Quick-launch variant: launches directly from a preset's own profile
/// file, skipping the model-persist step.
///
/// Writes a short shell/batch script that invokes the loader, then
/// spawns *that* script detached, so the loader survives this process
/// exiting even though it was itself launched from a throwaway wrapper.
///
/// # Errors
/// If the game or loader executables are missing or misnamed, the
/// preset doesn't exist, or the wrapper script can't be written.
pub async fn quick_launch(game_exe: &Path, preset_profile_path: &Path, params: &LaunchParams) -> Result<u32, LaunchError> {
    verify_game_exe(game_exe)?;
    let loader_exe = paths::loader_exe_path();
    if !tokio::fs::try_exists(&loader_exe).await.unwrap_or(false) {
        return Err(LaunchError::LoaderNotFound(loader_exe));
    }
    if !tokio::fs::try_exists(preset_profile_path).await.unwrap_or(false) {
        return Err(LaunchError::PresetNotFound(preset_profile_path.to_path_buf()));
    }

    let game_dir = game_exe.parent().unwrap_or_else(|| Path::new("."));
    let args = compose_args(game_exe, preset_profile_path, params);

    cleanup_conflicting_processes().await;

    let script_path = write_wrapper_script(&loader_exe, &args, game_dir).await?;
    spawn_wrapper_script(&script_path, game_dir).map_err(LaunchError::Spawn)
}

fn verify_game_exe(game_exe: &Path) -> Result<(), LaunchError> {
    if game_exe.file_name().is_none_or(|n| !n.eq_ignore_ascii_case(paths::GAME_EXE_NAME)) {
        return Err(LaunchError::WrongGameExe {
            found: game_exe.to_path_buf(),
            expected: paths::GAME_EXE_NAME,
        });
    }
    Ok(())
}

async fn persist_profile(profile_path: &Path, model: &ModConfigModel) -> Result<(), LaunchError> {
    use mm_core::IntoIoError;
    let text = write_profile(model);
    if let Some(parent) = profile_path.parent() {
        tokio::fs::create_dir_all(parent).await.dir(parent).map_err(LaunchError::ProfileWrite)?;
    }
    tokio::fs::write(profile_path, text).await.path(profile_path).map_err(LaunchError::ProfileWrite)
}

/// Builds the full `me3 launch ...` argument list.
fn compose_args(game_exe: &Path, profile_path: &Path, params: &LaunchParams) -> Vec<String> {
    let mut args = vec!["launch".to_string(), "--exe".to_string(), game_exe.to_string_lossy().into_owned()];
    args.extend(params.to_loader_flags());
    args.push("--game".to_string());
    args.push("nightreign".to_string());
    args.push("-p".to_string());
    args.push(profile_path.to_string_lossy().into_owned());
    args
}

/// Best-effort sweep of the game, loader, and loader-helper processes
/// before a fresh launch, so a crashed prior session can't collide with
/// this one.
async fn cleanup_conflicting_processes() {
    for name in [paths::GAME_EXE_NAME, paths::LOADER_EXE_NAME, paths::LOADER_HELPER_EXE_NAME] {
        ForeignProcess::by_name(name).terminate_then_kill(CLEANUP_GRACE).await;
    }
}

#[cfg(windows)]
async fn write_wrapper_script(loader_exe: &Path, args: &[String], game_dir: &Path) -> Result<std::path::PathBuf, LaunchError> {
    use mm_core::IntoIoError;
    let script_path = game_dir.join("modmesh_launch.bat");
    let mut body = String::from("@echo off\r\n");
    body.push('"');
    body.push_str(&loader_exe.to_string_lossy());
    body.push('"');
    for arg in args {
        body.push_str(" \"");
        body.push_str(arg);
        body.push('"');
    }
    body.push_str("\r\n");
    tokio::fs::write(&script_path, body).await.path(&script_path).map_err(LaunchError::ProfileWrite)?;
    Ok(script_path)
}

#[cfg(not(windows))]
async fn write_wrapper_script(loader_exe: &Path, args: &[String], game_dir: &Path) -> Result<std::path::PathBuf, LaunchError> {
    use mm_core::IntoIoError;
    let script_path = game_dir.join("modmesh_launch.sh");
    let mut body = String::from("#!/bin/sh\nexec \"");
    body.push_str(&loader_exe.to_string_lossy());
    body.push('"');
    for arg in args {
        body.push_str(" \"");
        body.push_str(arg);
        body.push('"');
    }
    body.push('\n');
    tokio::fs::write(&script_path, body).await.path(&script_path).map_err(LaunchError::ProfileWrite)?;

    use std::os::unix::fs::PermissionsExt;
    let perms = std::fs::Permissions::from_mode(0o755);
    tokio::fs::set_permissions(&script_path, perms).await.path(&script_path).map_err(LaunchError::ProfileWrite)?;

    Ok(script_path)
}

#[cfg(windows)]
fn spawn_wrapper_script(script_path: &Path, game_dir: &Path) -> std::io::Result<u32> {
    spawn_detached(Path::new("cmd.exe"), &["/C".to_string(), script_path.to_string_lossy().into_owned()], game_dir)
}

#[cfg(not(windows))]
fn spawn_wrapper_script(script_path: &Path, game_dir: &Path) -> std::io::Result<u32> {
    spawn_detached(script_path, &[], game_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_mods::model::ModConfigModel;

    #[test]
    fn rejects_a_game_exe_with_the_wrong_basename() {
        let err = verify_game_exe(Path::new("/games/steam/wrong.exe")).unwrap_err();
        assert!(matches!(err, LaunchError::WrongGameExe { .. }));
    }

    #[test]
    fn accepts_the_expected_basename_case_insensitively() {
        assert!(verify_game_exe(Path::new("/games/NIGHTREIGN.EXE")).is_ok());
    }

    #[test]
    fn composes_args_in_the_loaders_expected_order() {
        let params = LaunchParams {
            no_boot_boost: true,
            show_logos: false,
            skip_steam_init: true,
            online: true,
            disable_arxan: false,
            diagnostics: false,
        };
        let args = compose_args(Path::new("/games/nightreign.exe"), Path::new("/mods/current.me3"), &params);
        assert_eq!(
            args,
            vec![
                "launch", "--exe", "/games/nightreign.exe", "--no-boot-boost", "--skip-steam-init", "--online",
                "--game", "nightreign", "-p", "/mods/current.me3",
            ]
        );
    }

    #[tokio::test]
    async fn launch_fails_fast_on_a_missing_game_exe_without_touching_the_profile() {
        let model = ModConfigModel::new();
        let params = LaunchParams::default();
        let result = launch(Path::new("/no/such/path/wrong_name.exe"), &model, &params).await;
        assert!(matches!(result, Err(LaunchError::WrongGameExe { .. })));
    }
}
