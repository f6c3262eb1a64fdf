//! Path Resolver.
//!
//! Exposes the install root and every stable sub-path derived from it.
//! No other component may hard-code an absolute path; they all go
//! through here, the same way every other crate in this workspace
//! anchors itself on a single root static instead of re-deriving paths.

use std::{
    path::{Path, PathBuf},
    sync::LazyLock,
};

use crate::error::{IntoIoError, IoError};

/// The resolved installation root.
///
/// # Panics
/// If the root can neither be derived from the running executable nor
/// from the current directory (practically never, barring a broken
/// filesystem).
pub static INSTALL_ROOT: LazyLock<PathBuf> = LazyLock::new(|| install_root().unwrap());

/// Returns the path to the installation root.
///
/// Rule: if running from a bundled single-file distribution, the root is
/// the executable's own directory. Otherwise (running from a source
/// checkout / `cargo run`), the root is the workspace directory, two
/// levels above this crate's own source.
///
/// An explicit `MODMESH_DIR` environment variable always wins, giving
/// packaging scripts and tests a portable-mode override.
///
/// # Errors
/// If the executable's path or the current directory cannot be read.
pub fn install_root() -> Result<PathBuf, IoError> {
    if let Ok(over) = std::env::var("MODMESH_DIR") {
        return Ok(canonicalize(&over));
    }

    let root = if is_bundled() {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .ok_or(IoError::InstallRootNotFound)?
    } else {
        // Two levels above this crate's own manifest directory, i.e. the
        // workspace root.
        option_env!("CARGO_MANIFEST_DIR")
            .map(|d| PathBuf::from(d).join("..").join(".."))
            .map_or_else(|| std::env::current_dir().path(&PathBuf::from(".")), |p| Ok(p))?
    };

    Ok(canonicalize(&root))
}

/// Whether this binary is running as a bundled single-file distribution
/// rather than a development build.
///
/// A released, packaged executable has no accompanying `Cargo.toml`
/// workspace around it, so we treat "built in release mode and not
/// invoked through `cargo run`" as bundled. This is surfaced as an
/// overridable env var so packaging scripts can force either mode.
#[must_use]
pub fn is_bundled() -> bool {
    if let Ok(flag) = std::env::var("MODMESH_BUNDLED") {
        return flag == "1" || flag.eq_ignore_ascii_case("true");
    }
    !cfg!(debug_assertions)
}

fn canonicalize(p: &Path) -> PathBuf {
    std::fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf())
}

/// Internal mod tree: `Mods/`.
#[must_use]
pub fn mods_dir() -> PathBuf {
    INSTALL_ROOT.join("Mods")
}

/// Active profile: `Mods/current.me3`.
#[must_use]
pub fn current_profile_path() -> PathBuf {
    mods_dir().join("current.me3")
}

/// External-mod registry: `Mods/external_mods.json`.
#[must_use]
pub fn external_mods_registry_path() -> PathBuf {
    mods_dir().join("external_mods.json")
}

/// Presets folder: `Mods/list/`.
#[must_use]
pub fn presets_dir() -> PathBuf {
    mods_dir().join("list")
}

/// Overlay control root: `ESR/`.
#[must_use]
pub fn esr_dir() -> PathBuf {
    INSTALL_ROOT.join("ESR")
}

/// Overlay user config (app-side): `ESR/easytier_config.json`.
#[must_use]
pub fn overlay_user_config_path() -> PathBuf {
    esr_dir().join("easytier_config.json")
}

/// Generated daemon config: `ESR/easytier.toml`.
#[must_use]
pub fn overlay_daemon_config_path() -> PathBuf {
    esr_dir().join("easytier.toml")
}

/// Room store: `ESR/rooms_config/`.
#[must_use]
pub fn rooms_dir() -> PathBuf {
    esr_dir().join("rooms_config")
}

/// Overlay daemon's own log directory: `ESR/logs/`.
#[must_use]
pub fn overlay_log_dir() -> PathBuf {
    esr_dir().join("logs")
}

/// The overlay daemon executable: `ESR/easytier-core.exe`.
#[must_use]
pub fn overlay_daemon_exe_path() -> PathBuf {
    esr_dir().join(OVERLAY_DAEMON_EXE_NAME)
}

/// The overlay daemon's CLI companion: `ESR/easytier-cli.exe`.
#[must_use]
pub fn overlay_cli_exe_path() -> PathBuf {
    esr_dir().join(OVERLAY_CLI_EXE_NAME)
}

pub const OVERLAY_DAEMON_EXE_NAME: &str = "easytier-core.exe";
pub const OVERLAY_CLI_EXE_NAME: &str = "easytier-cli.exe";

/// The network driver the daemon requires to create a virtual adapter:
/// `ESR/wintun.dll`.
#[must_use]
pub fn overlay_driver_path() -> PathBuf {
    esr_dir().join("wintun.dll")
}

/// Optimizer toggles: `ESR/network_optimization.json`.
#[must_use]
pub fn network_optimization_config_path() -> PathBuf {
    esr_dir().join("network_optimization.json")
}

/// Loader-file bundle archive: `OnlineFix/OnlineFix.zip`. Distinct from
/// the tool provisioner's own `ESR/tool.zip` archive, which packages an
/// unrelated set of auxiliary binaries.
#[must_use]
pub fn loader_file_archive_path() -> PathBuf {
    INSTALL_ROOT.join("OnlineFix").join("OnlineFix.zip")
}

/// Extracted loader files live alongside the install root's `OnlineFix/`
/// directory.
#[must_use]
pub fn loader_file_extracted_dir() -> PathBuf {
    INSTALL_ROOT.join("OnlineFix")
}

/// Loader-file extraction sentinel: `OnlineFix/.onlinefix_extracted`.
#[must_use]
pub fn loader_file_extracted_flag_path() -> PathBuf {
    loader_file_extracted_dir().join(".onlinefix_extracted")
}

/// Auxiliary-tool bundle archive: `OnlineFix/tool.zip`. Shares a
/// directory with the loader-file archive but is an entirely separate
/// file, consumed only by the tool provisioner (component L).
#[must_use]
pub fn tool_archive_path() -> PathBuf {
    loader_file_extracted_dir().join("tool.zip")
}

/// Pre-migration location of the tool archive: `ESR/tool.zip`. The
/// provisioner moves a file found here into [`tool_archive_path`] the
/// first time it runs against an older install.
#[must_use]
pub fn legacy_tool_archive_path() -> PathBuf {
    esr_dir().join("tool.zip")
}

/// Extracted auxiliary tools: `ESR/tool/`.
#[must_use]
pub fn tool_dir() -> PathBuf {
    esr_dir().join("tool")
}

/// Tool-provisioner sentinel: `ESR/tool/.tool_extracted`.
#[must_use]
pub fn tool_extracted_flag_path() -> PathBuf {
    tool_dir().join(".tool_extracted")
}

/// Rotating log files: `logs/`.
#[must_use]
pub fn logs_dir() -> PathBuf {
    INSTALL_ROOT.join("logs")
}

/// The mod loader's own install directory: `me3p/`.
#[must_use]
pub fn loader_dir() -> PathBuf {
    INSTALL_ROOT.join("me3p")
}

/// The mod loader executable: `me3p/bin/me3.exe`.
#[must_use]
pub fn loader_exe_path() -> PathBuf {
    loader_dir().join("bin").join(LOADER_EXE_NAME)
}

/// The mod loader's filename, used both to locate it and to recognize
/// its process for the launcher's pre-launch cleanup sweep.
pub const LOADER_EXE_NAME: &str = "me3.exe";

/// The mod loader's helper process, swept alongside the loader and the
/// game itself before a launch.
pub const LOADER_HELPER_EXE_NAME: &str = "me3-launcher.exe";

/// The game executable's expected filename.
pub const GAME_EXE_NAME: &str = "nightreign.exe";

/// Launch-parameter sidecar: `Mods/launch_params.json`.
#[must_use]
pub fn launch_params_path() -> PathBuf {
    mods_dir().join("launch_params.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_env_override_wins() {
        let tmp = std::env::temp_dir();
        std::env::set_var("MODMESH_DIR", &tmp);
        let root = install_root().unwrap();
        std::env::remove_var("MODMESH_DIR");
        assert_eq!(root, canonicalize(&tmp));
    }
}
