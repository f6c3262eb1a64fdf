//! Launch-parameter sidecar.
//!
//! A small boolean-only JSON document read alongside the active profile,
//! translated into the loader's own flag syntax.

use serde::{Deserialize, Serialize};

use mm_core::fsutil;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LaunchParams {
    #[serde(default)]
    pub no_boot_boost: bool,
    #[serde(default)]
    pub show_logos: bool,
    /// Always written as `true`; the loader requires Steam's own init to
    /// be skipped regardless of the other toggles.
    #[serde(default = "always_true")]
    pub skip_steam_init: bool,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub disable_arxan: bool,
    #[serde(default)]
    pub diagnostics: bool,
}

fn always_true() -> bool {
    true
}

impl Default for LaunchParams {
    /// The fallback used on any read/parse failure: `--skip-steam-init --online`.
    fn default() -> Self {
        Self {
            no_boot_boost: false,
            show_logos: false,
            skip_steam_init: true,
            online: true,
            disable_arxan: false,
            diagnostics: false,
        }
    }
}

impl LaunchParams {
    /// Loads the sidecar, falling back to [`Self::default`] if it's
    /// missing or unparsable — launch parameters are never fatal to a
    /// launch attempt.
    pub async fn load(path: &std::path::Path) -> Self {
        fsutil::read_json_tolerant(path).await.unwrap_or_default()
    }

    /// Translates the toggles into the loader's own flag syntax, in a
    /// fixed, stable order.
    #[must_use]
    pub fn to_loader_flags(&self) -> Vec<String> {
        let mut flags = Vec::new();
        if self.no_boot_boost {
            flags.push("--no-boot-boost".to_string());
        }
        if self.show_logos {
            flags.push("--show-logos".to_string());
        }
        // skip_steam_init is unconditional: always emitted regardless of
        // the stored value.
        flags.push("--skip-steam-init".to_string());
        if self.online {
            flags.push("--online".to_string());
        }
        if self.disable_arxan {
            flags.push("--disable-arxan".to_string());
        }
        if self.diagnostics {
            flags.push("-d".to_string());
        }
        flags
    }
}
