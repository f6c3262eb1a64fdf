//! Preset Core (component F).
//!
//! Presets are loader-profile documents with a metadata prelude, stored
//! one file per `.me3` under a fixed sub-folder of the mod directory.

use std::{path::Path, sync::LazyLock};

use mm_core::IntoIoError;
use regex::Regex;

use crate::{
    error::PresetError,
    model::ModConfigModel,
    writer::{self, write_profile},
};

/// The `{ name, description, icon }` prelude written ahead of a
/// preset's profile body.
#[derive(Debug, Clone)]
pub struct PresetMetadata {
    pub name: String,
    pub description: String,
    pub icon: String,
}

#[derive(Debug, Clone, Default)]
pub struct PresetDependencies {
    pub packages: Vec<String>,
    pub natives: Vec<String>,
}

/// One scanned preset: name, description, icon, path, resolved
/// dependencies, missing dependencies, and whether it's launchable.
#[derive(Debug, Clone)]
pub struct PresetInfo {
    pub name: String,
    pub description: String,
    pub icon: String,
    pub path: std::path::PathBuf,
    pub dependencies: PresetDependencies,
    pub missing: Vec<String>,
    pub available: bool,
}

const DEFAULT_ICON: &str = "🎮";

static PACKAGE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[\[packages\]\](.*?)(?:\[\[|\z)").unwrap());
static NATIVE_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\[\[natives\]\](.*?)(?:\[\[|\z)").unwrap());
static FIELD_SOURCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"source\s*=\s*"([^"]*)""#).unwrap());
static FIELD_PATH_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"path\s*=\s*"([^"]*)""#).unwrap());

/// Scans every `*.me3` file directly under `presets_dir`, sorted by
/// display name. Unreadable files are skipped, not fatal.
pub async fn scan_presets(presets_dir: &Path) -> Vec<PresetInfo> {
    let mut out = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(presets_dir).await else {
        return out;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("me3")) {
            if let Ok(info) = parse_preset_file(&path).await {
                out.push(info);
            }
        }
    }
    out.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

/// Parses one preset file: metadata prelude, declared dependencies, and
/// their resolution against the filesystem relative to the preset's own
/// directory.
///
/// # Errors
/// If the file cannot be read.
pub async fn parse_preset_file(path: &Path) -> Result<PresetInfo, PresetError> {
    let content = tokio::fs::read_to_string(path).await.path(path)?;

    let name = extract_metadata(&content, "name").unwrap_or_else(|| {
        path.file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    });
    let description = extract_metadata(&content, "description").unwrap_or_default();
    let icon = extract_metadata(&content, "icon").unwrap_or_else(|| DEFAULT_ICON.to_string());
    let dependencies = parse_dependencies(&content);

    let preset_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let missing = resolve_missing(&dependencies, preset_dir).await;
    let available = missing.is_empty();

    Ok(PresetInfo {
        name,
        description,
        icon,
        path: path.to_path_buf(),
        dependencies,
        missing,
        available,
    })
}

fn extract_metadata(content: &str, key: &str) -> Option<String> {
    let pattern = format!(r"(?m)^#\s*{}:\s*(.+)$", regex::escape(key));
    Regex::new(&pattern)
        .ok()?
        .captures(content)
        .map(|c| c[1].trim().to_string())
}

/// Extracts every package `source` and native `path` string from the
/// preset body, tolerant of surrounding comments or hand edits.
fn parse_dependencies(content: &str) -> PresetDependencies {
    let mut deps = PresetDependencies::default();
    for block in PACKAGE_BLOCK_RE.captures_iter(content) {
        if let Some(src) = FIELD_SOURCE_RE.captures(&block[1]) {
            deps.packages.push(src[1].trim_end_matches('/').to_string());
        }
    }
    for block in NATIVE_BLOCK_RE.captures_iter(content) {
        if let Some(p) = FIELD_PATH_RE.captures(&block[1]) {
            deps.natives.push(p[1].to_string());
        }
    }
    deps
}

async fn resolve_missing(dependencies: &PresetDependencies, preset_dir: &Path) -> Vec<String> {
    let mut missing = Vec::new();
    for raw in &dependencies.packages {
        let resolved = preset_dir.join(raw);
        if !tokio::fs::try_exists(&resolved).await.unwrap_or(false) {
            missing.push(format!("package: {}", display_name(raw)));
        }
    }
    for raw in &dependencies.natives {
        let resolved = preset_dir.join(raw);
        if !tokio::fs::try_exists(&resolved).await.unwrap_or(false) {
            missing.push(format!("native: {}", display_name(raw)));
        }
    }
    missing
}

fn display_name(raw: &str) -> String {
    Path::new(raw)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// Generates a preset document from the current model: a metadata
/// prelude followed by the same profile format the active profile
/// uses, with every internal (non-external) source/path given a
/// parent-directory prefix so it resolves correctly from the presets
/// sub-folder.
#[must_use]
pub fn generate_preset(model: &ModConfigModel, metadata: &PresetMetadata) -> String {
    let mut out = String::new();
    out.push_str(&format!("# name: {}\n", metadata.name));
    out.push_str(&format!("# description: {}\n", metadata.description));
    out.push_str(&format!("# icon: {}\n", metadata.icon));
    out.push('\n');
    out.push_str(&write_profile(&prefix_for_preset(model)));
    out
}

fn prefix_for_preset(model: &ModConfigModel) -> ModConfigModel {
    let mut out = model.clone();
    for pkg in out.packages.iter_mut().filter(|p| !p.is_external) {
        pkg.source = format!("../{}", pkg.source);
    }
    for native in out.natives.iter_mut().filter(|n| !n.is_external) {
        native.path = format!("../{}", native.path);
    }
    out
}

/// Parses a preset document's profile body back into a model, undoing
/// the parent-directory prefix [`generate_preset`] adds to internal
/// entries. Used for the preset round-trip property.
///
/// # Errors
/// If the body isn't well-formed loader-profile syntax.
pub fn parse_preset_profile(content: &str) -> Result<ModConfigModel, PresetError> {
    let body: Vec<&str> = content
        .lines()
        .skip_while(|l| {
            let t = l.trim();
            t.is_empty() || t.starts_with('#')
        })
        .collect();
    let mut model = writer::parse_profile(&body.join("\n"))?;
    for pkg in &mut model.packages {
        if let Some(stripped) = pkg.source.strip_prefix("../") {
            pkg.source = stripped.to_string();
        } else {
            pkg.is_external = true;
        }
    }
    for native in &mut model.natives {
        if let Some(stripped) = native.path.strip_prefix("../") {
            native.path = stripped.to_string();
        } else {
            native.is_external = true;
        }
    }
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_metadata_keys() {
        let content = "# name: My Preset\n# description: A cool setup\n# icon: 🔥\n\n[[packages]]\n";
        assert_eq!(extract_metadata(content, "name").as_deref(), Some("My Preset"));
        assert_eq!(extract_metadata(content, "description").as_deref(), Some("A cool setup"));
        assert_eq!(extract_metadata(content, "icon").as_deref(), Some("🔥"));
    }

    #[test]
    fn parses_package_and_native_dependency_paths() {
        let content = r#"
[[packages]]
id = "ModA"
source = "../ModA"

[[natives]]
path = "../libs/nrsc.dll"
"#;
        let deps = parse_dependencies(content);
        assert_eq!(deps.packages, vec!["../ModA".to_string()]);
        assert_eq!(deps.natives, vec!["../libs/nrsc.dll".to_string()]);
    }

    #[tokio::test]
    async fn missing_dependency_marks_preset_unavailable() {
        let base = std::env::temp_dir().join(format!("mm_preset_test_{}", std::process::id()));
        let mods_dir = base.join("Mods");
        let presets_dir = mods_dir.join("list");
        tokio::fs::create_dir_all(&presets_dir).await.unwrap();

        let content = "# name: Missing Demo\n\n[[packages]]\nid = \"ModX\"\nsource = \"../ModX\"\n\n";
        let preset_path = presets_dir.join("demo.me3");
        tokio::fs::write(&preset_path, content).await.unwrap();

        let info = parse_preset_file(&preset_path).await.unwrap();
        assert!(!info.available);
        assert_eq!(info.missing, vec!["package: ModX".to_string()]);

        tokio::fs::remove_dir_all(&base).await.ok();
    }

    #[test]
    fn generate_then_parse_round_trips_the_model() {
        let mut model = ModConfigModel::new();
        model.add_package("A", "A", true);
        model.add_native("nrsc.dll");
        model.set_nrsc_preload("nrsc.dll", true);

        let metadata = PresetMetadata {
            name: "Test".to_string(),
            description: "desc".to_string(),
            icon: DEFAULT_ICON.to_string(),
        };
        let text = generate_preset(&model, &metadata);
        assert!(text.contains("source = \"../A\""));

        let parsed = parse_preset_profile(&text).unwrap();
        assert_eq!(parsed.packages.len(), 1);
        assert_eq!(parsed.packages[0].id, "A");
        assert_eq!(parsed.packages[0].source, "A");
        assert!(parsed.natives[0].is_nrsc());
        assert!(parsed.natives[0].preload);
    }
}
