//! Mod Scanner & Classifier (component C).
//!
//! Walks the mod directory, tags each direct child with a [`ModKind`],
//! and enumerates injectable native libraries, using async I/O
//! matching [`mm_core::fsutil`]'s conventions.

use std::path::Path;

use crate::{
    registry::ExternalModRegistry,
    types::{
        ModKind, CONTENT_ARCHIVE_EXTS, CONTENT_FOLDER_NAMES, CONTENT_MARKER_FILE,
        EXCLUDED_NATIVE_DLLS,
    },
};

/// One direct child of the mod directory, classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedEntry {
    pub name: String,
    pub kind: ModKind,
}

/// The result of a full directory scan: every direct sub-directory with
/// its tag, every enumerated native-library path (internal, including
/// the legacy top-level layout), and the external registry's entries
/// projected with their UI suffix.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub entries: Vec<ScannedEntry>,
    pub natives: Vec<String>,
    pub external_packages: Vec<String>,
    pub external_natives: Vec<String>,
}

const IGNORED_DIR_NAMES: &[&str] = &["__pycache__", ".git"];

/// Scans `mods_dir`, classifying every direct sub-directory and
/// enumerating every native library path, then folds in `registry`'s
/// entries for display. Also honors the legacy layout of a DLL placed
/// directly in the mod root rather than inside its own sub-directory.
pub async fn scan_mod_directory(mods_dir: &Path, registry: &ExternalModRegistry) -> ScanResult {
    let mut result = ScanResult::default();

    let Ok(mut entries) = tokio::fs::read_dir(mods_dir).await else {
        return result;
    };

    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        let Some(name) = path.file_name().map(|n| n.to_string_lossy().to_string()) else {
            continue;
        };

        if path.is_dir() {
            if IGNORED_DIR_NAMES.contains(&name.as_str()) {
                continue;
            }
            let kind = classify_entry(&path).await;
            if kind.is_native_like() {
                result.natives.extend(scan_dlls(&path).await);
            }
            result.entries.push(ScannedEntry { name, kind });
        } else if is_dll(&path) {
            // Legacy layout: a bare DLL directly under the mod root.
            result.natives.push(name);
        }
    }

    for (mod_name, path) in registry.packages() {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            result.external_packages.push(mod_name.to_string());
        }
    }
    for (dll_name, path) in registry.natives() {
        if tokio::fs::try_exists(path).await.unwrap_or(false) {
            result.external_natives.push(dll_name.to_string());
        }
    }

    result
}

/// Classifies one direct child of the mod directory into its [`ModKind`].
pub async fn classify_entry(path: &Path) -> ModKind {
    if !path.is_dir() {
        return ModKind::Unknown;
    }
    let has_marker = has_content_markers(path).await;
    let has_dll = has_any_dll(path).await;
    match (has_marker, has_dll) {
        (true, true) => ModKind::Mixed,
        (true, false) => ModKind::ContentPackage,
        (false, true) => ModKind::NativeLibrary,
        (false, false) => ModKind::Unknown,
    }
}

async fn has_content_markers(dir: &Path) -> bool {
    if tokio::fs::try_exists(dir.join(CONTENT_MARKER_FILE))
        .await
        .unwrap_or(false)
    {
        return true;
    }
    for folder in CONTENT_FOLDER_NAMES {
        if tokio::fs::try_exists(dir.join(folder))
            .await
            .unwrap_or(false)
        {
            return true;
        }
    }
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return false;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if CONTENT_ARCHIVE_EXTS.contains(&ext.to_ascii_lowercase().as_str()) {
                return true;
            }
        }
    }
    false
}

async fn has_any_dll(dir: &Path) -> bool {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return false;
    };
    let mut subdirs = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if is_dll(&path) {
            return true;
        }
    }
    // One level of nesting only.
    for sub in subdirs {
        let Ok(mut sub_entries) = tokio::fs::read_dir(&sub).await else {
            continue;
        };
        while let Ok(Some(entry)) = sub_entries.next_entry().await {
            if is_dll(&entry.path()) {
                return true;
            }
        }
    }
    false
}

/// Enumerates injectable DLLs under `dir`: directly in its root and one
/// level down, in the form `<mod-folder>/<dll-name>` or
/// `<mod-folder>/<sub>/<dll-name>`.
pub async fn scan_dlls(dir: &Path) -> Vec<String> {
    let mut found = Vec::new();
    let dir_name = file_name(dir);

    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return found;
    };
    let mut subdirs = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if is_dll(&path) {
            found.push(format!("{dir_name}/{}", file_name(&path)));
        }
    }
    for sub in subdirs {
        let sub_name = file_name(&sub);
        let Ok(mut sub_entries) = tokio::fs::read_dir(&sub).await else {
            continue;
        };
        while let Ok(Some(entry)) = sub_entries.next_entry().await {
            let path = entry.path();
            if is_dll(&path) {
                found.push(format!("{dir_name}/{sub_name}/{}", file_name(&path)));
            }
        }
    }
    found
}

fn is_dll(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("dll"))
        && !EXCLUDED_NATIVE_DLLS
            .iter()
            .any(|ex| file_name(path).eq_ignore_ascii_case(ex))
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn mkdir(p: &Path) {
        tokio::fs::create_dir_all(p).await.unwrap();
    }
    async fn touch(p: &Path) {
        tokio::fs::write(p, b"").await.unwrap();
    }

    #[tokio::test]
    async fn classifies_content_package_by_regulation_bin() {
        let dir = std::env::temp_dir().join(format!("mm_test_pkg_{}", std::process::id()));
        mkdir(&dir).await;
        touch(&dir.join(CONTENT_MARKER_FILE)).await;
        assert_eq!(classify_entry(&dir).await, ModKind::ContentPackage);
        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn classifies_native_library_by_dll() {
        let dir = std::env::temp_dir().join(format!("mm_test_dll_{}", std::process::id()));
        mkdir(&dir).await;
        touch(&dir.join("cool_mod.dll")).await;
        assert_eq!(classify_entry(&dir).await, ModKind::NativeLibrary);
        let dlls = scan_dlls(&dir).await;
        let name = dir.file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(dlls, vec![format!("{name}/cool_mod.dll")]);
        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn excluded_vendor_dll_does_not_count() {
        let dir = std::env::temp_dir().join(format!("mm_test_vendor_{}", std::process::id()));
        mkdir(&dir).await;
        touch(&dir.join("libzstd.dll")).await;
        assert_eq!(classify_entry(&dir).await, ModKind::Unknown);
        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn mixed_when_both_content_and_dll_present() {
        let dir = std::env::temp_dir().join(format!("mm_test_mixed_{}", std::process::id()));
        mkdir(&dir).await;
        touch(&dir.join(CONTENT_MARKER_FILE)).await;
        touch(&dir.join("inject.dll")).await;
        assert_eq!(classify_entry(&dir).await, ModKind::Mixed);
        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
