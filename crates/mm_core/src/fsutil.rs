//! Small filesystem helpers shared by the loader-file provisioner,
//! the tool provisioner, the mod scanner, and the room/registry
//! JSON stores.

use std::path::{Path, PathBuf};

use crate::error::{IntoIoError, IoError};

/// Extracts the members of `archive_path` whose filename (ignoring any
/// internal directory nesting) is in `wanted`, writing each flattened
/// into `dest_dir`. Non-matching members are skipped. Returns the set of
/// filenames that were actually found and extracted.
///
/// Extracts only the requested filenames rather than the whole archive,
/// flattening any internal directory nesting so callers never have to
/// know the archive's internal layout.
pub fn extract_named_files(
    archive_path: &Path,
    dest_dir: &Path,
    wanted: &[&str],
) -> Result<Vec<String>, zip::result::ZipError> {
    let file = std::fs::File::open(archive_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    std::fs::create_dir_all(dest_dir).ok();

    let mut found = Vec::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.is_dir() {
            continue;
        }
        let Some(name) = entry
            .enclosed_name()
            .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        else {
            continue;
        };
        if !wanted.contains(&name.as_str()) {
            continue;
        }
        let dest = dest_dir.join(&name);
        let mut out = std::fs::File::create(&dest)?;
        std::io::copy(&mut entry, &mut out)?;
        found.push(name);
    }
    Ok(found)
}

/// Reads the names of every direct child of `dir` (files and
/// directories alike). Returns an empty list if `dir` doesn't exist
/// rather than erroring, matching the scanner's tolerant startup
/// behavior.
pub async fn read_dir_names(dir: &Path) -> Result<Vec<String>, IoError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut entries = tokio::fs::read_dir(dir).await.dir(dir)?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.dir(dir)? {
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_owned());
        }
    }
    Ok(names)
}

/// Byte length of a file, or `None` if it doesn't exist / can't be read.
pub async fn file_len(path: &Path) -> Option<u64> {
    tokio::fs::metadata(path).await.ok().map(|m| m.len())
}

/// Reads a UTF-8 JSON file and deserializes it, returning `None` on any
/// I/O or parse error. Callers that must "never fail the startup load"
/// use this instead of propagating the error.
pub async fn read_json_tolerant<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let text = tokio::fs::read_to_string(path).await.ok()?;
    serde_json::from_str(&text).ok()
}

/// Full-file, pretty-printed, UTF-8 JSON rewrite. Fine for the small
/// per-room and per-registry files this is used on; no partial-write
/// support is needed.
pub async fn write_json_pretty<T: serde::Serialize>(
    path: &Path,
    value: &T,
) -> Result<(), IoError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            tokio::fs::create_dir_all(parent).await.path(parent)?;
        }
    }
    let text = serde_json::to_string_pretty(value).unwrap_or_default();
    tokio::fs::write(path, text).await.path(path)
}

/// `true` iff `child` is the same path as or nested inside `parent`,
/// after resolving both to absolute form as best-effort (falling back
/// to the un-resolved path if canonicalization fails, e.g. because the
/// path doesn't exist yet).
#[must_use]
pub fn is_inside(parent: &Path, child: &Path) -> bool {
    let parent = canonicalize_best_effort(parent);
    let child = canonicalize_best_effort(child);
    child == parent || child.starts_with(&parent)
}

#[must_use]
pub fn canonicalize_best_effort(p: &Path) -> PathBuf {
    std::fs::canonicalize(p).unwrap_or_else(|_| p.to_path_buf())
}
