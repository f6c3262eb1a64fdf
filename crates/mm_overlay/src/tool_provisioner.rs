//! Tool Provisioner (component L).
//!
//! Behaves analogously to `mm_mods::provisioner` (component B) for a
//! second, unrelated archive of auxiliary helper binaries, with a
//! stricter per-file integrity check and two independent caches.

use std::{
    collections::HashMap,
    path::Path,
    sync::Mutex,
    time::{Duration, Instant},
};

use mm_core::{fsutil, paths};

use crate::error::ProvisionError;

/// The fixed set of auxiliary binaries the tool archive provides.
pub const TOOL_FILES: &[&str] = &["WinIPBroadcast.exe", "MicrosoftEdgeWebview2Setup.exe"];

const SENTINEL_FRESHNESS: Duration = Duration::from_secs(60 * 60);
const MEMORY_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

struct CacheEntry {
    stamped_at: Instant,
    ok: bool,
}

/// Holds the in-memory 5-minute TTL cache, independent of the on-disk
/// sentinel's 1-hour fast path.
#[derive(Default)]
pub struct ToolProvisioner {
    cache: Mutex<Option<CacheEntry>>,
}

impl ToolProvisioner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures every tool file is present and passes its integrity
    /// check, extracting from the bundled archive (migrating the legacy
    /// archive location first, if needed) when it isn't.
    ///
    /// # Errors
    /// If no archive is available to extract from, or extraction leaves
    /// files still missing/corrupt.
    pub async fn ensure_available(&self) -> Result<(), ProvisionError> {
        if let Some(ok) = self.fresh_memory_result() {
            if ok {
                return Ok(());
            }
        }

        migrate_legacy_archive().await;

        let dest_dir = paths::tool_dir();
        let sentinel = paths::tool_extracted_flag_path();

        let sentinel_fast_path = sentinel_is_fresh(&sentinel).await;
        let passes = all_pass_integrity(&dest_dir).await;

        if sentinel_fast_path && passes {
            self.record(true);
            return Ok(());
        }

        if passes {
            touch_sentinel(&sentinel).await;
            self.record(true);
            return Ok(());
        }

        let archive = paths::tool_archive_path();
        if !tokio::fs::try_exists(&archive).await.unwrap_or(false) {
            self.record(false);
            return Err(ProvisionError::ArchiveMissing(archive));
        }

        fsutil::extract_named_files(&archive, &dest_dir, TOOL_FILES).map_err(|e| ProvisionError::Archive(e.to_string()))?;

        if !all_pass_integrity(&dest_dir).await {
            self.record(false);
            return Err(ProvisionError::IntegrityCheckFailed(dest_dir, "required files still missing or corrupt after extraction".to_string()));
        }

        touch_sentinel(&sentinel).await;
        self.record(true);
        Ok(())
    }

    fn fresh_memory_result(&self) -> Option<bool> {
        let guard = self.cache.lock().unwrap();
        let entry = guard.as_ref()?;
        if entry.stamped_at.elapsed() < MEMORY_CACHE_TTL {
            Some(entry.ok)
        } else {
            None
        }
    }

    fn record(&self, ok: bool) {
        *self.cache.lock().unwrap() = Some(CacheEntry {
            stamped_at: Instant::now(),
            ok,
        });
    }

    /// Absolute path to a provisioned tool by filename, for callers that
    /// need to launch it.
    #[must_use]
    pub fn tool_path(&self, filename: &str) -> std::path::PathBuf {
        paths::tool_dir().join(filename)
    }
}

async fn migrate_legacy_archive() {
    let legacy = paths::legacy_tool_archive_path();
    let current = paths::tool_archive_path();
    if tokio::fs::try_exists(&current).await.unwrap_or(false) {
        return;
    }
    if tokio::fs::try_exists(&legacy).await.unwrap_or(false) {
        if let Some(parent) = current.parent() {
            tokio::fs::create_dir_all(parent).await.ok();
        }
        tokio::fs::rename(&legacy, &current).await.ok();
    }
}

async fn sentinel_is_fresh(sentinel: &Path) -> bool {
    let Ok(meta) = tokio::fs::metadata(sentinel).await else {
        return false;
    };
    let Ok(modified) = meta.modified() else {
        return false;
    };
    modified.elapsed().is_ok_and(|age| age < SENTINEL_FRESHNESS)
}

async fn touch_sentinel(sentinel: &Path) {
    if let Some(parent) = sentinel.parent() {
        tokio::fs::create_dir_all(parent).await.ok();
    }
    let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    tokio::fs::write(sentinel, format!("tools extracted at {stamp}")).await.ok();
}

async fn all_pass_integrity(dest_dir: &Path) -> bool {
    for file in TOOL_FILES {
        if !check_integrity(&dest_dir.join(file)).await {
            return false;
        }
    }
    true
}

/// A single file's integrity check: exists, non-zero size, first 1 KiB
/// readable, and for `.exe` files the PE `MZ` header.
async fn check_integrity(path: &Path) -> bool {
    let Some(len) = fsutil::file_len(path).await else {
        return false;
    };
    if len == 0 {
        return false;
    }

    let Ok(bytes) = tokio::fs::read(path).await else {
        return false;
    };
    let head_len = bytes.len().min(1024);
    if head_len == 0 {
        return false;
    }

    if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("exe")) {
        return bytes.len() >= 2 && &bytes[..2] == b"MZ";
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("mm_tool_provisioner_test_{tag}_{}", std::process::id()))
    }

    #[tokio::test]
    async fn integrity_check_requires_the_pe_header_for_exe_files() {
        let dir = scratch_dir("integrity");
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let good = dir.join("Good.exe");
        tokio::fs::write(&good, b"MZ-rest-of-a-fake-pe-header").await.unwrap();
        assert!(check_integrity(&good).await);

        let bad = dir.join("Bad.exe");
        tokio::fs::write(&bad, b"not a pe file").await.unwrap();
        assert!(!check_integrity(&bad).await);

        let empty = dir.join("Empty.exe");
        tokio::fs::write(&empty, b"").await.unwrap();
        assert!(!check_integrity(&empty).await);

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn non_exe_files_skip_the_pe_header_check() {
        let dir = scratch_dir("non_exe");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("readme.txt");
        tokio::fs::write(&path, b"hello").await.unwrap();
        assert!(check_integrity(&path).await);
        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn migrate_legacy_archive_moves_an_old_archive_into_place() {
        // Exercises the pure migration logic against the real static
        // paths is avoided here (those depend on the process-wide
        // install root); this test instead verifies the rename
        // primitive behaves as migrate_legacy_archive relies on it.
        let base = scratch_dir("migrate");
        tokio::fs::create_dir_all(&base).await.unwrap();
        let legacy = base.join("tool.zip");
        let current = base.join("OnlineFix").join("tool.zip");
        tokio::fs::write(&legacy, b"zip-bytes").await.unwrap();

        tokio::fs::create_dir_all(current.parent().unwrap()).await.unwrap();
        tokio::fs::rename(&legacy, &current).await.unwrap();

        assert!(tokio::fs::try_exists(&current).await.unwrap());
        assert!(!tokio::fs::try_exists(&legacy).await.unwrap());

        tokio::fs::remove_dir_all(&base).await.ok();
    }
}
