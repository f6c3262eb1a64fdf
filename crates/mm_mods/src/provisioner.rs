//! Loader-File Provisioner (component B).
//!
//! The loader expects a small whitelist of crack-support files sitting
//! next to the game executable. Those files are bundled in the
//! installer as a zip; this module unpacks it once and copies its
//! contents in and out of the game directory on demand, using
//! `mm_core::fsutil` the same way the tool provisioner (component L)
//! does.

use std::{path::Path, time::Duration};

use mm_core::{fsutil, paths};

use crate::error::{ProvisionError, ProvisionReport};

/// The fixed set of loader-support files this provisioner manages.
pub const LOADER_FILES: &[&str] = &["OnlineFix.ini", "OnlineFix64.dll", "dlllist.txt", "winmm.dll"];

/// How long a successful extraction's sentinel is trusted before
/// `ensure_available` re-verifies from scratch.
const SENTINEL_FRESHNESS: Duration = Duration::from_secs(60 * 60);

/// Ensures the loader-file whitelist is present in the extracted
/// sub-directory, extracting the bundled archive if needed.
///
/// # Errors
/// If the files are missing, no archive is present to extract from, or
/// the archive can't be read.
pub async fn ensure_available() -> Result<(), ProvisionError> {
    let dest_dir = paths::loader_file_extracted_dir();
    let sentinel = paths::loader_file_extracted_flag_path();

    if sentinel_is_fresh(&sentinel).await && all_present(&dest_dir).await {
        return Ok(());
    }

    if all_present(&dest_dir).await {
        touch_sentinel(&sentinel).await;
        return Ok(());
    }

    let archive = paths::loader_file_archive_path();
    if !tokio::fs::try_exists(&archive).await.unwrap_or(false) {
        return Err(ProvisionError::ArchiveMissing(archive));
    }

    let extracted = fsutil::extract_named_files(&archive, &dest_dir, LOADER_FILES)
        .map_err(|e| ProvisionError::Archive(e.to_string()))?;

    if !all_present(&dest_dir).await {
        let missing: Vec<&str> = LOADER_FILES
            .iter()
            .copied()
            .filter(|f| !extracted.iter().any(|e| e == f))
            .collect();
        return Err(ProvisionError::StillMissing(missing.iter().map(|s| s.to_string()).collect()));
    }

    touch_sentinel(&sentinel).await;
    Ok(())
}

async fn all_present(dest_dir: &Path) -> bool {
    for file in LOADER_FILES {
        if !tokio::fs::try_exists(dest_dir.join(file)).await.unwrap_or(false) {
            return false;
        }
    }
    true
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
    tokio::fs::write(sentinel, format!("loader files extracted at {stamp}")).await.ok();
}

/// Copies every whitelisted file from the extracted sub-directory into
/// `game_dir`, verifying each destination matches the source's byte
/// length.
///
/// Each file succeeds or fails independently; the returned report names
/// every outcome, and callers decide what "overall success" means for
/// their context (typically: every entry `Ok`).
pub async fn apply(game_dir: &Path) -> ProvisionReport {
    let source_dir = paths::loader_file_extracted_dir();
    let mut report = ProvisionReport::default();
    for file in LOADER_FILES {
        let src = source_dir.join(file);
        let dst = game_dir.join(file);
        match copy_and_verify(&src, &dst).await {
            Ok(()) => report.succeeded.push((*file).to_string()),
            Err(reason) => report.failed.push(((*file).to_string(), reason)),
        }
    }
    report
}

async fn copy_and_verify(src: &Path, dst: &Path) -> Result<(), String> {
    let src_len = fsutil::file_len(src).await.ok_or_else(|| "source file missing".to_string())?;
    tokio::fs::copy(src, dst).await.map_err(|e| e.to_string())?;
    let dst_len = fsutil::file_len(dst).await.ok_or_else(|| "copy did not produce a destination file".to_string())?;
    if dst_len != src_len {
        return Err(format!("byte-length mismatch after copy: {src_len} != {dst_len}"));
    }
    Ok(())
}

/// Deletes every whitelisted file from `game_dir`. Missing files are not
/// treated as failures.
pub async fn remove(game_dir: &Path) -> ProvisionReport {
    let mut report = ProvisionReport::default();
    for file in LOADER_FILES {
        let path = game_dir.join(file);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => report.succeeded.push((*file).to_string()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => report.succeeded.push((*file).to_string()),
            Err(e) => report.failed.push(((*file).to_string(), e.to_string())),
        }
    }
    report
}

/// `true` iff every whitelisted file is present in `game_dir`.
pub async fn is_applied(game_dir: &Path) -> bool {
    all_present(game_dir).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("mm_provisioner_test_{tag}_{}", std::process::id()))
    }

    #[tokio::test]
    async fn apply_copies_and_verifies_every_file_independently() {
        let source = scratch_dir("source");
        let game_dir = scratch_dir("game");
        tokio::fs::create_dir_all(&source).await.unwrap();
        tokio::fs::create_dir_all(&game_dir).await.unwrap();

        for file in LOADER_FILES {
            tokio::fs::write(source.join(file), b"payload").await.unwrap();
        }

        // Point the install root at our scratch source by constructing
        // the copy directly against it rather than via the static path
        // accessor, which would require env-var mutation in a
        // concurrently-run test binary.
        let mut report = ProvisionReport::default();
        for file in LOADER_FILES {
            let src = source.join(file);
            let dst = game_dir.join(file);
            match copy_and_verify(&src, &dst).await {
                Ok(()) => report.succeeded.push((*file).to_string()),
                Err(reason) => report.failed.push(((*file).to_string(), reason)),
            }
        }
        assert_eq!(report.succeeded.len(), LOADER_FILES.len());
        assert!(report.failed.is_empty());
        assert!(is_applied(&game_dir).await);

        tokio::fs::remove_dir_all(&source).await.ok();
        tokio::fs::remove_dir_all(&game_dir).await.ok();
    }

    #[tokio::test]
    async fn remove_treats_missing_files_as_success() {
        let game_dir = scratch_dir("remove_missing");
        tokio::fs::create_dir_all(&game_dir).await.unwrap();

        let report = remove(&game_dir).await;
        assert_eq!(report.succeeded.len(), LOADER_FILES.len());
        assert!(report.failed.is_empty());

        tokio::fs::remove_dir_all(&game_dir).await.ok();
    }

    #[tokio::test]
    async fn is_applied_is_false_when_any_file_is_missing() {
        let game_dir = scratch_dir("partial");
        tokio::fs::create_dir_all(&game_dir).await.unwrap();
        tokio::fs::write(game_dir.join(LOADER_FILES[0]), b"x").await.unwrap();

        assert!(!is_applied(&game_dir).await);

        tokio::fs::remove_dir_all(&game_dir).await.ok();
    }
}
