use std::path::PathBuf;

use mm_core::{IoError, JsonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Io(#[from] IoError),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Json(#[from] JsonError),
}

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("malformed profile at line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

#[derive(Debug, Error)]
pub enum PresetError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("loader-file archive not found at {0:?}")]
    ArchiveMissing(PathBuf),
    #[error("could not read the loader-file archive: {0}")]
    Archive(String),
    #[error("required loader files still missing after extraction: {0:?}")]
    StillMissing(Vec<String>),
}

/// Per-file outcome of a provisioner `apply`/`remove` pass.
#[derive(Debug, Clone, Default)]
pub struct ProvisionReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl ProvisionReport {
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// `(success, reason)` outcome view used by every registry/model mutation.
/// Kept alongside the richer typed errors above rather than instead of
/// them: callers that want structure use the typed error, callers that
/// just want to show the user a line of text use this.
pub type Outcome = Result<(), String>;

#[must_use]
pub fn reject(reason: impl Into<String>) -> Outcome {
    Err(reason.into())
}
