use std::path::PathBuf;

use mm_core::{IoError, JsonError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("the overlay is already {0}")]
    AlreadyInState(&'static str),
    #[error("daemon binary not found at {0:?}")]
    DaemonMissing(PathBuf),
    #[error("daemon CLI not found at {0:?}")]
    CliMissing(PathBuf),
    #[error("required driver component not found at {0:?}; a driver install or reboot may be needed")]
    DriverMissing(PathBuf),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Io(#[from] IoError),
    #[error("elevation was denied or the daemon process could not be located: {0}")]
    Elevation(#[from] mm_core::process::ElevationError),
    #[error("status poll timed out")]
    PollTimeout,
}

#[derive(Debug, Error)]
pub enum RoomError {
    #[error(transparent)]
    Io(#[from] IoError),
    #[error(transparent)]
    Json(#[from] JsonError),
    #[error("the overlay is running; stop it before deleting the active room")]
    DeleteRefusedWhileRunning,
    #[error("network name contains a reserved character: {0:?}")]
    ReservedCharacter(char),
}

#[derive(Debug, Error)]
pub enum ShareCodeError {
    #[error("share code is missing the expected {0:?} scheme prefix")]
    BadPrefix(&'static str),
    #[error("share code is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("share code does not contain valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("share code is missing required field {0:?}")]
    MissingField(&'static str),
}

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("auxiliary-tool archive not found at {0:?}")]
    ArchiveMissing(PathBuf),
    #[error("could not read the auxiliary-tool archive: {0}")]
    Archive(String),
    #[error("integrity check failed for {0:?}: {1}")]
    IntegrityCheckFailed(PathBuf, String),
}
