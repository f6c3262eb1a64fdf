use std::path::PathBuf;

use mm_core::IoError;
use mm_mods::error::ProfileError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("game executable not found at {0:?}")]
    GameNotFound(PathBuf),
    #[error("game executable {found:?} does not match the expected name {expected:?}")]
    WrongGameExe { found: PathBuf, expected: &'static str },
    #[error("loader executable not found at {0:?}")]
    LoaderNotFound(PathBuf),
    #[error("preset not found at {0:?}")]
    PresetNotFound(PathBuf),
    #[error("could not write the active profile: {0}")]
    ProfileWrite(#[from] IoError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
    #[error("failed to spawn the loader: {0}")]
    Spawn(std::io::Error),
}
