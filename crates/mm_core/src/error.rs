use std::path::PathBuf;

use thiserror::Error;

#[derive(Clone, Debug, Error)]
pub enum IoError {
    #[error("at path {path:?}, error: {error}")]
    Io { error: String, path: PathBuf },
    #[error("couldn't read directory {parent:?}, error {error}")]
    ReadDir { error: String, parent: PathBuf },
    #[error("data/config directory not found")]
    InstallRootNotFound,
    #[error("directory is outside parent directory. POTENTIAL SECURITY RISK AVOIDED")]
    DirEscapeAttack,
}

/// Converts a `std::io::Result<T>` into `Result<T, IoError>`, attaching
/// the path that was being operated on so the message is actionable.
pub trait IntoIoError<T = ()> {
    type Output;
    #[allow(clippy::missing_errors_doc)]
    fn path(self, p: impl Into<PathBuf>) -> Self::Output;
    #[allow(clippy::missing_errors_doc)]
    fn dir(self, p: impl Into<PathBuf>) -> Self::Output;
}

impl<T> IntoIoError<T> for std::io::Result<T> {
    type Output = Result<T, IoError>;
    fn path(self, p: impl Into<PathBuf>) -> Result<T, IoError> {
        self.map_err(|err| IoError::Io {
            error: err.to_string(),
            path: p.into(),
        })
    }

    fn dir(self, p: impl Into<PathBuf>) -> Result<T, IoError> {
        self.map_err(|err| IoError::ReadDir {
            error: err.to_string(),
            parent: p.into(),
        })
    }
}

impl IntoIoError for std::io::Error {
    type Output = IoError;
    fn path(self, p: impl Into<PathBuf>) -> IoError {
        IoError::Io {
            error: self.to_string(),
            path: p.into(),
        }
    }

    fn dir(self, p: impl Into<PathBuf>) -> IoError {
        IoError::ReadDir {
            error: self.to_string(),
            parent: p.into(),
        }
    }
}

pub trait IntoStringError<T> {
    #[allow(clippy::missing_errors_doc)]
    fn strerr(self) -> Result<T, String>;
}

impl<T, E: ToString> IntoStringError<T> for Result<T, E> {
    fn strerr(self) -> Result<T, String> {
        self.map_err(|err| err.to_string())
    }
}

const JSON_ERR_PREFIX: &str = "could not parse JSON:\n";

#[derive(Debug, Error)]
pub enum JsonError {
    #[error("{JSON_ERR_PREFIX}while parsing JSON:\n{error}\n\n{json}")]
    From {
        error: serde_json::Error,
        json: String,
    },
    #[error("{JSON_ERR_PREFIX}while converting object to JSON:\n{error}")]
    To { error: serde_json::Error },
}

pub trait IntoJsonError<T> {
    #[allow(clippy::missing_errors_doc)]
    fn json(self, p: String) -> Result<T, JsonError>;
    #[allow(clippy::missing_errors_doc)]
    fn json_to(self) -> Result<T, JsonError>;
}

impl<T> IntoJsonError<T> for Result<T, serde_json::Error> {
    fn json(self, json: String) -> Result<T, JsonError> {
        self.map_err(|error: serde_json::Error| JsonError::From { error, json })
    }

    fn json_to(self) -> Result<T, JsonError> {
        self.map_err(|error: serde_json::Error| JsonError::To { error })
    }
}

#[derive(Debug, Error)]
pub enum JsonFileError {
    #[error(transparent)]
    SerdeError(#[from] JsonError),
    #[error(transparent)]
    Io(#[from] IoError),
}
