//! Error types for the profile manager.

use std::fmt;
use std::io;
use std::path::PathBuf;

use persona_attrs::{AttrError, Rejection};
use persona_codec::CodecError;
use serde::Serialize;
use thiserror::Error;

/// Errors raised by a [`Storage`](crate::Storage) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The underlying I/O call failed.
    #[error("{op} failed for {}: {source}", .path.display())]
    Io {
        /// Operation that failed.
        op: &'static str,
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },

    /// Nothing exists at the path.
    #[error("no such file or directory: {}", .0.display())]
    NotFound(PathBuf),

    /// A file was expected but a directory was found.
    #[error("is a directory: {}", .0.display())]
    IsDirectory(PathBuf),

    /// A directory was expected but a file was found.
    #[error("not a directory: {}", .0.display())]
    NotDirectory(PathBuf),
}

impl StorageError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            op,
            path: path.into(),
            source,
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors returned by profile manager operations that return a `Result`.
#[derive(Debug, Error)]
pub enum ProfileError {
    /// The codec selection could not be resolved, or a document could not
    /// be serialized.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The profile root starts with `~` but no home directory is known.
    #[error("could not determine the home directory to expand '~'")]
    NoHomeDir,

    /// A storage call failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// `init` has not completed, so there is no active profile.
    #[error("profile manager is not initialized")]
    NotInitialized,

    /// The active store refused a write or reset.
    #[error(transparent)]
    Rejected(#[from] Rejection),

    /// The schema could not be built.
    #[error(transparent)]
    Schema(#[from] AttrError),

    /// A manager config file could not be read.
    #[error("failed to read manager config {path}: {source}")]
    ConfigRead {
        /// Config file path.
        path: String,
        /// Underlying error.
        source: io::Error,
    },

    /// A manager config file is not valid TOML for the expected shape.
    #[error("failed to parse manager config {path}: {message}")]
    ConfigParse {
        /// Config file path.
        path: String,
        /// Parser message.
        message: String,
    },

    /// A manager config file exceeds the size limit.
    #[error("manager config {path} is {size} bytes, above the {limit} byte limit")]
    ConfigTooLarge {
        /// Config file path.
        path: String,
        /// Actual size in bytes.
        size: u64,
        /// Maximum accepted size in bytes.
        limit: u64,
    },
}

/// Result type for profile manager operations.
pub type ProfileResult<T> = Result<T, ProfileError>;

/// Why a lifecycle operation (`add`, `switch_to`, `del`) did not happen.
///
/// Lifecycle operations never fail with a `Result`; the error travels in
/// the outcome and in the matching event.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", content = "detail", rename_all = "snake_case")]
pub enum LifecycleError {
    /// A profile with this name is already indexed.
    #[error("profile '{0}' already exists")]
    AlreadyExists(String),

    /// The name collides with a reserved file or profile name.
    #[error("profile name '{0}' is reserved")]
    Reserved(String),

    /// Names beginning with an underscore are not allowed.
    #[error("profile name '{0}' must not begin with an underscore")]
    Underscore(String),

    /// The name is empty or cannot be used as a directory name.
    #[error("invalid profile name {0:?}")]
    InvalidName(String),

    /// No profile with this name is indexed.
    #[error("profile '{0}' not found")]
    NotFound(String),

    /// The profile is already the active one.
    #[error("profile '{0}' is already current")]
    AlreadyCurrent(String),

    /// The active profile cannot be deleted.
    #[error("cannot delete the current profile '{0}'")]
    DeleteCurrent(String),

    /// `init` has not completed.
    #[error("profile manager is not initialized")]
    NotInitialized,

    /// Reading or writing the index failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<StorageError> for LifecycleError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Which step of loading a profile config failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadErrorCode {
    /// The file could not be read.
    Read,
    /// The file was read but the codec could not parse it.
    Parse,
}

impl fmt::Display for LoadErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Parse => f.write_str("parse"),
        }
    }
}

/// Failure to load the active profile's config file.
///
/// Reported through [`ReloadOutcome`](crate::ReloadOutcome) and the
/// [`ProfileEvent::Error`](crate::ProfileEvent::Error) event; never fatal.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[error("failed to {code} config file {}: {message}", .path.display())]
pub struct LoadError {
    /// Failed step.
    pub code: LoadErrorCode,
    /// Config file path.
    pub path: PathBuf,
    /// Underlying message.
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_error_serializes_with_code() {
        let value = serde_json::to_value(LifecycleError::Reserved("profiles".into())).unwrap();
        assert_eq!(value["code"], "reserved");
        assert_eq!(value["detail"], "profiles");

        let value = serde_json::to_value(LifecycleError::NotInitialized).unwrap();
        assert_eq!(value["code"], "not_initialized");
    }

    #[test]
    fn test_load_error_display() {
        let err = LoadError {
            code: LoadErrorCode::Parse,
            path: PathBuf::from("/p/default/config"),
            message: "expected value".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "failed to parse config file /p/default/config: expected value"
        );
    }

    #[test]
    fn test_storage_error_into_lifecycle() {
        let err: LifecycleError = StorageError::NotFound(PathBuf::from("/x")).into();
        assert!(matches!(err, LifecycleError::Storage(ref m) if m.contains("/x")));
    }
}
