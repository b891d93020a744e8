//! Error taxonomy for a sync run.
//!
//! Errors fall into two groups:
//!
//! - **Fatal**: the run never starts because of bad settings, a missing
//!   library root, a run already in progress, or a worker pool that cannot be
//!   built. These come back as the `Err` side of [`SyncEngine::run`](crate::engine::SyncEngine::run).
//! - **Recoverable**: scoped to one file or one catalog operation. They are
//!   collected into [`SyncReport::errors`](crate::engine::SyncReport) and never
//!   stop sibling work.

use crate::catalog::StorageError;
use crate::config::ConfigError;
use crate::imaging::BackendError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("error reading settings: {0}")]
    Config(#[from] ConfigError),
    #[error("collector is already running")]
    AlreadyRunning,
    #[error("invalid library path: {0}")]
    InvalidLibraryPath(PathBuf),
    #[error("could not build worker pool: {0}")]
    Pool(String),
    #[error("IO error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not decode '{}': {message}", path.display())]
    Decode { path: PathBuf, message: String },
    #[error("could not encode thumbnail for '{}': {message}", path.display())]
    Encode { path: PathBuf, message: String },
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(PathBuf),
    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: StorageError,
    },
}

impl SyncError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn storage(context: impl Into<String>, source: StorageError) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    /// Map an imaging failure during thumbnail creation onto the taxonomy.
    pub fn from_thumbnail(source: &std::path::Path, err: BackendError) -> Self {
        match err {
            BackendError::Io(e) => Self::io(source, e),
            BackendError::UnsupportedFormat(p) => Self::UnsupportedFormat(p),
            BackendError::ProcessingFailed(message) => Self::Encode {
                path: source.to_path_buf(),
                message,
            },
        }
    }

    /// True when the whole run must stop rather than record and continue.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::AlreadyRunning | Self::InvalidLibraryPath(_) | Self::Pool(_)
        )
    }

    /// The file this error is about, when it concerns a single file.
    pub fn path(&self) -> Option<&std::path::Path> {
        match self {
            Self::Io { path, .. } | Self::Decode { path, .. } | Self::Encode { path, .. } => {
                Some(path)
            }
            Self::UnsupportedFormat(path) | Self::InvalidLibraryPath(path) => Some(path),
            _ => None,
        }
    }
}
