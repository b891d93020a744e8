//! Platform file identity.
//!
//! A photo keeps its identity across renames and metadata edits, which lets
//! the sync task tell an in-place edit apart from a different file appearing
//! at the same path.

use crate::error::SyncError;
use std::path::Path;

/// Inode number of `path` as a decimal string.
#[cfg(unix)]
pub fn file_identity(path: &Path) -> Result<String, SyncError> {
    use std::os::unix::fs::MetadataExt;

    let meta = std::fs::metadata(path).map_err(|e| SyncError::io(path, e))?;
    Ok(meta.ino().to_string())
}

#[cfg(not(unix))]
pub fn file_identity(path: &Path) -> Result<String, SyncError> {
    Err(SyncError::io(
        path,
        std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "file identity requires inode numbers",
        ),
    ))
}
