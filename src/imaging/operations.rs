//! High-level image operations.
//!
//! Turns a thumbnail request into [`ThumbnailParams`] and hands it to the
//! backend.

use super::backend::{BackendError, ImageBackend};
use super::params::{Quality, ThumbnailParams};
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Plan a thumbnail operation without executing it.
pub fn plan_thumbnail(source: &Path, output: &Path, max_edge: u32) -> ThumbnailParams {
    ThumbnailParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        max_edge,
        quality: Quality::default(),
    }
}

/// Create a JPEG thumbnail of `source` at `output`, longer edge `max_edge`.
pub fn create_thumbnail(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    max_edge: u32,
) -> Result<()> {
    backend.thumbnail(&plan_thumbnail(source, output, max_edge))
}
