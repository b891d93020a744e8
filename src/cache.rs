//! Thumbnail cache: one derived JPEG per catalogued photo.
//!
//! # Layout
//!
//! The cache mirrors the library's album tree, with the thumbnails of each
//! album collected in a `thumbnails` subdirectory:
//!
//! ```text
//! library/2023/trip/a.jpg  →  cache/2023/trip/thumbnails/a.jpg
//! library/b.JPG            →  cache/thumbnails/b.JPG
//! ```
//!
//! The file keeps its original stem and extension, so a thumbnail can be
//! found from the catalog row alone. Nothing else is stored: the catalog's
//! fingerprint decides when a thumbnail is regenerated, and the file's
//! existence is the only cache state.

use crate::imaging::{BackendError, ImageBackend, create_thumbnail};
use crate::types::Photo;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the per-album thumbnail directory.
pub const THUMBNAILS_DIR: &str = "thumbnails";

/// `cache_root/<album>/thumbnails`.
pub fn thumbnail_cache_dir(cache_root: &Path, album_path: &str) -> PathBuf {
    let mut dir = cache_root.to_path_buf();
    for segment in album_path.split('/').filter(|s| !s.is_empty()) {
        dir.push(segment);
    }
    dir.join(THUMBNAILS_DIR)
}

/// Where the thumbnail of `photo` lives.
pub fn thumbnail_cache_path(cache_root: &Path, library: &Path, photo: &Photo) -> PathBuf {
    thumbnail_cache_dir(cache_root, &photo.album_path(library))
        .join(format!("{}{}", photo.file_name, photo.ext))
}

/// Storage for derived thumbnails.
///
/// Implementations must be shareable across worker threads.
pub trait ThumbnailCache: Sync {
    fn exists(&self, cache_path: &Path) -> bool;

    /// Render `source` into `cache_path` with its longer edge at `max_edge`,
    /// creating parent directories.
    fn create(&self, source: &Path, cache_path: &Path, max_edge: u32) -> Result<(), BackendError>;

    /// Delete a thumbnail. A thumbnail that is already gone is not an error.
    fn remove(&self, cache_path: &Path) -> io::Result<()>;
}

/// Production cache: thumbnails rendered by an [`ImageBackend`].
pub struct JpegThumbnailCache<B> {
    backend: B,
}

impl<B: ImageBackend> JpegThumbnailCache<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }
}

impl<B: ImageBackend> ThumbnailCache for JpegThumbnailCache<B> {
    fn exists(&self, cache_path: &Path) -> bool {
        cache_path.is_file()
    }

    fn create(&self, source: &Path, cache_path: &Path, max_edge: u32) -> Result<(), BackendError> {
        create_thumbnail(&self.backend, source, cache_path, max_edge)
    }

    fn remove(&self, cache_path: &Path) -> io::Result<()> {
        match std::fs::remove_file(cache_path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
