//! Orphan cleanup: catalog rows and thumbnails whose source file is gone.
//!
//! Runs before the walk, over the snapshot taken at the start of the run.
//! For each photo whose source file no longer exists:
//!
//! 1. delete the catalog row (its keyword and people links go with it)
//! 2. delete the thumbnail
//! 3. prune empty cache directories, at most two levels: the album's
//!    `thumbnails` directory, then the album mirror directory itself (whose
//!    folder record is deleted too). The cache root is never removed.
//!
//! A failure at any step is recorded and the remaining steps for that photo
//! are skipped; other photos are unaffected.

use crate::cache::{ThumbnailCache, thumbnail_cache_path};
use crate::catalog::CatalogStore;
use crate::error::SyncError;
use crate::types::{Folder, Photo, relative_to};
use std::io;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct ReapSummary {
    pub removed_photos: usize,
    pub removed_thumbnails: usize,
    pub pruned_dirs: usize,
    pub errors: Vec<SyncError>,
}

pub struct OrphanReaper<'a, C: ?Sized, T: ?Sized> {
    pub library: &'a Path,
    pub cache_root: &'a Path,
    pub catalog: &'a C,
    pub thumbnails: &'a T,
}

impl<C, T> OrphanReaper<'_, C, T>
where
    C: CatalogStore + ?Sized,
    T: ThumbnailCache + ?Sized,
{
    pub fn reap(&self, snapshot: &[Photo]) -> ReapSummary {
        let mut summary = ReapSummary::default();
        for photo in snapshot {
            let source = photo.source_path();
            // Only a definite "not found" counts; an unreadable parent is left alone
            if !matches!(source.try_exists(), Ok(false)) {
                continue;
            }
            if let Err(e) = self.reap_one(photo, &mut summary) {
                warn!(path = %source.display(), error = %e, "orphan cleanup failed");
                summary.errors.push(e);
            }
        }
        if summary.removed_photos > 0 {
            info!(
                photos = summary.removed_photos,
                dirs = summary.pruned_dirs,
                "removed orphans"
            );
        }
        summary
    }

    fn reap_one(&self, photo: &Photo, summary: &mut ReapSummary) -> Result<(), SyncError> {
        self.catalog.delete_photo(&photo.id).map_err(|e| {
            SyncError::storage(format!("deleting photo '{}'", photo.source_path().display()), e)
        })?;
        summary.removed_photos += 1;

        let cache_path = thumbnail_cache_path(self.cache_root, self.library, photo);
        self.thumbnails
            .remove(&cache_path)
            .map_err(|e| SyncError::io(&cache_path, e))?;
        summary.removed_thumbnails += 1;
        debug!(path = %cache_path.display(), "removed thumbnail");

        let Some(thumb_dir) = cache_path.parent() else {
            return Ok(());
        };
        if !self.remove_if_empty(thumb_dir, summary)? {
            return Ok(());
        }
        let Some(album_dir) = thumb_dir.parent() else {
            return Ok(());
        };
        if album_dir == self.cache_root
            || !album_dir.starts_with(self.cache_root)
            || !is_empty_dir(album_dir).map_err(|e| SyncError::io(album_dir, e))?
        {
            return Ok(());
        }

        let album = Folder::from_relative(self.library, &relative_to(self.cache_root, album_dir));
        self.catalog
            .delete_folder(&album.folder_name, &album.parent_path)
            .map_err(|e| {
                SyncError::storage(format!("deleting folder '{}'", album.relative_path()), e)
            })?;
        self.remove_if_empty(album_dir, summary)?;
        Ok(())
    }

    /// Remove `dir` when it is empty and strictly inside the cache root.
    fn remove_if_empty(&self, dir: &Path, summary: &mut ReapSummary) -> Result<bool, SyncError> {
        if dir == self.cache_root || !dir.starts_with(self.cache_root) {
            return Ok(false);
        }
        match is_empty_dir(dir) {
            Ok(true) => {}
            Ok(false) => return Ok(false),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(SyncError::io(dir, e)),
        }
        std::fs::remove_dir(dir).map_err(|e| SyncError::io(dir, e))?;
        summary.pruned_dirs += 1;
        debug!(dir = %dir.display(), "pruned cache directory");
        Ok(true)
    }
}

fn is_empty_dir(dir: &Path) -> io::Result<bool> {
    Ok(std::fs::read_dir(dir)?.next().is_none())
}
