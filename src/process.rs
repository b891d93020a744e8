//! Per-file sync task.
//!
//! Each photo found by the walk becomes one task on the worker pool. A task
//! reads the file, compares it against the catalog snapshot taken at the
//! start of the run, and brings the thumbnail and the catalog row up to date.
//!
//! ## Decision table
//!
//! | Row at this path? | Same file identity? | Fingerprint changed? | Action |
//! |---|---|---|---|
//! | no  | | | **Create**: thumbnail, insert row |
//! | yes | yes | yes | **Update**: thumbnail, save row, keep `created_at` |
//! | yes | yes | no  | **Unchanged**: thumbnail only if it is missing |
//! | yes | no  | | **Replace**: delete the stale row if it is still here, then create |
//!
//! Thumbnail creation and the catalog write are attempted independently, and
//! every failure lands in the task's own error list. Nothing a task does can
//! abort another task.

use crate::cache::{ThumbnailCache, thumbnail_cache_path};
use crate::catalog::CatalogStore;
use crate::error::SyncError;
use crate::identity::file_identity;
use crate::imaging::ImageBackend;
use crate::metadata::{FileLocation, build_photo, extract};
use crate::types::Photo;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Catalog contents at the start of a run, indexed for the task lookups.
///
/// Tasks only read it; their writes go to the catalog.
#[derive(Debug, Default)]
pub struct Snapshot {
    photos: Vec<Photo>,
    by_location: HashMap<(PathBuf, String, String), usize>,
    by_id: HashMap<String, usize>,
}

impl Snapshot {
    pub fn new(photos: Vec<Photo>) -> Self {
        let mut by_location = HashMap::with_capacity(photos.len());
        let mut by_id = HashMap::with_capacity(photos.len());
        for (i, p) in photos.iter().enumerate() {
            by_location.insert((p.full_path.clone(), p.file_name.clone(), p.ext.clone()), i);
            by_id.insert(p.id.clone(), i);
        }
        Self {
            photos,
            by_location,
            by_id,
        }
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn at_location(&self, dir: &Path, file_name: &str, ext: &str) -> Option<&Photo> {
        self.by_location
            .get(&(dir.to_path_buf(), file_name.to_string(), ext.to_string()))
            .map(|&i| &self.photos[i])
    }

    pub fn with_id(&self, id: &str) -> Option<&Photo> {
        self.by_id.get(id).map(|&i| &self.photos[i])
    }
}

/// What a task did with its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskOutcome {
    Created,
    Updated,
    Unchanged,
    ThumbnailRestored,
    /// The file could not be read or identified; nothing was written.
    Failed,
}

/// Result of one task.
#[derive(Debug)]
pub struct TaskReport {
    pub path: PathBuf,
    pub outcome: TaskOutcome,
    pub errors: Vec<SyncError>,
}

/// Shared, read-only inputs of every task in a run.
pub struct SyncContext<'a, C: ?Sized, T: ?Sized, B> {
    pub library: &'a Path,
    pub cache_root: &'a Path,
    pub snapshot: &'a Snapshot,
    pub catalog: &'a C,
    pub thumbnails: &'a T,
    pub backend: &'a B,
    pub thumbnail_size: u32,
    pub now: DateTime<Utc>,
}

impl<C: ?Sized, T: ?Sized, B> Clone for SyncContext<'_, C, T, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: ?Sized, T: ?Sized, B> Copy for SyncContext<'_, C, T, B> {}

impl<'a, C, T, B> SyncContext<'a, C, T, B>
where
    C: CatalogStore + ?Sized,
    T: ThumbnailCache + ?Sized,
    B: ImageBackend,
{
    /// Sync one photo file. Never panics on bad input; see the module docs.
    pub fn sync_file(&self, path: &Path) -> TaskReport {
        let mut errors = Vec::new();
        let outcome = match self.try_sync(path, &mut errors) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping file");
                errors.push(e);
                TaskOutcome::Failed
            }
        };
        TaskReport {
            path: path.to_path_buf(),
            outcome,
            errors,
        }
    }

    fn try_sync(&self, path: &Path, errors: &mut Vec<SyncError>) -> Result<TaskOutcome, SyncError> {
        let location = FileLocation::from_path(path).ok_or_else(|| SyncError::Decode {
            path: path.to_path_buf(),
            message: "file name is not valid UTF-8".to_string(),
        })?;
        let extracted = extract(self.backend, path)?;
        let id = file_identity(path)?;
        let mut candidate = build_photo(id, &location, extracted, self.now);
        let cache_path = thumbnail_cache_path(self.cache_root, self.library, &candidate);

        let existing = self
            .snapshot
            .at_location(&candidate.full_path, &candidate.file_name, &candidate.ext);

        let outcome = match existing {
            None => {
                if let Some(previous) = self.snapshot.with_id(&candidate.id) {
                    info!(
                        from = %previous.source_path().display(),
                        to = %path.display(),
                        "photo moved"
                    );
                }
                self.write_thumbnail(path, &cache_path, errors);
                self.save(&candidate, errors);
                info!(path = %path.display(), "created");
                TaskOutcome::Created
            }
            Some(row) if row.id == candidate.id => {
                if row.metadata_hash != candidate.metadata_hash {
                    candidate.created_at = row.created_at;
                    self.write_thumbnail(path, &cache_path, errors);
                    self.save(&candidate, errors);
                    info!(path = %path.display(), "updated");
                    TaskOutcome::Updated
                } else if !self.thumbnails.exists(&cache_path) {
                    self.write_thumbnail(path, &cache_path, errors);
                    debug!(path = %path.display(), "thumbnail restored");
                    TaskOutcome::ThumbnailRestored
                } else {
                    TaskOutcome::Unchanged
                }
            }
            Some(row) => {
                info!(
                    path = %path.display(),
                    old_id = %row.id,
                    new_id = %candidate.id,
                    "different file at known path, replacing"
                );
                // The stale id may already belong to another file of this run
                // (a rename swap); only the row still at this location goes.
                match self.catalog.delete_photo_at(row) {
                    Ok(true) => {}
                    Ok(false) => debug!(id = %row.id, "stale row already moved, keeping it"),
                    Err(e) => errors.push(SyncError::storage(
                        format!("deleting stale photo {}", row.id),
                        e,
                    )),
                }
                self.write_thumbnail(path, &cache_path, errors);
                self.save(&candidate, errors);
                TaskOutcome::Created
            }
        };
        Ok(outcome)
    }

    fn write_thumbnail(&self, source: &Path, cache_path: &Path, errors: &mut Vec<SyncError>) {
        if let Err(e) = self.thumbnails.create(source, cache_path, self.thumbnail_size) {
            let err = SyncError::from_thumbnail(source, e);
            warn!(path = %source.display(), error = %err, "thumbnail failed");
            errors.push(err);
        }
    }

    fn save(&self, photo: &Photo, errors: &mut Vec<SyncError>) {
        if let Err(e) = self.catalog.save_photo(photo) {
            let err = SyncError::storage(
                format!("saving photo '{}'", photo.source_path().display()),
                e,
            );
            warn!(error = %err, "catalog write failed");
            errors.push(err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::file_identity;
    use crate::imaging::backend::tests::MockBackend;
    use crate::imaging::{Dimensions, ImageMetadata};
    use crate::test_helpers::{
        CacheOp, CatalogWrite, MemoryCatalog, RecordingThumbnailCache, sample_photo,
    };
    use tempfile::TempDir;

    struct Fixture {
        tmp: TempDir,
        backend: MockBackend,
        catalog: MemoryCatalog,
        cache: RecordingThumbnailCache,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                tmp: TempDir::new().unwrap(),
                backend: MockBackend::new(),
                catalog: MemoryCatalog::new(),
                cache: RecordingThumbnailCache::new(),
            }
        }

        fn library(&self) -> PathBuf {
            self.tmp.path().join("lib")
        }

        fn cache_root(&self) -> PathBuf {
            self.tmp.path().join("cache")
        }

        /// Create a file on disk and register its metadata with the mock.
        fn add_file(mut self, rel: &str, meta: ImageMetadata) -> Self {
            let path = self.library().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(&path, b"jpeg").unwrap();
            self.backend = self.backend.with_image(
                path,
                Dimensions {
                    width: 40,
                    height: 30,
                },
                meta,
            );
            self
        }

        fn run(&self, snapshot: &Snapshot, rel: &str) -> TaskReport {
            let library = self.library();
            let cache_root = self.cache_root();
            let ctx = SyncContext {
                library: &library,
                cache_root: &cache_root,
                snapshot,
                catalog: &self.catalog,
                thumbnails: &self.cache,
                backend: &self.backend,
                thumbnail_size: 300,
                now: Utc::now(),
            };
            ctx.sync_file(&library.join(rel))
        }

        /// The row a first sync of `rel` would produce.
        fn synced_row(&self, rel: &str) -> Photo {
            let report = self.run(&Snapshot::default(), rel);
            assert_eq!(report.outcome, TaskOutcome::Created);
            let photo = self
                .catalog
                .all_photos()
                .unwrap()
                .into_iter()
                .find(|p| p.source_path() == self.library().join(rel))
                .unwrap();
            self.catalog.clear_log();
            self.cache.clear_log();
            photo
        }
    }

    #[test]
    fn new_file_is_created() {
        let fx = Fixture::new().add_file(
            "2023/a.jpg",
            ImageMetadata {
                keywords: vec!["2023".into()],
                ..Default::default()
            },
        );
        let report = fx.run(&Snapshot::default(), "2023/a.jpg");

        assert_eq!(report.outcome, TaskOutcome::Created);
        assert!(report.errors.is_empty());
        let photos = fx.catalog.all_photos().unwrap();
        assert_eq!(photos.len(), 1);
        assert_eq!(photos[0].year, "2023");
        assert_eq!(photos[0].width, 40);
        assert_eq!(
            fx.cache.operations(),
            vec![CacheOp::Create {
                source: fx.library().join("2023/a.jpg"),
                target: fx.cache_root().join("2023/thumbnails/a.jpg"),
            }]
        );
    }

    #[test]
    fn unchanged_file_does_nothing() {
        let fx = Fixture::new().add_file("a.jpg", ImageMetadata::default());
        let row = fx.synced_row("a.jpg");
        fx.cache.mark_existing(fx.cache_root().join("thumbnails/a.jpg"));

        let report = fx.run(&Snapshot::new(vec![row]), "a.jpg");

        assert_eq!(report.outcome, TaskOutcome::Unchanged);
        assert!(fx.catalog.writes().is_empty());
        assert!(fx.cache.created().is_empty());
    }

    #[test]
    fn missing_thumbnail_is_restored_without_catalog_write() {
        let fx = Fixture::new().add_file("a.jpg", ImageMetadata::default());
        let row = fx.synced_row("a.jpg");
        fx.cache.forget_all();

        let report = fx.run(&Snapshot::new(vec![row]), "a.jpg");

        assert_eq!(report.outcome, TaskOutcome::ThumbnailRestored);
        assert!(fx.catalog.writes().is_empty());
        assert_eq!(fx.cache.created().len(), 1);
    }

    #[test]
    fn changed_metadata_updates_and_keeps_created_at() {
        let fx = Fixture::new().add_file("a.jpg", ImageMetadata::default());
        let mut row = fx.synced_row("a.jpg");
        row.created_at = row.created_at - chrono::Duration::days(30);
        row.metadata_hash = "stale".into();

        let report = fx.run(&Snapshot::new(vec![row.clone()]), "a.jpg");

        assert_eq!(report.outcome, TaskOutcome::Updated);
        let saved = fx.catalog.all_photos().unwrap();
        assert_eq!(saved[0].created_at, row.created_at);
        assert!(saved[0].updated_at > row.created_at);
        assert_eq!(fx.cache.created().len(), 1);
    }

    #[test]
    fn different_identity_at_same_path_replaces_row() {
        let fx = Fixture::new().add_file("a.jpg", ImageMetadata::default());
        let mut stale = fx.synced_row("a.jpg");
        fx.catalog.delete_photo(&stale.id).unwrap();
        stale.id = "stale-id".into();
        fx.catalog.save_photo(&stale).unwrap();
        fx.catalog.clear_log();

        let report = fx.run(&Snapshot::new(vec![stale]), "a.jpg");

        assert_eq!(report.outcome, TaskOutcome::Created);
        assert!(report.errors.is_empty());
        let ids: Vec<String> = fx.catalog.all_photos().unwrap().into_iter().map(|p| p.id).collect();
        let expected = file_identity(&fx.library().join("a.jpg")).unwrap();
        assert_eq!(ids, vec![expected]);
    }

    #[test]
    fn swapped_names_keep_both_rows() {
        let fx = Fixture::new()
            .add_file("a.jpg", ImageMetadata::default())
            .add_file("b.jpg", ImageMetadata::default());
        let a = fx.synced_row("a.jpg");
        let b = fx.synced_row("b.jpg");

        // a.jpg -> tmp, b.jpg -> a.jpg, tmp -> b.jpg
        let lib = fx.library();
        std::fs::rename(lib.join("a.jpg"), lib.join("tmp.jpg")).unwrap();
        std::fs::rename(lib.join("b.jpg"), lib.join("a.jpg")).unwrap();
        std::fs::rename(lib.join("tmp.jpg"), lib.join("b.jpg")).unwrap();
        let snapshot = Snapshot::new(vec![a.clone(), b.clone()]);

        let first = fx.run(&snapshot, "a.jpg");
        let second = fx.run(&snapshot, "b.jpg");

        assert_eq!(first.outcome, TaskOutcome::Created);
        assert_eq!(second.outcome, TaskOutcome::Created);
        assert!(first.errors.is_empty() && second.errors.is_empty());
        let mut rows: Vec<(String, String)> = fx
            .catalog
            .all_photos()
            .unwrap()
            .into_iter()
            .map(|p| (p.file_name, p.id))
            .collect();
        rows.sort();
        assert_eq!(rows, vec![("a".to_string(), b.id), ("b".to_string(), a.id)]);
    }

    #[test]
    fn stale_row_moved_by_another_task_is_not_deleted() {
        let fx = Fixture::new().add_file("a.jpg", ImageMetadata::default());
        let real = fx.synced_row("a.jpg");
        let mut elsewhere = sample_photo(&fx.library().to_string_lossy(), "z", ".jpg");
        elsewhere.id = "moved-id".into();
        fx.catalog.save_photo(&elsewhere).unwrap();
        fx.catalog.delete_photo(&real.id).unwrap();
        fx.catalog.clear_log();

        // The snapshot still places "moved-id" at a.jpg
        let stale = Photo {
            id: "moved-id".into(),
            ..real.clone()
        };
        let report = fx.run(&Snapshot::new(vec![stale]), "a.jpg");

        assert_eq!(report.outcome, TaskOutcome::Created);
        assert!(report.errors.is_empty());
        assert!(!fx.catalog.writes().contains(&CatalogWrite::DeletePhoto("moved-id".into())));
        let ids: Vec<String> = fx.catalog.all_photos().unwrap().into_iter().map(|p| p.id).collect();
        assert!(ids.contains(&"moved-id".to_string()));
        assert!(ids.contains(&real.id));
    }

    #[test]
    fn undecodable_file_fails_without_writes() {
        let fx = Fixture::new();
        let path = fx.library().join("broken.jpg");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"garbage").unwrap();

        let report = fx.run(&Snapshot::default(), "broken.jpg");

        assert_eq!(report.outcome, TaskOutcome::Failed);
        assert!(matches!(report.errors[..], [SyncError::Decode { .. }]));
        assert!(fx.catalog.writes().is_empty());
        assert!(fx.cache.operations().is_empty());
    }

    #[test]
    fn thumbnail_failure_still_saves_row() {
        let fx = Fixture::new().add_file("a.jpg", ImageMetadata::default());
        fx.cache.fail_creates();

        let report = fx.run(&Snapshot::default(), "a.jpg");

        assert_eq!(report.outcome, TaskOutcome::Created);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(fx.catalog.all_photos().unwrap().len(), 1);
    }

    #[test]
    fn catalog_failure_still_writes_thumbnail() {
        let fx = Fixture::new().add_file("a.jpg", ImageMetadata::default());
        fx.catalog.fail_photo_saves();

        let report = fx.run(&Snapshot::default(), "a.jpg");

        assert!(matches!(report.errors[..], [SyncError::Storage { .. }]));
        assert_eq!(fx.cache.created().len(), 1);
    }

    #[test]
    fn snapshot_lookups() {
        let a = sample_photo("/lib", "a", ".jpg");
        let snap = Snapshot::new(vec![a.clone()]);
        assert_eq!(snap.at_location(Path::new("/lib"), "a", ".jpg"), Some(&a));
        assert_eq!(snap.at_location(Path::new("/lib"), "a", ".JPG"), None);
        assert_eq!(snap.with_id(&a.id), Some(&a));
        assert_eq!(snap.len(), 1);
    }
}
