//! Shared test utilities for the photosync test suite.
//!
//! - [`sample_photo`]: a fully populated, deterministic catalog record
//! - [`create_test_jpeg`] / [`create_tagged_jpeg`]: real JPEG files on disk,
//!   optionally carrying raw APP segments (IPTC, XMP)
//! - [`MemoryCatalog`]: an in-memory [`CatalogStore`] with a write log and
//!   failure injection
//! - [`RecordingThumbnailCache`]: a [`ThumbnailCache`] that touches no files
//!   and records what it was asked to do
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let catalog = MemoryCatalog::new();
//! let cache = RecordingThumbnailCache::new();
//! // ... run a sync task against them ...
//! assert_eq!(cache.created().len(), 1);
//! assert!(catalog.writes().iter().all(|w| matches!(w, CatalogWrite::SavePhoto(_))));
//! ```

use crate::cache::ThumbnailCache;
use crate::catalog::{CatalogStore, StorageError};
use crate::fingerprint::metadata_fingerprint;
use crate::imaging::BackendError;
use crate::types::{Folder, Photo};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageEncoder, RgbImage};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

// =========================================================================
// Records
// =========================================================================

fn fixed_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()
}

/// A catalog record for `dir/name+ext` with every field populated.
///
/// The id is the record's path, so distinct locations get distinct ids.
pub fn sample_photo(dir: &str, name: &str, ext: &str) -> Photo {
    let mut photo = Photo {
        id: format!("{dir}/{name}{ext}"),
        file_name: name.to_string(),
        ext: ext.to_string(),
        full_path: PathBuf::from(dir),
        metadata_hash: String::new(),
        lens_make: "Canon".into(),
        lens_model: "EF 50mm f/1.8".into(),
        camera_make: "Canon".into(),
        camera_model: "EOS 5D".into(),
        keywords: vec!["2023".into(), "beach".into()],
        people: vec!["Ada".into()],
        caption: "Evening swim".into(),
        title: "Beach".into(),
        creation_date_time: NaiveDate::from_ymd_opt(2023, 7, 14)
            .and_then(|d| d.and_hms_opt(18, 30, 0)),
        width: 4000,
        height: 3000,
        latitude: 43.2965,
        longitude: -5.3698,
        year: "2023".into(),
        created_at: fixed_time(),
        updated_at: fixed_time(),
    };
    photo.metadata_hash = metadata_fingerprint(&photo);
    photo
}

// =========================================================================
// JPEG fixtures
// =========================================================================

fn encode_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 7 % 256) as u8, (y * 5 % 256) as u8, 128])
    });
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, 90)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

/// Write a small gradient JPEG, creating parent directories.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, encode_jpeg(width, height)).unwrap();
}

/// Like [`create_test_jpeg`], with extra `(marker, payload)` segments inserted
/// right after SOI. `payload` excludes the marker and length bytes.
pub fn create_tagged_jpeg(path: &Path, width: u32, height: u32, segments: &[(u8, Vec<u8>)]) {
    let encoded = encode_jpeg(width, height);
    let mut bytes = encoded[..2].to_vec();
    for (marker, payload) in segments {
        bytes.extend_from_slice(&[0xFF, *marker]);
        bytes.extend_from_slice(&((payload.len() + 2) as u16).to_be_bytes());
        bytes.extend_from_slice(payload);
    }
    bytes.extend_from_slice(&encoded[2..]);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, bytes).unwrap();
}

fn injected(what: &str) -> StorageError {
    StorageError::Io(io::Error::other(format!("injected {what} failure")))
}

// =========================================================================
// In-memory catalog
// =========================================================================

/// A successful catalog mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogWrite {
    SavePhoto(String),
    DeletePhoto(String),
    SaveFolder(PathBuf),
    DeleteFolder(String),
}

#[derive(Default)]
struct CatalogState {
    photos: Vec<Photo>,
    folders: Vec<Folder>,
    log: Vec<CatalogWrite>,
    fail_folder_saves: bool,
    fail_photo_saves: bool,
    fail_photo_deletes: bool,
}

/// [`CatalogStore`] over vectors, with the same upsert and uniqueness rules
/// as the SQLite adapter.
#[derive(Default)]
pub struct MemoryCatalog {
    state: Mutex<CatalogState>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_folder_saves(self) -> Self {
        self.state.lock().unwrap().fail_folder_saves = true;
        self
    }

    pub fn fail_photo_saves(&self) {
        self.state.lock().unwrap().fail_photo_saves = true;
    }

    pub fn fail_photo_deletes(&self) {
        self.state.lock().unwrap().fail_photo_deletes = true;
    }

    /// Every successful mutation since the last [`clear_log`](Self::clear_log).
    pub fn writes(&self) -> Vec<CatalogWrite> {
        self.state.lock().unwrap().log.clone()
    }

    /// Photo saves and deletes only.
    pub fn photo_writes(&self) -> Vec<CatalogWrite> {
        self.writes()
            .into_iter()
            .filter(|w| matches!(w, CatalogWrite::SavePhoto(_) | CatalogWrite::DeletePhoto(_)))
            .collect()
    }

    pub fn clear_log(&self) {
        self.state.lock().unwrap().log.clear();
    }
}

impl CatalogStore for MemoryCatalog {
    fn all_photos(&self) -> Result<Vec<Photo>, StorageError> {
        let mut photos = self.state.lock().unwrap().photos.clone();
        photos.sort_by(|a, b| {
            (&a.full_path, &a.file_name, &a.ext).cmp(&(&b.full_path, &b.file_name, &b.ext))
        });
        Ok(photos)
    }

    fn save_photo(&self, photo: &Photo) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_photo_saves {
            return Err(injected("photo save"));
        }
        let taken = state.photos.iter().any(|p| {
            p.id != photo.id && p.is_at(&photo.full_path, &photo.file_name, &photo.ext)
        });
        if taken {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("path already catalogued: {}", photo.source_path().display()),
            )));
        }
        match state.photos.iter_mut().find(|p| p.id == photo.id) {
            Some(existing) => *existing = photo.clone(),
            None => state.photos.push(photo.clone()),
        }
        state.log.push(CatalogWrite::SavePhoto(photo.id.clone()));
        Ok(())
    }

    fn delete_photo(&self, id: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_photo_deletes {
            return Err(injected("photo delete"));
        }
        let before = state.photos.len();
        state.photos.retain(|p| p.id != id);
        if state.photos.len() == before {
            return Err(StorageError::NotFound(format!("photo {id}")));
        }
        state.log.push(CatalogWrite::DeletePhoto(id.to_string()));
        Ok(())
    }

    fn delete_photo_at(&self, photo: &Photo) -> Result<bool, StorageError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_photo_deletes {
            return Err(injected("photo delete"));
        }
        let before = state.photos.len();
        state.photos.retain(|p| {
            p.id != photo.id || !p.is_at(&photo.full_path, &photo.file_name, &photo.ext)
        });
        if state.photos.len() == before {
            return Ok(false);
        }
        state.log.push(CatalogWrite::DeletePhoto(photo.id.clone()));
        Ok(true)
    }

    fn save_folder(&self, folder: &Folder) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_folder_saves {
            return Err(injected("folder save"));
        }
        match state.folders.iter_mut().find(|f| f.full_path == folder.full_path) {
            Some(existing) => {
                let key = folder.key_photo_id.clone().or(existing.key_photo_id.take());
                *existing = Folder {
                    key_photo_id: key,
                    ..folder.clone()
                };
            }
            None => state.folders.push(folder.clone()),
        }
        state.log.push(CatalogWrite::SaveFolder(folder.full_path.clone()));
        Ok(())
    }

    fn delete_folder(&self, folder_name: &str, parent_path: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        state
            .folders
            .retain(|f| !(f.folder_name == folder_name && f.parent_path == parent_path));
        state.log.push(CatalogWrite::DeleteFolder(crate::types::join_relative(
            parent_path,
            folder_name,
        )));
        Ok(())
    }

    fn all_folders(&self) -> Result<Vec<Folder>, StorageError> {
        Ok(self.state.lock().unwrap().folders.clone())
    }
}

// =========================================================================
// Recording thumbnail cache
// =========================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum CacheOp {
    Create { source: PathBuf, target: PathBuf },
    Remove(PathBuf),
}

#[derive(Default)]
struct CacheState {
    existing: HashSet<PathBuf>,
    ops: Vec<CacheOp>,
    fail_creates: bool,
}

/// [`ThumbnailCache`] that only tracks which thumbnails "exist".
#[derive(Default)]
pub struct RecordingThumbnailCache {
    state: Mutex<CacheState>,
}

impl RecordingThumbnailCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn operations(&self) -> Vec<CacheOp> {
        self.state.lock().unwrap().ops.clone()
    }

    /// Targets of successful creates, in order.
    pub fn created(&self) -> Vec<PathBuf> {
        self.operations()
            .into_iter()
            .filter_map(|op| match op {
                CacheOp::Create { target, .. } => Some(target),
                CacheOp::Remove(_) => None,
            })
            .collect()
    }

    pub fn mark_existing(&self, path: PathBuf) {
        self.state.lock().unwrap().existing.insert(path);
    }

    /// Pretend every thumbnail was deleted behind the cache's back.
    pub fn forget_all(&self) {
        self.state.lock().unwrap().existing.clear();
    }

    pub fn fail_creates(&self) {
        self.state.lock().unwrap().fail_creates = true;
    }

    pub fn clear_log(&self) {
        self.state.lock().unwrap().ops.clear();
    }
}

impl ThumbnailCache for RecordingThumbnailCache {
    fn exists(&self, cache_path: &Path) -> bool {
        self.state.lock().unwrap().existing.contains(cache_path)
    }

    fn create(&self, source: &Path, cache_path: &Path, _max_edge: u32) -> Result<(), BackendError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_creates {
            return Err(BackendError::ProcessingFailed("injected create failure".into()));
        }
        state.existing.insert(cache_path.to_path_buf());
        state.ops.push(CacheOp::Create {
            source: source.to_path_buf(),
            target: cache_path.to_path_buf(),
        });
        Ok(())
    }

    fn remove(&self, cache_path: &Path) -> io::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.existing.remove(cache_path);
        state.ops.push(CacheOp::Remove(cache_path.to_path_buf()));
        Ok(())
    }
}
