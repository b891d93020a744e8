//! Metadata extraction and photo record construction.
//!
//! ## Sources
//!
//! - **Dimensions**: JPEG frame header, via [`ImageBackend::identify`].
//! - **Camera, lens, capture time, GPS**: EXIF.
//! - **Caption**: EXIF ImageDescription, else IPTC Caption-Abstract (`2:120`).
//! - **Title**: XMP `dc:title`, else IPTC Object Name (`2:05`).
//! - **Keywords**: IPTC Keywords (`2:25`).
//! - **People**: XMP `Iptc4xmpExt:PersonInImage`.
//!
//! ## Year
//!
//! The first keyword made of exactly four ASCII digits wins, then the year of
//! the capture time, else the empty string.

use crate::error::SyncError;
use crate::fingerprint::metadata_fingerprint;
use crate::imaging::{BackendError, Dimensions, ImageBackend, ImageMetadata};
use crate::types::Photo;
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use std::path::Path;

/// Everything read from one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    pub dimensions: Dimensions,
    pub metadata: ImageMetadata,
}

/// Read dimensions and embedded metadata from `path`.
///
/// A missing or unreadable file is [`SyncError::Io`]; a file that is not a
/// decodable image is [`SyncError::Decode`]. Absent metadata is not an error.
pub fn extract(backend: &impl ImageBackend, path: &Path) -> Result<Extracted, SyncError> {
    let dimensions = backend
        .identify(path)
        .map_err(|e| backend_to_sync(path, e))?;
    let metadata = backend
        .read_metadata(path)
        .map_err(|e| backend_to_sync(path, e))?;
    Ok(Extracted {
        dimensions,
        metadata,
    })
}

fn backend_to_sync(path: &Path, err: BackendError) -> SyncError {
    match err {
        BackendError::Io(e) => SyncError::io(path, e),
        BackendError::UnsupportedFormat(p) => SyncError::UnsupportedFormat(p),
        BackendError::ProcessingFailed(message) => SyncError::Decode {
            path: path.to_path_buf(),
            message,
        },
    }
}

/// Resolve the display year, see the [module docs](self).
pub fn year_from(keywords: &[String], creation: Option<NaiveDateTime>) -> String {
    keywords
        .iter()
        .find(|k| k.len() == 4 && k.bytes().all(|b| b.is_ascii_digit()))
        .cloned()
        .or_else(|| creation.map(|dt| format!("{:04}", dt.year())))
        .unwrap_or_default()
}

/// Trimmed text or the empty string.
fn text(value: Option<String>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

/// Where a photo lives and what it is called.
#[derive(Debug, Clone, Copy)]
pub struct FileLocation<'a> {
    pub dir: &'a Path,
    pub file_name: &'a str,
    pub ext: &'a str,
}

impl<'a> FileLocation<'a> {
    /// Split `path` into directory, stem and dotted extension.
    ///
    /// Returns `None` for paths without a UTF-8 stem.
    pub fn from_path(path: &'a Path) -> Option<Self> {
        let dir = path.parent()?;
        let file_name = path.file_stem()?.to_str()?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Some(Self {
            dir,
            file_name,
            ext,
        })
    }

    /// Extension with its leading dot, original case.
    pub fn dotted_ext(&self) -> String {
        if self.ext.is_empty() {
            String::new()
        } else {
            format!(".{}", self.ext)
        }
    }
}

/// Build the candidate catalog record for a file, fingerprint included.
///
/// `created_at` and `updated_at` are both `now`; the caller carries over
/// `created_at` when the record replaces an existing row.
pub fn build_photo(
    id: String,
    location: &FileLocation<'_>,
    extracted: Extracted,
    now: DateTime<Utc>,
) -> Photo {
    let Extracted {
        dimensions,
        metadata,
    } = extracted;

    let keywords = clean_list(metadata.keywords);
    let year = year_from(&keywords, metadata.creation_date_time);

    let mut photo = Photo {
        id,
        file_name: location.file_name.to_string(),
        ext: location.dotted_ext(),
        full_path: location.dir.to_path_buf(),
        metadata_hash: String::new(),
        lens_make: text(metadata.lens_make),
        lens_model: text(metadata.lens_model),
        camera_make: text(metadata.camera_make),
        camera_model: text(metadata.camera_model),
        keywords,
        people: clean_list(metadata.people),
        caption: text(metadata.caption),
        title: text(metadata.title),
        creation_date_time: metadata.creation_date_time,
        width: dimensions.width,
        height: dimensions.height,
        latitude: metadata.latitude.unwrap_or(0.0),
        longitude: metadata.longitude.unwrap_or(0.0),
        year,
        created_at: now,
        updated_at: now,
    };
    photo.metadata_hash = metadata_fingerprint(&photo);
    photo
}
