//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations the sync engine
//! needs from an imaging library: identify, read_metadata and thumbnail.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), pure Rust, built on the
//! `image` and `kamadak-exif` crates.

use super::params::ThumbnailParams;
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Unsupported image format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Embedded image metadata, merged from EXIF, IPTC and XMP.
///
/// Field mapping:
/// - `title`: XMP `dc:title`, falling back to IPTC Object Name (`2:05`)
/// - `caption`: EXIF ImageDescription, falling back to IPTC Caption-Abstract (`2:120`)
/// - `keywords`: IPTC Keywords (`2:25`), one entry per keyword
/// - `people`: XMP `Iptc4xmpExt:PersonInImage`
/// - camera, lens, capture time and GPS: EXIF
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageMetadata {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub keywords: Vec<String>,
    pub people: Vec<String>,
    pub camera_make: Option<String>,
    pub camera_model: Option<String>,
    pub lens_make: Option<String>,
    pub lens_model: Option<String>,
    pub creation_date_time: Option<NaiveDateTime>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Trait for image processing backends.
pub trait ImageBackend: Sync {
    /// Get image dimensions. Fails when the file is missing or not a decodable image.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Read embedded metadata. Missing metadata is not an error.
    fn read_metadata(&self, path: &Path) -> Result<ImageMetadata, BackendError>;

    /// Execute a thumbnail operation (fit longer edge, encode JPEG).
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError>;
}
