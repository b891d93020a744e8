//! Pure Rust image processing backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::image_dimensions` (header only) |
//! | Decode | `image::ImageReader` (JPEG) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |
//! | EXIF | `kamadak-exif` via [`exif_reader`](super::exif_reader) |
//! | IPTC / XMP | in-crate segment parsers |

use super::backend::{BackendError, Dimensions, ImageBackend, ImageMetadata};
use super::calculations::fit_longer_edge;
use super::exif_reader::read_exif;
use super::iptc_parser::read_iptc_from_jpeg;
use super::params::ThumbnailParams;
use super::xmp_parser::read_xmp_from_jpeg;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::io::BufWriter;
use std::path::Path;

const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// True when the path has a `.jpg`/`.jpeg` extension, any case.
pub fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| JPEG_EXTENSIONS.iter().any(|j| e.eq_ignore_ascii_case(j)))
}

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

fn save_jpeg(img: &DynamicImage, path: &Path, quality: u8) -> Result<(), BackendError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), quality);
    // JPEG has no alpha channel
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| match e {
            image::ImageError::IoError(io) => BackendError::Io(io),
            other => {
                BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", other))
            }
        })?;
        Ok(Dimensions { width, height })
    }

    fn read_metadata(&self, path: &Path) -> Result<ImageMetadata, BackendError> {
        let data = std::fs::read(path)?;
        let exif = read_exif(&data);
        let iptc = read_iptc_from_jpeg(&data);
        let xmp = read_xmp_from_jpeg(&data);

        Ok(ImageMetadata {
            title: xmp.title.or(iptc.object_name),
            caption: exif.description.or(iptc.caption),
            keywords: iptc.keywords,
            people: xmp.people,
            camera_make: exif.camera_make,
            camera_model: exif.camera_model,
            lens_make: exif.lens_make,
            lens_model: exif.lens_model,
            creation_date_time: exif.creation_date_time,
            latitude: exif.latitude,
            longitude: exif.longitude,
        })
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
        if !is_jpeg(&params.source) {
            return Err(BackendError::UnsupportedFormat(params.source.clone()));
        }
        let img = load_image(&params.source)?;
        let (width, height) = fit_longer_edge((img.width(), img.height()), params.max_edge);
        let resized = img.resize_exact(width, height, FilterType::Lanczos3);
        save_jpeg(&resized, &params.output, params.quality.value())
    }
}
