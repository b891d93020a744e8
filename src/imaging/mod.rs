//! Image processing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **EXIF** | `kamadak-exif` |
//! | **IPTC / XMP** | in-crate JPEG segment parsers |
//! | **Thumbnail** | `resize_exact` (Lanczos3) + JPEG encoder |
//!
//! The module is split into:
//! - **Calculations**: pure dimension math (unit testable)
//! - **Parameters**: data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: thumbnail planning on top of the backend

pub mod backend;
mod calculations;
mod exif_reader;
pub(crate) mod iptc_parser;
mod jpeg_segments;
pub mod operations;
mod params;
pub mod rust_backend;
pub(crate) mod xmp_parser;

pub use backend::{BackendError, Dimensions, ImageBackend, ImageMetadata};
pub use calculations::fit_longer_edge;
pub use operations::create_thumbnail;
pub use params::{Quality, ThumbnailParams};
pub use rust_backend::{RustBackend, is_jpeg};
