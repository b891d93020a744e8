//! Catalog record types shared by the walker, the per-file tasks, the reaper
//! and the catalog adapters.

use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};

/// One directory in the library.
///
/// `parent_path` is library-relative without a leading separator, so the
/// library root and its direct children both have an empty parent path. The
/// root itself has an empty `folder_name`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Folder {
    pub folder_name: String,
    pub parent_path: String,
    pub full_path: PathBuf,
    pub key_photo_id: Option<String>,
}

impl Folder {
    /// Library-relative path of this folder (`parent_path/folder_name`).
    pub fn relative_path(&self) -> String {
        join_relative(&self.parent_path, &self.folder_name)
    }

    /// Build the folder record for an album from its library-relative path.
    pub fn from_relative(library: &Path, relative: &str) -> Self {
        let relative = relative.trim_matches('/');
        let (parent_path, folder_name) = match relative.rsplit_once('/') {
            Some((parent, name)) => (parent.to_string(), name.to_string()),
            None => (String::new(), relative.to_string()),
        };
        Self {
            folder_name,
            parent_path,
            full_path: if relative.is_empty() {
                library.to_path_buf()
            } else {
                library.join(relative)
            },
            key_photo_id: None,
        }
    }
}

/// Join two library-relative segments with `/`, skipping empty ones.
pub fn join_relative(parent: &str, name: &str) -> String {
    match (parent.is_empty(), name.is_empty()) {
        (true, _) => name.to_string(),
        (false, true) => parent.to_string(),
        (false, false) => format!("{parent}/{name}"),
    }
}

/// One image file in the library.
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    /// Platform file identity, see [`crate::identity`].
    pub id: String,
    /// File stem without the extension.
    pub file_name: String,
    /// Extension including the leading dot, original case.
    pub ext: String,
    /// Containing directory.
    pub full_path: PathBuf,
    pub metadata_hash: String,
    pub lens_make: String,
    pub lens_model: String,
    pub camera_make: String,
    pub camera_model: String,
    pub keywords: Vec<String>,
    pub people: Vec<String>,
    pub caption: String,
    pub title: String,
    pub creation_date_time: Option<NaiveDateTime>,
    pub width: u32,
    pub height: u32,
    pub latitude: f64,
    pub longitude: f64,
    pub year: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Photo {
    /// Absolute path of the source image.
    pub fn source_path(&self) -> PathBuf {
        self.full_path.join(format!("{}{}", self.file_name, self.ext))
    }

    /// Containing directory relative to the library root, `/`-separated.
    pub fn album_path(&self, library: &Path) -> String {
        relative_to(library, &self.full_path)
    }

    /// True when this record describes the file at `dir/file_name+ext`.
    pub fn is_at(&self, dir: &Path, file_name: &str, ext: &str) -> bool {
        self.file_name == file_name && self.ext == ext && self.full_path == dir
    }
}

/// Express `path` relative to `root` with `/` separators.
///
/// Returns an empty string for the root itself or for paths outside it.
pub fn relative_to(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}
