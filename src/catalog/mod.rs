//! Catalog of folders and photos mirroring the library tree.
//!
//! [`CatalogStore`] is the port the sync engine writes through. The
//! production adapter is [`SqliteCatalog`]; tests use the in-memory
//! `MemoryCatalog` from `test_helpers`.
//!
//! Every method takes `&self`: the engine shares one store between the walker
//! and all worker threads, so implementations synchronize internally.

mod sqlite;

pub use sqlite::SqliteCatalog;

use crate::types::{Folder, Photo};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog lock poisoned")]
    Poisoned,
    #[error("not found: {0}")]
    NotFound(String),
}

pub trait CatalogStore: Sync {
    /// Every photo, keywords and people included.
    fn all_photos(&self) -> Result<Vec<Photo>, StorageError>;

    /// Insert or update by `id`, replacing keyword and people links.
    fn save_photo(&self, photo: &Photo) -> Result<(), StorageError>;

    /// Delete a photo and its links. Unknown ids are [`StorageError::NotFound`].
    fn delete_photo(&self, id: &str) -> Result<(), StorageError>;

    /// Delete `photo.id` only while its row still sits at `photo`'s location.
    ///
    /// Returns whether a row was deleted. A row that has since been saved at
    /// another location is left alone.
    fn delete_photo_at(&self, photo: &Photo) -> Result<bool, StorageError>;

    /// Insert or update by `full_path`. A `None` key photo keeps the stored one.
    fn save_folder(&self, folder: &Folder) -> Result<(), StorageError>;

    /// Delete by name and parent path. Deleting an unknown folder is a no-op.
    fn delete_folder(&self, folder_name: &str, parent_path: &str) -> Result<(), StorageError>;

    fn all_folders(&self) -> Result<Vec<Folder>, StorageError>;
}
