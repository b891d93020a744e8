//! Library tree walk and folder catalog sync.
//!
//! A single depth-first pass over the library with `walkdir`, entries sorted
//! by file name. Every directory, the root included, is upserted into the
//! catalog on the walking thread as soon as it is entered. Every `.jpg` /
//! `.jpeg` file is handed to the caller, which queues a sync task for it.
//!
//! ## Folder records
//!
//! ```text
//! library/                 folder_name ""       parent_path ""
//! ├── 2023/                folder_name "2023"   parent_path ""
//! │   └── trip/            folder_name "trip"   parent_path "2023"
//! │       └── a.jpg
//! └── b.jpg
//! ```
//!
//! Parent paths come from [`FolderStack`], an explicit stack of the folders
//! on the path from the root to the current directory. Entering a directory
//! at depth `d` pops the stack back to `d` entries, which leaves exactly its
//! ancestors, so no recursion or path re-parsing is needed.
//!
//! Walk errors (unreadable directories) and folder save failures are
//! recorded and the walk continues with the next entry.

use crate::catalog::CatalogStore;
use crate::error::SyncError;
use crate::imaging::is_jpeg;
use crate::types::Folder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Ancestor stack for the directory currently being walked.
#[derive(Debug, Default)]
pub struct FolderStack {
    entries: Vec<Folder>,
}

impl FolderStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the directory `name` at walk depth `depth` (root = 0).
    ///
    /// Returns the folder record to save, with `parent_path` derived from the
    /// remaining stack top.
    pub fn enter(&mut self, depth: usize, name: &str, full_path: &Path) -> Folder {
        self.entries.truncate(depth);
        let parent_path = self
            .entries
            .last()
            .map(Folder::relative_path)
            .unwrap_or_default();

        let folder = Folder {
            folder_name: if depth == 0 {
                String::new()
            } else {
                name.to_string()
            },
            parent_path,
            full_path: full_path.to_path_buf(),
            key_photo_id: None,
        };
        self.entries.push(folder.clone());
        folder
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }
}

/// Counters and recoverable errors from one walk.
#[derive(Debug, Default)]
pub struct WalkSummary {
    pub folders: usize,
    pub photos: usize,
    pub skipped_files: usize,
    pub errors: Vec<SyncError>,
}

/// Walk `library`, saving folders to `catalog` and passing each photo path to
/// `on_photo`.
pub fn walk_library<C>(library: &Path, catalog: &C, mut on_photo: impl FnMut(PathBuf)) -> WalkSummary
where
    C: CatalogStore + ?Sized,
{
    let mut summary = WalkSummary::default();
    let mut stack = FolderStack::new();

    for entry in WalkDir::new(library).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                let path = e
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| library.to_path_buf());
                warn!(path = %path.display(), error = %e, "walk error");
                summary.errors.push(SyncError::io(path, e.into()));
                continue;
            }
        };

        if entry.file_type().is_dir() {
            let name = entry.file_name().to_string_lossy();
            let folder = stack.enter(entry.depth(), &name, entry.path());
            debug!(folder = %folder.relative_path(), "folder");
            if let Err(e) = catalog.save_folder(&folder) {
                summary.errors.push(SyncError::storage(
                    format!("saving folder '{}'", folder.full_path.display()),
                    e,
                ));
            }
            summary.folders += 1;
        } else if is_jpeg(entry.path()) {
            summary.photos += 1;
            on_photo(entry.into_path());
        } else {
            summary.skipped_files += 1;
        }
    }

    summary
}
