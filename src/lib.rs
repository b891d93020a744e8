//! # photosync
//!
//! Keeps a catalog of a photo library and a cache of thumbnails in step with
//! the files on disk. The library is the source of truth: directories become
//! folders, `.jpg`/`.jpeg` files become photos, and a sync run makes the
//! catalog and the cache agree with whatever is there now.
//!
//! # One Run
//!
//! ```text
//! 1. Snapshot   catalog  →  Snapshot          (every photo row, indexed)
//! 2. Reap       Snapshot →  deletions         (rows + thumbnails of vanished files)
//! 3. Walk       library  →  folders + tasks   (folders saved inline)
//! 4. Sync       task     →  thumbnail + row   (N workers, one task per photo)
//! 5. Report     results  →  SyncReport        (counters + recoverable errors)
//! ```
//!
//! A run is idempotent: with no changes on disk, a second run reads every
//! file, finds every fingerprint unchanged, and writes nothing.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`engine`] | Run orchestration, run lock, [`SyncReport`](engine::SyncReport) |
//! | [`scan`] | Library walk, folder records from an explicit ancestor stack |
//! | [`process`] | Per-file task: snapshot lookup, create/update/replace decision |
//! | [`reaper`] | Orphan rows and thumbnails, bounded cache directory pruning |
//! | [`pool`] | Fixed-size worker pool with per-task error and panic capture |
//! | [`catalog`] | [`CatalogStore`](catalog::CatalogStore) port and its SQLite adapter |
//! | [`cache`] | [`ThumbnailCache`](cache::ThumbnailCache) port, cache layout |
//! | [`imaging`] | Pure-Rust decoding, thumbnails, EXIF/IPTC/XMP reading |
//! | [`metadata`] | Turning a decoded file into a catalog record |
//! | [`fingerprint`] | Order-insensitive metadata fingerprint (FNV-1a) |
//! | [`identity`] | Platform file identity used as the photo id |
//! | [`config`] | `photosync.toml` loading, merging, validation |
//! | [`schedule`] | Cron expressions driving `photosync watch` |
//! | [`types`] | `Folder` and `Photo` records |
//! | [`error`] | Fatal vs recoverable error taxonomy |
//! | [`output`] | CLI output formatting |
//!
//! # Ports
//!
//! The engine talks to the outside world through four traits:
//! [`SettingsProvider`](config::SettingsProvider),
//! [`CatalogStore`](catalog::CatalogStore),
//! [`ThumbnailCache`](cache::ThumbnailCache) and
//! [`ImageBackend`](imaging::ImageBackend). All of them take `&self` and are
//! `Sync`, since the walker and every worker share one instance of each.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod imaging;
pub mod metadata;
pub mod output;
pub mod pool;
pub mod process;
pub mod reaper;
pub mod scan;
pub mod schedule;
pub mod types;

pub use engine::{SyncEngine, SyncReport, SyncStats};
pub use error::SyncError;

#[cfg(test)]
pub(crate) mod test_helpers;
