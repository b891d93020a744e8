//! Sync engine: one run = reap orphans, walk, sync every photo, report.
//!
//! ```text
//! run ─► acquire run lock ──(held)──► AlreadyRunning
//!          │
//!          ▼
//!        read settings ─► check library ─► snapshot catalog
//!          │
//!          ▼
//!        OrphanReaper over the snapshot
//!          │
//!          ▼
//!        walk library ── folder ─► catalog.save_folder      (walking thread)
//!                      └─ photo  ─► pool task: sync_file     (N workers)
//!          │
//!          ▼
//!        join ─► SyncReport { stats, errors }
//! ```
//!
//! Only one run executes at a time per engine. The lock is an atomic flag
//! taken with compare-and-swap and released by a guard on every exit path, so
//! a second caller gets [`SyncError::AlreadyRunning`] instead of waiting.

use crate::cache::ThumbnailCache;
use crate::catalog::CatalogStore;
use crate::config::{SettingsProvider, effective_workers};
use crate::error::SyncError;
use crate::imaging::ImageBackend;
use crate::pool::WorkerPool;
use crate::process::{Snapshot, SyncContext, TaskOutcome, TaskReport};
use crate::reaper::OrphanReaper;
use crate::scan::walk_library;
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{info, warn};

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub folders: usize,
    pub photos: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub thumbnails_restored: usize,
    pub failed: usize,
    pub skipped_files: usize,
    pub removed_photos: usize,
    pub removed_thumbnails: usize,
    pub pruned_dirs: usize,
    pub elapsed_ms: u64,
}

impl SyncStats {
    fn record(&mut self, outcome: TaskOutcome) {
        match outcome {
            TaskOutcome::Created => self.created += 1,
            TaskOutcome::Updated => self.updated += 1,
            TaskOutcome::Unchanged => self.unchanged += 1,
            TaskOutcome::ThumbnailRestored => self.thumbnails_restored += 1,
            TaskOutcome::Failed => self.failed += 1,
        }
    }
}

/// Outcome of a completed run: counters plus every recoverable error.
#[derive(Debug, Default)]
pub struct SyncReport {
    pub stats: SyncStats,
    pub errors: Vec<SyncError>,
}

impl SyncReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct SyncEngine<S, C, T, B> {
    settings: S,
    catalog: C,
    thumbnails: T,
    backend: B,
    running: AtomicBool,
}

/// Holds the run lock; releases it on drop.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn try_acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<S, C, T, B> SyncEngine<S, C, T, B>
where
    S: SettingsProvider,
    C: CatalogStore,
    T: ThumbnailCache,
    B: ImageBackend,
{
    pub fn new(settings: S, catalog: C, thumbnails: T, backend: B) -> Self {
        Self {
            settings,
            catalog,
            thumbnails,
            backend,
            running: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &S {
        &self.settings
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn thumbnails(&self) -> &T {
        &self.thumbnails
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run one sync pass.
    ///
    /// `Err` means the run did not happen (or could not load the catalog);
    /// per-file and per-row failures are in [`SyncReport::errors`].
    pub fn run(&self) -> Result<SyncReport, SyncError> {
        let _guard = RunGuard::try_acquire(&self.running).ok_or(SyncError::AlreadyRunning)?;
        let started = Instant::now();

        let settings = self.settings.read()?;
        let library = settings.library_path.as_path();
        if library.as_os_str().is_empty() || !library.is_dir() {
            return Err(SyncError::InvalidLibraryPath(library.to_path_buf()));
        }
        let cache_root = settings.cache_path.as_path();
        std::fs::create_dir_all(cache_root).map_err(|e| SyncError::io(cache_root, e))?;

        let pool = WorkerPool::new(effective_workers(&settings))?;
        info!(
            library = %library.display(),
            cache = %cache_root.display(),
            workers = pool.workers(),
            "sync started"
        );

        let snapshot = Snapshot::new(
            self.catalog
                .all_photos()
                .map_err(|e| SyncError::storage("loading catalog", e))?,
        );
        info!(photos = snapshot.len(), "catalog loaded");

        let mut report = SyncReport::default();

        let reaped = OrphanReaper {
            library,
            cache_root,
            catalog: &self.catalog,
            thumbnails: &self.thumbnails,
        }
        .reap(snapshot.photos());
        report.stats.removed_photos = reaped.removed_photos;
        report.stats.removed_thumbnails = reaped.removed_thumbnails;
        report.stats.pruned_dirs = reaped.pruned_dirs;
        report.errors.extend(reaped.errors);

        let ctx = SyncContext {
            library,
            cache_root,
            snapshot: &snapshot,
            catalog: &self.catalog,
            thumbnails: &self.thumbnails,
            backend: &self.backend,
            thumbnail_size: settings.thumbnail_size,
            now: Utc::now(),
        };
        let out = pool.scope(|group| {
            walk_library(library, &self.catalog, |path| {
                group.submit(move || ctx.sync_file(&path))
            })
        });

        let walk = out.value;
        report.stats.folders = walk.folders;
        report.stats.photos = walk.photos;
        report.stats.skipped_files = walk.skipped_files;
        report.errors.extend(walk.errors);

        for TaskReport {
            outcome, errors, ..
        } in out.results
        {
            report.stats.record(outcome);
            report.errors.extend(errors);
        }
        if out.panicked > 0 {
            warn!(tasks = out.panicked, "tasks panicked");
            report.stats.failed += out.panicked;
        }

        report.stats.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            created = report.stats.created,
            updated = report.stats.updated,
            unchanged = report.stats.unchanged,
            removed = report.stats.removed_photos,
            errors = report.errors.len(),
            elapsed_ms = report.stats.elapsed_ms,
            "sync finished"
        );
        Ok(report)
    }
}
