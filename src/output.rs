//! CLI output formatting for sync runs and configuration checks.
//!
//! # Output Format
//!
//! ## Sync
//!
//! ```text
//! Library
//!     Folders: 3
//!     Photos: 12 (1 other file skipped)
//! Photos
//!     created: 2
//!     updated: 1
//!     unchanged: 8
//!     thumbnail restored: 0
//!     failed: 1
//! Orphans
//!     removed: 1 photo, 1 thumbnail, 2 directories
//! Errors
//!     could not decode '/photos/2023/b.jpg': invalid JPEG
//!
//! Synced in 1.24s
//! ```
//!
//! With `--json` the same report is printed as one JSON object:
//! `{"stats": {...}, "errors": ["..."]}`.
//!
//! ## Check
//!
//! ```text
//! Settings
//!     Library: /photos
//!     Cache: /var/cache/photosync
//!     Workers: 5
//!     Thumbnail size: 300px
//!     Schedule: 0 */1 * * *
//! ```
//!
//! # Architecture
//!
//! Every report has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::config::Settings;
use crate::engine::{SyncReport, SyncStats};
use serde::Serialize;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// `1 photo`, `2 photos`.
fn plural(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

fn format_elapsed(ms: u64) -> String {
    if ms < 1000 {
        format!("{ms}ms")
    } else {
        format!("{:.2}s", ms as f64 / 1000.0)
    }
}

// ============================================================================
// Sync report
// ============================================================================

pub fn format_sync_report(report: &SyncReport) -> Vec<String> {
    let s = &report.stats;
    let mut lines = Vec::new();

    lines.push("Library".to_string());
    lines.push(format!("{}Folders: {}", indent(1), s.folders));
    if s.skipped_files > 0 {
        lines.push(format!(
            "{}Photos: {} ({} skipped)",
            indent(1),
            s.photos,
            plural(s.skipped_files, "other file", "other files")
        ));
    } else {
        lines.push(format!("{}Photos: {}", indent(1), s.photos));
    }

    lines.push("Photos".to_string());
    for (label, n) in [
        ("created", s.created),
        ("updated", s.updated),
        ("unchanged", s.unchanged),
        ("thumbnail restored", s.thumbnails_restored),
        ("failed", s.failed),
    ] {
        lines.push(format!("{}{label}: {n}", indent(1)));
    }

    if s.removed_photos > 0 || s.pruned_dirs > 0 {
        lines.push("Orphans".to_string());
        lines.push(format!(
            "{}removed: {}, {}, {}",
            indent(1),
            plural(s.removed_photos, "photo", "photos"),
            plural(s.removed_thumbnails, "thumbnail", "thumbnails"),
            plural(s.pruned_dirs, "directory", "directories")
        ));
    }

    if !report.errors.is_empty() {
        lines.push("Errors".to_string());
        for e in &report.errors {
            lines.push(format!("{}{e}", indent(1)));
        }
    }

    lines.push(String::new());
    lines.push(format!("Synced in {}", format_elapsed(s.elapsed_ms)));
    lines
}

pub fn print_sync_report(report: &SyncReport) {
    for line in format_sync_report(report) {
        println!("{}", line);
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    stats: &'a SyncStats,
    errors: Vec<String>,
}

/// The report as pretty-printed JSON. Errors are rendered as their messages.
pub fn format_sync_report_json(report: &SyncReport) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonReport {
        stats: &report.stats,
        errors: report.errors.iter().map(ToString::to_string).collect(),
    })
}

pub fn print_sync_report_json(report: &SyncReport) -> Result<(), serde_json::Error> {
    println!("{}", format_sync_report_json(report)?);
    Ok(())
}

// ============================================================================
// Check
// ============================================================================

pub fn format_settings(settings: &Settings) -> Vec<String> {
    let library = if settings.library_path.as_os_str().is_empty() {
        "(not set)".to_string()
    } else {
        settings.library_path.display().to_string()
    };
    vec![
        "Settings".to_string(),
        format!("{}Library: {library}", indent(1)),
        format!("{}Cache: {}", indent(1), settings.cache_path.display()),
        format!("{}Workers: {}", indent(1), settings.max_workers),
        format!("{}Thumbnail size: {}px", indent(1), settings.thumbnail_size),
        format!("{}Schedule: {}", indent(1), settings.collector_schedule),
    ]
}

pub fn print_settings(settings: &Settings) {
    for line in format_settings(settings) {
        println!("{}", line);
    }
}
