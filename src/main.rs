use clap::{Parser, Subcommand};
use photosync::cache::JpegThumbnailCache;
use photosync::catalog::SqliteCatalog;
use photosync::config::{self, Overrides, SettingsProvider, TomlSettings};
use photosync::engine::SyncEngine;
use photosync::error::SyncError;
use photosync::imaging::RustBackend;
use photosync::output;
use photosync::schedule::Schedule;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

type Engine =
    SyncEngine<TomlSettings, SqliteCatalog, JpegThumbnailCache<RustBackend>, RustBackend>;

/// File name of the catalog database inside the cache directory.
const CATALOG_FILE: &str = "catalog.db";

#[derive(Parser)]
#[command(name = "photosync")]
#[command(about = "Keep a photo catalog and thumbnail cache in sync with a library")]
#[command(long_about = "\
Keep a photo catalog and thumbnail cache in sync with a library

Every directory under the library becomes a folder in the catalog and every
.jpg/.jpeg file becomes a photo, with its EXIF, IPTC and XMP metadata. A
thumbnail per photo is kept in the cache, mirroring the library tree:

  library/2023/trip/a.jpg  ->  cache/2023/trip/thumbnails/a.jpg
  cache/catalog.db             SQLite catalog

Each sync is incremental: unchanged photos are skipped, edited ones are
re-read, and photos whose file is gone are removed together with their
thumbnails.

Run 'photosync watch' to keep syncing on collector_schedule, and
'photosync gen-config' to generate a documented photosync.toml.")]
#[command(version)]
struct Cli {
    /// Settings file
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Photo library root (overrides the settings file)
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    /// Thumbnail cache root (overrides the settings file)
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// Number of concurrent workers (overrides the settings file)
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Log every file decision
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one sync pass and print a summary
    Sync {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Keep running and sync on `collector_schedule`
    Watch {
        /// Also sync once right away
        #[arg(long)]
        now: bool,
    },
    /// Validate settings and the library path without syncing
    Check,
    /// Print a stock photosync.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings = TomlSettings::new(&cli.config).with_overrides(Overrides {
        library_path: cli.library,
        cache_path: cli.cache,
        max_workers: cli.workers,
        thumbnail_size: None,
    });

    match cli.command {
        Command::Sync { json } => {
            let report = open_engine(settings)?.run()?;
            if json {
                output::print_sync_report_json(&report)?;
            } else {
                output::print_sync_report(&report);
            }
        }
        Command::Watch { now } => watch(&open_engine(settings)?, now)?,
        Command::Check => {
            let resolved = settings.read()?;
            output::print_settings(&resolved);
            if !resolved.library_path.is_dir() {
                return Err(SyncError::InvalidLibraryPath(resolved.library_path).into());
            }
            println!("==> Settings are valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn open_engine(settings: TomlSettings) -> Result<Engine, Box<dyn Error>> {
    let resolved = settings.read()?;
    let catalog = SqliteCatalog::open(&resolved.cache_path.join(CATALOG_FILE))?;
    Ok(SyncEngine::new(
        settings,
        catalog,
        JpegThumbnailCache::new(RustBackend::new()),
        RustBackend::new(),
    ))
}

/// Sync on every tick of `collector_schedule` until the process is killed.
///
/// Each run gets its own thread, so a run that outlasts the interval makes
/// the next tick hit the engine's run lock and be skipped. Settings are
/// re-read before every wait; a broken settings file is retried a minute
/// later.
fn watch(engine: &Engine, now: bool) -> Result<(), Box<dyn Error>> {
    std::thread::scope(|s| -> Result<(), Box<dyn Error>> {
        if now {
            s.spawn(move || scheduled_run(engine));
        }
        loop {
            let schedule = match engine.settings().read() {
                Ok(settings) => settings.collector_schedule.parse::<Schedule>()?,
                Err(e) => {
                    warn!(error = %e, "cannot read settings, retrying in a minute");
                    std::thread::sleep(Duration::from_secs(60));
                    continue;
                }
            };
            let current = chrono::Local::now().naive_local();
            let Some(next) = schedule.next_after(current) else {
                return Err(format!("collector_schedule '{schedule}' never fires").into());
            };
            info!(%schedule, next = %next, "waiting for next sync");
            std::thread::sleep((next - current).to_std().unwrap_or_default());
            s.spawn(move || scheduled_run(engine));
        }
    })
}

fn scheduled_run(engine: &Engine) {
    match engine.run() {
        Ok(report) => {
            if !report.is_clean() {
                warn!(count = report.errors.len(), "errors captured during sync");
                for e in &report.errors {
                    warn!(error = %e, "sync error");
                }
            }
            let stats = &report.stats;
            info!(
                created = stats.created,
                updated = stats.updated,
                removed = stats.removed_photos,
                failed = stats.failed,
                elapsed_ms = stats.elapsed_ms,
                "scheduled sync completed"
            );
        }
        Err(SyncError::AlreadyRunning) => warn!("previous sync still running, skipping this tick"),
        Err(e) => error!(error = %e, "scheduled sync failed"),
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `photosync=info`).
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "photosync=debug"
    } else {
        "photosync=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
