//! SQLite catalog adapter (bundled SQLite via `rusqlite`).
//!
//! Keywords and people are normalized into their own tables with link tables
//! carrying the position, so a photo reads back with its lists in the order
//! they were saved. Timestamps are stored as RFC 3339 text.

use super::{CatalogStore, StorageError};
use crate::types::{Folder, Photo};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row, Transaction, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

const SCHEMA: &str = "
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS folders (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        folder_name  TEXT NOT NULL,
        parent_path  TEXT NOT NULL,
        full_path    TEXT NOT NULL UNIQUE,
        key_photo_id TEXT
    );
    CREATE INDEX IF NOT EXISTS idx_folders_name_parent
        ON folders(folder_name, parent_path);

    CREATE TABLE IF NOT EXISTS photos (
        id                 TEXT PRIMARY KEY,
        file_name          TEXT NOT NULL,
        ext                TEXT NOT NULL,
        full_path          TEXT NOT NULL,
        metadata_hash      TEXT NOT NULL,
        lens_make          TEXT NOT NULL,
        lens_model         TEXT NOT NULL,
        camera_make        TEXT NOT NULL,
        camera_model       TEXT NOT NULL,
        caption            TEXT NOT NULL,
        title              TEXT NOT NULL,
        creation_date_time TEXT,
        width              INTEGER NOT NULL,
        height             INTEGER NOT NULL,
        latitude           REAL NOT NULL,
        longitude          REAL NOT NULL,
        year               TEXT NOT NULL,
        created_at         TEXT NOT NULL,
        updated_at         TEXT NOT NULL,
        UNIQUE (full_path, file_name, ext)
    );

    CREATE TABLE IF NOT EXISTS keywords (
        id      INTEGER PRIMARY KEY AUTOINCREMENT,
        keyword TEXT NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS photos_keywords (
        photo_id   TEXT NOT NULL REFERENCES photos(id) ON DELETE CASCADE,
        keyword_id INTEGER NOT NULL REFERENCES keywords(id) ON DELETE CASCADE,
        position   INTEGER NOT NULL,
        PRIMARY KEY (photo_id, keyword_id)
    );

    CREATE TABLE IF NOT EXISTS people (
        id   INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );
    CREATE TABLE IF NOT EXISTS photos_people (
        photo_id  TEXT NOT NULL REFERENCES photos(id) ON DELETE CASCADE,
        person_id INTEGER NOT NULL REFERENCES people(id) ON DELETE CASCADE,
        position  INTEGER NOT NULL,
        PRIMARY KEY (photo_id, person_id)
    );
";

const PHOTO_COLUMNS: &str = "id, file_name, ext, full_path, metadata_hash, lens_make, lens_model, \
     camera_make, camera_model, caption, title, creation_date_time, width, height, latitude, \
     longitude, year, created_at, updated_at";

const NAIVE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Catalog stored in a single SQLite database file.
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Open or create the catalog at `path`, creating parent directories.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        debug!(path = %path.display(), "opened catalog");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StorageError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::Poisoned)
    }
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn timestamp_text(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn conversion_error(
    idx: usize,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn naive_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<NaiveDateTime>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| NaiveDateTime::parse_from_str(&s, NAIVE_FORMAT).map_err(|e| conversion_error(idx, e)))
        .transpose()
}

fn photo_from_row(row: &Row<'_>) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        file_name: row.get(1)?,
        ext: row.get(2)?,
        full_path: PathBuf::from(row.get::<_, String>(3)?),
        metadata_hash: row.get(4)?,
        lens_make: row.get(5)?,
        lens_model: row.get(6)?,
        camera_make: row.get(7)?,
        camera_model: row.get(8)?,
        caption: row.get(9)?,
        title: row.get(10)?,
        creation_date_time: naive_column(row, 11)?,
        width: row.get(12)?,
        height: row.get(13)?,
        latitude: row.get(14)?,
        longitude: row.get(15)?,
        year: row.get(16)?,
        created_at: timestamp_column(row, 17)?,
        updated_at: timestamp_column(row, 18)?,
        keywords: Vec::new(),
        people: Vec::new(),
    })
}

/// `photo_id → [value]` in saved order, for one link table.
fn load_links(
    conn: &Connection,
    sql: &str,
) -> Result<HashMap<String, Vec<String>>, StorageError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;

    let mut links: HashMap<String, Vec<String>> = HashMap::new();
    for row in rows {
        let (photo_id, value) = row?;
        links.entry(photo_id).or_default().push(value);
    }
    Ok(links)
}

/// Replace the links of `photo_id` in one of the two list tables.
fn replace_links(
    tx: &Transaction<'_>,
    photo_id: &str,
    values: &[String],
    list: ListTable,
) -> Result<(), StorageError> {
    let (link_table, link_column, value_table, value_column) = list.names();

    tx.execute(
        &format!("DELETE FROM {link_table} WHERE photo_id = ?1"),
        [photo_id],
    )?;
    for (position, value) in values.iter().enumerate() {
        tx.execute(
            &format!("INSERT OR IGNORE INTO {value_table} ({value_column}) VALUES (?1)"),
            [value],
        )?;
        let value_id: i64 = tx.query_row(
            &format!("SELECT id FROM {value_table} WHERE {value_column} = ?1"),
            [value],
            |row| row.get(0),
        )?;
        tx.execute(
            &format!(
                "INSERT OR IGNORE INTO {link_table} (photo_id, {link_column}, position) VALUES (?1, ?2, ?3)"
            ),
            params![photo_id, value_id, position as i64],
        )?;
    }
    Ok(())
}

#[derive(Clone, Copy)]
enum ListTable {
    Keywords,
    People,
}

impl ListTable {
    fn names(self) -> (&'static str, &'static str, &'static str, &'static str) {
        match self {
            Self::Keywords => ("photos_keywords", "keyword_id", "keywords", "keyword"),
            Self::People => ("photos_people", "person_id", "people", "name"),
        }
    }
}

impl CatalogStore for SqliteCatalog {
    fn all_photos(&self) -> Result<Vec<Photo>, StorageError> {
        let conn = self.lock()?;

        let mut keywords = load_links(
            &conn,
            "SELECT pk.photo_id, k.keyword FROM photos_keywords pk \
             JOIN keywords k ON k.id = pk.keyword_id ORDER BY pk.photo_id, pk.position",
        )?;
        let mut people = load_links(
            &conn,
            "SELECT pp.photo_id, p.name FROM photos_people pp \
             JOIN people p ON p.id = pp.person_id ORDER BY pp.photo_id, pp.position",
        )?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos ORDER BY full_path, file_name, ext"
        ))?;
        let rows = stmt.query_map([], photo_from_row)?;

        let mut photos = Vec::new();
        for row in rows {
            let mut photo = row?;
            photo.keywords = keywords.remove(&photo.id).unwrap_or_default();
            photo.people = people.remove(&photo.id).unwrap_or_default();
            photos.push(photo);
        }
        Ok(photos)
    }

    fn save_photo(&self, photo: &Photo) -> Result<(), StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        tx.execute(
            &format!(
                "INSERT INTO photos ({PHOTO_COLUMNS}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19) \
                 ON CONFLICT(id) DO UPDATE SET \
                 file_name = excluded.file_name, ext = excluded.ext, full_path = excluded.full_path, \
                 metadata_hash = excluded.metadata_hash, lens_make = excluded.lens_make, \
                 lens_model = excluded.lens_model, camera_make = excluded.camera_make, \
                 camera_model = excluded.camera_model, caption = excluded.caption, \
                 title = excluded.title, creation_date_time = excluded.creation_date_time, \
                 width = excluded.width, height = excluded.height, latitude = excluded.latitude, \
                 longitude = excluded.longitude, year = excluded.year, \
                 created_at = excluded.created_at, updated_at = excluded.updated_at"
            ),
            params![
                photo.id,
                photo.file_name,
                photo.ext,
                path_text(&photo.full_path),
                photo.metadata_hash,
                photo.lens_make,
                photo.lens_model,
                photo.camera_make,
                photo.camera_model,
                photo.caption,
                photo.title,
                photo
                    .creation_date_time
                    .map(|dt| dt.format(NAIVE_FORMAT).to_string()),
                photo.width,
                photo.height,
                photo.latitude,
                photo.longitude,
                photo.year,
                timestamp_text(&photo.created_at),
                timestamp_text(&photo.updated_at),
            ],
        )?;
        replace_links(&tx, &photo.id, &photo.keywords, ListTable::Keywords)?;
        replace_links(&tx, &photo.id, &photo.people, ListTable::People)?;

        tx.commit()?;
        Ok(())
    }

    fn delete_photo(&self, id: &str) -> Result<(), StorageError> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM photos WHERE id = ?1", [id])?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("photo {id}")));
        }
        Ok(())
    }

    fn delete_photo_at(&self, photo: &Photo) -> Result<bool, StorageError> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM photos WHERE id = ?1 AND full_path = ?2 AND file_name = ?3 AND ext = ?4",
            params![
                photo.id,
                path_text(&photo.full_path),
                photo.file_name,
                photo.ext
            ],
        )?;
        debug!(id = %photo.id, deleted, "conditional photo delete");
        Ok(deleted > 0)
    }

    fn save_folder(&self, folder: &Folder) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO folders (folder_name, parent_path, full_path, key_photo_id) \
             VALUES (?1, ?2, ?3, ?4) \
             ON CONFLICT(full_path) DO UPDATE SET \
             folder_name = excluded.folder_name, parent_path = excluded.parent_path, \
             key_photo_id = COALESCE(excluded.key_photo_id, folders.key_photo_id)",
            params![
                folder.folder_name,
                folder.parent_path.trim_start_matches('/'),
                path_text(&folder.full_path),
                folder.key_photo_id,
            ],
        )?;
        Ok(())
    }

    fn delete_folder(&self, folder_name: &str, parent_path: &str) -> Result<(), StorageError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM folders WHERE folder_name = ?1 AND parent_path = ?2",
            [folder_name, parent_path.trim_start_matches('/')],
        )?;
        Ok(())
    }

    fn all_folders(&self) -> Result<Vec<Folder>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT folder_name, parent_path, full_path, key_photo_id FROM folders ORDER BY full_path",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Folder {
                folder_name: row.get(0)?,
                parent_path: row.get(1)?,
                full_path: PathBuf::from(row.get::<_, String>(2)?),
                key_photo_id: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
