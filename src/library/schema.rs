//! Schema creation and migrations for the player library
//!
//! Every step is idempotent so it runs on each start of the tools.

use rusqlite::{params, Connection, ErrorCode};
use serde::{Deserialize, Serialize};

use super::bands::seed_builtin_exceptions;
use super::paths::normalize_file_path;
use crate::error::LibraryError;

const CREATE_TRACKS: &str = "
    CREATE TABLE IF NOT EXISTS tracks (
      id         INTEGER PRIMARY KEY,
      title      TEXT,
      artist     TEXT,
      album      TEXT,
      genre      TEXT,
      duration   REAL,
      path       TEXT,
      filePath   TEXT,
      normalized INTEGER DEFAULT 0,
      updated_at DATETIME DEFAULT (datetime('now'))
    );
";

// Run once every indexed column exists
const CREATE_TRACK_INDEXES: &str = "
    CREATE INDEX IF NOT EXISTS idx_tracks_artist ON tracks(artist);
    CREATE INDEX IF NOT EXISTS idx_tracks_album  ON tracks(album);
    CREATE INDEX IF NOT EXISTS idx_tracks_genre  ON tracks(genre);
    CREATE UNIQUE INDEX IF NOT EXISTS idx_tracks_filePath ON tracks(filePath);
";

const CREATE_SUPPORT_TABLES: &str = "
    CREATE TABLE IF NOT EXISTS samples (
      id          INTEGER PRIMARY KEY,
      filePath    TEXT NOT NULL,
      name        TEXT,
      duration    REAL,
      pad_index   INTEGER,
      created_at  DATETIME DEFAULT (datetime('now'))
    );
    CREATE UNIQUE INDEX IF NOT EXISTS idx_samples_filePath ON samples(filePath);

    CREATE TABLE IF NOT EXISTS playlists (
      id         INTEGER PRIMARY KEY,
      name       TEXT NOT NULL,
      created_at DATETIME DEFAULT (datetime('now')),
      updated_at DATETIME DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS playlist_tracks (
      id          INTEGER PRIMARY KEY,
      playlist_id INTEGER NOT NULL,
      track_id    INTEGER NOT NULL,
      position    INTEGER NOT NULL,
      added_at    DATETIME DEFAULT (datetime('now')),
      FOREIGN KEY (playlist_id) REFERENCES playlists(id) ON DELETE CASCADE,
      FOREIGN KEY (track_id) REFERENCES tracks(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_playlist_tracks_playlist ON playlist_tracks(playlist_id);
    CREATE INDEX IF NOT EXISTS idx_playlist_tracks_position ON playlist_tracks(playlist_id, position);

    CREATE TABLE IF NOT EXISTS band_name_exceptions (
      id           INTEGER PRIMARY KEY,
      variant      TEXT NOT NULL UNIQUE,
      correct_name TEXT NOT NULL,
      category     TEXT DEFAULT 'manual',
      usage_count  INTEGER DEFAULT 0,
      created_at   DATETIME DEFAULT (datetime('now')),
      updated_at   DATETIME DEFAULT (datetime('now'))
    );
    CREATE INDEX IF NOT EXISTS idx_band_exceptions_variant ON band_name_exceptions(variant);
    CREATE INDEX IF NOT EXISTS idx_band_exceptions_correct ON band_name_exceptions(correct_name);

    CREATE TABLE IF NOT EXISTS normalize_settings (
      key   TEXT PRIMARY KEY,
      value TEXT
    );
";

/// Tables owned by the player, in creation order
pub const TABLES: [&str; 6] = [
    "tracks",
    "samples",
    "playlists",
    "playlist_tracks",
    "band_name_exceptions",
    "normalize_settings",
];

/// `tracks` columns added to older databases, with their declarations
///
/// `updated_at` is declared without its `datetime('now')` default because
/// SQLite refuses non-constant defaults in `ALTER TABLE ADD COLUMN`.
pub const TRACK_COLUMNS: &[(&str, &str)] = &[
    ("title", "TEXT"),
    ("artist", "TEXT"),
    ("album", "TEXT"),
    ("genre", "TEXT"),
    ("duration", "REAL"),
    ("path", "TEXT"),
    ("filePath", "TEXT"),
    ("normalized", "INTEGER DEFAULT 0"),
    ("updated_at", "DATETIME"),
    ("bpm", "INTEGER DEFAULT NULL"),
    ("key", "TEXT DEFAULT NULL"),
    ("analyzed", "INTEGER DEFAULT 0"),
    ("bpmConfidence", "TEXT DEFAULT NULL"),
    ("keyConfidence", "TEXT DEFAULT NULL"),
    ("camelotKey", "TEXT DEFAULT NULL"),
    ("energy", "REAL DEFAULT NULL"),
    ("loudness", "REAL DEFAULT NULL"),
    ("gainRecommendation", "TEXT DEFAULT NULL"),
    ("loudnessLUFS", "REAL DEFAULT NULL"),
    ("loudnessRange", "REAL DEFAULT NULL"),
    ("cueIn", "REAL DEFAULT NULL"),
    ("cueOut", "REAL DEFAULT NULL"),
    ("cueDescription", "TEXT DEFAULT NULL"),
    ("danceability", "REAL DEFAULT NULL"),
    ("acousticness", "REAL DEFAULT NULL"),
    ("instrumentalness", "REAL DEFAULT NULL"),
    ("liveness", "REAL DEFAULT NULL"),
    ("bpmNote", "TEXT DEFAULT NULL"),
    ("rawBpm", "INTEGER DEFAULT NULL"),
    ("groove", "TEXT DEFAULT NULL"),
    ("comments", "TEXT DEFAULT NULL"),
    ("rating", "INTEGER DEFAULT NULL"),
    ("color", "TEXT DEFAULT NULL"),
    ("labels", "TEXT DEFAULT NULL"),
    ("phraseData", "TEXT DEFAULT NULL"),
    ("phraseLength", "INTEGER DEFAULT NULL"),
    ("energyTrajectory", "TEXT DEFAULT NULL"),
    ("energyTrajectoryDesc", "TEXT DEFAULT NULL"),
    ("bpmDrift", "TEXT DEFAULT NULL"),
    ("transitionDifficulty", "INTEGER DEFAULT NULL"),
    ("transitionDescription", "TEXT DEFAULT NULL"),
    ("playCount", "INTEGER DEFAULT 0"),
    ("lastPlayed", "INTEGER DEFAULT NULL"),
    ("thumbnailPath", "TEXT DEFAULT NULL"),
    ("thumbnailHash", "TEXT DEFAULT NULL"),
    ("skipCount", "INTEGER DEFAULT 0"),
    ("skipRate", "REAL DEFAULT 0"),
    ("vocalScore", "TEXT DEFAULT NULL"),
    ("harmonyCompatibility", "TEXT DEFAULT NULL"),
    ("pregainDb", "REAL"),
    ("year", "INTEGER"),
    ("disc", "INTEGER"),
    ("hasPlaybackError", "INTEGER DEFAULT 0"),
];

/// What `ensure_schema` changed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    /// Tables that did not exist before
    pub created_tables: Vec<String>,
    /// `tracks` columns that were added
    pub added_columns: Vec<String>,
    /// Rows whose `filePath` was copied from the legacy `path`
    pub backfilled_paths: usize,
    /// Rows whose NULL `pregainDb` was set to 0
    pub pregain_defaults: usize,
    /// Rows whose `filePath` was normalised
    pub normalized_paths: usize,
    /// Built-in band exceptions inserted
    pub seeded_exceptions: usize,
}

impl MigrationReport {
    /// Whether the database was already current
    pub fn is_noop(&self) -> bool {
        *self == MigrationReport::default()
    }
}

/// Whether `table` exists
pub fn table_exists(conn: &Connection, table: &str) -> Result<bool, LibraryError> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Column names of `table` in declaration order (empty if it does not exist)
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, LibraryError> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let names = stmt.query_map([table], |row| row.get::<_, String>(0))?;
    Ok(names.collect::<Result<Vec<_>, _>>()?)
}

/// Whether `table` has a column named `column`
pub fn has_column(conn: &Connection, table: &str, column: &str) -> Result<bool, LibraryError> {
    Ok(table_columns(conn, table)?.iter().any(|c| c == column))
}

fn add_column(
    conn: &Connection,
    column: &str,
    declaration: &str,
    report: &mut MigrationReport,
) -> Result<(), LibraryError> {
    if has_column(conn, "tracks", column)? {
        return Ok(());
    }
    conn.execute_batch(&format!(
        "ALTER TABLE tracks ADD COLUMN \"{}\" {}",
        column, declaration
    ))?;
    log::debug!("Added tracks.{} column", column);
    report.added_columns.push(column.to_string());
    Ok(())
}

/// Create missing tables and columns and run the data migrations
///
/// All steps run in one transaction; a failing step leaves the database as
/// it was.
///
/// # Errors
///
/// Returns `LibraryError::Sqlite` on any failed statement. A normalised path
/// that collides with an existing row is logged and left as it was.
pub fn ensure_schema(conn: &mut Connection) -> Result<MigrationReport, LibraryError> {
    let tx = conn.transaction()?;
    let report = migrate(&tx)?;
    tx.commit()?;

    if !report.created_tables.is_empty() || !report.added_columns.is_empty() {
        log::debug!(
            "Schema updated: {} tables created, {} columns added",
            report.created_tables.len(),
            report.added_columns.len()
        );
    }

    Ok(report)
}

fn migrate(conn: &Connection) -> Result<MigrationReport, LibraryError> {
    let mut report = MigrationReport::default();

    for table in TABLES {
        if !table_exists(conn, table)? {
            report.created_tables.push(table.to_string());
        }
    }

    conn.execute_batch(CREATE_TRACKS)?;
    for (column, declaration) in TRACK_COLUMNS {
        add_column(conn, column, declaration, &mut report)?;
    }
    if !has_column(conn, "tracks", "track")? {
        add_column(conn, "trackNo", "INTEGER", &mut report)?;
    }
    conn.execute_batch(CREATE_TRACK_INDEXES)?;
    conn.execute_batch(CREATE_SUPPORT_TABLES)?;

    report.backfilled_paths = conn.execute(
        "UPDATE tracks SET filePath = path
         WHERE (filePath IS NULL OR filePath = '') AND path IS NOT NULL",
        [],
    )?;
    report.pregain_defaults =
        conn.execute("UPDATE tracks SET pregainDb = 0 WHERE pregainDb IS NULL", [])?;
    report.seeded_exceptions = seed_builtin_exceptions(conn)?;
    report.normalized_paths = normalize_paths(conn)?;

    Ok(report)
}

fn normalize_paths(conn: &Connection) -> Result<usize, LibraryError> {
    let rows: Vec<(i64, String)> = {
        let mut stmt = conn.prepare("SELECT id, filePath FROM tracks WHERE filePath IS NOT NULL")?;
        let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    let mut update = conn.prepare("UPDATE tracks SET filePath = ?1 WHERE id = ?2")?;
    let mut changed = 0;
    for (id, file_path) in rows {
        let normalized = normalize_file_path(&file_path);
        if normalized == file_path {
            continue;
        }
        match update.execute(params![normalized, id]) {
            Ok(_) => changed += 1,
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == ErrorCode::ConstraintViolation =>
            {
                log::warn!(
                    "Track {}: normalised path {} already belongs to another row",
                    id,
                    normalized
                );
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(changed)
}
