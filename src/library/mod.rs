//! Companion player library database
//!
//! The player keeps its catalogue in a SQLite file. This module brings old
//! databases up to the current schema and writes analysis results back to
//! the `tracks` table.

pub mod bands;
pub mod paths;
pub mod schema;

use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

pub use bands::{BandException, BUILTIN_EXCEPTIONS};
pub use paths::normalize_file_path;
pub use schema::{MigrationReport, TABLES, TRACK_COLUMNS};

use crate::analysis::result::{AnalysisResult, TrackReport, TrackSummary};
use crate::batch::runner::is_interrupted;
use crate::error::LibraryError;

/// Row count of one table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableCount {
    /// Table name
    pub name: String,
    /// Number of rows
    pub rows: i64,
}

/// Summary of the library state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryReport {
    /// All user tables with row counts
    pub tables: Vec<TableCount>,
    /// Columns of `tracks`
    pub track_columns: Vec<String>,
    /// Tracks with `analyzed = 1`
    pub analyzed: i64,
    /// Tracks still waiting for analysis
    pub pending: i64,
    /// Tracks flagged with a playback error
    pub playback_errors: i64,
    /// Tracks whose `filePath` no longer exists on disk
    pub missing_files: usize,
}

/// A track waiting for analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingTrack {
    /// Row id
    pub id: i64,
    /// Audio file path
    pub file_path: String,
}

/// Handle on the player database
#[derive(Debug)]
pub struct Library {
    conn: Connection,
}

impl Library {
    /// Open a database file in WAL mode, creating it and its folder if needed
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::Io` if the folder cannot be created and
    /// `LibraryError::Sqlite` if the file cannot be opened.
    pub fn open(path: &Path) -> Result<Self, LibraryError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        log::debug!("Opened library {} (journal mode {})", path.display(), mode);
        Ok(Self { conn })
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self, LibraryError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    /// Underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create missing tables and columns and run data migrations
    pub fn ensure_schema(&mut self) -> Result<MigrationReport, LibraryError> {
        schema::ensure_schema(&mut self.conn)
    }

    /// Whether `table` has `column`
    pub fn has_column(&self, table: &str, column: &str) -> Result<bool, LibraryError> {
        schema::has_column(&self.conn, table, column)
    }

    /// Column names of `table`
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>, LibraryError> {
        schema::table_columns(&self.conn, table)
    }

    /// Table sizes, track columns and analysis progress
    pub fn inspect(&self) -> Result<LibraryReport, LibraryError> {
        let names: Vec<String> = {
            let mut stmt = self.conn.prepare(
                "SELECT name FROM sqlite_master
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            )?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let rows: i64 = self.conn.query_row(
                &format!("SELECT COUNT(*) FROM \"{}\"", name.replace('"', "\"\"")),
                [],
                |row| row.get(0),
            )?;
            tables.push(TableCount { name, rows });
        }

        let track_columns = self.table_columns("tracks")?;
        let has = |column: &str| track_columns.iter().any(|c| c == column);

        let analyzed = if has("analyzed") {
            self.count("SELECT COUNT(*) FROM tracks WHERE analyzed = 1")?
        } else {
            0
        };
        let pending = if has("analyzed") && has("filePath") {
            self.count(
                "SELECT COUNT(*) FROM tracks
                 WHERE (analyzed IS NULL OR analyzed = 0)
                   AND filePath IS NOT NULL AND filePath != ''",
            )?
        } else {
            0
        };
        let playback_errors = if has("hasPlaybackError") {
            self.count("SELECT COUNT(*) FROM tracks WHERE hasPlaybackError = 1")?
        } else {
            0
        };
        let missing_files = if has("filePath") {
            let mut stmt = self.conn.prepare(
                "SELECT filePath FROM tracks WHERE filePath IS NOT NULL AND filePath != ''",
            )?;
            let paths = stmt.query_map([], |row| row.get::<_, String>(0))?;
            let mut missing = 0;
            for path in paths {
                if !Path::new(&path?).exists() {
                    missing += 1;
                }
            }
            missing
        } else {
            0
        };

        Ok(LibraryReport {
            tables,
            track_columns,
            analyzed,
            pending,
            playback_errors,
            missing_files,
        })
    }

    fn count(&self, sql: &str) -> Result<i64, LibraryError> {
        Ok(self.conn.query_row(sql, [], |row| row.get(0))?)
    }

    /// Tracks with a file path that have not been analysed, by row id
    pub fn pending_tracks(&self, limit: Option<usize>) -> Result<Vec<PendingTrack>, LibraryError> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = self.conn.prepare(
            "SELECT id, filePath FROM tracks
             WHERE (analyzed IS NULL OR analyzed = 0)
               AND filePath IS NOT NULL AND filePath != ''
             ORDER BY id LIMIT ?1",
        )?;
        let rows = stmt.query_map([limit], |row| {
            Ok(PendingTrack {
                id: row.get(0)?,
                file_path: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Store a successful analysis for the track at `file_path`
    ///
    /// The key is stored in long form ("A minor") next to its Camelot code.
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::NotFound` when no row has this path.
    pub fn record_analysis(
        &self,
        file_path: &str,
        result: &AnalysisResult,
    ) -> Result<(), LibraryError> {
        self.record_report(file_path, &TrackReport::from(result))
    }

    /// Store a batch report: summaries are written, failures flag the track
    ///
    /// Timed out or skipped files are left pending for the next run.
    pub fn record_report(&self, file_path: &str, report: &TrackReport) -> Result<(), LibraryError> {
        match report {
            TrackReport::Success(summary) => self.write_summary(file_path, summary),
            TrackReport::Failure(failure) if is_interrupted(&failure.error) => {
                log::warn!("{}: {}, left pending", file_path, failure.error);
                Ok(())
            }
            TrackReport::Failure(failure) => {
                log::warn!("{}: {}", file_path, failure.error);
                self.record_failure(file_path)
            }
        }
    }

    fn write_summary(&self, file_path: &str, summary: &TrackSummary) -> Result<(), LibraryError> {
        let changed = self.conn.execute(
            "UPDATE tracks
             SET bpm = ?1, key = ?2, camelotKey = ?3, bpmConfidence = ?4,
                 keyConfidence = ?5, rawBpm = ?6, analyzed = 1,
                 hasPlaybackError = 0, updated_at = datetime('now')
             WHERE filePath = ?7",
            params![
                summary.bpm,
                format!("{} {}", summary.key, summary.mode),
                summary.camelot,
                summary.confidence.bpm as f64,
                summary.confidence.key as f64,
                summary.raw_bpm.round() as i64,
                file_path,
            ],
        )?;
        if changed == 0 {
            return Err(LibraryError::NotFound(file_path.to_string()));
        }
        Ok(())
    }

    /// Flag the track at `file_path` as unplayable
    pub fn record_failure(&self, file_path: &str) -> Result<(), LibraryError> {
        let changed = self.conn.execute(
            "UPDATE tracks SET hasPlaybackError = 1, updated_at = datetime('now')
             WHERE filePath = ?1",
            [file_path],
        )?;
        if changed == 0 {
            return Err(LibraryError::NotFound(file_path.to_string()));
        }
        Ok(())
    }

    /// Set one `tracks` column of the row at `file_path`
    ///
    /// # Errors
    ///
    /// Returns `LibraryError::InvalidColumn` for `id` or any name that is not
    /// a column of `tracks`, and `LibraryError::NotFound` for an unknown path.
    pub fn set_column(
        &self,
        file_path: &str,
        column: &str,
        value: Value,
    ) -> Result<(), LibraryError> {
        let columns = self.table_columns("tracks")?;
        let column = columns
            .iter()
            .find(|c| c.as_str() == column && c.as_str() != "id")
            .ok_or_else(|| LibraryError::InvalidColumn(column.to_string()))?;

        let changed = self.conn.execute(
            &format!("UPDATE tracks SET \"{}\" = ?1 WHERE filePath = ?2", column),
            params![value, file_path],
        )?;
        if changed == 0 {
            return Err(LibraryError::NotFound(file_path.to_string()));
        }
        Ok(())
    }

    /// Read one `tracks` column of the row at `file_path`
    pub fn get_column(&self, file_path: &str, column: &str) -> Result<Value, LibraryError> {
        let columns = self.table_columns("tracks")?;
        let column = columns
            .iter()
            .find(|c| c.as_str() == column)
            .ok_or_else(|| LibraryError::InvalidColumn(column.to_string()))?;

        self.conn
            .query_row(
                &format!("SELECT \"{}\" FROM tracks WHERE filePath = ?1", column),
                [file_path],
                |row| row.get(0),
            )
            .optional()?
            .ok_or_else(|| LibraryError::NotFound(file_path.to_string()))
    }

    /// Add or replace a manual band name exception
    pub fn add_band_exception(
        &self,
        variant: &str,
        correct_name: &str,
    ) -> Result<(), LibraryError> {
        bands::upsert_exception(&self.conn, variant, correct_name, "manual")
    }

    /// All band name exceptions
    pub fn band_exceptions(&self) -> Result<Vec<BandException>, LibraryError> {
        bands::list_exceptions(&self.conn)
    }

    /// Rewrite artists matching an exception variant; returns rows changed
    pub fn apply_band_exceptions(&mut self) -> Result<usize, LibraryError> {
        bands::apply_exceptions(&mut self.conn)
    }
}

/// Interpret a command-line value for a column update
///
/// `null` maps to NULL, integers and decimals to numbers, anything else is
/// stored as text.
pub fn parse_column_value(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("null") {
        Value::Null
    } else if let Ok(i) = raw.parse::<i64>() {
        Value::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            Value::Real(f)
        } else {
            Value::Text(raw.to_string())
        }
    } else {
        Value::Text(raw.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::result::{AnalysisMetadata, Key};

    fn library_with_tracks() -> Library {
        let mut lib = Library::open_in_memory().unwrap();
        lib.ensure_schema().unwrap();
        lib.connection()
            .execute_batch(
                "INSERT INTO tracks (title, artist, filePath) VALUES ('Thunderstruck', 'ACDC', '/m/a.mp3');
                 INSERT INTO tracks (title, artist, filePath) VALUES ('Help', 'Beatles', '/m/b.mp3');
                 INSERT INTO tracks (title, artist, filePath) VALUES ('Intro', 'Unknown', NULL);",
            )
            .unwrap();
        lib
    }

    fn result() -> AnalysisResult {
        AnalysisResult {
            bpm: 128,
            raw_bpm: 63.8,
            bpm_confidence: 0.71,
            key: Key::Minor(9),
            key_confidence: 0.83,
            metadata: AnalysisMetadata {
                duration_seconds: 180.0,
                sample_rate: 22050,
                processing_time_ms: 12.0,
                onset_frames: 7752,
                octave_multiplier: 2.0,
            },
        }
    }

    #[test]
    fn test_pending_then_recorded() {
        let lib = library_with_tracks();
        let pending = lib.pending_tracks(None).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].file_path, "/m/a.mp3");
        assert_eq!(lib.pending_tracks(Some(1)).unwrap().len(), 1);

        lib.record_analysis("/m/a.mp3", &result()).unwrap();
        assert_eq!(lib.pending_tracks(None).unwrap().len(), 1);

        assert_eq!(lib.get_column("/m/a.mp3", "bpm").unwrap(), Value::Integer(128));
        assert_eq!(
            lib.get_column("/m/a.mp3", "key").unwrap(),
            Value::Text("A minor".to_string())
        );
        assert_eq!(
            lib.get_column("/m/a.mp3", "camelotKey").unwrap(),
            Value::Text("8A".to_string())
        );
        assert_eq!(lib.get_column("/m/a.mp3", "rawBpm").unwrap(), Value::Integer(64));
    }

    #[test]
    fn test_unknown_track() {
        let lib = library_with_tracks();
        assert!(matches!(
            lib.record_analysis("/m/missing.mp3", &result()),
            Err(LibraryError::NotFound(_))
        ));
        assert!(matches!(
            lib.record_failure("/m/missing.mp3"),
            Err(LibraryError::NotFound(_))
        ));
    }

    #[test]
    fn test_failure_report_flags_track() {
        let lib = library_with_tracks();
        lib.record_report("/m/b.mp3", &TrackReport::failure("Decoding error: bad frame"))
            .unwrap();
        assert_eq!(
            lib.get_column("/m/b.mp3", "hasPlaybackError").unwrap(),
            Value::Integer(1)
        );
        assert_eq!(lib.inspect().unwrap().playback_errors, 1);
    }

    #[test]
    fn test_timeout_leaves_track_pending() {
        let lib = library_with_tracks();
        lib.record_report("/m/a.mp3", &TrackReport::failure("timeout_60s")).unwrap();
        assert_eq!(
            lib.get_column("/m/a.mp3", "hasPlaybackError").unwrap(),
            Value::Integer(0)
        );
        assert_eq!(lib.pending_tracks(None).unwrap().len(), 2);

        let broken = TrackReport::failure("Decoding error: bad header");
        lib.record_report("/m/a.mp3", &broken).unwrap();
        assert_eq!(
            lib.get_column("/m/a.mp3", "hasPlaybackError").unwrap(),
            Value::Integer(1)
        );
    }

    #[test]
    fn test_open_creates_missing_folder() {
        let dir = tempfile::TempDir::new().unwrap();
        let db = dir.path().join("player").join("data").join("library.db");
        let mut lib = Library::open(&db).unwrap();
        lib.ensure_schema().unwrap();
        assert!(db.exists());

        // A file where the folder should be
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, b"not a folder").unwrap();
        assert!(matches!(
            Library::open(&blocked.join("library.db")),
            Err(LibraryError::Io(_))
        ));
    }

    #[test]
    fn test_inspect_legacy_database_without_migration() {
        let lib = Library::open_in_memory().unwrap();
        lib.connection()
            .execute_batch(
                "CREATE TABLE tracks (id INTEGER PRIMARY KEY, title TEXT, artist TEXT, path TEXT);
                 INSERT INTO tracks (title, path) VALUES ('Old', '/m/old.mp3');",
            )
            .unwrap();

        let report = lib.inspect().unwrap();
        assert_eq!(report.tables.len(), 1);
        assert_eq!(report.tables[0].rows, 1);
        assert_eq!(report.analyzed, 0);
        assert_eq!(report.pending, 0);
        assert!(!report.track_columns.contains(&"album".to_string()));
    }

    #[test]
    fn test_set_column_validates_name() {
        let lib = library_with_tracks();
        lib.set_column("/m/b.mp3", "rating", parse_column_value("5")).unwrap();
        assert_eq!(lib.get_column("/m/b.mp3", "rating").unwrap(), Value::Integer(5));

        for bad in ["id", "nope", "rating\"; DROP TABLE tracks; --"] {
            assert!(matches!(
                lib.set_column("/m/b.mp3", bad, Value::Null),
                Err(LibraryError::InvalidColumn(_))
            ));
        }
        assert!(lib.has_column("tracks", "rating").unwrap());
    }

    #[test]
    fn test_band_exceptions_applied() {
        let mut lib = library_with_tracks();
        lib.add_band_exception("Unknown", "Various Artists").unwrap();

        let changed = lib.apply_band_exceptions().unwrap();
        assert_eq!(changed, 3);

        let artists: Vec<String> = {
            let mut stmt = lib
                .connection()
                .prepare("SELECT artist FROM tracks ORDER BY id")
                .unwrap();
            let rows = stmt.query_map([], |r| r.get(0)).unwrap();
            rows.map(|r| r.unwrap()).collect()
        };
        assert_eq!(artists, vec!["AC-DC", "The Beatles", "Various Artists"]);

        let acdc = lib
            .band_exceptions()
            .unwrap()
            .into_iter()
            .find(|e| e.variant == "ACDC")
            .unwrap();
        assert_eq!(acdc.usage_count, 1);
        assert_eq!(acdc.category, "builtin");
        assert_eq!(lib.apply_band_exceptions().unwrap(), 0);
    }

    #[test]
    fn test_inspect_counts() {
        let lib = library_with_tracks();
        lib.record_analysis("/m/a.mp3", &result()).unwrap();
        let report = lib.inspect().unwrap();

        let tracks = report.tables.iter().find(|t| t.name == "tracks").unwrap();
        assert_eq!(tracks.rows, 3);
        assert_eq!(report.analyzed, 1);
        assert_eq!(report.pending, 1);
        assert_eq!(report.missing_files, 2);
        assert!(report.track_columns.contains(&"camelotKey".to_string()));
    }

    #[test]
    fn test_parse_column_value() {
        assert_eq!(parse_column_value("NULL"), Value::Null);
        assert_eq!(parse_column_value("42"), Value::Integer(42));
        assert_eq!(parse_column_value("-1.5"), Value::Real(-1.5));
        assert_eq!(parse_column_value("inf"), Value::Text("inf".to_string()));
        assert_eq!(parse_column_value("red"), Value::Text("red".to_string()));
    }
}
