//! Sqlite-backed profile store.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::map::CalibrationMap;

use super::{ProfileRecord, ProfileStore, StoreResult};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS calibration_profiles (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    name            TEXT NOT NULL UNIQUE,
    updated_at      TEXT NOT NULL,
    calibration_map TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_calibration_profiles_name
    ON calibration_profiles(name);
";

/// Profile store backed by a sqlite database file.
///
/// Maps are stored as JSON text; `AUTOINCREMENT` guarantees ids are never
/// reused after a delete. The connection sits behind a mutex, which is
/// plenty for the engine's one-writer access pattern.
pub struct SqliteProfileStore {
    conn: Mutex<Connection>,
}

impl SqliteProfileStore {
    /// Open or create the database at `path`, creating parent directories
    /// as needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.execute_batch(SCHEMA)?;
        tracing::debug!(path = %path.display(), "opened profile store");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn parse_record(id: i64, name: String, updated_at: String) -> StoreResult<ProfileRecord> {
        let updated_at = DateTime::parse_from_rfc3339(&updated_at)?.with_timezone(&Utc);
        Ok(ProfileRecord {
            id,
            name,
            updated_at,
        })
    }
}

impl ProfileStore for SqliteProfileStore {
    fn save(&self, name: &str, map: &CalibrationMap) -> StoreResult<i64> {
        let payload = serde_json::to_string(map)?;
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().expect("profile store lock poisoned");

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM calibration_profiles WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                conn.execute(
                    "UPDATE calibration_profiles
                     SET updated_at = ?1, calibration_map = ?2
                     WHERE id = ?3",
                    params![now, payload, id],
                )?;
                tracing::debug!(id, name, points = map.len(), "updated profile");
                Ok(id)
            }
            None => {
                conn.execute(
                    "INSERT INTO calibration_profiles (name, updated_at, calibration_map)
                     VALUES (?1, ?2, ?3)",
                    params![name, now, payload],
                )?;
                let id = conn.last_insert_rowid();
                tracing::debug!(id, name, points = map.len(), "created profile");
                Ok(id)
            }
        }
    }

    fn load(&self, id: i64) -> StoreResult<CalibrationMap> {
        let conn = self.conn.lock().expect("profile store lock poisoned");
        let payload: Option<String> = conn
            .query_row(
                "SELECT calibration_map FROM calibration_profiles WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match payload {
            Some(payload) => Ok(serde_json::from_str(&payload)?),
            None => {
                tracing::debug!(id, "unknown profile id, returning empty map");
                Ok(CalibrationMap::new())
            }
        }
    }

    fn list(&self) -> StoreResult<Vec<ProfileRecord>> {
        let conn = self.conn.lock().expect("profile store lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, updated_at FROM calibration_profiles ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (id, name, updated_at) = row?;
            records.push(Self::parse_record(id, name, updated_at)?);
        }
        Ok(records)
    }

    fn delete(&self, id: i64) -> StoreResult<()> {
        let conn = self.conn.lock().expect("profile store lock poisoned");
        let removed = conn.execute(
            "DELETE FROM calibration_profiles WHERE id = ?1",
            params![id],
        )?;
        tracing::debug!(id, removed, "deleted profile");
        Ok(())
    }
}
