//! SQLite-backed snapshot store.
//!
//! One row per key in a `snapshots` table. The file survives restarts and can
//! be inspected with any SQLite client to check cache ages.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use rusqlite::{Connection, OptionalExtension, params};
use serde_json::Value;

use super::{Snapshot, SnapshotInfo, SnapshotStore};
use crate::error::{LedgerError, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS snapshots (
    key         TEXT PRIMARY KEY,
    payload     TEXT NOT NULL,
    captured_at TEXT NOT NULL
);
";

/// Durable snapshot store.
///
/// rusqlite::Connection isn't Sync, so access goes through a Mutex. Every
/// write is a single upsert statement, which SQLite applies atomically.
pub struct SqliteSnapshotStore {
    path: PathBuf,
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteSnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSnapshotStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteSnapshotStore {
    /// Open or create the store at `path`, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path).map_err(storage_err)?;
        conn.busy_timeout(Duration::from_secs(5)).map_err(storage_err)?;
        conn.execute_batch(SCHEMA).map_err(storage_err)?;
        debug!("Opened snapshot store at {}", path.display());

        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Location of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| LedgerError::Storage(e.to_string()))
    }
}

fn storage_err(e: rusqlite::Error) -> LedgerError {
    LedgerError::Storage(e.to_string())
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| LedgerError::Storage(format!("Bad captured_at '{}': {}", raw, e)))
}

impl SnapshotStore for SqliteSnapshotStore {
    fn put_at(&self, key: &str, payload: &Value, captured_at: DateTime<Utc>) -> Result<Snapshot> {
        let body = serde_json::to_string(payload)?;
        let stamp = captured_at.to_rfc3339_opts(SecondsFormat::Micros, true);

        self.lock()?
            .execute(
                "INSERT INTO snapshots (key, payload, captured_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET payload = excluded.payload, captured_at = excluded.captured_at",
                params![key, body, stamp],
            )
            .map_err(storage_err)?;

        // Round-trip the timestamp so the returned value matches what get() yields
        Ok(Snapshot::new(key, payload.clone(), parse_timestamp(&stamp)?))
    }

    fn get(&self, key: &str) -> Result<Option<Snapshot>> {
        let row = self
            .lock()?
            .query_row(
                "SELECT payload, captured_at FROM snapshots WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(storage_err)?;

        match row {
            Some((body, stamp)) => {
                let payload: Value = serde_json::from_str(&body)?;
                Ok(Some(Snapshot::new(key, payload, parse_timestamp(&stamp)?)))
            }
            None => Ok(None),
        }
    }

    fn list(&self) -> Result<Vec<SnapshotInfo>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT key, captured_at FROM snapshots ORDER BY key")
            .map_err(storage_err)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(storage_err)?;

        let mut infos = Vec::new();
        for row in rows {
            let (key, stamp) = row.map_err(storage_err)?;
            infos.push(SnapshotInfo {
                key,
                captured_at: parse_timestamp(&stamp)?,
            });
        }
        Ok(infos)
    }
}
