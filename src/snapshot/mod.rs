//! Snapshot store - last known good tool results.
//!
//! Every successful live fetch is written here, keyed by cache key (the tool
//! name, plus canonical arguments for tools that take them). When the data
//! source is down, the registry reads the snapshot back instead. One snapshot
//! per key; writes replace the previous entry atomically.

mod memory;
mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

pub use memory::MemorySnapshotStore;
pub use sqlite::SqliteSnapshotStore;

/// A persisted tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub key: String,
    pub payload: Value,
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(key: impl Into<String>, payload: Value, captured_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            payload,
            captured_at,
        }
    }

    /// Human-readable age relative to now.
    pub fn age_str(&self) -> String {
        describe_age(self.captured_at, Utc::now())
    }
}

/// Key and capture time of a stored snapshot, without the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub key: String,
    pub captured_at: DateTime<Utc>,
}

/// Durable last-write-wins snapshot persistence.
///
/// Implementations must be safe to share across sessions: concurrent `put`
/// and `get` on the same key never observe a partially written payload.
pub trait SnapshotStore: Send + Sync {
    /// Record `payload` for `key` with an explicit capture time.
    fn put_at(&self, key: &str, payload: &Value, captured_at: DateTime<Utc>) -> Result<Snapshot>;

    /// Record `payload` for `key`, captured now.
    fn put(&self, key: &str, payload: &Value) -> Result<Snapshot> {
        self.put_at(key, payload, Utc::now())
    }

    /// Fetch the snapshot for `key`, if any.
    fn get(&self, key: &str) -> Result<Option<Snapshot>>;

    /// All stored keys with their capture times, ordered by key.
    fn list(&self) -> Result<Vec<SnapshotInfo>>;
}

/// Describe how long ago `captured_at` was.
///
/// "just now" under a minute, then minutes, hours, and days.
pub fn describe_age(captured_at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let minutes = (now - captured_at).num_minutes();
    if minutes < 1 {
        return "just now".to_string();
    }
    if minutes < 60 {
        return format!("{} min ago", minutes);
    }
    let hours = minutes / 60;
    if hours < 24 {
        return format!("{}h ago", hours);
    }
    format!("{} days ago", hours / 24)
}
