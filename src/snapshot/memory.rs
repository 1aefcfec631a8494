//! In-process snapshot store, used by tests and ephemeral runs.

use std::collections::BTreeMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::{Snapshot, SnapshotInfo, SnapshotStore};
use crate::error::{LedgerError, Result};

/// Snapshot store backed by a map. Not durable.
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    entries: RwLock<BTreeMap<String, Snapshot>>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn put_at(&self, key: &str, payload: &Value, captured_at: DateTime<Utc>) -> Result<Snapshot> {
        let snapshot = Snapshot::new(key, payload.clone(), captured_at);
        self.entries
            .write()
            .map_err(|e| LedgerError::Storage(e.to_string()))?
            .insert(key.to_string(), snapshot.clone());
        Ok(snapshot)
    }

    fn get(&self, key: &str) -> Result<Option<Snapshot>> {
        Ok(self
            .entries
            .read()
            .map_err(|e| LedgerError::Storage(e.to_string()))?
            .get(key)
            .cloned())
    }

    fn list(&self) -> Result<Vec<SnapshotInfo>> {
        Ok(self
            .entries
            .read()
            .map_err(|e| LedgerError::Storage(e.to_string()))?
            .values()
            .map(|s| SnapshotInfo {
                key: s.key.clone(),
                captured_at: s.captured_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_put_then_get() {
        let store = MemorySnapshotStore::new();
        store.put("get_all_ledgers", &json!([{"name": "Cash"}])).unwrap();

        let snap = store.get("get_all_ledgers").unwrap().unwrap();
        assert_eq!(snap.payload, json!([{"name": "Cash"}]));
    }

    #[test]
    fn test_get_missing() {
        let store = MemorySnapshotStore::new();
        assert!(store.get("nothing").unwrap().is_none());
    }

    #[test]
    fn test_last_write_wins() {
        let store = MemorySnapshotStore::new();
        store.put("k", &json!(1)).unwrap();
        store.put("k", &json!(2)).unwrap();

        assert_eq!(store.get("k").unwrap().unwrap().payload, json!(2));
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_ordered_by_key() {
        let store = MemorySnapshotStore::new();
        store.put("b", &json!(null)).unwrap();
        store.put("a", &json!(null)).unwrap();

        let keys: Vec<String> = store.list().unwrap().into_iter().map(|i| i.key).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
