//! `get_source_status`: reachability probe plus snapshot ages

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};

use crate::error::{LedgerError, Result};
use crate::snapshot::{SnapshotStore, describe_age};
use crate::source::{DataQuery, DataSource};
use crate::tools::{DataTool, ToolDescriptor, format_timestamp};

const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Reports whether the source answers and how old each snapshot is. Never cached.
pub struct SourceStatusTool {
    descriptor: ToolDescriptor,
    source: Arc<dyn DataSource>,
    store: Arc<dyn SnapshotStore>,
}

impl SourceStatusTool {
    pub fn new(source: Arc<dyn DataSource>, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            descriptor: ToolDescriptor::new(
                "get_source_status",
                "Check if the accounting system is online. Also shows the age of cached data for each report.",
            )
            .uncached(),
            source,
            store,
        }
    }
}

#[async_trait]
impl DataTool for SourceStatusTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn fetch(&self, _args: &Value) -> Result<Value> {
        let ping = match tokio::time::timeout(PING_TIMEOUT, self.source.query(&DataQuery::Ping)).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::UpstreamTimeout {
                timeout_ms: PING_TIMEOUT.as_millis() as u64,
            }),
        };
        let (online, detail) = match ping {
            Ok(_) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        };

        let store = Arc::clone(&self.store);
        let infos = tokio::task::spawn_blocking(move || store.list())
            .await
            .map_err(|e| LedgerError::Storage(e.to_string()))??;

        let now = Utc::now();
        let snapshots: Vec<Value> = infos
            .iter()
            .map(|info| {
                json!({
                    "key": info.key,
                    "captured_at": format_timestamp(info.captured_at),
                    "age": describe_age(info.captured_at, now)
                })
            })
            .collect();

        let mut payload = json!({"online": online, "snapshots": snapshots});
        if let Some(detail) = detail {
            payload["detail"] = json!(detail);
        }
        Ok(payload)
    }
}
