//! Data tool registry with live-or-cache fallback
//!
//! `invoke` validates the call, runs the live fetch under a time budget, and
//! on success records the payload in the snapshot store before returning. On
//! any fetch failure the last snapshot for the same key is served instead.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use log::{debug, info, warn};
use serde_json::Value;

use crate::error::{LedgerError, Result};
use crate::snapshot::{Snapshot, SnapshotStore};

use super::DataTool;
use super::catalog::{ToolCatalog, unknown_tool_message};
use super::definition::ToolDescriptor;
use super::result::ToolResult;

/// Live fetch budget when neither the tool nor the caller sets one
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Named set of data tools sharing one snapshot store
pub struct ToolRegistry {
    tools: RwLock<BTreeMap<String, Arc<dyn DataTool>>>,
    store: Arc<dyn SnapshotStore>,
    fetch_timeout: Duration,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}

impl ToolRegistry {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            tools: RwLock::new(BTreeMap::new()),
            store,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Set the default live fetch budget
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    /// Publish a tool. Names are unique.
    pub fn register(&self, tool: Arc<dyn DataTool>) -> Result<()> {
        let name = tool.descriptor().name.clone();
        let mut tools = self.write_tools()?;
        if tools.contains_key(&name) {
            return Err(LedgerError::Validation(format!("Tool already registered: {}", name)));
        }
        debug!("Registered tool {}", name);
        tools.insert(name, tool);
        Ok(())
    }

    /// Withdraw a tool; running sessions keep their catalog copy
    pub fn unregister(&self, name: &str) -> Result<bool> {
        Ok(self.write_tools()?.remove(name).is_some())
    }

    /// Full current catalog, ordered by name
    pub fn list_tools(&self) -> Vec<ToolDescriptor> {
        self.tools
            .read()
            .map(|tools| tools.values().map(|t| t.descriptor().clone()).collect())
            .unwrap_or_default()
    }

    /// Snapshot the current catalog for a session
    pub fn catalog(&self) -> ToolCatalog {
        ToolCatalog::from_descriptors(self.list_tools())
    }

    pub fn names(&self) -> Vec<String> {
        self.tools
            .read()
            .map(|tools| tools.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DataTool>> {
        self.tools.read().ok().and_then(|tools| tools.get(name).cloned())
    }

    /// The shared snapshot store
    pub fn store(&self) -> Arc<dyn SnapshotStore> {
        Arc::clone(&self.store)
    }

    fn write_tools(&self) -> Result<std::sync::RwLockWriteGuard<'_, BTreeMap<String, Arc<dyn DataTool>>>> {
        self.tools.write().map_err(|e| LedgerError::Storage(e.to_string()))
    }

    /// Run one tool call.
    ///
    /// Returns `Err` only for validation failures. Data source failures come
    /// back as a cached or unavailable result.
    pub async fn invoke(&self, name: &str, args: &Value) -> Result<ToolResult> {
        let tool = self.get(name).ok_or_else(|| {
            let names = self.names();
            let available: Vec<&str> = names.iter().map(String::as_str).collect();
            LedgerError::Validation(unknown_tool_message(name, &available))
        })?;

        let descriptor = tool.descriptor();
        descriptor.validate(args)?;
        tool.check_args(args)?;

        let key = tool.cache_key(args);
        let budget = descriptor.timeout.unwrap_or(self.fetch_timeout);

        let live = match tokio::time::timeout(budget, tool.fetch(args)).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::UpstreamTimeout {
                timeout_ms: budget.as_millis() as u64,
            }),
        };

        match live {
            Ok(payload) => {
                if descriptor.cacheable {
                    self.persist(&key, &payload).await;
                }
                debug!("Live result for {}", key);
                Ok(ToolResult::live(name, payload))
            }
            Err(e) if e.is_validation() => Err(e),
            Err(e) => {
                warn!("Live fetch for {} failed: {}", key, e);
                if !descriptor.cacheable {
                    return Ok(ToolResult::unavailable(name, e.to_string()));
                }
                Ok(self.fallback(name, &key, e).await)
            }
        }
    }

    /// Write a snapshot, waiting for the write to land
    async fn persist(&self, key: &str, payload: &Value) {
        let store = Arc::clone(&self.store);
        let key = key.to_string();
        let payload = payload.clone();

        let written = tokio::task::spawn_blocking(move || store.put(&key, &payload))
            .await
            .map_err(|e| LedgerError::Storage(e.to_string()))
            .and_then(|r| r);

        if let Err(e) = written {
            warn!("Failed to persist snapshot: {}", e);
        }
    }

    async fn load(&self, key: &str) -> Result<Option<Snapshot>> {
        let store = Arc::clone(&self.store);
        let key = key.to_string();
        tokio::task::spawn_blocking(move || store.get(&key))
            .await
            .map_err(|e| LedgerError::Storage(e.to_string()))?
    }

    async fn fallback(&self, name: &str, key: &str, cause: LedgerError) -> ToolResult {
        match self.load(key).await {
            Ok(Some(snapshot)) => {
                info!("Serving cached {} from {}", key, snapshot.age_str());
                ToolResult::cached(name, snapshot, cause.to_string())
            }
            Ok(None) => ToolResult::unavailable(name, LedgerError::CacheMiss(key.to_string()).to_string()),
            Err(e) => {
                warn!("Snapshot lookup for {} failed: {}", key, e);
                ToolResult::unavailable(name, e.to_string())
            }
        }
    }
}
