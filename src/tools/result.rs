//! Tool results and their provenance

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::snapshot::{Snapshot, describe_age};

/// Where a tool result's payload came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Fresh from the data source within its time budget
    Live,
    /// Last known good snapshot, served because the live fetch failed
    Cached,
    /// Live fetch failed and no snapshot existed
    Unavailable,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::Cached => "cached",
            Self::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one dispatched tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub tool: String,
    /// None when the origin is unavailable
    pub payload: Option<Value>,
    pub origin: Origin,
    /// Snapshot capture time, set when the origin is cached
    pub captured_at: Option<DateTime<Utc>>,
    /// Why the live fetch failed, when it did
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ToolResult {
    pub fn live(tool: impl Into<String>, payload: Value) -> Self {
        Self {
            tool: tool.into(),
            payload: Some(payload),
            origin: Origin::Live,
            captured_at: None,
            detail: None,
        }
    }

    pub fn cached(tool: impl Into<String>, snapshot: Snapshot, detail: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            payload: Some(snapshot.payload),
            origin: Origin::Cached,
            captured_at: Some(snapshot.captured_at),
            detail: Some(detail.into()),
        }
    }

    pub fn unavailable(tool: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            payload: None,
            origin: Origin::Unavailable,
            captured_at: None,
            detail: Some(detail.into()),
        }
    }

    /// Text of the tool turn handed back to the model
    pub fn render_for_model(&self, now: DateTime<Utc>) -> String {
        let payload = self
            .payload
            .as_ref()
            .map(|p| serde_json::to_string_pretty(p).unwrap_or_else(|_| p.to_string()))
            .unwrap_or_default();

        match (self.origin, self.captured_at) {
            (Origin::Live, _) => payload,
            (Origin::Cached, Some(at)) => format!(
                "Data source offline. Showing cached data from {} (captured {}):\n{}",
                describe_age(at, now),
                format_timestamp(at),
                payload
            ),
            (Origin::Cached, None) => format!("Data source offline. Showing cached data:\n{}", payload),
            (Origin::Unavailable, _) => {
                "Data source offline and no cached data available for this query.".to_string()
            }
        }
    }
}

/// Timestamp format shown to the model and the user
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M UTC").to_string()
}
