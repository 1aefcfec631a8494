//! Session types: loop states, configuration, requests, and outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::conversation::ConversationState;
use crate::id::generate_session_id;
use crate::llm::Usage;
use crate::snapshot::describe_age;
use crate::tools::{Origin, ToolResult, format_timestamp};

/// Default bound on tool round-trips per session
pub const DEFAULT_MAX_ROUNDS: u32 = 5;

/// States of the orchestration loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    AwaitingModel,
    ExecutingTools,
    Terminated,
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::AwaitingModel => "awaiting_model",
            Self::ExecutingTools => "executing_tools",
            Self::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Configuration for the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Tool round-trips allowed before forcing a best-effort answer
    pub max_rounds: u32,
    /// Append "data as of" and unavailable-data notices to answers
    pub staleness_notice: bool,
    /// Max tokens per completion; client default when None
    pub max_tokens: Option<u32>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            staleness_notice: true,
            max_tokens: None,
        }
    }
}

/// What the front-end hands in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub session_id: String,
    pub user_id: String,
    pub query: String,
}

impl SessionRequest {
    /// A request with a freshly generated session id
    pub fn new(user_id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            session_id: generate_session_id(),
            user_id: user_id.into(),
            query: query.into(),
        }
    }
}

/// Origin metadata for one dispatched tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolProvenance {
    pub tool: String,
    pub origin: Origin,
    pub captured_at: Option<DateTime<Utc>>,
}

impl ToolProvenance {
    pub fn from_result(result: &ToolResult) -> Self {
        Self {
            tool: result.tool.clone(),
            origin: result.origin,
            captured_at: result.captured_at,
        }
    }

    /// "data as of ..." for cached results
    pub fn staleness(&self, now: DateTime<Utc>) -> Option<String> {
        self.captured_at
            .map(|at| format!("data as of {} ({})", format_timestamp(at), describe_age(at, now)))
    }
}

/// What the front-end gets back
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionOutcome {
    pub session_id: String,
    /// Always natural language, even on failure
    pub answer: String,
    /// False when the round bound or an LLM failure cut the session short
    pub complete: bool,
    pub state: LoopState,
    /// Tool round-trips executed
    pub rounds: u32,
    pub provenance: Vec<ToolProvenance>,
    pub incomplete_reason: Option<String>,
    pub retrieval_degraded: bool,
    pub conversation: ConversationState,
    pub usage: Usage,
}

impl SessionOutcome {
    /// True if any tool result came from a snapshot
    pub fn used_cache(&self) -> bool {
        self.provenance.iter().any(|p| p.origin == Origin::Cached)
    }

    /// True if any tool had neither live nor cached data
    pub fn had_unavailable(&self) -> bool {
        self.provenance.iter().any(|p| p.origin == Origin::Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_config_default() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.max_rounds, 5);
        assert!(config.staleness_notice);
        assert!(config.max_tokens.is_none());
    }

    #[test]
    fn test_request_new_generates_id() {
        let a = SessionRequest::new("u1", "q");
        let b = SessionRequest::new("u1", "q");
        assert_ne!(a.session_id, b.session_id);
        assert_eq!(a.user_id, "u1");
    }

    #[test]
    fn test_loop_state_display() {
        assert_eq!(LoopState::AwaitingModel.to_string(), "awaiting_model");
        assert_eq!(serde_json::to_string(&LoopState::Terminated).unwrap(), "\"terminated\"");
    }

    #[test]
    fn test_provenance_staleness() {
        let now = Utc::now();
        let live = ToolProvenance::from_result(&ToolResult::live("t", json!(1)));
        assert!(live.staleness(now).is_none());

        let snap = Snapshot::new("t", json!(1), now - Duration::hours(2));
        let cached = ToolProvenance::from_result(&ToolResult::cached("t", snap, "down"));
        let text = cached.staleness(now).unwrap();
        assert!(text.starts_with("data as of "));
        assert!(text.ends_with("(2h ago)"));
    }
}
