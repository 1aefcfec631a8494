//! Error types for ledgerbot
//!
//! Centralized error handling using thiserror. The first group of variants
//! mirrors the recoverable failure kinds of the orchestration core; the second
//! group covers infrastructure.

use thiserror::Error;

/// All error types that can occur in ledgerbot
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed or unknown tool call
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Live fetch exceeded its time budget
    #[error("Upstream timed out after {timeout_ms}ms")]
    UpstreamTimeout { timeout_ms: u64 },

    /// Live fetch failed (connection refused, bad status, malformed payload)
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// No live data and no snapshot for this key
    #[error("No cached data for {0}")]
    CacheMiss(String),

    /// Round-trip bound reached before the model produced a final answer
    #[error("Round-trip budget of {0} exhausted")]
    LoopBudgetExceeded(u32),

    /// Retrieval collaborator failed
    #[error("Retrieval unavailable: {0}")]
    RetrievalUnavailable(String),

    /// Snapshot persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// LLM API error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LedgerError {
    /// Errors raised by the data source; these trigger snapshot fallback.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            LedgerError::UpstreamTimeout { .. } | LedgerError::UpstreamUnavailable(_)
        )
    }

    /// Errors the reasoning collaborator can fix by correcting its request.
    pub fn is_validation(&self) -> bool {
        matches!(self, LedgerError::Validation(_))
    }
}

/// Result type alias for ledgerbot operations
pub type Result<T> = std::result::Result<T, LedgerError>;
