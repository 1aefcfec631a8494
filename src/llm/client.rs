//! Core LLM client trait, errors, and a scripted mock

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::types::{CompletionRequest, CompletionResponse};
use crate::error::LedgerError;

/// Stateless LLM client - the whole conversation travels with each request
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Single completion request (blocking until complete)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Model identifier used for requests
    fn model(&self) -> &str;
}

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Missing API key: environment variable {env_var} not set")]
    MissingApiKey { env_var: String },
}

impl LlmError {
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::RateLimited { .. } => true,
            LlmError::ApiError { status, .. } => *status >= 500,
            LlmError::Network(_) => true,
            LlmError::InvalidResponse(_) => false,
            LlmError::MissingApiKey { .. } => false,
        }
    }
}

impl From<LlmError> for LedgerError {
    fn from(e: LlmError) -> Self {
        LedgerError::Llm(e.to_string())
    }
}

/// Mock client that replays scripted responses in order and records requests
#[derive(Debug, Default)]
pub struct MockLlmClient {
    responses: Mutex<VecDeque<Result<CompletionResponse, String>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    pub fn new(responses: Vec<CompletionResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a failure; it surfaces as a non-retryable API error.
    pub fn push_error(&self, message: impl Into<String>) {
        if let Ok(mut queue) = self.responses.lock() {
            queue.push_back(Err(message.into()));
        }
    }

    /// Every request received so far
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }

        let next = self
            .responses
            .lock()
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?
            .pop_front();

        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(LlmError::ApiError { status: 400, message }),
            None => Err(LlmError::InvalidResponse("mock responses exhausted".to_string())),
        }
    }

    fn model(&self) -> &str {
        "mock-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::Message;

    #[test]
    fn test_llm_error_is_retryable() {
        assert!(
            LlmError::RateLimited {
                retry_after: Duration::from_secs(60)
            }
            .is_retryable()
        );
        assert!(
            LlmError::ApiError {
                status: 502,
                message: "Bad gateway".to_string()
            }
            .is_retryable()
        );
        assert!(
            !LlmError::ApiError {
                status: 400,
                message: "Bad request".to_string()
            }
            .is_retryable()
        );
        assert!(!LlmError::InvalidResponse("bad".to_string()).is_retryable());
        assert!(
            !LlmError::MissingApiKey {
                env_var: "OPENROUTER_KEY".to_string()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_llm_error_into_ledger_error() {
        let err: LedgerError = LlmError::InvalidResponse("no choices".to_string()).into();
        assert!(matches!(err, LedgerError::Llm(_)));
        assert!(err.to_string().contains("no choices"));
    }

    #[tokio::test]
    async fn test_mock_replays_in_order() {
        let mock = MockLlmClient::new(vec![
            CompletionResponse::text("first"),
            CompletionResponse::text("second"),
        ]);

        let req = CompletionRequest::new(vec![Message::user("hi")]);
        assert_eq!(mock.complete(req.clone()).await.unwrap().content, "first");
        assert_eq!(mock.complete(req.clone()).await.unwrap().content, "second");
        assert!(mock.complete(req).await.is_err());
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_scripted_error() {
        let mock = MockLlmClient::new(vec![]);
        mock.push_error("overloaded");

        let err = mock
            .complete(CompletionRequest::new(vec![Message::user("hi")]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("overloaded"));
    }

    #[test]
    fn test_mock_identity() {
        let mock = MockLlmClient::new(vec![]);
        assert_eq!(mock.model(), "mock-model");
    }
}
