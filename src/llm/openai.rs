//! OpenAI-compatible chat-completions client
//!
//! Works against any `/chat/completions` endpoint (OpenRouter by default).
//! Transient failures are retried a fixed number of times with a fixed wait.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde_json::{Value, json};

use crate::error::{LedgerError, Result};
use crate::llm::client::{LlmClient, LlmError};
use crate::llm::tool_parser::parse_chat_completion;
use crate::llm::types::{CompletionRequest, CompletionResponse, Message, Role};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

/// Default model to use
pub const DEFAULT_MODEL: &str = "arcee-ai/trinity-large-preview:free";

/// Environment variable holding the API key
pub const DEFAULT_API_KEY_ENV: &str = "OPENROUTER_KEY";

const DEFAULT_MAX_TOKENS: u32 = 2000;
const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Configuration for the OpenAI-compatible client
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub base_url: String,
    pub model: String,
    pub api_key_env: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout: Duration,
    /// Total attempts per completion, including the first
    pub max_attempts: u32,
    pub retry_wait: Duration,
    /// Send tool schemas natively; when false the model uses the TOOL_CALL text protocol
    pub native_tools: bool,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(60),
            max_attempts: 3,
            retry_wait: Duration::from_secs(2),
            native_tools: true,
        }
    }
}

/// Chat-completions API client
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a new client, reading the key from `config.api_key_env`
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            LedgerError::from(LlmError::MissingApiKey {
                env_var: config.api_key_env.clone(),
            })
        })?;

        Self::with_api_key(api_key, config)
    }

    /// Create a client with an explicit API key
    pub fn with_api_key(api_key: String, config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LedgerError::Llm(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Build the request body for the chat-completions API
    fn build_request(&self, request: &CompletionRequest) -> Value {
        let model = request.model.as_ref().unwrap_or(&self.config.model).clone();
        let max_tokens = request.max_tokens.unwrap_or(self.config.max_tokens);
        let native = self.config.native_tools;

        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| message_to_json(m, native))
            .collect();

        let mut body = json!({
            "model": model,
            "max_tokens": max_tokens,
            "temperature": self.config.temperature,
            "messages": messages
        });

        if native && !request.tools.is_empty() {
            let tools: Vec<Value> = request.tools.iter().map(|t| t.to_function_schema()).collect();
            body["tools"] = json!(tools);
        }

        body
    }

    /// Send one request and return the decoded body
    async fn send_request(&self, body: &Value) -> std::result::Result<Value, LlmError> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(LlmError::RateLimited {
                retry_after: Duration::from_secs(retry_after),
            });
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LlmError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let value: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        // Some gateways report upstream failures with a 200 and an error object
        if let Some(err) = value.get("error") {
            let message = err
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| err.to_string());
            let status = err.get("code").and_then(|c| c.as_u64()).unwrap_or(502) as u16;
            return Err(LlmError::ApiError { status, message });
        }

        Ok(value)
    }
}

/// Map a conversation turn to the wire format
fn message_to_json(message: &Message, native_tools: bool) -> Value {
    match message.role {
        Role::Assistant if !message.tool_calls.is_empty() => {
            if native_tools {
                let calls: Vec<Value> = message
                    .tool_calls
                    .iter()
                    .map(|c| {
                        json!({
                            "id": c.id,
                            "type": "function",
                            "function": {"name": c.name, "arguments": c.input.to_string()}
                        })
                    })
                    .collect();
                let content = if message.content.is_empty() {
                    Value::Null
                } else {
                    json!(message.content)
                };
                json!({"role": "assistant", "content": content, "tool_calls": calls})
            } else if message.content.is_empty() {
                let lines: Vec<String> = message
                    .tool_calls
                    .iter()
                    .map(|c| format!("TOOL_CALL: {}({})", c.name, render_text_args(&c.input)))
                    .collect();
                json!({"role": "assistant", "content": lines.join("\n")})
            } else {
                json!({"role": "assistant", "content": message.content})
            }
        }
        Role::Tool if native_tools => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id,
            "content": message.content
        }),
        Role::Tool => json!({
            "role": "user",
            "content": format!(
                "TOOL_RESULT for {}:\n{}",
                message.name.as_deref().unwrap_or("tool"),
                message.content
            )
        }),
        role => json!({"role": role.as_str(), "content": message.content}),
    }
}

fn render_text_args(input: &Value) -> String {
    match input.as_object() {
        Some(map) => map
            .iter()
            .map(|(k, v)| match v.as_str() {
                Some(s) => format!("{}=\"{}\"", k, s),
                None => format!("{}=\"{}\"", k, v),
            })
            .collect::<Vec<_>>()
            .join(", "),
        None => String::new(),
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> std::result::Result<CompletionResponse, LlmError> {
        let body = self.build_request(&request);
        let attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            debug!("LLM request attempt {}/{} to {}", attempt, attempts, self.config.model);
            let outcome = match self.send_request(&body).await {
                Ok(value) => parse_chat_completion(&value),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < attempts => {
                    warn!("LLM attempt {} failed, retrying: {}", attempt, e);
                    tokio::time::sleep(self.config.retry_wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .field("max_tokens", &self.config.max_tokens)
            .finish()
    }
}
