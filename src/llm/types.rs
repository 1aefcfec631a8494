//! LLM types for chat-completion communication
//!
//! This module defines the message types for LLM requests and responses. The
//! same `Message` type is the turn type of a session's conversation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Tool invocations requested by an assistant turn
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// The call a tool turn answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool name, on tool turns
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Create an assistant message that requests tool calls
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::plain(Role::Assistant, content)
        }
    }

    /// Create a tool result message answering `call`
    pub fn tool(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call.id.clone()),
            name: Some(call.name.clone()),
            ..Self::plain(Role::Tool, content)
        }
    }
}

/// Tool definition for the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Convert to the chat-completions function schema format
    pub fn to_function_schema(&self) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.input_schema
            }
        })
    }
}

/// A tool call from the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

impl ToolCall {
    /// Create a new tool call
    pub fn new(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input,
        }
    }
}

/// Request to the LLM for completion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl CompletionRequest {
    /// Create a new completion request from a conversation
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    /// Add tools to the request
    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Response from the LLM
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub stop_reason: StopReason,
    pub usage: Usage,
}

impl CompletionResponse {
    /// A final answer with no tool calls
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// A response requesting tool calls
    pub fn tool_use(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            stop_reason: StopReason::ToolUse,
            ..Default::default()
        }
    }
}

/// Reason why the LLM stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    #[default]
    EndTurn,
    ToolUse,
    MaxTokens,
}

impl StopReason {
    /// Map a chat-completions `finish_reason`
    pub fn from_finish_reason(reason: &str) -> Self {
        match reason {
            "tool_calls" | "function_call" => StopReason::ToolUse,
            "length" => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        }
    }
}

/// Token usage statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    /// Create new usage stats
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Calculate total tokens
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Accumulate usage from another instance
    pub fn add(&mut self, other: &Usage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(serde_json::to_string(&Role::Tool).unwrap(), "\"tool\"");
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }

    #[test]
    fn test_message_tool_links_call() {
        let call = ToolCall::new("call_1", "get_sundry_debtors", serde_json::json!({}));
        let msg = Message::tool(&call, "payload");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(msg.name.as_deref(), Some("get_sundry_debtors"));
    }

    #[test]
    fn test_assistant_with_tools() {
        let call = ToolCall::new("call_1", "get_trial_balance", serde_json::json!({}));
        let msg = Message::assistant_with_tools("", vec![call.clone()]);
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.tool_calls, vec![call]);
    }

    #[test]
    fn test_plain_message_skips_empty_fields() {
        let json = serde_json::to_value(Message::user("Hello")).unwrap();
        assert!(json.get("tool_calls").is_none());
        assert!(json.get("tool_call_id").is_none());
    }

    #[test]
    fn test_tool_definition_to_function_schema() {
        let tool = ToolDefinition::new(
            "search_ledger",
            "Search ledgers",
            serde_json::json!({
                "type": "object",
                "properties": {"partial_name": {"type": "string"}},
                "required": ["partial_name"]
            }),
        );

        let schema = tool.to_function_schema();
        assert_eq!(schema["type"], "function");
        assert_eq!(schema["function"]["name"], "search_ledger");
        assert!(schema["function"]["parameters"].is_object());
    }

    #[test]
    fn test_stop_reason_from_finish_reason() {
        assert_eq!(StopReason::from_finish_reason("stop"), StopReason::EndTurn);
        assert_eq!(StopReason::from_finish_reason("tool_calls"), StopReason::ToolUse);
        assert_eq!(StopReason::from_finish_reason("length"), StopReason::MaxTokens);
        assert_eq!(StopReason::from_finish_reason("weird"), StopReason::EndTurn);
    }

    #[test]
    fn test_usage_add() {
        let mut usage1 = Usage::new(100, 50);
        usage1.add(&Usage::new(200, 100));
        assert_eq!(usage1.total(), 450);
    }

    #[test]
    fn test_completion_response_helpers() {
        let text = CompletionResponse::text("done");
        assert!(text.tool_calls.is_empty());
        assert_eq!(text.stop_reason, StopReason::EndTurn);

        let tools = CompletionResponse::tool_use(vec![ToolCall::new("a", "b", serde_json::json!({}))]);
        assert_eq!(tools.stop_reason, StopReason::ToolUse);
    }
}
