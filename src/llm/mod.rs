//! LLM Client Layer - chat-completions integration and tool parsing
//!
//! This module provides:
//! - Message types for LLM communication
//! - LlmClient trait for API abstraction
//! - OpenAiClient implementation for OpenAI-compatible endpoints
//! - Tool call parsing, native and text protocol

pub mod client;
pub mod openai;
pub mod tool_parser;
pub mod types;

pub use client::{LlmClient, LlmError, MockLlmClient};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use tool_parser::{parse_chat_completion, parse_text_tool_calls};
pub use types::{
    CompletionRequest, CompletionResponse, Message, Role, StopReason, ToolCall, ToolDefinition, Usage,
};
