//! Tool parser for extracting tool calls from chat-completion responses
//!
//! Native `tool_calls` are preferred. Models without function calling are
//! instructed to answer with a `TOOL_CALL: name(arg="value")` line instead,
//! which is parsed here as a fallback.

use serde_json::{Map, Value};

use crate::id::text_call_id;
use crate::llm::client::LlmError;
use crate::llm::types::{CompletionResponse, StopReason, ToolCall, Usage};

const TEXT_MARKER: &str = "TOOL_CALL:";

/// Parse a raw chat-completions response body into a CompletionResponse
pub fn parse_chat_completion(body: &Value) -> Result<CompletionResponse, LlmError> {
    let choice = body
        .get("choices")
        .and_then(|c| c.get(0))
        .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))?;
    let message = choice
        .get("message")
        .ok_or_else(|| LlmError::InvalidResponse("choice has no message".to_string()))?;

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string();

    let mut tool_calls: Vec<ToolCall> = message
        .get("tool_calls")
        .and_then(|t| t.as_array())
        .map(|calls| {
            calls
                .iter()
                .enumerate()
                .filter_map(|(i, call)| parse_native_call(i, call))
                .collect()
        })
        .unwrap_or_default();

    let mut stop_reason = choice
        .get("finish_reason")
        .and_then(|r| r.as_str())
        .map(StopReason::from_finish_reason)
        .unwrap_or_default();

    if tool_calls.is_empty() {
        tool_calls = parse_text_tool_calls(&content);
        if !tool_calls.is_empty() {
            stop_reason = StopReason::ToolUse;
        }
    }

    let usage = body.get("usage").map(parse_usage).unwrap_or_default();

    Ok(CompletionResponse {
        content,
        tool_calls,
        stop_reason,
        usage,
    })
}

/// Parse one entry of a native `tool_calls` array
fn parse_native_call(index: usize, call: &Value) -> Option<ToolCall> {
    let function = call.get("function")?;
    let name = function.get("name")?.as_str()?.to_string();
    let id = call
        .get("id")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| format!("call_{}", index));

    // Arguments arrive as a JSON-encoded string. Undecodable text is kept as a
    // string so schema validation rejects it with a useful message.
    let input = match function.get("arguments") {
        Some(Value::String(raw)) if raw.trim().is_empty() => Value::Object(Map::new()),
        Some(Value::String(raw)) => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone())),
        Some(other) => other.clone(),
        None => Value::Object(Map::new()),
    };

    Some(ToolCall { id, name, input })
}

/// Parse usage object from response
fn parse_usage(usage: &Value) -> Usage {
    Usage {
        input_tokens: usage.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
        output_tokens: usage.get("completion_tokens").and_then(|v| v.as_u64()).unwrap_or(0),
    }
}

/// Extract every `TOOL_CALL: name(key="value", ...)` occurrence from text
pub fn parse_text_tool_calls(text: &str) -> Vec<ToolCall> {
    let mut calls = Vec::new();
    let mut rest = text;

    while let Some(pos) = rest.find(TEXT_MARKER) {
        rest = &rest[pos + TEXT_MARKER.len()..];

        let trimmed = rest.trim_start();
        let name_len = trimmed
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(trimmed.len());
        let name = &trimmed[..name_len];
        let after = trimmed[name_len..].trim_start();

        if name.is_empty() || !after.starts_with('(') {
            continue;
        }
        let Some(args_len) = closing_paren(&after[1..]) else {
            continue;
        };

        let args = parse_text_args(&after[1..1 + args_len]);
        calls.push(ToolCall::new(text_call_id(calls.len()), name, args));
        rest = &after[1 + args_len..];
    }

    calls
}

/// Byte offset of the first `)` outside double quotes
fn closing_paren(s: &str) -> Option<usize> {
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ')' if !in_quotes => return Some(i),
            _ => {}
        }
    }
    None
}

/// Parse `key="value"` pairs separated by commas
fn parse_text_args(src: &str) -> Value {
    let mut map = Map::new();
    let mut rest = src;

    loop {
        rest = rest.trim_start_matches(|c: char| c == ',' || c.is_whitespace());
        if rest.is_empty() {
            break;
        }
        let Some(eq) = rest.find('=') else {
            break;
        };
        let key = rest[..eq].trim();
        let Some(quoted) = rest[eq + 1..].trim_start().strip_prefix('"') else {
            break;
        };
        let Some(end) = quoted.find('"') else {
            break;
        };
        if !key.is_empty() {
            map.insert(key.to_string(), Value::String(quoted[..end].to_string()));
        }
        rest = &quoted[end + 1..];
    }

    Value::Object(map)
}
