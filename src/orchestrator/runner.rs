//! Orchestrator - the bounded tool-calling loop.
//!
//! One `run` drives one session. The model either answers or asks for tools;
//! requested tools run concurrently through the registry and their results go
//! back to the model as tool turns. The loop stops on an answer with no tool
//! request, on the round-trip bound, or when the model cannot be reached.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Local, Utc};
use futures::future::join_all;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::conversation::ConversationState;
use super::session::{LoopState, OrchestratorConfig, SessionOutcome, SessionRequest, ToolProvenance};
use crate::context::ContextAssembler;
use crate::error::{LedgerError, Result};
use crate::llm::{CompletionRequest, LlmClient, Message, ToolCall, Usage};
use crate::snapshot::describe_age;
use crate::tools::{Origin, ToolCatalog, ToolRegistry, ToolResult, format_timestamp};

/// Answer given when the model cannot be reached
pub const LLM_UNAVAILABLE_ANSWER: &str =
    "The assistant is temporarily unavailable. Please try again in a minute.";

const SUMMARY_CHARS: usize = 300;

/// A tool call after validation and dispatch
enum Dispatch {
    Rejected(LedgerError),
    Spawned {
        tool: String,
        handle: JoinHandle<Result<ToolResult>>,
    },
}

/// What came back for one call, in request order
enum CallOutcome {
    Completed(ToolResult),
    Rejected(LedgerError),
}

/// Runs sessions against a shared registry.
///
/// Holds no per-session state; one orchestrator serves any number of
/// concurrent sessions.
pub struct Orchestrator<L: LlmClient> {
    llm: Arc<L>,
    registry: Arc<ToolRegistry>,
    assembler: ContextAssembler,
    config: OrchestratorConfig,
}

impl<L: LlmClient> Orchestrator<L> {
    pub fn new(llm: Arc<L>, registry: Arc<ToolRegistry>, assembler: ContextAssembler) -> Self {
        Self {
            llm,
            registry,
            assembler,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ToolRegistry> {
        &self.registry
    }

    /// Run one session to completion. Always returns an answer.
    pub async fn run(&self, request: SessionRequest) -> SessionOutcome {
        let session_id = request.session_id.as_str();
        let catalog = self.registry.catalog();
        let context = self
            .assembler
            .assemble(&catalog, &request.query, Local::now().date_naive())
            .await;
        let definitions = catalog.definitions();

        info!(
            session_id,
            user_id = %request.user_id,
            tools = catalog.len(),
            retrieval_degraded = context.retrieval_degraded,
            "Session started"
        );

        let mut session = Session {
            id: request.session_id.clone(),
            state: LoopState::AwaitingModel,
            conversation: ConversationState::new(context.system_prompt, request.query.clone()),
            rounds: 0,
            gathered: Vec::new(),
            provenance: Vec::new(),
            usage: Usage::default(),
            retrieval_degraded: context.retrieval_degraded,
        };

        loop {
            let mut completion =
                CompletionRequest::new(session.conversation.to_messages()).with_tools(definitions.clone());
            if let Some(max_tokens) = self.config.max_tokens {
                completion = completion.with_max_tokens(max_tokens);
            }

            let response = match self.llm.complete(completion).await {
                Ok(response) => response,
                Err(e) => {
                    let e = LedgerError::from(e);
                    warn!(session_id, rounds = session.rounds, error = %e, "Model unreachable");
                    let answer = LLM_UNAVAILABLE_ANSWER.to_string();
                    session.conversation.push(Message::assistant(answer.clone()));
                    return session.finish(answer, false, Some(e.to_string()));
                }
            };
            session.usage.add(&response.usage);

            if response.tool_calls.is_empty() {
                let answer = self.with_notices(response.content, &session.gathered, Utc::now());
                session.conversation.push(Message::assistant(answer.clone()));
                info!(session_id, rounds = session.rounds, "Session answered");
                return session.finish(answer, true, None);
            }

            if session.rounds >= self.config.max_rounds {
                let e = LedgerError::LoopBudgetExceeded(self.config.max_rounds);
                warn!(
                    session_id,
                    rounds = session.rounds,
                    pending_calls = response.tool_calls.len(),
                    "{}", e
                );
                let now = Utc::now();
                let partial = best_effort_answer(&response.content, &session.gathered, now);
                let answer = self.with_notices(partial, &session.gathered, now);
                session.conversation.push(Message::assistant(answer.clone()));
                return session.finish(answer, false, Some(e.to_string()));
            }

            let calls = response.tool_calls;
            session
                .conversation
                .push(Message::assistant_with_tools(response.content, calls.clone()));
            session.transition(LoopState::ExecutingTools);
            session.rounds += 1;

            let outcomes = self.execute_batch(&catalog, &calls).await;
            let now = Utc::now();
            for (call, outcome) in calls.iter().zip(outcomes) {
                match outcome {
                    CallOutcome::Completed(result) => {
                        debug!(session_id, tool = %result.tool, origin = %result.origin, "Tool result");
                        session.conversation.push(Message::tool(call, result.render_for_model(now)));
                        session.provenance.push(ToolProvenance::from_result(&result));
                        session.gathered.push(result);
                    }
                    CallOutcome::Rejected(e) => {
                        debug!(session_id, tool = %call.name, error = %e, "Tool call rejected");
                        session.conversation.push(Message::tool(call, correction_text(&e)));
                    }
                }
            }
            session.transition(LoopState::AwaitingModel);
        }
    }

    /// Validate each call against the session catalog, dispatch the valid
    /// ones concurrently, and collect outcomes in request order.
    ///
    /// Dispatched calls run as their own tasks; they finish and persist
    /// snapshots even if the session is dropped.
    async fn execute_batch(&self, catalog: &ToolCatalog, calls: &[ToolCall]) -> Vec<CallOutcome> {
        let dispatched: Vec<Dispatch> = calls
            .iter()
            .map(|call| match catalog.validate_call(call) {
                Err(e) => Dispatch::Rejected(e),
                Ok(_) => {
                    let registry = Arc::clone(&self.registry);
                    let tool = call.name.clone();
                    let args = normalize_args(&call.input);
                    let name = tool.clone();
                    let handle = tokio::spawn(async move { registry.invoke(&name, &args).await });
                    Dispatch::Spawned { tool, handle }
                }
            })
            .collect();

        join_all(dispatched.into_iter().map(|d| async move {
            match d {
                Dispatch::Rejected(e) => CallOutcome::Rejected(e),
                Dispatch::Spawned { tool, handle } => match handle.await {
                    Ok(Ok(result)) => CallOutcome::Completed(result),
                    Ok(Err(e)) if e.is_validation() => CallOutcome::Rejected(e),
                    Ok(Err(e)) => CallOutcome::Completed(ToolResult::unavailable(tool, e.to_string())),
                    Err(e) => CallOutcome::Completed(ToolResult::unavailable(tool, e.to_string())),
                },
            }
        }))
        .await
    }

    /// Append notices about cached or missing data the answer does not already mention
    fn with_notices(&self, answer: String, gathered: &[ToolResult], now: DateTime<Utc>) -> String {
        if !self.config.staleness_notice {
            return answer;
        }

        let lower = answer.to_lowercase();
        let mut notes = Vec::new();

        // A later call to the same tool supersedes its earlier results
        let mut latest: HashMap<&str, &ToolResult> = HashMap::new();
        for result in gathered {
            latest.insert(result.tool.as_str(), result);
        }

        let oldest = latest
            .values()
            .filter(|r| r.origin == Origin::Cached)
            .filter_map(|r| r.captured_at)
            .min();
        if let Some(at) = oldest
            && !lower.contains("cached")
        {
            notes.push(format!(
                "Note: the accounting system was offline; figures are cached data as of {} ({}).",
                format_timestamp(at),
                describe_age(at, now)
            ));
        }

        let missing = latest.values().any(|r| r.origin == Origin::Unavailable);
        if missing && !lower.contains("could not be retrieved") {
            notes.push(
                "Note: some data could not be retrieved; the accounting system is offline and nothing was cached."
                    .to_string(),
            );
        }

        if notes.is_empty() {
            answer
        } else if answer.trim().is_empty() {
            notes.join("\n")
        } else {
            format!("{}\n\n{}", answer.trim_end(), notes.join("\n"))
        }
    }
}

/// Per-session mutable state
struct Session {
    id: String,
    state: LoopState,
    conversation: ConversationState,
    rounds: u32,
    gathered: Vec<ToolResult>,
    provenance: Vec<ToolProvenance>,
    usage: Usage,
    retrieval_degraded: bool,
}

impl Session {
    fn transition(&mut self, next: LoopState) {
        debug!(session_id = %self.id, from = %self.state, to = %next, "Loop transition");
        self.state = next;
    }

    fn finish(mut self, answer: String, complete: bool, incomplete_reason: Option<String>) -> SessionOutcome {
        self.transition(LoopState::Terminated);
        info!(
            session_id = %self.id,
            complete,
            rounds = self.rounds,
            tokens = self.usage.total(),
            "Session terminated"
        );
        SessionOutcome {
            session_id: self.id,
            answer,
            complete,
            state: self.state,
            rounds: self.rounds,
            provenance: self.provenance,
            incomplete_reason,
            retrieval_degraded: self.retrieval_degraded,
            conversation: self.conversation,
            usage: self.usage,
        }
    }
}

/// Models sometimes send `null` for a call with no arguments
fn normalize_args(input: &Value) -> Value {
    if input.is_null() {
        Value::Object(Default::default())
    } else {
        input.clone()
    }
}

fn correction_text(e: &LedgerError) -> String {
    format!("Error: {}. Correct the tool name or arguments and try again.", e)
}

/// Answer assembled from whatever was gathered when the round bound hit
fn best_effort_answer(partial: &str, gathered: &[ToolResult], now: DateTime<Utc>) -> String {
    let mut answer = String::from("I could not finish this analysis within the allowed number of steps.");

    let partial: Vec<&str> = partial
        .lines()
        .filter(|l| !l.trim_start().starts_with("TOOL_CALL:"))
        .collect();
    let partial = partial.join("\n");
    if !partial.trim().is_empty() {
        answer.push_str("\n\n");
        answer.push_str(partial.trim());
    }

    if gathered.is_empty() {
        answer.push_str("\n\nNo data was gathered.");
        return answer;
    }

    answer.push_str("\n\nData gathered so far:");
    for result in gathered {
        let summary = match (&result.payload, result.captured_at) {
            (None, _) => "not available".to_string(),
            (Some(payload), Some(at)) => format!("{} (cached, {})", summarize(payload), describe_age(at, now)),
            (Some(payload), None) => summarize(payload),
        };
        answer.push_str(&format!("\n- {}: {}", result.tool, summary));
    }
    answer
}

fn summarize(payload: &Value) -> String {
    let text = payload.to_string();
    if text.chars().count() <= SUMMARY_CHARS {
        return text;
    }
    let cut: String = text.chars().take(SUMMARY_CHARS).collect();
    format!("{}...", cut)
}
