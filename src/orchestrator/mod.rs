//! Tool-Orchestration Loop - sessions, conversation state, and the runner

mod conversation;
mod runner;
mod session;

pub use conversation::ConversationState;
pub use runner::{LLM_UNAVAILABLE_ANSWER, Orchestrator};
pub use session::{
    DEFAULT_MAX_ROUNDS, LoopState, OrchestratorConfig, SessionOutcome, SessionRequest, ToolProvenance,
};
