//! Context Assembler - system instructions plus retrieved business context

mod assembler;
mod retriever;

pub use assembler::{ContextAssembler, DEFAULT_MAX_SNIPPETS, SessionContext, render_system_prompt};
pub use retriever::{BusinessRule, KeywordRetriever, NoopRetriever, Retriever, Snippet, default_rules};
