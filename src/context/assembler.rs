//! Context assembler
//!
//! Builds the system turn for a session once, from the catalog snapshot and
//! business context retrieved for the query. The result never changes during
//! the session.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use log::{debug, warn};

use super::retriever::{Retriever, Snippet};
use crate::error::LedgerError;
use crate::tools::ToolCatalog;

/// Default number of business snippets included
pub const DEFAULT_MAX_SNIPPETS: usize = 2;

const RETRIEVAL_TIMEOUT: Duration = Duration::from_secs(5);

/// The immutable prefix of a session's conversation
#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub system_prompt: String,
    pub snippets: Vec<Snippet>,
    /// Retrieval failed and the prompt was built without business context
    pub retrieval_degraded: bool,
}

pub struct ContextAssembler {
    retriever: Arc<dyn Retriever>,
    max_snippets: usize,
}

impl ContextAssembler {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self {
            retriever,
            max_snippets: DEFAULT_MAX_SNIPPETS,
        }
    }

    pub fn with_max_snippets(mut self, max_snippets: usize) -> Self {
        self.max_snippets = max_snippets;
        self
    }

    /// Build the system context. Retrieval failures are logged and skipped.
    pub async fn assemble(&self, catalog: &ToolCatalog, query: &str, today: NaiveDate) -> SessionContext {
        let lookup = self.retriever.retrieve(query, self.max_snippets);
        let retrieved = match tokio::time::timeout(RETRIEVAL_TIMEOUT, lookup).await {
            Ok(Ok(snippets)) => Ok(snippets),
            Ok(Err(e)) => Err(LedgerError::RetrievalUnavailable(e.to_string())),
            Err(_) => Err(LedgerError::RetrievalUnavailable(format!(
                "no answer within {}ms",
                RETRIEVAL_TIMEOUT.as_millis()
            ))),
        };

        let (snippets, retrieval_degraded) = match retrieved {
            Ok(mut snippets) => {
                snippets.truncate(self.max_snippets);
                (snippets, false)
            }
            Err(e) => {
                warn!("{}", e);
                (Vec::new(), true)
            }
        };
        debug!("Assembled context with {} snippet(s)", snippets.len());

        SessionContext {
            system_prompt: render_system_prompt(catalog, &snippets, today),
            snippets,
            retrieval_degraded,
        }
    }
}

/// Render the system turn
pub fn render_system_prompt(catalog: &ToolCatalog, snippets: &[Snippet], today: NaiveDate) -> String {
    let mut prompt = format!(
        "You are an accounting BI assistant. You answer business questions using data from the company's accounting system.

You have these tools available:
{tools}

RULES:
1. Request data with a tool call. If function calling is unavailable, respond EXACTLY: TOOL_CALL: tool_name(arg1=\"value1\", arg2=\"value2\")
2. When you have enough data, give a clear answer with NO tool call.
3. NEVER invent data. If a tool reports an error or that no data is available, say so.
4. If a tool result is cached data, tell the user the figures may be out of date and how old they are.
5. Format currency as ₹X,XX,XXX.
6. Keep answers concise; this is a chat interface.

Today's date: {today}",
        tools = catalog.render(),
        today = today.format("%Y-%m-%d (YYYYMMDD: %Y%m%d)"),
    );

    if !snippets.is_empty() {
        let context: Vec<&str> = snippets.iter().map(|s| s.text.as_str()).collect();
        prompt.push_str(&format!(
            "\n\nBUSINESS CONTEXT (from company knowledge base):\n{}\n\n\
             Use this context to provide better analysis (e.g., flag overdue payments, check margins against targets).",
            context.join("\n\n")
        ));
    }

    prompt
}
