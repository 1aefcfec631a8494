//! Ledgerbot - a tool-calling assistant for accounting questions
//!
//! A language model answers business questions by calling data tools. Every
//! live tool result is snapshotted so answers degrade to clearly labelled
//! cached data when the accounting system is offline.

pub mod accounting;
pub mod context;
pub mod error;
pub mod id;
pub mod llm;
pub mod orchestrator;
pub mod snapshot;
pub mod source;
pub mod tools;

#[cfg(test)]
mod test_support;

pub use error::{LedgerError, Result};
