//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - ask: run one question through the assistant
//! - tools: list the tool catalog
//! - status: probe the data source and show snapshot ages

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ledgerbot - ask business questions of your accounting data
#[derive(Parser, Debug)]
#[command(name = "ledgerbot")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question and print the answer
    Ask {
        /// The question, e.g. "Who owes us the most money?"
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// User id recorded with the session
        #[arg(short, long, default_value = "cli")]
        user: String,
    },

    /// List the available data tools
    Tools,

    /// Check the data source and show how old each snapshot is
    Status,
}

impl Commands {
    /// The question text for `ask`, words joined by spaces
    pub fn query_text(&self) -> Option<String> {
        match self {
            Commands::Ask { query, .. } => Some(query.join(" ")),
            _ => None,
        }
    }
}
