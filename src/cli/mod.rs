//! CLI module for ledgerbot - command-line interface and subcommands.

pub mod commands;

pub use commands::Cli;
