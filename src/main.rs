use chrono::Utc;
use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use serde_json::{Value, json};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use ledgerbot::accounting::register_standard_tools;
use ledgerbot::context::{ContextAssembler, KeywordRetriever};
use ledgerbot::llm::{LlmClient, OpenAiClient};
use ledgerbot::orchestrator::{Orchestrator, SessionOutcome, SessionRequest};
use ledgerbot::snapshot::SqliteSnapshotStore;
use ledgerbot::source::{DataSource, HttpDataSource};
use ledgerbot::tools::{Origin, ToolRegistry};

mod cli;
mod config;

use cli::Cli;
use cli::commands::Commands;
use config::Config;

fn setup_logging(default_filter: &str) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ledgerbot")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("ledgerbot.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    // RUST_LOG wins over the configured level
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Registry over the configured data source and snapshot file
fn build_registry(config: &Config) -> Result<Arc<ToolRegistry>> {
    let store = SqliteSnapshotStore::open(&config.snapshots.path).context("Failed to open snapshot store")?;
    let source: Arc<dyn DataSource> = Arc::new(
        HttpDataSource::new(&config.source.base_url, &config.source.company, config.source.timeout())
            .context("Failed to create data source client")?,
    );

    let registry = Arc::new(ToolRegistry::new(Arc::new(store)).with_fetch_timeout(config.source.timeout()));
    register_standard_tools(&registry, source).context("Failed to register tools")?;
    Ok(registry)
}

async fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    info!("Starting application");

    if cli.is_verbose() {
        println!("{}", "Verbose mode enabled".yellow());
    }

    match &cli.command {
        Commands::Ask { user, .. } => {
            let query = cli.command.query_text().unwrap_or_default();
            handle_ask_command(&query, user, cli.is_verbose(), config).await
        }
        Commands::Tools => handle_tools_command(config),
        Commands::Status => handle_status_command(config).await,
    }
}

async fn handle_ask_command(query: &str, user: &str, verbose: bool, config: &Config) -> Result<()> {
    info!("Asking: {}", query);
    let registry = build_registry(config)?;
    let llm = Arc::new(OpenAiClient::new(config.llm.client_config()).context("Failed to create LLM client")?);
    if verbose {
        println!("{} {}", "Model:".cyan(), llm.model());
    }

    let retriever = Arc::new(KeywordRetriever::new(config.retrieval.rules.clone()));
    let assembler = ContextAssembler::new(retriever).with_max_snippets(config.retrieval.max_snippets);
    let orchestrator =
        Orchestrator::new(llm, registry, assembler).with_config(config.orchestrator.orchestrator_config());

    let outcome = orchestrator.run(SessionRequest::new(user, query)).await;
    print_outcome(&outcome, verbose);
    Ok(())
}

fn print_outcome(outcome: &SessionOutcome, verbose: bool) {
    println!("{}", outcome.answer);
    println!();

    if !outcome.complete {
        let reason = outcome.incomplete_reason.as_deref().unwrap_or("unknown");
        println!("{} {}", "Incomplete:".yellow(), reason);
    }

    let now = Utc::now();
    for p in &outcome.provenance {
        let origin = match p.origin {
            Origin::Live => "live".green(),
            Origin::Cached => "cached".yellow(),
            Origin::Unavailable => "unavailable".red(),
        };
        match p.staleness(now) {
            Some(staleness) => println!("  {} {} - {}", p.tool, origin, staleness),
            None => println!("  {} {}", p.tool, origin),
        }
    }

    if verbose {
        println!(
            "{} {} round(s), {} tokens, session {}",
            "Stats:".cyan(),
            outcome.rounds,
            outcome.usage.total(),
            outcome.session_id
        );
        if outcome.retrieval_degraded {
            println!("{}", "Business context unavailable for this session".yellow());
        }
    }
}

fn handle_tools_command(config: &Config) -> Result<()> {
    info!("Listing tools");
    let registry = build_registry(config)?;
    let catalog = registry.catalog();
    println!("{} {}", "Tools:".green(), catalog.len());
    for descriptor in catalog.all() {
        let cached = if descriptor.cacheable { "" } else { " (not cached)" };
        println!("  {}{}", descriptor.signature().cyan(), cached);
        println!("      {}", descriptor.description);
    }
    Ok(())
}

async fn handle_status_command(config: &Config) -> Result<()> {
    info!("Checking source status");
    let registry = build_registry(config)?;
    let result = registry
        .invoke("get_source_status", &json!({}))
        .await
        .context("Status check failed")?;
    let payload = result.payload.unwrap_or(Value::Null);

    if payload["online"].as_bool().unwrap_or(false) {
        println!("{} {}", "Source:".green(), "online".green());
    } else {
        println!("{} {}", "Source:".green(), "offline".red());
        if let Some(detail) = payload["detail"].as_str() {
            println!("  {}", detail);
        }
    }

    let snapshots = payload["snapshots"].as_array().cloned().unwrap_or_default();
    if snapshots.is_empty() {
        println!("{}", "No snapshots stored".yellow());
        return Ok(());
    }
    println!("{} {}", "Snapshots:".green(), snapshots.len());
    for snap in snapshots {
        println!(
            "  {} - {} ({})",
            snap["key"].as_str().unwrap_or("?"),
            snap["captured_at"].as_str().unwrap_or("?"),
            snap["age"].as_str().unwrap_or("?")
        );
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    setup_logging(config.log_filter()).context("Failed to setup logging")?;

    info!("Starting with config from: {:?}", cli.config);

    run_application(&cli, &config).await.context("Application failed")?;

    Ok(())
}
