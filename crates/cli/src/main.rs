//! docqa CLI
//!
//! Main entry point for the docqa command-line tool.
//! Ingests a directory of text documents into a vector index, or answers a
//! question from an existing index.

mod commands;

use clap::builder::FalseyValueParser;
use clap::{Parser, Subcommand};
use commands::{AskCommand, IngestCommand};
use docqa_core::{config::AppConfig, logging, AppResult, RagConfig};
use std::path::PathBuf;

/// docqa - question answering over your documents
#[derive(Parser, Debug)]
#[command(name = "docqa")]
#[command(about = "Question answering over a document collection", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "DOCQA_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "DOCQA_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output (any non-false NO_COLOR value also disables it)
    #[arg(long, global = true, env = "NO_COLOR", value_parser = FalseyValueParser::new())]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load, embed and index the documents of the data directory
    Ingest(IngestCommand),

    /// Answer a question from the indexed documents
    Ask(AskCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // A missing .env file is fine; variables may come from the environment
    let dotenv = dotenvy::dotenv();

    let cli = Cli::parse();

    // Workspace and config file flags take precedence over the environment
    let config = AppConfig::load_with(|key| match key {
        "DOCQA_WORKSPACE" => cli
            .workspace
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| std::env::var(key).ok()),
        "DOCQA_CONFIG" => cli
            .config
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .or_else(|| std::env::var(key).ok()),
        _ => std::env::var(key).ok(),
    })?
    .with_overrides(None, cli.log_level.clone(), cli.verbose, cli.no_color);

    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("docqa starting");
    match &dotenv {
        Ok(path) => tracing::debug!("Loaded environment from {:?}", path),
        Err(e) => tracing::debug!("No .env file loaded: {}", e),
    }
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!(
        "LLM: {} ({}), embeddings: {} ({})",
        config.llm.provider,
        config.llm.model,
        config.embedding.provider,
        config.embedding.model
    );

    config.validate()?;
    let rag_config = RagConfig::from_env()?;
    tracing::debug!("Target: {:?}", rag_config);

    let command_name = match &cli.command {
        Commands::Ingest(_) => "ingest",
        Commands::Ask(_) => "ask",
    };
    let span = tracing::info_span!("command", name = command_name);

    let result = {
        use tracing::Instrument;
        match cli.command {
            Commands::Ingest(cmd) => cmd.execute(&config, rag_config).instrument(span).await,
            Commands::Ask(cmd) => cmd.execute(&config, rag_config).instrument(span).await,
        }
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
