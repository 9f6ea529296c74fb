//! Snapseek CLI
//!
//! Main entry point for the snapseek command-line tool.
//! Builds an image index from a corpus directory and answers text queries.

mod commands;

use clap::{Parser, Subcommand};
use commands::{BuildCommand, SearchCommand};
use snapseek_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Snapseek - search a folder of images with free text
#[derive(Parser, Debug)]
#[command(name = "snapseek")]
#[command(about = "Search a folder of images with free text", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, env = "SNAPSEEK_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of images to index
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Index at most this many images
    #[arg(long, global = true)]
    max_items: Option<usize>,

    /// URL prefix for result links
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build the index and report corpus statistics
    Build(BuildCommand),

    /// Build the index, then run one or more queries
    Search(SearchCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    // An explicit --config wins over the environment
    let config_file = cli.config.clone();
    let config = AppConfig::load_with(|key| match (key, &config_file) {
        ("SNAPSEEK_CONFIG", Some(path)) => Some(path.display().to_string()),
        _ => std::env::var(key).ok(),
    })?;

    let config = config.with_overrides(
        cli.corpus,
        cli.max_items,
        cli.base_url,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.log_json,
    );
    config.validate()?;

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    tracing::info!("Snapseek CLI starting");
    tracing::debug!("Corpus: {:?}", config.corpus.directory);
    tracing::debug!(
        "Embedding: {}/{} ({} dims)",
        config.embedding.provider,
        config.embedding.model,
        config.embedding.dimensions
    );

    let command_name = match &cli.command {
        Commands::Build(_) => "build",
        Commands::Search(_) => "search",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Build(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
