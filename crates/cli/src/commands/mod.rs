//! Command handlers for the Snapseek CLI.

pub mod build;
pub mod search;

pub use build::BuildCommand;
pub use search::SearchCommand;

use snapseek_core::{config::AppConfig, AppResult};
use snapseek_retrieval::{BuildStats, ProgressReporter, RetrievalEngine};
use std::sync::Arc;

/// Construct the engine from config and build its index.
///
/// With `show_progress`, build progress lines are written to stderr.
pub(crate) async fn ready_engine(
    config: &AppConfig,
    show_progress: bool,
) -> AppResult<(RetrievalEngine, BuildStats)> {
    let mut engine = RetrievalEngine::from_config(config)?;

    if show_progress {
        engine = engine.with_reporter(ProgressReporter::new(Arc::new(|event| {
            eprintln!("{}", event.format_simple());
        })));
    }

    let stats = engine
        .build_index(&config.corpus.directory, config.corpus.max_items)
        .await?;

    Ok((engine, stats))
}
