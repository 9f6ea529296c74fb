//! Build command handler.

use clap::Args;
use snapseek_core::{config::AppConfig, AppResult};

/// Build the index and print build statistics
#[derive(Args, Debug)]
pub struct BuildCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl BuildCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!(
            "Executing build command for {:?}",
            config.corpus.directory
        );

        let (engine, stats) = super::ready_engine(config, !self.json).await?;
        let status = engine.status();

        if self.json {
            let output = serde_json::json!({
                "build": stats,
                "status": status,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        } else {
            println!(
                "Indexed {} of {} images ({} skipped, {} failed) in {:.2}s",
                stats.indexed,
                stats.candidates,
                stats.skipped_files,
                stats.failed_items,
                stats.duration_secs
            );
            println!(
                "Embedding: {}/{} ({} dims)",
                status.provider, status.model, status.dimensions
            );
        }

        Ok(())
    }
}
