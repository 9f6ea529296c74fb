//! Search command handler.

use clap::Args;
use futures::future::join_all;
use snapseek_core::{config::AppConfig, AppError, AppResult};

/// Build the index, then rank corpus images against each query
#[derive(Args, Debug)]
pub struct SearchCommand {
    /// Query text; pass several to run them concurrently
    #[arg(required = true)]
    pub queries: Vec<String>,

    /// Number of results per query (default from config)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SearchCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing search command ({} queries)", self.queries.len());

        let (engine, _stats) = super::ready_engine(config, false).await?;
        let k = engine.resolve_top_k(self.top_k)?;

        let outcomes = join_all(self.queries.iter().map(|q| engine.search(q, k))).await;

        let mut first_error = None;
        let mut report = Vec::with_capacity(outcomes.len());

        for (query, outcome) in self.queries.iter().zip(outcomes) {
            match outcome {
                Ok(results) => {
                    if self.json {
                        report.push(serde_json::json!({ "query": query, "results": results }));
                    } else {
                        println!("{}", query);
                        for (rank, result) in results.iter().enumerate() {
                            println!("  {}. {:.4}  {}", rank + 1, result.score, result.url);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("Query {:?} failed: {}", query, e);
                    if self.json {
                        report.push(serde_json::json!({ "query": query, "error": e.to_string() }));
                    } else {
                        println!("{}\n  error: {}", query, e);
                    }
                    first_error.get_or_insert(e);
                }
            }
        }

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }

        match first_error {
            Some(e) => Err(AppError::from(e)),
            None => Ok(()),
        }
    }
}
