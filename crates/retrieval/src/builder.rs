//! Index builder: corpus -> preprocess -> embed -> normalize -> index.
//!
//! The pipeline is sequential and tolerant of bad items. Any single item
//! that fails to decode, preprocess or embed is logged and skipped; the
//! build only fails when nothing at all could be embedded.

use snapseek_core::BuildError;
use std::sync::Arc;
use std::time::Instant;

use crate::corpus::CorpusLoader;
use crate::embeddings::{check_dimensions, EmbeddingProvider};
use crate::index::FlatIndex;
use crate::preprocess::Preprocessor;
use crate::progress::ProgressReporter;
use crate::types::{BuildStats, CorpusItem, FeatureVector};
use crate::vector::normalize_in_place;

/// Run `f` on the blocking pool under the caller's subscriber and span.
async fn spawn_blocking_in_scope<F, T>(f: F) -> Result<T, tokio::task::JoinError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let dispatch = tracing::dispatcher::get_default(|d| d.clone());
    let span = tracing::Span::current();
    tokio::task::spawn_blocking(move || {
        tracing::dispatcher::with_default(&dispatch, || span.in_scope(f))
    })
    .await
}

/// Items between "Processed i/N images" log lines.
pub const DEFAULT_PROGRESS_INTERVAL: usize = 100;

#[derive(Debug, Clone)]
pub struct IndexBuilder {
    preprocessor: Preprocessor,
    provider: Arc<dyn EmbeddingProvider>,
    progress_interval: usize,
    reporter: ProgressReporter,
}

impl IndexBuilder {
    pub fn new(preprocessor: Preprocessor, provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            preprocessor,
            provider,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            reporter: ProgressReporter::noop(),
        }
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    pub fn with_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Build an index over everything `loader` yields.
    ///
    /// Fails with `DirectoryNotFound`/`EmptyCorpus` from the loader,
    /// `NoValidEmbeddings` if every item failed, and `DegenerateEmbedding`
    /// if a successful embedding cannot be normalized.
    pub async fn build(&self, loader: &CorpusLoader) -> Result<(FlatIndex, BuildStats), BuildError> {
        let started = Instant::now();
        let root = loader.root().display().to_string();

        let scan_loader = loader.clone();
        let scan = spawn_blocking_in_scope(move || scan_loader.load())
            .await
            .map_err(|e| BuildError::Worker(e.to_string()))??;

        self.reporter
            .scan(scan.items.len() as u64, scan.skipped.len() as u64, &root);

        let total = scan.items.len();
        let model = self.provider.model_name().to_string();
        tracing::info!(
            "Embedding {} images with {}/{}",
            total,
            self.provider.provider_name(),
            model
        );

        let mut vectors: Vec<FeatureVector> = Vec::with_capacity(total);
        let mut identifiers: Vec<String> = Vec::with_capacity(total);
        let mut failed_items = 0usize;

        for (i, item) in scan.items.into_iter().enumerate() {
            match self.embed_item(&item).await {
                Ok(vector) => {
                    vectors.push(vector);
                    identifiers.push(item.identifier);
                }
                Err(reason) => {
                    failed_items += 1;
                    tracing::warn!("Skipping {}: {}", item.identifier, reason);
                }
            }

            let processed = i + 1;
            if processed % self.progress_interval == 0 || processed == total {
                tracing::info!("Processed {}/{} images", processed, total);
                self.reporter.embed(processed as u64, total as u64, &model);
            }
        }

        if vectors.is_empty() {
            return Err(BuildError::NoValidEmbeddings { attempted: total });
        }

        for (vector, identifier) in vectors.iter_mut().zip(&identifiers) {
            if !normalize_in_place(vector) {
                return Err(BuildError::DegenerateEmbedding {
                    identifier: identifier.clone(),
                });
            }
        }

        let dimensions = self.provider.dimensions();
        let indexed = vectors.len();
        let index = FlatIndex::from_rows(dimensions, vectors, identifiers);
        self.reporter.index(indexed as u64, dimensions);

        let stats = BuildStats {
            candidates: scan.candidates,
            indexed,
            skipped_files: scan.skipped.len(),
            failed_items,
            duration_secs: started.elapsed().as_secs_f64(),
        };

        tracing::info!(
            "Built index of {} vectors ({} skipped files, {} failed items) in {:.2}s",
            stats.indexed,
            stats.skipped_files,
            stats.failed_items,
            stats.duration_secs
        );

        Ok((index, stats))
    }

    /// Preprocess and embed one item. Errors are reasons for skipping it.
    async fn embed_item(&self, item: &CorpusItem) -> Result<FeatureVector, String> {
        let preprocessor = self.preprocessor.clone();
        let path = item.path.clone();

        // Decoding and resizing are CPU-bound
        let tensor = spawn_blocking_in_scope(move || preprocessor.load(&path))
            .await
            .map_err(|e| format!("preprocessing worker failed: {}", e))?
            .map_err(|e| e.to_string())?;

        let vector = self
            .provider
            .embed_image(&tensor)
            .await
            .map_err(|e| e.to_string())?;

        check_dimensions(&vector, self.provider.dimensions()).map_err(|e| e.to_string())?;

        Ok(vector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::index::VectorIndex;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;

    fn write_png(dir: &Path, name: &str, shade: u8) {
        let img = image::RgbImage::from_fn(16, 16, |x, y| {
            image::Rgb([shade, (x * 8) as u8, (y * 8) as u8])
        });
        img.save(dir.join(name)).unwrap();
    }

    fn builder() -> IndexBuilder {
        IndexBuilder::new(Preprocessor::new(16), Arc::new(TrigramProvider::new(32)))
    }

    #[tokio::test]
    async fn test_build_indexes_every_valid_image() {
        let temp = TempDir::new().unwrap();
        for i in 0..4 {
            write_png(temp.path(), &format!("img_{}.png", i), i * 60);
        }

        let (index, stats) = builder()
            .build(&CorpusLoader::new(temp.path()))
            .await
            .unwrap();

        assert_eq!(index.len(), 4);
        assert_eq!(index.dimensions(), 32);
        assert_eq!(stats.indexed, 4);
        assert_eq!(stats.candidates, 4);
        assert_eq!(stats.failed_items, 0);
        assert_eq!(index.entry(2).unwrap().identifier, "img_2.png");
    }

    #[tokio::test]
    async fn test_progress_logged_at_interval_and_end() {
        let temp = TempDir::new().unwrap();
        for i in 0..5 {
            write_png(temp.path(), &format!("img_{}.png", i), i * 40);
        }

        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let reporter = ProgressReporter::new(Arc::new(move |event| {
            sink.lock().unwrap().push(event);
        }));

        builder()
            .with_progress_interval(2)
            .with_reporter(reporter)
            .build(&CorpusLoader::new(temp.path()))
            .await
            .unwrap();

        let events = events.lock().unwrap();
        let embed: Vec<u64> = events
            .iter()
            .filter(|e| e.phase == crate::progress::Phase::Embed)
            .map(|e| e.current)
            .collect();
        assert_eq!(embed, vec![2, 4, 5]);
    }

    #[tokio::test]
    async fn test_empty_corpus_is_distinct_error() {
        let temp = TempDir::new().unwrap();
        let result = builder().build(&CorpusLoader::new(temp.path())).await;
        assert!(matches!(result, Err(BuildError::EmptyCorpus(_))));
    }
}
