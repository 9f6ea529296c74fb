//! Retrieval engine: the build-once, query-many façade.
//!
//! One engine owns one similarity index and one query cache. It starts out
//! not ready; `build_index` runs exactly once and, on success, publishes the
//! index. Every query entry point fails fast with `IndexNotBuilt` until then.

use snapseek_core::{AppConfig, BuildError, EmbeddingError, SearchError};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use crate::builder::{IndexBuilder, DEFAULT_PROGRESS_INTERVAL};
use crate::cache::QueryCache;
use crate::corpus::CorpusLoader;
use crate::embeddings::{check_dimensions, create_provider, EmbeddingProvider};
use crate::index::VectorIndex;
use crate::preprocess::{Preprocessor, DEFAULT_IMAGE_SIZE};
use crate::progress::ProgressReporter;
use crate::resolver::{BaseUrlResolver, UrlResolver};
use crate::types::{BuildStats, EngineStatus, SearchResult};
use crate::vector::{normalize_in_place, rescale_cosine};

/// Tunables the engine reads once at construction.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub image_size: u32,
    pub recursive: bool,
    pub progress_interval: usize,
    pub cache_capacity: usize,
    pub default_top_k: usize,
    pub max_top_k: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            image_size: DEFAULT_IMAGE_SIZE,
            recursive: false,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            cache_capacity: 1000,
            default_top_k: 5,
            max_top_k: 20,
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            image_size: config.preprocess.image_size,
            recursive: config.corpus.recursive,
            progress_interval: config.build.progress_interval,
            cache_capacity: config.search.cache_capacity,
            default_top_k: config.search.default_top_k,
            max_top_k: config.search.max_top_k,
        }
    }
}

/// Clears the building flag however the build future ends.
struct BuildGuard<'a>(&'a AtomicBool);

impl Drop for BuildGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct RetrievalEngine {
    provider: Arc<dyn EmbeddingProvider>,
    resolver: Arc<dyn UrlResolver>,
    options: EngineOptions,
    reporter: ProgressReporter,
    index: OnceLock<Box<dyn VectorIndex>>,
    building: AtomicBool,
    cache: QueryCache,
}

impl std::fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalEngine")
            .field("provider", &self.provider.provider_name())
            .field("ready", &self.is_ready())
            .field("cache", &self.cache)
            .finish()
    }
}

impl RetrievalEngine {
    pub fn new(
        provider: Arc<dyn EmbeddingProvider>,
        resolver: Arc<dyn UrlResolver>,
        options: EngineOptions,
    ) -> Self {
        let cache = QueryCache::new(options.cache_capacity);
        Self {
            provider,
            resolver,
            options,
            reporter: ProgressReporter::noop(),
            index: OnceLock::new(),
            building: AtomicBool::new(false),
            cache,
        }
    }

    /// Construct the provider, resolver and options described by `config`.
    pub fn from_config(config: &AppConfig) -> Result<Self, EmbeddingError> {
        let provider = create_provider(&config.embedding)?;
        let resolver = Arc::new(BaseUrlResolver::from_settings(&config.urls));
        Ok(Self::new(
            provider,
            resolver,
            EngineOptions::from_config(config),
        ))
    }

    pub fn with_reporter(mut self, reporter: ProgressReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn is_ready(&self) -> bool {
        self.index.get().is_some()
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Build the index over `corpus_dir`. Runs at most once per engine.
    ///
    /// A second call after success fails with `AlreadyBuilt`; a call while
    /// another build is running fails with `BuildInProgress`. A failed build
    /// leaves the engine not ready and may be retried.
    pub async fn build_index(
        &self,
        corpus_dir: impl AsRef<Path>,
        max_items: Option<usize>,
    ) -> Result<BuildStats, BuildError> {
        if self.is_ready() {
            return Err(BuildError::AlreadyBuilt);
        }
        if self
            .building
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(BuildError::BuildInProgress);
        }
        let _guard = BuildGuard(&self.building);

        let corpus_dir = corpus_dir.as_ref();
        tracing::info!("Building index from {:?}", corpus_dir);

        let loader = CorpusLoader::new(corpus_dir)
            .with_max_items(max_items)
            .recursive(self.options.recursive);

        let builder = IndexBuilder::new(
            Preprocessor::new(self.options.image_size),
            self.provider.clone(),
        )
        .with_progress_interval(self.options.progress_interval)
        .with_reporter(self.reporter.clone());

        let (index, stats) = match builder.build(&loader).await {
            Ok(built) => built,
            Err(e) => {
                tracing::error!("Index build failed: {}", e);
                return Err(e);
            }
        };

        self.index
            .set(Box::new(index))
            .map_err(|_| BuildError::AlreadyBuilt)?;

        tracing::info!(
            "Engine ready: {} images indexed with {}",
            stats.indexed,
            self.provider.model_name()
        );
        Ok(stats)
    }

    /// Return up to `k` corpus images ranked by similarity to `query`.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>, SearchError> {
        let index = self.index.get().ok_or(SearchError::IndexNotBuilt)?;

        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        if k == 0 {
            return Err(SearchError::InvalidK(k));
        }

        tracing::debug!(query, k, "Search");

        let vector = self
            .cache
            .get_or_compute(query, || self.embed_query(query))
            .await
            .map_err(SearchError::SearchFailed)?;

        let hits = index.search(&vector, k)?;

        let results = hits
            .into_iter()
            .filter_map(|(position, raw)| {
                let entry = index.entry(position)?;
                Some(SearchResult {
                    url: self.resolver.resolve(&entry.identifier),
                    score: rescale_cosine(raw),
                })
            })
            .collect();

        Ok(results)
    }

    /// Apply the configured default and upper bound to a requested top-k.
    pub fn resolve_top_k(&self, requested: Option<usize>) -> Result<usize, SearchError> {
        let k = requested.unwrap_or(self.options.default_top_k);
        if k == 0 {
            return Err(SearchError::InvalidK(k));
        }
        if k > self.options.max_top_k {
            return Err(SearchError::TopKTooLarge {
                requested: k,
                max: self.options.max_top_k,
            });
        }
        Ok(k)
    }

    pub fn status(&self) -> EngineStatus {
        let index = self.index.get();
        EngineStatus {
            ready: index.is_some(),
            corpus_size: index.map(|i| i.len()).unwrap_or(0),
            dimensions: self.provider.dimensions(),
            provider: self.provider.provider_name().to_string(),
            model: self.provider.model_name().to_string(),
            cache: self.cache.stats(),
        }
    }

    /// Embed and normalize query text. Runs only on a cache miss.
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = self.provider.embed_text(query).await?;
        check_dimensions(&vector, self.provider.dimensions())?;
        if !normalize_in_place(&mut vector) {
            return Err(EmbeddingError::Degenerate);
        }
        Ok(vector)
    }

    #[cfg(test)]
    pub(crate) fn cached_vector(&self, query: &str) -> Option<crate::cache::CachedVector> {
        self.cache.peek(query)
    }
}
