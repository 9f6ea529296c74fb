//! Text-to-image retrieval engine.
//!
//! Builds an exact similarity index over a directory of images once, then
//! answers free-text queries by embedding them into the same vector space.

pub mod builder;
pub mod cache;
pub mod corpus;
pub mod embeddings;
pub mod engine;
pub mod index;
pub mod preprocess;
pub mod progress;
pub mod resolver;
pub mod types;
pub mod vector;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use builder::IndexBuilder;
pub use cache::{CacheStats, QueryCache};
pub use corpus::{CorpusLoader, CorpusScan};
pub use embeddings::{create_provider, EmbeddingProvider};
pub use engine::{EngineOptions, RetrievalEngine};
pub use index::{FlatIndex, VectorIndex};
pub use preprocess::{ImageTensor, Preprocessor};
pub use progress::{ProgressEvent, ProgressReporter};
pub use resolver::{BaseUrlResolver, UrlResolver};
pub use types::{BuildStats, CorpusItem, EngineStatus, FeatureVector, IndexEntry, SearchResult};
