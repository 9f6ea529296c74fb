//! Retrieval type definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cache::CacheStats;

/// A dense embedding of dimension D. Image- and text-derived vectors share
/// one space and are interchangeable.
pub type FeatureVector = Vec<f32>;

/// A validated image file discovered by the corpus loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusItem {
    /// Corpus-relative path with `/` separators; stable for one build
    pub identifier: String,

    /// Absolute or caller-relative path used to read the image bytes
    pub path: PathBuf,
}

/// A file the loader rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Maps a row of the similarity index back to its corpus identifier.
///
/// `position` equals the order vectors were appended during the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub position: usize,
    pub identifier: String,
}

/// One ranked search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub url: String,

    /// Cosine similarity rescaled from [-1, 1] to [0, 1]
    pub score: f32,
}

/// Statistics for a completed build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStats {
    /// Image files with a known extension that the loader looked at
    pub candidates: usize,

    /// Vectors in the finished index
    pub indexed: usize,

    /// Files rejected by the loader (undecodable or unreadable)
    pub skipped_files: usize,

    /// Loaded items that failed preprocessing or embedding
    pub failed_items: usize,

    pub duration_secs: f64,
}

/// Engine health, as reported to operators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub ready: bool,
    pub corpus_size: usize,
    pub dimensions: usize,
    pub provider: String,
    pub model: String,
    pub cache: CacheStats,
}
