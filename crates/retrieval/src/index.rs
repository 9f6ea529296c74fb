//! Similarity index over unit-normalized vectors.
//!
//! Defines a backend-agnostic trait for read-only top-k search and the exact
//! brute-force implementation used by the engine. An index is built once and
//! never mutated, so concurrent searches need no locking.

use snapseek_core::SearchError;
use std::cmp::Ordering;

use crate::types::IndexEntry;
use crate::vector::dot;

/// Trait for similarity index backends.
///
/// Implementations must:
/// - score by inner product against a caller-normalized query
/// - return at most `min(k, len)` hits, best first
/// - break score ties by the lower position
/// - reject `k == 0` with `InvalidK`
pub trait VectorIndex: Send + Sync {
    /// Number of stored vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector dimension.
    fn dimensions(&self) -> usize;

    /// Search for the `k` rows most similar to `query`.
    ///
    /// Returns `(position, raw_score)` pairs with `raw_score` in [-1, 1].
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, SearchError>;

    /// Identifier mapping for a row.
    fn entry(&self, position: usize) -> Option<&IndexEntry>;
}

/// Exact index: a dense row-major N x D matrix scanned in full per query.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimensions: usize,
    vectors: Vec<f32>,
    entries: Vec<IndexEntry>,
}

impl FlatIndex {
    /// Assemble an index from normalized rows in build order.
    ///
    /// `rows[i]` becomes position `i` and maps to `identifiers[i]`. Callers
    /// (the builder) have already checked lengths and normalized every row.
    pub(crate) fn from_rows(
        dimensions: usize,
        rows: Vec<Vec<f32>>,
        identifiers: Vec<String>,
    ) -> Self {
        debug_assert_eq!(rows.len(), identifiers.len());

        let mut vectors = Vec::with_capacity(rows.len() * dimensions);
        for row in &rows {
            debug_assert_eq!(row.len(), dimensions);
            vectors.extend_from_slice(row);
        }

        let entries = identifiers
            .into_iter()
            .enumerate()
            .map(|(position, identifier)| IndexEntry {
                position,
                identifier,
            })
            .collect();

        Self {
            dimensions,
            vectors,
            entries,
        }
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    fn row(&self, position: usize) -> &[f32] {
        let start = position * self.dimensions;
        &self.vectors[start..start + self.dimensions]
    }
}

/// Best first: higher score, then lower position.
fn rank(a: &(usize, f32), b: &(usize, f32)) -> Ordering {
    b.1.total_cmp(&a.1).then(a.0.cmp(&b.0))
}

impl VectorIndex for FlatIndex {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, SearchError> {
        if k == 0 {
            return Err(SearchError::InvalidK(k));
        }
        if query.len() != self.dimensions {
            return Err(SearchError::SearchFailed(
                snapseek_core::EmbeddingError::DimensionMismatch {
                    expected: self.dimensions,
                    actual: query.len(),
                },
            ));
        }

        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = (0..self.len())
            .map(|position| (position, dot(query, self.row(position))))
            .collect();

        if k < scored.len() {
            scored.select_nth_unstable_by(k - 1, rank);
            scored.truncate(k);
        }
        scored.sort_by(rank);

        Ok(scored)
    }

    fn entry(&self, position: usize) -> Option<&IndexEntry> {
        self.entries.get(position)
    }
}
