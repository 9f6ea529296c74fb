//! Trigram embedding provider for local, offline operation.

use async_trait::async_trait;
use snapseek_core::EmbeddingError;
use std::collections::{HashMap, HashSet};

use crate::embeddings::provider::EmbeddingProvider;
use crate::preprocess::ImageTensor;
use crate::types::FeatureVector;
use crate::vector::normalize_in_place;

const STOP_WORDS: [&str; 32] = [
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

/// Deterministic hashing provider.
///
/// Text is encoded from character trigrams and word frequencies. Images are
/// encoded with a fixed sparse random projection of the preprocessed tensor
/// onto the same dimensions. Neither is semantically meaningful like a
/// trained model, but both are stable, content-dependent and share one
/// space, which is enough to run and test the engine offline.
#[derive(Debug)]
pub struct TrigramProvider {
    dimensions: usize,
}

impl TrigramProvider {
    /// The only model this provider implements.
    pub const MODEL: &'static str = "trigram-v1";

    /// Create a new trigram provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Generate a trigram-based embedding for text.
    fn generate_text_embedding(&self, text: &str) -> FeatureVector {
        let mut embedding = vec![0.0; self.dimensions];
        if self.dimensions == 0 {
            return embedding;
        }

        let lower = text.to_lowercase();
        let stop_words: HashSet<&str> = STOP_WORDS.iter().copied().collect();

        let words: Vec<&str> = lower
            .split_whitespace()
            .filter(|w| !stop_words.contains(w) && w.chars().count() > 2)
            .collect();

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in &words {
            *word_freq.entry(*word).or_insert(0) += 1;
        }

        for (word, freq) in word_freq.iter() {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let trigram_hash = trigram
                    .bytes()
                    .fold(0u64, |acc, b| acc.wrapping_mul(37).wrapping_add(b as u64));

                let dim_idx = (trigram_hash as usize) % self.dimensions;
                embedding[dim_idx] += (*freq as f32).sqrt();
            }

            // Also encode whole word
            let word_hash = word
                .bytes()
                .fold(0u64, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u64));
            let base_dim = (word_hash as usize) % self.dimensions;
            embedding[base_dim] += *freq as f32;
        }

        // Zero vectors (no usable words) stay zero; callers decide what that means
        normalize_in_place(&mut embedding);
        embedding
    }

    /// Project every tensor element onto one signed bucket.
    fn generate_image_embedding(&self, tensor: &ImageTensor) -> FeatureVector {
        let mut embedding = vec![0.0; self.dimensions];
        if self.dimensions == 0 {
            return embedding;
        }

        for (i, value) in tensor.data().iter().enumerate() {
            let h = splitmix64(i as u64);
            let dim_idx = (h as usize) % self.dimensions;
            let sign = if h >> 63 == 0 { 1.0 } else { -1.0 };
            embedding[dim_idx] += sign * value;
        }

        normalize_in_place(&mut embedding);
        embedding
    }
}

/// Stateless 64-bit mixer; the projection must not change between runs.
fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

#[async_trait]
impl EmbeddingProvider for TrigramProvider {
    fn provider_name(&self) -> &str {
        "trigram"
    }

    fn model_name(&self) -> &str {
        Self::MODEL
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_image(&self, tensor: &ImageTensor) -> Result<FeatureVector, EmbeddingError> {
        Ok(self.generate_image_embedding(tensor))
    }

    async fn embed_text_batch(
        &self,
        texts: &[String],
    ) -> Result<Vec<FeatureVector>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| self.generate_text_embedding(text))
            .collect())
    }
}
