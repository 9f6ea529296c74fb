//! Embedding provider trait and factory.

use async_trait::async_trait;
use snapseek_core::config::EmbeddingSettings;
use snapseek_core::EmbeddingError;
use std::sync::Arc;

use super::providers::TrigramProvider;
use crate::preprocess::ImageTensor;
use crate::types::FeatureVector;

/// Trait for embedding providers.
///
/// Implementations must be deterministic for identical input and must
/// place image and text vectors in the same metric space.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "trigram")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Embed one preprocessed image.
    async fn embed_image(&self, tensor: &ImageTensor) -> Result<FeatureVector, EmbeddingError>;

    /// Generate text embeddings for multiple texts in a batch.
    async fn embed_text_batch(&self, texts: &[String])
        -> Result<Vec<FeatureVector>, EmbeddingError>;

    /// Generate embedding for a single text (convenience method).
    async fn embed_text(&self, text: &str) -> Result<FeatureVector, EmbeddingError> {
        let mut results = self.embed_text_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| EmbeddingError::Provider("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
pub fn create_provider(
    settings: &EmbeddingSettings,
) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    match settings.provider.as_str() {
        "trigram" => {
            if settings.model != TrigramProvider::MODEL {
                return Err(EmbeddingError::Unsupported(format!(
                    "model '{}' for provider 'trigram'. Supported models: {}",
                    settings.model,
                    TrigramProvider::MODEL
                )));
            }
            Ok(Arc::new(TrigramProvider::new(settings.dimensions)))
        }

        other => Err(EmbeddingError::Unsupported(format!(
            "'{}'. Supported providers: trigram",
            other
        ))),
    }
}
