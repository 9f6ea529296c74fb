//! Embedding providers.
//!
//! A provider maps preprocessed images and query text into one shared
//! D-dimensional space. The engine treats it as an opaque, possibly slow
//! capability and checks the shape of everything it returns.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};

use snapseek_core::EmbeddingError;

/// Reject vectors whose length differs from the index dimension.
pub fn check_dimensions(vector: &[f32], expected: usize) -> Result<(), EmbeddingError> {
    if vector.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dimensions() {
        assert!(check_dimensions(&[0.0; 4], 4).is_ok());
        assert_eq!(
            check_dimensions(&[0.0; 3], 4),
            Err(EmbeddingError::DimensionMismatch {
                expected: 4,
                actual: 3
            })
        );
    }
}
