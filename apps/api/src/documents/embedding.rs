//! Embedding: the feature vector computed once per document before scoring.
//!
//! Default: `HashingEmbedder` (pure Rust, deterministic, no model download).
//! A hosted embedding model can be swapped in behind the same trait.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use async_trait::async_trait;
use thiserror::Error;

/// Matches the width of the sentence-transformer vectors the screener started with.
pub const DEFAULT_DIMENSIONS: usize = 384;

#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("cannot embed empty text")]
    EmptyInput,
}

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    /// Length of every vector `embed` returns.
    fn dimensions(&self) -> usize;
}

/// Feature-hashed bag of words, L2-normalized.
///
/// Tokens are lowercased alphanumeric runs; each token adds 1.0 to the bucket
/// its hash selects. `DefaultHasher::new()` uses fixed keys, so vectors are
/// stable across runs of the same binary.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimensions];

        for token in tokenize(text) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        if tokenize(text).next().is_none() {
            return Err(EmbedError::EmptyInput);
        }
        Ok(self.vectorize(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }
        dot / (norm_a * norm_b)
    }

    #[tokio::test]
    async fn test_vector_has_configured_width_and_unit_norm() {
        let embedder = HashingEmbedder::default();
        let vector = embedder.embed("Rust, Tokio and Axum in production").await.unwrap();

        assert_eq!(vector.len(), DEFAULT_DIMENSIONS);
        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5, "norm was {norm}");
    }

    #[tokio::test]
    async fn test_embedding_is_deterministic_and_case_insensitive() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed("Python Machine Learning").await.unwrap();
        let b = embedder.embed("python machine learning").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_punctuation_only_text_is_rejected() {
        let err = HashingEmbedder::default().embed(" -- ... ").await.unwrap_err();
        assert!(matches!(err, EmbedError::EmptyInput));
    }

    #[tokio::test]
    async fn test_related_texts_are_closer_than_unrelated() {
        let embedder = HashingEmbedder::default();
        let resume = embedder.embed("backend engineer python django postgres").await.unwrap();
        let jd = embedder.embed("python backend engineer with postgres").await.unwrap();
        let other = embedder.embed("pastry chef croissant baking").await.unwrap();

        assert!(cosine_similarity(&resume, &jd) > cosine_similarity(&resume, &other));
    }

    #[test]
    fn test_cosine_similarity_of_zero_vector_is_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 2.0], &[1.0, 2.0]) - 1.0).abs() < 1e-6);
    }
}
