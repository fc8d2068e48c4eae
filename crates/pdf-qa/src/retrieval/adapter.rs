//! Embedding and index adapter between the chunker and the relevance filter

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::{Chunk, Embedding, ScoredCandidate};

use super::index::VectorIndex;

/// Embeds chunks and queries with one provider and searches a [`VectorIndex`]
///
/// Chunks and queries must go through the same provider, otherwise scores
/// are meaningless. Every vector the provider returns is checked before it
/// reaches the index.
pub struct IndexAdapter {
    embedder: Arc<dyn EmbeddingProvider>,
}

impl IndexAdapter {
    pub fn new(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { embedder }
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Embed every chunk, preserving order
    pub async fn embed(&self, chunks: &[Chunk]) -> Result<Vec<Embedding>> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self
            .embedder
            .embed_batch(&texts)
            .await
            .map_err(as_embedding_error)?;

        if vectors.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "Provider {} returned {} embeddings for {} chunks",
                self.embedder.name(),
                vectors.len(),
                chunks.len()
            )));
        }

        chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| {
                self.check_vector(&vector)?;
                Ok(Embedding::for_chunk(chunk, vector))
            })
            .collect()
    }

    /// Build a searchable index from chunk embeddings
    pub fn build_index(&self, embeddings: &[Embedding]) -> Result<VectorIndex> {
        VectorIndex::build(embeddings)
    }

    /// Embed `query` and return the `top_k` most similar chunks
    pub async fn search(
        &self,
        index: &VectorIndex,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ScoredCandidate>> {
        let vector = self
            .embedder
            .embed(query)
            .await
            .map_err(as_embedding_error)?;
        self.check_vector(&vector)?;

        index.search(&vector, top_k)
    }

    fn check_vector(&self, vector: &[f32]) -> Result<()> {
        let expected = self.embedder.dimensions();
        if vector.len() != expected {
            return Err(Error::embedding(format!(
                "Expected {} dimensions from {}, got {}",
                expected,
                self.embedder.name(),
                vector.len()
            )));
        }
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(Error::embedding("Embedding contains non-finite values"));
        }
        Ok(())
    }
}

fn as_embedding_error(error: Error) -> Error {
    match error {
        Error::Embedding(_) => error,
        other => Error::embedding(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Maps text to a vector by keyword presence
    struct KeywordEmbedder {
        extra: usize,
        poison: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for KeywordEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let lower = text.to_lowercase();
            let mut v = vec![
                lower.contains("interest") as u8 as f32,
                lower.contains("payment") as u8 as f32,
                0.1,
            ];
            if self.poison {
                v[2] = f32::NAN;
            }
            Ok(v)
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let mut out = Vec::new();
            for text in texts {
                out.push(self.embed(text).await?);
            }
            for _ in 0..self.extra {
                out.push(vec![0.0, 0.0, 1.0]);
            }
            Ok(out)
        }

        fn dimensions(&self) -> usize {
            3
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "keyword"
        }
    }

    fn adapter(extra: usize, poison: bool) -> IndexAdapter {
        IndexAdapter::new(Arc::new(KeywordEmbedder { extra, poison }))
    }

    fn chunks() -> Vec<Chunk> {
        vec![
            Chunk::new(0, "Interest accrues daily.".to_string(), 0, 23),
            Chunk::new(1, "Payments are due monthly.".to_string(), 24, 49),
        ]
    }

    #[tokio::test]
    async fn test_embed_preserves_order() {
        let embeddings = adapter(0, false).embed(&chunks()).await.unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].ordinal, 0);
        assert_eq!(embeddings[1].text, "Payments are due monthly.");
    }

    #[tokio::test]
    async fn test_embed_rejects_count_mismatch() {
        let err = adapter(1, false).embed(&chunks()).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_embed_rejects_nan() {
        let err = adapter(0, true).embed(&chunks()).await.unwrap_err();
        assert!(matches!(err, Error::Embedding(_)));
    }

    #[tokio::test]
    async fn test_search_finds_relevant_chunk() {
        let adapter = adapter(0, false);
        let embeddings = adapter.embed(&chunks()).await.unwrap();
        let index = adapter.build_index(&embeddings).unwrap();

        let results = adapter.search(&index, "What interest applies?", 5).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].text, "Interest accrues daily.");
        assert!(results[0].score > results[1].score);
    }
}
