//! Exact cosine-similarity index over chunk embeddings

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::types::{Embedding, ScoredCandidate};

/// One indexed chunk: ordinal, verbatim text, unit-length vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub ordinal: u32,
    pub text: String,
    pub vector: Vec<f32>,
}

/// Flat vector index scored by cosine similarity
///
/// Vectors are L2-normalized when the index is built, so a search is a dot
/// product per entry. Small enough per request that exact search beats any
/// approximate structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    dimensions: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Build an index from chunk embeddings
    ///
    /// Rejects empty input, mixed dimensions, duplicate ordinals and
    /// non-finite values.
    pub fn build(embeddings: &[Embedding]) -> Result<Self> {
        let first = embeddings
            .first()
            .ok_or_else(|| Error::index("Cannot build an index from zero embeddings"))?;

        let dimensions = first.dimensions();
        if dimensions == 0 {
            return Err(Error::index("Embeddings have zero dimensions"));
        }

        let mut seen = HashSet::with_capacity(embeddings.len());
        let mut entries = Vec::with_capacity(embeddings.len());

        for embedding in embeddings {
            if embedding.dimensions() != dimensions {
                return Err(Error::index(format!(
                    "Embedding {} has {} dimensions, expected {}",
                    embedding.ordinal,
                    embedding.dimensions(),
                    dimensions
                )));
            }
            if !seen.insert(embedding.ordinal) {
                return Err(Error::index(format!(
                    "Duplicate chunk ordinal {}",
                    embedding.ordinal
                )));
            }
            if embedding.vector.iter().any(|v| !v.is_finite()) {
                return Err(Error::index(format!(
                    "Embedding {} contains non-finite values",
                    embedding.ordinal
                )));
            }

            entries.push(IndexEntry {
                ordinal: embedding.ordinal,
                text: embedding.text.clone(),
                vector: normalize(&embedding.vector),
            });
        }

        Ok(Self {
            dimensions,
            entries,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Check a deserialized index is internally consistent
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(Error::index("Index has no entries"));
        }
        if let Some(entry) = self
            .entries
            .iter()
            .find(|e| e.vector.len() != self.dimensions)
        {
            return Err(Error::index(format!(
                "Index entry {} has {} dimensions, expected {}",
                entry.ordinal,
                entry.vector.len(),
                self.dimensions
            )));
        }
        Ok(())
    }

    /// Score every entry against `query` and return the best `top_k`
    ///
    /// Results are in descending score; equal scores keep ascending ordinal.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<ScoredCandidate>> {
        if query.len() != self.dimensions {
            return Err(Error::index(format!(
                "Query has {} dimensions, index has {}",
                query.len(),
                self.dimensions
            )));
        }

        let query = normalize(query);
        let mut scored: Vec<ScoredCandidate> = self
            .entries
            .iter()
            .map(|entry| {
                let score = dot(&entry.vector, &query).clamp(-1.0, 1.0);
                ScoredCandidate::new(entry.text.clone(), score, entry.ordinal)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.ordinal.cmp(&b.ordinal))
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Scale to unit length; a zero vector stays zero and scores 0 against anything
fn normalize(vector: &[f32]) -> Vec<f32> {
    let norm = dot(vector, vector).sqrt();
    if norm == 0.0 {
        return vector.to_vec();
    }
    vector.iter().map(|v| v / norm).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embedding(ordinal: u32, vector: Vec<f32>) -> Embedding {
        Embedding {
            ordinal,
            text: format!("chunk {}", ordinal),
            vector,
        }
    }

    #[test]
    fn test_build_normalizes() {
        let index = VectorIndex::build(&[embedding(0, vec![3.0, 4.0])]).unwrap();
        let v = &index.entries()[0].vector;
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_build_rejects_bad_input() {
        assert!(matches!(VectorIndex::build(&[]), Err(Error::Index(_))));

        let mixed = [embedding(0, vec![1.0, 0.0]), embedding(1, vec![1.0])];
        assert!(matches!(VectorIndex::build(&mixed), Err(Error::Index(_))));

        let dup = [embedding(0, vec![1.0, 0.0]), embedding(0, vec![0.0, 1.0])];
        assert!(matches!(VectorIndex::build(&dup), Err(Error::Index(_))));

        let nan = [embedding(0, vec![f32::NAN, 0.0])];
        assert!(matches!(VectorIndex::build(&nan), Err(Error::Index(_))));
    }

    #[test]
    fn test_search_orders_by_score() {
        let index = VectorIndex::build(&[
            embedding(0, vec![0.0, 1.0]),
            embedding(1, vec![1.0, 0.0]),
            embedding(2, vec![1.0, 1.0]),
        ])
        .unwrap();

        let results = index.search(&[2.0, 0.0], 5).unwrap();
        let ordinals: Vec<u32> = results.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 0]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert!(results[2].score.abs() < 1e-6);
        assert_eq!(results[0].text, "chunk 1");
    }

    #[test]
    fn test_search_ties_break_by_ordinal() {
        let index = VectorIndex::build(&[
            embedding(7, vec![1.0, 0.0]),
            embedding(2, vec![1.0, 0.0]),
            embedding(4, vec![1.0, 0.0]),
        ])
        .unwrap();

        let ordinals: Vec<u32> = index
            .search(&[1.0, 0.0], 2)
            .unwrap()
            .iter()
            .map(|c| c.ordinal)
            .collect();
        assert_eq!(ordinals, vec![2, 4]);
    }

    #[test]
    fn test_search_rejects_wrong_dimensions() {
        let index = VectorIndex::build(&[embedding(0, vec![1.0, 0.0])]).unwrap();
        assert!(matches!(index.search(&[1.0], 1), Err(Error::Index(_))));
    }

    #[test]
    fn test_zero_vector_scores_zero() {
        let index = VectorIndex::build(&[embedding(0, vec![0.0, 0.0])]).unwrap();
        let results = index.search(&[1.0, 0.0], 1).unwrap();
        assert_eq!(results[0].score, 0.0);
    }
}
