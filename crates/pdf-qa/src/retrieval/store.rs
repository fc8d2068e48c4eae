//! JSON persistence for vector indexes

use std::path::Path;

use crate::error::{Error, Result};

use super::index::VectorIndex;

/// Saves and loads a [`VectorIndex`] as a JSON file
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexStore;

impl IndexStore {
    pub fn new() -> Self {
        Self
    }

    /// Write the index to `path`, replacing any previous file
    pub async fn save(&self, path: &Path, index: &VectorIndex) -> Result<()> {
        let json = serde_json::to_vec(index)
            .map_err(|e| Error::index(format!("Failed to serialize index: {}", e)))?;

        tokio::fs::write(path, json).await.map_err(|e| {
            Error::index(format!("Failed to write index {}: {}", path.display(), e))
        })?;

        tracing::debug!(path = %path.display(), entries = index.len(), "Saved index");
        Ok(())
    }

    /// Read an index back from `path`
    pub async fn load(&self, path: &Path) -> Result<VectorIndex> {
        let json = tokio::fs::read(path).await.map_err(|e| {
            Error::index(format!("Failed to read index {}: {}", path.display(), e))
        })?;

        let index: VectorIndex = serde_json::from_slice(&json)
            .map_err(|e| Error::index(format!("Failed to parse index: {}", e)))?;
        index.validate()?;

        Ok(index)
    }
}
