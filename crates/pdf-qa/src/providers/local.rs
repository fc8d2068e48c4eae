//! Local filesystem scratch store

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::ScratchConfig;
use crate::error::Result;

use super::scratch::ScratchStore;

/// Scratch store writing `<id>.pdf` and `<id>.index.json` under one directory
#[derive(Debug, Clone)]
pub struct LocalScratchStore {
    dir: PathBuf,
}

impl LocalScratchStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_config(config: &ScratchConfig) -> Self {
        Self::new(config.dir.clone())
    }

    /// Create the scratch directory if it does not exist yet
    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, request_id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.pdf", request_id))
    }
}

/// Remove a file, treating "already gone" as success
async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl ScratchStore for LocalScratchStore {
    async fn store_document(&self, request_id: Uuid, data: &[u8]) -> Result<PathBuf> {
        self.ensure_dir().await?;
        let path = self.document_path(request_id);
        tokio::fs::write(&path, data).await?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "Stored upload");
        Ok(path)
    }

    fn index_path(&self, request_id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.index.json", request_id))
    }

    async fn release(&self, request_id: Uuid) -> Result<()> {
        // Try both even if the first removal fails
        let document = remove_if_exists(&self.document_path(request_id)).await;
        let index = remove_if_exists(&self.index_path(request_id)).await;
        document.and(index)
    }

    fn name(&self) -> &str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_and_release() {
        let tmp = TempDir::new().unwrap();
        let store = LocalScratchStore::new(tmp.path().join("scratch"));
        let id = Uuid::new_v4();

        let path = store.store_document(id, b"%PDF-1.4").await.unwrap();
        assert!(path.exists());
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), format!("{}.pdf", id));

        tokio::fs::write(store.index_path(id), b"{}").await.unwrap();
        store.release(id).await.unwrap();

        assert!(!path.exists());
        assert!(!store.index_path(id).exists());
    }

    #[tokio::test]
    async fn test_release_missing_is_ok() {
        let tmp = TempDir::new().unwrap();
        let store = LocalScratchStore::new(tmp.path());
        store.release(Uuid::new_v4()).await.unwrap();
    }

    #[tokio::test]
    async fn test_requests_do_not_share_paths() {
        let tmp = TempDir::new().unwrap();
        let store = LocalScratchStore::new(tmp.path());
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        let path_a = store.store_document(a, b"a").await.unwrap();
        let path_b = store.store_document(b, b"b").await.unwrap();
        assert_ne!(path_a, path_b);
        assert_ne!(store.index_path(a), store.index_path(b));

        store.release(a).await.unwrap();
        assert!(!path_a.exists());
        assert!(path_b.exists());
    }
}
