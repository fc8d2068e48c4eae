//! Per-request scratch storage trait

use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

use crate::error::Result;

/// Trait for the temporary files a single request owns
///
/// Every artifact is keyed by the request id, so concurrent requests never
/// share a path.
///
/// Implementations:
/// - `LocalScratchStore`: files under a local scratch directory
#[async_trait]
pub trait ScratchStore: Send + Sync {
    /// Persist the uploaded document and return where it was written
    async fn store_document(&self, request_id: Uuid, data: &[u8]) -> Result<PathBuf>;

    /// Location of the persisted vector index for a request
    fn index_path(&self, request_id: Uuid) -> PathBuf;

    /// Remove everything stored for a request
    ///
    /// Missing artifacts are not an error.
    async fn release(&self, request_id: Uuid) -> Result<()>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
