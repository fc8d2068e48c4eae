//! Text extraction provider trait

use async_trait::async_trait;
use std::path::Path;

use crate::error::Result;

/// Trait for turning a stored document into plain text
///
/// Implementations:
/// - `PdfTextExtractor`: pdf-extract with a lopdf fallback
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract the full text of the document at `path`
    ///
    /// An empty string means the document has no extractable text.
    async fn extract(&self, path: &Path) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
