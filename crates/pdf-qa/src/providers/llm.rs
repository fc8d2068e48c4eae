//! LLM provider trait for generating answers

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;

use crate::config::SamplingConfig;
use crate::error::Result;

/// Incremental text fragments produced by a model
pub type TextStream = BoxStream<'static, Result<String>>;

/// Trait for LLM-based text generation
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server (llama3.2, phi3, etc.)
/// - `GeminiLlm`: Google Gemini API (gemini-2.0-flash)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Start generating a completion for `prompt`, yielding text as it arrives
    async fn generate_stream(&self, prompt: &str, sampling: &SamplingConfig)
        -> Result<TextStream>;

    /// Generate a full completion by concatenating the stream
    ///
    /// The first error from the stream aborts generation.
    async fn generate(&self, prompt: &str, sampling: &SamplingConfig) -> Result<String> {
        let mut stream = self.generate_stream(prompt, sampling).await?;
        let mut text = String::new();
        while let Some(fragment) = stream.next().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
