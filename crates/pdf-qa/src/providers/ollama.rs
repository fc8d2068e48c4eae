//! Ollama client and the embedding/LLM providers built on it

use async_trait::async_trait;
use futures_util::future;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use crate::config::{EmbeddingConfig, LlmConfig, SamplingConfig};
use crate::error::{Error, Result};

use super::embedding::EmbeddingProvider;
use super::llm::{LlmProvider, TextStream};
use super::stream::byte_lines;

/// Ollama API client with automatic retry
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Server base URL
    base_url: String,
    /// Maximum retries
    max_retries: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
}

impl From<&SamplingConfig> for GenerateOptions {
    fn from(sampling: &SamplingConfig) -> Self {
        Self {
            temperature: sampling.temperature,
            top_p: sampling.top_p,
            num_predict: sampling.max_output_tokens,
        }
    }
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    response: String,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create a new Ollama client with retry support
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries,
        })
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        let delay = Duration::from_secs(2u64.pow(attempt));
                        tracing::warn!(
                            "Ollama request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            self.max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::internal("Retry loop ran zero times")))
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Generate an embedding with retry
    pub async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let url = url.as_str();

        self.retry_request(move || async move {
            let request = EmbedRequest {
                model,
                prompt: text,
            };

            let response = self
                .client
                .post(url)
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

            if !response.status().is_success() {
                return Err(Error::embedding(format!(
                    "Embedding failed: HTTP {}",
                    response.status()
                )));
            }

            let embed_response: EmbedResponse = response.json().await.map_err(|e| {
                Error::embedding(format!("Failed to parse embedding response: {}", e))
            })?;

            Ok(embed_response.embedding)
        })
        .await
    }

    /// Start a streaming generation
    ///
    /// Only the initial request is retried; once tokens flow, a broken
    /// stream surfaces as an error item.
    pub async fn generate_stream(
        &self,
        model: &str,
        prompt: &str,
        sampling: &SamplingConfig,
    ) -> Result<TextStream> {
        let url = format!("{}/api/generate", self.base_url);
        let url = url.as_str();

        let response = self
            .retry_request(move || async move {
                let request = GenerateRequest {
                    model,
                    prompt,
                    stream: true,
                    options: sampling.into(),
                };

                let response = self
                    .client
                    .post(url)
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| Error::generation(format!("Generation request failed: {}", e)))?;

                if !response.status().is_success() {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    return Err(Error::generation(format!(
                        "Generation failed: HTTP {} - {}",
                        status, body
                    )));
                }

                Ok(response)
            })
            .await?;

        let stream = byte_lines(response.bytes_stream())
            .filter_map(|line| {
                future::ready(match line {
                    Ok(line) => parse_stream_line(&line),
                    Err(e) => Some(Err(e)),
                })
            })
            .boxed();

        Ok(stream)
    }
}

/// Decode one NDJSON line of an Ollama generate stream
fn parse_stream_line(line: &str) -> Option<Result<String>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match serde_json::from_str::<StreamChunk>(line) {
        Ok(StreamChunk {
            error: Some(message),
            ..
        }) => Some(Err(Error::generation(message))),
        Ok(chunk) if chunk.response.is_empty() => None,
        Ok(chunk) => Some(Ok(chunk.response)),
        Err(e) => Some(Err(Error::generation(format!(
            "Malformed stream chunk: {}",
            e
        )))),
    }
}

/// Ollama embedding provider using nomic-embed-text or similar models
pub struct OllamaEmbedder {
    client: Arc<OllamaClient>,
    model: String,
    dimensions: usize,
}

impl OllamaEmbedder {
    /// Create from an existing OllamaClient
    pub fn new(client: Arc<OllamaClient>, config: &EmbeddingConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            dimensions: config.dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client.embed(&self.model, text).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

/// Ollama LLM provider for answer generation
pub struct OllamaLlm {
    client: Arc<OllamaClient>,
    model: String,
}

impl OllamaLlm {
    /// Create from an existing OllamaClient
    pub fn new(client: Arc<OllamaClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait]
impl LlmProvider for OllamaLlm {
    async fn generate_stream(
        &self,
        prompt: &str,
        sampling: &SamplingConfig,
    ) -> Result<TextStream> {
        tracing::debug!(model = %self.model, "Starting Ollama generation");
        self.client
            .generate_stream(&self.model, prompt, sampling)
            .await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }
}
