//! Gemini client for answer generation via the Generative Language API
//!
//! Streams `streamGenerateContent` over server-sent events and maps safety
//! blocks to [`Error::ContentBlocked`] so callers can tell them apart from
//! transport failures.

use async_trait::async_trait;
use bytes::Bytes;
use eventsource_stream::Eventsource;
use futures_util::future;
use futures_util::stream::{Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::config::{GeminiConfig, SamplingConfig};
use crate::error::{Error, Result};

use super::llm::{LlmProvider, TextStream};

/// Finish reasons that mean the response was withheld
const BLOCKED_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

/// Gemini LLM provider
pub struct GeminiLlm {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiLlm {
    /// Create a new Gemini client
    ///
    /// Fails when no API key is configured.
    pub fn new(config: &GeminiConfig, timeout_secs: u64) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| Error::Config("Gemini backend requires an API key".to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct GenerateResponse {
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ResponsePart {
    text: String,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Decode the data of one server-sent event into answer text
///
/// Events without text (such as the final `STOP` event) yield `None`.
fn parse_event(data: &str) -> Option<Result<String>> {
    let data = data.trim();
    if data.is_empty() {
        return None;
    }

    let response: GenerateResponse = match serde_json::from_str(data) {
        Ok(response) => response,
        Err(e) => {
            return Some(Err(Error::generation(format!(
                "Malformed Gemini event: {}",
                e
            ))))
        }
    };

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Some(Err(Error::ContentBlocked(format!("prompt blocked ({})", reason))));
    }

    let candidate = response.candidates.into_iter().next()?;
    if let Some(reason) = candidate
        .finish_reason
        .as_deref()
        .filter(|r| BLOCKED_FINISH_REASONS.contains(r))
    {
        return Some(Err(Error::ContentBlocked(format!(
            "response blocked ({})",
            reason
        ))));
    }

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        None
    } else {
        Some(Ok(text))
    }
}

/// Answer text carried by an SSE response body
fn event_text_stream<S, E>(body: S) -> TextStream
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    body.eventsource()
        .filter_map(|event| {
            future::ready(match event {
                Ok(event) => parse_event(&event.data),
                Err(e) => Some(Err(Error::generation(format!(
                    "Gemini stream failed: {}",
                    e
                )))),
            })
        })
        .boxed()
}

#[async_trait]
impl LlmProvider for GeminiLlm {
    async fn generate_stream(
        &self,
        prompt: &str,
        sampling: &SamplingConfig,
    ) -> Result<TextStream> {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: sampling.temperature,
                top_p: sampling.top_p,
                max_output_tokens: sampling.max_output_tokens,
            },
        };

        tracing::debug!(model = %self.model, "Starting Gemini generation");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::generation(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::generation(format!(
                "Gemini API error {}: {}",
                status, body
            )));
        }

        Ok(event_text_stream(response.bytes_stream()))
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models/{}", self.base_url, self.model);

        match self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.api_key)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(parts: &[&'static str]) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> {
        futures_util::stream::iter(
            parts
                .iter()
                .map(|p| Ok(Bytes::from_static(p.as_bytes())))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect(parts: &[&'static str]) -> Vec<Result<String>> {
        event_text_stream(body(parts)).collect().await
    }

    #[test]
    fn test_parse_text_event() {
        let data = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"The APR "},{"text":"is 5%."}]}}]}"#;
        assert_eq!(parse_event(data).unwrap().unwrap(), "The APR is 5%.");
    }

    #[test]
    fn test_events_without_text_are_skipped() {
        assert!(parse_event("").is_none());
        assert!(parse_event(r#"{"candidates":[{"finishReason":"STOP"}]}"#).is_none());
    }

    #[test]
    fn test_blocked_prompt() {
        let err = parse_event(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, Error::ContentBlocked(_)));
    }

    #[test]
    fn test_blocked_candidate() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"partial"}]},"finishReason":"PROHIBITED_CONTENT"}]}"#;
        let err = parse_event(data).unwrap().unwrap_err();
        assert!(matches!(err, Error::ContentBlocked(ref m) if m.contains("PROHIBITED_CONTENT")));
    }

    #[tokio::test]
    async fn test_stream_frames_events_across_chunks() {
        let texts = collect(&[
            ": keep-alive\n\n",
            "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"The APR \"}]}}]}\r\n\r\ndata: {\"candi",
            "dates\":[{\"content\":{\"parts\":[{\"text\":\"is 5%.\"}]}}]}\n\n",
            "data: {\"candidates\":[{\"finishReason\":\"STOP\"}]}\n\n",
        ])
        .await;

        let texts: Vec<String> = texts.into_iter().map(|t| t.unwrap()).collect();
        assert_eq!(texts, vec!["The APR ", "is 5%."]);
    }

    #[tokio::test]
    async fn test_stream_joins_multiline_data() {
        let texts = collect(&[
            "data: {\"candidates\":[\n",
            "data: {\"content\":{\"parts\":[{\"text\":\"Thirty days.\"}]}}]}\n\n",
        ])
        .await;

        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].as_ref().unwrap(), "Thirty days.");
    }

    #[tokio::test]
    async fn test_stream_surfaces_blocks() {
        let texts = collect(&["data: {\"promptFeedback\":{\"blockReason\":\"SAFETY\"}}\n\n"]).await;
        assert!(matches!(texts[0], Err(Error::ContentBlocked(_))));
    }

    #[test]
    fn test_requires_api_key() {
        let config = GeminiConfig::default();
        assert!(matches!(GeminiLlm::new(&config, 30), Err(Error::Config(_))));

        let config = GeminiConfig {
            api_key: Some("test-key".to_string()),
            ..Default::default()
        };
        let llm = GeminiLlm::new(&config, 30).unwrap();
        assert!(llm.endpoint().ends_with(":streamGenerateContent?alt=sse"));
    }

    #[test]
    fn test_request_uses_camel_case() {
        let request = GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: "hi" }],
            }],
            generation_config: GenerationConfig {
                temperature: 1.0,
                top_p: 0.95,
                max_output_tokens: 8192,
            },
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 8192);
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
    }
}
