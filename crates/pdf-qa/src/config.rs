//! Configuration for the question-answering service

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable naming a TOML configuration file
pub const CONFIG_PATH_ENV: &str = "PDF_QA_CONFIG";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// LLM backend configuration
    pub llm: LlmConfig,
    /// Answer generation configuration
    pub generation: GenerationConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Per-request scratch storage
    pub scratch: ScratchConfig,
}

impl RagConfig {
    /// Load configuration from the file named by `PDF_QA_CONFIG` (or defaults),
    /// then apply environment overrides and validate
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML configuration file; missing sections fall back to defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&raw)
    }

    /// Parse TOML text
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))
    }

    /// Pick up secrets that should not live in config files
    pub fn apply_env_overrides(&mut self) {
        for var in ["GEMINI_API_KEY", "GOOGLE_API_KEY"] {
            if let Ok(key) = std::env::var(var) {
                if !key.trim().is_empty() {
                    self.llm.gemini.api_key = Some(key);
                    break;
                }
            }
        }
    }

    /// Check cross-field invariants
    pub fn validate(&self) -> Result<()> {
        self.chunking.validate()?;
        self.retrieval.validate()?;
        self.generation.validate()?;

        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be positive".to_string()));
        }

        if self.llm.backend == LlmBackend::Gemini && self.llm.gemini.api_key.is_none() {
            return Err(Error::Config(
                "Gemini backend selected but no API key is configured (set GEMINI_API_KEY)"
                    .to_string(),
            ));
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Origins allowed by CORS; empty means any origin
    pub allowed_origins: Vec<String>,
    /// Maximum upload size in bytes (default: 50MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
            allowed_origins: vec![
                "https://pdf-query-app.vercel.app".to_string(),
                "http://localhost:3000".to_string(),
            ],
            max_upload_size: 50 * 1024 * 1024, // 50MB
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in bytes
    pub chunk_size: usize,
    /// Maximum overlap between consecutive chunks in bytes
    pub chunk_overlap: usize,
    /// Chunks smaller than this are merged into a neighbour
    pub min_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 128,
            min_chunk_size: 100,
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be positive".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.min_chunk_size > self.chunk_size {
            return Err(Error::Config(format!(
                "chunking.min_chunk_size ({}) must not exceed chunk_size ({})",
                self.min_chunk_size, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Ollama embedding model
    pub model: String,
    /// Embedding dimensions (768 for nomic-embed-text)
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "nomic-embed-text".to_string(),
            dimensions: 768,
        }
    }
}

/// Which service generates answers
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Local Ollama server
    #[default]
    Ollama,
    /// Google Gemini API
    Gemini,
}

/// LLM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Generation backend
    pub backend: LlmBackend,
    /// Ollama base URL (also serves embeddings)
    pub base_url: String,
    /// Ollama generation model name
    pub generate_model: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
    /// Gemini settings, used when `backend = "gemini"`
    pub gemini: GeminiConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::Ollama,
            base_url: "http://localhost:11434".to_string(),
            generate_model: "llama3.2:3b".to_string(),
            timeout_secs: 120,
            max_retries: 2,
            gemini: GeminiConfig::default(),
        }
    }
}

/// Gemini API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// API key; usually supplied through `GEMINI_API_KEY`
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL
    pub base_url: String,
    /// Model name
    pub model: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.0-flash-001".to_string(),
        }
    }
}

/// Sampling parameters sent with every generation request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Sampling temperature (default: 1.0)
    pub temperature: f32,
    /// Nucleus sampling cutoff (default: 0.95)
    pub top_p: f32,
    /// Output token cap (default: 8192)
    pub max_output_tokens: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 1.0,
            top_p: 0.95,
            max_output_tokens: 8192,
        }
    }
}

/// Answer generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Sampling parameters
    pub sampling: SamplingConfig,
    /// How many leading context items an answer cites
    pub max_context_items: usize,
    /// Upper bound on one generation call in seconds
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            sampling: SamplingConfig::default(),
            max_context_items: 3,
            timeout_secs: 120,
        }
    }
}

impl GenerationConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(Error::Config("generation.timeout_secs must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&self.sampling.top_p) {
            return Err(Error::Config("generation.sampling.top_p must be in [0, 1]".to_string()));
        }
        if !self.sampling.temperature.is_finite() || self.sampling.temperature < 0.0 {
            return Err(Error::Config(
                "generation.sampling.temperature must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of nearest neighbours fetched per query
    pub top_k: usize,
    /// Starting relevance threshold for the adaptive filter
    pub relevance_threshold: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            relevance_threshold: 0.6,
        }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be positive".to_string()));
        }
        if !self.relevance_threshold.is_finite() {
            return Err(Error::Config(
                "retrieval.relevance_threshold must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Scratch storage for uploaded documents and per-request index files
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScratchConfig {
    /// Directory holding scratch files
    pub dir: PathBuf,
}

impl Default for ScratchConfig {
    fn default() -> Self {
        let dir = dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("pdf-qa")
            .join("scratch");
        Self { dir }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.relevance_threshold, 0.6);
        assert_eq!(config.generation.max_context_items, 3);
        assert_eq!(config.generation.sampling, SamplingConfig::default());
    }

    #[test]
    fn test_partial_toml() {
        let config = RagConfig::from_toml(
            r#"
            [retrieval]
            top_k = 8

            [llm]
            backend = "gemini"

            [generation.sampling]
            temperature = 0.2
            "#,
        )
        .unwrap();

        assert_eq!(config.retrieval.top_k, 8);
        assert_eq!(config.retrieval.relevance_threshold, 0.6);
        assert_eq!(config.llm.backend, LlmBackend::Gemini);
        assert_eq!(config.generation.sampling.temperature, 0.2);
        assert_eq!(config.generation.sampling.top_p, 0.95);
        assert_eq!(config.chunking.chunk_size, 1024);
    }

    #[test]
    fn test_gemini_requires_key() {
        let mut config = RagConfig::default();
        config.llm.backend = LlmBackend::Gemini;
        assert!(config.validate().is_err());

        config.llm.gemini.api_key = Some("test-key".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chunking_validation() {
        let bad_overlap = ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            min_chunk_size: 10,
        };
        assert!(bad_overlap.validate().is_err());

        let bad_min = ChunkingConfig {
            chunk_size: 100,
            chunk_overlap: 10,
            min_chunk_size: 200,
        };
        assert!(bad_min.validate().is_err());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            RagConfig::from_toml("retrieval = 3"),
            Err(Error::Config(_))
        ));
    }
}
