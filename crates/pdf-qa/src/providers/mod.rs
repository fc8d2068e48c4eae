//! Provider abstractions for text extraction, embeddings, generation and scratch storage
//!
//! Every external capability the pipeline touches sits behind a trait, so the
//! pipeline can run against Ollama, Gemini, or test doubles without changes.

pub mod embedding;
pub mod extraction;
pub mod gemini;
pub mod llm;
pub mod local;
pub mod ollama;
pub mod scratch;
mod stream;

pub use embedding::EmbeddingProvider;
pub use extraction::TextExtractor;
pub use gemini::GeminiLlm;
pub use llm::{LlmProvider, TextStream};
pub use local::LocalScratchStore;
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaLlm};
pub use scratch::ScratchStore;
