//! pdf-qa: question answering over a single uploaded PDF
//!
//! Each request extracts the PDF's text, chunks it, embeds the chunks into a
//! request-scoped vector index, retrieves passages relevant to the question
//! with an adaptive relevance threshold, and asks an LLM to answer from those
//! passages only.

pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod pipeline;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use pipeline::{PipelineFailure, PipelineStage, QueryPipeline};
pub use types::{
    document::{Chunk, Document, Embedding},
    query::QueryRequest,
    response::{Answer, ErrorResponse, QueryResponse, QueryResult, ScoredCandidate},
};
