//! Core types for the pipeline

pub mod document;
pub mod query;
pub mod response;

pub use document::{Chunk, Document, Embedding};
pub use query::QueryRequest;
pub use response::{Answer, ErrorResponse, QueryResponse, QueryResult, ScoredCandidate};
