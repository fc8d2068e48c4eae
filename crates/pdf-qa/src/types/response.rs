//! Retrieval and answer types, plus the wire responses

use serde::{Deserialize, Serialize};

/// One nearest-neighbour hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    /// Verbatim chunk text
    pub text: String,
    /// Cosine similarity, higher is more similar
    pub score: f32,
    /// Ordinal of the chunk this hit came from
    pub ordinal: u32,
}

impl ScoredCandidate {
    pub fn new(text: impl Into<String>, score: f32, ordinal: u32) -> Self {
        Self {
            text: text.into(),
            score,
            ordinal,
        }
    }
}

/// Generated answer with the context it was grounded on
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Answer {
    /// Answer text (or a human-readable failure message)
    pub text: String,
    /// Leading context items handed to the model, in input order
    pub cited_context: Vec<String>,
}

impl Answer {
    pub fn new(text: impl Into<String>, cited_context: Vec<String>) -> Self {
        Self {
            text: text.into(),
            cited_context,
        }
    }

    /// A non-answer carrying only a message
    pub fn message(text: impl Into<String>) -> Self {
        Self::new(text, Vec::new())
    }
}

/// Full result of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    /// Final answer text
    pub answer: String,
    /// Texts of every candidate that passed the relevance filter
    pub relevant_context: Vec<String>,
    /// Context the answer cites (truncated to `max_context_items`)
    pub cited_context: Vec<String>,
    /// Relevance threshold the filter settled on
    pub threshold_used: f32,
    /// Number of candidates returned by the index search
    pub candidates_retrieved: usize,
    /// Whether generation failed and `answer` is a failure message
    pub generation_failed: bool,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Successful response body for `POST /api/query`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub relevant_context: Vec<String>,
}

impl From<QueryResult> for QueryResponse {
    fn from(result: QueryResult) -> Self {
        Self {
            answer: result.answer,
            relevant_context: result.relevant_context,
        }
    }
}

/// Error response body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_response_shape() {
        let result = QueryResult {
            answer: "APR is the annual percentage rate [1].".to_string(),
            relevant_context: vec!["APR means annual percentage rate.".to_string()],
            cited_context: vec!["APR means annual percentage rate.".to_string()],
            threshold_used: 0.6,
            candidates_retrieved: 5,
            generation_failed: false,
            processing_time_ms: 12,
        };

        let json = serde_json::to_value(QueryResponse::from(result)).unwrap();
        assert_eq!(json["answer"], "APR is the annual percentage rate [1].");
        assert_eq!(json["relevant_context"][0], "APR means annual percentage rate.");
        assert_eq!(json.as_object().unwrap().len(), 2);
    }

    #[test]
    fn test_error_response_shape() {
        let json = serde_json::to_value(ErrorResponse::new("No file provided")).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "No file provided" }));
    }
}
