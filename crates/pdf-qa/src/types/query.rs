//! Query request types

use crate::error::{Error, Result};

use super::document::Document;

/// One question against one uploaded PDF
#[derive(Debug, Clone)]
pub struct QueryRequest {
    /// The uploaded document
    pub document: Document,
    /// The question to answer
    pub question: String,
}

impl QueryRequest {
    pub fn new(document: Document, question: impl Into<String>) -> Self {
        Self {
            document,
            question: question.into(),
        }
    }

    /// Check the request before any work is done
    pub fn validate(&self) -> Result<()> {
        validate_question(&self.question)?;
        if self.document.is_empty() {
            return Err(Error::validation("The uploaded file is empty."));
        }
        Ok(())
    }
}

/// Reject empty or whitespace-only questions
pub fn validate_question(question: &str) -> Result<()> {
    if question.trim().is_empty() {
        return Err(Error::validation("The question must be a non-empty string."));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_question() {
        assert!(validate_question("What is APR?").is_ok());
        assert!(validate_question("").is_err());
        assert!(validate_question(" \n\t ").is_err());
    }

    #[test]
    fn test_validate_request() {
        let doc = Document::new("contract.pdf", b"%PDF-1.4".to_vec());
        assert!(QueryRequest::new(doc.clone(), "What is APR?").validate().is_ok());
        assert!(QueryRequest::new(doc, "  ").validate().is_err());

        let empty = Document::new("empty.pdf", Vec::new());
        let err = QueryRequest::new(empty, "What is APR?").validate().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
