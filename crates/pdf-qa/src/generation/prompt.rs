//! Prompt templates for grounded answer generation

use crate::types::ScoredCandidate;

/// Prompt builder for document questions
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join context texts with single spaces, in the order given
    pub fn build_context(context: &[ScoredCandidate]) -> String {
        context
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Build the grounded prompt: context only, explicit citations, then the question
    pub fn build_grounded_prompt(question: &str, context: &str) -> String {
        format!(
            r#"You are a legal assistant specializing in contracts. Answer the question based only on the following context, and cite the sources explicitly by quoting the passage each statement relies on. Do not include any information not present in the provided context. If the context does not contain the answer, say so.

Context:
{context}

Question: {question}
Answer:"#,
            context = context,
            question = question.trim(),
        )
    }
}
