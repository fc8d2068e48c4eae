//! Answer generation over retrieved context

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::error::{Error, Result};
use crate::providers::LlmProvider;
use crate::types::query::validate_question;
use crate::types::{Answer, ScoredCandidate};

use super::prompt::PromptBuilder;

/// Why a generation call produced no answer
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationFailure {
    /// The provider withheld the prompt or the response on policy grounds
    Blocked(String),
    /// Transport, HTTP or stream failure
    Provider(String),
    /// No complete answer within the configured timeout
    TimedOut(Duration),
}

impl GenerationFailure {
    /// Convert into the non-answer payload returned to the caller
    pub fn into_answer(self) -> Answer {
        Answer::message(self.to_string())
    }
}

impl fmt::Display for GenerationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocked(reason) => write!(f, "Blocked Prompt Error: {}", reason),
            Self::Provider(message) => write!(f, "An unexpected error occurred: {}", message),
            Self::TimedOut(after) => write!(
                f,
                "An unexpected error occurred: generation timed out after {}s",
                after.as_secs()
            ),
        }
    }
}

/// Result of one generation call
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    Answered(Answer),
    Failed(GenerationFailure),
}

impl GenerationOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The answer, or the failure rendered as a non-answer
    pub fn into_answer(self) -> Answer {
        match self {
            Self::Answered(answer) => answer,
            Self::Failed(failure) => failure.into_answer(),
        }
    }
}

/// Grounded answer generator
pub struct AnswerGenerator {
    llm: Arc<dyn LlmProvider>,
    config: GenerationConfig,
}

impl AnswerGenerator {
    pub fn new(llm: Arc<dyn LlmProvider>, config: GenerationConfig) -> Self {
        Self { llm, config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    /// Answer `question` from `context`, citing the first `max_context_items`
    ///
    /// Invalid input is an error and the model is never called. Everything
    /// that goes wrong once the model is called is reported as
    /// [`GenerationOutcome::Failed`].
    pub async fn generate(
        &self,
        question: &str,
        context: &[ScoredCandidate],
        max_context_items: usize,
    ) -> Result<GenerationOutcome> {
        validate_question(question)?;
        if let Some(empty) = context.iter().find(|c| c.text.trim().is_empty()) {
            return Err(Error::validation(format!(
                "Context item {} has no extractable text.",
                empty.ordinal
            )));
        }

        let prompt =
            PromptBuilder::build_grounded_prompt(question, &PromptBuilder::build_context(context));
        let timeout = self.config.timeout();

        tracing::info!(
            provider = self.llm.name(),
            model = self.llm.model(),
            context_items = context.len(),
            "Generating answer"
        );

        let outcome =
            match tokio::time::timeout(timeout, self.llm.generate(&prompt, &self.config.sampling))
                .await
            {
                Ok(Ok(text)) => {
                    let cited = context
                        .iter()
                        .take(max_context_items)
                        .map(|c| c.text.clone())
                        .collect();
                    GenerationOutcome::Answered(Answer::new(text.trim(), cited))
                }
                Ok(Err(Error::ContentBlocked(reason))) => {
                    GenerationOutcome::Failed(GenerationFailure::Blocked(reason))
                }
                Ok(Err(e)) => GenerationOutcome::Failed(GenerationFailure::Provider(e.to_string())),
                Err(_) => GenerationOutcome::Failed(GenerationFailure::TimedOut(timeout)),
            };

        if let GenerationOutcome::Failed(failure) = &outcome {
            tracing::warn!(provider = self.llm.name(), error = %failure, "Generation failed");
        }

        Ok(outcome)
    }
}
