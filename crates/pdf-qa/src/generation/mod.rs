//! Grounded answer generation

mod generator;
mod prompt;

pub use generator::{AnswerGenerator, GenerationFailure, GenerationOutcome};
pub use prompt::PromptBuilder;
