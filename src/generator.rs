//! # Content Generators
//!
//! One model call per artifact. Each generator builds its prompt, invokes the
//! model with task-specific bounds, parses the answer through an ordered
//! chain of strategies (embedded JSON, whole JSON, then a plain-text
//! fallback), sanitizes every field and drops items that fail structural
//! checks before capping to the requested count.
//!
//! A response that yields no valid items is an error, never an empty artifact.

mod error;
mod flashcards;
pub mod parsing;
pub mod prompts;
mod quiz;
mod summarizer;

pub use error::GenerationError;
pub use flashcards::{build_flashcards, generate_flashcards, parse_flashcards, MIN_FIELD_CHARS};
pub use quiz::{
    build_quiz, coerce_boolean, coerce_choice, generate_quiz, parse_quiz, QUIZ_TITLE,
};
pub use summarizer::{
    generate_summary, generate_synoptic_summary, CONTENT_SEPARATOR, MAX_SUMMARY_INPUT_CHARS,
};
