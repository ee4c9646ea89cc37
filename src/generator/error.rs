//! Error types for the content generators and the generation pipeline

use thiserror::Error;

use crate::error::ErrorKind;
use crate::model::ModelError;
use crate::search::SearchError;

/// Errors raised while turning a topic into study material
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The search stage found nothing to work from
    #[error("No content found for this topic")]
    NoContent,

    /// The overall deadline passed before the next stage started
    #[error("Generation timeout exceeded")]
    Timeout,

    /// Gathered content failed the injection check
    #[error("Content validation failed")]
    ContentValidation,

    /// Input that cannot be used, e.g. an empty topic
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The model's summary did not survive sanitization
    #[error("Generated summary failed validation")]
    SummaryValidation,

    /// No parse strategy produced anything from the model response
    #[error("Invalid {artifact} format generated: {reason}")]
    Parse {
        artifact: &'static str,
        reason: String,
    },

    /// Everything parsed was dropped by validation
    #[error("No valid {0} generated")]
    NoValid(&'static str),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error(transparent)]
    Search(#[from] SearchError),
}

impl GenerationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerationError::NoContent => ErrorKind::NoContent,
            GenerationError::Timeout => ErrorKind::Timeout,
            GenerationError::ContentValidation
            | GenerationError::InvalidInput(_)
            | GenerationError::SummaryValidation
            | GenerationError::Parse { .. }
            | GenerationError::NoValid(_) => ErrorKind::Validation,
            GenerationError::Model(e) => e.kind(),
            GenerationError::Search(SearchError::InvalidParameters(_)) => ErrorKind::Validation,
            GenerationError::Search(_) => ErrorKind::Internal,
        }
    }
}
