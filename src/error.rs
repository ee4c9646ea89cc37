//! Error types for the quizthebest crate

use thiserror::Error;

/// Result type for quizthebest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for quizthebest operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Web scraping error
    #[error("Scrape error: {0}")]
    Crawl(String),

    /// Search error
    #[error("Search error: {0}")]
    Search(String),

    /// Generative model error
    #[error("Model error: {0}")]
    Model(#[from] crate::model::ModelError),

    /// Content generation pipeline error
    #[error(transparent)]
    Generation(#[from] crate::generator::GenerationError),

    /// Delegated agent error
    #[error(transparent)]
    Agent(#[from] crate::agent::AgentError),

    /// Persistence error
    #[error(transparent)]
    Store(#[from] crate::store::StoreError),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

/// Client-facing failure causes the boundary layer maps to responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Timeout,
    RateLimited,
    Configuration,
    NoContent,
    Validation,
    NotFound,
    Internal,
}

impl ErrorKind {
    /// HTTP-equivalent status code for this cause
    pub fn status_code(self) -> u16 {
        match self {
            ErrorKind::Timeout => 504,
            ErrorKind::RateLimited => 429,
            ErrorKind::Configuration => 500,
            ErrorKind::NoContent => 404,
            ErrorKind::Validation => 422,
            ErrorKind::NotFound => 404,
            ErrorKind::Internal => 500,
        }
    }

    /// Stable code string for structured error bodies
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::RateLimited => "RATE_LIMITED",
            ErrorKind::Configuration => "CONFIG_ERROR",
            ErrorKind::NoContent => "NO_CONTENT",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Internal => "INTERNAL_ERROR",
        }
    }
}

impl Error {
    /// Classify this error into one of the fixed client-facing causes
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Config(_) => ErrorKind::Configuration,
            Error::Model(e) => e.kind(),
            Error::Generation(e) => e.kind(),
            Error::Agent(e) => e.kind(),
            Error::Store(e) => e.kind(),
            Error::Http(e) if e.is_timeout() => ErrorKind::Timeout,
            _ => ErrorKind::Internal,
        }
    }
}
